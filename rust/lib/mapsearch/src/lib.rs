//! Map search: the coordination engine behind a map-based member search.
//!
//! Decides, from a moving map viewport, typed keyword/location queries, a
//! selected member and a filter set, which search criterion is active, when
//! the remote search runs, which page is shown, and when the "search this
//! area" prompt appears. Rendering, the map widget and the remote search
//! service are external and reached through traits.
//!
//! # Layers
//!
//! - [`SearchReducer`]: pure `(state, event) -> state` transition function
//! - [`QueryCoordinator`]: query keys, page cache, pagination, stale discard
//! - [`ViewportBridge`]: map events in, camera commands out, debouncing
//! - [`MapSearch`]: wires them together over a path-keyed [`StateStore`]
//!
//! # Published paths
//!
//! - `search/state`: [`SearchState`]
//! - `search/results`: [`ResultsView`]
//! - `map/command`: [`MapCommand`] (broadcast, not stored)
//!
//! # Request paths
//!
//! `search/keyword/set`, `search/keyword/clear`, `search/location/set`,
//! `search/location/clear`, `search/area/set`, `search/filters/apply`,
//! `search/filters/reset`, `search/page/set`, `search/user/select`,
//! `search/area-button/set`, `map/viewport/move`.

pub mod config;
pub mod coordinator;
pub mod draft;
pub mod engine;
pub mod error;
pub mod filters;
pub mod geo;
pub mod link;
pub mod reducer;
pub mod replay;
pub mod request;
pub mod state;
pub mod store;
pub mod viewport;

pub use config::MapSearchConfig;
pub use coordinator::{
    Completion, FetchTicket, QueryCoordinator, QueryKey, QueryPlan, ResultsStatus, ResultsView,
    SearchParams, SearchResponse, UserSearch, UserSummary,
};
pub use draft::FilterDraft;
pub use engine::MapSearch;
pub use error::{MapSearchError, SearchError};
pub use filters::{
    FilterPatch, FilterSet, HostingStatus, LastActive, MeetupStatus, SleepingArrangement,
};
pub use geo::{Bbox, GeocodeResult, LngLat};
pub use link::SharedLink;
pub use reducer::{SearchEvent, SearchReducer};
pub use request::decode_request;
pub use state::{InitialSearch, SearchMode, SearchState, UserId, Viewport};
pub use store::{StateStore, StateValue, SubscriptionId};
pub use viewport::{FeatureClick, MapCommand, MapWidget, ViewportBridge, ViewportChange};

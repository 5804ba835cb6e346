//! The search state transition function.
//!
//! Every user or map interaction becomes one [`SearchEvent`]; the
//! [`SearchReducer`] turns `(state, event)` into a whole new [`SearchState`].
//! It never mutates its input and never performs I/O, so every invariant of
//! the search page can be checked here in isolation.

use tracing::debug;

use crate::filters::{FilterPatch, FilterSet};
use crate::geo::{crossed_down, Bbox, GeocodeResult, LngLat, SEARCH_ZOOM_THRESHOLD};
use crate::state::{SearchMode, SearchState, UserId, Viewport};

#[derive(Debug, Clone, PartialEq)]
pub enum SearchEvent {
    SetKeyword {
        keyword: String,
    },
    ClearKeyword,
    /// A place picked from the location autocomplete.
    SetLocation {
        location: Option<GeocodeResult>,
        center: Option<LngLat>,
        zoom: Option<f64>,
    },
    /// Search the given area ("search this area", or the automatic search on
    /// zooming in). No bbox clears the area.
    SetMapQueryArea {
        bbox: Option<Bbox>,
        zoom: Option<f64>,
    },
    ClearLocation,
    ApplyFilters {
        filters: FilterPatch,
    },
    ResetFilters,
    SetPageNumber {
        page_number: u32,
    },
    /// Toggle the highlighted member. `None` clears it.
    SelectUser {
        user_id: Option<UserId>,
    },
    /// Map moved; only the viewport changes unless zooming out past the
    /// search threshold.
    MoveViewportOnly {
        bbox: Option<Bbox>,
        center: Option<LngLat>,
        zoom: Option<f64>,
    },
    SetShowSearchThisAreaButton {
        show: bool,
    },
}

impl SearchEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SearchEvent::SetKeyword { .. } => "SetKeyword",
            SearchEvent::ClearKeyword => "ClearKeyword",
            SearchEvent::SetLocation { .. } => "SetLocation",
            SearchEvent::SetMapQueryArea { .. } => "SetMapQueryArea",
            SearchEvent::ClearLocation => "ClearLocation",
            SearchEvent::ApplyFilters { .. } => "ApplyFilters",
            SearchEvent::ResetFilters => "ResetFilters",
            SearchEvent::SetPageNumber { .. } => "SetPageNumber",
            SearchEvent::SelectUser { .. } => "SelectUser",
            SearchEvent::MoveViewportOnly { .. } => "MoveViewportOnly",
            SearchEvent::SetShowSearchThisAreaButton { .. } => "SetShowSearchThisAreaButton",
        }
    }

    /// True for explicit user actions on the search criteria or page.
    /// Map moves, the prompt flag and member selection are not: a selection
    /// only touches the criteria when it changes the mode.
    pub fn is_criteria_action(&self) -> bool {
        !matches!(
            self,
            SearchEvent::MoveViewportOnly { .. }
                | SearchEvent::SetShowSearchThisAreaButton { .. }
                | SearchEvent::SelectUser { .. }
        )
    }
}

/// Pure transition function over [`SearchState`].
#[derive(Debug, Clone, Copy)]
pub struct SearchReducer {
    threshold: f64,
}

impl Default for SearchReducer {
    fn default() -> Self {
        Self::new(SEARCH_ZOOM_THRESHOLD)
    }
}

impl SearchReducer {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn reduce(&self, state: &SearchState, event: &SearchEvent) -> SearchState {
        let next = match event {
            SearchEvent::SetKeyword { keyword } => self.set_keyword(state, keyword),
            SearchEvent::ClearKeyword => {
                self.clear_criterion(state, matches!(state.mode, SearchMode::Keyword(_)))
            }
            SearchEvent::SetLocation {
                location,
                center,
                zoom,
            } => self.set_location(state, location.as_ref(), *center, *zoom),
            SearchEvent::SetMapQueryArea { bbox, zoom } => {
                let mut next = Self::start_criterion(state);
                next.mode = bbox.map(SearchMode::Bbox).unwrap_or_default();
                if let Some(z) = zoom {
                    next.viewport.zoom = *z;
                }
                next
            }
            SearchEvent::ClearLocation => {
                self.clear_criterion(state, state.mode.is_area_or_keyword())
            }
            SearchEvent::ApplyFilters { filters } => Self::apply_filters(state, filters),
            SearchEvent::ResetFilters => {
                let mut next = state.clone();
                next.filters = FilterSet::default();
                next.has_active_filters = false;
                next.page_number = 1;
                next.selected_user = None;
                if matches!(next.mode, SearchMode::SelectedUser(_)) {
                    next.mode = SearchMode::None;
                }
                next
            }
            SearchEvent::SetPageNumber { page_number } => {
                let mut next = state.clone();
                next.page_number = (*page_number).max(1);
                next
            }
            SearchEvent::SelectUser { user_id } => self.select_user(state, *user_id),
            SearchEvent::MoveViewportOnly { bbox, center, zoom } => {
                self.move_viewport(state, *bbox, *center, *zoom)
            }
            SearchEvent::SetShowSearchThisAreaButton { show } => {
                let mut next = state.clone();
                next.show_search_this_area_button = *show;
                next
            }
        };

        debug!(
            "search event {}: mode {:?} -> {:?}, page {} -> {}",
            event.name(),
            state.mode,
            next.mode,
            state.page_number,
            next.page_number
        );
        next
    }

    // ── Criteria ────────────────────────────────────────────────────

    /// Common part of every event that installs a new driving criterion.
    fn start_criterion(state: &SearchState) -> SearchState {
        let mut next = state.clone();
        next.location_name = None;
        next.selected_user = None;
        next.page_number = 1;
        next.show_search_this_area_button = false;
        next
    }

    fn set_keyword(&self, state: &SearchState, keyword: &str) -> SearchState {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return self.clear_criterion(state, matches!(state.mode, SearchMode::Keyword(_)));
        }
        let mut next = Self::start_criterion(state);
        next.mode = SearchMode::Keyword(keyword.to_string());
        next
    }

    fn set_location(
        &self,
        state: &SearchState,
        location: Option<&GeocodeResult>,
        center: Option<LngLat>,
        zoom: Option<f64>,
    ) -> SearchState {
        let Some((location, bbox)) = location.and_then(|l| l.bbox.map(|b| (l, b))) else {
            debug!("location without bbox ignored");
            return state.clone();
        };

        let mut next = Self::start_criterion(state);
        next.mode = SearchMode::Bbox(bbox);
        next.location_name = Some(
            location
                .simplified_name
                .clone()
                .unwrap_or_else(|| location.name.clone()),
        );
        next.viewport.bbox = Some(bbox);
        next.viewport.center = center.or(location.location).or(Some(bbox.center()));
        if let Some(z) = zoom {
            next.viewport.zoom = z;
        }
        next
    }

    /// Drop the bbox/keyword criterion when `applies`, falling back to the
    /// highlighted member if nothing else constrains the search.
    fn clear_criterion(&self, state: &SearchState, applies: bool) -> SearchState {
        let mut next = state.clone();
        if applies {
            next.location_name = None;
            next.mode = match next.selected_user {
                Some(id) if !next.has_active_filters => SearchMode::SelectedUser(id),
                _ => SearchMode::None,
            };
        }
        next.page_number = 1;
        next.show_search_this_area_button =
            !next.meets_search_criteria() && next.viewport.zoom >= self.threshold;
        next
    }

    fn apply_filters(state: &SearchState, patch: &FilterPatch) -> SearchState {
        let mut next = state.clone();
        next.filters = state.filters.merged(patch);
        next.has_active_filters = next.filters.has_active();
        next.page_number = 1;
        if matches!(next.mode, SearchMode::SelectedUser(_)) {
            next.mode = SearchMode::None;
        }
        next
    }

    // ── Selection & viewport ────────────────────────────────────────

    fn select_user(&self, state: &SearchState, user_id: Option<UserId>) -> SearchState {
        let mut next = state.clone();
        let other_criteria = state.has_other_criteria();

        match user_id {
            Some(id) if state.selected_user != Some(id) => {
                next.selected_user = Some(id);
                next.mode = if other_criteria {
                    state.mode.clone()
                } else {
                    SearchMode::SelectedUser(id)
                };
            }
            _ => {
                next.selected_user = None;
                if matches!(next.mode, SearchMode::SelectedUser(_)) {
                    next.mode = SearchMode::None;
                }
            }
        }

        next.show_search_this_area_button =
            !other_criteria && state.viewport.zoom >= self.threshold;
        next
    }

    fn move_viewport(
        &self,
        state: &SearchState,
        bbox: Option<Bbox>,
        center: Option<LngLat>,
        zoom: Option<f64>,
    ) -> SearchState {
        let new_zoom = zoom.unwrap_or(state.viewport.zoom);
        let viewport = Viewport {
            bbox: bbox.or(state.viewport.bbox),
            center: center.or(state.viewport.center),
            zoom: new_zoom,
        };

        if crossed_down(state.viewport.zoom, new_zoom, self.threshold) {
            debug!("zoomed out below {}, search reset", self.threshold);
            return SearchState {
                viewport,
                ..SearchState::default()
            };
        }

        let mut next = state.clone();
        next.viewport = viewport;
        if new_zoom < self.threshold {
            next.show_search_this_area_button = false;
        }
        next
    }
}

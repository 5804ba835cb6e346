use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::config::MapSearchConfig;
use crate::coordinator::{Completion, QueryCoordinator, QueryPlan, ResultsView, UserSearch};
use crate::draft::FilterDraft;
use crate::error::MapSearchError;
use crate::link::SharedLink;
use crate::reducer::{SearchEvent, SearchReducer};
use crate::request::decode_request;
use crate::state::{InitialSearch, SearchState, UserId};
use crate::store::{StateStore, StateValue, SubscriptionId};
use crate::viewport::{debounce, FeatureClick, MapCommand, MapWidget, ViewportBridge, ViewportChange};

/// MapSearch, the search page engine.
///
/// Owns the search state and the page cache, and publishes three topics on
/// its [`StateStore`]:
/// - `search/state`: the current [`SearchState`]
/// - `search/results`: the current [`ResultsView`]
/// - `map/command`: camera commands, also sent to attached [`MapWidget`]s
///
/// Transitions are synchronous: the state lock is held across reduce and
/// publish, and subscribers run on the dispatching thread. Subscribers read
/// the published value they are handed (or the store); they must not call
/// back into `dispatch`.
///
/// # Examples
///
/// ```ignore
/// let engine = MapSearch::new(backend, MapSearchConfig::default())?;
///
/// engine.subscribe("search/#", |path, _| println!("{} changed", path));
///
/// engine.emit_json("search/keyword/set", r#"{"keyword":"paris"}"#)?;
/// let view = engine.refresh().await?;
/// ```
pub struct MapSearch {
    config: MapSearchConfig,
    reducer: SearchReducer,
    bridge: ViewportBridge,
    store: Arc<StateStore>,
    state: Mutex<SearchState>,
    coordinator: Mutex<QueryCoordinator>,
    backend: Arc<dyn UserSearch>,
    widgets: RwLock<Vec<Arc<dyn MapWidget>>>,
}

impl MapSearch {
    /// Engine with an empty search. Fails when `config` does not validate.
    pub fn new(backend: Arc<dyn UserSearch>, config: MapSearchConfig) -> Result<Self, MapSearchError> {
        Self::with_initial(backend, config, InitialSearch::default())
    }

    /// Engine for a visit that starts from a preset area, keyword or filters.
    pub fn with_initial(
        backend: Arc<dyn UserSearch>,
        config: MapSearchConfig,
        preset: InitialSearch,
    ) -> Result<Self, MapSearchError> {
        config.validate()?;

        let state = SearchState::initial(&preset);
        let mut coordinator = QueryCoordinator::new(config.page_size);
        let store = Arc::new(StateStore::new());
        store.set(ResultsView::PATH, coordinator.view(&state));
        store.set(SearchState::PATH, state.clone());

        info!("map search ready: mode {:?}", state.mode);
        Ok(Self {
            reducer: SearchReducer::new(config.search_zoom),
            bridge: ViewportBridge::new(&config),
            config,
            store,
            state: Mutex::new(state),
            coordinator: Mutex::new(coordinator),
            backend,
            widgets: RwLock::new(Vec::new()),
        })
    }

    /// Engine for a visit opened from a shared link query string.
    pub fn from_link(
        backend: Arc<dyn UserSearch>,
        config: MapSearchConfig,
        query: &str,
    ) -> Result<Self, MapSearchError> {
        let link = SharedLink::parse(query)?;
        Self::with_initial(backend, config, link.into_initial())
    }

    // ====================================================================
    // State (read)
    // ====================================================================

    /// Last published search state.
    pub fn state(&self) -> SearchState {
        self.store
            .get_as::<SearchState>(SearchState::PATH)
            .unwrap_or_default()
    }

    /// Last published results view.
    pub fn results(&self) -> ResultsView {
        self.store
            .get_as::<ResultsView>(ResultsView::PATH)
            .unwrap_or_default()
    }

    pub fn config(&self) -> &MapSearchConfig {
        &self.config
    }

    /// Store holding the published topics.
    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    /// Query string reproducing the current search, place name included.
    pub fn share_link(&self) -> String {
        SharedLink::from_state(&self.state()).to_query()
    }

    // ====================================================================
    // Events
    // ====================================================================

    /// Reduce `event` and publish the new state. Does not fetch; call
    /// [`MapSearch::refresh`] or use [`MapSearch::submit`] for that.
    pub fn dispatch(&self, event: SearchEvent) {
        self.transition(|_| vec![event]);
    }

    /// Decode a path-addressed JSON request and dispatch it.
    pub fn emit_json(&self, path: &str, json: &str) -> Result<(), MapSearchError> {
        match decode_request(path, json) {
            Ok(event) => {
                self.dispatch(event);
                Ok(())
            }
            Err(e) => {
                error!("request {} rejected: {}", path, e);
                Err(e)
            }
        }
    }

    /// Dispatch and then bring the results up to date.
    pub async fn submit(&self, event: SearchEvent) -> Result<ResultsView, MapSearchError> {
        self.dispatch(event);
        self.refresh().await
    }

    /// Derive events from the current state, reduce them in order as one
    /// transition and publish the outcome.
    fn transition<F>(&self, derive: F)
    where
        F: FnOnce(&SearchState) -> Vec<SearchEvent>,
    {
        let mut state = self.state.lock();
        let events = derive(&state);
        if events.is_empty() {
            return;
        }
        let mut next = state.clone();
        for event in &events {
            next = self.reducer.reduce(&next, event);
        }

        let mut coordinator = self.coordinator.lock();
        if events.iter().any(SearchEvent::is_criteria_action) || next.mode != state.mode {
            coordinator.retry();
        }
        if next != *state {
            *state = next.clone();
            self.store.set(SearchState::PATH, next);
        }
        let view = coordinator.view(&state);
        self.publish_results(view);
    }

    fn publish_results(&self, view: ResultsView) {
        let unchanged = self
            .store
            .get(ResultsView::PATH)
            .is_some_and(|v| v.downcast_ref::<ResultsView>() == Some(&view));
        if !unchanged {
            self.store.set(ResultsView::PATH, view);
        }
    }

    // ====================================================================
    // Remote search
    // ====================================================================

    /// Fetch whatever the current state needs, if anything, and publish the
    /// resulting view. A failed fetch is reported both in the view and as
    /// the error.
    pub async fn refresh(&self) -> Result<ResultsView, MapSearchError> {
        let ticket = {
            let state = self.state.lock();
            let mut coordinator = self.coordinator.lock();
            let plan = coordinator.plan(&state);
            let view = coordinator.view(&state);
            match plan {
                QueryPlan::Fetch(ticket) => {
                    self.publish_results(view);
                    ticket
                }
                other => {
                    debug!("refresh: nothing to fetch ({})", plan_name(&other));
                    self.publish_results(view.clone());
                    return Ok(view);
                }
            }
        };

        let result = self
            .backend
            .search(&ticket.params, ticket.page_token.as_deref())
            .await;

        let state = self.state.lock();
        let mut coordinator = self.coordinator.lock();
        let completion = coordinator.complete(&ticket.key, &state, result);
        let view = coordinator.view(&state);
        self.publish_results(view.clone());

        match completion {
            Completion::Failed(e) => Err(e.into()),
            Completion::Committed | Completion::Discarded => Ok(view),
        }
    }

    /// Allow a failed page to be fetched again.
    pub async fn retry(&self) -> Result<ResultsView, MapSearchError> {
        self.coordinator.lock().retry();
        self.refresh().await
    }

    // ====================================================================
    // Map
    // ====================================================================

    /// Register a map widget to receive camera commands.
    pub fn attach_widget(&self, widget: Arc<dyn MapWidget>) {
        self.widgets.write().push(widget);
    }

    /// Handle a settled viewport (already debounced).
    pub fn on_viewport_changed(&self, change: ViewportChange) {
        self.transition(|state| self.bridge.translate(state, &change));
    }

    /// Debounce raw viewport reports and feed them through the engine,
    /// refreshing results after each settled move. Runs until `moves` closes.
    pub async fn drive_viewport(&self, moves: mpsc::Receiver<ViewportChange>) {
        let mut settled = debounce(self.config.debounce(), moves);
        while let Some(change) = settled.recv().await {
            self.on_viewport_changed(change);
            if let Err(e) = self.refresh().await {
                debug!("refresh after map move failed: {}", e);
            }
        }
    }

    /// Handle a click on a member marker or a cluster.
    pub fn on_feature_clicked(&self, click: FeatureClick) {
        let mut command = None;
        self.transition(|state| {
            let (events, cmd) = self.bridge.feature_clicked(state, click);
            command = cmd;
            events
        });
        if let Some(command) = command {
            self.send_command(command);
        }
    }

    /// Zoom control button. Does nothing at the zoom bounds.
    pub fn zoom_by(&self, delta: f64) {
        let command = self.bridge.zoom_by(&self.state.lock(), delta);
        if let Some(command) = command {
            self.send_command(command);
        }
    }

    /// Fit the camera to the area the visit started with, if any.
    pub fn fit_initial(&self) -> bool {
        let bbox = self.state.lock().viewport.bbox;
        match bbox {
            Some(bbox) => {
                self.send_command(self.bridge.fit_initial(bbox));
                true
            }
            None => false,
        }
    }

    /// Select a member from the displayed results and fly to them.
    /// Returns false when the member is not on the displayed page.
    pub fn focus_result(&self, user_id: UserId) -> bool {
        let results = self.results();
        let Some(user) = results.users.iter().find(|u| u.user_id == user_id) else {
            return false;
        };

        let mut pan = None;
        self.transition(|state| {
            let (select, cmd) = self.bridge.focus_result(state, user);
            pan = Some(cmd);
            select.into_iter().collect()
        });
        if let Some(pan) = pan {
            self.send_command(pan);
        }
        true
    }

    fn send_command(&self, command: MapCommand) {
        debug!("map command {:?}", command);
        for widget in self.widgets.read().iter() {
            widget.apply(&command);
        }
        self.store.broadcast(MapCommand::PATH, command);
    }

    // ====================================================================
    // Filters
    // ====================================================================

    /// Editable copy of the committed filters.
    pub fn open_filters(&self) -> FilterDraft {
        FilterDraft::open(&self.state.lock().filters)
    }

    /// Apply a draft as one `ApplyFilters` event.
    pub fn commit_filters(&self, draft: FilterDraft) {
        self.dispatch(draft.commit());
    }

    // ====================================================================
    // Subscriptions
    // ====================================================================

    /// See [`StateStore::subscribe`].
    pub fn subscribe<F>(&self, pattern: &str, handler: F) -> SubscriptionId
    where
        F: Fn(&str, &StateValue) + Send + Sync + 'static,
    {
        self.store.subscribe(pattern, handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.store.unsubscribe(id);
    }
}

fn plan_name(plan: &QueryPlan) -> &'static str {
    match plan {
        QueryPlan::Idle => "idle",
        QueryPlan::Cached(_) => "cached",
        QueryPlan::InFlight(_) => "in flight",
        QueryPlan::Fetch(_) => "fetch",
        QueryPlan::Unreachable(_) => "unreachable",
        QueryPlan::Failed(_) => "failed",
    }
}

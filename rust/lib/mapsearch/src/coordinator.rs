//! Query coordination: when to fetch, with what, and what to show.
//!
//! The [`QueryCoordinator`] owns the page cache. It never performs I/O
//! itself: [`QueryCoordinator::plan`] hands out a [`FetchTicket`], the caller
//! runs it against a [`UserSearch`] backend, and feeds the outcome back via
//! [`QueryCoordinator::complete`]. Responses whose key no longer matches the
//! current state are dropped there.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::SearchError;
use crate::filters::FilterSet;
use crate::geo::Bbox;
use crate::state::{SearchMode, SearchState, UserId};

/// Page size the backend uses when none is configured.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Minimum "about me" length for a profile to count as complete.
const COMPLETE_ABOUT_LEN: usize = 150;

// ── Remote search types ─────────────────────────────────────────────

/// One member in a result page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub user_id: UserId,
    pub name: String,
    pub lng: f64,
    pub lat: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub about_me: Option<String>,
}

impl UserSummary {
    /// Has an avatar and an about-me of at least 150 characters.
    pub fn has_completed_profile(&self) -> bool {
        self.avatar_url.is_some()
            && self
                .about_me
                .as_deref()
                .is_some_and(|a| a.chars().count() >= COMPLETE_ABOUT_LEN)
    }
}

/// One fetched page. Never mutated after it is cached.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchResponse {
    pub results: Vec<UserSummary>,
    /// Empty when there is no further page.
    pub next_page_token: String,
    pub total_items: u64,
}

impl SearchResponse {
    /// Continuation token, `None` on the last page.
    pub fn next_token(&self) -> Option<&str> {
        Some(self.next_page_token.as_str()).filter(|t| !t.is_empty())
    }
}

/// Query parameters derived from committed state only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub filters: FilterSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Bbox>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exact_user_ids: Vec<UserId>,
    pub page_size: u32,
}

impl SearchParams {
    /// Parameters for the current mode and committed filters.
    ///
    /// A degenerate bbox is left out, never sent as `0,0,0,0`.
    pub fn from_state(state: &SearchState, page_size: u32) -> Self {
        let mut params = Self {
            filters: state.filters.clone(),
            query: None,
            bbox: None,
            exact_user_ids: Vec::new(),
            page_size,
        };
        match &state.mode {
            SearchMode::None => {}
            SearchMode::Keyword(q) => params.query = Some(q.clone()),
            SearchMode::Bbox(b) => params.bbox = Some(*b).filter(|b| !b.is_degenerate()),
            SearchMode::SelectedUser(id) => params.exact_user_ids.push(*id),
        }
        params
    }

    /// Absolute cutoff for the "last active" filter.
    pub fn last_active_since(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.filters
            .last_active
            .map(|bucket| bucket.days())
            .filter(|days| *days > 0)
            .map(|days| now - Duration::days(i64::from(days)))
    }
}

/// Remote paginated member search.
#[async_trait::async_trait]
pub trait UserSearch: Send + Sync {
    async fn search(
        &self,
        params: &SearchParams,
        page_token: Option<&str>,
    ) -> Result<SearchResponse, SearchError>;
}

// ── Cache keys & plans ──────────────────────────────────────────────

/// Identity of a result page. Viewport fields are not part of it.
///
/// Keys sharing filters and mode form a scope: the pages of one result list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub filters: FilterSet,
    pub mode: SearchMode,
    pub page: u32,
}

impl QueryKey {
    /// Key of the page `state` asks for.
    pub fn from_state(state: &SearchState) -> Self {
        Self {
            filters: state.filters.clone(),
            mode: state.mode.clone(),
            page: state.page_number.max(1),
        }
    }

    /// Key of the page before this one in the same scope.
    pub fn previous(&self) -> Option<QueryKey> {
        (self.page > 1).then(|| QueryKey {
            page: self.page - 1,
            ..self.clone()
        })
    }

    /// True when both keys address pages of the same result list.
    pub fn same_scope(&self, other: &QueryKey) -> bool {
        self.filters == other.filters && self.mode == other.mode
    }
}

/// A fetch the caller should run and report back.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchTicket {
    pub key: QueryKey,
    pub params: SearchParams,
    pub page_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryPlan {
    /// Criteria not met; nothing to fetch.
    Idle,
    Cached(QueryKey),
    InFlight(QueryKey),
    Fetch(FetchTicket),
    /// Page N > 1 without a token from page N-1.
    Unreachable(QueryKey),
    /// Last fetch for this key failed; waiting for a user action.
    Failed(QueryKey),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Committed,
    Discarded,
    Failed(SearchError),
}

// ── Published view ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResultsStatus {
    /// Criteria not met. Distinct from a query with zero hits.
    #[default]
    NoQuery,
    Loading,
    Ready,
    Failed,
    Unreachable,
}

/// What the results list shows, published at [`ResultsView::PATH`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsView {
    pub status: ResultsStatus,
    pub users: Vec<UserSummary>,
    pub page_number: u32,
    pub has_previous_page: bool,
    pub has_next_page: bool,
    pub number_of_total: u64,
    pub total_items: u64,
    pub error: Option<String>,
}

impl ResultsView {
    pub const PATH: &'static str = "search/results";
}

// ── Coordinator ─────────────────────────────────────────────────────

/// Page cache and fetch bookkeeping for one search page.
///
/// The cache only ever holds pages of a single scope. Once a page of a new
/// scope is displayed, or the criteria are cleared, older scopes are dropped
/// and re-entering them fetches again.
#[derive(Debug)]
pub struct QueryCoordinator {
    page_size: u32,
    cache: HashMap<QueryKey, Arc<SearchResponse>>,
    in_flight: HashSet<QueryKey>,
    failure: Option<(QueryKey, SearchError)>,
    /// Key of the page currently on screen, kept while the next one loads.
    displayed: Option<QueryKey>,
}

impl QueryCoordinator {
    /// Coordinator for a backend serving `page_size` results per page.
    pub fn new(page_size: u32) -> Self {
        Self {
            page_size,
            cache: HashMap::new(),
            in_flight: HashSet::new(),
            failure: None,
            displayed: None,
        }
    }

    /// Results per backend page.
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// The cached page for `key`, if any.
    pub fn cached(&self, key: &QueryKey) -> Option<&Arc<SearchResponse>> {
        self.cache.get(key)
    }

    /// Number of pages currently cached.
    pub fn cached_pages(&self) -> usize {
        self.cache.len()
    }

    /// Decide what `state` needs. A returned `Fetch` marks its key in flight.
    pub fn plan(&mut self, state: &SearchState) -> QueryPlan {
        if !state.meets_search_criteria() {
            return QueryPlan::Idle;
        }

        let key = QueryKey::from_state(state);
        if self.cache.contains_key(&key) {
            return QueryPlan::Cached(key);
        }
        if self.failed_for(&key) {
            return QueryPlan::Failed(key);
        }
        if self.in_flight.contains(&key) {
            return QueryPlan::InFlight(key);
        }

        let page_token = match key.previous() {
            None => None,
            Some(prev) => match self.cache.get(&prev).and_then(|p| p.next_token()) {
                Some(token) => Some(token.to_string()),
                None => {
                    debug!("page {} unreachable: no token from previous page", key.page);
                    return QueryPlan::Unreachable(key);
                }
            },
        };

        debug!("search fetch start: page {} mode {:?}", key.page, key.mode);
        self.in_flight.insert(key.clone());
        QueryPlan::Fetch(FetchTicket {
            params: SearchParams::from_state(state, self.page_size),
            key,
            page_token,
        })
    }

    /// Record the outcome of a fetch issued for `key`, judged against the
    /// state current at completion time.
    pub fn complete(
        &mut self,
        key: &QueryKey,
        current: &SearchState,
        result: Result<SearchResponse, SearchError>,
    ) -> Completion {
        self.in_flight.remove(key);

        let is_current =
            current.meets_search_criteria() && QueryKey::from_state(current) == *key;
        if !is_current {
            debug!("stale search response for page {} discarded", key.page);
            return Completion::Discarded;
        }

        match result {
            Ok(page) => {
                debug!(
                    "search page {} committed: {} results",
                    key.page,
                    page.results.len()
                );
                self.cache.insert(key.clone(), Arc::new(page));
                Completion::Committed
            }
            Err(e) => {
                warn!("search failed for page {}: {}", key.page, e);
                self.failure = Some((key.clone(), e.clone()));
                Completion::Failed(e)
            }
        }
    }

    /// Forget the last failure so its key may be fetched again.
    pub fn retry(&mut self) {
        self.failure = None;
    }

    /// True when the last fetch for `key` failed and no retry happened since.
    pub fn failed_for(&self, key: &QueryKey) -> bool {
        self.failure.as_ref().is_some_and(|(k, _)| k == key)
    }

    /// Results view for `state`. Falls back to the last displayed page while
    /// the current one is loading, failed or unreachable.
    pub fn view(&mut self, state: &SearchState) -> ResultsView {
        if !state.meets_search_criteria() {
            self.displayed = None;
            self.cache.clear();
            return ResultsView::default();
        }

        let key = QueryKey::from_state(state);
        if self.cache.contains_key(&key) {
            if self.displayed.as_ref().is_none_or(|d| !d.same_scope(&key)) {
                self.cache.retain(|k, _| k.same_scope(&key));
            }
            self.displayed = Some(key.clone());
            return self.page_view(&key, ResultsStatus::Ready, None);
        }

        let (status, error) = match &self.failure {
            Some((k, e)) if *k == key => (ResultsStatus::Failed, Some(e.to_string())),
            _ if self.in_flight.contains(&key) => (ResultsStatus::Loading, None),
            _ if key
                .previous()
                .is_some_and(|p| self.cache.get(&p).and_then(|r| r.next_token()).is_none()) =>
            {
                (ResultsStatus::Unreachable, None)
            }
            _ => (ResultsStatus::Loading, None),
        };

        match self.displayed.clone() {
            Some(shown) if self.cache.contains_key(&shown) => self.page_view(&shown, status, error),
            _ => ResultsView {
                status,
                page_number: key.page,
                error,
                ..ResultsView::default()
            },
        }
    }

    fn page_view(&self, key: &QueryKey, status: ResultsStatus, error: Option<String>) -> ResultsView {
        let page = self.cache.get(key);
        let items = page.map_or(0, |p| p.results.len() as u64);
        let first = QueryKey {
            page: 1,
            ..key.clone()
        };

        ResultsView {
            status,
            users: page.map(|p| p.results.clone()).unwrap_or_default(),
            page_number: key.page,
            has_previous_page: key.previous().is_some_and(|p| self.cache.contains_key(&p)),
            has_next_page: page.and_then(|p| p.next_token()).is_some(),
            number_of_total: self.number_of_total(key.page, items),
            total_items: self.cache.get(&first).map_or(0, |p| p.total_items),
            error,
        }
    }

    /// "X of Y" counter: page 1 shows its item count, later pages assume
    /// every earlier page was full.
    pub fn number_of_total(&self, page: u32, items_on_page: u64) -> u64 {
        if page <= 1 {
            items_on_page
        } else {
            u64::from(page - 1) * u64::from(self.page_size) + items_on_page
        }
    }
}

impl Default for QueryCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

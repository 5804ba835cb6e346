//! Scripted replays against canned result pages.
//!
//! A script is JSON lines, one request per line:
//!
//! ```text
//! {"path":"search/keyword/set","payload":{"keyword":"paris"}}
//! {"path":"search/page/set","payload":{"pageNumber":2}}
//! {"path":"map/viewport/changed","payload":{"bbox":[2.2,48.8,2.5,48.9],"center":{"lng":2.35,"lat":48.85},"zoom":8}}
//! ```
//!
//! Besides every request path the engine decodes, scripts may use
//! `map/viewport/changed` (a settled map move), `map/zoom` (`{"delta":1}`),
//! `search/result/focus` (`{"userId":7}`) and `search/retry`. After each step
//! the engine refreshes and one [`ReplayRecord`] is produced.

use std::collections::HashMap;
use std::io::BufRead;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::coordinator::{ResultsView, SearchParams, SearchResponse, UserSearch};
use crate::engine::MapSearch;
use crate::error::{MapSearchError, SearchError};
use crate::state::{SearchState, UserId};
use crate::viewport::ViewportChange;

pub const VIEWPORT_CHANGED: &str = "map/viewport/changed";
pub const MAP_ZOOM: &str = "map/zoom";
pub const RESULT_FOCUS: &str = "search/result/focus";
pub const RETRY: &str = "search/retry";

/// Backend answering from a fixed set of pages keyed by page token.
/// The first page lives under the empty token.
#[derive(Debug, Default)]
pub struct FixtureBackend {
    pages: HashMap<String, SearchResponse>,
    calls: Mutex<Vec<(SearchParams, Option<String>)>>,
}

#[derive(Deserialize)]
struct FixtureFile {
    pages: HashMap<String, SearchResponse>,
}

impl FixtureBackend {
    pub fn new(pages: HashMap<String, SearchResponse>) -> Self {
        Self {
            pages,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Parse `{"pages": {"": {...}, "token": {...}}}`.
    pub fn from_json(json: &str) -> Result<Self, SearchError> {
        let file: FixtureFile =
            serde_json::from_str(json).map_err(|e| SearchError::Decode(e.to_string()))?;
        Ok(Self::new(file.pages))
    }

    /// Every request received so far.
    pub fn calls(&self) -> Vec<(SearchParams, Option<String>)> {
        self.calls.lock().clone()
    }
}

#[async_trait::async_trait]
impl UserSearch for FixtureBackend {
    async fn search(
        &self,
        params: &SearchParams,
        page_token: Option<&str>,
    ) -> Result<SearchResponse, SearchError> {
        self.calls
            .lock()
            .push((params.clone(), page_token.map(str::to_string)));
        let token = page_token.unwrap_or_default();
        self.pages.get(token).cloned().ok_or_else(|| SearchError::Rejected {
            code: "NOT_FOUND".into(),
            message: format!("no fixture page for token {token:?}"),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ReplayStep {
    pub path: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayRecord {
    pub step: usize,
    pub path: String,
    pub state: SearchState,
    pub results: ResultsView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Deserialize)]
struct ZoomReq {
    delta: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FocusReq {
    user_id: UserId,
}

/// Run one step. Request errors are returned; a failed fetch is not, it
/// shows up in the published results instead.
pub async fn run_step(engine: &MapSearch, step: &ReplayStep) -> Result<(), MapSearchError> {
    match step.path.as_str() {
        VIEWPORT_CHANGED => {
            let change: ViewportChange = from_payload(&step.path, &step.payload)?;
            engine.on_viewport_changed(change);
        }
        MAP_ZOOM => {
            let req: ZoomReq = from_payload(&step.path, &step.payload)?;
            engine.zoom_by(req.delta);
        }
        RESULT_FOCUS => {
            let req: FocusReq = from_payload(&step.path, &step.payload)?;
            if !engine.focus_result(req.user_id) {
                warn!("user {} is not on the displayed page", req.user_id);
            }
        }
        RETRY => {
            if let Err(e) = engine.retry().await {
                warn!("retry failed: {}", e);
            }
            return Ok(());
        }
        path => engine.emit_json(path, &step.payload.to_string())?,
    }

    if let Err(e) = engine.refresh().await {
        warn!("refresh after {} failed: {}", step.path, e);
    }
    Ok(())
}

/// Run a whole script, one record per non-blank line.
pub async fn run_script<R: BufRead>(
    engine: &MapSearch,
    script: R,
) -> Result<Vec<ReplayRecord>, MapSearchError> {
    let mut records = Vec::new();

    for (idx, line) in script.lines().enumerate() {
        let line = line.map_err(|e| MapSearchError::MalformedPayload {
            path: format!("line {}", idx + 1),
            reason: e.to_string(),
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let step: ReplayStep =
            serde_json::from_str(&line).map_err(|e| MapSearchError::MalformedPayload {
                path: format!("line {}", idx + 1),
                reason: e.to_string(),
            })?;

        let error = run_step(engine, &step).await.err().map(|e| e.to_string());
        records.push(ReplayRecord {
            step: records.len() + 1,
            path: step.path,
            state: engine.state(),
            results: engine.results(),
            error,
        });
    }

    Ok(records)
}

fn from_payload<T: serde::de::DeserializeOwned>(
    path: &str,
    payload: &serde_json::Value,
) -> Result<T, MapSearchError> {
    T::deserialize(payload).map_err(|e| MapSearchError::MalformedPayload {
        path: path.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapSearchConfig;
    use crate::coordinator::ResultsStatus;
    use std::sync::Arc;

    const FIXTURE: &str = r#"{
        "pages": {
            "": {
                "results": [{"userId": 1, "name": "Ana", "lng": 2.3, "lat": 48.8}],
                "nextPageToken": "p2",
                "totalItems": 2
            },
            "p2": {
                "results": [{"userId": 2, "name": "Bo", "lng": 2.4, "lat": 48.9}],
                "nextPageToken": "",
                "totalItems": 2
            }
        }
    }"#;

    #[test]
    fn fixture_parses() {
        let backend = FixtureBackend::from_json(FIXTURE).unwrap();
        assert_eq!(backend.pages.len(), 2);
        assert!(FixtureBackend::from_json("[]").is_err());
    }

    #[tokio::test]
    async fn script_walks_pages() {
        let backend = Arc::new(FixtureBackend::from_json(FIXTURE).unwrap());
        let engine = MapSearch::new(backend.clone(), MapSearchConfig::from_args(&["--page-size=1".into()])).unwrap();

        let script = "\
{\"path\":\"search/keyword/set\",\"payload\":{\"keyword\":\"paris\"}}

{\"path\":\"search/page/set\",\"payload\":{\"pageNumber\":2}}
{\"path\":\"search/nope\"}
";
        let records = run_script(&engine, script.as_bytes()).await.unwrap();
        assert_eq!(records.len(), 3);

        assert_eq!(records[0].results.status, ResultsStatus::Ready);
        assert_eq!(records[0].results.users[0].user_id, 1);

        assert_eq!(records[1].results.users[0].user_id, 2);
        assert_eq!(records[1].results.number_of_total, 2);
        assert!(records[1].results.has_previous_page);

        assert!(records[2].error.as_deref().unwrap().contains("search/nope"));

        let calls = backend.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].1.as_deref(), Some("p2"));
    }

    #[tokio::test]
    async fn bad_line_stops_the_script() {
        let engine = MapSearch::new(
            Arc::new(FixtureBackend::default()),
            MapSearchConfig::default(),
        )
        .unwrap();
        assert!(matches!(
            run_script(&engine, "not json\n".as_bytes()).await,
            Err(MapSearchError::MalformedPayload { .. })
        ));
    }
}

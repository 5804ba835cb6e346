//! Map widget bridge.
//!
//! Turns what the map reports (viewport moves, clicks on pins or clusters)
//! into reducer events, and search decisions into camera commands. Nothing
//! here touches state; the engine applies the returned events.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::config::MapSearchConfig;
use crate::coordinator::UserSummary;
use crate::geo::{crossed_up, Bbox, LngLat};
use crate::reducer::SearchEvent;
use crate::state::{SearchState, UserId};

/// A settled viewport as reported by the map widget.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportChange {
    pub bbox: Bbox,
    pub center: LngLat,
    pub zoom: f64,
}

/// What was under the pointer when the map was clicked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeatureClick {
    User(UserId),
    Cluster { expansion_zoom: f64, at: LngLat },
    Empty,
}

/// Camera command for the map widget, published at [`MapCommand::PATH`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MapCommand {
    #[serde(rename_all = "camelCase")]
    PanZoomTo {
        center: Option<LngLat>,
        zoom: f64,
        duration_ms: u64,
    },
    #[serde(rename_all = "camelCase")]
    FitBounds {
        bbox: Bbox,
        max_zoom: f64,
        padding: u32,
        duration_ms: u64,
    },
}

impl MapCommand {
    pub const PATH: &'static str = "map/command";
}

/// The map widget as seen from the engine.
pub trait MapWidget: Send + Sync {
    fn apply(&self, command: &MapCommand);
}

#[derive(Debug, Clone)]
pub struct ViewportBridge {
    threshold: f64,
    cluster_zoom_step: f64,
    ease: Duration,
    focus_zoom: f64,
    fit_max_zoom: f64,
    fit_padding: u32,
    min_zoom: f64,
    max_zoom: f64,
}

impl ViewportBridge {
    /// Bridge using the zoom limits and camera timings of `config`.
    pub fn new(config: &MapSearchConfig) -> Self {
        Self {
            threshold: config.search_zoom,
            cluster_zoom_step: config.cluster_zoom_step,
            ease: config.ease(),
            focus_zoom: config.focus_zoom,
            fit_max_zoom: config.fit_max_zoom,
            fit_padding: config.fit_padding,
            min_zoom: config.min_zoom,
            max_zoom: config.max_zoom,
        }
    }

    /// Events for a settled map move.
    ///
    /// Zooming in past the threshold searches the visible area unless an area
    /// or keyword search already drives the results. Any other move at or
    /// above the threshold offers the "search this area" prompt.
    pub fn translate(&self, state: &SearchState, change: &ViewportChange) -> Vec<SearchEvent> {
        let mut events = vec![SearchEvent::MoveViewportOnly {
            bbox: Some(change.bbox),
            center: Some(change.center),
            zoom: Some(change.zoom),
        }];

        if crossed_up(state.viewport.zoom, change.zoom, self.threshold)
            && !state.mode.is_area_or_keyword()
        {
            events.push(SearchEvent::SetMapQueryArea {
                bbox: Some(change.bbox),
                zoom: Some(change.zoom),
            });
        } else if change.zoom >= self.threshold {
            events.push(SearchEvent::SetShowSearchThisAreaButton { show: true });
        }
        events
    }

    /// Events and an optional camera move for a click on a map feature.
    ///
    /// A member click toggles the highlight and a click on empty map clears
    /// it. A cluster click zooms toward the cluster without touching the search.
    pub fn feature_clicked(
        &self,
        state: &SearchState,
        click: FeatureClick,
    ) -> (Vec<SearchEvent>, Option<MapCommand>) {
        match click {
            FeatureClick::User(id) => (
                vec![SearchEvent::SelectUser { user_id: Some(id) }],
                None,
            ),
            FeatureClick::Cluster { expansion_zoom, at } => {
                let zoom = expansion_zoom.min(state.viewport.zoom + self.cluster_zoom_step);
                (Vec::new(), Some(self.pan_zoom(Some(at), zoom)))
            }
            FeatureClick::Empty if state.selected_user.is_some() => {
                (vec![SearchEvent::SelectUser { user_id: None }], None)
            }
            FeatureClick::Empty => (Vec::new(), None),
        }
    }

    /// Zoom control step. `None` when already at the bound.
    pub fn zoom_by(&self, state: &SearchState, delta: f64) -> Option<MapCommand> {
        let current = state.viewport.zoom;
        let target = (current + delta).clamp(self.min_zoom, self.max_zoom);
        (target != current).then(|| self.pan_zoom(None, target))
    }

    /// Camera fit for the area a visit starts with.
    pub fn fit_initial(&self, bbox: Bbox) -> MapCommand {
        MapCommand::FitBounds {
            bbox,
            max_zoom: self.fit_max_zoom,
            padding: self.fit_padding,
            duration_ms: self.ease_ms(),
        }
    }

    /// Highlight a result list entry and fly to it.
    pub fn focus_result(&self, state: &SearchState, user: &UserSummary) -> (Option<SearchEvent>, MapCommand) {
        let select = (state.selected_user != Some(user.user_id)).then_some(SearchEvent::SelectUser {
            user_id: Some(user.user_id),
        });
        let pan = self.pan_zoom(Some(LngLat::new(user.lng, user.lat)), self.focus_zoom);
        (select, pan)
    }

    fn pan_zoom(&self, center: Option<LngLat>, zoom: f64) -> MapCommand {
        MapCommand::PanZoomTo {
            center,
            zoom: zoom.clamp(self.min_zoom, self.max_zoom),
            duration_ms: self.ease_ms(),
        }
    }

    fn ease_ms(&self) -> u64 {
        self.ease.as_millis() as u64
    }
}

/// Trailing-edge debounce: forwards the last value received once `window`
/// has passed without a newer one. Pending input is flushed when the sender
/// side closes.
pub fn debounce<T: Send + 'static>(window: Duration, mut input: mpsc::Receiver<T>) -> mpsc::Receiver<T> {
    let (tx, output) = mpsc::channel(16);

    tokio::spawn(async move {
        let mut pending: Option<T> = None;
        loop {
            tokio::select! {
                msg = input.recv() => match msg {
                    Some(v) => pending = Some(v),
                    None => {
                        if let Some(v) = pending.take() {
                            let _ = tx.send(v).await;
                        }
                        break;
                    }
                },
                _ = tokio::time::sleep(window), if pending.is_some() => {
                    if let Some(v) = pending.take() {
                        if tx.send(v).await.is_err() {
                            break;
                        }
                    }
                }
            }
        }
    });

    output
}

use serde::{Deserialize, Serialize};

use crate::filters::{FilterPatch, FilterSet};
use crate::geo::{Bbox, LngLat, INITIAL_ZOOM};

/// Member identifier as issued by the API.
pub type UserId = u64;

/// The single criterion currently driving the remote query.
///
/// Being one tagged variant, at most one of bbox / keyword / selected user can
/// ever be active. Filters are orthogonal and live next to it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum SearchMode {
    #[default]
    None,
    Bbox(Bbox),
    Keyword(String),
    SelectedUser(UserId),
}

impl SearchMode {
    pub fn is_none(&self) -> bool {
        matches!(self, SearchMode::None)
    }

    /// True for the two modes a map move or threshold crossing must not override.
    pub fn is_area_or_keyword(&self) -> bool {
        matches!(self, SearchMode::Bbox(_) | SearchMode::Keyword(_))
    }
}

/// Map viewport as last reported by the widget. Never part of a query key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub bbox: Option<Bbox>,
    pub center: Option<LngLat>,
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            bbox: None,
            center: None,
            zoom: INITIAL_ZOOM,
        }
    }
}

/// Search page state, published at [`SearchState::PATH`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchState {
    pub filters: FilterSet,
    pub has_active_filters: bool,
    /// Display name of the place whose bbox drives the search, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_name: Option<String>,
    pub mode: SearchMode,
    pub page_number: u32,
    /// Highlighted member. Equals the mode's id whenever the mode is
    /// `SelectedUser`, but may outlive it once another criterion takes over.
    pub selected_user: Option<UserId>,
    pub show_search_this_area_button: bool,
    pub viewport: Viewport,
}

impl SearchState {
    pub const PATH: &'static str = "search/state";

    /// State seeded from a preset area, keyword or filter set.
    ///
    /// A usable bbox wins over a keyword; both are ignored when absent.
    pub fn initial(preset: &InitialSearch) -> Self {
        let filters = FilterSet::default().merged(&preset.filters);
        let area = preset.bbox.filter(|b| !b.is_degenerate());
        let keyword = preset
            .keyword
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty());

        let mode = match (area, keyword) {
            (Some(bbox), _) => SearchMode::Bbox(bbox),
            (None, Some(k)) => SearchMode::Keyword(k.to_string()),
            (None, None) => SearchMode::None,
        };

        Self {
            has_active_filters: filters.has_active(),
            location_name: area.and(preset.location_name.clone()),
            filters,
            mode,
            viewport: Viewport {
                bbox: preset.bbox,
                ..Viewport::default()
            },
            ..Self::default()
        }
    }

    /// `hasActiveFilters OR mode ≠ none`.
    pub fn meets_search_criteria(&self) -> bool {
        self.has_active_filters || !self.mode.is_none()
    }

    /// True when something other than a selected user constrains the search.
    pub fn has_other_criteria(&self) -> bool {
        self.has_active_filters || self.mode.is_area_or_keyword()
    }
}

impl Default for SearchState {
    fn default() -> Self {
        Self {
            filters: FilterSet::default(),
            has_active_filters: false,
            location_name: None,
            mode: SearchMode::None,
            page_number: 1,
            selected_user: None,
            show_search_this_area_button: false,
            viewport: Viewport::default(),
        }
    }
}

/// What a search page visit starts from: a preset area (e.g. from the
/// location the user typed on another page), a shared-link keyword, and
/// shared-link filters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InitialSearch {
    pub bbox: Option<Bbox>,
    pub keyword: Option<String>,
    pub location_name: Option<String>,
    pub filters: FilterPatch,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_meets_no_criteria() {
        let s = SearchState::default();
        assert_eq!(s.page_number, 1);
        assert_eq!(s.viewport.zoom, INITIAL_ZOOM);
        assert!(!s.meets_search_criteria());
    }

    #[test]
    fn preset_bbox_seeds_bbox_mode() {
        let bbox = Bbox::new(2.2, 48.8, 2.5, 48.9);
        let s = SearchState::initial(&InitialSearch {
            bbox: Some(bbox),
            keyword: Some("ignored".into()),
            location_name: Some("Paris".into()),
            ..Default::default()
        });
        assert_eq!(s.mode, SearchMode::Bbox(bbox));
        assert_eq!(s.location_name.as_deref(), Some("Paris"));
        assert_eq!(s.viewport.bbox, Some(bbox));
        assert!(s.meets_search_criteria());
    }

    #[test]
    fn preset_keyword_seeds_keyword_mode() {
        let s = SearchState::initial(&InitialSearch {
            keyword: Some(" berlin ".into()),
            location_name: Some("Berlin".into()),
            ..Default::default()
        });
        assert_eq!(s.mode, SearchMode::Keyword("berlin".into()));
        // A name without an area describes nothing.
        assert_eq!(s.location_name, None);
    }

    #[test]
    fn degenerate_preset_bbox_is_ignored() {
        let s = SearchState::initial(&InitialSearch {
            bbox: Some(Bbox::new(0.0, 0.0, 0.0, 0.0)),
            ..Default::default()
        });
        assert_eq!(s.mode, SearchMode::None);
    }

    #[test]
    fn preset_filters_are_normalized() {
        let s = SearchState::initial(&InitialSearch {
            filters: FilterPatch {
                num_guests: Some(2),
                age_min: Some(18),
                ..Default::default()
            },
            ..Default::default()
        });
        assert!(s.has_active_filters);
        assert_eq!(s.filters.num_guests, Some(2));
        assert_eq!(s.filters.age_min, None);
        assert!(s.meets_search_criteria());
    }

    #[test]
    fn mode_serializes_tagged() {
        let json = serde_json::to_value(SearchMode::Keyword("paris".into())).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "keyword", "value": "paris"}));
        let json = serde_json::to_value(SearchMode::None).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "none"}));
    }
}

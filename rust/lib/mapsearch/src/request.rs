//! Path-addressed JSON requests.
//!
//! Platform shells talk to the engine with `(path, json)` pairs; this module
//! turns them into typed [`SearchEvent`]s. Paths without a payload accept an
//! empty string or any JSON value.

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::MapSearchError;
use crate::filters::FilterPatch;
use crate::geo::{Bbox, GeocodeResult, LngLat};
use crate::reducer::SearchEvent;
use crate::state::UserId;

pub const KEYWORD_SET: &str = "search/keyword/set";
pub const KEYWORD_CLEAR: &str = "search/keyword/clear";
pub const LOCATION_SET: &str = "search/location/set";
pub const LOCATION_CLEAR: &str = "search/location/clear";
pub const AREA_SET: &str = "search/area/set";
pub const FILTERS_APPLY: &str = "search/filters/apply";
pub const FILTERS_RESET: &str = "search/filters/reset";
pub const PAGE_SET: &str = "search/page/set";
pub const USER_SELECT: &str = "search/user/select";
pub const AREA_BUTTON_SET: &str = "search/area-button/set";
pub const VIEWPORT_MOVE: &str = "map/viewport/move";

#[derive(Deserialize)]
struct KeywordReq {
    keyword: String,
}

#[derive(Deserialize)]
struct LocationReq {
    #[serde(default)]
    location: Option<GeocodeResult>,
    #[serde(default)]
    center: Option<LngLat>,
    #[serde(default)]
    zoom: Option<f64>,
}

#[derive(Deserialize)]
struct AreaReq {
    #[serde(default)]
    bbox: Option<Bbox>,
    #[serde(default)]
    zoom: Option<f64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageReq {
    page_number: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SelectReq {
    #[serde(default)]
    user_id: Option<UserId>,
}

#[derive(Deserialize)]
struct ViewportReq {
    #[serde(default)]
    bbox: Option<Bbox>,
    #[serde(default)]
    center: Option<LngLat>,
    #[serde(default)]
    zoom: Option<f64>,
}

#[derive(Deserialize)]
struct AreaButtonReq {
    show: bool,
}

pub fn decode_request(path: &str, json: &str) -> Result<SearchEvent, MapSearchError> {
    let event = match path {
        KEYWORD_SET => {
            let req: KeywordReq = payload(path, json)?;
            SearchEvent::SetKeyword {
                keyword: req.keyword,
            }
        }
        KEYWORD_CLEAR => SearchEvent::ClearKeyword,
        LOCATION_SET => {
            let req: LocationReq = payload(path, json)?;
            SearchEvent::SetLocation {
                location: req.location,
                center: req.center,
                zoom: req.zoom,
            }
        }
        LOCATION_CLEAR => SearchEvent::ClearLocation,
        AREA_SET => {
            let req: AreaReq = payload(path, json)?;
            SearchEvent::SetMapQueryArea {
                bbox: req.bbox,
                zoom: req.zoom,
            }
        }
        FILTERS_APPLY => SearchEvent::ApplyFilters {
            filters: payload::<FilterPatch>(path, json)?,
        },
        FILTERS_RESET => SearchEvent::ResetFilters,
        PAGE_SET => {
            let req: PageReq = payload(path, json)?;
            SearchEvent::SetPageNumber {
                page_number: req.page_number,
            }
        }
        USER_SELECT => {
            let req: SelectReq = payload(path, json)?;
            SearchEvent::SelectUser {
                user_id: req.user_id,
            }
        }
        AREA_BUTTON_SET => {
            let req: AreaButtonReq = payload(path, json)?;
            SearchEvent::SetShowSearchThisAreaButton { show: req.show }
        }
        VIEWPORT_MOVE => {
            let req: ViewportReq = payload(path, json)?;
            SearchEvent::MoveViewportOnly {
                bbox: req.bbox,
                center: req.center,
                zoom: req.zoom,
            }
        }
        _ => return Err(MapSearchError::UnknownRequest(path.to_string())),
    };
    Ok(event)
}

fn payload<T: DeserializeOwned>(path: &str, json: &str) -> Result<T, MapSearchError> {
    serde_json::from_str(json).map_err(|e| MapSearchError::MalformedPayload {
        path: path.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::LastActive;

    #[test]
    fn decodes_keyword_and_page() {
        assert_eq!(
            decode_request(KEYWORD_SET, r#"{"keyword":"paris"}"#).unwrap(),
            SearchEvent::SetKeyword {
                keyword: "paris".into()
            }
        );
        assert_eq!(
            decode_request(PAGE_SET, r#"{"pageNumber":3}"#).unwrap(),
            SearchEvent::SetPageNumber { page_number: 3 }
        );
    }

    #[test]
    fn payloadless_paths_ignore_body() {
        assert_eq!(decode_request(KEYWORD_CLEAR, "").unwrap(), SearchEvent::ClearKeyword);
        assert_eq!(decode_request(FILTERS_RESET, "{}").unwrap(), SearchEvent::ResetFilters);
        assert_eq!(decode_request(LOCATION_CLEAR, "null").unwrap(), SearchEvent::ClearLocation);
    }

    #[test]
    fn decodes_location_with_geocode() {
        let e = decode_request(
            LOCATION_SET,
            r#"{"location":{"name":"Paris","bbox":[2.2,48.8,2.5,48.9],"isRegion":false},"zoom":10}"#,
        )
        .unwrap();
        let SearchEvent::SetLocation { location, zoom, center } = e else {
            panic!("expected SetLocation");
        };
        assert_eq!(location.unwrap().bbox, Some(Bbox::new(2.2, 48.8, 2.5, 48.9)));
        assert_eq!(zoom, Some(10.0));
        assert!(center.is_none());
    }

    #[test]
    fn decodes_filters_and_selection() {
        let e = decode_request(FILTERS_APPLY, r#"{"acceptsPets":true,"lastActive":7}"#).unwrap();
        let SearchEvent::ApplyFilters { filters } = e else {
            panic!("expected ApplyFilters");
        };
        assert_eq!(filters.accepts_pets, Some(true));
        assert_eq!(filters.last_active, Some(LastActive::LastWeek));

        assert_eq!(
            decode_request(USER_SELECT, r#"{"userId":null}"#).unwrap(),
            SearchEvent::SelectUser { user_id: None }
        );
    }

    #[test]
    fn decodes_viewport_move() {
        let e = decode_request(
            VIEWPORT_MOVE,
            r#"{"bbox":[0,0,1,1],"center":{"lng":0.5,"lat":0.5},"zoom":8.5}"#,
        )
        .unwrap();
        assert_eq!(
            e,
            SearchEvent::MoveViewportOnly {
                bbox: Some(Bbox::new(0.0, 0.0, 1.0, 1.0)),
                center: Some(LngLat::new(0.5, 0.5)),
                zoom: Some(8.5),
            }
        );
    }

    #[test]
    fn unknown_path_is_an_error() {
        assert!(matches!(
            decode_request("search/everything", "{}"),
            Err(MapSearchError::UnknownRequest(p)) if p == "search/everything"
        ));
    }

    #[test]
    fn malformed_payload_is_an_error() {
        assert!(matches!(
            decode_request(PAGE_SET, r#"{"pageNumber":"two"}"#),
            Err(MapSearchError::MalformedPayload { .. })
        ));
        assert!(matches!(
            decode_request(AREA_BUTTON_SET, "not json"),
            Err(MapSearchError::MalformedPayload { .. })
        ));
    }
}

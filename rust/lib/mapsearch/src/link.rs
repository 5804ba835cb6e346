//! Shareable search links.
//!
//! A link is a URL query string such as
//! `location=Paris&bbox=2.2&bbox=48.8&bbox=2.5&bbox=48.9&numGuests=2`.
//! Multi-valued parameters repeat their key.

use tracing::warn;

use crate::error::MapSearchError;
use crate::filters::{FilterPatch, HostingStatus, LastActive};
use crate::geo::Bbox;
use crate::state::{InitialSearch, SearchMode, SearchState};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SharedLink {
    /// Display name of the searched place.
    pub location: Option<String>,
    pub query: Option<String>,
    pub bbox: Option<Bbox>,
    pub last_active: Option<LastActive>,
    pub num_guests: Option<u32>,
    pub hosting_status: Vec<HostingStatus>,
}

impl SharedLink {
    /// Parse a URL query string, with or without its leading `?`.
    ///
    /// Values that do not parse are dropped; unknown keys are logged and
    /// ignored. Only broken percent-encoding is an error.
    pub fn parse(query: &str) -> Result<Self, MapSearchError> {
        let mut link = SharedLink::default();
        let mut bbox = Vec::new();

        for pair in query.trim_start_matches('?').split('&').filter(|p| !p.is_empty()) {
            let (raw_key, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = decode(raw_key)?;
            let value = decode(raw_value)?;

            match key.as_str() {
                "location" => link.location = non_empty(value).or(link.location),
                "query" => link.query = non_empty(value).or(link.query),
                "lastActive" => {
                    if let Some(bucket) = value.parse().ok().and_then(LastActive::from_days) {
                        link.last_active = Some(bucket);
                    }
                }
                "numGuests" => {
                    if let Ok(n) = value.parse::<u32>() {
                        link.num_guests = (n > 0).then_some(n);
                    }
                }
                "bbox" => {
                    if let Ok(c) = value.parse::<f64>() {
                        bbox.push(c);
                    }
                }
                "hostingStatusOptions" => {
                    if let Some(s) = value.parse().ok().and_then(HostingStatus::from_wire) {
                        link.hosting_status.push(s);
                    }
                }
                other => warn!("unhandled search parameter {} ignored", other),
            }
        }

        link.bbox = Bbox::from_slice(&bbox);
        Ok(link)
    }

    /// Link reproducing the committed parts of `state`.
    pub fn from_state(state: &SearchState) -> Self {
        let mut link = SharedLink {
            last_active: state.filters.last_active,
            num_guests: state.filters.num_guests,
            hosting_status: state.filters.hosting_status.clone().unwrap_or_default(),
            ..SharedLink::default()
        };
        match &state.mode {
            SearchMode::Bbox(b) => {
                link.bbox = Some(*b);
                link.location = state.location_name.clone();
            }
            SearchMode::Keyword(q) => link.query = Some(q.clone()),
            SearchMode::None | SearchMode::SelectedUser(_) => {}
        }
        link
    }

    pub fn to_query(&self) -> String {
        let mut pairs: Vec<(&str, String)> = Vec::new();
        if let Some(l) = &self.location {
            pairs.push(("location", l.clone()));
        }
        if let Some(q) = &self.query {
            pairs.push(("query", q.clone()));
        }
        if let Some(b) = self.bbox {
            pairs.extend(b.to_array().iter().map(|c| ("bbox", c.to_string())));
        }
        if let Some(a) = self.last_active {
            pairs.push(("lastActive", a.days().to_string()));
        }
        if let Some(n) = self.num_guests {
            pairs.push(("numGuests", n.to_string()));
        }
        pairs.extend(
            self.hosting_status
                .iter()
                .map(|s| ("hostingStatusOptions", s.wire().to_string())),
        );

        pairs
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Starting point for a search page opened from this link.
    pub fn into_initial(self) -> InitialSearch {
        InitialSearch {
            bbox: self.bbox,
            keyword: self.query,
            location_name: self.location,
            filters: FilterPatch {
                last_active: self.last_active,
                num_guests: self.num_guests,
                hosting_status: (!self.hosting_status.is_empty()).then_some(self.hosting_status),
                ..FilterPatch::default()
            },
        }
    }
}

fn decode(raw: &str) -> Result<String, MapSearchError> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|s| s.into_owned())
        .map_err(|e| MapSearchError::InvalidLink(format!("{raw}: {e}")))
}

fn non_empty(s: String) -> Option<String> {
    (!s.trim().is_empty()).then_some(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_link() {
        let link = SharedLink::parse(
            "?location=S%C3%A3o+Paulo&bbox=-46.8&bbox=-23.7&bbox=-46.3&bbox=-23.4\
             &lastActive=31&numGuests=2&hostingStatusOptions=2&hostingStatusOptions=3",
        )
        .unwrap();
        assert_eq!(link.location.as_deref(), Some("São Paulo"));
        assert_eq!(link.bbox, Some(Bbox::new(-46.8, -23.7, -46.3, -23.4)));
        assert_eq!(link.last_active, Some(LastActive::LastMonth));
        assert_eq!(link.num_guests, Some(2));
        assert_eq!(
            link.hosting_status,
            vec![HostingStatus::CanHost, HostingStatus::Maybe]
        );
    }

    #[test]
    fn bad_values_are_dropped() {
        let link = SharedLink::parse("bbox=1&bbox=2&bbox=x&lastActive=12&numGuests=0&hostingStatusOptions=9&utm=x")
            .unwrap();
        assert_eq!(link.bbox, None);
        assert_eq!(link.last_active, None);
        assert_eq!(link.num_guests, None);
        assert!(link.hosting_status.is_empty());
    }

    #[test]
    fn broken_encoding_is_an_error() {
        assert!(matches!(
            SharedLink::parse("location=%FF%FE"),
            Err(MapSearchError::InvalidLink(_))
        ));
    }

    #[test]
    fn query_round_trips_through_parse() {
        let link = SharedLink {
            location: Some("Rio & co".into()),
            query: None,
            bbox: Some(Bbox::new(1.5, 2.0, 3.0, 4.25)),
            last_active: Some(LastActive::LastWeek),
            num_guests: None,
            hosting_status: vec![HostingStatus::CantHost],
        };
        let q = link.to_query();
        assert!(q.starts_with("location=Rio%20%26%20co&bbox=1.5&bbox=2&bbox=3&bbox=4.25"));
        assert_eq!(SharedLink::parse(&q).unwrap(), link);
    }

    #[test]
    fn keyword_link_seeds_keyword_search() {
        let initial = SharedLink::parse("query=surfing&numGuests=3").unwrap().into_initial();
        let state = SearchState::initial(&initial);
        assert_eq!(state.mode, SearchMode::Keyword("surfing".into()));
        assert_eq!(state.filters.num_guests, Some(3));
    }

    #[test]
    fn link_from_state() {
        let mut state = SearchState::default();
        state.mode = SearchMode::Keyword("climbing".into());
        state.filters.num_guests = Some(2);
        let link = SharedLink::from_state(&state);
        assert_eq!(link.query.as_deref(), Some("climbing"));
        assert_eq!(link.num_guests, Some(2));
        assert_eq!(link.to_query(), "query=climbing&numGuests=2");
    }

    #[test]
    fn place_name_survives_a_round_trip() {
        let opened = SharedLink::parse("location=Paris&bbox=2.2&bbox=48.8&bbox=2.5&bbox=48.9")
            .unwrap()
            .into_initial();
        let state = SearchState::initial(&opened);
        assert_eq!(state.location_name.as_deref(), Some("Paris"));

        let shared = SharedLink::from_state(&state);
        assert_eq!(shared.location.as_deref(), Some("Paris"));
        assert!(shared.to_query().starts_with("location=Paris&bbox=2.2"));
    }
}

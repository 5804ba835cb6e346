//! Geographic primitives shared by the reducer, the coordinator and the
//! viewport bridge.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Zoom level at or above which the visible area becomes searchable.
pub const SEARCH_ZOOM_THRESHOLD: f64 = 7.0;

/// Closest zoom the map allows.
pub const MAX_ZOOM_LEVEL: f64 = 15.0;

/// Farthest zoom the map allows.
pub const MIN_ZOOM_LEVEL: f64 = 0.0;

/// Zoom level of a freshly created search page.
pub const INITIAL_ZOOM: f64 = 1.0;

/// A longitude/latitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

impl LngLat {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }
}

impl Eq for LngLat {}

// Hashes agree with `==`: adding 0.0 folds -0.0 into 0.0.
impl Hash for LngLat {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.lng + 0.0).to_bits().hash(state);
        (self.lat + 0.0).to_bits().hash(state);
    }
}

/// Bounding box given by its south-west and north-east corners.
///
/// On the wire it is the flat array `[lng_min, lat_min, lng_max, lat_max]`,
/// the same layout map widgets and shared links use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct Bbox {
    pub sw: LngLat,
    pub ne: LngLat,
}

impl Bbox {
    pub fn new(lng_min: f64, lat_min: f64, lng_max: f64, lat_max: f64) -> Self {
        Self {
            sw: LngLat::new(lng_min, lat_min),
            ne: LngLat::new(lng_max, lat_max),
        }
    }

    /// Build from a slice of exactly four coordinates.
    pub fn from_slice(coords: &[f64]) -> Option<Self> {
        match coords {
            [a, b, c, d] => Some(Self::new(*a, *b, *c, *d)),
            _ => None,
        }
    }

    pub fn to_array(self) -> [f64; 4] {
        [self.sw.lng, self.sw.lat, self.ne.lng, self.ne.lat]
    }

    /// The all-zero box some geocoders return for "no area".
    /// It must never be sent as a search constraint.
    pub fn is_degenerate(&self) -> bool {
        self.to_array().iter().all(|c| *c == 0.0)
    }

    /// Midpoint, used as the camera center when a place has none.
    pub fn center(&self) -> LngLat {
        LngLat::new(
            (self.sw.lng + self.ne.lng) / 2.0,
            (self.sw.lat + self.ne.lat) / 2.0,
        )
    }
}

impl From<[f64; 4]> for Bbox {
    fn from(c: [f64; 4]) -> Self {
        Self::new(c[0], c[1], c[2], c[3])
    }
}

impl From<Bbox> for [f64; 4] {
    fn from(b: Bbox) -> Self {
        b.to_array()
    }
}

/// A place returned by the location autocomplete service.
///
/// Every field except the name is optional because the service is external
/// and its answers are not trusted; a result without a bbox cannot drive a
/// search and is ignored by the reducer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeocodeResult {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simplified_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<LngLat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Bbox>,
    #[serde(default)]
    pub is_region: bool,
}

/// True when moving from `prev` to `next` goes from below `threshold` to at
/// or above it.
pub fn crossed_up(prev: f64, next: f64, threshold: f64) -> bool {
    prev < threshold && next >= threshold
}

/// True when moving from `prev` to `next` goes from at or above `threshold`
/// to below it.
pub fn crossed_down(prev: f64, next: f64, threshold: f64) -> bool {
    prev >= threshold && next < threshold
}

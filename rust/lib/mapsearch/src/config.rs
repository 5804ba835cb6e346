use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::coordinator::DEFAULT_PAGE_SIZE;
use crate::error::MapSearchError;
use crate::geo::{MAX_ZOOM_LEVEL, MIN_ZOOM_LEVEL, SEARCH_ZOOM_THRESHOLD};

/// Tunables of the map search engine.
#[derive(Debug, Clone, PartialEq)]
pub struct MapSearchConfig {
    /// Zoom level at which the visible area becomes searchable.
    pub search_zoom: f64,

    /// Results per backend page; drives the "X of Y" counter.
    pub page_size: u32,

    /// Quiet period before a map move is acted on.
    pub debounce_ms: u64,

    /// Largest zoom jump a cluster click may cause.
    pub cluster_zoom_step: f64,

    /// Camera animation length.
    pub ease_ms: u64,

    /// Zoom used when flying to a focused result.
    pub focus_zoom: f64,

    /// Closest zoom the initial fit may reach.
    pub fit_max_zoom: f64,

    /// Padding in pixels around the initial fit.
    pub fit_padding: u32,

    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl Default for MapSearchConfig {
    fn default() -> Self {
        Self {
            search_zoom: SEARCH_ZOOM_THRESHOLD,
            page_size: DEFAULT_PAGE_SIZE,
            debounce_ms: 300,
            cluster_zoom_step: 6.0,
            ease_ms: 2000,
            focus_zoom: MAX_ZOOM_LEVEL,
            fit_max_zoom: 12.0,
            fit_padding: 20,
            min_zoom: MIN_ZOOM_LEVEL,
            max_zoom: MAX_ZOOM_LEVEL,
        }
    }
}

impl MapSearchConfig {
    /// Parse configuration from command-line arguments.
    ///
    /// Supported flags:
    /// - `--search-zoom=Z`
    /// - `--page-size=N`
    /// - `--debounce-ms=MS`
    /// - `--cluster-zoom-step=Z`
    /// - `--ease-ms=MS`
    /// - `--focus-zoom=Z`
    /// - `--fit-max-zoom=Z`
    /// - `--fit-padding=PX`
    /// - `--min-zoom=Z`
    /// - `--max-zoom=Z`
    ///
    /// Unknown flags are ignored; unparsable values keep the default.
    pub fn from_args(args: &[String]) -> Self {
        let mut config = MapSearchConfig::default();

        for arg in args {
            if let Some(val) = arg.strip_prefix("--search-zoom=") {
                set(&mut config.search_zoom, arg, val);
            } else if let Some(val) = arg.strip_prefix("--page-size=") {
                set(&mut config.page_size, arg, val);
            } else if let Some(val) = arg.strip_prefix("--debounce-ms=") {
                set(&mut config.debounce_ms, arg, val);
            } else if let Some(val) = arg.strip_prefix("--cluster-zoom-step=") {
                set(&mut config.cluster_zoom_step, arg, val);
            } else if let Some(val) = arg.strip_prefix("--ease-ms=") {
                set(&mut config.ease_ms, arg, val);
            } else if let Some(val) = arg.strip_prefix("--focus-zoom=") {
                set(&mut config.focus_zoom, arg, val);
            } else if let Some(val) = arg.strip_prefix("--fit-max-zoom=") {
                set(&mut config.fit_max_zoom, arg, val);
            } else if let Some(val) = arg.strip_prefix("--fit-padding=") {
                set(&mut config.fit_padding, arg, val);
            } else if let Some(val) = arg.strip_prefix("--min-zoom=") {
                set(&mut config.min_zoom, arg, val);
            } else if let Some(val) = arg.strip_prefix("--max-zoom=") {
                set(&mut config.max_zoom, arg, val);
            }
        }

        config
    }

    pub fn validate(&self) -> Result<(), MapSearchError> {
        if self.page_size == 0 {
            return Err(MapSearchError::InvalidConfig("page size must be positive".into()));
        }
        if self.min_zoom > self.max_zoom {
            return Err(MapSearchError::InvalidConfig(format!(
                "min zoom {} above max zoom {}",
                self.min_zoom, self.max_zoom
            )));
        }
        if !(self.min_zoom..=self.max_zoom).contains(&self.search_zoom) {
            return Err(MapSearchError::InvalidConfig(format!(
                "search zoom {} outside [{}, {}]",
                self.search_zoom, self.min_zoom, self.max_zoom
            )));
        }
        if self.cluster_zoom_step <= 0.0 {
            return Err(MapSearchError::InvalidConfig("cluster zoom step must be positive".into()));
        }
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn ease(&self) -> Duration {
        Duration::from_millis(self.ease_ms)
    }
}

fn set<T: FromStr>(slot: &mut T, arg: &str, val: &str) {
    match val.parse() {
        Ok(v) => *slot = v,
        Err(_) => warn!("ignoring unparsable flag {}", arg),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MapSearchConfig::default();
        assert_eq!(config.search_zoom, 7.0);
        assert_eq!(config.page_size, 100);
        assert_eq!(config.debounce(), Duration::from_millis(300));
        assert_eq!(config.ease(), Duration::from_millis(2000));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_args() {
        let args = vec![
            "--search-zoom=8".to_string(),
            "--page-size=25".to_string(),
            "--debounce-ms=50".to_string(),
            "--max-zoom=18".to_string(),
            "--unrelated=1".to_string(),
        ];
        let config = MapSearchConfig::from_args(&args);
        assert_eq!(config.search_zoom, 8.0);
        assert_eq!(config.page_size, 25);
        assert_eq!(config.debounce_ms, 50);
        assert_eq!(config.max_zoom, 18.0);
        assert_eq!(config.cluster_zoom_step, 6.0);
    }

    #[test]
    fn test_bad_value_keeps_default() {
        let config = MapSearchConfig::from_args(&["--page-size=lots".to_string()]);
        assert_eq!(config.page_size, 100);
    }

    #[test]
    fn test_validate() {
        let zero = MapSearchConfig {
            page_size: 0,
            ..Default::default()
        };
        assert!(matches!(zero.validate(), Err(MapSearchError::InvalidConfig(_))));

        let inverted = MapSearchConfig {
            min_zoom: 10.0,
            max_zoom: 5.0,
            ..Default::default()
        };
        assert!(inverted.validate().is_err());

        let threshold_out = MapSearchConfig {
            search_zoom: 20.0,
            ..Default::default()
        };
        assert!(threshold_out.validate().is_err());
    }
}

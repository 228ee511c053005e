use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tunables for one scratch session. Read when a session is configured and
/// left untouched while it runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScratchConfig {
    /// Radius of the disc each touch sample erases, in surface pixels.
    pub touch_radius_px: u32,

    /// Fraction of the grid, in `(0, 1]`, that must be scratched before the
    /// threshold fires.
    pub threshold_percent: f64,

    /// Edge length of one coverage cell in surface pixels. Larger cells bound
    /// the grid size on high resolution surfaces.
    pub cell_size_px: u32,

    /// Stop scratching and emit `Cleared` once the threshold is reached.
    pub clear_on_threshold_reached: bool,

    /// Whether `Cleared` asks the host for a fade-out reveal.
    pub fade_on_clear: bool,
}

impl Default for ScratchConfig {
    fn default() -> Self {
        Self {
            touch_radius_px: 30,
            threshold_percent: 0.65,
            cell_size_px: 4,
            clear_on_threshold_reached: true,
            fade_on_clear: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("touch radius must be greater than zero")]
    ZeroTouchRadius,

    #[error("threshold percent {0} is outside (0, 1]")]
    ThresholdOutOfRange(f64),

    #[error("cell size must be greater than zero")]
    ZeroCellSize,

    #[error("surface {width}x{height} has no area")]
    EmptySurface { width: u32, height: u32 },

    #[error("grid of {width}x{height} cells exceeds {max} cells, use a larger cell size")]
    GridTooLarge { width: u32, height: u32, max: u64 },
}

impl ScratchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.touch_radius_px == 0 {
            return Err(ConfigError::ZeroTouchRadius);
        }

        // NaN fails both comparisons and lands here too
        if !(self.threshold_percent > 0.0 && self.threshold_percent <= 1.0) {
            return Err(ConfigError::ThresholdOutOfRange(self.threshold_percent));
        }

        if self.cell_size_px == 0 {
            return Err(ConfigError::ZeroCellSize);
        }

        Ok(())
    }

    /// Touch radius expressed in grid cells.
    pub fn radius_in_cells(&self) -> f64 {
        f64::from(self.touch_radius_px) / f64::from(self.cell_size_px)
    }

    pub fn from_json_str(contents: &str) -> Result<Self> {
        let config: ScratchConfig =
            serde_json::from_str(contents).context("invalid scratch config JSON")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read scratch config from {}", path.display()))?;
        Self::from_json_str(&contents)
            .with_context(|| format!("Failed to load scratch config from {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(ScratchConfig::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_zero_radius() {
        let config = ScratchConfig {
            touch_radius_px: 0,
            ..ScratchConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroTouchRadius));
    }

    #[test]
    fn rejects_threshold_outside_unit_interval() {
        for threshold in [0.0, -0.2, 1.01, f64::NAN] {
            let config = ScratchConfig {
                threshold_percent: threshold,
                ..ScratchConfig::default()
            };
            assert!(matches!(
                config.validate(),
                Err(ConfigError::ThresholdOutOfRange(_))
            ));
        }

        let full = ScratchConfig {
            threshold_percent: 1.0,
            ..ScratchConfig::default()
        };
        assert_eq!(full.validate(), Ok(()));
    }

    #[test]
    fn rejects_zero_cell_size() {
        let config = ScratchConfig {
            cell_size_px: 0,
            ..ScratchConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroCellSize));
    }

    #[test]
    fn radius_is_scaled_by_cell_size() {
        let config = ScratchConfig {
            touch_radius_px: 5,
            cell_size_px: 10,
            ..ScratchConfig::default()
        };
        assert_eq!(config.radius_in_cells(), 0.5);
    }

    #[test]
    fn parses_partial_json_with_defaults() {
        let config =
            ScratchConfig::from_json_str(r#"{"touchRadiusPx": 12, "thresholdPercent": 0.5}"#)
                .unwrap();
        assert_eq!(config.touch_radius_px, 12);
        assert_eq!(config.threshold_percent, 0.5);
        assert_eq!(config.cell_size_px, 4);
        assert!(config.clear_on_threshold_reached);
    }

    #[test]
    fn json_with_invalid_values_is_rejected() {
        let err = ScratchConfig::from_json_str(r#"{"thresholdPercent": 2.0}"#).unwrap_err();
        assert!(err.downcast_ref::<ConfigError>().is_some());
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scratch.json");
        fs::write(
            &path,
            r#"{"cellSizePx": 8, "clearOnThresholdReached": false, "fadeOnClear": false}"#,
        )
        .unwrap();

        let config = ScratchConfig::load(&path).unwrap();
        assert_eq!(config.cell_size_px, 8);
        assert!(!config.clear_on_threshold_reached);
        assert!(!config.fade_on_clear);
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let err = ScratchConfig::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("missing.json"));
    }
}

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::constants::DEFAULT_COLUMNS;
use super::error::ConfigError;

/// Settings of the time tool fit subsystem.
///
/// Every field has a default so a config file only needs to list what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FexSettings {
    /// Prefix of the discrete record names and of the feature cache slots
    pub base_name: String,
    /// Physical address of the camera (or projection source) this module owns
    pub phy: u32,
    /// Veto (bykik) event code. Matched on its absolute value.
    pub event_code_bykik: i32,
    /// Laser code. Positive marks laser-absent shots, negative marks laser-present shots.
    pub event_code_no_laser: i32,
    /// Shift from filtered position to the indicator bin in the subtracted signal plot
    pub indicator_offset: f64,
    /// The detector writes full frames
    pub write_image: bool,
    /// The detector writes projected waveforms
    pub write_projections: bool,
    pub columns: usize,
    /// Frame rows [start, end) summed into the signal
    pub sig_roi: [usize; 2],
    /// Frame rows [start, end) summed into the sideband
    pub sb_roi: [usize; 2],
    pub spec_begin: usize,
    pub spec_end: usize,
    /// Filter kernel applied to the ratio signal
    pub weights: Vec<f64>,
    /// Polynomial coefficients (constant first) converting pixel to ps
    pub calib_poly: Vec<f64>,
    pub ref_convergence: f64,
    pub sb_convergence: f64,
}

impl Default for FexSettings {
    fn default() -> Self {
        Self {
            base_name: String::from("TIMETOOL"),
            phy: 0,
            event_code_bykik: 162,
            event_code_no_laser: 0,
            indicator_offset: 0.0,
            write_image: true,
            write_projections: false,
            columns: DEFAULT_COLUMNS,
            sig_roi: [0, 1024],
            sb_roi: [0, 0],
            spec_begin: 0,
            spec_end: DEFAULT_COLUMNS,
            weights: vec![1.0],
            calib_poly: vec![0.0, 1.0],
            ref_convergence: 1.0,
            sb_convergence: 1.0,
        }
    }
}

impl FexSettings {
    /// Number of filter weights
    pub fn nwts(&self) -> usize {
        self.weights.len()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_name.is_empty() {
            return Err(ConfigError::InvalidSettings(String::from(
                "base_name must not be empty",
            )));
        }
        if self.columns == 0 {
            return Err(ConfigError::InvalidSettings(String::from(
                "columns must be at least 1",
            )));
        }
        if self.sig_roi[0] > self.sig_roi[1] || self.sb_roi[0] > self.sb_roi[1] {
            return Err(ConfigError::InvalidSettings(format!(
                "row windows must be ordered; got sig_roi {:?} sb_roi {:?}",
                self.sig_roi, self.sb_roi
            )));
        }
        if self.spec_begin > self.spec_end || self.spec_end > self.columns {
            return Err(ConfigError::InvalidSettings(format!(
                "spectrum window [{}, {}) does not fit in {} columns",
                self.spec_begin, self.spec_end, self.columns
            )));
        }
        for conv in [self.ref_convergence, self.sb_convergence] {
            if !(conv > 0.0 && conv <= 1.0) {
                return Err(ConfigError::InvalidSettings(format!(
                    "convergence {conv} must be in (0, 1]"
                )));
            }
        }
        Ok(())
    }
}

/// Structure representing the application configuration. Contains the replay stream,
/// an optional summary output and the fit settings.
/// Configs are seralizable and deserializable to YAML using serde and serde_yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub stream_path: PathBuf,
    pub summary_path: Option<PathBuf>,
    #[serde(default)]
    pub fex: FexSettings,
}

impl Default for Config {
    /// Generate a new Config object. Paths will be empty/invalid
    fn default() -> Self {
        Self {
            stream_path: PathBuf::from("None"),
            summary_path: None,
            fex: FexSettings::default(),
        }
    }
}

impl Config {
    /// Read the configuration in a YAML file
    /// Returns a Config if successful
    pub fn read_config_file(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::BadFilePath(config_path.to_path_buf()));
        }

        let yaml_str = std::fs::read_to_string(config_path)?;

        let config = serde_yaml::from_str::<Self>(&yaml_str)?;
        config.fex.validate()?;
        Ok(config)
    }

    pub fn has_summary_path(&self) -> bool {
        self.summary_path.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "stream_path: /data/run_0001.xtc\nsummary_path: null\nfex:\n  base_name: TT01\n  event_code_no_laser: -67\n";
        let config = serde_yaml::from_str::<Config>(yaml).unwrap();
        assert_eq!(config.fex.base_name, "TT01");
        assert_eq!(config.fex.event_code_no_laser, -67);
        assert_eq!(config.fex.columns, DEFAULT_COLUMNS);
        assert!(!config.has_summary_path());
        assert!(config.fex.validate().is_ok());
    }

    #[test]
    fn test_invalid_settings() {
        let mut settings = FexSettings::default();
        settings.spec_end = settings.columns + 1;
        assert!(settings.validate().is_err());

        let mut settings = FexSettings::default();
        settings.base_name.clear();
        assert!(settings.validate().is_err());

        let mut settings = FexSettings::default();
        settings.ref_convergence = 0.0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_missing_file() {
        let path = Path::new("/definitely/not/here/timetool.yml");
        assert!(matches!(
            Config::read_config_file(path),
            Err(ConfigError::BadFilePath(_))
        ));
    }
}

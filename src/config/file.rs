use serde::Deserialize;
use std::path::{Path, PathBuf};

use tsc_pad::calibration::CalibrationPattern;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub input: Option<PathBuf>,
    pub device: Option<String>,
    pub calibration_file: Option<PathBuf>,
    pub max_pressure: Option<i32>,
    pub press_threshold: Option<f64>,
    pub release_distance: Option<f64>,
    pub sample_interval_ms: Option<u64>,
    pub capture_interval_ms: Option<u64>,
    pub capture_threshold: Option<f64>,
    pub screen_width: Option<f64>,
    pub screen_height: Option<f64>,
    pub margin: Option<f64>,
    #[serde(default)]
    pub pattern: CalibrationPattern,
}

pub fn load_from_path(path: &Path) -> Option<FileConfig> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => {
            log::debug!("Loaded config from {}", path.display());
            Some(config)
        }
        Err(e) => {
            log::warn!("Failed to parse {}: {}", path.display(), e);
            None
        }
    }
}

pub fn load_from_default_paths() -> Option<FileConfig> {
    for path in default_config_paths() {
        if path.exists() {
            if let Some(config) = load_from_path(&path) {
                return Some(config);
            }
        }
    }
    None
}

fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("tsc-pad.toml")];

    if let Some(dir) = config_dir() {
        paths.push(dir.join("tsc-pad.toml"));
    }

    paths
}

/// Calibration record location when none is configured.
pub fn default_calibration_path() -> PathBuf {
    config_dir()
        .map(|dir| dir.join("tsc-pad-calibration.toml"))
        .unwrap_or_else(|| PathBuf::from("tsc-pad-calibration.toml"))
}

fn config_dir() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".config"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_partial_file() {
        let config: FileConfig = toml::from_str(
            r#"
input = "/run/tsc2046.fifo"
press_threshold = 0.04
pattern = "seven-point"
"#,
        )
        .unwrap();
        assert_eq!(config.input, Some(PathBuf::from("/run/tsc2046.fifo")));
        assert_eq!(config.press_threshold, Some(0.04));
        assert_eq!(config.pattern, CalibrationPattern::SevenPoint);
        assert!(config.max_pressure.is_none());
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(toml::from_str::<FileConfig>("press_treshold = 0.1").is_err());
    }
}

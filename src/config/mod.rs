mod cli;
mod file;

pub use cli::{Cli, Command};

use std::path::PathBuf;
use std::time::Duration;

use tsc_pad::calibration::{CalibrationPattern, CaptureSettings, ScreenBounds};
use tsc_pad::debounce::DebounceThresholds;
use tsc_pad::device::DeviceProfile;
use tsc_pad::panel::PanelSettings;

use file::FileConfig;

const DEFAULT_SCREEN_WIDTH: f64 = 800.0;
const DEFAULT_SCREEN_HEIGHT: f64 = 480.0;
const DEFAULT_MARGIN: f64 = 50.0;

/// Merged configuration from CLI args, TOML file and the device profile.
#[derive(Debug, Clone)]
pub struct Config {
    /// None reads stdin.
    pub input: Option<PathBuf>,
    pub device: Option<String>,
    pub profile: &'static DeviceProfile,
    pub calibration_file: PathBuf,
    pub max_pressure: i32,
    pub thresholds: DebounceThresholds,
    pub sample_interval: Duration,
    pub capture: CaptureSettings,
    pub bounds: ScreenBounds,
    pub margin: f64,
    pub pattern: CalibrationPattern,
}

impl Config {
    /// Load configuration by merging TOML file with CLI overrides.
    pub fn load(cli: &Cli) -> Self {
        let file_config = cli
            .config
            .as_ref()
            .and_then(|p| file::load_from_path(p))
            .or_else(file::load_from_default_paths)
            .unwrap_or_default();

        Self::merge(cli, file_config)
    }

    fn merge(cli: &Cli, file_config: FileConfig) -> Self {
        let device = cli.device.clone().or(file_config.device);
        let profile = device
            .as_deref()
            .and_then(DeviceProfile::by_name)
            .unwrap_or_else(DeviceProfile::current);
        let defaults = DebounceThresholds::default();

        Self {
            input: cli
                .input
                .clone()
                .or(file_config.input)
                .filter(|p| p.as_os_str() != "-"),
            device,
            profile,
            calibration_file: cli
                .calibration_file
                .clone()
                .or(file_config.calibration_file)
                .unwrap_or_else(file::default_calibration_path),
            max_pressure: cli
                .max_pressure
                .or(file_config.max_pressure)
                .unwrap_or(profile.max_pressure),
            thresholds: DebounceThresholds {
                press_threshold: cli
                    .press_threshold
                    .or(file_config.press_threshold)
                    .unwrap_or(defaults.press_threshold),
                release_distance: cli
                    .release_distance
                    .or(file_config.release_distance)
                    .unwrap_or(defaults.release_distance),
            },
            sample_interval: cli
                .sample_interval_ms
                .or(file_config.sample_interval_ms)
                .map(Duration::from_millis)
                .unwrap_or(profile.sample_interval),
            capture: CaptureSettings {
                interval: cli
                    .capture_interval_ms
                    .or(file_config.capture_interval_ms)
                    .map(Duration::from_millis)
                    .unwrap_or(profile.capture_interval),
                threshold: file_config.capture_threshold.unwrap_or(profile.capture_threshold),
            },
            bounds: ScreenBounds::new(
                cli.screen_width
                    .or(file_config.screen_width)
                    .unwrap_or(DEFAULT_SCREEN_WIDTH),
                cli.screen_height
                    .or(file_config.screen_height)
                    .unwrap_or(DEFAULT_SCREEN_HEIGHT),
            ),
            margin: cli.margin.or(file_config.margin).unwrap_or(DEFAULT_MARGIN),
            pattern: file_config.pattern,
        }
    }

    pub fn panel_settings(&self) -> PanelSettings {
        PanelSettings {
            max_pressure: self.max_pressure,
            noise: self.profile.noise,
            thresholds: self.thresholds,
            sample_interval: self.sample_interval,
            capture: self.capture,
        }
    }

    pub fn describe_input(&self) -> String {
        match &self.input {
            Some(path) => path.display().to_string(),
            None => "stdin".into(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if let Some(name) = &self.device {
            if DeviceProfile::by_name(name).is_none() {
                let known: Vec<_> = DeviceProfile::names().collect();
                return Err(format!("Unknown device '{}'. Known devices: {}", name, known.join(", ")));
            }
        }
        if self.max_pressure <= 0 {
            return Err("max_pressure must be positive".into());
        }
        let press = self.thresholds.press_threshold;
        if !(press > 0.0 && press < 1.0) {
            return Err("press_threshold must lie between 0 and 1".into());
        }
        let release = self.thresholds.release_distance;
        if !(release > 0.0 && release < press) {
            return Err("release_distance must be positive and smaller than press_threshold".into());
        }
        let capture = self.capture.threshold;
        if !(capture > 0.0 && capture < 1.0) {
            return Err("capture_threshold must lie between 0 and 1".into());
        }
        if !(self.bounds.width > 2.0 * self.margin && self.bounds.height > 2.0 * self.margin) {
            return Err("Screen must be larger than twice the calibration margin".into());
        }
        if self.margin < 0.0 {
            return Err("margin must not be negative".into());
        }
        Ok(())
    }
}

mod tsc2046;

use std::time::Duration;

pub use tsc2046::TSC2046;

use crate::denoise::NoiseTolerance;

/// Sensor-specific constants for sampling and calibration.
#[derive(Debug, Clone, Copy)]
pub struct DeviceProfile {
    pub name: &'static str,

    // Raw pressure value that normalises to 1.0
    pub max_pressure: i32,

    pub noise: NoiseTolerance,

    // Tick intervals
    pub sample_interval: Duration,
    pub capture_interval: Duration,

    // Normalised pressure that separates touch from no-touch while capturing
    // calibration points
    pub capture_threshold: f64,
}

const PROFILES: &[&DeviceProfile] = &[&TSC2046];

impl DeviceProfile {
    /// Profile used when none is configured.
    pub fn current() -> &'static Self {
        &TSC2046
    }

    /// Look up a profile by case-insensitive name.
    pub fn by_name(name: &str) -> Option<&'static Self> {
        PROFILES
            .iter()
            .copied()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn names() -> impl Iterator<Item = &'static str> {
        PROFILES.iter().map(|p| p.name)
    }
}

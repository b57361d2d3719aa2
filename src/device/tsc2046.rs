use std::time::Duration;

use super::DeviceProfile;
use crate::denoise::NoiseTolerance;

/// TI TSC2046 4-wire resistive controller: 12-bit positions, 8-bit
/// pressure. Its single-shot conversions are noisy enough that every tick
/// needs the two-read agreement check.
pub const TSC2046: DeviceProfile = DeviceProfile {
    name: "TSC2046",

    max_pressure: 255,

    noise: NoiseTolerance::TSC2046,

    sample_interval: Duration::from_millis(10),
    capture_interval: Duration::from_millis(5),

    capture_threshold: 0.1,
};

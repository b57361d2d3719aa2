use std::thread;
use std::time::Duration;

use super::CalibrationError;
use crate::geometry::Point2D;
use crate::polling::CancelToken;
use crate::sampler::Sampler;
use crate::sensor::TouchSensor;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureSettings {
    /// Delay between samples while waiting on the user.
    pub interval: Duration,
    /// Normalised pressure separating touch from no touch.
    pub threshold: f64,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(5),
            threshold: 0.1,
        }
    }
}

/// Wait for a complete press-and-release and return the raw position last
/// seen before the release.
///
/// Any touch already in progress is waited out first, so a finger still
/// resting from the previous target cannot be recorded for this one. The
/// position keeps updating while pressed, since the first contact point
/// tends to wobble before the finger settles.
pub fn capture_one<S: TouchSensor>(
    sampler: &mut Sampler<S>,
    settings: &CaptureSettings,
    cancel: &CancelToken,
) -> Result<Point2D, CalibrationError> {
    while sampler.pressure() >= settings.threshold {
        next_sample(sampler, settings, cancel)?;
    }

    while sampler.pressure() < settings.threshold {
        next_sample(sampler, settings, cancel)?;
    }

    let mut raw = sampler.raw_position();
    while sampler.pressure() >= settings.threshold {
        raw = sampler.raw_position();
        next_sample(sampler, settings, cancel)?;
    }

    Ok(raw)
}

fn next_sample<S: TouchSensor>(
    sampler: &mut Sampler<S>,
    settings: &CaptureSettings,
    cancel: &CancelToken,
) -> Result<(), CalibrationError> {
    if cancel.is_cancelled() {
        return Err(CalibrationError::Cancelled);
    }
    if !settings.interval.is_zero() {
        thread::sleep(settings.interval);
    }
    sampler.sample()?;
    Ok(())
}

//! The owning handle for one touch panel: its sample path and its active
//! calibration. Applications construct one and pass it around explicitly.

use std::path::Path;
use std::time::Duration;

use chrono::Utc;

use crate::affine::AffineParameters;
use crate::calibration::{CalibrationError, CalibrationPrompt, CalibrationSession, CaptureSettings};
use crate::debounce::DebounceThresholds;
use crate::denoise::{NoiseTolerance, SampleDenoiser};
use crate::device::DeviceProfile;
use crate::matrix::{CalibrationMatrix, SharedCalibration};
use crate::polling::{CancelToken, PointerSink, PollingError, PollingLoop};
use crate::sampler::Sampler;
use crate::sensor::TouchSensor;
use crate::store::{self, StoreError};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelSettings {
    pub max_pressure: i32,
    pub noise: NoiseTolerance,
    pub thresholds: DebounceThresholds,
    pub sample_interval: Duration,
    pub capture: CaptureSettings,
}

impl PanelSettings {
    pub fn from_profile(profile: &DeviceProfile) -> Self {
        Self {
            max_pressure: profile.max_pressure,
            noise: profile.noise,
            thresholds: DebounceThresholds::default(),
            sample_interval: profile.sample_interval,
            capture: CaptureSettings {
                interval: profile.capture_interval,
                threshold: profile.capture_threshold,
            },
        }
    }
}

pub struct TouchPanel<S> {
    sampler: Sampler<S>,
    calibration: SharedCalibration,
    settings: PanelSettings,
}

impl<S: TouchSensor> TouchPanel<S> {
    /// Wrap an already initialised sensor. Starts uncalibrated.
    pub fn new(sensor: S, settings: PanelSettings) -> Self {
        Self {
            sampler: Sampler::new(sensor, SampleDenoiser::new(settings.noise), settings.max_pressure),
            calibration: SharedCalibration::default(),
            settings,
        }
    }

    pub fn settings(&self) -> &PanelSettings {
        &self.settings
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibration.load().is_valid()
    }

    /// Handle for other threads that need to read or replace the calibration.
    pub fn calibration(&self) -> SharedCalibration {
        self.calibration.clone()
    }

    pub fn set_calibration(&self, params: AffineParameters) {
        self.calibration.store(CalibrationMatrix::new(params, Utc::now()));
    }

    /// Adopt a persisted calibration. On any failure the current matrix is
    /// left as it was and `false` is returned.
    pub fn try_load_calibration(&self, path: &Path) -> bool {
        match store::load(path) {
            Ok(matrix) => {
                self.calibration.store(matrix);
                true
            }
            Err(StoreError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No calibration at {}", path.display());
                false
            }
            Err(e) => {
                log::warn!("Ignoring calibration at {}: {}", path.display(), e);
                false
            }
        }
    }

    pub fn save_calibration(&self, path: &Path) -> Result<(), StoreError> {
        store::save(path, &self.calibration.load())
    }

    /// Run a calibration session and adopt its result. The existing matrix
    /// is untouched if the run fails.
    pub fn calibrate(
        &mut self,
        session: &CalibrationSession,
        prompt: &mut impl CalibrationPrompt,
        cancel: &CancelToken,
    ) -> Result<AffineParameters, CalibrationError> {
        let params = session.run(&mut self.sampler, prompt, cancel)?;
        self.set_calibration(params);
        Ok(params)
    }

    /// Sample until cancelled or the sensor fails, dispatching pointer
    /// events to `sink` on the calling thread.
    pub fn run(&mut self, sink: impl PointerSink, cancel: &CancelToken) -> Result<(), PollingError> {
        let mut polling = PollingLoop::new(
            &mut self.sampler,
            self.calibration.clone(),
            self.settings.thresholds,
            self.settings.sample_interval,
        );
        polling.run(sink, cancel)
    }

    /// Raw sample path, for diagnostics.
    pub fn sampler_mut(&mut self) -> &mut Sampler<S> {
        &mut self.sampler
    }

    pub fn into_sensor(self) -> S {
        self.sampler.into_sensor()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::{CalibrationPattern, ScreenBounds};
    use crate::debounce::PointerEventKind;
    use crate::geometry::Point2D;
    use crate::sensor::testing::ScriptedSensor;
    use crate::sensor::RawSample;

    struct SilentPrompt;

    impl CalibrationPrompt for SilentPrompt {
        fn show_target(&mut self, _index: usize, _total: usize, _target: Point2D) {}
    }

    fn fast_settings() -> PanelSettings {
        let mut settings = PanelSettings::from_profile(DeviceProfile::current());
        settings.sample_interval = Duration::ZERO;
        settings.capture.interval = Duration::ZERO;
        settings
    }

    fn scratch(name: &str) -> std::path::PathBuf {
        std::env::temp_dir()
            .join(format!("tsc-pad-panel-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn test_calibrate_then_run() {
        // Four taps for the corners of a 100x100 screen at margin 10, raw = screen * 10,
        // followed by one press to drive through the polling loop.
        let mut samples = Vec::new();
        for (x, y) in [(100, 100), (900, 100), (900, 900), (100, 900)] {
            samples.push(RawSample::new(x, y, 200));
            samples.push(RawSample::new(x, y, 0));
        }
        samples.push(RawSample::new(500, 500, 200));
        samples.push(RawSample::new(500, 500, 0));

        let mut panel = TouchPanel::new(ScriptedSensor::steady(samples), fast_settings());
        assert!(!panel.is_calibrated());

        let session = CalibrationSession::new(
            CalibrationPattern::FourCorners,
            ScreenBounds::new(100.0, 100.0),
            10.0,
            panel.settings().capture,
        );
        let params = panel.calibrate(&session, &mut SilentPrompt, &CancelToken::new()).unwrap();
        assert!(panel.is_calibrated());
        assert!((params.a - 0.1).abs() < 1e-9);

        let mut events = Vec::new();
        let _ = panel.run(&mut events, &CancelToken::new());
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].phase, PointerEventKind::Down);
        assert!((events[0].position.x - 50.0).abs() < 1e-9);
        assert!((events[0].position.y - 50.0).abs() < 1e-9);
        assert_eq!(events[1].phase, PointerEventKind::Up);
    }

    #[test]
    fn test_failed_calibration_keeps_matrix() {
        let samples = [(2000, 2000); 4]
            .iter()
            .flat_map(|&(x, y)| [RawSample::new(x, y, 200), RawSample::new(x, y, 0)])
            .collect::<Vec<_>>();
        let mut panel = TouchPanel::new(ScriptedSensor::steady(samples), fast_settings());
        let previous = AffineParameters {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 0.0,
            e: 1.0,
            f: 0.0,
            residual: 0.0,
        };
        panel.set_calibration(previous);

        let session = CalibrationSession::new(
            CalibrationPattern::FourCorners,
            ScreenBounds::new(100.0, 100.0),
            10.0,
            panel.settings().capture,
        );
        assert!(panel.calibrate(&session, &mut SilentPrompt, &CancelToken::new()).is_err());
        assert_eq!(panel.calibration().load().params().coefficients(), previous.coefficients());
    }

    #[test]
    fn test_load_malformed_leaves_uncalibrated() {
        let path = scratch("broken.toml");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "a = 1.0\nb = 2.0\n").unwrap();

        let panel = TouchPanel::new(ScriptedSensor::new([]), fast_settings());
        assert!(!panel.try_load_calibration(&path));
        assert!(!panel.is_calibrated());
        assert!(!panel.try_load_calibration(&scratch("missing.toml")));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_save_and_reload() {
        let path = scratch("saved.toml");
        let panel = TouchPanel::new(ScriptedSensor::new([]), fast_settings());
        assert!(panel.save_calibration(&path).is_err());

        panel.set_calibration(AffineParameters {
            a: 0.2,
            b: 0.0,
            c: -10.0,
            d: 0.0,
            e: 0.15,
            f: -5.0,
            residual: 0.4,
        });
        panel.save_calibration(&path).unwrap();

        let other = TouchPanel::new(ScriptedSensor::new([]), fast_settings());
        assert!(other.try_load_calibration(&path));
        assert_eq!(
            other.calibration().load().params().coefficients(),
            panel.calibration().load().params().coefficients()
        );
        let _ = std::fs::remove_file(&path);
    }
}

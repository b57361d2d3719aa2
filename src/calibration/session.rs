use super::{capture_one, CalibrationError, CalibrationPattern, CalibrationPrompt, CaptureSettings, ScreenBounds};
use crate::affine::{self, AffineParameters};
use crate::geometry::{unzip_pairs, CalibrationPair};
use crate::polling::CancelToken;
use crate::sampler::Sampler;
use crate::sensor::TouchSensor;

/// One calibration run over a fixed point pattern.
#[derive(Debug, Clone)]
pub struct CalibrationSession {
    pub pattern: CalibrationPattern,
    pub bounds: ScreenBounds,
    pub margin: f64,
    pub capture: CaptureSettings,
}

impl CalibrationSession {
    pub fn new(pattern: CalibrationPattern, bounds: ScreenBounds, margin: f64, capture: CaptureSettings) -> Self {
        Self {
            pattern,
            bounds,
            margin,
            capture,
        }
    }

    /// Prompt for and capture every reference point in order, then solve.
    ///
    /// Nothing is applied here; the caller decides whether to adopt the
    /// returned parameters.
    pub fn run<S: TouchSensor>(
        &self,
        sampler: &mut Sampler<S>,
        prompt: &mut impl CalibrationPrompt,
        cancel: &CancelToken,
    ) -> Result<AffineParameters, CalibrationError> {
        let result = self.collect(sampler, prompt, cancel).and_then(|pairs| {
            let (references, measured) = unzip_pairs(&pairs);
            affine::solve(&references, &measured).map_err(CalibrationError::from)
        });
        prompt.finish();

        match &result {
            Ok(params) => log::info!(
                "Calibration solved from {} points (residual {:.3} px)",
                self.pattern.point_count(),
                params.residual
            ),
            Err(e) => log::warn!("Calibration failed: {}", e),
        }
        result
    }

    fn collect<S: TouchSensor>(
        &self,
        sampler: &mut Sampler<S>,
        prompt: &mut impl CalibrationPrompt,
        cancel: &CancelToken,
    ) -> Result<Vec<CalibrationPair>, CalibrationError> {
        let targets = self.pattern.reference_points(self.bounds, self.margin);
        let total = targets.len();
        let mut pairs = Vec::with_capacity(total);

        for (index, target) in targets.into_iter().enumerate() {
            prompt.show_target(index, total, target);
            let measured = capture_one(sampler, &self.capture, cancel)?;
            log::info!(
                "Point {}/{}: screen ({:.0}, {:.0}) <- raw ({:.0}, {:.0})",
                index + 1,
                total,
                target.x,
                target.y,
                measured.x,
                measured.y
            );
            pairs.push(CalibrationPair::new(target, measured));
        }
        Ok(pairs)
    }
}

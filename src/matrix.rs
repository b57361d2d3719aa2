//! The active calibration and the raw-to-screen mapping that uses it.
//!
//! A `CalibrationMatrix` is either fully valid (six finite coefficients) or
//! fully invalid (six NaNs). The sampling loop reads it every tick while the
//! calibration flow replaces it at the end of a run, so it is shared as an
//! immutable snapshot behind `SharedCalibration` and swapped whole.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use crate::affine::AffineParameters;
use crate::geometry::Point2D;

#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationMatrix {
    params: AffineParameters,
    last_updated: Option<DateTime<Utc>>,
}

impl CalibrationMatrix {
    /// The uncalibrated state: every coefficient is NaN.
    pub fn invalid() -> Self {
        Self {
            params: AffineParameters {
                a: f64::NAN,
                b: f64::NAN,
                c: f64::NAN,
                d: f64::NAN,
                e: f64::NAN,
                f: f64::NAN,
                residual: f64::NAN,
            },
            last_updated: None,
        }
    }

    /// Build from solved or loaded parameters. Any non-finite coefficient
    /// yields the invalid matrix rather than a partially usable one.
    pub fn new(params: AffineParameters, last_updated: DateTime<Utc>) -> Self {
        if params.coefficients().iter().any(|v| !v.is_finite()) {
            return Self::invalid();
        }
        Self {
            params,
            last_updated: Some(last_updated),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.params.coefficients().iter().all(|v| v.is_finite())
    }

    pub fn params(&self) -> &AffineParameters {
        &self.params
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    /// Map a raw sensor point to screen coordinates, or `(NaN, NaN)` when
    /// uncalibrated.
    pub fn transform(&self, raw: Point2D) -> Point2D {
        if !self.is_valid() {
            return Point2D::NAN;
        }
        self.params.transform(raw)
    }
}

impl Default for CalibrationMatrix {
    fn default() -> Self {
        Self::invalid()
    }
}

/// Free-function form of [`CalibrationMatrix::transform`].
pub fn transform(matrix: &CalibrationMatrix, raw: Point2D) -> Point2D {
    matrix.transform(raw)
}

/// Calibration shared between the sampling loop and the calibration flow.
///
/// Readers take an `Arc` to the current snapshot; writers replace the
/// snapshot. The lock only guards the pointer swap, never a sensor read.
#[derive(Debug, Clone, Default)]
pub struct SharedCalibration {
    current: Arc<RwLock<Arc<CalibrationMatrix>>>,
}

impl SharedCalibration {
    pub fn new(matrix: CalibrationMatrix) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(matrix))),
        }
    }

    pub fn load(&self) -> Arc<CalibrationMatrix> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&*guard),
            Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
        }
    }

    pub fn store(&self, matrix: CalibrationMatrix) {
        let next = Arc::new(matrix);
        match self.current.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }
}

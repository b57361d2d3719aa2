//! Plain 2D points shared by the raw sensor space and the calibrated screen space.

use serde::{Deserialize, Serialize};

/// A point in either raw sensor units or screen pixels.
///
/// Which space a value lives in is decided by the pipeline stage that
/// produced it. A NaN coordinate means "no position available".
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub const NAN: Point2D = Point2D {
        x: f64::NAN,
        y: f64::NAN,
    };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// True when both coordinates are usable numbers.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn distance_squared(&self, other: Point2D) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

/// One prompted screen location and the raw reading captured for it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPair {
    pub reference: Point2D,
    pub measured: Point2D,
}

impl CalibrationPair {
    pub fn new(reference: Point2D, measured: Point2D) -> Self {
        Self {
            reference,
            measured,
        }
    }
}

/// Split pairs into the index-aligned sequences the solver takes.
pub fn unzip_pairs(pairs: &[CalibrationPair]) -> (Vec<Point2D>, Vec<Point2D>) {
    pairs.iter().map(|p| (p.reference, p.measured)).unzip()
}

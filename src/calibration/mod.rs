//! Interactive calibration: prompt for touches at known screen points,
//! capture the raw reading for each, then fit the affine transform.

mod capture;
mod session;

pub use capture::{capture_one, CaptureSettings};
pub use session::CalibrationSession;

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

use crate::affine::SolveError;
use crate::geometry::Point2D;
use crate::sensor::SensorError;

/// Which reference points to collect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CalibrationPattern {
    /// The four corners.
    FourCorners,
    /// Four corners plus the screen centre.
    #[default]
    CornersAndCenter,
    /// Corners, top and bottom edge midpoints, and the centre.
    SevenPoint,
}

impl CalibrationPattern {
    pub fn point_count(&self) -> usize {
        match self {
            CalibrationPattern::FourCorners => 4,
            CalibrationPattern::CornersAndCenter => 5,
            CalibrationPattern::SevenPoint => 7,
        }
    }

    /// Reference points in prompt order: clockwise from top-left around the
    /// edge, centre last. Corners sit `margin` pixels in from each edge.
    pub fn reference_points(&self, bounds: ScreenBounds, margin: f64) -> Vec<Point2D> {
        let seven = *self == CalibrationPattern::SevenPoint;
        let left = margin;
        let top = margin;
        let right = bounds.width - margin;
        let bottom = bounds.height - margin;
        let mid_x = bounds.width * 0.5;

        let mut points = Vec::with_capacity(self.point_count());
        points.push(Point2D::new(left, top));
        if seven {
            points.push(Point2D::new(mid_x, top));
        }
        points.push(Point2D::new(right, top));
        points.push(Point2D::new(right, bottom));
        if seven {
            points.push(Point2D::new(mid_x, bottom));
        }
        points.push(Point2D::new(left, bottom));
        if *self != CalibrationPattern::FourCorners {
            points.push(Point2D::new(mid_x, bounds.height * 0.5));
        }
        points
    }
}

impl fmt::Display for CalibrationPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalibrationPattern::FourCorners => write!(f, "four-corners"),
            CalibrationPattern::CornersAndCenter => write!(f, "corners-and-center"),
            CalibrationPattern::SevenPoint => write!(f, "seven-point"),
        }
    }
}

impl FromStr for CalibrationPattern {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "4" | "four-corners" | "four_corners" | "fourcorners" => Ok(CalibrationPattern::FourCorners),
            "5" | "corners-and-center" | "corners_and_center" | "cornersandcenter" => {
                Ok(CalibrationPattern::CornersAndCenter)
            }
            "7" | "seven-point" | "seven_point" | "sevenpoint" => Ok(CalibrationPattern::SevenPoint),
            _ => Err(format!(
                "Invalid calibration pattern '{}'. Valid values: four-corners, corners-and-center, seven-point",
                s
            )),
        }
    }
}

/// Screen size in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenBounds {
    pub width: f64,
    pub height: f64,
}

impl ScreenBounds {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Shows the user where to touch next. Called once per reference point,
/// before that point is captured.
pub trait CalibrationPrompt {
    fn show_target(&mut self, index: usize, total: usize, target: Point2D);

    /// Called once after the last point was captured or the run failed.
    fn finish(&mut self) {}
}

#[derive(Debug, thiserror::Error)]
pub enum CalibrationError {
    #[error(transparent)]
    Sensor(#[from] SensorError),

    #[error(transparent)]
    Solve(#[from] SolveError),

    #[error("calibration cancelled")]
    Cancelled,
}

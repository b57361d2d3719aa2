//! Core of a resistive touch panel driver: turns raw controller samples into
//! calibrated, debounced pointer events, and fits the raw-to-screen affine
//! calibration from touched reference points.
//!
//! The controller bus is a collaborator behind [`sensor::TouchSensor`];
//! pointer delivery is a collaborator behind [`polling::PointerSink`].

pub mod affine;
pub mod calibration;
pub mod debounce;
pub mod denoise;
pub mod device;
pub mod geometry;
pub mod matrix;
pub mod panel;
pub mod polling;
pub mod sampler;
pub mod sensor;
pub mod store;

pub use affine::{solve, AffineParameters, SolveError};
pub use debounce::{PointerEvent, PointerEventKind, PointerPhase};
pub use geometry::{CalibrationPair, Point2D};
pub use matrix::{transform, CalibrationMatrix, SharedCalibration};
pub use panel::{PanelSettings, TouchPanel};
pub use polling::{CancelToken, PointerSink};
pub use sensor::{RawSample, SensorError, TouchSensor};

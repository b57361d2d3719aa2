//! Pressure hysteresis: turns a continuous pressure signal into pointer
//! transitions.
//!
//! Entering `Down` needs `p > press_threshold`; leaving it needs
//! `p < press_threshold - release_distance`. Between the two nothing
//! changes, which absorbs finger-pressure jitter around the press point.

use crate::geometry::Point2D;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerPhase {
    #[default]
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEventKind {
    Down,
    Move,
    Up,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub phase: PointerEventKind,
    /// Screen position, NaN when no calibration is active.
    pub position: Point2D,
    /// Normalised pressure in [0, 1].
    pub pressure: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebounceThresholds {
    pub press_threshold: f64,
    pub release_distance: f64,
}

impl DebounceThresholds {
    pub const DEFAULT_PRESS: f64 = 5.0 / 255.0;
    pub const DEFAULT_RELEASE_DISTANCE: f64 = 3.0 / 255.0;

    pub fn release_threshold(&self) -> f64 {
        self.press_threshold - self.release_distance
    }
}

impl Default for DebounceThresholds {
    fn default() -> Self {
        Self {
            press_threshold: Self::DEFAULT_PRESS,
            release_distance: Self::DEFAULT_RELEASE_DISTANCE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PointerDebouncer {
    thresholds: DebounceThresholds,
    phase: PointerPhase,
}

impl PointerDebouncer {
    pub fn new(thresholds: DebounceThresholds) -> Self {
        Self {
            thresholds,
            phase: PointerPhase::Up,
        }
    }

    pub fn phase(&self) -> PointerPhase {
        self.phase
    }

    pub fn thresholds(&self) -> DebounceThresholds {
        self.thresholds
    }

    /// Evaluate one tick. `Move` is produced on every pressed tick, not only
    /// when the position changed.
    pub fn update(&mut self, pressure: f64, position: Point2D) -> Option<PointerEvent> {
        let phase = match self.phase {
            PointerPhase::Up if pressure > self.thresholds.press_threshold => {
                self.phase = PointerPhase::Down;
                PointerEventKind::Down
            }
            PointerPhase::Down if pressure > self.thresholds.press_threshold => PointerEventKind::Move,
            PointerPhase::Down if pressure < self.thresholds.release_threshold() => {
                self.phase = PointerPhase::Up;
                PointerEventKind::Up
            }
            _ => return None,
        };

        Some(PointerEvent {
            phase,
            position,
            pressure,
        })
    }

    /// Force the state back to `Up`, returning the release event if a
    /// press was in progress.
    pub fn reset(&mut self, position: Point2D) -> Option<PointerEvent> {
        if self.phase == PointerPhase::Up {
            return None;
        }
        self.phase = PointerPhase::Up;
        Some(PointerEvent {
            phase: PointerEventKind::Up,
            position,
            pressure: 0.0,
        })
    }
}

impl Default for PointerDebouncer {
    fn default() -> Self {
        Self::new(DebounceThresholds::default())
    }
}

//! Two-read agreement filter for resistive panel ADC noise.

use serde::Deserialize;

use crate::sensor::RawSample;

/// Maximum disagreement between two back-to-back reads that still counts
/// as a clean sample. Strict upper bounds, in sensor-native units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct NoiseTolerance {
    pub position: i32,
    pub pressure: i32,
}

impl NoiseTolerance {
    pub const TSC2046: NoiseTolerance = NoiseTolerance {
        position: 40,
        pressure: 10,
    };
}

impl Default for NoiseTolerance {
    fn default() -> Self {
        Self::TSC2046
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SampleDenoiser {
    tolerance: NoiseTolerance,
}

impl SampleDenoiser {
    pub fn new(tolerance: NoiseTolerance) -> Self {
        Self { tolerance }
    }

    pub fn tolerance(&self) -> NoiseTolerance {
        self.tolerance
    }

    /// Returns `second` when both reads agree, otherwise keeps `prev`.
    ///
    /// The first read of a pair carries more settling noise, so the second
    /// one is the value kept.
    pub fn accept(&self, prev: RawSample, first: RawSample, second: RawSample) -> RawSample {
        if self.agrees(first, second) {
            second
        } else {
            log::trace!("noise rejected: {:?} vs {:?}", first, second);
            prev
        }
    }

    fn agrees(&self, first: RawSample, second: RawSample) -> bool {
        abs_diff(first.x, second.x) < self.tolerance.position as i64
            && abs_diff(first.y, second.y) < self.tolerance.position as i64
            && abs_diff(first.pressure, second.pressure) < self.tolerance.pressure as i64
    }
}

fn abs_diff(a: i32, b: i32) -> i64 {
    (a as i64 - b as i64).abs()
}

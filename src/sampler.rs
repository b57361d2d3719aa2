//! The raw sample path: two reads per tick through the denoiser, with the
//! last accepted sample kept as the fallback for rejected ticks.
//!
//! The controller reports a zero coordinate once the finger has lifted, so
//! an accepted sample without a positive position only updates pressure.
//!
//! Both the polling loop and calibration capture sample through here, and
//! both borrow it mutably, so only one of them can be sampling at a time.

use crate::denoise::SampleDenoiser;
use crate::geometry::Point2D;
use crate::sensor::{RawSample, SensorError, TouchSensor};

pub struct Sampler<S> {
    sensor: S,
    denoiser: SampleDenoiser,
    max_pressure: i32,
    last: RawSample,
}

impl<S: TouchSensor> Sampler<S> {
    pub fn new(sensor: S, denoiser: SampleDenoiser, max_pressure: i32) -> Self {
        Self {
            sensor,
            denoiser,
            max_pressure: max_pressure.max(1),
            last: RawSample::default(),
        }
    }

    /// Take one tick's worth of reads and return the accepted sample.
    pub fn sample(&mut self) -> Result<RawSample, SensorError> {
        let first = self.sensor.read_sample()?;
        let second = self.sensor.read_sample()?;
        let accepted = self.denoiser.accept(self.last, first, second);
        self.last = if accepted.x > 0 && accepted.y > 0 {
            accepted
        } else {
            RawSample {
                pressure: accepted.pressure,
                ..self.last
            }
        };
        Ok(self.last)
    }

    pub fn last(&self) -> RawSample {
        self.last
    }

    pub fn raw_position(&self) -> Point2D {
        self.last.position()
    }

    /// Pressure of the last accepted sample scaled to [0, 1].
    pub fn pressure(&self) -> f64 {
        self.normalize(self.last.pressure)
    }

    pub fn normalize(&self, raw_pressure: i32) -> f64 {
        raw_pressure as f64 / self.max_pressure as f64
    }

    pub fn into_sensor(self) -> S {
        self.sensor
    }
}

//! Raw samples and the sensor read seam.
//!
//! The bus collaborator owns the chip protocol; the core only needs one
//! synchronous read that may be called several times per tick.

mod stream;

pub use stream::{parse_raw_sample, StreamSensor, RAW_SAMPLE_SIZE};

/// One sensor read in sensor-native units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawSample {
    pub x: i32,
    pub y: i32,
    pub pressure: i32,
}

impl RawSample {
    pub const fn new(x: i32, y: i32, pressure: i32) -> Self {
        Self { x, y, pressure }
    }

    pub fn position(&self) -> crate::geometry::Point2D {
        crate::geometry::Point2D::new(self.x as f64, self.y as f64)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    #[error("sensor read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("sensor stream closed")]
    Disconnected,
}

/// A source of raw touch samples.
pub trait TouchSensor {
    fn read_sample(&mut self) -> Result<RawSample, SensorError>;
}

impl<S: TouchSensor + ?Sized> TouchSensor for &mut S {
    fn read_sample(&mut self) -> Result<RawSample, SensorError> {
        (**self).read_sample()
    }
}

impl<S: TouchSensor + ?Sized> TouchSensor for Box<S> {
    fn read_sample(&mut self) -> Result<RawSample, SensorError> {
        (**self).read_sample()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;

    use super::*;

    /// Plays back a fixed list of reads, then reports a closed stream.
    pub struct ScriptedSensor {
        reads: VecDeque<RawSample>,
        pub reads_taken: usize,
    }

    impl ScriptedSensor {
        pub fn new(reads: impl IntoIterator<Item = RawSample>) -> Self {
            Self {
                reads: reads.into_iter().collect(),
                reads_taken: 0,
            }
        }

        /// Each sample repeated twice so the two-read denoiser accepts it.
        pub fn steady(samples: impl IntoIterator<Item = RawSample>) -> Self {
            Self::new(samples.into_iter().flat_map(|s| [s, s]))
        }
    }

    impl TouchSensor for ScriptedSensor {
        fn read_sample(&mut self) -> Result<RawSample, SensorError> {
            let sample = self.reads.pop_front().ok_or(SensorError::Disconnected)?;
            self.reads_taken += 1;
            Ok(sample)
        }
    }
}

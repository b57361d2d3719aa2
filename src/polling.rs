//! Periodic sampling loop: sample, map, debounce, dispatch.
//!
//! Each tick finishes its computation before the next read is issued, and
//! events are only dispatched after a tick completes. Cancellation is
//! checked at the top of every iteration.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::SyncSender;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::debounce::{DebounceThresholds, PointerDebouncer, PointerEvent};
use crate::matrix::SharedCalibration;
use crate::sampler::Sampler;
use crate::sensor::{SensorError, TouchSensor};

/// Cooperative cancellation flag shared between a loop and its owner.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("pointer event consumer disconnected")]
pub struct SinkClosed;

/// Receives pointer events on the sampling loop's thread. Must not block
/// for long: a slow sink delays the next tick.
pub trait PointerSink {
    fn dispatch(&mut self, event: PointerEvent) -> Result<(), SinkClosed>;
}

impl PointerSink for Vec<PointerEvent> {
    fn dispatch(&mut self, event: PointerEvent) -> Result<(), SinkClosed> {
        self.push(event);
        Ok(())
    }
}

/// Bounded channel sink. Ordering is kept; a full channel applies
/// back-pressure to the loop instead of dropping a transition.
impl PointerSink for SyncSender<PointerEvent> {
    fn dispatch(&mut self, event: PointerEvent) -> Result<(), SinkClosed> {
        self.send(event).map_err(|_| SinkClosed)
    }
}

impl<T: PointerSink + ?Sized> PointerSink for &mut T {
    fn dispatch(&mut self, event: PointerEvent) -> Result<(), SinkClosed> {
        (**self).dispatch(event)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PollingError {
    #[error(transparent)]
    Sensor(#[from] SensorError),

    #[error(transparent)]
    Sink(#[from] SinkClosed),
}

pub struct PollingLoop<'a, S> {
    sampler: &'a mut Sampler<S>,
    calibration: SharedCalibration,
    debouncer: PointerDebouncer,
    interval: Duration,
    ticks: u64,
    warned_uncalibrated: bool,
}

impl<'a, S: TouchSensor> PollingLoop<'a, S> {
    pub fn new(
        sampler: &'a mut Sampler<S>,
        calibration: SharedCalibration,
        thresholds: DebounceThresholds,
        interval: Duration,
    ) -> Self {
        Self {
            sampler,
            calibration,
            debouncer: PointerDebouncer::new(thresholds),
            interval,
            ticks: 0,
            warned_uncalibrated: false,
        }
    }

    /// One complete tick. Returns the pointer transition it produced, if any.
    pub fn tick(&mut self) -> Result<Option<PointerEvent>, SensorError> {
        let sample = self.sampler.sample()?;
        let matrix = self.calibration.load();
        if !matrix.is_valid() && !self.warned_uncalibrated {
            log::warn!("No calibration active, pointer positions will be NaN");
            self.warned_uncalibrated = true;
        }
        let position = matrix.transform(sample.position());
        let event = self.debouncer.update(self.sampler.pressure(), position);
        self.log_progress();
        Ok(event)
    }

    /// Tick until cancelled, dispatching events to `sink`.
    ///
    /// A pointer still held down when the loop stops is released with a
    /// final `Up` so consumers never see a stuck press.
    pub fn run(&mut self, mut sink: impl PointerSink, cancel: &CancelToken) -> Result<(), PollingError> {
        let result = self.run_ticks(&mut sink, cancel);

        let last = self.calibration.load().transform(self.sampler.raw_position());
        if let Some(up) = self.debouncer.reset(last) {
            // The sink may already be gone; the release is best effort.
            let _ = sink.dispatch(up);
        }
        result
    }

    fn run_ticks(&mut self, sink: &mut impl PointerSink, cancel: &CancelToken) -> Result<(), PollingError> {
        while !cancel.is_cancelled() {
            let started = Instant::now();
            if let Some(event) = self.tick()? {
                sink.dispatch(event)?;
            }
            let remaining = self.interval.saturating_sub(started.elapsed());
            if !remaining.is_zero() {
                thread::sleep(remaining);
            }
        }
        log::info!("Sampling stopped after {} ticks", self.ticks);
        Ok(())
    }

    pub fn phase(&self) -> crate::debounce::PointerPhase {
        self.debouncer.phase()
    }

    fn log_progress(&mut self) {
        if self.ticks == 0 {
            log::info!("Touch samples flowing");
        }
        self.ticks += 1;

        if self.ticks.is_multiple_of(500) {
            log::debug!(
                "Ticks: {}, phase: {:?}, raw: {:?}",
                self.ticks,
                self.debouncer.phase(),
                self.sampler.last()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use chrono::Utc;

    use super::*;
    use crate::affine::AffineParameters;
    use crate::debounce::{PointerEventKind, PointerPhase};
    use crate::denoise::SampleDenoiser;
    use crate::geometry::Point2D;
    use crate::matrix::CalibrationMatrix;
    use crate::sensor::testing::ScriptedSensor;
    use crate::sensor::RawSample;

    fn halving() -> CalibrationMatrix {
        CalibrationMatrix::new(
            AffineParameters {
                a: 0.5,
                b: 0.0,
                c: 0.0,
                d: 0.0,
                e: 0.5,
                f: 0.0,
                residual: 0.0,
            },
            Utc::now(),
        )
    }

    fn press_sequence() -> Vec<RawSample> {
        vec![
            RawSample::new(0, 0, 0),
            RawSample::new(1000, 2000, 8),
            RawSample::new(1004, 2002, 8),
            RawSample::new(1006, 2004, 4),
            RawSample::new(1006, 2004, 0),
        ]
    }

    #[test]
    fn test_tick_maps_and_debounces() {
        let mut sampler = Sampler::new(ScriptedSensor::steady(press_sequence()), SampleDenoiser::default(), 255);
        let calibration = SharedCalibration::new(halving());
        let mut polling = PollingLoop::new(&mut sampler, calibration, DebounceThresholds::default(), Duration::ZERO);

        assert_eq!(polling.tick().unwrap(), None);
        let down = polling.tick().unwrap().unwrap();
        assert_eq!(down.phase, PointerEventKind::Down);
        assert_eq!(down.position, Point2D::new(500.0, 1000.0));
        assert_eq!(polling.tick().unwrap().map(|e| e.phase), Some(PointerEventKind::Move));
        // 4/255 sits in the dead band.
        assert_eq!(polling.tick().unwrap(), None);
        assert_eq!(polling.phase(), PointerPhase::Down);
        let up = polling.tick().unwrap().unwrap();
        assert_eq!(up.phase, PointerEventKind::Up);
        assert_eq!(up.position, Point2D::new(503.0, 1002.0));
    }

    #[test]
    fn test_uncalibrated_positions_are_nan() {
        let mut sampler = Sampler::new(ScriptedSensor::steady(press_sequence()), SampleDenoiser::default(), 255);
        let mut polling = PollingLoop::new(
            &mut sampler,
            SharedCalibration::default(),
            DebounceThresholds::default(),
            Duration::ZERO,
        );
        polling.tick().unwrap();
        let down = polling.tick().unwrap().unwrap();
        assert!(!down.position.is_finite());
    }

    #[test]
    fn test_calibration_swap_seen_next_tick() {
        let mut sampler = Sampler::new(ScriptedSensor::steady(press_sequence()), SampleDenoiser::default(), 255);
        let calibration = SharedCalibration::default();
        let mut polling = PollingLoop::new(&mut sampler, calibration.clone(), DebounceThresholds::default(), Duration::ZERO);

        polling.tick().unwrap();
        assert!(!polling.tick().unwrap().unwrap().position.is_finite());
        calibration.store(halving());
        assert_eq!(polling.tick().unwrap().unwrap().position, Point2D::new(502.0, 1001.0));
    }

    #[test]
    fn test_run_stops_on_sensor_end_and_releases() {
        let samples = vec![RawSample::new(100, 100, 0), RawSample::new(100, 100, 200)];
        let mut sampler = Sampler::new(ScriptedSensor::steady(samples), SampleDenoiser::default(), 255);
        let mut polling = PollingLoop::new(
            &mut sampler,
            SharedCalibration::new(halving()),
            DebounceThresholds::default(),
            Duration::ZERO,
        );
        let mut events = Vec::new();
        let result = polling.run(&mut events, &CancelToken::new());

        assert!(matches!(result, Err(PollingError::Sensor(SensorError::Disconnected))));
        let kinds: Vec<_> = events.iter().map(|e| e.phase).collect();
        assert_eq!(kinds, vec![PointerEventKind::Down, PointerEventKind::Up]);
        assert_eq!(events[1].position, Point2D::new(50.0, 50.0));
    }

    #[test]
    fn test_release_reports_last_touched_position() {
        let samples = vec![RawSample::new(2000, 2000, 200), RawSample::new(0, 0, 0)];
        let mut sampler = Sampler::new(ScriptedSensor::steady(samples), SampleDenoiser::default(), 255);
        let mut polling = PollingLoop::new(
            &mut sampler,
            SharedCalibration::new(halving()),
            DebounceThresholds::default(),
            Duration::ZERO,
        );

        let down = polling.tick().unwrap().unwrap();
        let up = polling.tick().unwrap().unwrap();
        assert_eq!(up.phase, PointerEventKind::Up);
        assert_eq!(up.position, down.position);
        assert_eq!(up.position, Point2D::new(1000.0, 1000.0));
    }

    #[test]
    fn test_cancelled_before_start_reads_nothing() {
        let mut sampler = Sampler::new(ScriptedSensor::steady(press_sequence()), SampleDenoiser::default(), 255);
        let cancel = CancelToken::new();
        cancel.cancel();
        {
            let mut polling = PollingLoop::new(
                &mut sampler,
                SharedCalibration::default(),
                DebounceThresholds::default(),
                Duration::ZERO,
            );
            let mut events = Vec::new();
            polling.run(&mut events, &cancel).unwrap();
            assert!(events.is_empty());
        }
        assert_eq!(sampler.into_sensor().reads_taken, 0);
    }

    #[test]
    fn test_channel_sink_keeps_order_and_reports_close() {
        let (tx, rx) = mpsc::sync_channel(16);
        let mut sampler = Sampler::new(ScriptedSensor::steady(press_sequence()), SampleDenoiser::default(), 255);
        let mut polling = PollingLoop::new(
            &mut sampler,
            SharedCalibration::new(halving()),
            DebounceThresholds::default(),
            Duration::ZERO,
        );
        let _ = polling.run(tx, &CancelToken::new());

        let kinds: Vec<_> = rx.iter().map(|e| e.phase).collect();
        assert_eq!(
            kinds,
            vec![PointerEventKind::Down, PointerEventKind::Move, PointerEventKind::Up]
        );

        let (mut closed, rx) = mpsc::sync_channel::<PointerEvent>(1);
        drop(rx);
        let event = PointerEvent {
            phase: PointerEventKind::Down,
            position: Point2D::NAN,
            pressure: 1.0,
        };
        assert!(closed.dispatch(event).is_err());
    }
}

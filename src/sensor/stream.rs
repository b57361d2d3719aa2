//! Raw samples delivered as fixed-size records over any byte stream
//! (a FIFO or pipe fed by the bus helper, a capture file, stdin).

use std::io::{ErrorKind, Read};

use super::{RawSample, SensorError, TouchSensor};

/// x, y, pressure as little-endian i32.
pub const RAW_SAMPLE_SIZE: usize = 12;

/// Parse one record. Returns None if the buffer is too short.
pub fn parse_raw_sample(buf: &[u8]) -> Option<RawSample> {
    if buf.len() < RAW_SAMPLE_SIZE {
        return None;
    }
    let x = i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
    let y = i32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
    let pressure = i32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]);
    Some(RawSample::new(x, y, pressure))
}

pub struct StreamSensor<R> {
    reader: R,
    buf: [u8; RAW_SAMPLE_SIZE],
}

impl<R: Read> StreamSensor<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: [0u8; RAW_SAMPLE_SIZE],
        }
    }
}

impl<R: Read> TouchSensor for StreamSensor<R> {
    fn read_sample(&mut self) -> Result<RawSample, SensorError> {
        match self.reader.read_exact(&mut self.buf) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Err(SensorError::Disconnected),
            Err(e) => return Err(e.into()),
        }
        parse_raw_sample(&self.buf).ok_or(SensorError::Disconnected)
    }
}

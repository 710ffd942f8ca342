//! Shared helpers for capturing what the engine writes.

use std::{
    io::{self, Write},
    sync::{Arc, Mutex},
};

use chrono::{DateTime, TimeZone, Timelike, Utc};
use tracing_subscriber::fmt::MakeWriter;

use crate::clock::FixedClock;

pub(crate) const TIMESTAMP: &str = "2077-01-23T10:15:13.000Z";

pub(crate) fn test_clock() -> FixedClock {
    let date: DateTime<Utc> = Utc
        .with_ymd_and_hms(2077, 1, 23, 10, 15, 13)
        .unwrap()
        .with_nanosecond(441)
        .unwrap();
    FixedClock(date)
}

/// A writer that captures output for verification.
#[derive(Clone, Debug, Default)]
pub(crate) struct TestWriter {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl TestWriter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn get_output(&self) -> String {
        let buffer = self.buffer.lock().unwrap();
        String::from_utf8_lossy(&buffer).to_string()
    }

    pub(crate) fn lines(&self) -> Vec<String> {
        self.get_output().lines().map(str::to_string).collect()
    }
}

impl Write for TestWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer
            .lock()
            .map_err(|_| io::Error::other("Mutex poisoned"))?
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for TestWriter {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// A writer whose every write fails.
#[derive(Clone, Copy, Debug)]
pub(crate) struct FailingWriter;

impl Write for FailingWriter {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::other("sink closed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for FailingWriter {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        *self
    }
}

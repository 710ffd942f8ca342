use std::{
    backtrace::Backtrace,
    fmt,
    fs::OpenOptions,
    io::{self, Write},
    sync::Arc,
};

use serde_json::Value;
use tracing_subscriber::{
    filter::LevelFilter,
    fmt::{writer::BoxMakeWriter, MakeWriter},
};

use crate::{
    clock::{Clock, SystemClock},
    config::{LoggerConfig, OutputPath},
    encoder::{format_timestamp, Encoder, Record},
    error::LoggerError,
    severity::Severity,
};

/// The operations a [`Logger`](crate::Logger) needs from whatever writes its records.
pub trait Engine: Send + Sync {
    fn enabled(&self, severity: Severity) -> bool;

    fn log(&self, record: &Record<'_>);

    /// Flushes buffered output, if any.
    fn sync(&self) -> io::Result<()> {
        Ok(())
    }

    /// Whether `dpanic` records should panic.
    fn development(&self) -> bool {
        false
    }
}

/// Drops every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NopEngine;

impl Engine for NopEngine {
    fn enabled(&self, _severity: Severity) -> bool {
        false
    }

    fn log(&self, _record: &Record<'_>) {}
}

/// Construction time overrides, applied on top of the selected preset.
///
/// `Clock` and `Caller` are last-wins, `Fields` accumulate in order.
pub enum EngineOption {
    Clock(Arc<dyn Clock>),
    Caller(bool),
    Fields(Vec<(String, Value)>),
}

impl EngineOption {
    pub fn clock(clock: impl Clock + 'static) -> Self {
        EngineOption::Clock(Arc::new(clock))
    }

    pub fn fields<K, I>(fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        EngineOption::Fields(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl fmt::Debug for EngineOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineOption::Clock(_) => f.write_str("Clock(..)"),
            EngineOption::Caller(enabled) => f.debug_tuple("Caller").field(enabled).finish(),
            EngineOption::Fields(fields) => f.debug_tuple("Fields").field(fields).finish(),
        }
    }
}

type Sink = Arc<BoxMakeWriter>;

/// The process's standard streams, swappable so tests can capture them.
pub(crate) struct Streams {
    stdout: Sink,
    stderr: Sink,
}

impl Streams {
    pub(crate) fn process() -> Self {
        Self::new(io::stdout, io::stderr)
    }

    pub(crate) fn new<O, E>(stdout: O, stderr: E) -> Self
    where
        O: for<'a> MakeWriter<'a> + Send + Sync + 'static,
        E: for<'a> MakeWriter<'a> + Send + Sync + 'static,
    {
        Self {
            stdout: Arc::new(BoxMakeWriter::new(stdout)),
            stderr: Arc::new(BoxMakeWriter::new(stderr)),
        }
    }

    fn open(&self, path: &OutputPath) -> Result<Sink, LoggerError> {
        match path {
            OutputPath::Stdout => Ok(self.stdout.clone()),
            OutputPath::Stderr => Ok(self.stderr.clone()),
            OutputPath::File(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|source| LoggerError::OpenOutput {
                        path: path.clone(),
                        source,
                    })?;
                Ok(Arc::new(BoxMakeWriter::new(Arc::new(file))))
            }
        }
    }
}

/// The engine built from a [`LoggerConfig`].
pub(crate) struct Core {
    encoder: Encoder,
    level: LevelFilter,
    output: Sink,
    error_output: Sink,
    clock: Arc<dyn Clock>,
    add_caller: bool,
    stacktrace_level: Option<Severity>,
    development: bool,
    fields: Vec<(String, Value)>,
}

impl Core {
    pub(crate) fn build<I>(
        config: &LoggerConfig,
        options: I,
        streams: &Streams,
    ) -> Result<Self, LoggerError>
    where
        I: IntoIterator<Item = EngineOption>,
    {
        let mut core = Core {
            encoder: Encoder::new(config.encoding, config.keys.clone()),
            level: config.level,
            output: streams.open(&config.output)?,
            error_output: streams.open(&config.error_output)?,
            clock: Arc::new(SystemClock),
            add_caller: true,
            stacktrace_level: config.stacktrace_level,
            development: config.development,
            fields: Vec::new(),
        };

        for option in options {
            match option {
                EngineOption::Clock(clock) => core.clock = clock,
                EngineOption::Caller(enabled) => core.add_caller = enabled,
                EngineOption::Fields(fields) => core.fields.extend(fields),
            }
        }

        Ok(core)
    }

    fn report(&self, what: &str, err: &dyn fmt::Display) {
        let mut writer = self.error_output.make_writer();
        let _ = writeln!(
            writer,
            "{} {} error: {}",
            format_timestamp(self.clock.now()),
            what,
            err
        );
    }
}

impl Engine for Core {
    fn enabled(&self, severity: Severity) -> bool {
        severity.passes(self.level)
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.level) {
            return;
        }

        let mut record = *record;
        if !self.add_caller {
            record.caller = None;
        }

        let fields: Vec<(&str, &Value)> = self
            .fields
            .iter()
            .map(|(key, value)| (key.as_str(), value))
            .chain(record.fields.iter().copied())
            .collect();

        let stacktrace = self
            .stacktrace_level
            .filter(|threshold| record.level >= *threshold && self.encoder.has_stacktrace_key())
            .map(|_| Backtrace::force_capture().to_string());

        let line = match self.encoder.encode(
            self.clock.now(),
            &record,
            &fields,
            stacktrace.as_deref(),
        ) {
            Ok(line) => line,
            Err(err) => return self.report("encode", &err),
        };

        let mut writer = self.output.make_writer();
        if let Err(err) = writer.write_all(&line) {
            self.report("write", &err);
        }
    }

    fn sync(&self) -> io::Result<()> {
        self.output.make_writer().flush()
    }

    fn development(&self) -> bool {
        self.development
    }
}

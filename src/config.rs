use std::{borrow::Cow, path::PathBuf};

use tracing_subscriber::filter::LevelFilter;

use crate::{
    engine::{Core, EngineOption, Streams},
    error::LoggerError,
    logger::Logger,
    profile::Profile,
    severity::Severity,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// One JSON object per line.
    Json,
    /// Tab separated elements, one record per line.
    Console,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputPath {
    Stderr,
    Stdout,
    /// Opened in append mode, created if missing.
    File(PathBuf),
}

/// Keys used for the implicit elements of a record. A `None` key drops the element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderKeys {
    pub message: Option<Cow<'static, str>>,
    pub level: Option<Cow<'static, str>>,
    pub time: Option<Cow<'static, str>>,
    pub caller: Option<Cow<'static, str>>,
    pub stacktrace: Option<Cow<'static, str>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerConfig {
    pub encoding: Encoding,
    pub level: LevelFilter,
    /// Where records are written.
    pub output: OutputPath,
    /// Where the engine reports its own failures, e.g. a record it could not write.
    pub error_output: OutputPath,
    pub keys: EncoderKeys,
    /// Records at or above this severity carry a stack trace, if `keys.stacktrace` is set.
    pub stacktrace_level: Option<Severity>,
    /// Makes `dpanic` panic.
    pub development: bool,
}

// This config works well with log collectors that ingest one JSON object per line.
pub static SERVER_CONFIG: LoggerConfig = LoggerConfig {
    encoding: Encoding::Json,
    level: LevelFilter::DEBUG,
    output: OutputPath::Stderr,
    error_output: OutputPath::Stderr,
    keys: EncoderKeys {
        message: Some(Cow::Borrowed("message")),
        level: Some(Cow::Borrowed("level")),
        time: Some(Cow::Borrowed("@timestamp")),
        caller: Some(Cow::Borrowed("caller")),
        stacktrace: None,
    },
    stacktrace_level: Some(Severity::Error),
    development: false,
};

pub static CONSOLE_CONFIG: LoggerConfig = LoggerConfig {
    encoding: Encoding::Console,
    level: LevelFilter::DEBUG,
    output: OutputPath::Stderr,
    error_output: OutputPath::Stderr,
    keys: EncoderKeys {
        message: Some(Cow::Borrowed("M")),
        level: Some(Cow::Borrowed("L")),
        time: Some(Cow::Borrowed("T")),
        caller: Some(Cow::Borrowed("C")),
        stacktrace: Some(Cow::Borrowed("S")),
    },
    stacktrace_level: Some(Severity::Warn),
    development: true,
};

impl LoggerConfig {
    pub fn for_profile(profile: Profile) -> &'static LoggerConfig {
        match profile {
            Profile::Server => &SERVER_CONFIG,
            Profile::Console => &CONSOLE_CONFIG,
        }
    }

    /// Builds a logger writing to the process's standard streams or files.
    pub fn build<I>(&self, options: I) -> Result<Logger, LoggerError>
    where
        I: IntoIterator<Item = EngineOption>,
    {
        self.build_with_streams(options, &Streams::process())
    }

    pub(crate) fn build_with_streams<I>(
        &self,
        options: I,
        streams: &Streams,
    ) -> Result<Logger, LoggerError>
    where
        I: IntoIterator<Item = EngineOption>,
    {
        let core = Core::build(self, options, streams)?;
        Ok(Logger::from_engine(std::sync::Arc::new(core)))
    }
}

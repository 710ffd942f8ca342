use std::{
    fmt::{self, Display},
    io,
    panic::Location,
    sync::Arc,
};

use serde_json::Value;

use crate::{
    config::LoggerConfig,
    encoder::{Caller, Record},
    engine::{Engine, EngineOption, NopEngine, Streams},
    error::LoggerError,
    profile::{self, Profile},
    severity::Severity,
};

/// Leveled logging on top of an [`Engine`].
///
/// Each level comes in three flavours: a plain message (`info`), a preformatted
/// message (`infof(format_args!(..))`) and a message with key/value fields
/// (`infow`). Cloning is cheap and clones share the engine.
///
/// `panic*` log and then panic, `fatal*` log and then exit the process with
/// status 1. `dpanic*` only panic when the engine is in development mode.
#[derive(Clone)]
pub struct Logger {
    engine: Arc<dyn Engine>,
    context: Arc<[(String, Value)]>,
}

macro_rules! leveled {
    ($severity:expr, $plain:ident, $printf:ident, $structured:ident) => {
        #[track_caller]
        pub fn $plain(&self, message: impl Display) {
            if self.enabled($severity) {
                self.log($severity, &message.to_string(), &[]);
            }
        }

        #[track_caller]
        pub fn $printf(&self, args: fmt::Arguments<'_>) {
            if self.enabled($severity) {
                match args.as_str() {
                    Some(message) => self.log($severity, message, &[]),
                    None => self.log($severity, &args.to_string(), &[]),
                }
            }
        }

        #[track_caller]
        pub fn $structured(&self, message: impl Display, fields: &[(&str, Value)]) {
            if self.enabled($severity) {
                self.log($severity, &message.to_string(), fields);
            }
        }
    };
}

// Always logs, whatever the level filter, then hands the message to `$finish`.
macro_rules! terminal {
    ($severity:expr, $plain:ident, $printf:ident, $structured:ident, $finish:ident -> $ret:tt) => {
        #[track_caller]
        pub fn $plain(&self, message: impl Display) -> $ret {
            let message = message.to_string();
            self.log($severity, &message, &[]);
            self.$finish(message)
        }

        #[track_caller]
        pub fn $printf(&self, args: fmt::Arguments<'_>) -> $ret {
            let message = args.to_string();
            self.log($severity, &message, &[]);
            self.$finish(message)
        }

        #[track_caller]
        pub fn $structured(&self, message: impl Display, fields: &[(&str, Value)]) -> $ret {
            let message = message.to_string();
            self.log($severity, &message, fields);
            self.$finish(message)
        }
    };
}

impl Logger {
    /// Builds a logger from the preset selected by `PROFILE`.
    ///
    /// Never fails: if the engine can't be built the error is printed to stderr
    /// and a disabled logger is returned. Use [`Logger::try_new`] to handle it.
    pub fn new<I>(options: I) -> Self
    where
        I: IntoIterator<Item = EngineOption>,
    {
        Self::or_disabled(Self::try_new(options))
    }

    pub fn try_new<I>(options: I) -> Result<Self, LoggerError>
    where
        I: IntoIterator<Item = EngineOption>,
    {
        let profile = profile::read_env();
        Self::from_profile_value(profile.as_deref(), options, &Streams::process())
    }

    /// Builds a logger for an explicit profile, ignoring the environment.
    pub fn for_profile<I>(profile: Profile, options: I) -> Result<Self, LoggerError>
    where
        I: IntoIterator<Item = EngineOption>,
    {
        LoggerConfig::for_profile(profile).build(options)
    }

    pub(crate) fn or_disabled(result: Result<Self, LoggerError>) -> Self {
        result.unwrap_or_else(|err| {
            eprintln!("common-logger: {}, logging is disabled", err);
            Self::disabled()
        })
    }

    pub(crate) fn from_profile_value<I>(
        value: Option<&str>,
        options: I,
        streams: &Streams,
    ) -> Result<Self, LoggerError>
    where
        I: IntoIterator<Item = EngineOption>,
    {
        let profile = Profile::resolve(value);
        let logger = LoggerConfig::for_profile(profile).build_with_streams(options, streams)?;

        if let Some(value) = value.filter(|v| !v.is_empty() && !Profile::is_recognized(v)) {
            logger.warnw(
                "unrecognized profile, falling back to the server preset",
                &[("profile", Value::from(value))],
            );
        }

        Ok(logger)
    }

    pub fn from_engine(engine: Arc<dyn Engine>) -> Self {
        Self {
            engine,
            context: Arc::from(Vec::new()),
        }
    }

    /// A logger that drops everything.
    pub fn disabled() -> Self {
        Self::from_engine(Arc::new(NopEngine))
    }

    /// Returns a child logger that adds `fields` to every record.
    pub fn with<K, I>(&self, fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let context: Vec<(String, Value)> = self
            .context
            .iter()
            .cloned()
            .chain(fields.into_iter().map(|(k, v)| (k.into(), v)))
            .collect();
        Self {
            engine: self.engine.clone(),
            context: context.into(),
        }
    }

    pub fn enabled(&self, severity: impl Into<Severity>) -> bool {
        self.engine.enabled(severity.into())
    }

    /// Flushes the engine's output.
    pub fn sync(&self) -> io::Result<()> {
        self.engine.sync()
    }

    leveled!(Severity::Debug, debug, debugf, debugw);
    leveled!(Severity::Info, info, infof, infow);
    leveled!(Severity::Warn, warn, warnf, warnw);
    leveled!(Severity::Error, error, errorf, errorw);
    terminal!(Severity::DPanic, dpanic, dpanicf, dpanicw, finish_dpanic -> ());
    terminal!(Severity::Panic, panic, panicf, panicw, finish_panic -> !);
    terminal!(Severity::Fatal, fatal, fatalf, fatalw, finish_fatal -> !);

    #[track_caller]
    fn finish_dpanic(&self, message: String) {
        if self.engine.development() {
            self.finish_panic(message)
        }
    }

    #[track_caller]
    fn finish_panic(&self, message: String) -> ! {
        let _ = self.sync();
        panic!("{}", message)
    }

    fn finish_fatal(&self, _message: String) -> ! {
        let _ = self.sync();
        std::process::exit(1)
    }

    #[track_caller]
    fn log(&self, severity: Severity, message: &str, fields: &[(&str, Value)]) {
        let caller = Caller::from(Location::caller());
        let fields: Vec<(&str, &Value)> = fields.iter().map(|(key, value)| (*key, value)).collect();
        self.emit(severity, Some(caller), message, &fields);
    }

    /// Hands a record to the engine, prefixed with this logger's context fields.
    pub(crate) fn emit(
        &self,
        severity: Severity,
        caller: Option<Caller<'_>>,
        message: &str,
        fields: &[(&str, &Value)],
    ) {
        let mut all: Vec<(&str, &Value)> = self
            .context
            .iter()
            .map(|(key, value)| (key.as_str(), value))
            .collect();
        all.extend_from_slice(fields);
        self.engine.log(&Record {
            level: severity,
            caller,
            message,
            fields: &all,
        });
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

//! Preset logging for services.
//!
//! [`Logger::new`] reads `PROFILE` and picks one of two presets, both writing
//! every record from `DEBUG` up to stderr:
//!
//! - `server` (also the fallback for anything else): one JSON object per line,
//!   `{"level":"INFO","@timestamp":"2077-01-23T10:15:13.000Z","caller":"src/main.rs:12","message":"..."}`
//! - `console`: tab separated,
//!   `2077-01-23T10:15:13.000Z\tINFO\tsrc/main.rs:12\t...`, with a stack trace
//!   after records from `WARN` up, and `dpanic` panicking
//!
//! ```no_run
//! use common_logger::{EngineOption, Logger};
//! use serde_json::json;
//!
//! let logger = Logger::new([EngineOption::Caller(true)]);
//! logger.info("starting");
//! logger.infof(format_args!("listening on {}", 8080));
//! logger.warnw("slow request", &[("elapsed_ms", json!(812))]);
//! ```

mod clock;
mod config;
mod encoder;
mod engine;
mod error;
pub mod log;
mod logger;
mod profile;
mod severity;
#[cfg(test)]
mod testing;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{EncoderKeys, Encoding, LoggerConfig, OutputPath, CONSOLE_CONFIG, SERVER_CONFIG};
pub use encoder::{format_timestamp, Caller, Record};
pub use engine::{Engine, EngineOption, NopEngine};
pub use error::LoggerError;
pub use log::LoggerLayer;
pub use logger::Logger;
pub use profile::{Profile, CONSOLE_PROFILE, ENV_PROFILE, SERVER_PROFILE};
pub use severity::Severity;

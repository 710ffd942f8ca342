use serde_json::Value;
use tracing::{
    field::{Field, Visit},
    Dispatch, Event, Subscriber,
};
use tracing_subscriber::{
    layer::{Context, Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::{
    encoder::Caller, engine::EngineOption, error::LoggerError, logger::Logger, severity::Severity,
};

/// Builds the logger selected by `PROFILE` and installs it as the global
/// `tracing` subscriber, so `tracing::info!` and friends use the same format.
pub fn init<I>(options: I) -> Result<Logger, LoggerError>
where
    I: IntoIterator<Item = EngineOption>,
{
    let logger = Logger::try_new(options)?;
    logger.init()?;
    Ok(logger)
}

/// Routes `tracing` events through a [`Logger`].
#[derive(Debug, Clone)]
pub struct LoggerLayer {
    logger: Logger,
}

impl<S: Subscriber> Layer<S> for LoggerLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let severity = Severity::from(*metadata.level());
        if !self.logger.enabled(severity) {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let caller = metadata
            .file()
            .zip(metadata.line())
            .map(|(file, line)| Caller { file, line });
        let fields: Vec<(&str, &Value)> = visitor
            .fields
            .iter()
            .map(|(key, value)| (*key, value))
            .collect();
        self.logger.emit(severity, caller, &visitor.message, &fields);
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: Vec<(&'static str, Value)>,
}

impl FieldVisitor {
    fn push(&mut self, field: &Field, value: Value) {
        match (field.name(), value) {
            ("message", Value::String(message)) => self.message = message,
            ("message", value) => self.message = value.to_string(),
            (name, value) => self.fields.push((name, value)),
        }
    }
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.push(field, Value::from(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.push(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.push(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.push(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.push(field, Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.push(field, Value::from(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.push(field, Value::from(format!("{:?}", value)));
    }
}

impl Logger {
    pub fn layer(&self) -> LoggerLayer {
        LoggerLayer {
            logger: self.clone(),
        }
    }

    /// A dispatcher for scoped use with `tracing::dispatcher::with_default`.
    pub fn dispatch(&self) -> Dispatch {
        Dispatch::new(tracing_subscriber::registry().with(self.layer()))
    }

    /// Installs this logger as the process-wide `tracing` subscriber.
    pub fn init(&self) -> Result<(), LoggerError> {
        tracing_subscriber::registry().with(self.layer()).try_init()?;
        Ok(())
    }
}

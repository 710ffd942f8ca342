use anyhow::{Context, Result};
use common_logger::{log, Profile};
use serde_json::json;
use tracing::{debug, info};

fn main() -> Result<()> {
    let logger = log::init([]).context("failed to initialize logging")?;

    info!(profile = %Profile::from_env(), "starting common-logger");

    logger.debug("records from debug up are written to stderr");
    logger.infof(format_args!("{} + {} = {}", 2, 2, 4));
    logger.warnw(
        "structured record",
        &[("attempt", json!(3)), ("retry", json!(true))],
    );

    let worker = logger.with([("component", json!("worker"))]);
    worker.error("record from a child logger");

    debug!(elapsed_ms = 12, "tracing macros share the same format");

    logger.sync().context("failed to flush log output")?;
    Ok(())
}

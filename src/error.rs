use std::{io, path::PathBuf};

use tracing_subscriber::util::TryInitError;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    #[error("failed to open log output {path:?}: {source}")]
    OpenOutput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to install the global subscriber: {0}")]
    Install(#[from] TryInitError),
}

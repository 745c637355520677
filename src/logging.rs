use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{Error, Result};

/// Install a global `tracing` subscriber at the given level.
///
/// Optional convenience for embedding applications; the driver itself only
/// emits events and never installs a subscriber. Call at most once per
/// process, typically with the level parsed from the DSN.
pub fn init(level: Level) -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_new(level.to_string().to_lowercase())
                .map_err(|e| Error::Dsn(format!("invalid log level: {e}")))?,
        )
        .with_target(true)
        .try_init()
        .map_err(|_| Error::Dsn("logging already initialized".into()))
}

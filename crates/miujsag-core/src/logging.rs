use tracing_subscriber::EnvFilter;

use crate::config::log_filter_from_env;
use crate::error::{Result, SearchError};

const DEFAULT_LOG_FILTER: &str = "info";

/// Installs a global fmt subscriber. Returns `false` when one is already set.
///
/// The filter falls back to `MIUJSAG_LOG`, then to `info`.
pub fn init_logging(filter: Option<&str>) -> Result<bool> {
    let directive = filter
        .map(ToString::to_string)
        .or_else(log_filter_from_env)
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
    let env_filter = EnvFilter::try_new(&directive)
        .map_err(|e| SearchError::Validation(format!("invalid log filter {directive:?}: {e}")))?;

    Ok(tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init()
        .is_ok())
}

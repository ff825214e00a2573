//! Logging Setup
//!
//! The crate logs through `tracing`: the executor emits a `debug` event per
//! statement and a `warn` event per failure, and `DebugDriver` adds
//! transaction-level events. Binaries and tests install a subscriber here.

use tracing_subscriber::EnvFilter;

/// Install a formatted subscriber filtered by `RUST_LOG` (default `info`)
///
/// Returns an error when a global subscriber is already installed, which
/// tests calling this repeatedly can ignore.
pub fn init_logging() -> anyhow::Result<()> {
    init_logging_with("info")
}

/// Same as [`init_logging`], with an explicit fallback directive
pub fn init_logging_with(default_directive: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_reports_error() {
        let _ = init_logging_with("debug");
        assert!(init_logging().is_err());
    }
}

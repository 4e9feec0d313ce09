//! Tracing bootstrap.

use tracing_subscriber::EnvFilter;

use crate::config::LogLevel;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set; `level` is the fallback. Later calls are
/// no-ops once a subscriber is installed.
pub fn init(level: LogLevel) {
    let fallback: tracing::Level = level.into();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback.to_string()));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init(LogLevel::Debug);
        init(LogLevel::Info);
    }
}

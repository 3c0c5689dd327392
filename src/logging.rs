//! Logging setup.
//!
//! Logs go to stderr so that `faqbot ask` can print JSON on stdout.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{Error, Result};

/// Install the global tracing subscriber.
///
/// `log_level` is an `EnvFilter` directive such as "info" or
/// "faqbot=debug,tower_http=info"; it falls back to `RUST_LOG`, then "info".
pub fn init_logging(log_level: Option<&str>, no_color: bool) -> Result<()> {
    let default_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let filter_str = log_level.unwrap_or(&default_level);

    let env_filter = EnvFilter::try_new(filter_str)
        .map_err(|e| Error::Config(format!("invalid log filter {:?}: {}", filter_str, e)))?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(!no_color && std::env::var_os("NO_COLOR").is_none());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| Error::Config(format!("failed to init logging: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_filter_is_rejected() {
        assert!(matches!(
            init_logging(Some("faqbot=notalevel"), true),
            Err(Error::Config(_))
        ));
    }
}

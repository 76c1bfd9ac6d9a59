use time::format_description::well_known::Rfc3339;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;

/// Installs the global `tracing` subscriber. `RUST_LOG` wins over `cfg.log_level`.
/// Returns false when a subscriber was already installed.
pub fn init_tracing(cfg: &Config) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.log_level.to_ascii_lowercase()));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(UtcTime::new(Rfc3339))
        .try_init()
        .is_ok()
}

// common/src/utils.rs
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Setup tracing for consistent logging across services.
///
/// The level comes from `RUST_LOG` and defaults to `info`. Records emitted
/// through the `log` facade (actix-web's request logger) are captured too.
pub fn setup_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    FmtSubscriber::builder()
        .with_env_filter(filter)
        .try_init()
        .expect("Failed to set tracing subscriber");
}

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::config::{Environment, Settings};

/// Installs the global structured-logging subscriber. ANSI colors are kept
/// for development and stripped in production.
pub fn init(settings: &Settings) {
    let level = match settings.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_ansi(settings.environment == Environment::Development)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

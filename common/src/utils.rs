// common/src/utils.rs
use chrono::{DateTime, Utc};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Setup tracing for consistent logging across services.
///
/// Honours `RUST_LOG`, defaulting to `info`.
pub fn setup_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Source of the current time, injectable so expiry can be tested without sleeping
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Shorten a signature or token for log output
pub fn redact(secret: &str) -> String {
    const VISIBLE: usize = 10;
    if secret.len() <= VISIBLE {
        return "***".to_string();
    }
    match secret.get(..VISIBLE) {
        Some(prefix) => format!("{}...", prefix),
        None => "***".to_string(),
    }
}

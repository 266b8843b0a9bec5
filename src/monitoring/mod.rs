pub mod endpoints;

use std::time::Instant;
use tracing::info;

static START_TIME: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

pub fn init_monitoring() {
    START_TIME.set(Instant::now()).ok();
    info!("🔍 Monitoring system initialized");
}

/// Seconds since `init_monitoring`, or 0 when it never ran
pub fn uptime_seconds() -> u64 {
    START_TIME
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

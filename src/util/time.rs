//! Wall-clock helpers shared by the round engine and the status endpoint

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Get current Unix timestamp in milliseconds
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

/// Signed difference `later - earlier` in milliseconds.
///
/// Crash stamps can lie in the future (a freshly seated car holds its speed
/// for a while), so the result is allowed to be negative.
pub fn millis_between(earlier: u64, later: u64) -> i64 {
    later as i64 - earlier as i64
}

/// Server start time for uptime tracking
static SERVER_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize server start time (call once at startup)
pub fn init_server_time() {
    SERVER_START.get_or_init(Instant::now);
}

/// Get server uptime in seconds
pub fn uptime_secs() -> u64 {
    SERVER_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_between_handles_future_stamps() {
        assert_eq!(millis_between(1_000, 3_500), 2_500);
        assert_eq!(millis_between(11_000, 1_000), -10_000);
    }
}

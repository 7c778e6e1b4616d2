//! Time utilities for the simulation loop

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Get current Unix timestamp in milliseconds
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
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

/// Tick cadence. The loop asks the runtime for a 1 ms interval; the achieved
/// rate is bounded by the host timer resolution, missed ticks are skipped.
pub const TICKS_PER_SECOND: u32 = 1000;
pub const TICK_INTERVAL_MICROS: u64 = 1_000_000 / TICKS_PER_SECOND as u64;

/// Frames are broadcast to the peer at most this often
pub const FRAME_TPS: u32 = 60;
pub const FRAME_INTERVAL_TICKS: u32 = TICKS_PER_SECOND / FRAME_TPS;

/// Convert a wall-clock duration into a whole number of ticks
pub const fn ticks_for_millis(millis: u32) -> u32 {
    millis * TICKS_PER_SECOND / 1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_conversions() {
        assert_eq!(TICK_INTERVAL_MICROS, 1_000);
        assert_eq!(ticks_for_millis(500), 500);
        assert_eq!(ticks_for_millis(300), 300);
        assert!(FRAME_INTERVAL_TICKS >= 1);
    }
}

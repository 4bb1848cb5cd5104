//! Shared crate-wide constants.

use std::time::Duration;

/// Interval the event loop waits for input before running an idle tick.
///
/// Idle ticks drain the invoke queue, fire due timers and flush any pending
/// layout or damage, so this value bounds the latency of background work.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(16);

/// Number of lines retained by the in-memory log ring buffer.
pub const DEFAULT_LOG_LINES: usize = 2000;

/// Grapheme used when a node clears cells it does not otherwise cover.
pub const BLANK_GRAPHEME: &str = " ";

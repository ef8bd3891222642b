//! Kernel configuration constants.
//!
//! Centralizes hardcoded values for easier configuration and documentation.

use std::time::Duration;

/// Remote calls slower than this are logged at warn level.
pub const DEFAULT_SLOW_OP_THRESHOLD: Duration = Duration::from_secs(5);

/// Queue depth on a single lane at which submissions log a warning.
pub const DEFAULT_QUEUE_DEPTH_WARN: usize = 64;

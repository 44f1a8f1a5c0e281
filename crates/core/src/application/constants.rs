// Timing constants (no magic values in the services)
use std::time::Duration;

/// Pause between two device listings while waiting for a reboot (1s)
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Grace period after the device is back, so its UI services can start (5s)
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(5);

/// How long to wait for a child to exit once its stdout is closed (5s)
pub const DEFAULT_EXIT_TIMEOUT: Duration = Duration::from_secs(5);

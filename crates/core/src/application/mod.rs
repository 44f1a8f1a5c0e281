// Application Layer - Use Cases

pub mod cancel;
pub mod constants;
pub mod directory;
pub mod mirror;
pub mod reboot;

// Re-exports
pub use cancel::{cancel_channel, CancelHandle, CancelToken};
pub use directory::{DeviceDirectory, DeviceFilter, DeviceSurvey};
pub use mirror::{mirror_args, MirrorLauncher, MirrorOptions};
pub use reboot::{RebootOutcome, RebootPhase, RebootWaitConfig, RebootWaiter};

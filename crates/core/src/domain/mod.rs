// Domain Layer - Device model and tool locations

pub mod device;
pub mod tools;

// Re-exports
pub use device::{AttachedDevice, BridgeState, DeviceRecord, DeviceState, Serial};
pub use tools::ToolPaths;

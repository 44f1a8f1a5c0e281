// Port Layer - Interfaces for external dependencies

pub mod device_query;
pub mod process_runner;

// Re-exports
pub use device_query::DeviceQuery;
pub use process_runner::{ProcessError, ProcessRunner};

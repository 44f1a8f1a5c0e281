// Device Query Port
// What the reboot waiter needs from the device directory

use crate::domain::DeviceRecord;
use crate::error::Result;
use async_trait::async_trait;

/// Device Query trait
///
/// Implementations:
/// - DeviceDirectory: asks the bridge executable (application::directory)
/// - ScriptedDeviceQuery: replays a fixed sequence of listings (tests)
#[async_trait]
pub trait DeviceQuery: Send + Sync {
    /// Enumerate attached devices with their properties, in bridge order
    async fn list_devices(&self) -> Result<Vec<DeviceRecord>>;

    /// Ask the device to reboot; returns once the request was issued
    async fn reboot(&self, device: &DeviceRecord) -> Result<()>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::domain::DeviceState;
    use crate::port::ProcessError;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// One scripted `list_devices` result
    #[derive(Debug, Clone)]
    pub enum ScriptedPoll {
        Devices(Vec<DeviceRecord>),
        Fail(ProcessError),
    }

    impl ScriptedPoll {
        /// Listing that does not contain the device at all
        pub fn absent() -> Self {
            ScriptedPoll::Devices(Vec::new())
        }

        pub fn offline(serial: &str) -> Self {
            ScriptedPoll::Devices(vec![DeviceRecord::new(serial)])
        }

        pub fn online(serial: &str, model: &str) -> Self {
            let mut record = DeviceRecord::new(serial);
            record.state = DeviceState::Online;
            record.model = model.to_string();
            ScriptedPoll::Devices(vec![record])
        }

        pub fn spawn_failure(reason: &str) -> Self {
            ScriptedPoll::Fail(ProcessError::SpawnFailed {
                program: "adb".to_string(),
                reason: reason.to_string(),
            })
        }
    }

    /// Mock Device Query for testing
    ///
    /// Polls consume the script in order; the last entry repeats.
    pub struct ScriptedDeviceQuery {
        polls: Mutex<VecDeque<ScriptedPoll>>,
        poll_count: Mutex<usize>,
        reboots: Mutex<Vec<String>>,
    }

    impl ScriptedDeviceQuery {
        pub fn new(polls: Vec<ScriptedPoll>) -> Self {
            Self {
                polls: Mutex::new(polls.into()),
                poll_count: Mutex::new(0),
                reboots: Mutex::new(Vec::new()),
            }
        }

        /// Offline `offline_polls` times, then online forever
        pub fn comes_back_after(serial: &str, offline_polls: usize) -> Self {
            let mut polls = vec![ScriptedPoll::offline(serial); offline_polls];
            polls.push(ScriptedPoll::online(serial, "Pixel 4"));
            Self::new(polls)
        }

        pub fn poll_count(&self) -> usize {
            *self.poll_count.lock().unwrap()
        }

        pub fn rebooted_serials(&self) -> Vec<String> {
            self.reboots.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DeviceQuery for ScriptedDeviceQuery {
        async fn list_devices(&self) -> Result<Vec<DeviceRecord>> {
            *self.poll_count.lock().unwrap() += 1;

            let poll = {
                let mut polls = self.polls.lock().unwrap();
                if polls.len() > 1 {
                    polls.pop_front()
                } else {
                    polls.front().cloned()
                }
            };

            match poll {
                Some(ScriptedPoll::Devices(devices)) => Ok(devices),
                Some(ScriptedPoll::Fail(e)) => Err(e.into()),
                None => Ok(Vec::new()),
            }
        }

        async fn reboot(&self, device: &DeviceRecord) -> Result<()> {
            self.reboots.lock().unwrap().push(device.serial().to_string());
            Ok(())
        }
    }
}

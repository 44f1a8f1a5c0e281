// Reboot-Wait Controller
// Reboot a device, poll until it is Online again, let it settle, then hand it back.

use crate::application::cancel::CancelToken;
use crate::application::constants::{DEFAULT_POLL_INTERVAL, DEFAULT_SETTLE_DELAY};
use crate::domain::DeviceRecord;
use crate::error::Result;
use crate::port::DeviceQuery;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

/// Polling behaviour of a reboot wait
///
/// Both bounds default to `None`: the wait runs until the device is back or
/// the token is cancelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebootWaitConfig {
    pub poll_interval: Duration,
    pub settle_delay: Duration,
    pub max_attempts: Option<u32>,
    pub max_duration: Option<Duration>,
}

impl Default for RebootWaitConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            settle_delay: DEFAULT_SETTLE_DELAY,
            max_attempts: None,
            max_duration: None,
        }
    }
}

/// Where a reboot wait currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebootPhase {
    Rebooting,
    Waiting { attempt: u32 },
    Confirmed,
    Done,
}

/// How a reboot wait ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebootOutcome {
    /// Device is Online again and has settled
    Ready(DeviceRecord),
    /// The caller cancelled the wait
    Cancelled,
    /// A configured bound ran out before the device came back
    Exhausted { attempts: u32 },
}

/// Reboot-Wait Controller
#[derive(Clone)]
pub struct RebootWaiter {
    query: Arc<dyn DeviceQuery>,
    config: RebootWaitConfig,
}

impl RebootWaiter {
    pub fn new(query: Arc<dyn DeviceQuery>, config: RebootWaitConfig) -> Self {
        Self { query, config }
    }

    fn bound_reached(&self, attempts: u32, started: Instant) -> bool {
        if self.config.max_attempts.is_some_and(|max| attempts >= max) {
            return true;
        }
        self.config
            .max_duration
            .is_some_and(|max| started.elapsed() >= max)
    }

    /// Reboot `device` and wait for it to come back
    ///
    /// # Errors
    /// - AppError::Process if the reboot or any device listing fails; the
    ///   wait stops at the first failure instead of polling a broken bridge
    pub async fn run(&self, device: DeviceRecord, mut cancel: CancelToken) -> Result<RebootOutcome> {
        let serial = device.serial().to_string();

        if cancel.is_cancelled() {
            return Ok(RebootOutcome::Cancelled);
        }

        info!(serial = %serial, phase = ?RebootPhase::Rebooting, "Reboot wait started");
        self.query.reboot(&device).await?;

        let started = Instant::now();
        let mut attempts: u32 = 0;

        let record = loop {
            if self.bound_reached(attempts, started) {
                warn!(
                    serial = %serial,
                    attempts = attempts,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Device did not come back before the wait bound"
                );
                return Ok(RebootOutcome::Exhausted { attempts });
            }

            tokio::select! {
                _ = sleep(self.config.poll_interval) => {},
                _ = cancel.cancelled() => {
                    info!(serial = %serial, attempts = attempts, "Reboot wait cancelled");
                    return Ok(RebootOutcome::Cancelled);
                }
            }

            attempts += 1;
            let phase = RebootPhase::Waiting { attempt: attempts };

            let devices = self.query.list_devices().await?;
            match devices.into_iter().find(|d| d.serial() == serial) {
                Some(found) if found.is_online() => break found,
                Some(_) => debug!(serial = %serial, phase = ?phase, "Device listed but offline"),
                None => debug!(serial = %serial, phase = ?phase, "Device not listed yet"),
            }
        };

        info!(
            serial = %serial,
            phase = ?RebootPhase::Confirmed,
            attempts = attempts,
            "Device online, letting it settle"
        );

        tokio::select! {
            _ = sleep(self.config.settle_delay) => {},
            _ = cancel.cancelled() => {
                info!(serial = %serial, "Reboot wait cancelled while settling");
                return Ok(RebootOutcome::Cancelled);
            }
        }

        info!(serial = %serial, phase = ?RebootPhase::Done, "Reboot wait finished");
        Ok(RebootOutcome::Ready(record))
    }

    /// Run the wait as a background task
    ///
    /// `on_ready` is called with the Online record only when the outcome is
    /// `Ready`. The task result carries the outcome or the propagated error.
    pub fn spawn<F>(
        &self,
        device: DeviceRecord,
        cancel: CancelToken,
        on_ready: F,
    ) -> JoinHandle<Result<RebootOutcome>>
    where
        F: FnOnce(DeviceRecord) + Send + 'static,
    {
        let waiter = self.clone();
        tokio::spawn(async move {
            let outcome = waiter.run(device, cancel).await?;
            if let RebootOutcome::Ready(record) = &outcome {
                on_ready(record.clone());
            }
            Ok(outcome)
        })
    }
}

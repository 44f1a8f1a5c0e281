// Device Directory - Enumerates devices through the bridge executable

pub mod parse;

pub use parse::{
    parse_device_list, parse_properties, parse_property_line, select_serials, DeviceFilter,
};

use crate::domain::{AttachedDevice, DeviceRecord};
use crate::error::Result;
use crate::port::{DeviceQuery, ProcessRunner};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

fn args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|p| p.to_string()).collect()
}

/// One `devices` listing: every attached entry, plus the records the filter selected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSurvey {
    pub attached: Vec<AttachedDevice>,
    pub devices: Vec<DeviceRecord>,
}

impl DeviceSurvey {
    /// Attached entries the filter left out
    pub fn hidden(&self) -> usize {
        self.attached.len().saturating_sub(self.devices.len())
    }
}

/// Device Directory
///
/// Every call rebuilds its answer from fresh bridge output; nothing is cached.
#[derive(Clone)]
pub struct DeviceDirectory {
    runner: Arc<dyn ProcessRunner>,
    bridge: PathBuf,
    filter: DeviceFilter,
}

impl DeviceDirectory {
    pub fn new(runner: Arc<dyn ProcessRunner>, bridge: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            bridge: bridge.into(),
            filter: DeviceFilter::default(),
        }
    }

    pub fn with_filter(mut self, filter: DeviceFilter) -> Self {
        self.filter = filter;
        self
    }

    async fn bridge_lines(&self, argv: Vec<String>) -> Result<Vec<String>> {
        let lines = self.runner.execute(&self.bridge, &argv).await?;
        debug!(args = ?argv, lines = lines.len(), "Bridge output captured");
        Ok(lines)
    }

    /// Every entry of the bridge listing, including unauthorized/offline ones
    pub async fn list_attached(&self) -> Result<Vec<AttachedDevice>> {
        let lines = self.bridge_lines(args(&["devices"])).await?;
        Ok(parse_device_list(&lines))
    }

    /// Query one device's property dump
    ///
    /// An unreachable device is not an error: the record comes back `Offline`
    /// with empty model and name.
    pub async fn get_device_properties(&self, serial: &str) -> Result<DeviceRecord> {
        let lines = self
            .bridge_lines(args(&["-s", serial, "shell", "getprop"]))
            .await?;
        let record = parse_properties(serial, &lines);

        debug!(
            serial = %serial,
            state = %record.state,
            model = %record.model,
            "Device properties parsed"
        );

        Ok(record)
    }

    /// Enumerate devices, then query their properties one by one in listing order
    pub async fn list_devices(&self) -> Result<Vec<DeviceRecord>> {
        Ok(self.survey().await?.devices)
    }

    /// Like `list_devices`, but also keeps every listing entry, all from a single `devices` call
    pub async fn survey(&self) -> Result<DeviceSurvey> {
        let lines = self.bridge_lines(args(&["devices"])).await?;
        let attached = parse_device_list(&lines);
        let serials = select_serials(&lines, self.filter);

        let mut devices = Vec::with_capacity(serials.len());
        for serial in &serials {
            devices.push(self.get_device_properties(serial).await?);
        }

        Ok(DeviceSurvey { attached, devices })
    }

    /// Issue `reboot` for the device; does not wait for anything
    pub async fn reboot(&self, device: &DeviceRecord) -> Result<()> {
        info!(serial = %device.serial(), "Rebooting device");
        self.bridge_lines(args(&["-s", device.serial(), "reboot"]))
            .await?;
        Ok(())
    }

    /// Best-effort bridge server restart; failures are logged and swallowed
    pub async fn restart_server(&self) {
        for step in ["kill-server", "start-server"] {
            if let Err(e) = self.bridge_lines(args(&[step])).await {
                warn!(step = %step, error = %e, "Bridge server restart step failed");
            }
        }
        info!("Bridge server restart attempted");
    }
}

#[async_trait]
impl DeviceQuery for DeviceDirectory {
    async fn list_devices(&self) -> Result<Vec<DeviceRecord>> {
        DeviceDirectory::list_devices(self).await
    }

    async fn reboot(&self, device: &DeviceRecord) -> Result<()> {
        DeviceDirectory::reboot(self, device).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BridgeState, DeviceState};
    use crate::error::AppError;
    use crate::port::process_runner::mocks::{ScriptedProcessRunner, ScriptedResponse};
    use crate::port::ProcessError;

    fn directory(runner: &Arc<ScriptedProcessRunner>) -> DeviceDirectory {
        DeviceDirectory::new(runner.clone(), "/opt/scrcpy/adb")
    }

    #[tokio::test]
    async fn test_list_devices_queries_each_serial_in_order() {
        let runner = Arc::new(ScriptedProcessRunner::new());
        runner
            .script(
                &["devices"],
                ScriptedResponse::text("List of devices attached\nBBB\tdevice\nAAA\tdevice\n"),
            )
            .script(
                &["-s", "BBB", "shell", "getprop"],
                ScriptedResponse::text("[ro.product.model]: [Nexus 9]\n[ro.product.name]: [volantis]\n"),
            )
            .script(
                &["-s", "AAA", "shell", "getprop"],
                ScriptedResponse::lines(&[]),
            );

        let devices = directory(&runner).list_devices().await.unwrap();

        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].serial(), "BBB");
        assert_eq!(devices[0].state, DeviceState::Online);
        assert_eq!(devices[0].model, "Nexus 9");
        assert_eq!(devices[1].serial(), "AAA");
        assert_eq!(devices[1].state, DeviceState::Offline);

        assert_eq!(
            runner.calls(),
            vec![
                args(&["devices"]),
                args(&["-s", "BBB", "shell", "getprop"]),
                args(&["-s", "AAA", "shell", "getprop"]),
            ]
        );
    }

    #[tokio::test]
    async fn test_ready_filter_skips_property_query_for_unauthorized() {
        let runner = Arc::new(ScriptedProcessRunner::new());
        runner.script(
            &["devices"],
            ScriptedResponse::text("List of devices attached\nAAA\tunauthorized\nBBB\tdevice\n"),
        );

        let devices = directory(&runner).list_devices().await.unwrap();

        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].serial(), "BBB");
        assert_eq!(runner.call_count(&["-s", "AAA", "shell", "getprop"]), 0);
    }

    #[tokio::test]
    async fn test_all_filter_reports_unauthorized_as_offline() {
        let runner = Arc::new(ScriptedProcessRunner::new());
        runner
            .script(
                &["devices"],
                ScriptedResponse::text("List of devices attached\nAAA\tunauthorized\n"),
            )
            .script(
                &["-s", "AAA", "shell", "getprop"],
                ScriptedResponse::text("error: device unauthorized.\n"),
            );

        let devices = directory(&runner)
            .with_filter(DeviceFilter::All)
            .list_devices()
            .await
            .unwrap();

        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].state, DeviceState::Offline);
    }

    #[tokio::test]
    async fn test_list_attached_keeps_bridge_state() {
        let runner = Arc::new(ScriptedProcessRunner::new());
        runner.script(
            &["devices"],
            ScriptedResponse::text("List of devices attached\nAAA\toffline\nBBB\tdevice\n"),
        );

        let attached = directory(&runner).list_attached().await.unwrap();

        assert_eq!(attached[0].bridge_state, BridgeState::Offline);
        assert_eq!(attached[1].bridge_state, BridgeState::Device);
    }

    #[tokio::test]
    async fn test_survey_uses_one_listing() {
        let runner = Arc::new(ScriptedProcessRunner::new());
        runner
            .script(
                &["devices"],
                ScriptedResponse::text("List of devices attached\nAAA\tunauthorized\nBBB\tdevice\n"),
            )
            .script(
                &["devices"],
                ScriptedResponse::text("List of devices attached\nBBB\tdevice\n"),
            );

        let survey = directory(&runner).survey().await.unwrap();

        assert_eq!(runner.call_count(&["devices"]), 1);
        assert_eq!(survey.attached.len(), 2);
        assert_eq!(survey.devices.len(), 1);
        assert_eq!(survey.devices[0].serial(), "BBB");
        assert_eq!(survey.hidden(), 1);
    }

    #[tokio::test]
    async fn test_spawn_failure_propagates_from_list_devices() {
        let runner = Arc::new(ScriptedProcessRunner::new());
        runner.script(
            &["devices"],
            ScriptedResponse::SpawnFailure("No such file or directory".to_string()),
        );

        let result = directory(&runner).list_devices().await;

        assert!(matches!(
            result,
            Err(AppError::Process(ProcessError::SpawnFailed { .. }))
        ));
    }

    #[tokio::test]
    async fn test_reboot_is_scoped_to_serial() {
        let runner = Arc::new(ScriptedProcessRunner::new());

        directory(&runner)
            .reboot(&DeviceRecord::new("emulator-5554"))
            .await
            .unwrap();

        assert_eq!(runner.calls(), vec![args(&["-s", "emulator-5554", "reboot"])]);
    }

    #[tokio::test]
    async fn test_reboot_failure_propagates() {
        let runner = Arc::new(ScriptedProcessRunner::new());
        runner.script(
            &["-s", "X", "reboot"],
            ScriptedResponse::SpawnFailure("permission denied".to_string()),
        );

        let result = directory(&runner).reboot(&DeviceRecord::new("X")).await;

        tokio_test::assert_err!(result);
    }

    #[tokio::test]
    async fn test_restart_server_swallows_failures() {
        let runner = Arc::new(ScriptedProcessRunner::new());
        runner.script(
            &["kill-server"],
            ScriptedResponse::SpawnFailure("gone".to_string()),
        );

        directory(&runner).restart_server().await;

        assert_eq!(
            runner.calls(),
            vec![args(&["kill-server"]), args(&["start-server"])]
        );
    }
}

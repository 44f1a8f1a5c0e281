// Mirror Launcher - Opens the screen-mirroring viewer for one device

use crate::domain::{DeviceRecord, ToolPaths};
use crate::error::{AppError, Result};
use crate::port::ProcessRunner;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Viewer flags
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorOptions {
    /// Mirror only, do not forward input (`--no-control`)
    pub no_control: bool,
    /// Video bitrate, passed verbatim (`-b 8M`)
    pub bitrate: Option<String>,
    /// Show physical touches (`-t`)
    pub show_touches: bool,
}

/// Viewer arguments: `-s <serial>` first, then the optional flags
pub fn mirror_args(serial: &str, options: &MirrorOptions) -> Vec<String> {
    let mut args = vec!["-s".to_string(), serial.to_string()];

    if options.show_touches {
        args.push("-t".to_string());
    }
    if options.no_control {
        args.push("--no-control".to_string());
    }
    if let Some(bitrate) = options.bitrate.as_deref().filter(|b| !b.is_empty()) {
        args.push("-b".to_string());
        args.push(bitrate.to_string());
    }

    args
}

#[derive(Clone)]
pub struct MirrorLauncher {
    runner: Arc<dyn ProcessRunner>,
    tools: ToolPaths,
    options: MirrorOptions,
}

impl MirrorLauncher {
    pub fn new(runner: Arc<dyn ProcessRunner>, tools: ToolPaths, options: MirrorOptions) -> Self {
        Self {
            runner,
            tools,
            options,
        }
    }

    pub fn can_view(&self) -> bool {
        self.tools.can_mirror()
    }

    /// Start the viewer for `device` and return immediately
    ///
    /// # Errors
    /// - AppError::ToolMissing if the viewer is not in the install directory
    /// - AppError::Launch if it cannot be started
    pub async fn view(&self, device: &DeviceRecord) -> Result<()> {
        if !self.can_view() {
            return Err(AppError::ToolMissing(self.tools.mirror.display().to_string()));
        }
        self.launch(device).await
    }

    async fn launch(&self, device: &DeviceRecord) -> Result<()> {
        let args = mirror_args(device.serial(), &self.options);
        info!(serial = %device.serial(), args = ?args, "Launching mirror viewer");

        self.runner
            .launch(&self.tools.mirror, &args, &self.tools.install_dir)
            .await
            .map_err(AppError::Launch)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tools::MIRROR_EXECUTABLE;
    use crate::port::process_runner::mocks::ScriptedProcessRunner;
    use crate::port::ProcessError;
    use tempfile::TempDir;

    /// Install directory, optionally holding an (empty) viewer executable
    fn install_dir(with_viewer: bool) -> (TempDir, ToolPaths) {
        let dir = TempDir::new().unwrap();
        if with_viewer {
            std::fs::write(dir.path().join(MIRROR_EXECUTABLE), b"").unwrap();
        }
        let tools = ToolPaths::new(dir.path());
        (dir, tools)
    }

    #[test]
    fn test_args_serial_only() {
        assert_eq!(
            mirror_args("emulator-5554", &MirrorOptions::default()),
            vec!["-s", "emulator-5554"]
        );
    }

    #[test]
    fn test_args_all_flags_in_order() {
        let options = MirrorOptions {
            no_control: true,
            bitrate: Some("8M".to_string()),
            show_touches: true,
        };

        assert_eq!(
            mirror_args("R58M", &options),
            vec!["-s", "R58M", "-t", "--no-control", "-b", "8M"]
        );
    }

    #[test]
    fn test_empty_bitrate_is_omitted() {
        let options = MirrorOptions {
            bitrate: Some(String::new()),
            ..Default::default()
        };

        assert_eq!(mirror_args("X", &options), vec!["-s", "X"]);
    }

    #[tokio::test]
    async fn test_view_launches_in_install_dir() {
        let runner = Arc::new(ScriptedProcessRunner::new());
        let (_dir, tools) = install_dir(true);
        let launcher = MirrorLauncher::new(
            runner.clone(),
            tools.clone(),
            MirrorOptions {
                no_control: true,
                ..Default::default()
            },
        );

        launcher.view(&DeviceRecord::new("emulator-5554")).await.unwrap();

        let launches = runner.launches();
        assert_eq!(launches.len(), 1);
        assert_eq!(launches[0].program, tools.mirror);
        assert_eq!(launches[0].working_dir, tools.install_dir);
        assert_eq!(launches[0].args, vec!["-s", "emulator-5554", "--no-control"]);
    }

    #[tokio::test]
    async fn test_view_without_viewer_is_tool_missing() {
        let runner = Arc::new(ScriptedProcessRunner::new());
        let (_dir, tools) = install_dir(false);
        let launcher = MirrorLauncher::new(runner.clone(), tools, MirrorOptions::default());

        let result = launcher.view(&DeviceRecord::new("X")).await;

        assert!(matches!(result, Err(AppError::ToolMissing(_))));
        assert!(runner.launches().is_empty());
    }

    #[tokio::test]
    async fn test_launch_failure_is_not_a_bridge_failure() {
        let runner = Arc::new(ScriptedProcessRunner::new());
        runner.fail_launches("permission denied");
        let (_dir, tools) = install_dir(true);
        let launcher = MirrorLauncher::new(runner.clone(), tools, MirrorOptions::default());

        let result = launcher.view(&DeviceRecord::new("X")).await;

        assert!(matches!(
            result,
            Err(AppError::Launch(ProcessError::SpawnFailed { .. }))
        ));
        assert!(runner.calls().is_empty());
    }
}

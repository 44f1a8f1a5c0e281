//! Settings: defaults < config file < `ADBTRAY_*` environment < command-line flags

use adbtray_core::application::constants::{
    DEFAULT_EXIT_TIMEOUT, DEFAULT_POLL_INTERVAL, DEFAULT_SETTLE_DELAY,
};
use adbtray_core::application::{DeviceFilter, MirrorOptions, RebootWaitConfig};
use adbtray_infra_system::{ExitTimeoutPolicy, RunnerConfig};
use anyhow::{ensure, Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_PREFIX: &str = "ADBTRAY";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory holding the bridge and viewer executables (`~` is expanded)
    pub install_dir: Option<String>,
    pub poll_interval_ms: u64,
    pub settle_delay_ms: u64,
    /// Give up on a reboot wait after this long; unset waits forever
    pub max_wait_secs: Option<u64>,
    /// Give up on a reboot wait after this many listings; unset waits forever
    pub max_attempts: Option<u32>,
    pub exit_timeout_ms: u64,
    /// Kill bridge processes that outlive their exit timeout instead of detaching
    pub kill_on_timeout: bool,
    /// List unauthorized/offline devices too
    pub include_unready: bool,
    pub mirror: MirrorOptions,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            install_dir: None,
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            settle_delay_ms: DEFAULT_SETTLE_DELAY.as_millis() as u64,
            max_wait_secs: None,
            max_attempts: None,
            exit_timeout_ms: DEFAULT_EXIT_TIMEOUT.as_millis() as u64,
            kill_on_timeout: false,
            include_unready: false,
            mirror: MirrorOptions::default(),
        }
    }
}

impl Settings {
    /// Per-user settings file, if the platform has a config directory
    pub fn default_config_file() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "adbtray")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Load settings from `file` (or the per-user file) and the process environment
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let file = file.map(Path::to_path_buf).or_else(Self::default_config_file);
        Self::build(file.as_deref(), Environment::with_prefix(ENV_PREFIX))
    }

    fn build(file: Option<&Path>, env: Environment) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = file {
            builder = builder.add_source(File::from(path).required(false));
        }

        builder = builder.add_source(
            env.prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Self = builder
            .build()
            .context("Failed to read settings")?
            .try_deserialize()
            .context("Invalid settings")?;

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            self.poll_interval_ms > 0,
            "Invalid settings: poll_interval_ms must be greater than 0"
        );
        Ok(())
    }

    pub fn install_dir(&self) -> Option<PathBuf> {
        self.install_dir
            .as_deref()
            .filter(|dir| !dir.trim().is_empty())
            .map(|dir| PathBuf::from(shellexpand::tilde(dir).into_owned()))
    }

    pub fn device_filter(&self) -> DeviceFilter {
        if self.include_unready {
            DeviceFilter::All
        } else {
            DeviceFilter::Ready
        }
    }

    pub fn runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            exit_timeout: Duration::from_millis(self.exit_timeout_ms),
            on_timeout: if self.kill_on_timeout {
                ExitTimeoutPolicy::Kill
            } else {
                ExitTimeoutPolicy::Detach
            },
        }
    }

    pub fn reboot_wait_config(&self) -> RebootWaitConfig {
        RebootWaitConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            max_attempts: self.max_attempts,
            max_duration: self.max_wait_secs.map(Duration::from_secs),
        }
    }
}

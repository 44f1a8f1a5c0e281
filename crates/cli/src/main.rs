//! adbtray - list, mirror and reboot Android devices through adb
//! Composition root: settings, logging and adapter wiring live here only.

mod logging;
mod settings;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tabled::{Table, Tabled};
use tracing::info;

use adbtray_core::application::{
    cancel_channel, DeviceDirectory, MirrorLauncher, MirrorOptions, RebootOutcome, RebootWaiter,
};
use adbtray_core::domain::{AttachedDevice, DeviceRecord, ToolPaths};
use adbtray_core::port::ProcessRunner;
use adbtray_core::AppError;
use adbtray_infra_system::SubprocessRunner;

use settings::Settings;

#[derive(Parser)]
#[command(name = "adbtray")]
#[command(about = "List, mirror and reboot Android devices over adb", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory containing adb and scrcpy
    #[arg(long, global = true, env = "ADBTRAY_INSTALL_DIR")]
    install_dir: Option<PathBuf>,

    /// Settings file (TOML); defaults to the per-user config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List attached devices
    Devices {
        /// Include unauthorized and offline devices
        #[arg(long)]
        all: bool,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Open the mirror view for a device
    View {
        /// Device serial
        serial: String,

        /// Mirror only, do not forward input
        #[arg(long)]
        no_control: bool,

        /// Video bitrate (e.g. 8M)
        #[arg(short, long)]
        bitrate: Option<String>,

        /// Show physical touches
        #[arg(short = 't', long)]
        show_touches: bool,
    },

    /// Reboot a device, wait for it to come back, then reopen the mirror view
    Reboot {
        /// Device serial
        serial: String,

        /// Do not open the mirror view once the device is back
        #[arg(long)]
        no_view: bool,

        /// Give up after this many seconds
        #[arg(long)]
        max_wait_secs: Option<u64>,
    },

    /// Restart the adb server
    RestartServer,
}

#[derive(Serialize, Tabled)]
struct DeviceRow {
    serial: String,
    bridge: String,
    state: String,
    model: String,
    name: String,
}

impl DeviceRow {
    fn new(record: &DeviceRecord, attached: &[AttachedDevice]) -> Self {
        let bridge = attached
            .iter()
            .find(|a| a.serial == record.serial())
            .map(|a| a.bridge_state.to_string())
            .unwrap_or_else(|| "?".to_string());

        Self {
            serial: record.serial().to_string(),
            bridge,
            state: record.state.to_string(),
            model: record.model.clone(),
            name: record.name.clone(),
        }
    }
}

/// Wired services for one invocation
struct App {
    directory: DeviceDirectory,
    waiter: RebootWaiter,
    launcher: MirrorLauncher,
}

impl App {
    fn new(settings: &Settings, tools: ToolPaths, mirror: MirrorOptions) -> Self {
        let runner: Arc<dyn ProcessRunner> =
            Arc::new(SubprocessRunner::new(settings.runner_config()));

        let directory = DeviceDirectory::new(runner.clone(), tools.bridge.clone())
            .with_filter(settings.device_filter());
        let waiter = RebootWaiter::new(Arc::new(directory.clone()), settings.reboot_wait_config());
        let launcher = MirrorLauncher::new(runner, tools, mirror);

        Self {
            directory,
            waiter,
            launcher,
        }
    }

    async fn find_device(&self, serial: &str) -> Result<DeviceRecord> {
        let devices = self.directory.list_devices().await?;
        match devices.into_iter().find(|d| d.serial() == serial) {
            Some(device) => Ok(device),
            None => bail!("Device {} is not attached", serial),
        }
    }
}

async fn list_devices(app: &App, json: bool) -> Result<()> {
    let survey = app.directory.survey().await?;
    let rows: Vec<DeviceRow> = survey
        .devices
        .iter()
        .map(|d| DeviceRow::new(d, &survey.attached))
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!("{}", "No devices attached".yellow());
    } else {
        println!("{}", Table::new(rows));
    }

    let hidden = survey.hidden();
    if hidden > 0 {
        println!(
            "{}",
            format!("{} more device(s) not ready; use --all to list them", hidden).dimmed()
        );
    }

    Ok(())
}

async fn view_device(app: &App, serial: &str) -> Result<()> {
    app.launcher.view(&DeviceRecord::new(serial)).await?;
    println!("{}", format!("✓ Mirror view opened for {}", serial).green().bold());
    Ok(())
}

async fn reboot_device(app: &App, serial: &str, no_view: bool) -> Result<()> {
    let device = app.find_device(serial).await?;

    println!(
        "{}",
        format!("↻ Rebooting {} ({})", device.display_name(), device.serial())
            .cyan()
            .bold()
    );
    println!("Waiting for the device to come back. Press Ctrl+C to stop waiting.");

    let (cancel, token) = cancel_channel();
    let mut handle = app.waiter.spawn(device, token, |record| {
        println!(
            "{}",
            format!("✓ {} is back online", record.display_name()).green().bold()
        );
    });

    let joined = tokio::select! {
        joined = &mut handle => joined,
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C received, cancelling reboot wait");
            cancel.cancel();
            handle.await
        }
    };

    match joined.context("Reboot wait task failed")?? {
        RebootOutcome::Ready(record) => {
            if !no_view {
                app.launcher.view(&record).await?;
                println!("{}", "✓ Mirror view reopened".green());
            }
        }
        RebootOutcome::Cancelled => println!("{}", "Stopped waiting".yellow()),
        RebootOutcome::Exhausted { attempts } => {
            bail!("Device {} did not come back after {} checks", serial, attempts)
        }
    }

    Ok(())
}

async fn run(app: &App, command: Commands) -> Result<()> {
    match command {
        Commands::Devices { json, .. } => list_devices(app, json).await,
        Commands::View { serial, .. } => view_device(app, &serial).await,
        Commands::Reboot {
            serial, no_view, ..
        } => reboot_device(app, &serial, no_view).await,
        Commands::RestartServer => {
            app.directory.restart_server().await;
            println!("{}", "✓ adb server restarted".green());
            Ok(())
        }
    }
}

/// True if the failure came from running the bridge; viewer launch failures do not count
fn is_bridge_failure(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<AppError>(), Some(AppError::Process(_)))
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging();

    let cli = Cli::parse();
    let mut settings = Settings::load(cli.config.as_deref())?;

    // Command-line flags override file and environment
    match &cli.command {
        Commands::Devices { all: true, .. } => settings.include_unready = true,
        Commands::View {
            no_control,
            bitrate,
            show_touches,
            ..
        } => {
            settings.mirror.no_control |= *no_control;
            settings.mirror.show_touches |= *show_touches;
            if bitrate.is_some() {
                settings.mirror.bitrate = bitrate.clone();
            }
        }
        Commands::Reboot {
            max_wait_secs: Some(secs),
            ..
        } => settings.max_wait_secs = Some(*secs),
        _ => {}
    }

    let install_dir = cli.install_dir.clone().or_else(|| settings.install_dir());
    let cwd = std::env::current_dir().context("Cannot read working directory")?;
    let tools = ToolPaths::resolve(install_dir.as_deref(), &cwd)
        .context("Set --install-dir or ADBTRAY_INSTALL_DIR to the folder containing adb and scrcpy")?;

    info!(
        version = adbtray_core::VERSION,
        install_dir = %tools.install_dir.display(),
        "adbtray starting"
    );

    let app = App::new(&settings, tools, settings.mirror.clone());

    if let Err(e) = run(&app, cli.command).await {
        if is_bridge_failure(&e) {
            eprintln!("{}", "✗ Cannot connect to adb".red().bold());
            eprintln!("  Trying to restart the adb server...");
            app.directory.restart_server().await;
        }
        return Err(e);
    }

    Ok(())
}

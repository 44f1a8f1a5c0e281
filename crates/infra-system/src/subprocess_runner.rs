// Subprocess runner implementation
// reason: async-trait, tokio for async process management
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use adbtray_core::application::constants::DEFAULT_EXIT_TIMEOUT;
use adbtray_core::port::{ProcessError, ProcessRunner};

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// What to do with a child that is still running after its exit timeout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExitTimeoutPolicy {
    /// Leave it running and return the captured output
    #[default]
    Detach,
    /// Kill it, reap it, then return the captured output
    Kill,
}

/// How the child ended, as far as the runner observed it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    Exited(Option<i32>),
    Detached,
    Killed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    pub exit_timeout: Duration,
    pub on_timeout: ExitTimeoutPolicy,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            exit_timeout: DEFAULT_EXIT_TIMEOUT,
            on_timeout: ExitTimeoutPolicy::default(),
        }
    }
}

/// Subprocess runner
/// Spawns the bridge/viewer executables with no console window and captured stdout
pub struct SubprocessRunner {
    config: RunnerConfig,
}

impl SubprocessRunner {
    /// Create a new subprocess runner
    ///
    /// # Example
    /// ```ignore
    /// let runner = SubprocessRunner::new(RunnerConfig {
    ///     exit_timeout: Duration::from_secs(5),
    ///     on_timeout: ExitTimeoutPolicy::Kill,
    /// });
    /// ```
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    fn command(program: &Path, args: &[String]) -> Command {
        let mut cmd = Command::new(program);
        cmd.args(args).stdin(Stdio::null());

        #[cfg(windows)]
        cmd.creation_flags(CREATE_NO_WINDOW);

        cmd
    }

    fn spawn_failed(program: &Path, e: std::io::Error) -> ProcessError {
        ProcessError::SpawnFailed {
            program: program.display().to_string(),
            reason: e.to_string(),
        }
    }

    /// Read every line until EOF, decoding lossily and dropping line terminators
    async fn read_lines<R: AsyncRead + Unpin>(stream: R) -> Result<Vec<String>, ProcessError> {
        let mut reader = BufReader::new(stream);
        let mut lines = Vec::new();
        let mut buf = Vec::new();

        loop {
            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .await
                .map_err(|e| ProcessError::Io(e.to_string()))?;
            if read == 0 {
                break;
            }

            while matches!(buf.last(), Some(b'\n' | b'\r')) {
                buf.pop();
            }
            lines.push(String::from_utf8_lossy(&buf).into_owned());
        }

        Ok(lines)
    }

    /// Wait for exit, bounded by the configured timeout
    async fn wait_bounded(&self, child: &mut Child, program: &Path) -> ExitOutcome {
        let waited = timeout(self.config.exit_timeout, child.wait()).await;
        match waited {
            Ok(Ok(status)) => ExitOutcome::Exited(status.code()),
            Ok(Err(e)) => {
                warn!(program = %program.display(), error = %e, "Failed to wait for child");
                ExitOutcome::Exited(None)
            }
            Err(_) => match self.config.on_timeout {
                ExitTimeoutPolicy::Detach => {
                    warn!(
                        program = %program.display(),
                        timeout_ms = self.config.exit_timeout.as_millis() as u64,
                        "Child still running after stdout closed, detaching"
                    );
                    ExitOutcome::Detached
                }
                ExitTimeoutPolicy::Kill => {
                    warn!(
                        program = %program.display(),
                        timeout_ms = self.config.exit_timeout.as_millis() as u64,
                        "Child still running after stdout closed, killing"
                    );
                    if let Err(e) = child.kill().await {
                        warn!(program = %program.display(), error = %e, "Failed to kill child");
                    }
                    ExitOutcome::Killed
                }
            },
        }
    }

    /// Spawn, capture stdout, then wait for exit
    pub(crate) async fn run(
        &self,
        program: &Path,
        args: &[String],
    ) -> Result<(Vec<String>, ExitOutcome), ProcessError> {
        debug!(program = %program.display(), args = ?args, "Starting subprocess");

        let mut child = Self::command(program, args)
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Self::spawn_failed(program, e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ProcessError::Io("child stdout was not captured".to_string()))?;

        let lines = Self::read_lines(stdout).await?;
        let outcome = self.wait_bounded(&mut child, program).await;

        debug!(
            program = %program.display(),
            lines = lines.len(),
            outcome = ?outcome,
            "Subprocess finished"
        );

        Ok((lines, outcome))
    }
}

impl Default for SubprocessRunner {
    fn default() -> Self {
        Self::new(RunnerConfig::default())
    }
}

#[async_trait]
impl ProcessRunner for SubprocessRunner {
    async fn execute(&self, program: &Path, args: &[String]) -> Result<Vec<String>, ProcessError> {
        let (lines, _) = self.run(program, args).await?;
        Ok(lines)
    }

    async fn launch(
        &self,
        program: &Path,
        args: &[String],
        working_dir: &Path,
    ) -> Result<(), ProcessError> {
        let child = Self::command(program, args)
            .current_dir(working_dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Self::spawn_failed(program, e))?;

        info!(
            program = %program.display(),
            pid = ?child.id(),
            "Launched detached process"
        );
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn sh(script: &str) -> (PathBuf, Vec<String>) {
        (PathBuf::from("sh"), vec!["-c".to_string(), script.to_string()])
    }

    fn runner(exit_timeout_ms: u64, on_timeout: ExitTimeoutPolicy) -> SubprocessRunner {
        SubprocessRunner::new(RunnerConfig {
            exit_timeout: Duration::from_millis(exit_timeout_ms),
            on_timeout,
        })
    }

    #[tokio::test]
    async fn test_execute_captures_lines_in_order() {
        let (program, args) = sh("printf 'List of devices attached\\r\\nemulator-5554\\tdevice\\r\\n\\n'");

        let lines = SubprocessRunner::default().execute(&program, &args).await.unwrap();

        assert_eq!(lines, vec!["List of devices attached", "emulator-5554\tdevice", ""]);
    }

    #[tokio::test]
    async fn test_last_line_without_newline_is_kept() {
        let (program, args) = sh("printf 'a\\nb'");

        let lines = SubprocessRunner::default().execute(&program, &args).await.unwrap();

        assert_eq!(lines, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_decoded_lossily() {
        let (program, args) = sh("printf '[ro.product.model]: [\\377]\\n'");

        let lines = SubprocessRunner::default().execute(&program, &args).await.unwrap();

        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("[ro.product.model]: ["));
    }

    #[tokio::test]
    async fn test_missing_executable_is_spawn_failure() {
        let program = PathBuf::from("/nonexistent/adbtray/adb");

        let result = SubprocessRunner::default().execute(&program, &[]).await;

        assert!(matches!(result, Err(ProcessError::SpawnFailed { .. })));
    }

    #[tokio::test]
    async fn test_exit_code_is_reported() {
        let (program, args) = sh("echo hi; exit 3");

        let (lines, outcome) = SubprocessRunner::default().run(&program, &args).await.unwrap();

        assert_eq!(lines, vec!["hi"]);
        assert_eq!(outcome, ExitOutcome::Exited(Some(3)));
    }

    #[tokio::test]
    async fn test_timeout_detaches_by_default() {
        let (program, args) = sh("echo early; exec >&-; sleep 2");

        let (lines, outcome) = runner(100, ExitTimeoutPolicy::Detach)
            .run(&program, &args)
            .await
            .unwrap();

        assert_eq!(lines, vec!["early"]);
        assert_eq!(outcome, ExitOutcome::Detached);
    }

    #[tokio::test]
    async fn test_timeout_kills_when_configured() {
        let (program, args) = sh("echo early; exec >&-; sleep 10");
        let started = std::time::Instant::now();

        let (lines, outcome) = runner(100, ExitTimeoutPolicy::Kill)
            .run(&program, &args)
            .await
            .unwrap();

        assert_eq!(lines, vec!["early"]);
        assert_eq!(outcome, ExitOutcome::Killed);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_launch_does_not_wait() {
        let (program, args) = sh("sleep 10");
        let started = std::time::Instant::now();

        SubprocessRunner::default()
            .launch(&program, &args, Path::new("/"))
            .await
            .unwrap();

        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_launch_missing_executable_is_spawn_failure() {
        let result = SubprocessRunner::default()
            .launch(Path::new("/nonexistent/scrcpy"), &[], Path::new("/"))
            .await;

        assert!(matches!(result, Err(ProcessError::SpawnFailed { .. })));
    }
}

// Process Runner Port
// Abstraction for invoking the bridge and mirroring executables

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Process errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessError {
    #[error("Failed to start {program}: {reason}")]
    SpawnFailed { program: String, reason: String },

    #[error("IO error: {0}")]
    Io(String),
}

/// Process Runner trait
///
/// Implementations:
/// - SubprocessRunner: spawns a real child process (infra-system)
/// - ScriptedProcessRunner: returns canned output (tests)
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run `program` to completion and return its stdout, one entry per line
    ///
    /// Lines keep output order. A child that does not exit after closing
    /// stdout does not block the call forever.
    ///
    /// # Errors
    /// - ProcessError::SpawnFailed if the executable cannot be started
    /// - ProcessError::Io if stdout cannot be read
    async fn execute(&self, program: &Path, args: &[String]) -> Result<Vec<String>, ProcessError>;

    /// Start `program` and return without waiting for it
    ///
    /// # Errors
    /// - ProcessError::SpawnFailed if the executable cannot be started
    async fn launch(
        &self,
        program: &Path,
        args: &[String],
        working_dir: &Path,
    ) -> Result<(), ProcessError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// Scripted reply for one invocation
    #[derive(Debug, Clone)]
    pub enum ScriptedResponse {
        Lines(Vec<String>),
        SpawnFailure(String),
    }

    impl ScriptedResponse {
        pub fn lines(lines: &[&str]) -> Self {
            ScriptedResponse::Lines(lines.iter().map(|l| l.to_string()).collect())
        }

        /// Split a raw stdout blob the way a real child's output is split
        pub fn text(text: &str) -> Self {
            ScriptedResponse::Lines(text.lines().map(|l| l.to_string()).collect())
        }
    }

    /// A recorded `launch` call
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct LaunchRecord {
        pub program: PathBuf,
        pub args: Vec<String>,
        pub working_dir: PathBuf,
    }

    /// Mock Process Runner for testing
    ///
    /// Responses are keyed by the space-joined argument list. Each key holds
    /// a queue; once only one response is left it is repeated forever.
    /// Unscripted invocations produce no output.
    #[derive(Default)]
    pub struct ScriptedProcessRunner {
        scripts: Mutex<HashMap<String, VecDeque<ScriptedResponse>>>,
        calls: Mutex<Vec<Vec<String>>>,
        launches: Mutex<Vec<LaunchRecord>>,
        launch_failure: Mutex<Option<String>>,
    }

    impl ScriptedProcessRunner {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue a response for the given argument list
        pub fn script(&self, args: &[&str], response: ScriptedResponse) -> &Self {
            self.scripts
                .lock()
                .unwrap()
                .entry(args.join(" "))
                .or_default()
                .push_back(response);
            self
        }

        pub fn fail_launches(&self, reason: impl Into<String>) {
            *self.launch_failure.lock().unwrap() = Some(reason.into());
        }

        /// All `execute` argument lists, in call order
        pub fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().unwrap().clone()
        }

        pub fn call_count(&self, args: &[&str]) -> usize {
            let key = args.join(" ");
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.join(" ") == key)
                .count()
        }

        pub fn launches(&self) -> Vec<LaunchRecord> {
            self.launches.lock().unwrap().clone()
        }

        fn next_response(&self, key: &str) -> Option<ScriptedResponse> {
            let mut scripts = self.scripts.lock().unwrap();
            let queue = scripts.get_mut(key)?;
            if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            }
        }
    }

    #[async_trait]
    impl ProcessRunner for ScriptedProcessRunner {
        async fn execute(
            &self,
            program: &Path,
            args: &[String],
        ) -> Result<Vec<String>, ProcessError> {
            self.calls.lock().unwrap().push(args.to_vec());

            match self.next_response(&args.join(" ")) {
                Some(ScriptedResponse::Lines(lines)) => Ok(lines),
                Some(ScriptedResponse::SpawnFailure(reason)) => Err(ProcessError::SpawnFailed {
                    program: program.display().to_string(),
                    reason,
                }),
                None => Ok(Vec::new()),
            }
        }

        async fn launch(
            &self,
            program: &Path,
            args: &[String],
            working_dir: &Path,
        ) -> Result<(), ProcessError> {
            if let Some(reason) = self.launch_failure.lock().unwrap().clone() {
                return Err(ProcessError::SpawnFailed {
                    program: program.display().to_string(),
                    reason,
                });
            }

            self.launches.lock().unwrap().push(LaunchRecord {
                program: program.to_path_buf(),
                args: args.to_vec(),
                working_dir: working_dir.to_path_buf(),
            });
            Ok(())
        }
    }
}

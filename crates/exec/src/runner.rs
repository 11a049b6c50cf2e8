use async_trait::async_trait;
use autobrowse_core::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

/// Result of one local process execution.
#[derive(Debug, Clone, Default)]
pub struct RunOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    /// Runtime-image metadata reported by the execution environment, if any.
    /// The proxy records it for subsequent calls.
    pub image: Option<String>,
}

/// Local process execution seam. Production shells out through tokio;
/// tests substitute a scripted runner.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(
        &self,
        code: &str,
        language: &str,
        work_dir: &Path,
        filename: Option<&str>,
    ) -> Result<RunOutput>;
}

pub struct TokioCommandRunner {
    timeout: Duration,
}

impl TokioCommandRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn run_command(&self, mut cmd: Command, what: &str) -> Result<RunOutput> {
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        let result = timeout(self.timeout, cmd.output()).await;
        match result {
            Ok(Ok(output)) => Ok(RunOutput {
                exit_code: output.status.code().unwrap_or(-1),
                stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                image: None,
            }),
            Ok(Err(e)) => Err(Error::Exec(format!("Failed to run {}: {}", what, e))),
            Err(_) => Err(Error::Timeout(format!(
                "{} timed out after {} seconds",
                what,
                self.timeout.as_secs()
            ))),
        }
    }
}

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(
        &self,
        code: &str,
        language: &str,
        work_dir: &Path,
        filename: Option<&str>,
    ) -> Result<RunOutput> {
        std::fs::create_dir_all(work_dir)?;

        match language {
            "python" => {
                let file: PathBuf = work_dir.join(filename.unwrap_or("snippet.py"));
                std::fs::write(&file, code)?;
                debug!(file = %file.display(), "Running python block");
                let mut cmd = Command::new("python3");
                cmd.arg(&file).current_dir(work_dir);
                self.run_command(cmd, "python").await
            }
            _ => {
                debug!(language, "Running shell block");
                let mut cmd = Command::new("sh");
                cmd.arg("-c").arg(code).current_dir(work_dir);
                self.run_command(cmd, "shell command").await
            }
        }
    }
}

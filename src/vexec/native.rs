//! Native OS command runner using `tokio::process`.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::error::{AccordError, AccordResult};

use super::{CommandRunner, ExecOutput};

/// Executes commands as real OS subprocesses via `sh -c`.
pub struct NativeRunner;

impl NativeRunner {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NativeRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for NativeRunner {
    fn run<'a>(
        &'a self,
        command: &'a str,
        timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = AccordResult<ExecOutput>> + Send + 'a>> {
        Box::pin(async move {
            let mut cmd = tokio::process::Command::new("sh");
            cmd.arg("-c").arg(command);

            let output = tokio::time::timeout(timeout, cmd.output())
                .await
                .map_err(|_| {
                    AccordError::execution(format!(
                        "Command timed out after {}s",
                        timeout.as_secs()
                    ))
                })?
                .map_err(|e| AccordError::execution(format!("Failed to execute: {e}")))?;

            let stdout = String::from_utf8_lossy(&output.stdout).to_string();
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();

            #[cfg(unix)]
            let exit_code = {
                use std::os::unix::process::ExitStatusExt;
                output
                    .status
                    .code()
                    .unwrap_or_else(|| output.status.signal().map(|s| 128 + s).unwrap_or(1))
            };
            #[cfg(not(unix))]
            let exit_code = output.status.code().unwrap_or(1);

            Ok(ExecOutput {
                stdout,
                stderr,
                exit_code,
            })
        })
    }
}

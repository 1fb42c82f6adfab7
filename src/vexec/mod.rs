//! Command execution capability.
//!
//! Provides a [`CommandRunner`] trait that decouples process spawning from
//! the OS. Ships with [`NativeRunner`] (behind the `native` feature) for real
//! subprocess execution, [`NoopRunner`] for environments without a shell, and
//! [`MockRunner`] for tests.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AccordResult;

/// Output of a command execution. A failing exit status is data, not an
/// error; only spawn failures and timeouts surface as errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Command execution trait. The timeout bounds the whole run; expiry is an
/// execution error for the single requirement being resolved.
pub trait CommandRunner: Send + Sync {
    fn run<'a>(
        &'a self,
        command: &'a str,
        timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = AccordResult<ExecOutput>> + Send + 'a>>;
}

/// Runner for environments where command execution is unavailable.
pub struct NoopRunner;

impl CommandRunner for NoopRunner {
    fn run<'a>(
        &'a self,
        _command: &'a str,
        _timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = AccordResult<ExecOutput>> + Send + 'a>> {
        Box::pin(async {
            Ok(ExecOutput {
                stdout: String::new(),
                stderr: "Command execution not available in this environment".to_string(),
                exit_code: 1,
            })
        })
    }
}

/// Test runner with canned responses and an invocation counter.
pub struct MockRunner {
    responses: std::sync::Mutex<Vec<ExecOutput>>,
    invocations: std::sync::atomic::AtomicUsize,
}

impl MockRunner {
    pub fn new(responses: Vec<ExecOutput>) -> Self {
        Self {
            responses: std::sync::Mutex::new(responses),
            invocations: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// A mock that always succeeds with the given stdout.
    pub fn always_ok(stdout: impl Into<String>) -> Self {
        let out = stdout.into();
        Self::new(vec![
            ExecOutput {
                stdout: out,
                stderr: String::new(),
                exit_code: 0,
            };
            100
        ])
    }

    /// How many times `run` was called.
    pub fn invocations(&self) -> usize {
        self.invocations.load(std::sync::atomic::Ordering::SeqCst)
    }
}

impl CommandRunner for MockRunner {
    fn run<'a>(
        &'a self,
        _command: &'a str,
        _timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = AccordResult<ExecOutput>> + Send + 'a>> {
        Box::pin(async {
            self.invocations
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                Ok(ExecOutput {
                    stdout: String::new(),
                    stderr: "No more mock responses".to_string(),
                    exit_code: 1,
                })
            } else {
                Ok(responses.remove(0))
            }
        })
    }
}

#[cfg(feature = "native")]
mod native;
#[cfg(feature = "native")]
pub use native::NativeRunner;

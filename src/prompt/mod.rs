//! User confirmation capability.
//!
//! The loop talks to the user through a [`UserPrompt`]: it shows requirement
//! banners and denial reasons, and asks for explicit confirmation before
//! anything executes. Ships with [`StdioPrompt`] (behind the `native`
//! feature) plus scripted/auto implementations for tests and headless runs.

use std::future::Future;
use std::pin::Pin;

/// Blocking user interaction surface.
pub trait UserPrompt: Send + Sync {
    /// Ask a yes/no question; `true` means the user approved.
    fn confirm<'a>(&'a self, message: &'a str) -> Pin<Box<dyn Future<Output = bool> + Send + 'a>>;

    /// Display a line of output to the user.
    fn show(&self, message: &str);
}

/// Approves everything without interaction. For unattended runs where the
/// path policy alone is trusted.
pub struct AutoAllowPrompt;

impl UserPrompt for AutoAllowPrompt {
    fn confirm<'a>(&'a self, _message: &'a str) -> Pin<Box<dyn Future<Output = bool> + Send + 'a>> {
        Box::pin(async { true })
    }

    fn show(&self, _message: &str) {}
}

/// Test prompt with scripted answers. Records everything shown and asked;
/// once the script is exhausted it denies, mirroring the conservative
/// default of an absent user.
pub struct ScriptedPrompt {
    answers: std::sync::Mutex<std::collections::VecDeque<bool>>,
    default_answer: bool,
    asked: std::sync::Mutex<Vec<String>>,
    shown: std::sync::Mutex<Vec<String>>,
}

impl ScriptedPrompt {
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: std::sync::Mutex::new(answers.into_iter().collect()),
            default_answer: false,
            asked: std::sync::Mutex::new(Vec::new()),
            shown: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// A prompt that approves every confirmation.
    pub fn always_yes() -> Self {
        Self {
            default_answer: true,
            ..Self::new([])
        }
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }

    pub fn shown(&self) -> Vec<String> {
        self.shown.lock().unwrap().clone()
    }
}

impl UserPrompt for ScriptedPrompt {
    fn confirm<'a>(&'a self, message: &'a str) -> Pin<Box<dyn Future<Output = bool> + Send + 'a>> {
        Box::pin(async move {
            self.asked.lock().unwrap().push(message.to_string());
            let mut answers = self.answers.lock().unwrap();
            answers.pop_front().unwrap_or(self.default_answer)
        })
    }

    fn show(&self, message: &str) {
        self.shown.lock().unwrap().push(message.to_string());
    }
}

#[cfg(feature = "native")]
mod stdio {
    use super::UserPrompt;
    use std::future::Future;
    use std::io::Write;
    use std::pin::Pin;

    /// Interactive terminal prompt: prints the question and reads a y/N line
    /// from stdin.
    pub struct StdioPrompt;

    impl StdioPrompt {
        pub fn new() -> Self {
            Self
        }
    }

    impl Default for StdioPrompt {
        fn default() -> Self {
            Self::new()
        }
    }

    impl UserPrompt for StdioPrompt {
        fn confirm<'a>(
            &'a self,
            message: &'a str,
        ) -> Pin<Box<dyn Future<Output = bool> + Send + 'a>> {
            let question = format!("{message} [y/N]: ");
            Box::pin(async move {
                // stdin has no async story worth having here; one blocking
                // read on a dedicated thread keeps the loop honest.
                tokio::task::spawn_blocking(move || {
                    print!("{question}");
                    let _ = std::io::stdout().flush();
                    let mut line = String::new();
                    if std::io::stdin().read_line(&mut line).is_err() {
                        return false;
                    }
                    matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
                })
                .await
                .unwrap_or(false)
            })
        }

        fn show(&self, message: &str) {
            println!("{message}");
        }
    }
}

#[cfg(feature = "native")]
pub use stdio::StdioPrompt;

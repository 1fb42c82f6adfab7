//! # accord-core
//!
//! Access-negotiation core for LLM assistants: an external model asks for
//! files and shell commands through typed requirements, a local loop decides
//! per requirement whether to honor it, asks the user, executes through
//! narrow primitives, and returns typed results into the conversation.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use accord_core::config::AccordConfig;
//! use accord_core::conversation::ConversationLoop;
//! use accord_core::prompt::StdioPrompt;
//! use accord_core::provider::OpenAiClient;
//! use accord_core::vexec::NativeRunner;
//! use accord_core::vfs::NativeFs;
//!
//! # async fn run() -> accord_core::AccordResult<()> {
//! let config = Arc::new(AccordConfig {
//!     path_rules: vec!["/home/user/docs:r".into(), "/home/user/docs/private:n".into()],
//!     allow_commands: true,
//!     ..Default::default()
//! });
//!
//! let mut conversation = ConversationLoop::new(
//!     config.clone(),
//!     "You may request file reads, file metadata, and commands.",
//!     Arc::new(OpenAiClient::from_config(&config)),
//!     Arc::new(NativeFs::new()),
//!     Arc::new(NativeRunner::new()),
//!     Arc::new(StdioPrompt::new()),
//! )?;
//!
//! let answer = conversation.run("Which files changed this afternoon?").await?;
//! println!("{answer}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`policy`] | Path rules and the veto-dominant `is_allowed` decision |
//! | [`schema`] | Closed requirement/result unions, messages, history |
//! | [`hook`] | Before/after interceptor registry around execution |
//! | [`conversation`] | The session state machine composing everything |
//! | [`vfs`] / [`vexec`] | Filesystem and command capabilities (native + test) |
//! | [`prompt`] | User confirmation capability |
//! | [`provider`] | LLM client capability (OpenAI-compatible + mock) |
//! | [`eventlog`] | Structured decision log with pluggable sinks |
//! | [`config`] / [`error`] | Startup configuration and the error model |

pub mod config;
pub mod conversation;
pub mod error;
pub mod eventlog;
pub mod hook;
pub mod policy;
pub mod prompt;
pub mod provider;
pub mod schema;
pub mod vexec;
pub mod vfs;

pub use error::{AccordError, AccordResult};

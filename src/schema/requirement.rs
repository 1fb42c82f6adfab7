use serde::{Deserialize, Serialize};

use crate::error::{AccordError, AccordResult};
use crate::policy::AccessLevel;

/// Variant tag of a [`Requirement`], used for hook filtering and dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementKind {
    FileRead,
    FileMetadata,
    Command,
}

impl std::fmt::Display for RequirementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequirementKind::FileRead => write!(f, "file_read"),
            RequirementKind::FileMetadata => write!(f, "file_metadata"),
            RequirementKind::Command => write!(f, "command"),
        }
    }
}

/// A typed request from the LLM for information or action.
///
/// Every variant carries a human-readable justification (`comment`) that must
/// be non-empty before being shown to the user. Requirements are immutable
/// once received; [`Requirement::validate`] rejects malformed ones on receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Requirement {
    FileRead { path: String, comment: String },
    FileMetadata { path: String, comment: String },
    Command { command: String, comment: String },
}

impl Requirement {
    pub fn file_read(path: impl Into<String>, comment: impl Into<String>) -> Self {
        Requirement::FileRead {
            path: path.into(),
            comment: comment.into(),
        }
    }

    pub fn file_metadata(path: impl Into<String>, comment: impl Into<String>) -> Self {
        Requirement::FileMetadata {
            path: path.into(),
            comment: comment.into(),
        }
    }

    pub fn command(command: impl Into<String>, comment: impl Into<String>) -> Self {
        Requirement::Command {
            command: command.into(),
            comment: comment.into(),
        }
    }

    pub fn kind(&self) -> RequirementKind {
        match self {
            Requirement::FileRead { .. } => RequirementKind::FileRead,
            Requirement::FileMetadata { .. } => RequirementKind::FileMetadata,
            Requirement::Command { .. } => RequirementKind::Command,
        }
    }

    pub fn comment(&self) -> &str {
        match self {
            Requirement::FileRead { comment, .. }
            | Requirement::FileMetadata { comment, .. }
            | Requirement::Command { comment, .. } => comment,
        }
    }

    /// Target path for file variants.
    pub fn path(&self) -> Option<&str> {
        match self {
            Requirement::FileRead { path, .. } | Requirement::FileMetadata { path, .. } => {
                Some(path)
            }
            Requirement::Command { .. } => None,
        }
    }

    /// Command text for the command variant.
    pub fn command_text(&self) -> Option<&str> {
        match self {
            Requirement::Command { command, .. } => Some(command),
            _ => None,
        }
    }

    /// The minimum access level this requirement needs from the path policy.
    /// Command requirements are not path-checked.
    pub fn min_level(&self) -> Option<AccessLevel> {
        match self {
            Requirement::FileRead { .. } => Some(AccessLevel::Read),
            Requirement::FileMetadata { .. } => Some(AccessLevel::Metadata),
            Requirement::Command { .. } => None,
        }
    }

    /// Check receipt invariants: non-empty comment, non-empty path/command.
    pub fn validate(&self) -> AccordResult<()> {
        if self.comment().trim().is_empty() {
            return Err(AccordError::Protocol(format!(
                "{} requirement has an empty comment",
                self.kind()
            )));
        }
        match self {
            Requirement::FileRead { path, .. } | Requirement::FileMetadata { path, .. } => {
                if path.trim().is_empty() {
                    return Err(AccordError::Protocol(format!(
                        "{} requirement has an empty path",
                        self.kind()
                    )));
                }
            }
            Requirement::Command { command, .. } => {
                if command.trim().is_empty() {
                    return Err(AccordError::Protocol(
                        "command requirement has an empty command".into(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// One-line description shown to the user before confirmation.
    pub fn describe(&self) -> String {
        match self {
            Requirement::FileRead { path, .. } => format!("read file '{path}'"),
            Requirement::FileMetadata { path, .. } => format!("read metadata of '{path}'"),
            Requirement::Command { command, .. } => format!("run command `{command}`"),
        }
    }
}

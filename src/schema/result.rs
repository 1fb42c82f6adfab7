use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::vfs::{ContentEncoding, FileMetadata};

use super::{Requirement, RequirementKind};

/// The typed outcome produced for a [`Requirement`].
///
/// Every variant embeds the requirement it answers; that linkage is what ties
/// a result back into the conversation and must never be dropped. `accepted`
/// distinguishes a denial (policy, user, or veto) from an execution, and
/// `error` carries the reason the LLM received no data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RequirementResult {
    FileRead {
        requirement: Requirement,
        accepted: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        encoding: Option<ContentEncoding>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<FileMetadata>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        listing: Option<Vec<String>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    FileMetadata {
        requirement: Requirement,
        accepted: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<FileMetadata>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        listing: Option<Vec<String>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Command {
        requirement: Requirement,
        accepted: bool,
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stdout: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stderr: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl RequirementResult {
    /// Empty result for a requirement that was not executed: policy denial,
    /// user denial, or disabled commands. `accepted` is false and `error`
    /// carries the reason.
    pub fn denied(requirement: &Requirement, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        match requirement {
            Requirement::FileRead { .. } => RequirementResult::FileRead {
                requirement: requirement.clone(),
                accepted: false,
                content: None,
                encoding: None,
                metadata: None,
                listing: None,
                error: Some(reason),
            },
            Requirement::FileMetadata { .. } => RequirementResult::FileMetadata {
                requirement: requirement.clone(),
                accepted: false,
                metadata: None,
                listing: None,
                error: Some(reason),
            },
            Requirement::Command { .. } => RequirementResult::Command {
                requirement: requirement.clone(),
                accepted: false,
                success: false,
                stdout: None,
                stderr: None,
                error: Some(reason),
            },
        }
    }

    /// Error result for a requirement the user approved but whose primitive
    /// (or a hook around it) failed.
    pub fn failed(requirement: &Requirement, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        match requirement {
            Requirement::FileRead { .. } => RequirementResult::FileRead {
                requirement: requirement.clone(),
                accepted: true,
                content: None,
                encoding: None,
                metadata: None,
                listing: None,
                error: Some(reason),
            },
            Requirement::FileMetadata { .. } => RequirementResult::FileMetadata {
                requirement: requirement.clone(),
                accepted: true,
                metadata: None,
                listing: None,
                error: Some(reason),
            },
            Requirement::Command { .. } => RequirementResult::Command {
                requirement: requirement.clone(),
                accepted: true,
                success: false,
                stdout: None,
                stderr: None,
                error: Some(reason),
            },
        }
    }

    pub fn requirement(&self) -> &Requirement {
        match self {
            RequirementResult::FileRead { requirement, .. }
            | RequirementResult::FileMetadata { requirement, .. }
            | RequirementResult::Command { requirement, .. } => requirement,
        }
    }

    pub fn kind(&self) -> RequirementKind {
        self.requirement().kind()
    }

    pub fn accepted(&self) -> bool {
        match self {
            RequirementResult::FileRead { accepted, .. }
            | RequirementResult::FileMetadata { accepted, .. }
            | RequirementResult::Command { accepted, .. } => *accepted,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            RequirementResult::FileRead { error, .. }
            | RequirementResult::FileMetadata { error, .. }
            | RequirementResult::Command { error, .. } => error.as_deref(),
        }
    }

    /// Replace the error annotation, keeping everything else.
    pub fn with_error(mut self, reason: impl Into<String>) -> Self {
        match &mut self {
            RequirementResult::FileRead { error, .. }
            | RequirementResult::FileMetadata { error, .. }
            | RequirementResult::Command { error, .. } => *error = Some(reason.into()),
        }
        self
    }

    /// The wire form sent back to the LLM: the embedded requirement is
    /// replaced by its identifying field (`path` or `command`), which is all
    /// the model needs to correlate results with its own requests.
    pub fn to_wire(&self) -> Value {
        let mut value = serde_json::to_value(self).unwrap_or(Value::Null);
        if let Value::Object(ref mut map) = value {
            if let Some(Value::Object(req)) = map.remove("requirement") {
                for key in ["path", "command"] {
                    if let Some(identity) = req.get(key) {
                        map.insert(key.to_string(), identity.clone());
                    }
                }
            }
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_result() -> RequirementResult {
        RequirementResult::FileRead {
            requirement: Requirement::file_read("/home/user/docs/report.txt", "summarize it"),
            accepted: true,
            content: Some("hello".into()),
            encoding: Some(ContentEncoding::Text),
            metadata: None,
            listing: None,
            error: None,
        }
    }

    #[test]
    fn denied_keeps_linkage_and_reason() {
        let req = Requirement::command("rm -rf /", "cleanup");
        let result = RequirementResult::denied(&req, "commands are disabled");
        assert_eq!(result.requirement(), &req);
        assert!(!result.accepted());
        assert_eq!(result.error(), Some("commands are disabled"));
        assert!(matches!(
            result,
            RequirementResult::Command { success: false, stdout: None, .. }
        ));
    }

    #[test]
    fn failed_marks_accepted() {
        let req = Requirement::file_read("/gone.txt", "read it");
        let result = RequirementResult::failed(&req, "file not found");
        assert!(result.accepted());
        assert_eq!(result.error(), Some("file not found"));
    }

    #[test]
    fn result_variant_matches_requirement_kind() {
        for req in [
            Requirement::file_read("/a", "c"),
            Requirement::file_metadata("/a", "c"),
            Requirement::command("ls", "c"),
        ] {
            let result = RequirementResult::denied(&req, "no");
            assert_eq!(result.kind(), req.kind());
        }
    }

    #[test]
    fn wire_form_inlines_path() {
        let wire = read_result().to_wire();
        assert_eq!(wire["path"], "/home/user/docs/report.txt");
        assert_eq!(wire["type"], "file_read");
        assert_eq!(wire["content"], "hello");
        assert!(wire.get("requirement").is_none());
    }

    #[test]
    fn wire_form_inlines_command() {
        let req = Requirement::command("uname -a", "check os");
        let result = RequirementResult::Command {
            requirement: req,
            accepted: true,
            success: true,
            stdout: Some("Linux".into()),
            stderr: None,
            error: None,
        };
        let wire = result.to_wire();
        assert_eq!(wire["command"], "uname -a");
        assert_eq!(wire["stdout"], "Linux");
    }

    #[test]
    fn wire_round_trip_preserves_identity() {
        let wire = read_result().to_wire();
        let text = serde_json::to_string(&wire).unwrap();
        let back: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(back["path"], "/home/user/docs/report.txt");
    }

    #[test]
    fn full_serialization_round_trip() {
        let result = read_result();
        let json = serde_json::to_string(&result).unwrap();
        let back: RequirementResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
        assert_eq!(back.requirement().path(), Some("/home/user/docs/report.txt"));
    }

    #[test]
    fn with_error_annotates() {
        let result = read_result().with_error("flagged by validator");
        assert_eq!(result.error(), Some("flagged by validator"));
        assert!(result.accepted());
    }
}

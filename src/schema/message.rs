use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{AccordError, AccordResult};

use super::{Requirement, RequirementResult};

/// Role of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

impl std::fmt::Display for TurnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TurnRole::User => write!(f, "user"),
            TurnRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// The assistant's message: either a batch of requirements or a final answer,
/// never both. A message carrying both or neither is a protocol error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirements: Option<Vec<Requirement>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
}

impl AssistantMessage {
    pub fn with_requirements(comment: impl Into<String>, requirements: Vec<Requirement>) -> Self {
        Self {
            comment: Some(comment.into()),
            requirements: Some(requirements),
            answer: None,
        }
    }

    pub fn with_answer(comment: Option<String>, answer: impl Into<String>) -> Self {
        Self {
            comment,
            requirements: None,
            answer: Some(answer.into()),
        }
    }

    /// Decode the assistant's JSON output. Unknown requirement types and
    /// missing fields surface as protocol errors, never as guessed intent.
    pub fn from_json(text: &str) -> AccordResult<Self> {
        serde_json::from_str(text)
            .map_err(|e| AccordError::Protocol(format!("Malformed assistant response: {e}")))
    }

    /// The requirements batch, empty when this is a final answer.
    pub fn requirements(&self) -> &[Requirement] {
        self.requirements.as_deref().unwrap_or_default()
    }

    pub fn is_final(&self) -> bool {
        self.answer.is_some()
    }

    /// Enforce receipt invariants: exactly one of `requirements`/`answer`,
    /// and every requirement well-formed. An empty requirements list counts
    /// as absent.
    pub fn validate(&self) -> AccordResult<()> {
        let has_requirements = !self.requirements().is_empty();
        let has_answer = self.answer.is_some();
        if has_requirements && has_answer {
            return Err(AccordError::Protocol(
                "response contains both requirements and a final answer".into(),
            ));
        }
        if !has_requirements && !has_answer {
            return Err(AccordError::Protocol(
                "response contains neither requirements nor a final answer".into(),
            ));
        }
        for requirement in self.requirements() {
            requirement.validate()?;
        }
        Ok(())
    }
}

/// A user-side turn: the prompt and/or the results of a resolved batch.
/// Unknown fields are rejected so the untagged [`TurnPayload`] decoding can
/// never mistake an assistant payload for a user one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<RequirementResult>,
}

impl UserMessage {
    pub fn prompt(comment: impl Into<String>) -> Self {
        Self {
            comment: Some(comment.into()),
            results: Vec::new(),
        }
    }

    pub fn with_results(results: Vec<RequirementResult>) -> Self {
        Self {
            comment: None,
            results,
        }
    }
}

/// Payload of a single conversation turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TurnPayload {
    User(UserMessage),
    Assistant(AssistantMessage),
}

/// One exchange unit stored in history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub id: String,
    pub role: TurnRole,
    pub timestamp: DateTime<Utc>,
    pub payload: TurnPayload,
}

impl ConversationTurn {
    pub fn user(message: UserMessage) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: TurnRole::User,
            timestamp: Utc::now(),
            payload: TurnPayload::User(message),
        }
    }

    pub fn assistant(message: AssistantMessage) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: TurnRole::Assistant,
            timestamp: Utc::now(),
            payload: TurnPayload::Assistant(message),
        }
    }

    /// Wire record for the LLM transport: role + JSON-encoded content.
    /// Results inside user turns are flattened to their wire form.
    pub fn to_wire_record(&self) -> Value {
        let content = match &self.payload {
            TurnPayload::User(msg) => {
                let results: Vec<Value> = msg.results.iter().map(|r| r.to_wire()).collect();
                let mut content = json!({ "timestamp": self.timestamp });
                if let Some(comment) = &msg.comment {
                    content["comment"] = json!(comment);
                }
                if !results.is_empty() {
                    content["results"] = json!(results);
                }
                content
            }
            TurnPayload::Assistant(msg) => {
                let mut content = json!({ "timestamp": self.timestamp });
                if let Some(comment) = &msg.comment {
                    content["comment"] = json!(comment);
                }
                if let Some(requirements) = &msg.requirements {
                    content["requirements"] = json!(requirements);
                }
                if let Some(answer) = &msg.answer {
                    content["answer"] = json!(answer);
                }
                content
            }
        };
        json!({
            "role": self.role.to_string(),
            "content": content.to_string(),
        })
    }
}

/// The full context sent to the LLM on each exchange: a fixed system prompt
/// plus an ordered, append-only sequence of turns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageHistory {
    system_prompt: String,
    turns: Vec<ConversationTurn>,
}

impl MessageHistory {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            turns: Vec::new(),
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn push_user(&mut self, message: UserMessage) {
        self.turns.push(ConversationTurn::user(message));
    }

    pub fn push_assistant(&mut self, message: AssistantMessage) {
        self.turns.push(ConversationTurn::assistant(message));
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Ordered role/content records for the LLM transport, system prompt first.
    pub fn to_wire_format(&self) -> Vec<Value> {
        let mut records = vec![json!({
            "role": "system",
            "content": self.system_prompt,
        })];
        records.extend(self.turns.iter().map(|t| t.to_wire_record()));
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assistant_message_decodes_requirements() {
        let msg = AssistantMessage::from_json(
            r#"{
                "comment": "I need to look at two things first.",
                "requirements": [
                    {"type": "file_read", "path": "/tmp/log.txt", "comment": "check the log"},
                    {"type": "command", "command": "uname -a", "comment": "identify the os"}
                ]
            }"#,
        )
        .unwrap();
        msg.validate().unwrap();
        assert_eq!(msg.requirements().len(), 2);
        assert!(!msg.is_final());
    }

    #[test]
    fn assistant_message_decodes_answer() {
        let msg =
            AssistantMessage::from_json(r#"{"comment": "done", "answer": "All clear."}"#).unwrap();
        msg.validate().unwrap();
        assert!(msg.is_final());
        assert!(msg.requirements().is_empty());
    }

    #[test]
    fn both_answer_and_requirements_is_protocol_error() {
        let msg = AssistantMessage::from_json(
            r#"{
                "answer": "done",
                "requirements": [{"type": "command", "command": "ls", "comment": "list"}]
            }"#,
        )
        .unwrap();
        assert!(matches!(msg.validate(), Err(AccordError::Protocol(_))));
    }

    #[test]
    fn neither_answer_nor_requirements_is_protocol_error() {
        let msg = AssistantMessage::from_json(r#"{"comment": "hmm"}"#).unwrap();
        assert!(matches!(msg.validate(), Err(AccordError::Protocol(_))));

        let empty = AssistantMessage::from_json(r#"{"requirements": []}"#).unwrap();
        assert!(matches!(empty.validate(), Err(AccordError::Protocol(_))));
    }

    #[test]
    fn unknown_requirement_type_is_protocol_error() {
        let parsed = AssistantMessage::from_json(
            r#"{"requirements": [{"type": "format_disk", "comment": "trust me"}]}"#,
        );
        assert!(matches!(parsed, Err(AccordError::Protocol(_))));
    }

    #[test]
    fn invalid_requirement_fails_validation() {
        let msg = AssistantMessage::from_json(
            r#"{"requirements": [{"type": "command", "command": "ls", "comment": "  "}]}"#,
        )
        .unwrap();
        assert!(msg.validate().is_err());
    }

    #[test]
    fn history_is_append_only_and_ordered() {
        let mut history = MessageHistory::new("You are a careful assistant.");
        history.push_user(UserMessage::prompt("hello"));
        history.push_assistant(AssistantMessage::with_answer(None, "hi"));

        assert_eq!(history.len(), 2);
        assert_eq!(history.turns()[0].role, TurnRole::User);
        assert_eq!(history.turns()[1].role, TurnRole::Assistant);
    }

    #[test]
    fn wire_format_has_system_prompt_first() {
        let mut history = MessageHistory::new("system text");
        history.push_user(UserMessage::prompt("hello"));

        let wire = history.to_wire_format();
        assert_eq!(wire.len(), 2);
        assert_eq!(wire[0]["role"], "system");
        assert_eq!(wire[0]["content"], "system text");
        assert_eq!(wire[1]["role"], "user");
    }

    #[test]
    fn wire_content_is_json_encoded() {
        let mut history = MessageHistory::new("sys");
        history.push_user(UserMessage::prompt("what changed today?"));

        let record = &history.to_wire_format()[1];
        let content: Value = serde_json::from_str(record["content"].as_str().unwrap()).unwrap();
        assert_eq!(content["comment"], "what changed today?");
        assert!(content["timestamp"].is_string());
    }

    #[test]
    fn user_results_are_flattened_in_wire_form() {
        let req = Requirement::file_read("/tmp/a.txt", "read it");
        let result = RequirementResult::denied(&req, "denied by user");

        let mut history = MessageHistory::new("sys");
        history.push_user(UserMessage::with_results(vec![result]));

        let record = &history.to_wire_format()[1];
        let content: Value = serde_json::from_str(record["content"].as_str().unwrap()).unwrap();
        assert_eq!(content["results"][0]["path"], "/tmp/a.txt");
        assert_eq!(content["results"][0]["accepted"], false);
        assert!(content["results"][0].get("requirement").is_none());
    }
}

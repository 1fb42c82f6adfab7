//! The requirement/result/message schema shared between the loop and the LLM.
//!
//! Requirements and results are closed tagged unions with exhaustive matching
//! at every consumption site; deserialization is discriminated on the `type`
//! tag and invariants are checked on receipt rather than coerced.

mod message;
mod requirement;
mod result;

pub use message::{
    AssistantMessage, ConversationTurn, MessageHistory, TurnPayload, TurnRole, UserMessage,
};
pub use requirement::{Requirement, RequirementKind};
pub use result::RequirementResult;

//! Delegation orchestrator: coordinates a planner, an HTML-retrieval agent
//! and a code-generation agent over a stateful conversation, accumulating
//! the code that actually ran in the browser.

pub mod builder;
pub mod conversation;
pub mod orchestrator;
pub mod prompts;

pub use builder::build_orchestrator;
pub use conversation::{
    is_code_terminal, is_plan_finished, ConversationParticipant, ConversationTurn, LlmParticipant,
    Role,
};
pub use orchestrator::{CodeDelegation, DelegationResult, Orchestrator};

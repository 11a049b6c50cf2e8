use autobrowse_core::types::{ChatMessage, ToolCallRequest};
use autobrowse_core::Result;
use autobrowse_providers::Provider;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// Who produced a turn. The orchestrator itself speaks into conversations
/// when it relays tasks, delegation results and auto-replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Planner,
    ContextAgent,
    CodeAgent,
    Orchestrator,
}

/// One entry in a conversation log. Never mutated after append.
#[derive(Debug, Clone)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    pub is_terminal: bool,
    /// Structured delegation call carried by this turn, if any.
    pub call: Option<ToolCallRequest>,
    /// When this turn answers a structured call, the id of that call.
    pub reply_to: Option<String>,
}

impl ConversationTurn {
    /// A turn spoken by the orchestrator (task text, auto-reply, result).
    pub fn orchestrator(content: &str) -> Self {
        Self {
            role: Role::Orchestrator,
            content: content.to_string(),
            is_terminal: false,
            call: None,
            reply_to: None,
        }
    }

    /// An orchestrator turn answering the structured call `call_id`.
    pub fn reply(call_id: &str, content: &str) -> Self {
        Self {
            reply_to: Some(call_id.to_string()),
            ..Self::orchestrator(content)
        }
    }
}

/// Terminal-marker detection for the code generator: suffix match, so the
/// marker must close the message.
pub fn is_code_terminal(content: &str) -> bool {
    content.trim_end().ends_with("TERMINATE")
}

/// Terminal-marker detection for the planner: substring match anywhere in
/// the message. The asymmetry with the code generator is deliberate and
/// pinned by tests.
pub fn is_plan_finished(content: &str) -> bool {
    content.contains("FINISHED")
}

fn detect_terminal(role: Role, content: &str) -> bool {
    match role {
        Role::Planner => is_plan_finished(content),
        Role::CodeAgent => is_code_terminal(content),
        // The context agent answers exactly once; its sub-conversation ends
        // by auto-reply budget, not by marker.
        Role::ContextAgent | Role::Orchestrator => false,
    }
}

/// A party that can take a conversation history and produce the next turn.
#[async_trait]
pub trait ConversationParticipant: Send + Sync {
    fn role(&self) -> Role;
    async fn respond(&self, history: &[ConversationTurn]) -> Result<ConversationTurn>;
}

/// An LLM-backed participant. All three roles are this one type configured
/// differently (model, system prompt, advertised functions); role behavior
/// lives in the wrappers the orchestrator applies before dispatch, not in
/// subclasses.
pub struct LlmParticipant {
    role: Role,
    system_prompt: String,
    provider: Arc<dyn Provider>,
    functions: Vec<Value>,
    max_retries: u32,
    retry_delay_ms: u64,
}

impl LlmParticipant {
    pub fn new(
        role: Role,
        system_prompt: &str,
        provider: Arc<dyn Provider>,
        functions: Vec<Value>,
    ) -> Self {
        Self {
            role,
            system_prompt: system_prompt.to_string(),
            provider,
            functions,
            max_retries: 3,
            retry_delay_ms: 2000,
        }
    }

    pub fn with_retries(mut self, max_retries: u32, retry_delay_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.retry_delay_ms = retry_delay_ms;
        self
    }

    /// Project the shared turn log into this participant's view: own turns
    /// become assistant messages, replies to calls become tool results,
    /// everything else is user input.
    fn messages_for(&self, history: &[ConversationTurn]) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::system(&self.system_prompt)];
        for turn in history {
            if turn.role == self.role {
                let mut message = ChatMessage::assistant(&turn.content);
                if let Some(call) = &turn.call {
                    message.tool_calls = Some(vec![call.clone()]);
                }
                messages.push(message);
            } else if let Some(call_id) = &turn.reply_to {
                messages.push(ChatMessage::tool_result(call_id, &turn.content));
            } else {
                messages.push(ChatMessage::user(&turn.content));
            }
        }
        messages
    }
}

#[async_trait]
impl ConversationParticipant for LlmParticipant {
    fn role(&self) -> Role {
        self.role
    }

    async fn respond(&self, history: &[ConversationTurn]) -> Result<ConversationTurn> {
        let messages = self.messages_for(history);

        let mut last_error = None;
        let mut response = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay_ms = self.retry_delay_ms * (1u64 << (attempt - 1).min(4));
                warn!(attempt, delay_ms, "Retrying LLM call after transient error");
                tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
            }
            match self.provider.chat(&messages, &self.functions).await {
                Ok(r) => {
                    response = Some(r);
                    break;
                }
                Err(e) => {
                    warn!(error = %e, attempt, "LLM call failed");
                    last_error = Some(e);
                }
            }
        }
        let response = match response {
            Some(r) => r,
            None => return Err(last_error.expect("no response implies an error")),
        };

        let content = response.content.unwrap_or_default();
        let mut calls = response.tool_calls.into_iter();
        let call = calls.next();
        // Delegation is single-granularity; a batch of calls is not honored.
        let dropped = calls.count();
        if dropped > 0 {
            warn!(dropped, "Participant proposed multiple calls, keeping the first");
        }

        let is_terminal = call.is_none() && detect_terminal(self.role, &content);
        info!(
            role = ?self.role,
            content_len = content.len(),
            has_call = call.is_some(),
            is_terminal,
            "Participant turn"
        );

        Ok(ConversationTurn {
            role: self.role,
            content,
            is_terminal,
            call,
            reply_to: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_terminal_is_suffix_matched() {
        assert!(is_code_terminal("...done TERMINATE"));
        assert!(is_code_terminal("TERMINATE  \n"));
        assert!(!is_code_terminal("TERMINATEX"));
        assert!(!is_code_terminal("TERMINATE then more"));
        assert!(!is_code_terminal(""));
    }

    #[test]
    fn test_plan_finished_is_substring_matched() {
        assert!(is_plan_finished("FINISHED."));
        assert!(is_plan_finished("  FINISHED  "));
        assert!(is_plan_finished("xFINISHEDx"));
        assert!(!is_plan_finished("finished"));
        assert!(!is_plan_finished(""));
    }

    #[test]
    fn test_context_agent_never_terminal() {
        assert!(!detect_terminal(Role::ContextAgent, "TERMINATE"));
        assert!(!detect_terminal(Role::ContextAgent, "FINISHED"));
    }

    #[test]
    fn test_messages_projection() {
        use autobrowse_core::Result as CoreResult;
        use autobrowse_core::types::LLMResponse;

        struct Dummy;
        #[async_trait]
        impl Provider for Dummy {
            async fn chat(&self, _m: &[ChatMessage], _t: &[Value]) -> CoreResult<LLMResponse> {
                unreachable!()
            }
        }

        let participant = LlmParticipant::new(
            Role::Planner,
            "you plan",
            Arc::new(Dummy),
            vec![],
        );

        let call = ToolCallRequest {
            id: "call_7".to_string(),
            name: "ask_html_assistant".to_string(),
            arguments: serde_json::json!({"message": "q"}),
        };
        let history = vec![
            ConversationTurn::orchestrator("do the task"),
            ConversationTurn {
                role: Role::Planner,
                content: String::new(),
                is_terminal: false,
                call: Some(call),
                reply_to: None,
            },
            ConversationTurn::reply("call_7", "<button>Login</button>"),
        ];

        let messages = participant.messages_for(&history);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].role, "user");
        assert_eq!(messages[2].role, "assistant");
        assert!(messages[2].tool_calls.is_some());
        assert_eq!(messages[3].role, "tool");
        assert_eq!(messages[3].tool_call_id.as_deref(), Some("call_7"));
    }
}

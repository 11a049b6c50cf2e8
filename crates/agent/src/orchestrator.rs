use autobrowse_core::types::{CodeBlock, ToolCallRequest};
use autobrowse_core::{Error, Result};
use autobrowse_exec::{extract_code_blocks, CodeExecutionProxy};
use autobrowse_retrieval::ContextRetrievalProxy;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::conversation::{ConversationParticipant, ConversationTurn};

/// What a delegation call returns to the planner.
#[derive(Debug, Clone)]
pub struct DelegationResult {
    pub succeeded: bool,
    pub output_text: String,
    pub raw_log: Option<String>,
}

/// Typed outcome of one code-generation sub-conversation. Replaces the
/// count-backward-through-the-transcript recovery of code and errors.
#[derive(Debug, Clone)]
pub struct CodeDelegation {
    pub code_blocks: Vec<CodeBlock>,
    pub execution_log: String,
    pub succeeded: bool,
}

/// A parsed structured call from the planner.
#[derive(Debug, Clone, PartialEq, Eq)]
enum DelegationCall {
    AskHtmlAssistant { message: String },
    AskCodeGenerator { message: String, context_html: String },
}

fn parse_delegation(call: &ToolCallRequest) -> Option<DelegationCall> {
    let message = call.arguments.get("message")?.as_str()?.to_string();
    match call.name.as_str() {
        "ask_html_assistant" => Some(DelegationCall::AskHtmlAssistant { message }),
        "ask_code_generator" => {
            let context_html = call
                .arguments
                .get("context_html")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            Some(DelegationCall::AskCodeGenerator { message, context_html })
        }
        _ => None,
    }
}

/// Augment a code-generation request with the page context and the code
/// already executed, each section only when its source is non-empty.
fn augment_code_message(message: &str, context_html: &str, executed_code: &[String]) -> String {
    let mut augmented = message.to_string();
    if !context_html.is_empty() {
        augmented.push_str("\n\nThis is the relevant HTML from the current page:\n\n");
        augmented.push_str(context_html);
    }
    if !executed_code.is_empty() {
        augmented.push_str("\n\nThis is the code already executed so far:\n");
        augmented.push_str(&executed_code.join("\n"));
    }
    augmented
}

/// Drives one task to completion: loops with the planner, hands delegation
/// calls to the retrieval and execution proxies, and accumulates the code
/// that actually ran.
pub struct Orchestrator {
    planner: Box<dyn ConversationParticipant>,
    html_assistant: Box<dyn ConversationParticipant>,
    code_generator: Box<dyn ConversationParticipant>,
    retrieval: ContextRetrievalProxy,
    exec: CodeExecutionProxy,
    max_planner_auto_reply: u32,
    max_code_auto_reply: u32,
    /// Code fragments whose execution succeeded during the current task, in
    /// execution order. Owned here and nowhere else.
    executed_code: Vec<String>,
    shutdown_rx: Option<broadcast::Receiver<()>>,
}

impl Orchestrator {
    pub fn new(
        planner: Box<dyn ConversationParticipant>,
        html_assistant: Box<dyn ConversationParticipant>,
        code_generator: Box<dyn ConversationParticipant>,
        retrieval: ContextRetrievalProxy,
        exec: CodeExecutionProxy,
        max_planner_auto_reply: u32,
        max_code_auto_reply: u32,
    ) -> Self {
        Self {
            planner,
            html_assistant,
            code_generator,
            retrieval,
            exec,
            max_planner_auto_reply,
            max_code_auto_reply,
            executed_code: Vec::new(),
            shutdown_rx: None,
        }
    }

    /// Install a shutdown handle; checked between planner turns.
    pub fn set_shutdown(&mut self, rx: broadcast::Receiver<()>) {
        self.shutdown_rx = Some(rx);
    }

    /// Run one task to completion and return the code that was executed,
    /// joined with newlines. The executed-code log is cleared on entry and
    /// on completion; a task is one full planning session.
    pub async fn run_task(&mut self, task: &str) -> Result<String> {
        info!(task, "Starting task");
        self.executed_code.clear();

        let mut history = vec![ConversationTurn::orchestrator(task)];
        let mut auto_replies = 0u32;

        loop {
            if let Some(rx) = &mut self.shutdown_rx {
                if rx.try_recv().is_ok() {
                    warn!("Task aborted between planner turns");
                    return Err(Error::Aborted("task aborted".to_string()));
                }
            }

            let turn = self.planner.respond(&history).await?;
            let is_terminal = turn.is_terminal;
            let call = turn.call.clone();
            history.push(turn);

            if is_terminal {
                info!("Planner signalled completion");
                break;
            }
            if auto_replies >= self.max_planner_auto_reply {
                warn!(auto_replies, "Planner auto-reply budget exhausted");
                break;
            }

            let reply = match call {
                Some(call) => match parse_delegation(&call) {
                    Some(DelegationCall::AskHtmlAssistant { message }) => {
                        let answer = self.ask_html_assistant(&message).await?;
                        ConversationTurn::reply(&call.id, &answer)
                    }
                    Some(DelegationCall::AskCodeGenerator { message, context_html }) => {
                        let result = self.ask_code_generator(&message, &context_html).await?;
                        ConversationTurn::reply(&call.id, &result.output_text)
                    }
                    None => {
                        // Malformed call: treated as a plain auto-reply turn;
                        // the budget above bounds how long this can go on.
                        warn!(name = %call.name, "Unparsable delegation call");
                        ConversationTurn::reply(&call.id, "")
                    }
                },
                // Plain text from the planner gets the default empty
                // auto-reply, prompting it to continue.
                None => ConversationTurn::orchestrator(""),
            };
            history.push(reply);
            auto_replies += 1;
        }

        let final_code = self.executed_code.join("\n");
        self.executed_code.clear();
        info!(code_len = final_code.len(), "Task finished");
        Ok(final_code)
    }

    /// Ask the HTML assistant a question about the current page. The
    /// retrieval proxy turns the question into a retrieval-augmented message
    /// first; the assistant answers exactly once.
    async fn ask_html_assistant(&mut self, message: &str) -> Result<String> {
        debug!(message, "Delegating to HTML assistant");
        let prepared = self.retrieval.prepare_question(message).await?;
        let sub_history = vec![ConversationTurn::orchestrator(&prepared)];
        let answer = self.html_assistant.respond(&sub_history).await?;
        Ok(answer.content)
    }

    /// Run one code-generation sub-conversation and fold its outcome into
    /// the executed-code log on success.
    async fn ask_code_generator(
        &mut self,
        message: &str,
        context_html: &str,
    ) -> Result<DelegationResult> {
        debug!(message, context_len = context_html.len(), "Delegating to code generator");
        let delegation = self.drive_code_conversation(message, context_html).await?;

        let code_joined = delegation
            .code_blocks
            .iter()
            .map(|b| b.code.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        if delegation.succeeded {
            for block in &delegation.code_blocks {
                self.executed_code.push(block.code.clone());
            }
            Ok(DelegationResult {
                succeeded: true,
                output_text: format!(
                    "Code execution successful. The following code was executed:\n{}",
                    code_joined
                ),
                raw_log: Some(delegation.execution_log),
            })
        } else {
            Ok(DelegationResult {
                succeeded: false,
                output_text: format!(
                    "Code execution failed. Code execution:\n{}\nError message:\n{}",
                    code_joined, delegation.execution_log
                ),
                raw_log: Some(delegation.execution_log),
            })
        }
    }

    /// The bounded exchange with the code generator: request, code reply,
    /// execution-result reply, final acknowledgment. Returns a typed record
    /// instead of leaving the caller to scrape transcript positions.
    async fn drive_code_conversation(
        &mut self,
        message: &str,
        context_html: &str,
    ) -> Result<CodeDelegation> {
        let augmented = augment_code_message(message, context_html, &self.executed_code);
        let mut sub_history = vec![ConversationTurn::orchestrator(&augmented)];

        let mut last_blocks: Vec<CodeBlock> = Vec::new();
        let mut last_log = String::new();
        let mut auto_replies = 0u32;

        let succeeded = loop {
            let turn = self.code_generator.respond(&sub_history).await?;
            let content = turn.content.clone();
            let terminal = turn.is_terminal;
            sub_history.push(turn);

            if terminal {
                break true;
            }
            if auto_replies >= self.max_code_auto_reply {
                break false;
            }

            let blocks = extract_code_blocks(&content);
            let report_summary = if blocks.is_empty() {
                warn!("Code generator reply contained no code blocks");
                last_log = "no code blocks found in reply".to_string();
                format!("exitcode: 1 (execution failed)\nCode output: {}", last_log)
            } else {
                let report = self.exec.execute_blocks(&blocks).await?;
                last_log = report.logs.clone();
                report.summary()
            };
            last_blocks = blocks;

            sub_history.push(ConversationTurn::orchestrator(&report_summary));
            auto_replies += 1;
        };

        Ok(CodeDelegation {
            code_blocks: last_blocks,
            execution_log: last_log,
            succeeded,
        })
    }
}

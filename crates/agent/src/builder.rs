use autobrowse_console::ConsoleBridge;
use autobrowse_core::{Config, Paths, Result};
use autobrowse_exec::{CodeExecutionProxy, TokioCommandRunner};
use autobrowse_providers::{create_embedder, create_provider};
use autobrowse_retrieval::ContextRetrievalProxy;
use std::time::Duration;

use crate::conversation::{LlmParticipant, Role};
use crate::orchestrator::Orchestrator;
use crate::prompts;

const DEFAULT_PLANNER_AUTO_REPLY: u32 = 35;
const DEFAULT_CODE_AUTO_REPLY: u32 = 1;

/// Wire up a production orchestrator from configuration: one LLM participant
/// per role, one console connection per proxy (the exchanges are independent
/// and the channel admits one in-flight request), and the local runner.
pub fn build_orchestrator(config: &Config, paths: &Paths) -> Result<Orchestrator> {
    let agents = &config.agents;
    let console_timeout = Duration::from_secs(config.console.timeout_secs);

    let planner = LlmParticipant::new(
        Role::Planner,
        agents
            .planner
            .system_message
            .as_deref()
            .unwrap_or(prompts::PLANNER_SYSTEM),
        create_provider(config, &agents.planner)?,
        prompts::planner_functions(),
    )
    .with_retries(agents.llm_max_retries, agents.llm_retry_delay_ms);

    let html_assistant = LlmParticipant::new(
        Role::ContextAgent,
        agents
            .html_assistant
            .system_message
            .as_deref()
            .unwrap_or(prompts::HTML_ASSISTANT_SYSTEM),
        create_provider(config, &agents.html_assistant)?,
        Vec::new(),
    )
    .with_retries(agents.llm_max_retries, agents.llm_retry_delay_ms);

    let code_generator = LlmParticipant::new(
        Role::CodeAgent,
        agents
            .code_generator
            .system_message
            .as_deref()
            .unwrap_or(prompts::CODE_GENERATOR_SYSTEM),
        create_provider(config, &agents.code_generator)?,
        Vec::new(),
    )
    .with_retries(agents.llm_max_retries, agents.llm_retry_delay_ms);

    let retrieval = ContextRetrievalProxy::new(
        Box::new(ConsoleBridge::new(&config.console.uri, console_timeout)),
        create_embedder(config)?,
        config.retrieval.chunk_size_tokens,
        config.retrieval.chunk_overlap_tokens,
    );

    let exec = CodeExecutionProxy::new(
        Box::new(ConsoleBridge::new(&config.console.uri, console_timeout)),
        Box::new(TokioCommandRunner::new(Duration::from_secs(
            config.exec.timeout_secs,
        ))),
        paths.code_execution_dir(),
    );

    Ok(Orchestrator::new(
        Box::new(planner),
        Box::new(html_assistant),
        Box::new(code_generator),
        retrieval,
        exec,
        agents
            .planner
            .max_consecutive_auto_reply
            .unwrap_or(DEFAULT_PLANNER_AUTO_REPLY),
        agents
            .code_generator
            .max_consecutive_auto_reply
            .unwrap_or(DEFAULT_CODE_AUTO_REPLY),
    ))
}

//! WebSocket client for the browser console process.
//!
//! The console speaks a two-verb JSON protocol over a persistent socket:
//! `executeCode` runs a script in the live page context, `fetchHTML` returns
//! the current page markup. Exactly one response is sent per request, matched
//! by order. There are no request IDs, so the channel must never carry two
//! requests at once; `&mut self` on every operation enforces that statically.

pub mod bridge;

use async_trait::async_trait;
use autobrowse_core::Result;

pub use bridge::ConsoleBridge;

/// Outcome of running a script in the browser console.
#[derive(Debug, Clone)]
pub struct ConsoleResult {
    pub success: bool,
    /// The console's full response rendered as text; this is what ends up in
    /// the execution log shown to the code-generation agent.
    pub payload: String,
}

/// The seam between the proxies and the live browser. Production uses
/// [`ConsoleBridge`]; tests drive the proxies with scripted consoles.
#[async_trait]
pub trait BrowserConsole: Send {
    async fn execute_code(&mut self, code: &str) -> Result<ConsoleResult>;
    async fn fetch_markup(&mut self) -> Result<String>;
}

use autobrowse_console::BrowserConsole;
use autobrowse_core::Result;
use autobrowse_providers::Embedder;
use std::sync::Arc;
use tracing::{debug, info};

use crate::chunker::HtmlChunker;
use crate::index::ChunkIndex;
use crate::tokenizer::count_tokens;

/// The markup last fetched from the browser, with a monotonic marker so logs
/// can correlate an index to the fetch that produced it.
pub struct PageSnapshot {
    pub markup: String,
    pub fetched_at_token: u64,
}

/// Produces a minimal relevant-context string for a question about the
/// current page.
///
/// Small pages pass through whole. Large pages are chunked and indexed once
/// per distinct markup; the cached index is reused as long as the fetched
/// markup is byte-identical to the snapshot it was built from.
pub struct ContextRetrievalProxy {
    console: Box<dyn BrowserConsole>,
    embedder: Arc<dyn Embedder>,
    chunker: HtmlChunker,
    /// Pages under this many tokens skip chunking entirely.
    token_threshold: usize,
    snapshot: Option<PageSnapshot>,
    index: Option<ChunkIndex>,
    fetch_counter: u64,
    rebuild_count: u64,
}

impl ContextRetrievalProxy {
    pub fn new(
        console: Box<dyn BrowserConsole>,
        embedder: Arc<dyn Embedder>,
        chunk_size_tokens: usize,
        chunk_overlap_tokens: usize,
    ) -> Self {
        Self {
            console,
            embedder,
            chunker: HtmlChunker::new(chunk_size_tokens, chunk_overlap_tokens),
            token_threshold: chunk_size_tokens,
            snapshot: None,
            index: None,
            fetch_counter: 0,
            rebuild_count: 0,
        }
    }

    /// How many times the chunk index has been rebuilt. Stable across calls
    /// on an unchanged page.
    pub fn rebuild_count(&self) -> u64 {
        self.rebuild_count
    }

    /// Fetch the page and return the context for `query`. A fetch failure
    /// propagates; stale or empty context is never substituted.
    pub async fn retrieve_context(&mut self, query: &str) -> Result<String> {
        let markup = self.console.fetch_markup().await?;
        self.fetch_counter += 1;

        let tokens = count_tokens(&markup);
        if tokens < self.token_threshold {
            debug!(tokens, threshold = self.token_threshold, "Page fits, using whole markup");
            return Ok(markup);
        }

        let changed = self
            .snapshot
            .as_ref()
            .map(|s| s.markup != markup)
            .unwrap_or(true);

        if changed {
            let chunks = self.chunker.split(&markup);
            info!(tokens, chunks = chunks.len(), "Page changed, rebuilding chunk index");
            let index = ChunkIndex::build(self.embedder.as_ref(), chunks).await?;
            self.snapshot = Some(PageSnapshot {
                markup,
                fetched_at_token: self.fetch_counter,
            });
            self.index = Some(index);
            self.rebuild_count += 1;
        }

        let index = self.index.as_ref().expect("index built above");
        let best = index.top_k(self.embedder.as_ref(), query, 1).await?;
        Ok(best.concat())
    }

    /// The message the answering agent receives: the retrieval-augmented
    /// template with the question and its context filled in.
    pub async fn prepare_question(&mut self, question: &str) -> Result<String> {
        let context = self.retrieve_context(question).await?;
        Ok(build_qa_prompt(question, &context))
    }
}

pub fn build_qa_prompt(question: &str, context: &str) -> String {
    format!(
        "You are a retrieval-augmented assistant. Answer the user's question \
         using only the HTML context provided below. Answer as concisely as possible.\n\n\
         User's question is: {}\n\n\
         Context is: {}\n",
        question, context
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use autobrowse_console::ConsoleResult;
    use autobrowse_core::Error;

    struct FixedPageConsole {
        markup: std::sync::Arc<std::sync::Mutex<Option<String>>>,
    }

    #[async_trait]
    impl BrowserConsole for FixedPageConsole {
        async fn execute_code(&mut self, _code: &str) -> Result<ConsoleResult> {
            unreachable!("retrieval never executes code")
        }

        async fn fetch_markup(&mut self) -> Result<String> {
            self.markup
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| Error::Retrieval("Failed to fetch HTML".to_string()))
        }
    }

    struct LetterFreqEmbedder;

    #[async_trait]
    impl Embedder for LetterFreqEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    let mut v = vec![0.0f32; 26];
                    for c in t.chars().filter(|c| c.is_ascii_alphabetic()) {
                        v[(c.to_ascii_lowercase() as u8 - b'a') as usize] += 1.0;
                    }
                    v
                })
                .collect())
        }
    }

    fn proxy_with_page(
        markup: Option<&str>,
        chunk_size: usize,
    ) -> (ContextRetrievalProxy, std::sync::Arc<std::sync::Mutex<Option<String>>>) {
        let page = std::sync::Arc::new(std::sync::Mutex::new(markup.map(|m| m.to_string())));
        let console = FixedPageConsole {
            markup: page.clone(),
        };
        (
            ContextRetrievalProxy::new(
                Box::new(console),
                Arc::new(LetterFreqEmbedder),
                chunk_size,
                2,
            ),
            page,
        )
    }

    #[tokio::test]
    async fn test_small_page_passes_through_verbatim() {
        let markup = "<html><body><button>Login</button></body></html>";
        let (mut proxy, _) = proxy_with_page(Some(markup), 15_000);
        let context = proxy.retrieve_context("where is the login button?").await.unwrap();
        assert_eq!(context, markup);
        assert_eq!(proxy.rebuild_count(), 0);
    }

    #[tokio::test]
    async fn test_large_page_is_chunked_and_searched() {
        // tiny threshold forces the chunking path
        let markup = "<div>filler</div><div>filler</div><button id=\"login\">login here</button><div>filler</div>";
        let (mut proxy, _) = proxy_with_page(Some(markup), 8);
        let context = proxy.retrieve_context("login").await.unwrap();
        assert!(context.contains("login"));
        assert!(context.len() < markup.len());
        assert_eq!(proxy.rebuild_count(), 1);
    }

    #[tokio::test]
    async fn test_unchanged_page_does_not_rebuild_index() {
        let markup = "<ul><li>aaa</li><li>bbb</li><li>ccc</li></ul>";
        let (mut proxy, _) = proxy_with_page(Some(markup), 5);
        proxy.retrieve_context("aaa").await.unwrap();
        assert_eq!(proxy.rebuild_count(), 1);
        proxy.retrieve_context("bbb").await.unwrap();
        proxy.retrieve_context("ccc").await.unwrap();
        assert_eq!(proxy.rebuild_count(), 1);
    }

    #[tokio::test]
    async fn test_changed_page_rebuilds_index() {
        let markup = "<ul><li>aaa</li><li>bbb</li><li>ccc</li></ul>";
        let (mut proxy, page) = proxy_with_page(Some(markup), 5);
        proxy.retrieve_context("aaa").await.unwrap();
        assert_eq!(proxy.rebuild_count(), 1);

        *page.lock().unwrap() =
            Some("<ol><li>xxx</li><li>yyy</li><li>zzz</li></ol>".to_string());
        proxy.retrieve_context("xxx").await.unwrap();
        assert_eq!(proxy.rebuild_count(), 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_propagates() {
        let (mut proxy, _) = proxy_with_page(None, 15_000);
        let err = proxy.retrieve_context("anything").await.unwrap_err();
        assert!(matches!(err, Error::Retrieval(_)));
    }

    #[test]
    fn test_qa_prompt_embeds_question_and_context() {
        let prompt = build_qa_prompt("where is the form?", "<form id=\"f\">");
        assert!(prompt.contains("where is the form?"));
        assert!(prompt.contains("<form id=\"f\">"));
    }
}

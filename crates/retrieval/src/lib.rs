//! Context retrieval proxy: fetches page markup, chunks and indexes it when
//! large, and produces a minimal relevant-context string for a question.

pub mod chunker;
pub mod index;
pub mod proxy;
pub mod tokenizer;

pub use chunker::HtmlChunker;
pub use index::ChunkIndex;
pub use proxy::{build_qa_prompt, ContextRetrievalProxy, PageSnapshot};
pub use tokenizer::count_tokens;

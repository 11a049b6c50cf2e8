//! Code execution proxy: classifies code blocks by language and routes them
//! to the browser console (scripts) or local processes (shell, python).

pub mod blocks;
pub mod lang;
pub mod proxy;
pub mod runner;

pub use blocks::extract_code_blocks;
pub use lang::{classify, infer_lang, LangClass};
pub use proxy::{CodeExecutionProxy, ExecReport};
pub use runner::{CommandRunner, RunOutput, TokioCommandRunner};

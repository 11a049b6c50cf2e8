use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Provider error: {0}")]
    Provider(String),

    /// The browser console channel could not be established, closed
    /// unexpectedly, or timed out. Fatal for the operation; never retried
    /// silently.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Page markup could not be fetched. Fatal for the delegation call that
    /// needed it; no fallback context is produced.
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    #[error("Exec error: {0}")]
    Exec(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    /// The task loop was cancelled between planner turns.
    #[error("Aborted: {0}")]
    Aborted(String),
}

pub type Result<T> = std::result::Result<T, Error>;

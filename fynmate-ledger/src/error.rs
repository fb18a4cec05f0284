use thiserror::Error;

/// Persistence failures. Reported to the caller as-is; nothing here retries.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("remote API request failed: {0}")]
    Remote(#[from] reqwest::Error),

    #[error("remote API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("store lock poisoned")]
    Lock,

    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("amount {0} is out of range for storage")]
    AmountOutOfRange(u64),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

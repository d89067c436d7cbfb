use thiserror::Error;

pub type ConsoleResult<T> = Result<T, ConsoleError>;

/// Message shown when the backend failed without providing its own error text.
pub const CONNECTION_ERROR: &str = "Could not reach the server. Please try again.";

#[derive(Error, Debug)]
pub enum ConsoleError {
    #[error("Invalid price {0}: must be a finite, non-negative number")]
    InvalidPrice(f64),

    #[error("Unknown plan: {0}")]
    UnknownPlan(String),

    #[error("Unknown product: {0}")]
    UnknownProduct(uuid::Uuid),

    #[error("Downgrading from `{from}` to `{to}` is not allowed. Please contact the administrator.")]
    DowngradeNotAllowed { from: String, to: String },

    #[error("The trial for plan `{0}` has already been claimed")]
    TrialAlreadyClaimed(String),

    #[error("{0}")]
    Remote(String),

    #[error("The change to `{0}` took too long to confirm and was reverted")]
    MutationTimedOut(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ConsoleError {
    /// Wrap a backend-provided error message, falling back to the generic
    /// connection message when the backend gave none.
    pub fn remote(message: Option<String>) -> Self {
        Self::Remote(message.unwrap_or_else(|| CONNECTION_ERROR.to_string()))
    }
}

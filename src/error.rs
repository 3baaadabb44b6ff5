//! Error types for outreach operations

use thiserror::Error;

/// Errors that can occur outside the (infallible) recipient extraction
#[derive(Error, Debug)]
pub enum OutreachError {
    /// A required configuration key is missing
    #[error("Missing configuration value: {0}")]
    MissingConfig(String),

    /// A configuration key is present but unusable
    #[error("Invalid configuration value for {key}: {details}")]
    InvalidConfig { key: String, details: String },

    /// A repair suffix is not a literal dotted suffix
    #[error("Invalid repair suffix: {0:?}")]
    InvalidSuffix(String),

    /// The outgoing message could not be built
    #[error("Failed to build message: {0}")]
    Message(String),

    /// No credentials are stored for the session
    #[error("Session is not authenticated")]
    NotAuthenticated,

    /// The user has neither paid nor an active trial
    #[error("User {0} is not entitled to send")]
    NotEntitled(String),

    /// Access-control storage failure
    #[error("Access store error: {0}")]
    Store(String),

    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to read or write JSON state
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A single PDF page whose text could not be recovered
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Page {page} unreadable: {reason}")]
pub struct PageError {
    /// 1-based page number
    pub page: u32,
    pub reason: String,
}

/// Result type for outreach operations
pub type Result<T> = std::result::Result<T, OutreachError>;

//! Error types for Cutlist.

use thiserror::Error;

/// Main error type for timeline and playlist operations.
///
/// None of these are fatal: they are reported to the caller, which decides
/// whether to retry, cancel or surface them to the user.
#[derive(Error, Debug)]
pub enum CutlistError {
    /// No clip (or no blank) at the requested position.
    #[error("Nothing to edit at frame {position}: {reason}")]
    NotFound { position: i64, reason: String },

    /// A playlist primitive refused the edit.
    #[error("Playlist operation failed: {0}")]
    Engine(String),

    /// The region holds a blank or invalid producer where a clip is required.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A synthesised producer failed its validity check.
    #[error("Producer construction failed: {0}")]
    Construction(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A producer identifier does not follow the identifier grammar.
    #[error("Malformed producer identifier: {0:?}")]
    Identifier(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CutlistError {
    /// Shorthand for a [`CutlistError::NotFound`].
    pub fn not_found(position: i64, reason: impl Into<String>) -> Self {
        Self::NotFound {
            position,
            reason: reason.into(),
        }
    }
}

/// Result type alias for Cutlist operations.
pub type Result<T> = std::result::Result<T, CutlistError>;

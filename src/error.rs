//! Error types for querykit
//!
//! All modules use `QueryKitResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for querykit operations
pub type QueryKitResult<T> = Result<T, QueryKitError>;

/// All errors that can occur in querykit
#[derive(Error, Debug)]
pub enum QueryKitError {
    // Query errors
    #[error("Fetch failed for {resource}: {reason}")]
    Fetch { resource: String, reason: String },

    #[error("Mutation failed: {reason}")]
    Mutation { reason: String },

    #[error("Cached data for {resource} has an unexpected shape: {reason}")]
    DataDecode { resource: String, reason: String },

    // Gate errors
    #[error("Energy gate was dropped before the wait resolved")]
    GateClosed,

    #[error("Invalid gate step: {0}")]
    InvalidStep(String),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl QueryKitError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a fetch error for a resource
    pub fn fetch(resource: impl Into<String>, reason: impl ToString) -> Self {
        Self::Fetch {
            resource: resource.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a mutation error
    pub fn mutation(reason: impl ToString) -> Self {
        Self::Mutation {
            reason: reason.to_string(),
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::InvalidStep(_) => Some("Steps look like addr:<id> or energy:<number>"),
            Self::ConfigInvalid { .. } => Some("Run: querykit config init --force"),
            Self::GateClosed => Some("Keep the gate alive while awaiting its handles"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = QueryKitError::fetch("balance", "timeout");
        assert_eq!(err.to_string(), "Fetch failed for balance: timeout");
    }

    #[test]
    fn error_hint() {
        let err = QueryKitError::InvalidStep("bogus".to_string());
        assert!(err.hint().unwrap().contains("energy:"));
        assert!(QueryKitError::mutation("nope").hint().is_none());
    }

    #[test]
    fn json_error_converts() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: QueryKitError = parse.unwrap_err().into();
        assert!(matches!(err, QueryKitError::Json(_)));
    }
}

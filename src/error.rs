// src/error.rs

//! Unified error handling for the harvester.

use std::fmt;

use thiserror::Error;

/// Result type alias for harvester operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// XML document could not be parsed
    #[error("XML parse error: {0}")]
    Xml(#[from] roxmltree::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// No crawler is wired for the requested repository type
    #[error("Unsupported metadata repository type: {0}")]
    UnsupportedType(String),

    /// A source node lacks a required attribute
    #[error("{element} is missing required {field}")]
    MissingField { element: String, field: String },

    /// The document parsed but does not have the expected shape
    #[error("Invalid document {uri}: {message}")]
    InvalidDocument { uri: String, message: String },

    /// A sink rejected a record
    #[error("Sink '{sink}' failed: {message}")]
    Sink {
        sink: String,
        message: String,
        retryable: bool,
    },

    /// A remote fetch exceeded the configured timeout
    #[error("Timed out after {secs}s fetching {url}")]
    Timeout { url: String, secs: u64 },

    /// Malformed command line
    #[error("Usage error: {0}")]
    Usage(String),
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a missing-field input error.
    pub fn missing(element: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingField {
            element: element.into(),
            field: field.into(),
        }
    }

    /// Create an invalid-document error.
    pub fn invalid_document(uri: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::InvalidDocument {
            uri: uri.into(),
            message: message.to_string(),
        }
    }

    /// Create a non-retryable sink error.
    pub fn sink(sink: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Sink {
            sink: sink.into(),
            message: message.to_string(),
            retryable: false,
        }
    }

    /// Create a sink error the caller may retry.
    pub fn sink_retryable(sink: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Sink {
            sink: sink.into(),
            message: message.to_string(),
            retryable: true,
        }
    }

    /// Create a usage error.
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }

    /// Whether a caller-level retry could plausibly succeed.
    ///
    /// Timeouts, connection failures and server-side index errors are
    /// transient. Input, configuration and parse errors are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.status().is_some_and(|s| s.is_server_error())
            }
            Self::Sink { retryable, .. } => *retryable,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_message() {
        let err = AppError::missing("dataset", "ID");
        assert_eq!(err.to_string(), "dataset is missing required ID");
    }

    #[test]
    fn test_retryable_classification() {
        let timeout = AppError::Timeout {
            url: "http://example.com".to_string(),
            secs: 5,
        };
        assert!(timeout.is_retryable());
        assert!(AppError::sink_retryable("indexer", "HTTP 503").is_retryable());
        assert!(!AppError::sink("indexer", "HTTP 400").is_retryable());
        assert!(!AppError::UnsupportedType("FOO".to_string()).is_retryable());
        assert!(!AppError::missing("file", "name").is_retryable());
    }
}

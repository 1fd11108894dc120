// Allow unused assignments for diagnostic fields - they're used by the macros
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Core error type for vpnmon data handling
#[derive(Error, Debug, Diagnostic)]
pub enum CoreError {
    /// Serialization error
    #[error("Serialization error: {message}")]
    #[diagnostic(
        code(vpnmon::serialization_error),
        help("Ensure the document is valid JSON and matches the expected shape")
    )]
    SerializationError {
        #[allow(unused)]
        message: String,
        #[source]
        #[allow(unused)]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Node record could not be turned into a probe target
    #[error("Invalid node record {id}: {reason}")]
    #[diagnostic(
        code(vpnmon::invalid_node),
        help("Each node needs a hostname, an ip_address, or a server entry")
    )]
    InvalidNode {
        #[allow(unused)]
        id: u64,
        #[allow(unused)]
        reason: String,
    },
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Create a SerializationError
    pub fn serialization_error(
        message: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::SerializationError {
            message: message.into(),
            source,
        }
    }

    /// Create an InvalidNode error
    pub fn invalid_node(id: u64, reason: impl Into<String>) -> Self {
        Self::InvalidNode {
            id,
            reason: reason.into(),
        }
    }
}

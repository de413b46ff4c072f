//! Centralized sealer engine error types.

use std::fmt;

use thiserror::Error;

/// Which call into the ElGamal primitive failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveOperation {
    Initialize,
    Setup,
    Keygen,
    Decrypt,
}

impl fmt::Display for PrimitiveOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PrimitiveOperation::Initialize => "initialize",
            PrimitiveOperation::Setup => "setup",
            PrimitiveOperation::Keygen => "keygen",
            PrimitiveOperation::Decrypt => "decrypt",
        };
        f.write_str(label)
    }
}

#[derive(Error, Debug)]
pub enum SealerError {
    /// The active secret is locked or unknown to the secret store.
    #[error("Entropy unavailable: {0}")]
    EntropyUnavailable(String),
    /// The cryptographic byte source failed. Never replaced by a weaker source.
    #[error("Secure random source failure: {0}")]
    SecureRandomSourceFailure(String),
    /// Setup, keygen or decrypt failed inside the primitive library.
    #[error("Primitive {operation} failed: {reason}")]
    PrimitiveOperationFailed {
        operation: PrimitiveOperation,
        reason: String,
    },
    /// Handing the envelope to the interaction layer failed.
    #[error("Transport failure: {0}")]
    TransportFailure(String),
    /// Group order could not be parsed or is zero.
    #[error("Invalid modulus: {0}")]
    InvalidModulus(String),
    #[error("No active secret became available")]
    NoActiveSecret,
    #[error("Active secret stream closed")]
    SecretStreamClosed,
    /// A newer active secret replaced the one this run started with.
    #[error("Run for sealer '{label}' superseded by a newer active secret")]
    Superseded { label: String },
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SealerError {
    pub fn primitive(operation: PrimitiveOperation, reason: impl Into<String>) -> Self {
        SealerError::PrimitiveOperationFailed {
            operation,
            reason: reason.into(),
        }
    }
}

pub type SealerResult<T> = Result<T, SealerError>;

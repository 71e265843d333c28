use serde::{Deserialize, Serialize};
use solana_client::client_error::ClientError;
use solana_program::program_error::ProgramError;
use solana_sdk::signature::SignerError;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq, Serialize, Deserialize, Clone)]
pub enum ReclaimError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Confirmation timed out: {0}")]
    ConfirmationTimeout(String),

    #[error("Signing error: {0}")]
    SigningError(String),

    #[error("Transaction rejected: {0}")]
    TransactionRejected(String),

    #[error("RPC error: {0}")]
    RpcError(String),

    #[error("Failed to fetch accounts: {0}")]
    FetchError(String),

    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error("Token operation failed: {0}")]
    TokenOperationError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

fn redact(message: String) -> String {
    #[cfg(feature = "unsafe-debug")]
    {
        message
    }
    #[cfg(not(feature = "unsafe-debug"))]
    {
        crate::sanitize::sanitize_message(&message)
    }
}

impl From<ClientError> for ReclaimError {
    fn from(e: ClientError) -> Self {
        ReclaimError::RpcError(redact(e.to_string()))
    }
}

impl From<SignerError> for ReclaimError {
    fn from(e: SignerError) -> Self {
        ReclaimError::SigningError(redact(e.to_string()))
    }
}

impl From<ProgramError> for ReclaimError {
    fn from(e: ProgramError) -> Self {
        ReclaimError::InvalidTransaction(redact(e.to_string()))
    }
}

impl From<std::io::Error> for ReclaimError {
    fn from(e: std::io::Error) -> Self {
        ReclaimError::InternalError(redact(e.to_string()))
    }
}

impl From<reqwest::Error> for ReclaimError {
    fn from(e: reqwest::Error) -> Self {
        ReclaimError::FetchError(redact(e.to_string()))
    }
}

impl From<serde_json::Error> for ReclaimError {
    fn from(e: serde_json::Error) -> Self {
        ReclaimError::SerializationError(redact(e.to_string()))
    }
}

impl From<csv::Error> for ReclaimError {
    fn from(e: csv::Error) -> Self {
        ReclaimError::SerializationError(redact(e.to_string()))
    }
}

impl From<bs58::decode::Error> for ReclaimError {
    fn from(e: bs58::decode::Error) -> Self {
        ReclaimError::SerializationError(redact(e.to_string()))
    }
}

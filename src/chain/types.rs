//! Chain-specific types and error definitions.

use std::fmt;

use serde::{Deserialize, Serialize};
use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_client::rpc_request::RpcError;
use solana_sdk::commitment_config::CommitmentConfig;
use thiserror::Error;

pub use solana_sdk::hash::Hash;
pub use solana_sdk::pubkey::Pubkey;
pub use solana_sdk::signature::Signature;

// Re-export ChainConfig from config module to avoid duplication
pub use crate::config::schema::ChainConfig;

/// Commitment level requested from the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    Confirmed,
    #[default]
    Finalized,
}

impl Commitment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Commitment::Processed => "processed",
            Commitment::Confirmed => "confirmed",
            Commitment::Finalized => "finalized",
        }
    }

    /// The SDK's commitment config for this level.
    pub fn to_config(self) -> CommitmentConfig {
        match self {
            Commitment::Processed => CommitmentConfig::processed(),
            Commitment::Confirmed => CommitmentConfig::confirmed(),
            Commitment::Finalized => CommitmentConfig::finalized(),
        }
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur on the origination path.
#[derive(Debug, Error)]
pub enum ChainError {
    /// Network-side failure: connection, HTTP status, undecodable reply.
    #[error("Transport error: {0}")]
    Transport(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// The cluster answered with a JSON-RPC error or a transaction error.
    #[error("Submission rejected ({code}): {message}")]
    SubmissionRejected { code: i64, message: String },

    /// A required signature position has no matching signer handle.
    #[error("Missing signer for {0}")]
    MissingSigner(Pubkey),

    /// The account list or parameters do not match the shield instruction.
    #[error("Invalid instruction shape: {0}")]
    InvalidInstructionShape(String),

    /// Malformed key encoding.
    #[error("Key error: {0}")]
    InvalidKey(String),

    /// The SDK refused to sign with the resolved handles.
    #[error("Signing failed: {0}")]
    Signing(String),
}

impl ChainError {
    /// True for failures on the network side rather than the chain side.
    pub fn is_transport(&self) -> bool {
        matches!(self, ChainError::Transport(_) | ChainError::Timeout(_))
    }
}

impl From<ClientError> for ChainError {
    fn from(err: ClientError) -> Self {
        match err.kind() {
            ClientErrorKind::RpcError(RpcError::RpcResponseError { code, message, .. }) => {
                ChainError::SubmissionRejected {
                    code: *code,
                    message: message.clone(),
                }
            }
            ClientErrorKind::TransactionError(e) => ChainError::SubmissionRejected {
                code: 0,
                message: e.to_string(),
            },
            _ => ChainError::Transport(err.to_string()),
        }
    }
}

/// Result type for chain operations.
pub type ChainResult<T> = Result<T, ChainError>;

//! Error types for Chainlet

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ChainError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid chain: {0}")]
    InvalidChain(String),
    #[error("Invalid block linkage at block {index}")]
    InvalidBlockLinkage { index: u64 },
    #[error("Invalid proof of work at block {index}")]
    InvalidProofOfWork { index: u64 },
    #[error("Chain is empty")]
    EmptyChain,
    #[error("Peer {peer} unreachable: {reason}")]
    PeerUnreachable { peer: String, reason: String },
    #[error("Peer {peer} answered with status {status}")]
    PeerError { peer: String, status: u16 },
    #[error("Proof search cancelled")]
    MiningCancelled,
    #[error("Proof search timed out")]
    MiningTimedOut,
    #[error("Mining error: {0}")]
    MiningError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("IO error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::IoError(err.to_string())
    }
}

impl From<toml::de::Error> for ChainError {
    fn from(err: toml::de::Error) -> Self {
        ChainError::ConfigError(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;

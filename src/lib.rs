//! Chainlet - a minimal proof-of-work ledger node
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Core Ledger
//! - [`blockchain`] - Blocks, canonical hashing, the ledger and chain validation
//! - [`transaction`] - Transaction records
//! - [`mempool`] - Pending-transaction pool
//!
//! ## Consensus
//! - [`miner`] - Proof-of-work search and verification
//! - [`sync`] - Peer registry and longest-valid-chain selection
//!
//! ## Node & Integration
//! - [`node`] - Shared node state and the operations it exposes
//! - [`api`] - HTTP API
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`crypto`] - Hashing and node identity
//! - [`error`] - Error types

#![forbid(unsafe_code)]

// ============================================================================
// Core Ledger
// ============================================================================
pub mod blockchain;
pub mod mempool;
pub mod transaction;

// ============================================================================
// Consensus
// ============================================================================
pub mod miner;
pub mod sync;

// ============================================================================
// Node & Integration
// ============================================================================
pub mod api;
pub mod node;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod crypto;
pub mod error;

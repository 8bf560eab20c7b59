use crate::crypto::sha256_hex;
use crate::error::ChainError;
use crate::mempool::Mempool;
use crate::transaction::Transaction;
use serde_json::{json, Value};

/// `previous_hash` carried by the genesis block. Not a real digest.
pub const GENESIS_PREVIOUS_HASH: &str = "1";
/// Proof carried by the genesis block.
pub const GENESIS_PROOF: u64 = 100;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Block {
    pub index: u64,
    /// Unix time in milliseconds.
    pub timestamp: u64,
    pub transactions: Vec<Transaction>,
    pub proof: u64,
    pub previous_hash: String,
}

impl Block {
    pub fn new(index: u64, transactions: Vec<Transaction>, proof: u64, previous_hash: String) -> Self {
        Block {
            index,
            timestamp: chrono::Utc::now().timestamp_millis() as u64,
            transactions,
            proof,
            previous_hash,
        }
    }

    /// Canonical encoding: compact JSON with keys sorted at every level, so
    /// structurally equal blocks always produce the same bytes.
    pub fn canonical_json(&self) -> String {
        let transactions: Vec<Value> = self
            .transactions
            .iter()
            .map(Transaction::canonical_value)
            .collect();
        json!({
            "index": self.index,
            "previous_hash": self.previous_hash,
            "proof": self.proof,
            "timestamp": self.timestamp,
            "transactions": transactions,
        })
        .to_string()
    }

    /// Lowercase hex SHA-256 of [`Block::canonical_json`].
    pub fn hash(&self) -> String {
        sha256_hex(self.canonical_json().as_bytes())
    }
}

/// The in-memory ledger: the block chain plus the transactions waiting for
/// the next block. The chain is never empty and is only ever appended to or
/// replaced wholesale.
#[derive(Debug, Clone)]
pub struct Blockchain {
    blocks: Vec<Block>,
    pub mempool: Mempool,
    pub difficulty: u32,
}

impl Blockchain {
    /// Create a ledger holding only the genesis block.
    pub fn new(difficulty: u32) -> Self {
        let genesis = Block::new(1, Vec::new(), GENESIS_PROOF, GENESIS_PREVIOUS_HASH.to_string());
        Blockchain {
            blocks: vec![genesis],
            mempool: Mempool::new(),
            difficulty,
        }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn last_block(&self) -> Result<&Block, ChainError> {
        self.blocks.last().ok_or(ChainError::EmptyChain)
    }

    /// Index the next sealed block will carry.
    pub fn next_index(&self) -> u64 {
        self.blocks.len() as u64 + 1
    }

    /// Queue a transaction; returns the index of the block expected to hold it.
    pub fn add_transaction(&mut self, tx: Transaction) -> u64 {
        self.mempool.add_transaction(tx);
        self.next_index()
    }

    /// Seal the whole pending pool into a new block and append it. When
    /// `previous_hash` is omitted the hash of the current last block is used.
    pub fn seal_block(&mut self, proof: u64, previous_hash: Option<String>) -> Result<Block, ChainError> {
        let previous_hash = match previous_hash {
            Some(hash) => hash,
            None => self.last_block()?.hash(),
        };

        let block = Block::new(self.next_index(), self.mempool.take_all(), proof, previous_hash);
        self.blocks.push(block.clone());
        Ok(block)
    }

    /// Swap in `chain` wholesale. The pending pool is left as it is.
    pub fn replace_chain(&mut self, chain: Vec<Block>) -> Result<(), ChainError> {
        if chain.is_empty() {
            return Err(ChainError::EmptyChain);
        }
        self.blocks = chain;
        Ok(())
    }
}

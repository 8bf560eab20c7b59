//! The ledger node: shared state plus the operations the HTTP shell exposes.
//!
//! State lives behind two `tokio::sync::RwLock`s:
//! - `blockchain` guards the chain and the pending pool together
//! - `peers` guards the peer registry
//!
//! No code path holds `peers` while acquiring `blockchain`; peer lists are
//! snapshotted and the lock released before the chain is touched.
//!
//! Proof searches never hold a lock. `mine` snapshots the tip, searches on
//! the blocking pool, and seals only if the tip is still the one it
//! searched against. A generation counter bumped on every chain change lets
//! an in-flight search notice early that its work went stale.

use crate::blockchain::{Block, Blockchain};
use crate::config::Config;
use crate::crypto::generate_node_id;
use crate::error::ChainError;
use crate::miner::find_proof_until;
use crate::sync::{select_longest_valid, ChainResponse, PeerClient, PeerRegistry};
use crate::transaction::Transaction;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Result of a consensus pass.
#[derive(Debug, Clone)]
pub struct ResolveOutcome {
    pub replaced: bool,
    pub chain: Vec<Block>,
}

pub struct Node {
    pub blockchain: Arc<RwLock<Blockchain>>,
    pub peers: Arc<RwLock<PeerRegistry>>,
    node_id: String,
    reward_amount: f64,
    search_timeout: Option<Duration>,
    client: PeerClient,
    tip_generation: Arc<AtomicU64>,
    shutdown: Arc<AtomicBool>,
}

impl Node {
    pub fn new(config: &Config) -> Result<Self, ChainError> {
        config.validate()?;

        let node_id = config.miner.node_id.clone().unwrap_or_else(generate_node_id);
        let client = PeerClient::new(Duration::from_millis(config.network.peer_timeout_ms))?;

        Ok(Self {
            blockchain: Arc::new(RwLock::new(Blockchain::new(config.miner.difficulty))),
            peers: Arc::new(RwLock::new(PeerRegistry::new())),
            node_id,
            reward_amount: config.miner.reward_amount,
            search_timeout: config.miner.search_timeout_secs.map(Duration::from_secs),
            client,
            tip_generation: Arc::new(AtomicU64::new(0)),
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Cancel every in-flight proof search; later `mine` calls fail too.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Queue a transaction; returns the index of the block expected to hold it.
    pub async fn submit_transaction(&self, tx: Transaction) -> u64 {
        let mut blockchain = self.blockchain.write().await;
        let index = blockchain.add_transaction(tx);
        debug!(index, pending = blockchain.mempool.len(), "transaction queued");
        index
    }

    /// Tell in-flight proof searches that the tip they work on is gone.
    fn mark_tip_changed(&self) {
        self.tip_generation.fetch_add(1, Ordering::SeqCst);
    }

    pub async fn chain(&self) -> ChainResponse {
        let blockchain = self.blockchain.read().await;
        ChainResponse::new(blockchain.blocks().to_vec())
    }

    /// Search a proof for the current tip, reward this node and seal the
    /// pending pool into a new block.
    pub async fn mine(&self) -> Result<Block, ChainError> {
        let deadline = self.search_timeout.map(|t| Instant::now() + t);

        loop {
            if self.is_shut_down() {
                return Err(ChainError::MiningCancelled);
            }

            let (last_proof, last_hash, difficulty, generation) = {
                let blockchain = self.blockchain.read().await;
                let last = blockchain.last_block()?;
                (
                    last.proof,
                    last.hash(),
                    blockchain.difficulty,
                    self.tip_generation.load(Ordering::SeqCst),
                )
            };

            let tip_generation = self.tip_generation.clone();
            let shutdown = self.shutdown.clone();
            let found = tokio::task::spawn_blocking(move || {
                find_proof_until(last_proof, difficulty, || {
                    shutdown.load(Ordering::SeqCst)
                        || tip_generation.load(Ordering::SeqCst) != generation
                        || deadline.is_some_and(|d| Instant::now() >= d)
                })
            })
            .await
            .map_err(|e| ChainError::MiningError(e.to_string()))?;

            let Some(proof) = found else {
                if self.is_shut_down() {
                    return Err(ChainError::MiningCancelled);
                }
                if deadline.is_some_and(|d| Instant::now() >= d) {
                    warn!(last_proof, "proof search timed out");
                    return Err(ChainError::MiningTimedOut);
                }
                debug!(last_proof, "tip moved during proof search, restarting");
                continue;
            };

            let mut blockchain = self.blockchain.write().await;
            if blockchain.last_block()?.hash() != last_hash {
                debug!(last_proof, "tip moved before sealing, restarting");
                continue;
            }

            blockchain.add_transaction(Transaction::reward(self.node_id.clone(), self.reward_amount));
            let block = blockchain.seal_block(proof, Some(last_hash))?;
            self.mark_tip_changed();

            info!(
                index = block.index,
                proof = block.proof,
                transactions = block.transactions.len(),
                "sealed new block"
            );
            return Ok(block);
        }
    }

    /// Register peers; returns the full peer list afterwards.
    pub async fn register_peers(&self, addresses: &[String]) -> Result<Vec<String>, ChainError> {
        if addresses.is_empty() {
            return Err(ChainError::InvalidInput(
                "Please supply a valid list of nodes".to_string(),
            ));
        }

        let mut peers = self.peers.write().await;
        let added = peers.register_peers(addresses)?;
        info!(added, total = peers.len(), "registered peers");
        Ok(peers.list_peers())
    }

    pub async fn list_peers(&self) -> Vec<String> {
        self.peers.read().await.list_peers()
    }

    /// Adopt the longest valid chain any peer reports, if it is strictly
    /// longer than ours. Peer failures are logged and skipped.
    pub async fn resolve_conflicts(&self) -> Result<ResolveOutcome, ChainError> {
        let peers = self.list_peers().await;
        let (local_length, difficulty) = {
            let blockchain = self.blockchain.read().await;
            (blockchain.len(), blockchain.difficulty)
        };

        let reports = self.client.fetch_all(&peers).await;
        let candidate = select_longest_valid(local_length, reports, difficulty);

        let mut blockchain = self.blockchain.write().await;
        let replaced = match candidate {
            Some(candidate) if candidate.chain.len() > blockchain.len() => {
                let length = candidate.chain.len();
                blockchain.replace_chain(candidate.chain)?;
                self.mark_tip_changed();
                info!(peer = %candidate.peer, length, "replaced local chain");
                true
            }
            Some(candidate) => {
                debug!(peer = %candidate.peer, "local chain grew during resolution, keeping it");
                false
            }
            None => false,
        };

        Ok(ResolveOutcome {
            replaced,
            chain: blockchain.blocks().to_vec(),
        })
    }
}

//! Peer tracking and chain reconciliation for Chainlet
//!
//! This module provides:
//! - The registry of known peers (`host:port` authorities)
//! - An HTTP client that fetches a peer's full chain
//! - Longest-valid-chain selection over the fetched reports
//!
//! The node-level orchestration (locking, replacement) lives in
//! [`crate::node::Node::resolve_conflicts`].

use crate::blockchain::{validate_chain, Block};
use crate::error::ChainError;
use futures::future::join_all;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{debug, warn};

/// Wire shape of a node's chain, as served by `GET /chain`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainResponse {
    pub chain: Vec<Block>,
    pub length: u64,
}

impl ChainResponse {
    pub fn new(chain: Vec<Block>) -> Self {
        let length = chain.len() as u64;
        Self { chain, length }
    }
}

/// A peer's chain that beat the local one.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub peer: String,
    pub chain: Vec<Block>,
}

/// Extract the `host:port` authority from a peer address. Accepts full URLs
/// (`http://10.0.0.2:5000/`) as well as bare authorities (`10.0.0.2:5000`).
pub fn parse_peer_address(address: &str) -> Result<String, ChainError> {
    let trimmed = address.trim();
    if trimmed.is_empty() {
        return Err(ChainError::InvalidInput("Peer address cannot be empty".to_string()));
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    };

    let url = Url::parse(&candidate)
        .map_err(|e| ChainError::InvalidInput(format!("Invalid peer address {}: {}", address, e)))?;
    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| ChainError::InvalidInput(format!("Peer address {} has no host", address)))?;

    // `Url::port` hides a port equal to the scheme default, but a peer given
    // as `https://h:443` must still be dialed on 443.
    let port = if has_explicit_port(&candidate) {
        url.port_or_known_default()
    } else {
        url.port()
    };

    Ok(match port {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Whether the authority part of `url` ends in `:<digits>`. A bracketed IPv6
/// host without a port ends in `]`, so its inner colons never match.
fn has_explicit_port(url: &str) -> bool {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host_port = authority.rsplit('@').next().unwrap_or_default();
    match host_port.rsplit_once(':') {
        Some((_, port)) => !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}

/// Known peers. Iteration order is lexicographic on the authority; callers
/// must not read any priority into it.
#[derive(Debug, Clone, Default)]
pub struct PeerRegistry {
    peers: BTreeSet<String>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one peer. Returns `false` when it was already known.
    pub fn register_peer(&mut self, address: &str) -> Result<bool, ChainError> {
        let authority = parse_peer_address(address)?;
        Ok(self.peers.insert(authority))
    }

    /// Register a batch of peers. Every address is parsed before any is
    /// inserted, so a bad entry leaves the registry untouched.
    pub fn register_peers(&mut self, addresses: &[String]) -> Result<usize, ChainError> {
        let parsed = addresses
            .iter()
            .map(|a| parse_peer_address(a))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(parsed
            .into_iter()
            .filter(|authority| self.peers.insert(authority.clone()))
            .count())
    }

    pub fn list_peers(&self) -> Vec<String> {
        self.peers.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

/// HTTP client used to pull chains from peers.
#[derive(Debug, Clone)]
pub struct PeerClient {
    http: reqwest::Client,
}

impl PeerClient {
    /// Every request made through this client is bounded by `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, ChainError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChainError::ConfigError(format!("HTTP client error: {}", e)))?;
        Ok(Self { http })
    }

    pub async fn fetch_chain(&self, peer: &str) -> Result<ChainResponse, ChainError> {
        let url = format!("http://{}/chain", peer);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ChainError::PeerUnreachable {
                peer: peer.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChainError::PeerError {
                peer: peer.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .json::<ChainResponse>()
            .await
            .map_err(|e| ChainError::InvalidChain(format!("malformed chain from {}: {}", peer, e)))
    }

    /// Fetch every peer's chain concurrently. Results come back in the order
    /// of `peers`, one per peer, failures included.
    pub async fn fetch_all(&self, peers: &[String]) -> Vec<(String, Result<ChainResponse, ChainError>)> {
        join_all(peers.iter().map(|peer| async move {
            let report = self.fetch_chain(peer).await;
            (peer.clone(), report)
        }))
        .await
    }
}

/// Pick the longest chain among `reports` that is strictly longer than
/// `local_length` and passes validation. On equal lengths the earlier report
/// wins. Failed or invalid reports are logged and skipped.
pub fn select_longest_valid(
    local_length: usize,
    reports: Vec<(String, Result<ChainResponse, ChainError>)>,
    difficulty: u32,
) -> Option<Candidate> {
    let mut max_length = local_length;
    let mut best = None;

    for (peer, report) in reports {
        let response = match report {
            Ok(response) => response,
            Err(e) => {
                warn!(peer = %peer, error = %e, "skipping peer during resolution");
                continue;
            }
        };

        if response.length != response.chain.len() as u64 {
            warn!(
                peer = %peer,
                reported = response.length,
                actual = response.chain.len(),
                "peer reported a length that does not match its chain"
            );
            continue;
        }

        let length = response.chain.len();
        if length <= max_length {
            debug!(peer = %peer, length, max_length, "peer chain is not longer");
            continue;
        }

        if let Err(e) = validate_chain(&response.chain, difficulty) {
            warn!(peer = %peer, length, error = %e, "rejecting invalid peer chain");
            continue;
        }

        max_length = length;
        best = Some(Candidate {
            peer,
            chain: response.chain,
        });
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::Blockchain;
    use crate::miner::find_proof;
    use crate::transaction::Transaction;

    const DIFFICULTY: u32 = 1;

    fn chain_of_length(length: usize, tag: &str) -> Vec<Block> {
        let mut chain = Blockchain::new(DIFFICULTY);
        while chain.len() < length {
            chain.add_transaction(Transaction::new(tag, "B", chain.len() as f64));
            let last_proof = chain.last_block().unwrap().proof;
            chain.seal_block(find_proof(last_proof, DIFFICULTY), None).unwrap();
        }
        chain.blocks().to_vec()
    }

    fn broken_chain_of_length(length: usize) -> Vec<Block> {
        let mut chain = chain_of_length(length, "broken");
        chain[1].previous_hash = "deadbeef".to_string();
        chain
    }

    fn ok(peer: &str, chain: Vec<Block>) -> (String, Result<ChainResponse, ChainError>) {
        (peer.to_string(), Ok(ChainResponse::new(chain)))
    }

    #[test]
    fn test_parse_peer_address_variants() {
        assert_eq!(parse_peer_address("http://192.168.0.5:5000").unwrap(), "192.168.0.5:5000");
        assert_eq!(parse_peer_address("http://192.168.0.5:5000/chain").unwrap(), "192.168.0.5:5000");
        assert_eq!(parse_peer_address("192.168.0.5:5000").unwrap(), "192.168.0.5:5000");
        assert_eq!(parse_peer_address(" localhost:5001 ").unwrap(), "localhost:5001");
        assert_eq!(parse_peer_address("http://node.example").unwrap(), "node.example");
        assert_eq!(parse_peer_address("https://10.0.0.2:443").unwrap(), "10.0.0.2:443");
        assert_eq!(parse_peer_address("http://10.0.0.2:80/").unwrap(), "10.0.0.2:80");
        assert_eq!(parse_peer_address("10.0.0.2:80").unwrap(), "10.0.0.2:80");
        assert_eq!(parse_peer_address("https://10.0.0.2").unwrap(), "10.0.0.2");
        assert_eq!(parse_peer_address("http://[::1]:8080").unwrap(), "[::1]:8080");
        assert_eq!(parse_peer_address("http://[::1]").unwrap(), "[::1]");
    }

    #[test]
    fn test_parse_peer_address_rejects_garbage() {
        assert!(matches!(parse_peer_address(""), Err(ChainError::InvalidInput(_))));
        assert!(matches!(parse_peer_address("   "), Err(ChainError::InvalidInput(_))));
        assert!(matches!(parse_peer_address("http://:5000"), Err(ChainError::InvalidInput(_))));
        assert!(matches!(parse_peer_address("host:notaport"), Err(ChainError::InvalidInput(_))));
    }

    #[test]
    fn test_register_peer_is_idempotent() {
        let mut registry = PeerRegistry::new();
        assert!(registry.register_peer("http://127.0.0.1:5001").unwrap());
        assert!(!registry.register_peer("http://127.0.0.1:5001").unwrap());
        assert!(!registry.register_peer("127.0.0.1:5001").unwrap());
        assert_eq!(registry.list_peers(), vec!["127.0.0.1:5001"]);
    }

    #[test]
    fn test_register_peers_is_all_or_nothing() {
        let mut registry = PeerRegistry::new();
        let batch = vec!["127.0.0.1:5001".to_string(), "http://:1".to_string()];
        assert!(registry.register_peers(&batch).is_err());
        assert!(registry.is_empty());

        let batch = vec![
            "127.0.0.1:5001".to_string(),
            "http://127.0.0.1:5002".to_string(),
            "127.0.0.1:5001".to_string(),
        ];
        assert_eq!(registry.register_peers(&batch).unwrap(), 2);
        assert_eq!(registry.list_peers(), vec!["127.0.0.1:5001", "127.0.0.1:5002"]);
    }

    #[test]
    fn test_longer_valid_chain_wins_over_invalid() {
        let reports = vec![ok("a:1", broken_chain_of_length(5)), ok("b:1", chain_of_length(7, "b"))];
        let winner = select_longest_valid(6, reports, DIFFICULTY).unwrap();
        assert_eq!(winner.peer, "b:1");
        assert_eq!(winner.chain.len(), 7);
    }

    #[test]
    fn test_longest_invalid_chain_is_skipped() {
        let reports = vec![
            ok("a:1", broken_chain_of_length(9)),
            ok("b:1", chain_of_length(4, "b")),
            ok("c:1", chain_of_length(3, "c")),
        ];
        let winner = select_longest_valid(2, reports, DIFFICULTY).unwrap();
        assert_eq!(winner.peer, "b:1");
    }

    #[test]
    fn test_no_longer_chain_keeps_local() {
        let reports = vec![ok("a:1", chain_of_length(3, "a")), ok("b:1", chain_of_length(2, "b"))];
        assert!(select_longest_valid(3, reports, DIFFICULTY).is_none());
    }

    #[test]
    fn test_failures_do_not_abort_selection() {
        let reports = vec![
            (
                "down:1".to_string(),
                Err(ChainError::PeerUnreachable {
                    peer: "down:1".to_string(),
                    reason: "connection refused".to_string(),
                }),
            ),
            (
                "err:1".to_string(),
                Err(ChainError::PeerError {
                    peer: "err:1".to_string(),
                    status: 500,
                }),
            ),
            ok("up:1", chain_of_length(3, "up")),
        ];
        let winner = select_longest_valid(1, reports, DIFFICULTY).unwrap();
        assert_eq!(winner.peer, "up:1");
    }

    #[test]
    fn test_equal_length_keeps_first_report() {
        let reports = vec![ok("a:1", chain_of_length(4, "a")), ok("b:1", chain_of_length(4, "b"))];
        assert_eq!(select_longest_valid(1, reports, DIFFICULTY).unwrap().peer, "a:1");
    }

    #[test]
    fn test_mismatched_length_is_skipped() {
        let mut response = ChainResponse::new(chain_of_length(2, "a"));
        response.length = 10;
        let reports = vec![("a:1".to_string(), Ok(response))];
        assert!(select_longest_valid(1, reports, DIFFICULTY).is_none());
    }

    #[tokio::test]
    async fn test_fetch_chain_unreachable_peer() {
        tokio::time::timeout(Duration::from_secs(10), async {
            let client = PeerClient::new(Duration::from_millis(500)).unwrap();
            let result = client.fetch_chain("127.0.0.1:1").await;
            assert!(matches!(result, Err(ChainError::PeerUnreachable { .. })));
        })
        .await
        .expect("test_fetch_chain_unreachable_peer timed out");
    }
}

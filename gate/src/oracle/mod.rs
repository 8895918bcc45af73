// gate/src/oracle/mod.rs
//! Token ownership lookups against the single gated contract.
//!
//! Every transport reports failures as [`OracleError`]; [`BalanceOracle::owns_token`]
//! turns them into an "ownership unknown" result that never grants access.

pub mod indexer;
pub mod rpc;

use alloy_primitives::Address;
use async_trait::async_trait;
use common::config::ChainConfig;
use common::models::{AddressError, OwnershipDetail, OwnershipResult, WalletAddress};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub use indexer::IndexerBalanceOracle;
pub use rpc::RpcBalanceOracle;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("invalid contract address {address}: {source}")]
    Contract {
        address: String,
        #[source]
        source: AddressError,
    },
    #[error("failed to build HTTP client: {0}")]
    Client(String),
    #[error("request to {endpoint} failed: {reason}")]
    Transport { endpoint: String, reason: String },
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("endpoint returned HTTP {0}")]
    Status(u16),
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// The contract and chain ownership is checked against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenTarget {
    pub contract: Address,
    pub chain: String,
    pub chain_id: u64,
}

impl TokenTarget {
    /// Accepts the contract address in any letter case
    pub fn new(contract: &str, chain: impl Into<String>, chain_id: u64) -> Result<Self, OracleError> {
        let parsed = WalletAddress::parse(contract).map_err(|source| OracleError::Contract {
            address: contract.to_string(),
            source,
        })?;
        Ok(Self {
            contract: parsed.to_address(),
            chain: chain.into(),
            chain_id,
        })
    }

    pub fn from_config(chain: &ChainConfig) -> Result<Self, OracleError> {
        Self::new(&chain.contract_address, chain.name.clone(), chain.chain_id)
    }

    /// Checksummed form shown to users and sent to endpoints
    pub fn contract_checksummed(&self) -> String {
        self.contract.to_checksum(None)
    }
}

/// Read-only `balanceOf(owner)` lookup for one fixed contract.
///
/// Implementations hold no mutable state and are safe to call concurrently
/// and to retry.
#[async_trait]
pub trait BalanceOracle: Send + Sync {
    fn target(&self) -> &TokenTarget;

    async fn balance_of(&self, wallet: &WalletAddress) -> Result<OwnershipDetail, OracleError>;

    /// Ownership check that fails closed
    async fn owns_token(&self, wallet: &WalletAddress) -> OwnershipResult {
        match self.balance_of(wallet).await {
            Ok(detail) => {
                tracing::info!(
                    "Wallet {} holds {} token(s) of {} on {}",
                    wallet.checksummed(),
                    detail.balance,
                    detail.contract,
                    detail.chain
                );
                OwnershipResult::from_detail(detail)
            },
            Err(e) => {
                tracing::warn!("Ownership of {} unknown, treating as not owned: {}", wallet, e);
                OwnershipResult::unknown(e.to_string())
            },
        }
    }
}

/// Build the configured oracle: the indexing API when credentials are present, JSON-RPC otherwise
pub fn from_config(chain: &ChainConfig) -> Result<Arc<dyn BalanceOracle>, OracleError> {
    let target = TokenTarget::from_config(chain)?;
    match &chain.indexer {
        Some(indexer) => {
            tracing::info!("Using indexing API at {} for ownership checks", indexer.base_url);
            Ok(Arc::new(IndexerBalanceOracle::new(
                &indexer.base_url,
                &indexer.api_key,
                target,
                chain.oracle_timeout(),
            )?))
        },
        None => {
            tracing::info!("Using JSON-RPC endpoint {} for ownership checks", chain.rpc_url);
            Ok(Arc::new(RpcBalanceOracle::new(&chain.rpc_url, target, chain.oracle_timeout())?))
        },
    }
}

/// Map a reqwest failure onto the oracle taxonomy
pub(crate) fn transport_error(endpoint: &str, timeout: Duration, e: reqwest::Error) -> OracleError {
    if e.is_timeout() {
        OracleError::Timeout(timeout)
    } else if let Some(status) = e.status() {
        OracleError::Status(status.as_u16())
    } else {
        OracleError::Transport {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        }
    }
}

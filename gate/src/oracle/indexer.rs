// gate/src/oracle/indexer.rs
use alloy_primitives::U256;
use async_trait::async_trait;
use common::models::{OwnershipDetail, WalletAddress};
use serde::Deserialize;
use std::time::Duration;

use super::{transport_error, BalanceOracle, OracleError, TokenTarget};

#[derive(Debug, Clone, Deserialize)]
pub struct IndexedNft {
    pub token_address: String,
    pub token_id: String,
    /// Present for multi-edition tokens; absent means one
    #[serde(default)]
    pub amount: Option<String>,
}

/// One page of the wallet NFT listing
#[derive(Debug, Clone, Deserialize)]
pub struct IndexerPage {
    #[serde(default)]
    pub result: Vec<IndexedNft>,
    #[serde(default)]
    pub cursor: Option<String>,
}

/// Ownership lookup through an NFT indexing API instead of a node.
///
/// Only the first page is read: a non-empty page already decides the gate,
/// and the token ids are display-only.
pub struct IndexerBalanceOracle {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    target: TokenTarget,
    timeout: Duration,
}

impl IndexerBalanceOracle {
    pub fn new(base_url: &str, api_key: &str, target: TokenTarget, timeout: Duration) -> Result<Self, OracleError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OracleError::Client(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            target,
            timeout,
        })
    }

    fn listing_url(&self, wallet: &WalletAddress) -> String {
        format!(
            "{}/{}/nft?chain={}&format=decimal&token_addresses={}",
            self.base_url,
            wallet.checksummed(),
            self.target.chain,
            self.target.contract_checksummed()
        )
    }
}

/// Balance and token ids held of `target`'s contract within a page
pub fn summarize_page(page: &IndexerPage, target: &TokenTarget) -> Result<(U256, Vec<String>), OracleError> {
    let contract = format!("0x{}", hex::encode(target.contract.as_slice()));
    let mut balance = U256::ZERO;
    let mut token_ids = Vec::new();

    for nft in page
        .result
        .iter()
        .filter(|nft| nft.token_address.eq_ignore_ascii_case(&contract))
    {
        let amount = match &nft.amount {
            Some(raw) => U256::from_str_radix(raw, 10)
                .map_err(|e| OracleError::Malformed(format!("amount {:?}: {}", raw, e)))?,
            None => U256::from(1),
        };
        balance = balance
            .checked_add(amount)
            .ok_or_else(|| OracleError::Malformed("token amounts overflow uint256".to_string()))?;
        token_ids.push(nft.token_id.clone());
    }

    Ok((balance, token_ids))
}

#[async_trait]
impl BalanceOracle for IndexerBalanceOracle {
    fn target(&self) -> &TokenTarget {
        &self.target
    }

    async fn balance_of(&self, wallet: &WalletAddress) -> Result<OwnershipDetail, OracleError> {
        let url = self.listing_url(wallet);
        tracing::debug!("Querying indexer for {}", wallet.checksummed());

        let response = self
            .http
            .get(&url)
            .header("X-API-Key", &self.api_key)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| transport_error(&self.base_url, self.timeout, e))?;

        if !response.status().is_success() {
            return Err(OracleError::Status(response.status().as_u16()));
        }

        let page: IndexerPage = response
            .json()
            .await
            .map_err(|e| OracleError::Malformed(e.to_string()))?;
        let (balance, token_ids) = summarize_page(&page, &self.target)?;

        Ok(OwnershipDetail {
            balance,
            contract: self.target.contract_checksummed(),
            chain: self.target.chain.clone(),
            token_ids,
        })
    }
}

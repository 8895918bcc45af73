// gate/src/handoff.rs
//! Server-mediated handoff: the signing popup saves its proof on the auth
//! server and the gate polls for it by wallet address.

use async_trait::async_trait;
use common::messages::{CheckProofResponse, ErrorResponse, SaveProofRequest, SaveProofResponse};
use common::models::{SignedProof, WalletAddress};
use std::time::Duration;
use thiserror::Error;
use tokio::time::{sleep, Instant};

#[derive(Debug, Error)]
pub enum HandoffError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("no proof source configured")]
    Unconfigured,
    #[error("auth server unreachable: {0}")]
    Transport(String),
    #[error("auth server returned HTTP {status}: {detail}")]
    Status { status: u16, detail: String },
    #[error("malformed auth server response: {0}")]
    Malformed(String),
    /// Never submitted, already consumed or expired
    #[error("no authentication data found")]
    NotFound,
}

/// Where pending proofs are fetched from and discarded after use
#[async_trait]
pub trait ProofSource: Send + Sync {
    async fn fetch(&self, wallet: &WalletAddress) -> Result<Option<SignedProof>, HandoffError>;

    async fn discard(&self, wallet: &WalletAddress) -> Result<(), HandoffError>;
}

/// HTTP client for the auth server's `/api/auth` endpoints
#[derive(Clone)]
pub struct AuthServerClient {
    http: reqwest::Client,
    base_url: String,
}

impl AuthServerClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, HandoffError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HandoffError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Producer side: store a freshly signed proof
    pub async fn save(&self, proof: &SignedProof) -> Result<SaveProofResponse, HandoffError> {
        let response = self
            .http
            .post(format!("{}/api/auth/save", self.base_url))
            .json(&SaveProofRequest::from(proof))
            .send()
            .await
            .map_err(|e| HandoffError::Transport(e.to_string()))?;

        let response = ensure_success(response).await?;
        let saved: SaveProofResponse = response
            .json()
            .await
            .map_err(|e| HandoffError::Malformed(e.to_string()))?;

        tracing::info!("Saved proof for {} as session {}", proof.wallet, saved.session_id);
        Ok(saved)
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, HandoffError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let detail = match response.json::<ErrorResponse>().await {
        Ok(body) => body.detail,
        Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
    };
    Err(HandoffError::Status {
        status: status.as_u16(),
        detail,
    })
}

#[async_trait]
impl ProofSource for AuthServerClient {
    async fn fetch(&self, wallet: &WalletAddress) -> Result<Option<SignedProof>, HandoffError> {
        let response = self
            .http
            .get(format!("{}/api/auth/check/{}", self.base_url, wallet))
            .send()
            .await
            .map_err(|e| HandoffError::Transport(e.to_string()))?;

        let body: CheckProofResponse = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|e| HandoffError::Malformed(e.to_string()))?;

        let proof = body
            .into_proof()
            .map_err(|e| HandoffError::Malformed(format!("stored wallet: {}", e)))?;

        match proof {
            Some(proof) if proof.wallet != *wallet => Err(HandoffError::Malformed(format!(
                "asked for {}, received proof for {}",
                wallet, proof.wallet
            ))),
            other => Ok(other),
        }
    }

    async fn discard(&self, wallet: &WalletAddress) -> Result<(), HandoffError> {
        let response = self
            .http
            .delete(format!("{}/api/auth/clear/{}", self.base_url, wallet))
            .send()
            .await
            .map_err(|e| HandoffError::Transport(e.to_string()))?;

        ensure_success(response).await?;
        tracing::debug!("Discarded pending proof for {}", wallet);
        Ok(())
    }
}

/// Poll `source` every `interval` until a proof for `wallet` appears or `ceiling` elapses.
///
/// Transport failures are retried until the ceiling; the last one is returned
/// if no proof ever arrives.
pub async fn poll_for_proof(
    source: &dyn ProofSource,
    wallet: &WalletAddress,
    interval: Duration,
    ceiling: Duration,
) -> Result<SignedProof, HandoffError> {
    let deadline = Instant::now() + ceiling;
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        let last_error = match source.fetch(wallet).await {
            Ok(Some(proof)) => {
                tracing::info!("Proof for {} available after {} poll(s)", wallet, attempts);
                return Ok(proof);
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Poll {} for {} failed: {}", attempts, wallet, e);
                Some(e)
            },
        };

        if Instant::now() + interval > deadline {
            tracing::info!("Stopped polling for {} after {} attempt(s)", wallet, attempts);
            return Err(last_error.unwrap_or(HandoffError::NotFound));
        }
        sleep(interval).await;
    }
}

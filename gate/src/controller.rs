// gate/src/controller.rs
//! Gate state machine:
//!
//! ```text
//! UNAUTHENTICATED -> PENDING_VERIFICATION -> AUTHENTICATED | DENIED
//! AUTHENTICATED -> UNAUTHENTICATED (logout)
//! DENIED -> PENDING_VERIFICATION (fresh proof)
//! ```
//!
//! Every failure ends in `DENIED` with a reason, or leaves the state
//! unchanged when no proof was available. Nothing here returns an error
//! for a verification failure.

use common::models::{OwnershipResult, WalletAddress};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::handoff::{poll_for_proof, HandoffError, ProofSource};
use crate::oracle::BalanceOracle;
use crate::proof::{ProofMethod, ProviderTokenVerifier};

/// Why access was refused
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DenialReason {
    SignatureInvalid(String),
    /// The chain endpoint could not answer; a manual retry may succeed
    OracleUnavailable(String),
    NotOwner { contract: String, chain: String },
}

impl DenialReason {
    /// Whether re-checking with the same proof could change the outcome
    pub fn is_retryable(&self) -> bool {
        matches!(self, DenialReason::OracleUnavailable(_))
    }
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenialReason::SignatureInvalid(_) => write!(f, "The signature is not valid for this wallet"),
            DenialReason::OracleUnavailable(_) => write!(
                f,
                "Could not verify token ownership right now, please try again"
            ),
            DenialReason::NotOwner { contract, chain } => write!(
                f,
                "This wallet does not hold the required token (contract {} on {})",
                contract, chain
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum GateState {
    Unauthenticated,
    PendingVerification { wallet: WalletAddress },
    Authenticated,
    Denied(DenialReason),
}

/// What the presentation layer reads; reset on logout
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuthenticatedState {
    pub authenticated: bool,
    pub wallet: Option<WalletAddress>,
    pub ownership: Option<OwnershipResult>,
}

/// Drives one visitor through proof verification and the ownership check
pub struct GateController {
    oracle: Arc<dyn BalanceOracle>,
    oracle_timeout: Duration,
    provider: Option<ProviderTokenVerifier>,
    source: Option<Arc<dyn ProofSource>>,
    state: GateState,
    session: AuthenticatedState,
}

impl GateController {
    pub fn new(oracle: Arc<dyn BalanceOracle>, oracle_timeout: Duration) -> Self {
        Self {
            oracle,
            oracle_timeout,
            provider: None,
            source: None,
            state: GateState::Unauthenticated,
            session: AuthenticatedState::default(),
        }
    }

    /// Enable the server-mediated handoff
    pub fn with_proof_source(mut self, source: Arc<dyn ProofSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Accept identity-provider tokens as proofs
    pub fn with_provider(mut self, provider: ProviderTokenVerifier) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn current_state(&self) -> &GateState {
        &self.state
    }

    pub fn authenticated_state(&self) -> &AuthenticatedState {
        &self.session
    }

    /// Verify a proof that reached the gate directly (relay or in-process)
    pub async fn submit_proof(&mut self, proof: ProofMethod) -> GateState {
        self.verify(proof, false).await
    }

    /// Fetch the pending proof for `wallet_input` from the proof source once.
    ///
    /// Returns an error, leaving the state unchanged, when the input is
    /// malformed or no proof is stored.
    pub async fn check_handoff(&mut self, wallet_input: &str) -> Result<GateState, HandoffError> {
        let (source, wallet) = self.handoff_target(wallet_input)?;
        if self.already_authenticated(&wallet) {
            return Ok(self.state.clone());
        }
        match source.fetch(&wallet).await? {
            Some(proof) => Ok(self.verify(ProofMethod::Signature(proof), true).await),
            None => {
                tracing::info!("No authentication data found for {}", wallet);
                Err(HandoffError::NotFound)
            },
        }
    }

    /// Like [`check_handoff`](Self::check_handoff) but polls until a proof appears or `ceiling` passes
    pub async fn await_handoff(
        &mut self,
        wallet_input: &str,
        interval: Duration,
        ceiling: Duration,
    ) -> Result<GateState, HandoffError> {
        let (source, wallet) = self.handoff_target(wallet_input)?;
        if self.already_authenticated(&wallet) {
            return Ok(self.state.clone());
        }
        let proof = poll_for_proof(source.as_ref(), &wallet, interval, ceiling).await?;
        Ok(self.verify(ProofMethod::Signature(proof), true).await)
    }

    /// Drop the authenticated session; server-side cleanup is best effort
    pub async fn logout(&mut self) {
        let wallet = self.session.wallet.take();
        self.session = AuthenticatedState::default();
        self.state = GateState::Unauthenticated;

        if let Some(wallet) = wallet {
            tracing::info!("Logged out {}", wallet);
            self.discard_pending(&wallet).await;
        }
    }

    fn handoff_target(&self, wallet_input: &str) -> Result<(Arc<dyn ProofSource>, WalletAddress), HandoffError> {
        let wallet = WalletAddress::parse(wallet_input)
            .map_err(|e| HandoffError::InvalidInput(format!("Invalid wallet address: {}", e)))?;
        let source = self.source.clone().ok_or(HandoffError::Unconfigured)?;
        Ok((source, wallet))
    }

    // Any pending proof stays on the source untouched
    fn already_authenticated(&self, wallet: &WalletAddress) -> bool {
        let authenticated = self.state == GateState::Authenticated;
        if authenticated {
            tracing::info!("Visit already authenticated, not fetching a proof for {}", wallet);
        }
        authenticated
    }

    async fn verify(&mut self, proof: ProofMethod, from_source: bool) -> GateState {
        if self.state == GateState::Authenticated {
            tracing::info!("Ignoring proof for {}: visit already authenticated", proof.wallet());
            return self.state.clone();
        }

        let wallet = proof.wallet().clone();
        self.state = GateState::PendingVerification { wallet: wallet.clone() };
        tracing::info!("Verifying {} for {}", proof.kind(), wallet);

        let identity = proof.verify(self.provider.as_ref());
        if !identity.verified {
            let failure = identity.failure.unwrap_or_default();
            return self.deny(&wallet, DenialReason::SignatureInvalid(failure), from_source).await;
        }

        let ownership = match tokio::time::timeout(self.oracle_timeout, self.oracle.owns_token(&wallet)).await {
            Ok(ownership) => ownership,
            Err(_) => {
                tracing::warn!("Ownership check for {} timed out after {:?}", wallet, self.oracle_timeout);
                OwnershipResult::unknown(format!("timed out after {:?}", self.oracle_timeout))
            },
        };

        if let Some(reason) = &ownership.unavailable {
            let reason = DenialReason::OracleUnavailable(reason.clone());
            return self.deny(&wallet, reason, from_source).await;
        }
        if !ownership.owned {
            let target = self.oracle.target();
            let reason = DenialReason::NotOwner {
                contract: target.contract_checksummed(),
                chain: target.chain.clone(),
            };
            return self.deny(&wallet, reason, from_source).await;
        }

        tracing::info!("Access granted to {} (balance {})", wallet, ownership.balance());
        self.session = AuthenticatedState {
            authenticated: true,
            wallet: Some(wallet.clone()),
            ownership: Some(ownership),
        };
        self.state = GateState::Authenticated;

        if from_source {
            self.discard_pending(&wallet).await;
        }
        self.state.clone()
    }

    async fn deny(&mut self, wallet: &WalletAddress, reason: DenialReason, from_source: bool) -> GateState {
        tracing::warn!("Access denied to {}: {:?}", wallet, reason);

        // Keep the proof around when a retry could still succeed with it
        if from_source && !reason.is_retryable() {
            self.discard_pending(wallet).await;
        }
        self.state = GateState::Denied(reason);
        self.state.clone()
    }

    async fn discard_pending(&self, wallet: &WalletAddress) {
        if let Some(source) = &self.source {
            if let Err(e) = source.discard(wallet).await {
                // TTL expiry still removes it
                tracing::warn!("Failed to clear pending proof for {}: {}", wallet, e);
            }
        }
    }
}

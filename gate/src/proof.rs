// gate/src/proof.rs
//! Ways a user can prove control of a wallet. Each reduces to a
//! [`VerifiedIdentity`] so the gate handles them identically.

use common::config::{IdentityProviderConfig, TokenAlgorithm};
use common::models::{SignedProof, WalletAddress};
use common::signature::verify_signature;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProofMethod {
    /// Personal-message signature captured by the signing popup
    Signature(SignedProof),
    /// Wallet-bound token issued by a third-party identity provider
    ProviderToken { wallet: WalletAddress, token: String },
}

/// Normalised outcome of checking any [`ProofMethod`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub wallet: WalletAddress,
    pub verified: bool,
    /// Why verification failed, for the denial message
    pub failure: Option<String>,
}

impl VerifiedIdentity {
    fn accepted(wallet: WalletAddress) -> Self {
        Self { wallet, verified: true, failure: None }
    }

    fn rejected(wallet: WalletAddress, failure: impl ToString) -> Self {
        Self {
            wallet,
            verified: false,
            failure: Some(failure.to_string()),
        }
    }
}

impl ProofMethod {
    pub fn wallet(&self) -> &WalletAddress {
        match self {
            ProofMethod::Signature(proof) => &proof.wallet,
            ProofMethod::ProviderToken { wallet, .. } => wallet,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ProofMethod::Signature(_) => "message signature",
            ProofMethod::ProviderToken { .. } => "identity provider token",
        }
    }

    /// Check the proof. Provider tokens are rejected when no provider is configured.
    pub fn verify(&self, provider: Option<&ProviderTokenVerifier>) -> VerifiedIdentity {
        let wallet = self.wallet().clone();
        let result = match self {
            ProofMethod::Signature(proof) => {
                verify_signature(&proof.wallet, &proof.message, &proof.signature).map_err(|e| e.to_string())
            },
            ProofMethod::ProviderToken { wallet, token } => match provider {
                Some(provider) => provider.verify(wallet, token).map_err(|e| e.to_string()),
                None => Err(ProviderTokenError::NotConfigured.to_string()),
            },
        };

        match result {
            Ok(()) => VerifiedIdentity::accepted(wallet),
            Err(failure) => {
                tracing::warn!("{} for {} rejected: {}", self.kind(), wallet, failure);
                VerifiedIdentity::rejected(wallet, failure)
            },
        }
    }
}

impl From<SignedProof> for ProofMethod {
    fn from(proof: SignedProof) -> Self {
        ProofMethod::Signature(proof)
    }
}

#[derive(Debug, Error)]
pub enum ProviderTokenError {
    #[error("no identity provider is configured")]
    NotConfigured,
    #[error("invalid identity provider key: {0}")]
    Key(String),
    #[error("identity token rejected: {0}")]
    Invalid(String),
    #[error("identity token is bound to {bound}, not {claimed}")]
    WalletMismatch { claimed: String, bound: String },
}

/// Claims carried by a provider token
#[derive(Debug, Serialize, Deserialize)]
pub struct ProviderClaims {
    pub sub: String,
    pub wallet: String,
    pub iss: String,
    pub aud: String,
    pub exp: usize,
    pub iat: usize,
}

/// Validates provider tokens against a statically configured key
pub struct ProviderTokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl ProviderTokenVerifier {
    pub fn from_config(config: &IdentityProviderConfig) -> Result<Self, ProviderTokenError> {
        let (key, algorithm) = match config.algorithm {
            TokenAlgorithm::Es256 => (
                DecodingKey::from_ec_pem(config.key.as_bytes()).map_err(|e| ProviderTokenError::Key(e.to_string()))?,
                Algorithm::ES256,
            ),
            TokenAlgorithm::Hs256 => (DecodingKey::from_secret(config.key.as_bytes()), Algorithm::HS256),
        };

        let mut validation = Validation::new(algorithm);
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_audience(&[config.audience.as_str()]);

        Ok(Self { key, validation })
    }

    /// Accept `token` iff it is valid and bound to `wallet`
    pub fn verify(&self, wallet: &WalletAddress, token: &str) -> Result<(), ProviderTokenError> {
        let data = decode::<ProviderClaims>(token, &self.key, &self.validation)
            .map_err(|e| ProviderTokenError::Invalid(e.to_string()))?;

        let bound = WalletAddress::parse(&data.claims.wallet).map_err(|_| ProviderTokenError::WalletMismatch {
            claimed: wallet.to_string(),
            bound: data.claims.wallet.clone(),
        })?;
        if bound != *wallet {
            return Err(ProviderTokenError::WalletMismatch {
                claimed: wallet.to_string(),
                bound: bound.to_string(),
            });
        }
        Ok(())
    }
}

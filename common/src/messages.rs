// common/src/messages.rs
//! JSON bodies exchanged between the signing popup, the auth server and the gate.
use serde::{Deserialize, Serialize};

use crate::models::session::{SessionRecord, SignedProof};
use crate::models::wallet::{AddressError, WalletAddress};

/// Reported for both never-submitted and expired proofs
pub const NO_PROOF_MESSAGE: &str = "No authentication data found";

/// Body of `POST /api/auth/save`. Fields are optional so that a missing
/// field is reported as a validation error rather than a parse failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SaveProofRequest {
    pub wallet: Option<String>,
    pub signature: Option<String>,
    pub message: Option<String>,
}

impl SaveProofRequest {
    /// Validate the request into a proof; the error text is user visible
    pub fn into_proof(self) -> Result<SignedProof, String> {
        let wallet = non_empty(self.wallet);
        let signature = non_empty(self.signature);
        let message = non_empty(self.message);

        let (Some(wallet), Some(signature), Some(message)) = (wallet, signature, message) else {
            return Err("Incomplete data: wallet, signature and message are required".to_string());
        };

        let wallet = WalletAddress::parse(&wallet).map_err(|e| format!("Invalid wallet address: {}", e))?;
        Ok(SignedProof::new(wallet, message, signature))
    }
}

impl From<&SignedProof> for SaveProofRequest {
    fn from(proof: &SignedProof) -> Self {
        Self {
            wallet: Some(proof.wallet.to_string()),
            signature: Some(proof.signature.clone()),
            message: Some(proof.message.clone()),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Response to a successful save
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveProofResponse {
    pub status: String,
    pub session_id: String,
    pub message: String,
}

/// Response of `GET /api/auth/check/{wallet}`.
///
/// When `authenticated` is false, `message` carries a human readable reason;
/// otherwise it is the signed message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckProofResponse {
    pub authenticated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CheckProofResponse {
    pub fn found(record: &SessionRecord) -> Self {
        Self {
            authenticated: true,
            wallet: Some(record.proof.wallet.to_string()),
            signature: Some(record.proof.signature.clone()),
            message: Some(record.proof.message.clone()),
        }
    }

    pub fn absent() -> Self {
        Self {
            authenticated: false,
            wallet: None,
            signature: None,
            message: Some(NO_PROOF_MESSAGE.to_string()),
        }
    }

    /// Extract the pending proof, `None` when nothing is stored
    pub fn into_proof(self) -> Result<Option<SignedProof>, AddressError> {
        if !self.authenticated {
            return Ok(None);
        }
        match (self.wallet, self.signature, self.message) {
            (Some(wallet), Some(signature), Some(message)) => {
                let wallet = WalletAddress::parse(&wallet)?;
                Ok(Some(SignedProof::new(wallet, message, signature)))
            }
            _ => Ok(None),
        }
    }
}

/// Generic `{status, message}` acknowledgement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
}

impl StatusResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
        }
    }
}

/// Validation failure body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

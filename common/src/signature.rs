// common/src/signature.rs
//! Personal-message (EIP-191) signature verification.
//!
//! The signing popup asks the wallet for a `personal_sign` over a plain text
//! message. The wallet hashes `"\x19Ethereum Signed Message:\n" + len + message`
//! with keccak256 and signs the digest, so a signature obtained here can never
//! be replayed as a raw transaction or typed-data signature.

use alloy_primitives::{eip191_hash_message, Signature, B256};
use thiserror::Error;

use crate::models::wallet::WalletAddress;

/// Length of an `r || s || v` signature
pub const SIGNATURE_LEN: usize = 65;

/// Why a signature could not be accepted. Callers treat every variant as
/// "signature invalid".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("signature is not valid hex: {0}")]
    Encoding(String),
    #[error("signature must be {SIGNATURE_LEN} bytes (got {0})")]
    Length(usize),
    #[error("unsupported recovery id byte {0}")]
    RecoveryId(u8),
    #[error("public key recovery failed: {0}")]
    Recovery(String),
    #[error("claimed wallet is malformed: {0}")]
    ClaimedWallet(String),
    #[error("signature was produced by {recovered}, not {claimed}")]
    Mismatch {
        claimed: WalletAddress,
        recovered: WalletAddress,
    },
}

/// Domain-separated digest the wallet actually signs
pub fn personal_message_hash(message: &str) -> B256 {
    eip191_hash_message(message)
}

/// Decode hex signature text into a recoverable signature.
///
/// Accepts `v` in both the raw (0/1) and the legacy (27/28) notation.
pub fn decode_signature(signature: &str) -> Result<Signature, SignatureError> {
    let text = signature.trim();
    let text = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);

    let bytes = hex::decode(text).map_err(|e| SignatureError::Encoding(e.to_string()))?;
    if bytes.len() != SIGNATURE_LEN {
        return Err(SignatureError::Length(bytes.len()));
    }

    let v = bytes[SIGNATURE_LEN - 1];
    if !matches!(v, 0 | 1 | 27 | 28) {
        return Err(SignatureError::RecoveryId(v));
    }

    Signature::from_raw(&bytes).map_err(|e| SignatureError::Recovery(e.to_string()))
}

/// Recover the address that signed `message`
pub fn recover_signer(message: &str, signature: &str) -> Result<WalletAddress, SignatureError> {
    let signature = decode_signature(signature)?;
    let address = signature
        .recover_address_from_msg(message.as_bytes())
        .map_err(|e| SignatureError::Recovery(e.to_string()))?;
    Ok(WalletAddress::from(address))
}

/// Check that `claimed` produced `signature` over `message`
pub fn verify_signature(
    claimed: &WalletAddress,
    message: &str,
    signature: &str,
) -> Result<(), SignatureError> {
    let recovered = recover_signer(message, signature)?;
    if recovered != *claimed {
        return Err(SignatureError::Mismatch {
            claimed: claimed.clone(),
            recovered,
        });
    }
    Ok(())
}

/// Boolean form of [`verify_signature`] taking the claimed wallet as text.
///
/// Any failure, including a malformed claimed address, yields `false`.
pub fn verify(claimed_wallet: &str, message: &str, signature: &str) -> bool {
    let result = WalletAddress::parse(claimed_wallet)
        .map_err(|e| SignatureError::ClaimedWallet(e.to_string()))
        .and_then(|claimed| verify_signature(&claimed, message, signature));

    match result {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!("Signature rejected for {}: {}", claimed_wallet, e);
            false
        }
    }
}

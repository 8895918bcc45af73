// common/src/models/session.rs
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::wallet::WalletAddress;

/// Default lifetime of a pending proof (5 minutes)
pub const DEFAULT_SESSION_TTL_SECS: i64 = 300;

/// Claim that `wallet` produced `signature` over `message` with the
/// personal-message scheme. Created by the signing popup, consumed once by
/// the gate and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedProof {
    pub wallet: WalletAddress,
    pub message: String,
    /// Hex encoded 65-byte `r || s || v` signature, as produced by the wallet
    pub signature: String,
}

impl SignedProof {
    pub fn new(wallet: WalletAddress, message: impl Into<String>, signature: impl Into<String>) -> Self {
        Self {
            wallet,
            message: message.into(),
            signature: signature.into(),
        }
    }
}

/// Pending proof held by the session store for one wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub wallet: WalletAddress,
    pub proof: SignedProof,
    /// Timestamp when the proof was written
    pub created_at: DateTime<Utc>,
    /// `created_at + TTL`
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(proof: SignedProof, created_at: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            wallet: proof.wallet.clone(),
            proof,
            created_at,
            expires_at: created_at + ttl,
        }
    }

    /// A record is usable iff `now <= expires_at`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proof() -> SignedProof {
        let wallet = WalletAddress::parse("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed").unwrap();
        SignedProof::new(wallet, "hello", "0xdead")
    }

    #[test]
    fn test_expiry_boundary_is_inclusive() {
        let created = Utc::now();
        let record = SessionRecord::new(proof(), created, Duration::seconds(DEFAULT_SESSION_TTL_SECS));

        assert_eq!(record.expires_at - record.created_at, Duration::seconds(300));
        assert!(!record.is_expired_at(created));
        assert!(!record.is_expired_at(record.expires_at));
        assert!(record.is_expired_at(record.expires_at + Duration::milliseconds(1)));
    }
}

// common/src/models/ownership.rs
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// Balance and contract metadata attached to a successful oracle lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipDetail {
    pub balance: U256,
    /// Checksummed contract address
    pub contract: String,
    pub chain: String,
    /// Owned token ids, when the transport can enumerate them
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub token_ids: Vec<String>,
}

/// Outcome of a token ownership check. Derived on every gate attempt, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipResult {
    pub owned: bool,
    pub detail: Option<OwnershipDetail>,
    /// Set when ownership could not be determined; `owned` is then always false
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unavailable: Option<String>,
}

impl OwnershipResult {
    pub fn from_detail(detail: OwnershipDetail) -> Self {
        Self {
            owned: detail.balance > U256::ZERO,
            detail: Some(detail),
            unavailable: None,
        }
    }

    /// Fail-closed result for an oracle that could not answer
    pub fn unknown(reason: impl Into<String>) -> Self {
        Self {
            owned: false,
            detail: None,
            unavailable: Some(reason.into()),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.unavailable.is_some()
    }

    pub fn balance(&self) -> U256 {
        self.detail.as_ref().map(|d| d.balance).unwrap_or(U256::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detail(balance: u64) -> OwnershipDetail {
        OwnershipDetail {
            balance: U256::from(balance),
            contract: "0xF4820467171695F4d2760614C77503147A9CB1E8".to_string(),
            chain: "arbitrum".to_string(),
            token_ids: Vec::new(),
        }
    }

    #[test]
    fn test_owned_iff_positive_balance() {
        assert!(OwnershipResult::from_detail(detail(3)).owned);
        assert!(!OwnershipResult::from_detail(detail(0)).owned);
    }

    #[test]
    fn test_unknown_is_not_owned() {
        let result = OwnershipResult::unknown("connection refused");
        assert!(!result.owned);
        assert!(result.is_unknown());
        assert_eq!(result.balance(), U256::ZERO);
    }
}

// gate/src/oracle/rpc.rs
use alloy_primitives::{Address, U256};
use alloy_sol_types::{sol, SolCall};
use async_trait::async_trait;
use common::models::{OwnershipDetail, WalletAddress};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use super::{transport_error, BalanceOracle, OracleError, TokenTarget};

sol! {
    interface IERC721 {
        function balanceOf(address owner) external view returns (uint256 balance);
    }
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<String>,
    error: Option<RpcErrorObject>,
}

/// `balanceOf` via `eth_call` against a JSON-RPC node
pub struct RpcBalanceOracle {
    http: reqwest::Client,
    rpc_url: String,
    target: TokenTarget,
    timeout: Duration,
}

impl RpcBalanceOracle {
    pub fn new(rpc_url: &str, target: TokenTarget, timeout: Duration) -> Result<Self, OracleError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OracleError::Client(e.to_string()))?;

        Ok(Self {
            http,
            rpc_url: rpc_url.to_string(),
            target,
            timeout,
        })
    }
}

/// JSON-RPC `eth_call` body for `balanceOf(owner)` at the latest block
pub fn balance_of_request(owner: Address, target: &TokenTarget) -> Value {
    let calldata = IERC721::balanceOfCall { owner }.abi_encode();
    json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "eth_call",
        "params": [
            {
                "to": target.contract_checksummed(),
                "data": format!("0x{}", hex::encode(calldata)),
            },
            "latest"
        ]
    })
}

/// Decode the single `uint256` returned by `balanceOf`
pub fn decode_balance(result: &str) -> Result<U256, OracleError> {
    let text = result.strip_prefix("0x").unwrap_or(result);
    let bytes = hex::decode(text).map_err(|e| OracleError::Malformed(format!("result is not hex: {}", e)))?;
    if bytes.len() < 32 {
        // `0x` is what nodes return for calls to an address without code
        return Err(OracleError::Malformed(format!(
            "expected a 32-byte word, got {} bytes",
            bytes.len()
        )));
    }
    Ok(U256::from_be_slice(&bytes[..32]))
}

#[async_trait]
impl BalanceOracle for RpcBalanceOracle {
    fn target(&self) -> &TokenTarget {
        &self.target
    }

    async fn balance_of(&self, wallet: &WalletAddress) -> Result<OwnershipDetail, OracleError> {
        let body = balance_of_request(wallet.to_address(), &self.target);
        tracing::debug!(
            "eth_call balanceOf({}) on {} via {}",
            wallet.checksummed(),
            self.target.contract_checksummed(),
            self.rpc_url
        );

        let response = self
            .http
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(&self.rpc_url, self.timeout, e))?;

        if !response.status().is_success() {
            return Err(OracleError::Status(response.status().as_u16()));
        }

        let payload: RpcResponse = response
            .json()
            .await
            .map_err(|e| OracleError::Malformed(e.to_string()))?;

        if let Some(error) = payload.error {
            return Err(OracleError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        let result = payload
            .result
            .ok_or_else(|| OracleError::Malformed("response has neither result nor error".to_string()))?;

        Ok(OwnershipDetail {
            balance: decode_balance(&result)?,
            contract: self.target.contract_checksummed(),
            chain: self.target.chain.clone(),
            token_ids: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> TokenTarget {
        TokenTarget::new("0xF4820467171695F4d2760614C77503147A9CB1E8", "arbitrum", 42161).unwrap()
    }

    fn wallet() -> WalletAddress {
        WalletAddress::parse("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed").unwrap()
    }

    #[test]
    fn test_request_encodes_balance_of() {
        let body = balance_of_request(wallet().to_address(), &target());
        let call = &body["params"][0];

        assert_eq!(body["method"], "eth_call");
        assert_eq!(body["params"][1], "latest");
        assert_eq!(call["to"], "0xF4820467171695F4d2760614C77503147A9CB1E8");
        assert_eq!(
            call["data"],
            "0x70a082310000000000000000000000005aaeb6053f3e94c9b9a09f33669435e7ef1beaed"
        );
    }

    #[test]
    fn test_decode_balance() {
        let three = format!("0x{:064x}", 3);
        assert_eq!(decode_balance(&three).unwrap(), U256::from(3));
        assert_eq!(decode_balance(&format!("0x{:064x}", 0)).unwrap(), U256::ZERO);
    }

    #[test]
    fn test_decode_balance_rejects_empty_and_garbage() {
        assert!(matches!(decode_balance("0x"), Err(OracleError::Malformed(_))));
        assert!(matches!(decode_balance("0xzz"), Err(OracleError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_not_owned() {
        // Nothing listens on port 9 of the loopback interface
        let oracle = RpcBalanceOracle::new("http://127.0.0.1:9", target(), Duration::from_secs(2)).unwrap();

        assert!(oracle.balance_of(&wallet()).await.is_err());
        let result = oracle.owns_token(&wallet()).await;
        assert!(!result.owned);
        assert!(result.is_unknown());
    }
}

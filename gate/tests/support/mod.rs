//! Shared fixtures for the gate integration tests
#![allow(dead_code)]

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use common::models::{OwnershipDetail, SignedProof, WalletAddress};
use common::signature::personal_message_hash;
use dashmap::DashMap;
use gate::{BalanceOracle, HandoffError, OracleError, ProofSource, TokenTarget};
use k256::ecdsa::SigningKey;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const CONTRACT: &str = "0xF4820467171695F4d2760614C77503147A9CB1E8";
pub const SIGN_IN_MESSAGE: &str = "Sign in to the holders area\nNonce: 41d09a";

pub fn target() -> TokenTarget {
    TokenTarget::new(CONTRACT, "arbitrum", 42161).unwrap()
}

pub fn key(seed: u8) -> SigningKey {
    SigningKey::from_slice(&[seed; 32]).unwrap()
}

pub fn wallet_of(key: &SigningKey) -> WalletAddress {
    WalletAddress::from(Address::from_public_key(key.verifying_key()))
}

pub fn sign(key: &SigningKey, message: &str) -> String {
    let digest = personal_message_hash(message);
    let (signature, recovery_id) = key.sign_prehash_recoverable(digest.as_slice()).unwrap();
    let mut bytes = signature.to_bytes().to_vec();
    bytes.push(27 + recovery_id.to_byte());
    format!("0x{}", hex::encode(bytes))
}

pub fn signed_proof(key: &SigningKey) -> SignedProof {
    SignedProof::new(wallet_of(key), SIGN_IN_MESSAGE, sign(key, SIGN_IN_MESSAGE))
}

/// Flip one bit in the `r` component
pub fn tampered(proof: &SignedProof) -> SignedProof {
    let mut bytes = hex::decode(&proof.signature[2..]).unwrap();
    bytes[5] ^= 0x01;
    SignedProof::new(proof.wallet.clone(), proof.message.clone(), format!("0x{}", hex::encode(bytes)))
}

pub enum Behaviour {
    Balance(u64),
    Fail,
    Hang,
}

/// Oracle double that counts calls
pub struct StubOracle {
    target: TokenTarget,
    behaviour: Behaviour,
    calls: AtomicUsize,
}

impl StubOracle {
    pub fn new(behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            target: target(),
            behaviour,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BalanceOracle for StubOracle {
    fn target(&self) -> &TokenTarget {
        &self.target
    }

    async fn balance_of(&self, _wallet: &WalletAddress) -> Result<OwnershipDetail, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behaviour {
            Behaviour::Balance(balance) => Ok(OwnershipDetail {
                balance: U256::from(balance),
                contract: self.target.contract_checksummed(),
                chain: self.target.chain.clone(),
                token_ids: Vec::new(),
            }),
            Behaviour::Fail => Err(OracleError::Transport {
                endpoint: "https://rpc.invalid".to_string(),
                reason: "connection refused".to_string(),
            }),
            Behaviour::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Err(OracleError::Timeout(Duration::from_secs(30)))
            },
        }
    }
}

/// In-memory stand-in for the auth server
#[derive(Default)]
pub struct MemorySource {
    proofs: DashMap<WalletAddress, SignedProof>,
    fetches: AtomicUsize,
    discards: AtomicUsize,
}

impl MemorySource {
    pub fn with_proof(proof: SignedProof) -> Arc<Self> {
        let source = Self::default();
        source.proofs.insert(proof.wallet.clone(), proof);
        Arc::new(source)
    }

    pub fn empty() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn put(&self, proof: SignedProof) {
        self.proofs.insert(proof.wallet.clone(), proof);
    }

    pub fn holds(&self, wallet: &WalletAddress) -> bool {
        self.proofs.contains_key(wallet)
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn discards(&self) -> usize {
        self.discards.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProofSource for MemorySource {
    async fn fetch(&self, wallet: &WalletAddress) -> Result<Option<SignedProof>, HandoffError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.proofs.get(wallet).map(|entry| entry.value().clone()))
    }

    async fn discard(&self, wallet: &WalletAddress) -> Result<(), HandoffError> {
        self.discards.fetch_add(1, Ordering::SeqCst);
        self.proofs.remove(wallet);
        Ok(())
    }
}

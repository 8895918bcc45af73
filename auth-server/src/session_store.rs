// auth-server/src/session_store.rs
use chrono::Duration;
use common::models::{SessionRecord, SignedProof, WalletAddress};
use common::utils::{Clock, SystemClock};
use dashmap::DashMap;
use std::sync::Arc;

/// Short-lived handoff store: at most one pending proof per wallet.
///
/// Keys are normalised wallet addresses. Each operation touches a single
/// `DashMap` shard, so writers for one wallet never interleave a partial
/// record and operations on different wallets do not block each other.
/// Expired records are evicted lazily on read; there is no sweeper.
#[derive(Clone)]
pub struct SessionStore {
    records: Arc<DashMap<WalletAddress, SessionRecord>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            records: Arc::new(DashMap::new()),
            ttl,
            clock,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Live entries, including expired ones not yet read
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Store a proof, replacing any previous record for the same wallet
    pub fn put(&self, proof: SignedProof) -> SessionRecord {
        let record = SessionRecord::new(proof, self.clock.now(), self.ttl);
        let replaced = self.records.insert(record.wallet.clone(), record.clone());

        tracing::info!(
            "Stored proof for {} (expires {}, replaced previous: {})",
            record.wallet,
            record.expires_at,
            replaced.is_some()
        );
        record
    }

    /// Return the pending proof for `wallet` without consuming it.
    ///
    /// An expired record is removed and reported as absent.
    pub fn get(&self, wallet: &WalletAddress) -> Option<SessionRecord> {
        let now = self.clock.now();

        let current = self.records.get(wallet).map(|entry| entry.value().clone());
        match current {
            Some(record) if !record.is_expired_at(now) => {
                tracing::debug!("Found pending proof for {}", wallet);
                Some(record)
            },
            Some(_) => {
                // Only evict if the entry is still expired; a fresh write may have landed meanwhile
                if self.records.remove_if(wallet, |_, r| r.is_expired_at(now)).is_some() {
                    tracing::debug!("Evicted expired proof for {}", wallet);
                    None
                } else {
                    self.records
                        .get(wallet)
                        .map(|entry| entry.value().clone())
                        .filter(|r| !r.is_expired_at(now))
                }
            },
            None => {
                tracing::debug!("No pending proof for {}", wallet);
                None
            },
        }
    }

    /// Remove any record for `wallet`. Returns whether one existed.
    pub fn clear(&self, wallet: &WalletAddress) -> bool {
        let removed = self.records.remove(wallet).is_some();
        if removed {
            tracing::info!("Cleared pending proof for {}", wallet);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use std::collections::HashSet;
    use std::sync::Mutex;

    struct ManualClock(Mutex<DateTime<Utc>>);

    impl ManualClock {
        fn new() -> Arc<Self> {
            Arc::new(Self(Mutex::new(Utc::now())))
        }

        fn advance(&self, by: Duration) {
            let mut now = self.0.lock().unwrap();
            *now = *now + by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    fn wallet(n: u32) -> WalletAddress {
        WalletAddress::parse(&format!("0x{:040x}", n)).unwrap()
    }

    fn proof(n: u32, tag: &str) -> SignedProof {
        SignedProof::new(wallet(n), format!("message-{}", tag), format!("signature-{}", tag))
    }

    fn store(clock: &Arc<ManualClock>) -> SessionStore {
        SessionStore::with_clock(Duration::minutes(5), clock.clone())
    }

    #[test]
    fn test_record_readable_until_ttl() {
        let clock = ManualClock::new();
        let store = store(&clock);
        let written = store.put(proof(1, "a"));

        assert_eq!(store.get(&wallet(1)), Some(written.clone()));
        clock.advance(Duration::minutes(5));
        assert_eq!(store.get(&wallet(1)), Some(written));
    }

    #[test]
    fn test_expired_record_is_absent_and_evicted() {
        let clock = ManualClock::new();
        let store = store(&clock);
        store.put(proof(1, "a"));

        clock.advance(Duration::minutes(5) + Duration::milliseconds(1));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&wallet(1)), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_last_write_wins() {
        let clock = ManualClock::new();
        let store = store(&clock);
        store.put(proof(7, "first"));
        clock.advance(Duration::seconds(10));
        let second = store.put(proof(7, "second"));

        let found = store.get(&wallet(7)).unwrap();
        assert_eq!(found.proof, second.proof);
        assert_eq!(found.proof.message, "message-second");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_rewrite_restarts_ttl() {
        let clock = ManualClock::new();
        let store = store(&clock);
        store.put(proof(3, "old"));
        clock.advance(Duration::minutes(4));
        store.put(proof(3, "new"));
        clock.advance(Duration::minutes(4));

        assert_eq!(store.get(&wallet(3)).map(|r| r.proof.message), Some("message-new".to_string()));
    }

    #[test]
    fn test_get_does_not_consume() {
        let clock = ManualClock::new();
        let store = store(&clock);
        store.put(proof(2, "a"));

        let first = store.get(&wallet(2));
        let second = store.get(&wallet(2));
        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[test]
    fn test_clear() {
        let clock = ManualClock::new();
        let store = store(&clock);
        store.put(proof(4, "a"));

        assert!(store.clear(&wallet(4)));
        assert_eq!(store.get(&wallet(4)), None);
        // absence is not an error
        assert!(!store.clear(&wallet(4)));
    }

    #[test]
    fn test_keys_are_case_insensitive() {
        let clock = ManualClock::new();
        let store = store(&clock);
        let upper = WalletAddress::parse("0x5AAEB6053F3E94C9B9A09F33669435E7EF1BEAED").unwrap();
        let mixed = WalletAddress::parse("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed").unwrap();
        store.put(SignedProof::new(upper, "m", "s"));

        assert!(store.get(&mixed).is_some());
    }

    #[test]
    fn test_concurrent_writes_leave_one_consistent_record_per_wallet() {
        let clock = ManualClock::new();
        let store = store(&clock);

        std::thread::scope(|scope| {
            for i in 0..100u32 {
                let store = store.clone();
                scope.spawn(move || {
                    let tag = format!("w{}-{}", i % 50, i);
                    store.put(proof(i % 50, &tag));
                });
            }
        });

        assert_eq!(store.len(), 50);
        let mut seen = HashSet::new();
        for n in 0..50u32 {
            let record = store.get(&wallet(n)).unwrap();
            assert_eq!(record.wallet, wallet(n));
            assert_eq!(record.proof.wallet, wallet(n));

            let message_tag = record.proof.message.strip_prefix("message-").unwrap();
            let signature_tag = record.proof.signature.strip_prefix("signature-").unwrap();
            assert_eq!(message_tag, signature_tag, "record mixes two writes");
            assert!(message_tag == format!("w{}-{}", n, n) || message_tag == format!("w{}-{}", n, n + 50));
            seen.insert(message_tag.to_string());
        }
        assert_eq!(seen.len(), 50);
    }
}

// gate/src/relay.rs
//! Same-origin storage relay: the signing widget drops its proof into a
//! shared storage slot and a watcher forwards it to the gate.
//!
//! The storage has no clock authority, so entries carry their own timestamp
//! and are checked against the TTL here. Entries without a timestamp are
//! forwarded immediately and never kept. Every forwarded entry is removed
//! from storage first, so a reload cannot replay it.

use actix::{Actor, ActorContext, AsyncContext, Context};
use chrono::{DateTime, Duration as TtlDuration, Utc};
use common::config::HandoffConfig;
use common::models::SignedProof;
use common::utils::{Clock, SystemClock};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use crate::handoff::HandoffError;

/// Storage key the signing widget writes to
pub const DEFAULT_RELAY_KEY: &str = "nft_gate_auth";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayEntry {
    pub proof: SignedProof,
    /// When the widget stored the proof, if it recorded one
    pub stored_at: Option<DateTime<Utc>>,
}

impl RelayEntry {
    pub fn stamped(proof: SignedProof, stored_at: DateTime<Utc>) -> Self {
        Self { proof, stored_at: Some(stored_at) }
    }

    pub fn unstamped(proof: SignedProof) -> Self {
        Self { proof, stored_at: None }
    }

    fn is_stale(&self, now: DateTime<Utc>, ttl: TtlDuration) -> bool {
        self.stored_at.is_some_and(|at| now > at + ttl)
    }
}

/// Key/value area shared by the widget and the gate
#[derive(Clone, Default)]
pub struct RelayStorage {
    items: Arc<DashMap<String, RelayEntry>>,
}

impl RelayStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_item(&self, key: impl Into<String>, entry: RelayEntry) {
        self.items.insert(key.into(), entry);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.items.contains_key(key)
    }

    /// Remove and return the entry under `key`
    pub fn take_item(&self, key: &str) -> Option<RelayEntry> {
        self.items.remove(key).map(|(_, entry)| entry)
    }
}

/// Watches one storage key and relays the first usable proof
pub struct RelayWatcher {
    storage: RelayStorage,
    key: String,
    interval: Duration,
    ceiling: Duration,
    ttl: TtlDuration,
    clock: Arc<dyn Clock>,
    started: Instant,
    sink: mpsc::Sender<SignedProof>,
}

impl RelayWatcher {
    pub fn new(
        storage: RelayStorage,
        key: impl Into<String>,
        interval: Duration,
        ceiling: Duration,
        ttl: TtlDuration,
        sink: mpsc::Sender<SignedProof>,
    ) -> Self {
        Self {
            storage,
            key: key.into(),
            interval,
            ceiling,
            ttl,
            clock: Arc::new(SystemClock),
            started: Instant::now(),
            sink,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn scan(&mut self, ctx: &mut Context<Self>) {
        if self.sink.is_closed() {
            tracing::debug!("Relay consumer for {} went away", self.key);
            ctx.stop();
            return;
        }

        if self.started.elapsed() >= self.ceiling {
            tracing::warn!("No proof relayed under {} within {:?}", self.key, self.ceiling);
            ctx.stop();
            return;
        }

        let Some(entry) = self.storage.take_item(&self.key) else {
            return;
        };

        if entry.is_stale(self.clock.now(), self.ttl) {
            tracing::debug!("Discarded stale relayed proof for {}", entry.proof.wallet);
            return;
        }

        let wallet = entry.proof.wallet.clone();
        match self.sink.try_send(entry.proof) {
            Ok(()) => tracing::info!("Relayed proof for {} to the gate", wallet),
            Err(e) => tracing::warn!("Could not relay proof for {}: {}", wallet, e),
        }
        ctx.stop();
    }
}

impl Actor for RelayWatcher {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::debug!("Relay watcher started for {} (every {:?})", self.key, self.interval);
        self.started = Instant::now();

        ctx.run_interval(self.interval, |act, ctx| act.scan(ctx));
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::debug!("Relay watcher stopped for {}", self.key);
    }
}

/// Start a watcher on the current actix system and return the receiving end
pub fn watch_relay(
    storage: RelayStorage,
    key: &str,
    handoff: &HandoffConfig,
    ttl: TtlDuration,
) -> mpsc::Receiver<SignedProof> {
    let (tx, rx) = mpsc::channel(1);
    RelayWatcher::new(
        storage,
        key,
        handoff.relay_poll_interval(),
        handoff.poll_ceiling(),
        ttl,
        tx,
    )
    .start();
    rx
}

/// Wait for the watcher to deliver a proof, at most `ceiling`
pub async fn await_relayed_proof(
    rx: &mut mpsc::Receiver<SignedProof>,
    ceiling: Duration,
) -> Result<SignedProof, HandoffError> {
    match tokio::time::timeout(ceiling, rx.recv()).await {
        Ok(Some(proof)) => Ok(proof),
        // Watcher gave up or the wait ran out
        Ok(None) | Err(_) => Err(HandoffError::NotFound),
    }
}

// gate/src/lib.rs
//! Consumer side of the token gate: receives a wallet proof from the
//! signing popup (through the auth server or the same-origin relay),
//! verifies it and checks on-chain token ownership.

pub mod controller;
pub mod handoff;
pub mod oracle;
pub mod proof;
pub mod relay;

pub use controller::{AuthenticatedState, DenialReason, GateController, GateState};
pub use handoff::{poll_for_proof, AuthServerClient, HandoffError, ProofSource};
pub use oracle::{BalanceOracle, OracleError, TokenTarget};
pub use proof::{ProofMethod, ProviderTokenVerifier};
pub use relay::{await_relayed_proof, watch_relay, RelayEntry, RelayStorage, DEFAULT_RELAY_KEY};

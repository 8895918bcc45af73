pub mod ownership;
pub mod session;
pub mod wallet;

pub use ownership::{OwnershipDetail, OwnershipResult};
pub use session::{SessionRecord, SignedProof, DEFAULT_SESSION_TTL_SECS};
pub use wallet::{AddressError, WalletAddress, ADDRESS_TEXT_LEN};

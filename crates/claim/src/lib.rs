//! Claim coordination for locked gift packs.
//!
//! A recipient presents either the secret gift code or the numeric on-chain
//! pack id. The coordinator resolves the pack, builds the claim call, and
//! either hands it to a relay for gasless submission or returns it unsigned
//! for the recipient's own wallet.

mod coordinator;
mod error;
mod relay;

pub use coordinator::{ClaimCoordinator, ClaimOutcome, PackLookup};
pub use error::ClaimError;
pub use relay::{HttpRelay, MockRelay, RelayClient, RelayError};

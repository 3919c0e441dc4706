//! Pool ledger boundary for the Afyapool disbursement engine.
//!
//! The pool itself — its member roster and available balance — is owned by
//! the external membership/contribution service. This crate defines the seam
//! the engine consumes it through ([`PoolLedger`]) and an in-memory
//! implementation used by tests, local demos, and embedding.
//!
//! The one invariant that matters here: `available_minor` never goes
//! negative, because the only way down is [`PoolLedger::try_debit`], an
//! atomic conditional decrement.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::LedgerError;
pub use memory::InMemoryPoolLedger;
pub use traits::{PoolLedger, PoolSnapshot};

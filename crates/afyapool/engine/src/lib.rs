//! The Afyapool disbursement engine.
//!
//! Members of a community health fund request payouts from the shared pool;
//! the other members vote; this engine resolves the vote. One facade,
//! [`DisbursementEngine`], owns the whole lifecycle:
//!
//! - `create_request` validates against the pool ledger and persists a
//!   request open for votes;
//! - `cast_vote` runs the precondition chain, appends the vote, and hands
//!   control to the quorum evaluator inside the same critical section;
//! - `resolve` turns a decisive tally into `Approved` (debiting the pool
//!   atomically, exactly once) or `Rejected`;
//! - `cancel_request` and the payout transitions cover the rest of the
//!   state machine.
//!
//! Everything touching one request is serialized on a per-request async
//! mutex, so concurrent votes, sweeps, and cancellations interleave safely.

pub mod config;
pub mod engine;
pub mod error;
pub mod quorum;
pub mod store;

pub use config::EngineConfig;
pub use engine::{DisbursementEngine, SweepStats, VoteOutcome};
pub use error::EngineError;
pub use quorum::{evaluate, quorum, Decision};
pub use store::{InMemoryRequestStore, RequestStore};

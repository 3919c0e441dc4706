//! Core types for the Afyapool disbursement engine.
//!
//! A *pool* is a shared community health fund. Members request payouts
//! ([`DisbursementRequest`]), other members vote ([`Vote`]), and the engine
//! resolves the vote into a terminal [`RequestStatus`]. This crate holds the
//! records and the status state machine; it carries no behavior beyond
//! structural queries, so every other crate can depend on it.
//!
//! All monetary amounts are integer **minor units** (e.g. cents) — never
//! floating point.

pub mod ids;
pub mod request;

pub use ids::{MemberId, PoolId, RequestId};
pub use request::{DisbursementRequest, RequestStatus, Vote, VoteOption};

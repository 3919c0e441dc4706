//! The ledger seam between the disbursement engine and the external
//! membership/contribution service.

use afyapool_types::{MemberId, PoolId};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Point-in-time projection of a pool's ledger state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub id: PoolId,
    /// The pool admin (may cancel any pending request).
    pub admin: MemberId,
    /// Current roster size. Re-read at every quorum evaluation — never
    /// captured at request-creation time.
    pub member_count: u32,
    /// Spendable balance in minor units. Never negative.
    pub available_minor: i64,
}

/// Read/write boundary over pool balances and membership.
///
/// `try_debit` and `credit` are the *only* mutation primitives for the
/// balance, and both are atomic conditional updates: an implementation must
/// never expose a read-modify-write window, or two concurrently approved
/// requests could overdraw the pool.
pub trait PoolLedger: Send + Sync {
    fn pool(&self, id: &PoolId) -> Result<PoolSnapshot, LedgerError>;

    /// Current roster size for quorum computation.
    fn member_count(&self, id: &PoolId) -> Result<u32, LedgerError>;

    fn is_member(&self, id: &PoolId, member: &MemberId) -> Result<bool, LedgerError>;

    fn admin(&self, id: &PoolId) -> Result<MemberId, LedgerError>;

    /// Atomically decrement the pool balance by `amount_minor` and return the
    /// new balance, or fail with [`LedgerError::InsufficientFunds`] leaving
    /// the balance untouched.
    fn try_debit(&self, id: &PoolId, amount_minor: i64) -> Result<i64, LedgerError>;

    /// Atomically increment the pool balance (the contribution path) and
    /// return the new balance.
    fn credit(&self, id: &PoolId, amount_minor: i64) -> Result<i64, LedgerError>;
}

//! Ledger error types.

use afyapool_types::{MemberId, PoolId};
use thiserror::Error;

/// Errors returned by pool ledger operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The pool is not known to the ledger.
    #[error("pool not found: {0}")]
    PoolNotFound(PoolId),

    /// A conditional debit was refused because the balance is too low.
    /// The pool state is unchanged.
    #[error("insufficient funds in {pool}: required {required}, available {available}")]
    InsufficientFunds {
        pool: PoolId,
        required: i64,
        available: i64,
    },

    /// A credit or debit was attempted with a non-positive amount.
    #[error("non-positive ledger amount: {0}")]
    NonPositiveAmount(i64),

    /// The member is already on the pool roster.
    #[error("member {member} already belongs to {pool}")]
    AlreadyMember { pool: PoolId, member: MemberId },

    /// The member is not on the pool roster.
    #[error("member {member} does not belong to {pool}")]
    NotAMember { pool: PoolId, member: MemberId },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_funds_display() {
        let pool = PoolId::generate();
        let err = LedgerError::InsufficientFunds {
            pool: pool.clone(),
            required: 50_000,
            available: 20_000,
        };
        let msg = err.to_string();
        assert!(msg.contains(&pool.to_string()));
        assert!(msg.contains("required 50000"));
        assert!(msg.contains("available 20000"));
    }

    #[test]
    fn pool_not_found_display() {
        let pool = PoolId::generate();
        let err = LedgerError::PoolNotFound(pool.clone());
        assert_eq!(err.to_string(), format!("pool not found: {pool}"));
    }
}

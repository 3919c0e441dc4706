//! Engine error types.
//!
//! Every failure a caller can see is a typed variant here; nothing is
//! silently swallowed. A funding shortfall discovered at resolution time is
//! deliberately *not* in this enum — it resolves the request to `Rejected`
//! so voters get a definitive outcome rather than an exception.

use afyapool_ledger::LedgerError;
use afyapool_types::{MemberId, PoolId, RequestId, RequestStatus};
use thiserror::Error;

/// Errors returned by the disbursement engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// No request with this id.
    #[error("disbursement request not found: {0}")]
    RequestNotFound(RequestId),

    /// The ledger does not know this pool.
    #[error("pool not found: {0}")]
    PoolNotFound(PoolId),

    /// Requested amount must be strictly positive.
    #[error("invalid disbursement amount: {0}")]
    InvalidAmount(i64),

    /// Purpose is blank or exceeds the configured length.
    #[error("invalid purpose: {0}")]
    InvalidPurpose(String),

    /// The pool balance cannot cover the amount at creation time.
    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: i64, available: i64 },

    /// The acting member is not on the pool roster.
    #[error("{member} is not a member of {pool}")]
    NotAMember { pool: PoolId, member: MemberId },

    /// The payout recipient may not vote on their own request.
    #[error("recipient may not vote on their own request")]
    SelfVoteForbidden,

    /// The member already voted on this request.
    #[error("{0} already voted on this request")]
    DuplicateVote(MemberId),

    /// The request already left `PendingVote`.
    #[error("voting is closed: request is {0:?}")]
    VotingClosed(RequestStatus),

    /// The voting deadline has passed; a resolution pass has already run.
    #[error("voting deadline has passed")]
    VotingExpired,

    /// Only the requester or the pool admin may cancel.
    #[error("{0} may not cancel this request")]
    CancelForbidden(MemberId),

    /// The state machine forbids this transition.
    #[error("illegal status transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: RequestStatus,
        to: RequestStatus,
    },

    /// A write raced outside the per-request serialization discipline.
    /// Transient: retry the read-evaluate-write cycle.
    #[error("request version conflict: expected {expected}, found {actual}")]
    VersionConflict { expected: u64, actual: u64 },
}

impl From<LedgerError> for EngineError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::PoolNotFound(pool) => Self::PoolNotFound(pool),
            LedgerError::InsufficientFunds {
                required, available, ..
            } => Self::InsufficientFunds {
                required,
                available,
            },
            LedgerError::NonPositiveAmount(amount) => Self::InvalidAmount(amount),
            LedgerError::AlreadyMember { pool, member }
            | LedgerError::NotAMember { pool, member } => Self::NotAMember { pool, member },
        }
    }
}

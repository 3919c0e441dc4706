//! Disbursement request and vote records, and the request status state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{MemberId, PoolId, RequestId};

/// Direction of a member's vote on a disbursement request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteOption {
    For,
    Against,
}

/// A single member's vote on a disbursement request.
///
/// At most one vote per `(request, member)`; the payout recipient may never
/// vote on their own request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    /// The member who cast the vote.
    pub member_id: MemberId,
    /// For or against the payout.
    pub option: VoteOption,
    /// When the vote was committed.
    pub voted_at: DateTime<Utc>,
    /// Optional free-text rationale shown to other members.
    pub comment: Option<String>,
}

/// Lifecycle status of a disbursement request.
///
/// ```text
/// PendingVote -> Approved -> ProcessingPayout -> Disbursed
///                                           \-> FailedPayout
/// PendingVote -> Rejected
/// PendingVote -> Cancelled
/// ```
///
/// `PendingVote` is initial; `Rejected`, `Disbursed`, `FailedPayout`, and
/// `Cancelled` are terminal. No transition is reversible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    /// Open for member votes.
    PendingVote,
    /// Quorum reached and the pool was debited; awaiting payout execution.
    Approved,
    /// Voting resolved against the payout, or funds were gone at resolution.
    Rejected,
    /// The external payout path has picked the request up.
    ProcessingPayout,
    /// Payout confirmed by the external path.
    Disbursed,
    /// Payout failed in the external path.
    FailedPayout,
    /// Withdrawn by the requester or a pool admin before resolution.
    Cancelled,
}

impl RequestStatus {
    /// Returns `true` if no further transition may leave this status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Rejected | Self::Disbursed | Self::FailedPayout | Self::Cancelled
        )
    }

    /// Returns `true` while the request is still open for votes.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::PendingVote)
    }

    /// Whether the state machine permits moving from `self` to `next`.
    pub fn can_transition_to(self, next: RequestStatus) -> bool {
        matches!(
            (self, next),
            (Self::PendingVote, Self::Approved)
                | (Self::PendingVote, Self::Rejected)
                | (Self::PendingVote, Self::Cancelled)
                | (Self::Approved, Self::ProcessingPayout)
                | (Self::ProcessingPayout, Self::Disbursed)
                | (Self::ProcessingPayout, Self::FailedPayout)
        )
    }
}

/// A member's request to pay out `amount_minor` from the pool.
///
/// The request is an audit record: it is never destroyed, and once
/// `resolved_at` is set the tally and voter list are frozen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisbursementRequest {
    pub id: RequestId,
    /// The pool whose balance the payout would debit.
    pub pool_id: PoolId,
    /// The member the payout is for. May not vote on this request.
    pub recipient: MemberId,
    /// The member who filed the request (often, but not always, the recipient).
    pub requested_by: MemberId,
    /// Payout amount in minor units. Always `> 0`.
    pub amount_minor: i64,
    /// What the payout is for.
    pub purpose: String,
    /// Optional link to supporting evidence (invoice, receipt).
    pub proof_url: Option<String>,
    pub status: RequestStatus,
    pub requested_at: DateTime<Utc>,
    /// Votes arriving after this instant no longer count.
    pub voting_deadline: DateTime<Utc>,
    /// Set exactly once, when the request leaves `PendingVote`.
    pub resolved_at: Option<DateTime<Utc>>,
    /// Why the request resolved the way it did, where not obvious from status.
    pub resolution_reason: Option<String>,
    pub votes_for: u32,
    pub votes_against: u32,
    /// Committed votes in commit order. `votes_for + votes_against == votes.len()`.
    pub votes: Vec<Vote>,
    /// Bumped on every mutation; stale writes are rejected by the store.
    pub version: u64,
}

impl DisbursementRequest {
    /// Create a fresh request in `PendingVote` with an empty tally.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool_id: PoolId,
        requested_by: MemberId,
        recipient: MemberId,
        amount_minor: i64,
        purpose: String,
        proof_url: Option<String>,
        requested_at: DateTime<Utc>,
        voting_deadline: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RequestId::generate(),
            pool_id,
            recipient,
            requested_by,
            amount_minor,
            purpose,
            proof_url,
            status: RequestStatus::PendingVote,
            requested_at,
            voting_deadline,
            resolved_at: None,
            resolution_reason: None,
            votes_for: 0,
            votes_against: 0,
            votes: Vec::new(),
            version: 0,
        }
    }

    /// Returns `true` if `member` has already voted on this request.
    pub fn has_voted(&self, member: &MemberId) -> bool {
        self.votes.iter().any(|v| &v.member_id == member)
    }

    /// The committed vote of `member`, if any.
    pub fn vote_of(&self, member: &MemberId) -> Option<&Vote> {
        self.votes.iter().find(|v| &v.member_id == member)
    }

    /// Tally/voter-list agreement. Holds for every committed state.
    pub fn tally_consistent(&self) -> bool {
        (self.votes_for + self.votes_against) as usize == self.votes.len()
    }
}

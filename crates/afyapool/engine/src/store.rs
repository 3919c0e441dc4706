//! Durable record of disbursement requests.
//!
//! The store enforces the structural invariants itself — pending-only vote
//! appends, no duplicate voters, legal status transitions, version agreement
//! — so a caller that bypasses the engine's serialization gets a typed error
//! back, never a corrupted record. The engine holds the store privately;
//! external callers only ever see cloned projections.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

use afyapool_types::{DisbursementRequest, PoolId, RequestId, RequestStatus, Vote, VoteOption};

use crate::error::EngineError;

/// Read/write boundary for disbursement request records.
///
/// `append_vote`, `finalize`, and `set_status` are compare-and-swap writes:
/// they fail with [`EngineError::VersionConflict`] unless `expected_version`
/// matches the committed record.
#[async_trait]
pub trait RequestStore: Send + Sync {
    async fn insert(&self, request: DisbursementRequest) -> Result<(), EngineError>;

    async fn get(&self, id: &RequestId) -> Result<DisbursementRequest, EngineError>;

    /// Requests of one pool, oldest first, optionally filtered by status.
    async fn list_by_pool(
        &self,
        pool: &PoolId,
        status: Option<RequestStatus>,
    ) -> Result<Vec<DisbursementRequest>, EngineError>;

    /// Ids of requests still `PendingVote` whose deadline lies before `now`.
    async fn expired_pending(&self, now: DateTime<Utc>) -> Result<Vec<RequestId>, EngineError>;

    /// Append a vote and bump the tally in one committed write.
    async fn append_vote(
        &self,
        id: &RequestId,
        expected_version: u64,
        vote: Vote,
    ) -> Result<DisbursementRequest, EngineError>;

    /// Move a pending request to `Approved`, `Rejected`, or `Cancelled`,
    /// freezing the tally and stamping `resolved_at`.
    async fn finalize(
        &self,
        id: &RequestId,
        expected_version: u64,
        status: RequestStatus,
        resolved_at: DateTime<Utc>,
        reason: Option<String>,
    ) -> Result<DisbursementRequest, EngineError>;

    /// Apply a post-approval payout transition. Does not touch `resolved_at`.
    async fn set_status(
        &self,
        id: &RequestId,
        expected_version: u64,
        status: RequestStatus,
    ) -> Result<DisbursementRequest, EngineError>;
}

/// In-memory [`RequestStore`] used for tests, local demos, and embedding.
pub struct InMemoryRequestStore {
    inner: RwLock<StoreState>,
}

#[derive(Default)]
struct StoreState {
    requests: HashMap<RequestId, DisbursementRequest>,
    by_pool: HashMap<PoolId, Vec<RequestId>>,
}

impl InMemoryRequestStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreState::default()),
        }
    }
}

impl Default for InMemoryRequestStore {
    fn default() -> Self {
        Self::new()
    }
}

fn check_version(request: &DisbursementRequest, expected: u64) -> Result<(), EngineError> {
    if request.version != expected {
        return Err(EngineError::VersionConflict {
            expected,
            actual: request.version,
        });
    }
    Ok(())
}

#[async_trait]
impl RequestStore for InMemoryRequestStore {
    async fn insert(&self, request: DisbursementRequest) -> Result<(), EngineError> {
        let mut state = self.inner.write().unwrap();
        state
            .by_pool
            .entry(request.pool_id.clone())
            .or_default()
            .push(request.id.clone());
        state.requests.insert(request.id.clone(), request);
        Ok(())
    }

    async fn get(&self, id: &RequestId) -> Result<DisbursementRequest, EngineError> {
        let state = self.inner.read().unwrap();
        state
            .requests
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::RequestNotFound(id.clone()))
    }

    async fn list_by_pool(
        &self,
        pool: &PoolId,
        status: Option<RequestStatus>,
    ) -> Result<Vec<DisbursementRequest>, EngineError> {
        let state = self.inner.read().unwrap();
        let mut requests: Vec<DisbursementRequest> = state
            .by_pool
            .get(pool)
            .into_iter()
            .flatten()
            .filter_map(|id| state.requests.get(id))
            .filter(|r| status.map_or(true, |s| r.status == s))
            .cloned()
            .collect();
        requests.sort_by_key(|r| r.requested_at);
        Ok(requests)
    }

    async fn expired_pending(&self, now: DateTime<Utc>) -> Result<Vec<RequestId>, EngineError> {
        let state = self.inner.read().unwrap();
        Ok(state
            .requests
            .values()
            .filter(|r| r.status == RequestStatus::PendingVote && r.voting_deadline < now)
            .map(|r| r.id.clone())
            .collect())
    }

    async fn append_vote(
        &self,
        id: &RequestId,
        expected_version: u64,
        vote: Vote,
    ) -> Result<DisbursementRequest, EngineError> {
        let mut state = self.inner.write().unwrap();
        let request = state
            .requests
            .get_mut(id)
            .ok_or_else(|| EngineError::RequestNotFound(id.clone()))?;

        if request.status != RequestStatus::PendingVote {
            return Err(EngineError::VotingClosed(request.status));
        }
        check_version(request, expected_version)?;
        if request.has_voted(&vote.member_id) {
            return Err(EngineError::DuplicateVote(vote.member_id));
        }

        match vote.option {
            VoteOption::For => request.votes_for += 1,
            VoteOption::Against => request.votes_against += 1,
        }
        request.votes.push(vote);
        request.version += 1;
        debug_assert!(request.tally_consistent());

        Ok(request.clone())
    }

    async fn finalize(
        &self,
        id: &RequestId,
        expected_version: u64,
        status: RequestStatus,
        resolved_at: DateTime<Utc>,
        reason: Option<String>,
    ) -> Result<DisbursementRequest, EngineError> {
        let mut state = self.inner.write().unwrap();
        let request = state
            .requests
            .get_mut(id)
            .ok_or_else(|| EngineError::RequestNotFound(id.clone()))?;

        check_version(request, expected_version)?;
        if !request.status.can_transition_to(status) {
            return Err(EngineError::InvalidTransition {
                from: request.status,
                to: status,
            });
        }

        request.status = status;
        request.resolved_at = Some(resolved_at);
        request.resolution_reason = reason;
        request.version += 1;

        Ok(request.clone())
    }

    async fn set_status(
        &self,
        id: &RequestId,
        expected_version: u64,
        status: RequestStatus,
    ) -> Result<DisbursementRequest, EngineError> {
        let mut state = self.inner.write().unwrap();
        let request = state
            .requests
            .get_mut(id)
            .ok_or_else(|| EngineError::RequestNotFound(id.clone()))?;

        check_version(request, expected_version)?;
        if !request.status.can_transition_to(status) {
            return Err(EngineError::InvalidTransition {
                from: request.status,
                to: status,
            });
        }

        request.status = status;
        request.version += 1;

        Ok(request.clone())
    }
}

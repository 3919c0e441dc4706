//! The disbursement engine facade: request creation, vote recording, and
//! resolution around the pool ledger.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use afyapool_ledger::{LedgerError, PoolLedger};
use afyapool_types::{
    DisbursementRequest, MemberId, PoolId, RequestId, RequestStatus, Vote, VoteOption,
};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::quorum::{evaluate, Decision};
use crate::store::{InMemoryRequestStore, RequestStore};

/// Tally projection returned to the caller after a successful vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteOutcome {
    pub status: RequestStatus,
    pub votes_for: u32,
    pub votes_against: u32,
}

/// Result of one pass over expired pending requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepStats {
    /// Requests whose deadline had passed.
    pub swept: usize,
    /// Of those, how many reached a terminal status during this pass.
    pub resolved: usize,
    /// Resolution attempts that errored (logged and skipped).
    pub failed: usize,
}

/// Orchestrates the vote recorder, quorum evaluator, and pool ledger debit.
///
/// This is the only component that moves a request out of `PendingVote`.
/// All operations on one request are serialized on a per-request async
/// mutex; the ledger debit is an atomic conditional decrement, so approval
/// can never overdraw the pool even across concurrent requests.
pub struct DisbursementEngine {
    config: EngineConfig,
    ledger: Arc<dyn PoolLedger>,
    store: Arc<dyn RequestStore>,
    locks: DashMap<RequestId, Arc<Mutex<()>>>,
}

impl DisbursementEngine {
    /// Create an engine over the given ledger with an in-memory request store.
    pub fn new(config: EngineConfig, ledger: Arc<dyn PoolLedger>) -> Self {
        Self::with_store(config, ledger, Arc::new(InMemoryRequestStore::new()))
    }

    /// Create an engine over the given ledger and request store.
    pub fn with_store(
        config: EngineConfig,
        ledger: Arc<dyn PoolLedger>,
        store: Arc<dyn RequestStore>,
    ) -> Self {
        Self {
            config,
            ledger,
            store,
            locks: DashMap::new(),
        }
    }

    fn request_lock(&self, id: &RequestId) -> Arc<Mutex<()>> {
        self.locks
            .entry(id.clone())
            .or_insert_with(Default::default)
            .value()
            .clone()
    }

    fn voting_deadline_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::milliseconds(self.config.voting_period.as_millis() as i64)
    }

    /// File a new disbursement request against a pool.
    ///
    /// Validates, in order: the amount is positive, the purpose fits, the
    /// pool exists, requester and recipient are current members, and the
    /// pool balance covers the amount *at creation time* (it is re-checked
    /// at resolution — see [`DisbursementEngine::resolve`]).
    pub async fn create_request(
        &self,
        pool_id: PoolId,
        requested_by: MemberId,
        recipient: MemberId,
        amount_minor: i64,
        purpose: impl Into<String>,
        proof_url: Option<String>,
    ) -> Result<DisbursementRequest, EngineError> {
        if amount_minor <= 0 {
            return Err(EngineError::InvalidAmount(amount_minor));
        }

        let purpose = purpose.into();
        if purpose.trim().is_empty() {
            return Err(EngineError::InvalidPurpose("purpose is blank".into()));
        }
        if purpose.chars().count() > self.config.max_purpose_len {
            return Err(EngineError::InvalidPurpose(format!(
                "purpose exceeds {} characters",
                self.config.max_purpose_len
            )));
        }

        let pool = self.ledger.pool(&pool_id)?;
        for member in [&requested_by, &recipient] {
            if !self.ledger.is_member(&pool_id, member)? {
                return Err(EngineError::NotAMember {
                    pool: pool_id,
                    member: member.clone(),
                });
            }
        }
        if amount_minor > pool.available_minor {
            return Err(EngineError::InsufficientFunds {
                required: amount_minor,
                available: pool.available_minor,
            });
        }

        let now = Utc::now();
        let request = DisbursementRequest::new(
            pool_id,
            requested_by,
            recipient,
            amount_minor,
            purpose,
            proof_url,
            now,
            self.voting_deadline_from(now),
        );
        self.store.insert(request.clone()).await?;

        info!(
            request_id = %request.id,
            pool_id = %request.pool_id,
            amount_minor,
            deadline = %request.voting_deadline,
            "Disbursement request created"
        );
        Ok(request)
    }

    /// Record one member's vote and evaluate the tally.
    ///
    /// Preconditions are checked in a fixed order, each with its own error:
    /// request exists, voting still open, deadline not passed, caller is a
    /// member, caller is not the recipient, caller has not voted before. A
    /// lapsed deadline triggers a resolution pass before the error returns,
    /// so the request does not linger pending until the next sweep.
    pub async fn cast_vote(
        &self,
        request_id: &RequestId,
        member_id: MemberId,
        option: VoteOption,
        comment: Option<String>,
    ) -> Result<VoteOutcome, EngineError> {
        let lock = self.request_lock(request_id);
        let _guard = lock.lock().await;

        let request = self.store.get(request_id).await?;
        if request.status != RequestStatus::PendingVote {
            return Err(EngineError::VotingClosed(request.status));
        }

        let now = Utc::now();
        if now > request.voting_deadline {
            self.resolve_locked(request_id, now).await?;
            return Err(EngineError::VotingExpired);
        }

        if !self.ledger.is_member(&request.pool_id, &member_id)? {
            return Err(EngineError::NotAMember {
                pool: request.pool_id,
                member: member_id,
            });
        }
        if member_id == request.recipient {
            return Err(EngineError::SelfVoteForbidden);
        }
        if request.has_voted(&member_id) {
            return Err(EngineError::DuplicateVote(member_id));
        }

        let vote = Vote {
            member_id: member_id.clone(),
            option,
            voted_at: now,
            comment,
        };
        let updated = self
            .store
            .append_vote(request_id, request.version, vote)
            .await?;
        debug!(
            request_id = %request_id,
            member_id = %member_id,
            ?option,
            votes_for = updated.votes_for,
            votes_against = updated.votes_against,
            "Vote recorded"
        );

        let resolved = self.resolve_locked(request_id, now).await?;
        Ok(VoteOutcome {
            status: resolved.status,
            votes_for: resolved.votes_for,
            votes_against: resolved.votes_against,
        })
    }

    /// Resolve a request if its tally is decisive.
    ///
    /// Idempotent: a request that already left `PendingVote` is returned
    /// unchanged with no side effects — in particular, no second debit.
    pub async fn resolve(&self, request_id: &RequestId) -> Result<DisbursementRequest, EngineError> {
        let lock = self.request_lock(request_id);
        let _guard = lock.lock().await;
        self.resolve_locked(request_id, Utc::now()).await
    }

    /// Core of the resolver. Caller must hold the request's lock.
    async fn resolve_locked(
        &self,
        request_id: &RequestId,
        now: DateTime<Utc>,
    ) -> Result<DisbursementRequest, EngineError> {
        let request = self.store.get(request_id).await?;
        if request.status != RequestStatus::PendingVote {
            return Ok(request);
        }

        let total_members = self.ledger.member_count(&request.pool_id)?;
        let decision = evaluate(
            request.votes_for,
            request.votes_against,
            total_members,
            request.voting_deadline,
            now,
        );

        match decision {
            Decision::Unresolved => Ok(request),
            Decision::Approve => {
                // Funds may have shrunk since creation; the conditional debit
                // is the re-validation. A refusal resolves to Rejected, not
                // an error.
                match self.ledger.try_debit(&request.pool_id, request.amount_minor) {
                    Ok(balance) => {
                        let approved = self
                            .store
                            .finalize(request_id, request.version, RequestStatus::Approved, now, None)
                            .await?;
                        info!(
                            request_id = %request_id,
                            pool_id = %request.pool_id,
                            amount_minor = request.amount_minor,
                            balance,
                            "Disbursement approved and pool debited"
                        );
                        Ok(approved)
                    }
                    Err(LedgerError::InsufficientFunds {
                        required,
                        available,
                        ..
                    }) => {
                        warn!(
                            request_id = %request_id,
                            pool_id = %request.pool_id,
                            required,
                            available,
                            "Quorum reached but pool funds gone; rejecting"
                        );
                        let rejected = self
                            .store
                            .finalize(
                                request_id,
                                request.version,
                                RequestStatus::Rejected,
                                now,
                                Some(format!(
                                    "insufficient pool funds at resolution: required {required}, available {available}"
                                )),
                            )
                            .await?;
                        Ok(rejected)
                    }
                    Err(err) => Err(err.into()),
                }
            }
            Decision::Reject => {
                let reason = if now > request.voting_deadline {
                    "voting deadline expired without quorum"
                } else {
                    "quorum no longer reachable"
                };
                let rejected = self
                    .store
                    .finalize(
                        request_id,
                        request.version,
                        RequestStatus::Rejected,
                        now,
                        Some(reason.into()),
                    )
                    .await?;
                info!(request_id = %request_id, reason, "Disbursement rejected");
                Ok(rejected)
            }
        }
    }

    /// Withdraw a pending request. Allowed to the requester and the pool
    /// admin; competes with concurrent votes under the same serialization.
    pub async fn cancel_request(
        &self,
        request_id: &RequestId,
        cancelled_by: &MemberId,
    ) -> Result<DisbursementRequest, EngineError> {
        let lock = self.request_lock(request_id);
        let _guard = lock.lock().await;

        let request = self.store.get(request_id).await?;
        if request.status != RequestStatus::PendingVote {
            return Err(EngineError::VotingClosed(request.status));
        }

        let admin = self.ledger.admin(&request.pool_id)?;
        if *cancelled_by != request.requested_by && *cancelled_by != admin {
            return Err(EngineError::CancelForbidden(cancelled_by.clone()));
        }

        let cancelled = self
            .store
            .finalize(
                request_id,
                request.version,
                RequestStatus::Cancelled,
                Utc::now(),
                Some(format!("cancelled by {cancelled_by}")),
            )
            .await?;
        info!(request_id = %request_id, cancelled_by = %cancelled_by, "Disbursement request cancelled");
        Ok(cancelled)
    }

    /// The external payout path has picked up an approved request.
    pub async fn begin_payout(
        &self,
        request_id: &RequestId,
    ) -> Result<DisbursementRequest, EngineError> {
        let lock = self.request_lock(request_id);
        let _guard = lock.lock().await;

        let request = self.store.get(request_id).await?;
        self.store
            .set_status(request_id, request.version, RequestStatus::ProcessingPayout)
            .await
    }

    /// Terminal report from the external payout path. No ledger effect:
    /// the debit happened at approval, and reconciling a failed payout
    /// belongs to the ledger owner.
    pub async fn record_payout_result(
        &self,
        request_id: &RequestId,
        success: bool,
    ) -> Result<DisbursementRequest, EngineError> {
        let lock = self.request_lock(request_id);
        let _guard = lock.lock().await;

        let request = self.store.get(request_id).await?;
        let status = if success {
            RequestStatus::Disbursed
        } else {
            RequestStatus::FailedPayout
        };
        let updated = self
            .store
            .set_status(request_id, request.version, status)
            .await?;
        info!(request_id = %request_id, status = ?updated.status, "Payout result recorded");
        Ok(updated)
    }

    /// Read-only projection of one request. Safe at any status.
    pub async fn get_request(
        &self,
        request_id: &RequestId,
    ) -> Result<DisbursementRequest, EngineError> {
        self.store.get(request_id).await
    }

    /// Read-only listing of a pool's requests, oldest first.
    pub async fn list_requests(
        &self,
        pool_id: &PoolId,
        status: Option<RequestStatus>,
    ) -> Result<Vec<DisbursementRequest>, EngineError> {
        self.store.list_by_pool(pool_id, status).await
    }

    /// Resolve every pending request whose deadline lies before `now`.
    ///
    /// Per-request failures are logged and skipped; one broken request must
    /// not halt the sweep. Safe to run concurrently with vote-triggered
    /// resolution — `resolve` is idempotent.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<SweepStats, EngineError> {
        let due = self.store.expired_pending(now).await?;
        let mut stats = SweepStats {
            swept: due.len(),
            ..SweepStats::default()
        };

        for request_id in due {
            match self.resolve(&request_id).await {
                Ok(request) if request.status != RequestStatus::PendingVote => {
                    stats.resolved += 1;
                }
                Ok(_) => {}
                Err(err) => {
                    stats.failed += 1;
                    warn!(request_id = %request_id, error = %err, "Sweep failed to resolve request");
                }
            }
        }

        Ok(stats)
    }
}

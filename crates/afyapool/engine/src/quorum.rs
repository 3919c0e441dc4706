//! Quorum evaluation: a pure decision function over committed vote state.
//!
//! The evaluator never reads a clock or the store; callers pass the
//! committed tally, the *current* roster size, and both instants in. That
//! makes the decision a deterministic function of committed state, so the
//! vote path and the deadline sweeper converge to the same outcome no
//! matter which of them runs first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of evaluating a request's tally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    /// Not decidable yet: keep collecting votes.
    Unresolved,
    /// Quorum of FOR votes reached.
    Approve,
    /// Deadline expired short of quorum, or quorum is mathematically
    /// unreachable.
    Reject,
}

/// Votes needed to approve: more than half the current roster.
pub fn quorum(total_members: u32) -> u32 {
    total_members / 2 + 1
}

/// Evaluate a request's committed tally against the current roster.
///
/// Rules, in order:
/// 1. `Approve` iff `votes_for >= quorum(total_members)`.
/// 2. Past the deadline, anything short of quorum is `Reject`.
/// 3. Before the deadline, `Reject` early once the undecided members could
///    no longer supply enough FOR votes even if all of them voted FOR.
///    Waiting cannot change the outcome, so voters get the answer now.
/// 4. Otherwise `Unresolved`.
///
/// Members may leave after voting, so the committed tally can exceed the
/// roster; the undecided count clamps at zero instead of underflowing.
pub fn evaluate(
    votes_for: u32,
    votes_against: u32,
    total_members: u32,
    deadline: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Decision {
    let needed = i64::from(quorum(total_members)) - i64::from(votes_for);
    if needed <= 0 {
        return Decision::Approve;
    }

    if now > deadline {
        return Decision::Reject;
    }

    let undecided = (i64::from(total_members) - i64::from(votes_for) - i64::from(votes_against))
        .max(0);
    if needed > undecided {
        return Decision::Reject;
    }

    Decision::Unresolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn instants() -> (DateTime<Utc>, DateTime<Utc>) {
        let now = Utc::now();
        (now + Duration::hours(1), now)
    }

    #[test]
    fn quorum_is_more_than_half() {
        assert_eq!(quorum(1), 1);
        assert_eq!(quorum(2), 2);
        assert_eq!(quorum(4), 3);
        assert_eq!(quorum(5), 3);
        assert_eq!(quorum(10), 6);
    }

    #[test]
    fn approves_at_quorum() {
        let (deadline, now) = instants();
        assert_eq!(evaluate(3, 0, 4, deadline, now), Decision::Approve);
        assert_eq!(evaluate(6, 4, 10, deadline, now), Decision::Approve);
    }

    #[test]
    fn unresolved_below_quorum_before_deadline() {
        let (deadline, now) = instants();
        assert_eq!(evaluate(2, 0, 4, deadline, now), Decision::Unresolved);
        assert_eq!(evaluate(0, 0, 10, deadline, now), Decision::Unresolved);
    }

    #[test]
    fn rejects_past_deadline_short_of_quorum() {
        let now = Utc::now();
        let deadline = now - Duration::seconds(1);
        assert_eq!(evaluate(2, 1, 5, deadline, now), Decision::Reject);
    }

    #[test]
    fn approves_past_deadline_if_quorum_already_reached() {
        // A decisive tally that somehow went unresolved (e.g. crash before
        // resolve) must still approve when swept after the deadline.
        let now = Utc::now();
        let deadline = now - Duration::seconds(1);
        assert_eq!(evaluate(3, 0, 4, deadline, now), Decision::Approve);
    }

    #[test]
    fn vote_exactly_at_deadline_still_counts() {
        let now = Utc::now();
        assert_eq!(evaluate(2, 0, 4, now, now), Decision::Unresolved);
    }

    #[test]
    fn early_rejection_when_quorum_unreachable() {
        // totalMembers=10, quorum=6: five AGAINST votes leave only four
        // undecided members, one short of the five more FOR votes needed.
        let (deadline, now) = instants();
        assert_eq!(evaluate(1, 5, 10, deadline, now), Decision::Reject);
    }

    #[test]
    fn no_early_rejection_while_quorum_reachable() {
        // totalMembers=5, quorum=3, for=2 against=1: the two silent members
        // can still supply the one missing FOR vote.
        let (deadline, now) = instants();
        assert_eq!(evaluate(2, 1, 5, deadline, now), Decision::Unresolved);
    }

    #[test]
    fn shrunken_roster_does_not_underflow() {
        // Seven votes committed but only three members remain; quorum=2 is
        // already met by the FOR side.
        let (deadline, now) = instants();
        assert_eq!(evaluate(4, 3, 3, deadline, now), Decision::Approve);

        // FOR side short of quorum with no undecided members left: reject
        // early rather than wait for the deadline.
        assert_eq!(evaluate(1, 6, 5, deadline, now), Decision::Reject);
    }

    #[test]
    fn empty_pool_rejects() {
        let (deadline, now) = instants();
        assert_eq!(evaluate(0, 0, 0, deadline, now), Decision::Reject);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn quorum_exceeds_half(n in 0u32..10_000) {
                let q = u64::from(quorum(n));
                prop_assert!(2 * q > u64::from(n));
                prop_assert!(2 * (q - 1) <= u64::from(n));
            }

            #[test]
            fn approve_iff_quorum_reached(
                votes_for in 0u32..200,
                votes_against in 0u32..200,
                total in 0u32..200,
                past_deadline in any::<bool>(),
            ) {
                let now = Utc::now();
                let deadline = if past_deadline {
                    now - chrono::Duration::seconds(1)
                } else {
                    now + chrono::Duration::hours(1)
                };
                let decision = evaluate(votes_for, votes_against, total, deadline, now);
                prop_assert_eq!(
                    decision == Decision::Approve,
                    votes_for >= quorum(total)
                );
            }

            #[test]
            fn past_deadline_is_always_decisive(
                votes_for in 0u32..200,
                votes_against in 0u32..200,
                total in 0u32..200,
            ) {
                let now = Utc::now();
                let deadline = now - chrono::Duration::seconds(1);
                let decision = evaluate(votes_for, votes_against, total, deadline, now);
                prop_assert_ne!(decision, Decision::Unresolved);
            }

            #[test]
            fn unresolved_only_when_both_outcomes_possible(
                votes_for in 0u32..200,
                votes_against in 0u32..200,
                total in 0u32..200,
            ) {
                let now = Utc::now();
                let deadline = now + chrono::Duration::hours(1);
                if evaluate(votes_for, votes_against, total, deadline, now)
                    == Decision::Unresolved
                {
                    let q = quorum(total);
                    let undecided = total - votes_for - votes_against;
                    prop_assert!(votes_for < q);
                    prop_assert!(votes_for + undecided >= q);
                }
            }
        }
    }
}

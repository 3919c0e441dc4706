//! In-memory pool ledger used for tests, local demos, and embedding.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use afyapool_types::{MemberId, PoolId};
use tracing::{debug, info};

use crate::error::LedgerError;
use crate::traits::{PoolLedger, PoolSnapshot};

/// In-memory [`PoolLedger`] implementation.
///
/// All state lives behind one `RwLock`; the conditional debit holds the
/// write lock across its check and its subtraction, which is what makes it
/// atomic.
pub struct InMemoryPoolLedger {
    inner: RwLock<LedgerState>,
}

#[derive(Default)]
struct LedgerState {
    pools: HashMap<PoolId, PoolState>,
}

struct PoolState {
    admin: MemberId,
    members: HashSet<MemberId>,
    available_minor: i64,
}

impl InMemoryPoolLedger {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(LedgerState::default()),
        }
    }

    /// Register a pool with its admin, initial roster, and opening balance.
    /// The admin is always on the roster.
    pub fn register_pool(
        &self,
        id: PoolId,
        admin: MemberId,
        members: impl IntoIterator<Item = MemberId>,
        opening_minor: i64,
    ) {
        let mut roster: HashSet<MemberId> = members.into_iter().collect();
        roster.insert(admin.clone());

        let mut state = self.inner.write().unwrap();
        state.pools.insert(
            id.clone(),
            PoolState {
                admin,
                members: roster,
                available_minor: opening_minor.max(0),
            },
        );
        info!(pool_id = %id, opening_minor, "Pool registered");
    }

    /// Remove a pool entirely (pool dissolution in the management service).
    pub fn remove_pool(&self, id: &PoolId) {
        let mut state = self.inner.write().unwrap();
        state.pools.remove(id);
    }

    /// Add a member to the roster.
    pub fn add_member(&self, id: &PoolId, member: MemberId) -> Result<(), LedgerError> {
        let mut state = self.inner.write().unwrap();
        let pool = state
            .pools
            .get_mut(id)
            .ok_or_else(|| LedgerError::PoolNotFound(id.clone()))?;
        if !pool.members.insert(member.clone()) {
            return Err(LedgerError::AlreadyMember {
                pool: id.clone(),
                member,
            });
        }
        Ok(())
    }

    /// Drop a member from the roster. Votes they already cast stay counted.
    pub fn remove_member(&self, id: &PoolId, member: &MemberId) -> Result<(), LedgerError> {
        let mut state = self.inner.write().unwrap();
        let pool = state
            .pools
            .get_mut(id)
            .ok_or_else(|| LedgerError::PoolNotFound(id.clone()))?;
        if !pool.members.remove(member) {
            return Err(LedgerError::NotAMember {
                pool: id.clone(),
                member: member.clone(),
            });
        }
        Ok(())
    }
}

impl Default for InMemoryPoolLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl PoolLedger for InMemoryPoolLedger {
    fn pool(&self, id: &PoolId) -> Result<PoolSnapshot, LedgerError> {
        let state = self.inner.read().unwrap();
        let pool = state
            .pools
            .get(id)
            .ok_or_else(|| LedgerError::PoolNotFound(id.clone()))?;
        Ok(PoolSnapshot {
            id: id.clone(),
            admin: pool.admin.clone(),
            member_count: pool.members.len() as u32,
            available_minor: pool.available_minor,
        })
    }

    fn member_count(&self, id: &PoolId) -> Result<u32, LedgerError> {
        let state = self.inner.read().unwrap();
        state
            .pools
            .get(id)
            .map(|p| p.members.len() as u32)
            .ok_or_else(|| LedgerError::PoolNotFound(id.clone()))
    }

    fn is_member(&self, id: &PoolId, member: &MemberId) -> Result<bool, LedgerError> {
        let state = self.inner.read().unwrap();
        state
            .pools
            .get(id)
            .map(|p| p.members.contains(member))
            .ok_or_else(|| LedgerError::PoolNotFound(id.clone()))
    }

    fn admin(&self, id: &PoolId) -> Result<MemberId, LedgerError> {
        let state = self.inner.read().unwrap();
        state
            .pools
            .get(id)
            .map(|p| p.admin.clone())
            .ok_or_else(|| LedgerError::PoolNotFound(id.clone()))
    }

    fn try_debit(&self, id: &PoolId, amount_minor: i64) -> Result<i64, LedgerError> {
        if amount_minor <= 0 {
            return Err(LedgerError::NonPositiveAmount(amount_minor));
        }

        let mut state = self.inner.write().unwrap();
        let pool = state
            .pools
            .get_mut(id)
            .ok_or_else(|| LedgerError::PoolNotFound(id.clone()))?;

        if pool.available_minor < amount_minor {
            return Err(LedgerError::InsufficientFunds {
                pool: id.clone(),
                required: amount_minor,
                available: pool.available_minor,
            });
        }

        pool.available_minor -= amount_minor;
        debug!(
            pool_id = %id,
            amount_minor,
            balance = pool.available_minor,
            "Pool debited"
        );
        Ok(pool.available_minor)
    }

    fn credit(&self, id: &PoolId, amount_minor: i64) -> Result<i64, LedgerError> {
        if amount_minor <= 0 {
            return Err(LedgerError::NonPositiveAmount(amount_minor));
        }

        let mut state = self.inner.write().unwrap();
        let pool = state
            .pools
            .get_mut(id)
            .ok_or_else(|| LedgerError::PoolNotFound(id.clone()))?;

        pool.available_minor += amount_minor;
        debug!(
            pool_id = %id,
            amount_minor,
            balance = pool.available_minor,
            "Pool credited"
        );
        Ok(pool.available_minor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn ledger_with_pool(opening: i64) -> (InMemoryPoolLedger, PoolId, MemberId) {
        let ledger = InMemoryPoolLedger::new();
        let pool = PoolId::generate();
        let admin = MemberId::generate();
        ledger.register_pool(pool.clone(), admin.clone(), Vec::new(), opening);
        (ledger, pool, admin)
    }

    #[test]
    fn admin_is_always_a_member() {
        let (ledger, pool, admin) = ledger_with_pool(0);
        assert!(ledger.is_member(&pool, &admin).unwrap());
        assert_eq!(ledger.member_count(&pool).unwrap(), 1);
    }

    #[test]
    fn debit_within_balance_succeeds() {
        let (ledger, pool, _) = ledger_with_pool(50_000);
        assert_eq!(ledger.try_debit(&pool, 20_000).unwrap(), 30_000);
        assert_eq!(ledger.pool(&pool).unwrap().available_minor, 30_000);
    }

    #[test]
    fn debit_beyond_balance_is_refused_without_change() {
        let (ledger, pool, _) = ledger_with_pool(10_000);
        assert!(matches!(
            ledger.try_debit(&pool, 10_001),
            Err(LedgerError::InsufficientFunds {
                required: 10_001,
                available: 10_000,
                ..
            })
        ));
        assert_eq!(ledger.pool(&pool).unwrap().available_minor, 10_000);
    }

    #[test]
    fn debit_rejects_non_positive_amounts() {
        let (ledger, pool, _) = ledger_with_pool(10_000);
        assert!(matches!(
            ledger.try_debit(&pool, 0),
            Err(LedgerError::NonPositiveAmount(0))
        ));
        assert!(matches!(
            ledger.try_debit(&pool, -5),
            Err(LedgerError::NonPositiveAmount(-5))
        ));
    }

    #[test]
    fn credit_grows_balance() {
        let (ledger, pool, _) = ledger_with_pool(0);
        assert_eq!(ledger.credit(&pool, 15_000).unwrap(), 15_000);
        assert_eq!(ledger.credit(&pool, 5_000).unwrap(), 20_000);
    }

    #[test]
    fn unknown_pool_errors() {
        let ledger = InMemoryPoolLedger::new();
        let pool = PoolId::generate();
        assert!(matches!(
            ledger.try_debit(&pool, 100),
            Err(LedgerError::PoolNotFound(_))
        ));
        assert!(matches!(
            ledger.member_count(&pool),
            Err(LedgerError::PoolNotFound(_))
        ));
    }

    #[test]
    fn roster_add_and_remove() {
        let (ledger, pool, _) = ledger_with_pool(0);
        let member = MemberId::generate();

        ledger.add_member(&pool, member.clone()).unwrap();
        assert!(ledger.is_member(&pool, &member).unwrap());
        assert!(matches!(
            ledger.add_member(&pool, member.clone()),
            Err(LedgerError::AlreadyMember { .. })
        ));

        ledger.remove_member(&pool, &member).unwrap();
        assert!(!ledger.is_member(&pool, &member).unwrap());
        assert!(matches!(
            ledger.remove_member(&pool, &member),
            Err(LedgerError::NotAMember { .. })
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_debits_never_overdraw() {
        let (ledger, pool, _) = ledger_with_pool(100_000);
        let ledger = Arc::new(ledger);

        // 40 tasks each try to take 30_000 from 100_000; only 3 can fit.
        let mut handles = Vec::new();
        for _ in 0..40 {
            let ledger = ledger.clone();
            let pool = pool.clone();
            handles.push(tokio::spawn(
                async move { ledger.try_debit(&pool, 30_000) },
            ));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }

        assert_eq!(successes, 3);
        assert_eq!(ledger.pool(&pool).unwrap().available_minor, 10_000);
    }
}

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::domain::{Money, TenantId};
use crate::ledger::{LedgerStore, TenantBalance};

/// Read-side cache over the ledger. Entries are keyed by the ledger's
/// per-tenant version counter, so any append, hold, release, or commit
/// invalidates the cached figure on the next read. Never authoritative;
/// a miss just recomputes from the entries.
pub struct BalanceAccumulator {
    ledger: Arc<LedgerStore>,
    cache: Mutex<HashMap<TenantId, (u64, TenantBalance)>>,
}

impl BalanceAccumulator {
    pub fn new(ledger: Arc<LedgerStore>) -> Self {
        Self {
            ledger,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn balance(&self, tenant: TenantId) -> TenantBalance {
        let version = self.ledger.version(tenant);
        {
            let cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some((cached_version, balance)) = cache.get(&tenant) {
                if *cached_version == version {
                    return *balance;
                }
            }
        }
        let balance = self.ledger.balance(tenant);
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache.insert(tenant, (version, balance));
        balance
    }

    pub fn available(&self, tenant: TenantId) -> Money {
        self.balance(tenant).available
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EntryKind, Money, SystemClock};

    fn money(s: &str) -> Money {
        Money::parse(s).unwrap()
    }

    const TENANT: TenantId = TenantId(7);

    #[test]
    fn serves_recomputed_balance_after_every_mutation() {
        let ledger = Arc::new(LedgerStore::new(Arc::new(SystemClock)));
        let balances = BalanceAccumulator::new(Arc::clone(&ledger));

        assert_eq!(balances.available(TENANT), Money::zero());

        ledger
            .append_entry(TENANT, EntryKind::CreditFee, money("500"), "fee-1".into())
            .unwrap();
        assert_eq!(balances.available(TENANT), money("500"));

        ledger.place_hold(TENANT, money("120"), "wd-1".into()).unwrap();
        assert_eq!(balances.available(TENANT), money("380"));
        assert_eq!(balances.balance(TENANT).held, money("120"));

        ledger.release_hold(TENANT, &"wd-1".into()).unwrap();
        assert_eq!(balances.available(TENANT), money("500"));
    }

    #[test]
    fn repeated_reads_hit_the_cache() {
        let ledger = Arc::new(LedgerStore::new(Arc::new(SystemClock)));
        let balances = BalanceAccumulator::new(Arc::clone(&ledger));
        ledger
            .append_entry(TENANT, EntryKind::CreditFee, money("42"), "fee-1".into())
            .unwrap();
        // Same version, same answer; the second read must not drift.
        assert_eq!(balances.available(TENANT), money("42"));
        assert_eq!(balances.available(TENANT), money("42"));
    }
}

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::debug;

use crate::domain::{
    Clock, EntryId, EntryKind, Error, JournalKind, JournalRecord, LedgerEntry, Money, ReferenceId,
    TenantId,
};

/// Derived view of one tenant's wallet. Never stored; recomputed from the
/// entries or served from the accumulator's versioned cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantBalance {
    pub available: Money,
    pub held: Money,
    pub total: Money,
}

impl TenantBalance {
    pub fn zero() -> Self {
        Self {
            available: Money::zero(),
            held: Money::zero(),
            total: Money::zero(),
        }
    }
}

#[derive(Default)]
struct TenantLedger {
    entries: Vec<LedgerEntry>,
    seen: HashSet<(ReferenceId, EntryKind)>,
    version: u64,
}

impl TenantLedger {
    /// Appends one entry under the idempotency guard. The caller holds the
    /// tenant lock, so the duplicate check and the insert are atomic.
    fn push(
        &mut self,
        tenant: TenantId,
        kind: EntryKind,
        amount: Money,
        reference: ReferenceId,
        created_at: std::time::SystemTime,
    ) -> Result<EntryId, Error> {
        let key = (reference.clone(), kind);
        if self.seen.contains(&key) {
            return Err(Error::DuplicateReference {
                tenant,
                reference,
                kind,
            });
        }
        let entry = LedgerEntry {
            id: EntryId::new(),
            tenant_id: tenant,
            kind,
            amount,
            reference,
            created_at,
        };
        let id = entry.id;
        self.seen.insert(key);
        self.entries.push(entry);
        self.version += 1;
        Ok(id)
    }

    fn hold_is_active(&self, reference: &ReferenceId) -> bool {
        self.seen.contains(&(reference.clone(), EntryKind::Hold))
            && !self.seen.contains(&(reference.clone(), EntryKind::HoldRelease))
            && !self.seen.contains(&(reference.clone(), EntryKind::HoldCommit))
    }

    fn active_hold(&self, reference: &ReferenceId) -> Option<&LedgerEntry> {
        if !self.hold_is_active(reference) {
            return None;
        }
        self.entries
            .iter()
            .find(|e| e.kind == EntryKind::Hold && &e.reference == reference)
    }

    fn balance(&self) -> TenantBalance {
        let mut committed = Money::zero();
        let mut held = Money::zero();
        for entry in &self.entries {
            if entry.kind.is_committed() {
                if entry.kind.is_debit() {
                    committed -= entry.amount;
                } else {
                    committed += entry.amount;
                }
            } else if entry.kind == EntryKind::Hold && self.hold_is_active(&entry.reference) {
                held += entry.amount;
            }
        }
        TenantBalance {
            available: committed - held,
            held,
            total: committed,
        }
    }
}

/// Append-only ledger, the single source of truth for tenant balances.
///
/// Every balance-affecting operation takes the tenant's lock for the whole
/// check-then-insert sequence, which is what keeps concurrent holds from
/// racing past the available-funds check.
pub struct LedgerStore {
    tenants: RwLock<HashMap<TenantId, Arc<Mutex<TenantLedger>>>>,
    clock: Arc<dyn Clock>,
}

impl LedgerStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            tenants: RwLock::new(HashMap::new()),
            clock,
        }
    }

    fn tenant_ledger(&self, tenant: TenantId) -> Arc<Mutex<TenantLedger>> {
        {
            let tenants = self.tenants.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(ledger) = tenants.get(&tenant) {
                return Arc::clone(ledger);
            }
        }
        let mut tenants = self.tenants.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(tenants.entry(tenant).or_default())
    }

    /// Records a committed credit or debit. Hold lifecycle entries go through
    /// `place_hold` / `release_hold` / `commit_hold` instead.
    pub fn append_entry(
        &self,
        tenant: TenantId,
        kind: EntryKind,
        amount: Money,
        reference: ReferenceId,
    ) -> Result<EntryId, Error> {
        match kind {
            EntryKind::CreditFee | EntryKind::DebitUsage => {}
            other => {
                return Err(Error::Validation(format!(
                    "{:?} entries cannot be appended directly",
                    other
                )));
            }
        }
        if !amount.is_positive() {
            return Err(Error::Validation(format!(
                "entry amount must be positive, got {}",
                amount
            )));
        }
        let ledger = self.tenant_ledger(tenant);
        let mut ledger = ledger.lock().unwrap_or_else(PoisonError::into_inner);
        if kind.is_debit() {
            let available = ledger.balance().available;
            if available < amount {
                return Err(Error::InsufficientFunds {
                    requested: amount,
                    available,
                });
            }
        }
        let id = ledger.push(tenant, kind, amount, reference, self.clock.now())?;
        debug!(%tenant, ?kind, %amount, "ledger entry appended");
        Ok(id)
    }

    /// Reserves funds pending an external payout. The balance check and the
    /// hold insert happen under one tenant lock acquisition.
    pub fn place_hold(
        &self,
        tenant: TenantId,
        amount: Money,
        reference: ReferenceId,
    ) -> Result<EntryId, Error> {
        if !amount.is_positive() {
            return Err(Error::Validation(format!(
                "hold amount must be positive, got {}",
                amount
            )));
        }
        let ledger = self.tenant_ledger(tenant);
        let mut ledger = ledger.lock().unwrap_or_else(PoisonError::into_inner);
        let available = ledger.balance().available;
        if available < amount {
            return Err(Error::InsufficientFunds {
                requested: amount,
                available,
            });
        }
        let id = ledger.push(tenant, EntryKind::Hold, amount, reference, self.clock.now())?;
        debug!(%tenant, %amount, "hold placed");
        Ok(id)
    }

    /// Releases an active hold, returning the funds to the available balance.
    pub fn release_hold(&self, tenant: TenantId, reference: &ReferenceId) -> Result<EntryId, Error> {
        let ledger = self.tenant_ledger(tenant);
        let mut ledger = ledger.lock().unwrap_or_else(PoisonError::into_inner);
        let amount = match ledger.active_hold(reference) {
            Some(hold) => hold.amount,
            None => return Err(Error::HoldNotFound(reference.clone())),
        };
        let id = ledger.push(
            tenant,
            EntryKind::HoldRelease,
            amount,
            reference.clone(),
            self.clock.now(),
        )?;
        debug!(%tenant, %reference, "hold released");
        Ok(id)
    }

    /// Converts an active hold into a committed withdrawal debit. Both
    /// entries land in the same atomic unit; a replay with the same
    /// reference fails the duplicate guard and commits nothing twice.
    pub fn commit_hold(&self, tenant: TenantId, reference: &ReferenceId) -> Result<EntryId, Error> {
        let ledger = self.tenant_ledger(tenant);
        let mut ledger = ledger.lock().unwrap_or_else(PoisonError::into_inner);
        let amount = match ledger.active_hold(reference) {
            Some(hold) => hold.amount,
            None => return Err(Error::HoldNotFound(reference.clone())),
        };
        let now = self.clock.now();
        ledger.push(tenant, EntryKind::HoldCommit, amount, reference.clone(), now)?;
        let id = ledger.push(
            tenant,
            EntryKind::DebitWithdrawal,
            amount,
            reference.clone(),
            now,
        )?;
        debug!(%tenant, %reference, %amount, "hold committed to withdrawal debit");
        Ok(id)
    }

    pub fn balance(&self, tenant: TenantId) -> TenantBalance {
        let ledger = self.tenant_ledger(tenant);
        let ledger = ledger.lock().unwrap_or_else(PoisonError::into_inner);
        ledger.balance()
    }

    pub fn available(&self, tenant: TenantId) -> Money {
        self.balance(tenant).available
    }

    /// Monotonic per-tenant mutation counter; bumps on every append. The
    /// balance accumulator keys its cache off this.
    pub fn version(&self, tenant: TenantId) -> u64 {
        let ledger = self.tenant_ledger(tenant);
        let ledger = ledger.lock().unwrap_or_else(PoisonError::into_inner);
        ledger.version
    }

    pub fn entries(&self, tenant: TenantId) -> Vec<LedgerEntry> {
        let ledger = self.tenant_ledger(tenant);
        let ledger = ledger.lock().unwrap_or_else(PoisonError::into_inner);
        ledger.entries.clone()
    }

    pub fn tenants(&self) -> Vec<TenantId> {
        let tenants = self.tenants.read().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<TenantId> = tenants.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Applies one journal record, used by the audit replay binary.
    pub fn apply_journal(&self, record: JournalRecord) -> Result<EntryId, Error> {
        debug!(record = %record, "replaying journal record");
        let JournalRecord {
            kind,
            tenant_id,
            reference,
        } = record;
        match kind {
            JournalKind::CreditFee { amount } => {
                self.append_entry(tenant_id, EntryKind::CreditFee, amount, reference)
            }
            JournalKind::DebitUsage { amount } => {
                self.append_entry(tenant_id, EntryKind::DebitUsage, amount, reference)
            }
            JournalKind::Hold { amount } => self.place_hold(tenant_id, amount, reference),
            JournalKind::HoldRelease => self.release_hold(tenant_id, &reference),
            JournalKind::HoldCommit => self.commit_hold(tenant_id, &reference),
        }
    }
}

use std::time::SystemTime;

use serde::Deserialize;

use crate::domain::{EntryId, Money, ReferenceId, TenantId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    CreditFee,
    DebitUsage,
    DebitWithdrawal,
    Hold,
    HoldRelease,
    HoldCommit,
}

impl EntryKind {
    /// Committed kinds contribute to the balance directly; hold kinds only
    /// track reservations.
    pub fn is_committed(&self) -> bool {
        matches!(
            self,
            EntryKind::CreditFee | EntryKind::DebitUsage | EntryKind::DebitWithdrawal
        )
    }

    pub fn is_debit(&self) -> bool {
        matches!(self, EntryKind::DebitUsage | EntryKind::DebitWithdrawal)
    }
}

/// One immutable ledger record. Never mutated or deleted once appended;
/// balances are always derived by summation.
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub tenant_id: TenantId,
    pub kind: EntryKind,
    pub amount: Money,
    pub reference: ReferenceId,
    pub created_at: SystemTime,
}

/// A replayable journal command, one CSV row in the audit pipeline.
#[derive(Debug, Clone)]
pub enum JournalKind {
    CreditFee { amount: Money },
    DebitUsage { amount: Money },
    Hold { amount: Money },
    HoldRelease,
    HoldCommit,
}

#[derive(Debug, Clone)]
pub struct JournalRecord {
    pub kind: JournalKind,
    pub tenant_id: TenantId,
    pub reference: ReferenceId,
}

impl core::fmt::Display for JournalRecord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match &self.kind {
            JournalKind::CreditFee { amount }
            | JournalKind::DebitUsage { amount }
            | JournalKind::Hold { amount } => {
                write!(
                    f,
                    "{:?},tenant={},ref={},amount={}",
                    self.kind, self.tenant_id, self.reference, amount
                )
            }
            _ => write!(
                f,
                "{:?},tenant={},ref={}",
                self.kind, self.tenant_id, self.reference
            ),
        }
    }
}

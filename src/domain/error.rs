use crate::domain::{EntryKind, Money, ReferenceId, TenantId};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    IO(#[from] std::io::Error),

    #[error("Ingestion failed with: {0}")]
    Ingestion(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Not authorized for tenant {0}")]
    Unauthorized(TenantId),

    #[error("Insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds { requested: Money, available: Money },

    #[error("A withdrawal is already in progress for tenant {0}")]
    WithdrawalInProgress(TenantId),

    #[error("Entry {reference} ({kind:?}) already recorded for tenant {tenant}")]
    DuplicateReference {
        tenant: TenantId,
        reference: ReferenceId,
        kind: EntryKind,
    },

    #[error("No active hold with reference {0}")]
    HoldNotFound(ReferenceId),

    #[error("Unknown withdrawal attempt: {0}")]
    AttemptNotFound(String),

    #[error("Payout gateway unavailable: {0}")]
    GatewayUnavailable(String),

    #[error("Payout rejected by gateway: {0}")]
    GatewayRejected(String),

    #[error("Attempt {0} expired unresolved; manual review required")]
    ReconciliationTimeout(String),
}

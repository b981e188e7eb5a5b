//! Tenant wallet ledger and withdrawal reconciliation engine.
//!
//! The [`ledger::LedgerStore`] is the single source of truth: an append-only
//! record of monetary movements per tenant, with the available-funds check
//! and every insert serialized per tenant. The
//! [`orchestrator::WithdrawalOrchestrator`] drives withdrawal attempts
//! through a compare-and-swap state machine around an external payout
//! gateway, and the [`sweep::ReconciliationSweep`] resolves whatever a
//! crashed request or an unreachable gateway left behind.

pub mod auth;
pub mod balance;
pub mod dlq;
pub mod domain;
pub mod gateway;
pub mod ingestion;
pub mod ledger;
pub mod orchestrator;
pub mod report;
pub mod sweep;

pub use balance::BalanceAccumulator;
pub use ledger::{LedgerStore, TenantBalance};
pub use orchestrator::{OrchestratorConfig, WithdrawalOrchestrator, WithdrawalRequest};
pub use sweep::{ReconciliationSweep, SweepConfig};

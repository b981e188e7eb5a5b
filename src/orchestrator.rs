use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime};

use tokio::time::timeout;
use tracing::{info, warn};

use crate::auth::{self, Principal};
use crate::domain::{
    AttemptId, AttemptState, Clock, Destination, Error, GatewayReference, Money, ReferenceId,
    TenantId, WithdrawalAttempt,
};
use crate::gateway::{Bank, PayoutAck, PayoutGateway, PayoutRequest, SettlementStatus};
use crate::ledger::LedgerStore;

#[derive(Debug, Clone, Copy)]
pub struct OrchestratorConfig {
    /// Hard cap on every gateway call. A timeout is an unknown outcome and
    /// is left to the reconciliation sweep, never resolved optimistically.
    pub gateway_timeout: Duration,
    /// How long an attempt may stay unresolved before it expires and is
    /// flagged for manual review.
    pub attempt_ttl: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            gateway_timeout: Duration::from_secs(10),
            attempt_ttl: Duration::from_secs(24 * 60 * 60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WithdrawalRequest {
    pub amount: Money,
    pub destination: Destination,
}

/// Outcome of a compare-and-swap on an attempt's state. A stale swap is a
/// no-op, never an error; concurrent sweep workers race on these freely.
#[derive(Debug)]
enum Transition {
    Applied(Box<WithdrawalAttempt>),
    Stale(AttemptState),
    NotFound,
}

#[derive(Default)]
struct AttemptsInner {
    by_id: HashMap<AttemptId, WithdrawalAttempt>,
    by_gateway_reference: HashMap<GatewayReference, AttemptId>,
    active: HashMap<TenantId, AttemptId>,
}

/// In-process store of withdrawal attempts. Enforces the one-non-terminal-
/// attempt-per-tenant rule at insert time and serializes all state
/// transitions behind one lock.
#[derive(Default)]
struct AttemptStore {
    inner: Mutex<AttemptsInner>,
}

impl AttemptStore {
    fn insert(&self, attempt: WithdrawalAttempt) -> Result<(), Error> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = inner.active.get(&attempt.tenant_id) {
            let outstanding = inner
                .by_id
                .get(existing)
                .is_some_and(|a| !a.state.is_terminal());
            if outstanding {
                return Err(Error::WithdrawalInProgress(attempt.tenant_id));
            }
        }
        inner.active.insert(attempt.tenant_id, attempt.id);
        inner.by_id.insert(attempt.id, attempt);
        Ok(())
    }

    fn get(&self, id: AttemptId) -> Option<WithdrawalAttempt> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.by_id.get(&id).cloned()
    }

    fn find_by_gateway_reference(&self, reference: &GatewayReference) -> Option<AttemptId> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.by_gateway_reference.get(reference).copied()
    }

    /// Applies `mutate` only if the attempt is currently in one of the
    /// `expected` states. Anything else is reported, not applied.
    fn transition(
        &self,
        id: AttemptId,
        expected: &[AttemptState],
        now: SystemTime,
        mutate: impl FnOnce(&mut WithdrawalAttempt),
    ) -> Transition {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(attempt) = inner.by_id.get_mut(&id) else {
            return Transition::NotFound;
        };
        if !expected.contains(&attempt.state) {
            return Transition::Stale(attempt.state);
        }
        mutate(attempt);
        attempt.updated_at = now;
        let snapshot = attempt.clone();
        if let Some(reference) = snapshot.gateway_reference.clone() {
            inner.by_gateway_reference.entry(reference).or_insert(id);
        }
        if snapshot.state.is_terminal() {
            if let Some(active) = inner.active.get(&snapshot.tenant_id) {
                if *active == id {
                    inner.active.remove(&snapshot.tenant_id);
                }
            }
        }
        Transition::Applied(Box::new(snapshot))
    }

    fn snapshot(&self, filter: impl Fn(&WithdrawalAttempt) -> bool) -> Vec<WithdrawalAttempt> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.by_id.values().filter(|a| filter(a)).cloned().collect()
    }
}

/// Drives each withdrawal attempt through its state machine:
/// `PendingHold -> Held -> GatewaySubmitted -> Succeeded | Failed | Expired`.
///
/// The ledger hold is acquired and committed in separate atomic units; the
/// gateway is only ever called in between, outside any lock.
pub struct WithdrawalOrchestrator<G: PayoutGateway> {
    ledger: Arc<LedgerStore>,
    attempts: AttemptStore,
    gateway: G,
    clock: Arc<dyn Clock>,
    config: OrchestratorConfig,
}

impl<G: PayoutGateway> WithdrawalOrchestrator<G> {
    pub fn new(
        ledger: Arc<LedgerStore>,
        gateway: G,
        clock: Arc<dyn Clock>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            ledger,
            attempts: AttemptStore::default(),
            gateway,
            clock,
            config,
        }
    }

    /// Entry point for the HTTP layer. Validates, authorizes, reserves the
    /// funds, then submits to the gateway. Returns the attempt id once the
    /// hold is placed; a gateway transport failure leaves the attempt `Held`
    /// for the sweep rather than failing the request.
    pub async fn request_withdrawal(
        &self,
        principal: &Principal,
        tenant: TenantId,
        request: WithdrawalRequest,
    ) -> Result<AttemptId, Error> {
        auth::authorize(principal, tenant)?;
        if !request.amount.is_positive() {
            return Err(Error::Validation(format!(
                "withdrawal amount must be positive, got {}",
                request.amount
            )));
        }
        request.destination.validate()?;

        let now = self.clock.now();
        let attempt = WithdrawalAttempt::new(
            tenant,
            request.amount,
            request.destination,
            now,
            now + self.config.attempt_ttl,
        );
        let id = attempt.id;
        self.attempts.insert(attempt)?;

        if let Err(e) = self
            .ledger
            .place_hold(tenant, request.amount, ReferenceId::from(id))
        {
            let reason = e.to_string();
            self.attempts
                .transition(id, &[AttemptState::PendingHold], self.clock.now(), |a| {
                    a.state = AttemptState::Failed;
                    a.failure_reason = Some(reason.clone());
                });
            return Err(e);
        }
        self.attempts
            .transition(id, &[AttemptState::PendingHold], self.clock.now(), |a| {
                a.state = AttemptState::Held;
            });
        info!(%tenant, attempt = %id, amount = %request.amount, "funds held for withdrawal");

        self.submit(id).await;

        // Surface a definitive gateway rejection; transport trouble is not
        // permanent and still reads as an accepted request.
        if let Some(current) = self.attempts.get(id) {
            if current.state == AttemptState::Failed {
                let reason = current
                    .failure_reason
                    .unwrap_or_else(|| "rejected".to_string());
                return Err(Error::GatewayRejected(reason));
            }
        }
        Ok(id)
    }

    /// Submits a held attempt to the gateway. Idempotent at the gateway via
    /// the attempt id carried in the request, so a sweep re-submission after
    /// a timed-out call cannot double-pay.
    pub(crate) async fn submit(&self, id: AttemptId) {
        let Some(attempt) = self.attempts.get(id) else {
            return;
        };
        if attempt.state != AttemptState::Held {
            return;
        }
        let request = PayoutRequest {
            attempt_id: id,
            tenant_id: attempt.tenant_id,
            amount: attempt.amount,
            destination: attempt.destination.clone(),
        };
        match timeout(self.config.gateway_timeout, self.gateway.submit_payout(request)).await {
            Ok(Ok(PayoutAck::Accepted { reference })) => {
                info!(attempt = %id, gateway_ref = %reference, "payout accepted by gateway");
                self.attempts
                    .transition(id, &[AttemptState::Held], self.clock.now(), |a| {
                        a.state = AttemptState::GatewaySubmitted;
                        a.gateway_reference = Some(reference.clone());
                    });
            }
            Ok(Ok(PayoutAck::Rejected { reason })) => {
                info!(attempt = %id, %reason, "payout rejected by gateway");
                self.release_and_fail(id, attempt.tenant_id, reason);
            }
            Ok(Err(e)) => {
                warn!(attempt = %id, error = %e, "gateway unreachable, attempt stays held for sweep");
            }
            Err(_) => {
                warn!(attempt = %id, "gateway submit timed out, outcome unknown, left to sweep");
            }
        }
    }

    /// Webhook entry point: the gateway reports settlement for a reference
    /// it issued at submission. Replays are no-ops.
    pub fn record_settlement(
        &self,
        reference: &GatewayReference,
        status: SettlementStatus,
    ) -> Result<(), Error> {
        let id = self
            .attempts
            .find_by_gateway_reference(reference)
            .ok_or_else(|| Error::AttemptNotFound(reference.to_string()))?;
        self.settle(id, status)
    }

    /// Applies a definitive settlement report. Acts on `GatewaySubmitted`
    /// and on `Expired` (whose hold is still retained); any other state,
    /// including a replay against `Succeeded`/`Failed`, is a no-op.
    fn settle(&self, id: AttemptId, status: SettlementStatus) -> Result<(), Error> {
        let Some(attempt) = self.attempts.get(id) else {
            return Err(Error::AttemptNotFound(id.to_string()));
        };
        let resolvable = matches!(
            attempt.state,
            AttemptState::GatewaySubmitted | AttemptState::Expired
        );
        if !resolvable {
            return Ok(());
        }
        match status {
            SettlementStatus::Settled => {
                match self
                    .ledger
                    .commit_hold(attempt.tenant_id, &ReferenceId::from(id))
                {
                    Ok(_) => {}
                    // A racing worker already converted the hold.
                    Err(Error::HoldNotFound(_)) | Err(Error::DuplicateReference { .. }) => {}
                    Err(e) => return Err(e),
                }
                self.attempts.transition(
                    id,
                    &[AttemptState::GatewaySubmitted, AttemptState::Expired],
                    self.clock.now(),
                    |a| {
                        a.state = AttemptState::Succeeded;
                        a.needs_review = false;
                    },
                );
                info!(attempt = %id, tenant = %attempt.tenant_id, "withdrawal settled");
                Ok(())
            }
            SettlementStatus::Failed => {
                self.release_and_fail(id, attempt.tenant_id, "gateway reported failure".to_string());
                Ok(())
            }
            SettlementStatus::Unknown => Ok(()),
        }
    }

    fn release_and_fail(&self, id: AttemptId, tenant: TenantId, reason: String) {
        match self.ledger.release_hold(tenant, &ReferenceId::from(id)) {
            Ok(_) => {}
            // Already released or committed by whoever won the race.
            Err(Error::HoldNotFound(_)) => {}
            Err(e) => {
                warn!(attempt = %id, error = %e, "failed to release hold, leaving attempt for sweep");
                return;
            }
        }
        self.attempts.transition(
            id,
            &[
                AttemptState::Held,
                AttemptState::GatewaySubmitted,
                AttemptState::Expired,
            ],
            self.clock.now(),
            |a| {
                a.state = AttemptState::Failed;
                a.failure_reason = Some(reason.clone());
                a.needs_review = false;
            },
        );
    }

    /// Re-queries the gateway for an attempt's final status. Also the
    /// operator entry point for an `Expired` attempt: on a definitive
    /// answer the retained hold is committed or released and the review
    /// flag cleared.
    pub async fn poll_settlement(&self, id: AttemptId) {
        let Some(attempt) = self.attempts.get(id) else {
            return;
        };
        if !matches!(
            attempt.state,
            AttemptState::GatewaySubmitted | AttemptState::Expired
        ) {
            return;
        }
        let Some(reference) = attempt.gateway_reference.clone() else {
            return;
        };
        match timeout(self.config.gateway_timeout, self.gateway.query_status(reference)).await {
            Ok(Ok(status)) => {
                if let Err(e) = self.settle(id, status) {
                    warn!(attempt = %id, error = %e, "settlement could not be recorded");
                }
            }
            Ok(Err(e)) => {
                warn!(attempt = %id, error = %e, "settlement status query failed");
            }
            Err(_) => {
                warn!(attempt = %id, "settlement status query timed out");
            }
        }
    }

    /// Expires an unresolved attempt past its deadline. The hold is kept,
    /// not auto-released: funds stay reserved until an operator or a later
    /// status query resolves what the gateway actually did.
    pub(crate) fn expire(&self, id: AttemptId) {
        let applied = self.attempts.transition(
            id,
            &[
                AttemptState::PendingHold,
                AttemptState::Held,
                AttemptState::GatewaySubmitted,
            ],
            self.clock.now(),
            |a| {
                a.state = AttemptState::Expired;
                a.needs_review = true;
            },
        );
        if let Transition::Applied(attempt) = applied {
            warn!(
                attempt = %id,
                tenant = %attempt.tenant_id,
                error = %Error::ReconciliationTimeout(id.to_string()),
                "withdrawal attempt expired, hold retained"
            );
        }
    }

    pub fn attempt(&self, id: AttemptId) -> Option<WithdrawalAttempt> {
        self.attempts.get(id)
    }

    pub(crate) fn non_terminal_attempts(&self) -> Vec<WithdrawalAttempt> {
        self.attempts.snapshot(|a| !a.state.is_terminal())
    }

    /// Expired attempts whose hold is still retained and which the gateway
    /// can be asked about. Attempts that never got a gateway reference stay
    /// in manual review; there is nothing to query for them.
    pub(crate) fn unresolved_expired(&self) -> Vec<WithdrawalAttempt> {
        self.attempts.snapshot(|a| {
            a.state == AttemptState::Expired && a.needs_review && a.gateway_reference.is_some()
        })
    }

    /// Attempts awaiting a human decision, surfaced for operator tooling.
    pub fn flagged_for_review(&self) -> Vec<WithdrawalAttempt> {
        self.attempts.snapshot(|a| a.needs_review)
    }

    /// Pass-through to the gateway's supported-bank list.
    pub async fn banks(&self) -> Result<Vec<Bank>, Error> {
        match timeout(self.config.gateway_timeout, self.gateway.list_banks()).await {
            Ok(res) => res,
            Err(_) => Err(Error::GatewayUnavailable(
                "bank list request timed out".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Destination;
    use std::time::UNIX_EPOCH;

    fn attempt(tenant: u32) -> WithdrawalAttempt {
        let now = UNIX_EPOCH + Duration::from_secs(1_000);
        WithdrawalAttempt::new(
            TenantId(tenant),
            Money::parse("100").unwrap(),
            Destination {
                bank_code: "058".to_string(),
                account_number: "0123456789".to_string(),
                account_name: "Greenfield Academy".to_string(),
            },
            now,
            now + Duration::from_secs(60),
        )
    }

    #[test]
    fn second_outstanding_attempt_per_tenant_is_refused() {
        let store = AttemptStore::default();
        store.insert(attempt(1)).unwrap();
        assert!(matches!(
            store.insert(attempt(1)),
            Err(Error::WithdrawalInProgress(TenantId(1)))
        ));
        // Other tenants are unaffected.
        store.insert(attempt(2)).unwrap();
    }

    #[test]
    fn terminal_attempt_frees_the_tenant_slot() {
        let store = AttemptStore::default();
        let a = attempt(1);
        let id = a.id;
        let now = a.created_at;
        store.insert(a).unwrap();
        store.transition(id, &[AttemptState::PendingHold], now, |a| {
            a.state = AttemptState::Failed;
        });
        store.insert(attempt(1)).unwrap();
    }

    #[test]
    fn stale_transition_is_a_noop() {
        let store = AttemptStore::default();
        let a = attempt(1);
        let id = a.id;
        let now = a.created_at;
        store.insert(a).unwrap();
        let res = store.transition(id, &[AttemptState::Held], now, |a| {
            a.state = AttemptState::Succeeded;
        });
        assert!(matches!(res, Transition::Stale(AttemptState::PendingHold)));
        assert_eq!(store.get(id).unwrap().state, AttemptState::PendingHold);
    }
}

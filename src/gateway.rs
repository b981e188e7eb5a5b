use std::future::Future;
use std::sync::Arc;

use serde::Deserialize;

use crate::domain::{AttemptId, Destination, Error, GatewayReference, Money, TenantId};

/// A bank supported by the payout gateway, surfaced to callers building a
/// withdrawal form.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Bank {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct PayoutRequest {
    pub attempt_id: AttemptId,
    pub tenant_id: TenantId,
    pub amount: Money,
    pub destination: Destination,
}

/// Synchronous acknowledgement only. `Accepted` means the gateway took the
/// order, not that funds moved; settlement arrives later via webhook or poll.
#[derive(Debug, Clone)]
pub enum PayoutAck {
    Accepted { reference: GatewayReference },
    Rejected { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementStatus {
    Settled,
    Failed,
    Unknown,
}

/// External payout provider. Implementations do one network call per method
/// and report transport failures as `Error::GatewayUnavailable`; all retry
/// and timeout policy lives in the orchestrator and the sweep.
pub trait PayoutGateway: Send + Sync {
    fn submit_payout(
        &self,
        request: PayoutRequest,
    ) -> impl Future<Output = Result<PayoutAck, Error>> + Send;

    fn query_status(
        &self,
        reference: GatewayReference,
    ) -> impl Future<Output = Result<SettlementStatus, Error>> + Send;

    fn list_banks(&self) -> impl Future<Output = Result<Vec<Bank>, Error>> + Send;
}

/// A shared gateway handle is a gateway; the orchestrator and tests can
/// hold the same adapter behind an `Arc`.
impl<G: PayoutGateway> PayoutGateway for Arc<G> {
    fn submit_payout(
        &self,
        request: PayoutRequest,
    ) -> impl Future<Output = Result<PayoutAck, Error>> + Send {
        (**self).submit_payout(request)
    }

    fn query_status(
        &self,
        reference: GatewayReference,
    ) -> impl Future<Output = Result<SettlementStatus, Error>> + Send {
        (**self).query_status(reference)
    }

    fn list_banks(&self) -> impl Future<Output = Result<Vec<Bank>, Error>> + Send {
        (**self).list_banks()
    }
}

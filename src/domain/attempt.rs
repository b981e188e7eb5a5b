use std::time::SystemTime;

use serde::Deserialize;

use crate::domain::{AttemptId, Error, GatewayReference, Money, TenantId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    PendingHold,
    Held,
    GatewaySubmitted,
    Succeeded,
    Failed,
    Expired,
}

impl AttemptState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AttemptState::Succeeded | AttemptState::Failed | AttemptState::Expired
        )
    }
}

impl core::fmt::Display for AttemptState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            AttemptState::PendingHold => "pending_hold",
            AttemptState::Held => "held",
            AttemptState::GatewaySubmitted => "gateway_submitted",
            AttemptState::Succeeded => "succeeded",
            AttemptState::Failed => "failed",
            AttemptState::Expired => "expired",
        };
        f.write_str(s)
    }
}

/// Bank account a withdrawal pays out to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Destination {
    pub bank_code: String,
    pub account_number: String,
    pub account_name: String,
}

impl Destination {
    pub fn validate(&self) -> Result<(), Error> {
        if self.bank_code.trim().is_empty() {
            return Err(Error::Validation("bank code must not be empty".to_string()));
        }
        let digits = self.account_number.trim();
        if digits.len() < 6 || digits.len() > 20 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::Validation(format!(
                "account number must be 6-20 digits, got {:?}",
                self.account_number
            )));
        }
        if self.account_name.trim().is_empty() {
            return Err(Error::Validation(
                "account name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// One withdrawal request's full lifecycle. Retained permanently for audit,
/// advanced only via compare-and-swap on `state`.
#[derive(Debug, Clone)]
pub struct WithdrawalAttempt {
    pub id: AttemptId,
    pub tenant_id: TenantId,
    pub amount: Money,
    pub destination: Destination,
    pub state: AttemptState,
    pub gateway_reference: Option<GatewayReference>,
    pub failure_reason: Option<String>,
    pub needs_review: bool,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
    pub expires_at: SystemTime,
}

impl WithdrawalAttempt {
    pub fn new(
        tenant_id: TenantId,
        amount: Money,
        destination: Destination,
        now: SystemTime,
        expires_at: SystemTime,
    ) -> Self {
        Self {
            id: AttemptId::new(),
            tenant_id,
            amount,
            destination,
            state: AttemptState::PendingHold,
            gateway_reference: None,
            failure_reason: None,
            needs_review: false,
            created_at: now,
            updated_at: now,
            expires_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Destination;

    fn dest(bank: &str, number: &str, name: &str) -> Destination {
        Destination {
            bank_code: bank.to_string(),
            account_number: number.to_string(),
            account_name: name.to_string(),
        }
    }

    #[test]
    fn accepts_well_formed_destination() {
        assert!(dest("058", "0123456789", "Greenfield Academy").validate().is_ok());
    }

    #[test]
    fn rejects_bad_destinations() {
        assert!(dest("", "0123456789", "x").validate().is_err());
        assert!(dest("058", "12345", "x").validate().is_err()); // too short
        assert!(dest("058", "12345abcde", "x").validate().is_err());
        assert!(dest("058", "0123456789", "  ").validate().is_err());
    }
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A tenant is one school; the unit of wallet isolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TenantId(pub u32);

impl core::fmt::Display for TenantId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(Uuid);

impl EntryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for EntryId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttemptId(Uuid);

impl AttemptId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AttemptId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for AttemptId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Caller- or event-supplied idempotency key. Two ledger entries with the
/// same `(tenant, reference, kind)` triple are the same logical movement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReferenceId(String);

impl ReferenceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ReferenceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ReferenceId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<AttemptId> for ReferenceId {
    fn from(id: AttemptId) -> Self {
        Self(id.to_string())
    }
}

impl core::fmt::Display for ReferenceId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque correlation id issued by the payout gateway when it accepts a
/// submission; webhooks and status polls address attempts through it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GatewayReference(String);

impl From<String> for GatewayReference {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for GatewayReference {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl core::fmt::Display for GatewayReference {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

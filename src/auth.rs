use crate::domain::{Error, TenantId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    SchoolAdmin,
    Staff,
    PlatformAdmin,
}

/// Authenticated caller, as resolved by the session layer. This crate never
/// inspects cookies or tokens; it only checks the capability.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: String,
    pub tenant_id: TenantId,
    pub role: Role,
}

/// Single authorization gate for wallet operations: platform admins act on
/// any tenant, school admins only on their own. Evaluated once, before the
/// orchestrator touches the ledger.
pub fn authorize(principal: &Principal, tenant: TenantId) -> Result<(), Error> {
    match principal.role {
        Role::PlatformAdmin => Ok(()),
        Role::SchoolAdmin if principal.tenant_id == tenant => Ok(()),
        _ => Err(Error::Unauthorized(tenant)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(role: Role, tenant: u32) -> Principal {
        Principal {
            user_id: "u-1".to_string(),
            tenant_id: TenantId(tenant),
            role,
        }
    }

    #[test]
    fn school_admin_is_scoped_to_own_tenant() {
        assert!(authorize(&principal(Role::SchoolAdmin, 1), TenantId(1)).is_ok());
        assert!(authorize(&principal(Role::SchoolAdmin, 1), TenantId(2)).is_err());
    }

    #[test]
    fn platform_admin_crosses_tenants() {
        assert!(authorize(&principal(Role::PlatformAdmin, 1), TenantId(2)).is_ok());
    }

    #[test]
    fn staff_cannot_withdraw() {
        assert!(authorize(&principal(Role::Staff, 1), TenantId(1)).is_err());
    }
}

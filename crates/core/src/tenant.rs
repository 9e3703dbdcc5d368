//! Tenant identifier validation.
//!
//! Tenants scope every evaluation record. Identifiers are restricted to a
//! conservative character set so they are safe to log and to use as keys.

use crate::error::CoreError;

/// Maximum length of a tenant identifier.
pub const MAX_TENANT_LEN: usize = 63;

/// Validate a tenant identifier: 1..=63 chars of `[A-Za-z0-9_-]`.
pub fn validate_tenant(tenant: &str) -> Result<(), CoreError> {
    if tenant.is_empty() {
        return Err(CoreError::Validation("Tenant must not be empty".into()));
    }
    if tenant.len() > MAX_TENANT_LEN {
        return Err(CoreError::Validation(format!(
            "Tenant must be at most {MAX_TENANT_LEN} characters, got {}",
            tenant.len()
        )));
    }
    if let Some(bad) = tenant
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
    {
        return Err(CoreError::Validation(format!(
            "Tenant contains invalid character '{bad}'"
        )));
    }
    Ok(())
}

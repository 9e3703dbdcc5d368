//! Tenant extractor.
//!
//! Every evaluation route is tenant-scoped. The tenant travels in the
//! `x-tenant-id` header: a missing header is 401, a malformed one 400.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use fairscope_core::error::CoreError;
use fairscope_core::tenant::validate_tenant;

use crate::error::AppError;

/// Header carrying the tenant identifier.
pub const TENANT_HEADER: &str = "x-tenant-id";

/// Validated tenant identifier of the calling organization.
///
/// ```ignore
/// async fn my_handler(Tenant(tenant): Tenant) -> AppResult<Json<()>> {
///     tracing::info!(%tenant, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tenant(pub String);

impl<S: Send + Sync> FromRequestParts<S> for Tenant {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts.headers.get(TENANT_HEADER).ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(format!(
                "Missing {TENANT_HEADER} header"
            )))
        })?;

        let tenant = value.to_str().map_err(|_| {
            AppError::Core(CoreError::Validation(format!(
                "{TENANT_HEADER} header must be ASCII"
            )))
        })?;

        validate_tenant(tenant)?;
        Ok(Tenant(tenant.to_string()))
    }
}

//! Per-request context: tenant scoping, cancellation and deadline.
//!
//! The tenant is never read from a request body. An upstream interceptor
//! (the gateway middleware) resolves it from the caller's credentials and
//! places it on the context; handlers read it back through
//! [`RequestContext::tenant_id`]. There is no process-wide "current tenant".

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{ApiError, ApiResult};

/// Tenant identifier resolved from the caller's authenticated context.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TenantId(pub String);

impl TenantId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Context governing a single request from entry to response.
///
/// Cloning shares the cancellation token, so cancelling any clone cancels
/// every store and cache call made under the request.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    tenant_id: Option<TenantId>,
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// Context without a tenant. Every schedule operation rejects it.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_tenant(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: Some(TenantId(tenant_id.into())),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Tenant accessor; `None` means the interceptor chain was bypassed.
    pub fn tenant_id(&self) -> Option<&TenantId> {
        self.tenant_id.as_ref()
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Fail fast if the request has already ended.
    pub fn check(&self) -> ApiResult<()> {
        if self.cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(ApiError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Drive `fut` to completion unless the request is cancelled or its
    /// deadline passes first, in which case `fut` is dropped.
    pub async fn run<T, F>(&self, fut: F) -> ApiResult<T>
    where
        F: Future<Output = ApiResult<T>>,
    {
        self.check()?;
        match self.deadline {
            Some(deadline) => tokio::select! {
                res = fut => res,
                () = self.cancel.cancelled() => Err(ApiError::Cancelled),
                () = tokio::time::sleep_until(deadline) => Err(ApiError::DeadlineExceeded),
            },
            None => tokio::select! {
                res = fut => res,
                () = self.cancel.cancelled() => Err(ApiError::Cancelled),
            },
        }
    }
}

/// Read the tenant from the context, rejecting the request when absent.
///
/// `operation` names the handler for the security log line.
pub fn require_tenant<'a>(ctx: &'a RequestContext, operation: &str) -> ApiResult<&'a TenantId> {
    ctx.tenant_id().ok_or_else(|| {
        // The gateway middleware should either fail or set it.
        tracing::warn!(
            security = true,
            operation = operation,
            "Tenant ID is not present in context"
        );
        ApiError::unauthenticated("Tenant ID is not present in context")
    })
}

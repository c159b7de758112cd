//! Tenant resolution middleware.
//!
//! With `gateway.jwt_secret` set, the tenant is the `tenant_id` claim of a
//! validated bearer JWT and the tenant header is ignored. Without a secret
//! the service sits behind a trusted proxy and the tenant header is used.
//! The resolved [`TenantId`] is stored in request extensions; requests
//! without one pass through and the handlers reject them.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

#[cfg(feature = "gateway")]
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::tenant::TenantId;
use crate::AppState;

/// Authentication error response.
#[derive(Debug, Serialize)]
pub struct AuthError {
    pub error: String,
    pub message: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (StatusCode::UNAUTHORIZED, Json(self)).into_response()
    }
}

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID).
    pub sub: String,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// Project the caller acts in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}

/// Generate a JWT token.
#[cfg(feature = "gateway")]
pub fn generate_jwt(
    user_id: &str,
    tenant_id: Option<&str>,
    secret: &str,
    expiry_secs: i64,
) -> anyhow::Result<String> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        exp: now + expiry_secs,
        iat: now,
        tenant_id: tenant_id.map(String::from),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

/// Validate a JWT token.
#[cfg(feature = "gateway")]
pub fn validate_jwt(token: &str, secret: &str) -> anyhow::Result<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

#[cfg(not(feature = "gateway"))]
pub fn generate_jwt(
    _user_id: &str,
    _tenant_id: Option<&str>,
    _secret: &str,
    _expiry_secs: i64,
) -> anyhow::Result<String> {
    Err(anyhow::anyhow!("JWT support requires 'gateway' feature"))
}

#[cfg(not(feature = "gateway"))]
pub fn validate_jwt(_token: &str, _secret: &str) -> anyhow::Result<Claims> {
    Err(anyhow::anyhow!("JWT support requires 'gateway' feature"))
}

fn bearer_token(req: &Request<Body>) -> Option<&str> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

fn header_tenant(req: &Request<Body>, header: &str) -> Option<TenantId> {
    req.headers()
        .get(header)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| TenantId(v.to_owned()))
}

/// Resolve the caller's tenant and place it in request extensions.
pub async fn tenant_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let tenant = match state.config.gateway.jwt_secret.as_deref() {
        Some(secret) => match bearer_token(&req) {
            Some(token) => {
                let claims = validate_jwt(token, secret).map_err(|e| {
                    tracing::warn!(security = true, error = %e, "rejected bearer token");
                    AuthError {
                        error: "invalid_token".to_string(),
                        message: format!("JWT validation failed: {e}"),
                    }
                })?;
                claims
                    .tenant_id
                    .filter(|t| !t.is_empty())
                    .map(TenantId)
            }
            None => None,
        },
        None => header_tenant(&req, &state.config.gateway.tenant_header),
    };

    if let Some(tenant) = tenant {
        req.extensions_mut().insert(tenant);
    }
    Ok(next.run(req).await)
}

#[cfg(all(test, feature = "gateway"))]
mod tests {
    use super::*;

    #[test]
    fn test_jwt_round_trip_carries_tenant() {
        let token = generate_jwt("user-1", Some("t1"), "secret", 60).unwrap();
        let claims = validate_jwt(&token, "secret").unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.tenant_id.as_deref(), Some("t1"));
    }

    #[test]
    fn test_jwt_rejects_wrong_secret() {
        let token = generate_jwt("user-1", Some("t1"), "secret", 60).unwrap();
        assert!(validate_jwt(&token, "other").is_err());
    }

    #[test]
    fn test_header_tenant_ignores_blank() {
        let req = Request::builder()
            .header("ActiveProjectID", "  ")
            .body(Body::empty())
            .unwrap();
        assert!(header_tenant(&req, "ActiveProjectID").is_none());

        let req = Request::builder()
            .header("ActiveProjectID", "t1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(header_tenant(&req, "ActiveProjectID"), Some(TenantId("t1".into())));
    }
}

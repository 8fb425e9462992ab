//! Access guard: origin allow-list and optional bearer token.
//!
//! Every request passes through [`access_guard`], which runs the guards in [`GUARDS`] in order and
//! stops at the first rejection. CORS preflight requests never get this far: the CORS layer
//! wrapped around the router answers them first.

use std::collections::HashSet;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use tracing::trace;

use crate::AppState;
use crate::config::Config;
use crate::errors::{Error, Result};

/// Process-wide access configuration, built once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessPolicy {
    /// Exact `Origin` header values allowed to call the API
    pub allowed_origins: HashSet<String>,
    /// When set, every request needs `Authorization: Bearer <token>`
    pub bearer_token: Option<String>,
}

impl AccessPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            allowed_origins: config.cors.allowed_origins.iter().cloned().collect(),
            bearer_token: config.upload_token.clone().filter(|token| !token.is_empty()),
        }
    }
}

/// A single access check over the request headers.
pub type Guard = fn(&AccessPolicy, &HeaderMap) -> Result<()>;

/// Guards applied to every request, in order.
pub const GUARDS: [Guard; 2] = [check_origin, check_bearer_token];

/// Requests without an `Origin` header (curl, server-to-server) are always allowed. Otherwise the
/// origin must equal one allow-listed value exactly.
pub fn check_origin(policy: &AccessPolicy, headers: &HeaderMap) -> Result<()> {
    let Some(origin) = headers.get(header::ORIGIN) else {
        return Ok(());
    };

    let origin = String::from_utf8_lossy(origin.as_bytes());
    if policy.allowed_origins.contains(origin.as_ref()) {
        Ok(())
    } else {
        Err(Error::CorsRejected {
            origin: origin.into_owned(),
        })
    }
}

/// Skipped when no token is configured.
pub fn check_bearer_token(policy: &AccessPolicy, headers: &HeaderMap) -> Result<()> {
    let Some(token) = policy.bearer_token.as_deref() else {
        return Ok(());
    };

    let expected = format!("Bearer {token}");
    let provided = headers.get(header::AUTHORIZATION).map(|value| value.as_bytes()).unwrap_or_default();

    if provided == expected.as_bytes() {
        Ok(())
    } else {
        Err(Error::Unauthorized)
    }
}

/// Middleware running [`GUARDS`] before the route handler.
pub async fn access_guard(State(state): State<AppState>, request: Request, next: Next) -> std::result::Result<Response, Error> {
    for guard in GUARDS {
        guard(&state.policy, request.headers())?;
    }
    trace!(path = %request.uri().path(), "Request passed access guard");
    Ok(next.run(request).await)
}

//! Bearer token middleware.
//!
//! Protected routes run [`require_identity`]; routes that also serve
//! anonymous callers run [`optional_identity`]. Both resolve the token with
//! the configured [`IdentityVerifier`](namma_suraksha::IdentityVerifier) and
//! put the resulting [`Identity`] into request extensions, where handlers
//! pick it up with [`CurrentIdentity`] or [`MaybeIdentity`].
//!
//! ```rust,no_run
//! use axum::{Router, routing::get, middleware};
//! # use ns_server::api::middleware::{CurrentIdentity, require_identity};
//! # use ns_server::api::AppState;
//! # let state: AppState = unimplemented!();
//!
//! async fn whoami(CurrentIdentity(identity): CurrentIdentity) -> String {
//!     identity.subject
//! }
//!
//! let protected: Router<AppState> = Router::new()
//!     .route("/whoami", get(whoami))
//!     .route_layer(middleware::from_fn_with_state(state, require_identity));
//! # let _ = protected;
//! ```

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use namma_suraksha::Identity;

use super::{AppState, error::ApiError, request_id::RequestId};
use crate::{logging::log_security_event, metrics};

/// Bearer token from the `Authorization` header
///
/// `Ok(None)` when the header is absent, `Err` when it is present but not a
/// usable bearer credential.
fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, ()> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(Some)
        .ok_or(())
}

/// Verify `token` and attach the identity, logging rejections
async fn attach_identity(
    state: &AppState,
    request: &mut Request,
    token: &str,
) -> Result<(), ApiError> {
    match state.verifier.authenticate(token).await {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            Ok(())
        }
        Err(err) => {
            reject(request, &err.to_string());
            Err(ApiError::authentication_required())
        }
    }
}

fn reject(request: &Request, reason: &str) {
    let request_id = request.extensions().get::<RequestId>().map(RequestId::as_str);
    log_security_event("rejected_token", None, request_id, reason);
    metrics::rejected_tokens_total();
}

/// Reject the request with 401 unless it carries a valid bearer token
///
/// # Behavior
///
/// - **Valid token**: inserts [`Identity`] into request extensions and calls the handler
/// - **Missing header, malformed header, invalid or expired token**: `401 {"message": "Authentication required"}`
pub async fn require_identity(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = match bearer_token(request.headers()) {
        Ok(Some(token)) => token.to_string(),
        Ok(None) => {
            reject(&request, "missing bearer token");
            return Err(ApiError::authentication_required());
        }
        Err(()) => {
            reject(&request, "malformed authorization header");
            return Err(ApiError::authentication_required());
        }
    };

    attach_identity(&state, &mut request, &token).await?;
    Ok(next.run(request).await)
}

/// Attach an identity when a bearer token is present
///
/// Requests without an `Authorization` header pass through anonymously; a
/// header that is present but invalid is still rejected with 401.
pub async fn optional_identity(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = match bearer_token(request.headers()) {
        Ok(Some(token)) => token.to_string(),
        Ok(None) => return Ok(next.run(request).await),
        Err(()) => {
            reject(&request, "malformed authorization header");
            return Err(ApiError::authentication_required());
        }
    };

    attach_identity(&state, &mut request, &token).await?;
    Ok(next.run(request).await)
}

/// Identity of an authenticated caller
#[derive(Debug, Clone)]
pub struct CurrentIdentity(pub Identity);

impl<S> FromRequestParts<S> for CurrentIdentity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(CurrentIdentity)
            .ok_or_else(ApiError::authentication_required)
    }
}

/// Identity of the caller, if one signed in
#[derive(Debug, Clone)]
pub struct MaybeIdentity(pub Option<Identity>);

impl<S> FromRequestParts<S> for MaybeIdentity
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeIdentity(parts.extensions.get::<Identity>().cloned()))
    }
}

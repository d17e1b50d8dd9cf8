use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use foodgram_types::api::Claims;

use crate::auth::{AppState, decode_token};
use crate::error::ApiError;

/// Who is making the request. Resolved once per request by
/// [`resolve_actor`] and passed to handlers as an ordinary argument.
#[derive(Debug, Clone)]
pub enum Actor {
    Anonymous,
    User(Claims),
}

impl Actor {
    pub fn user_id(&self) -> Option<i64> {
        match self {
            Self::Anonymous => None,
            Self::User(claims) => Some(claims.sub),
        }
    }

    pub fn require(&self) -> Result<&Claims, ApiError> {
        match self {
            Self::Anonymous => Err(ApiError::Unauthenticated),
            Self::User(claims) => Ok(claims),
        }
    }
}

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<Actor>()
            .cloned()
            .unwrap_or(Actor::Anonymous))
    }
}

/// Capability a route demands before its handler runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Anonymous,
    Authenticated,
}

/// Decode the `Authorization` header into an [`Actor`].
///
/// No header means anonymous. A header that is present but unusable is
/// rejected rather than silently downgraded. Both `Bearer <jwt>` and
/// `Token <jwt>` schemes are accepted.
pub async fn resolve_actor(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let actor = match req.headers().get(header::AUTHORIZATION) {
        None => Actor::Anonymous,
        Some(value) => {
            let value = value.to_str().map_err(|_| ApiError::Unauthenticated)?;
            let token = value
                .strip_prefix("Bearer ")
                .or_else(|| value.strip_prefix("Token "))
                .ok_or(ApiError::Unauthenticated)?;
            let claims = decode_token(&state.jwt_secret, token.trim()).inspect_err(|_| {
                warn!("Rejected invalid or expired token");
            })?;
            Actor::User(claims)
        }
    };

    req.extensions_mut().insert(actor);
    Ok(next.run(req).await)
}

/// The single permission check every route goes through.
pub async fn guard(
    State(access): State<Access>,
    actor: Actor,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if access == Access::Authenticated {
        actor.require()?;
    }
    Ok(next.run(req).await)
}

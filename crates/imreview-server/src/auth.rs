//! Caller identity from the Authorization header
//!
//! Identity is established upstream; requests carry the caller's user id as
//! `Authorization: Bearer <uuid>`. Each request gets its own correlation id
//! so the audit events it produces can be grouped.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::header::AUTHORIZATION;

use imreview_core::{RequestContext, UserId};

use crate::error::ApiError;

/// The authenticated caller of a request
#[derive(Debug, Clone)]
pub struct Caller(pub RequestContext);

/// A caller that may be absent, for endpoints where the path token is the
/// credential
#[derive(Debug, Clone)]
pub struct MaybeCaller(pub Option<RequestContext>);

/// Parse `Bearer <uuid>` into a user id
pub fn parse_bearer(header: &str) -> Option<UserId> {
    let token = header.strip_prefix("Bearer ")?;
    UserId::parse(token).ok()
}

/// Generate a correlation id for one request
pub fn request_id() -> String {
    format!("req-{}", uuid::Uuid::new_v4().simple())
}

fn context_from(parts: &Parts) -> Result<Option<RequestContext>, ApiError> {
    let Some(header) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let user_id = header
        .to_str()
        .ok()
        .and_then(parse_bearer)
        .ok_or(ApiError::Unauthenticated)?;
    Ok(Some(RequestContext::new(user_id).with_request_id(request_id())))
}

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        context_from(parts)?
            .map(Caller)
            .ok_or(ApiError::Unauthenticated)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for MaybeCaller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeCaller(context_from(parts)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bearer() {
        let id = UserId::new();
        assert_eq!(parse_bearer(&format!("Bearer {}", id)), Some(id));
        assert_eq!(parse_bearer(&id.to_string()), None);
        assert_eq!(parse_bearer("Bearer not-a-uuid"), None);
    }

    #[test]
    fn test_request_ids_are_unique() {
        let a = request_id();
        assert!(a.starts_with("req-"));
        assert_ne!(a, request_id());
    }
}

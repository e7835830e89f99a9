use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};

use crate::error::AppError;

pub const RATER_ID_HEADER: &str = "X-Rater-Id";

/// The configured write credential. Fixed at startup.
#[derive(Clone)]
pub struct BearerToken(Arc<str>);

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Arc::from(token.into()))
    }

    pub fn verify(&self, authorization: Option<&str>) -> bool {
        authorization
            .and_then(|value| value.strip_prefix("Bearer "))
            .is_some_and(|presented| presented.trim() == &*self.0)
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BearerToken(..)")
    }
}

/// Rejects the request unless it carries the configured bearer token.
pub struct RequireBearer;

impl<S> FromRequestParts<S> for RequireBearer
where
    S: Send + Sync,
    BearerToken: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = BearerToken::from_ref(state);
        if token.verify(header_str(&parts.headers, AUTHORIZATION.as_str())) {
            Ok(Self)
        } else {
            Err(AppError::Unauthorized)
        }
    }
}

/// Caller identity for rating operations, from `X-Rater-Id`.
#[derive(Clone, Debug)]
pub struct RaterId(pub String);

impl<S> FromRequestParts<S> for RaterId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        header_str(&parts.headers, RATER_ID_HEADER)
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| Self(id.to_string()))
            .ok_or(AppError::Unauthorized)
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_requires_prefix_and_exact_token() {
        let token = BearerToken::new("s3cret");
        assert!(token.verify(Some("Bearer s3cret")));
        assert!(token.verify(Some("Bearer   s3cret  ")));
        assert!(!token.verify(Some("bearer s3cret")));
        assert!(!token.verify(Some("s3cret")));
        assert!(!token.verify(Some("Bearer s3cret2")));
        assert!(!token.verify(Some("Bearer ")));
        assert!(!token.verify(None));
    }

    #[test]
    fn debug_hides_token() {
        assert_eq!(format!("{:?}", BearerToken::new("s3cret")), "BearerToken(..)");
    }
}

//! Bearer-token authentication.

use std::collections::HashMap;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use study_core::model::UserId;
use thiserror::Error;

use crate::error::ApiError;
use crate::state::AppState;

/// Resolves request headers to the calling user.
pub trait IdentityProvider: Send + Sync {
    fn identify(&self, headers: &HeaderMap) -> Option<UserId>;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TokenConfigError {
    #[error("expected <token>=<user>, got {0:?}")]
    Malformed(String),
    #[error("token for {0:?} is empty")]
    EmptyToken(String),
}

/// Fixed bearer-token to user map.
#[derive(Debug, Clone, Default)]
pub struct StaticTokens {
    tokens: HashMap<String, UserId>,
}

impl StaticTokens {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, token: impl Into<String>, user: UserId) -> Self {
        self.insert(token, user);
        self
    }

    pub fn insert(&mut self, token: impl Into<String>, user: UserId) {
        self.tokens.insert(token.into(), user);
    }

    /// Add one `<token>=<user>` pair.
    ///
    /// # Errors
    ///
    /// Returns `TokenConfigError` if the pair is malformed or either side is blank.
    pub fn insert_pair(&mut self, pair: &str) -> Result<(), TokenConfigError> {
        let (token, user) = pair
            .split_once('=')
            .ok_or_else(|| TokenConfigError::Malformed(pair.to_owned()))?;
        let user = UserId::new(user).map_err(|_| TokenConfigError::Malformed(pair.to_owned()))?;
        let token = token.trim();
        if token.is_empty() {
            return Err(TokenConfigError::EmptyToken(user.to_string()));
        }
        self.insert(token, user);
        Ok(())
    }

    /// Parse a comma-separated list of `<token>=<user>` pairs.
    ///
    /// # Errors
    ///
    /// Returns the first `TokenConfigError` encountered.
    pub fn parse_list(raw: &str) -> Result<Self, TokenConfigError> {
        let mut tokens = Self::new();
        for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            tokens.insert_pair(pair)?;
        }
        Ok(tokens)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Some(token.trim()).filter(|t| !t.is_empty())
}

impl IdentityProvider for StaticTokens {
    fn identify(&self, headers: &HeaderMap) -> Option<UserId> {
        bearer(headers).and_then(|token| self.tokens.get(token).cloned())
    }
}

/// The authenticated caller of a request.
#[derive(Debug, Clone)]
pub struct Caller(pub UserId);

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        state
            .identify(&parts.headers)
            .map(Caller)
            .ok_or(ApiError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn parses_token_list() {
        let tokens = StaticTokens::parse_list("abc=alice, def=bob,").unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(
            tokens.identify(&headers("Bearer def")),
            Some(UserId::new("bob").unwrap())
        );
    }

    #[test]
    fn rejects_malformed_pairs() {
        assert!(matches!(
            StaticTokens::parse_list("abc"),
            Err(TokenConfigError::Malformed(_))
        ));
        assert!(matches!(
            StaticTokens::parse_list("abc= "),
            Err(TokenConfigError::Malformed(_))
        ));
        assert!(matches!(
            StaticTokens::parse_list(" =alice"),
            Err(TokenConfigError::EmptyToken(_))
        ));
    }

    #[test]
    fn unknown_or_missing_tokens_resolve_to_nobody() {
        let tokens = StaticTokens::new().with("abc", UserId::new("alice").unwrap());
        assert_eq!(tokens.identify(&HeaderMap::new()), None);
        assert_eq!(tokens.identify(&headers("Bearer nope")), None);
        assert_eq!(tokens.identify(&headers("Basic abc")), None);
        assert!(tokens.identify(&headers("bearer abc")).is_some());
    }
}

//! Token authentication.
//!
//! Handlers receive a [`RequestContext`] describing who is calling. Tokens are
//! sent as `Authorization: Token <key>` (or `Bearer <key>`) and are looked up in
//! the `auth_tokens` table; issuing them happens elsewhere.

use std::sync::OnceLock;

use actix_web::{
    dev::Payload,
    http::header::{self, HeaderMap},
    web, FromRequest, HttpRequest,
};
use futures::future::{ready, LocalBoxFuture};
use regex::Regex;

use crate::actions;
use crate::error::ApiError;
use crate::models::User;
use crate::DbPool;

const NO_CREDENTIALS: &str = "Authentication credentials were not provided.";
const INVALID_TOKEN: &str = "Invalid token.";
const INACTIVE_USER: &str = "User inactive or deleted.";
const MISSING_KEY: &str = "Invalid token header. No credentials provided.";
const SPACES_IN_KEY: &str = "Invalid token header. Token string should not contain spaces.";
const BAD_CHARACTERS: &str =
    "Invalid token header. Token string should not contain invalid characters.";

/// The authenticated user behind a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub id: i32,
    pub username: String,
}

impl From<User> for Caller {
    fn from(user: User) -> Self {
        Caller {
            id: user.id,
            username: user.username,
        }
    }
}

/// Per-request context. Anonymous when no `Authorization` header is sent; a
/// header that is present but wrong rejects the request outright.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    caller: Option<Caller>,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(caller: Caller) -> Self {
        Self {
            caller: Some(caller),
        }
    }

    pub fn caller(&self) -> Option<&Caller> {
        self.caller.as_ref()
    }

    pub fn require_caller(&self) -> Result<&Caller, ApiError> {
        self.caller
            .as_ref()
            .ok_or(ApiError::NotAuthenticated(NO_CREDENTIALS))
    }
}

fn scheme_regex() -> &'static Regex {
    static SCHEME: OnceLock<Regex> = OnceLock::new();
    SCHEME.get_or_init(|| {
        Regex::new(r"^(?i:token|bearer)(?:\s+(.*?))?\s*$").expect("token scheme regex is valid")
    })
}

/// Extracts the token key from an `Authorization` header value.
///
/// Returns `Ok(None)` for other schemes so they are treated as anonymous.
pub fn parse_authorization(value: &str) -> Result<Option<&str>, ApiError> {
    let Some(captures) = scheme_regex().captures(value.trim_start()) else {
        return Ok(None);
    };

    let key = captures.get(1).map_or("", |m| m.as_str());
    if key.is_empty() {
        return Err(ApiError::NotAuthenticated(MISSING_KEY));
    }
    if key.split_whitespace().nth(1).is_some() {
        return Err(ApiError::NotAuthenticated(SPACES_IN_KEY));
    }

    Ok(Some(key))
}

fn token_from_headers(headers: &HeaderMap) -> Result<Option<String>, ApiError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| ApiError::NotAuthenticated(BAD_CHARACTERS))?;

    Ok(parse_authorization(value)?.map(str::to_owned))
}

/// Resolves a token key to the user it belongs to.
pub fn authenticate(pool: &DbPool, key: &str) -> Result<Caller, ApiError> {
    let mut conn = pool.get()?;

    match actions::get_user_by_token(&mut conn, key)? {
        None => Err(ApiError::NotAuthenticated(INVALID_TOKEN)),
        Some(user) if !user.is_active => Err(ApiError::NotAuthenticated(INACTIVE_USER)),
        Some(user) => Ok(Caller::from(user)),
    }
}

impl FromRequest for RequestContext {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let key = match token_from_headers(req.headers()) {
            Ok(Some(key)) => key,
            Ok(None) => return Box::pin(ready(Ok(RequestContext::anonymous()))),
            Err(e) => return Box::pin(ready(Err(e))),
        };
        let pool = req.app_data::<web::Data<DbPool>>().cloned();

        Box::pin(async move {
            let pool = pool
                .ok_or_else(|| ApiError::Internal("database pool is not configured".into()))?;
            let caller = web::block(move || authenticate(&pool, &key)).await??;
            Ok(RequestContext::authenticated(caller))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::header::HeaderValue;

    fn rejection(value: &str) -> &'static str {
        match parse_authorization(value) {
            Err(ApiError::NotAuthenticated(detail)) => detail,
            other => panic!("expected rejection for {:?}, got {:?}", value, other),
        }
    }

    #[test]
    fn reads_token_and_bearer_schemes() {
        assert_eq!(parse_authorization("Token abc123").unwrap(), Some("abc123"));
        assert_eq!(parse_authorization("token abc123").unwrap(), Some("abc123"));
        assert_eq!(parse_authorization("Bearer  abc123 ").unwrap(), Some("abc123"));
    }

    #[test]
    fn other_schemes_are_anonymous() {
        assert_eq!(parse_authorization("Basic dXNlcjpwYXNz").unwrap(), None);
        assert_eq!(parse_authorization("Tokenabc").unwrap(), None);
        assert_eq!(parse_authorization("").unwrap(), None);
    }

    #[test]
    fn malformed_token_headers_are_rejected() {
        assert_eq!(rejection("Token"), MISSING_KEY);
        assert_eq!(rejection("Token   "), MISSING_KEY);
        assert_eq!(rejection("Token abc def"), SPACES_IN_KEY);
    }

    #[test]
    fn missing_header_means_anonymous() {
        let headers = HeaderMap::new();
        assert_eq!(token_from_headers(&headers).unwrap(), None);
    }

    #[test]
    fn non_ascii_header_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_bytes(b"Token \xffkey").unwrap(),
        );

        assert!(matches!(
            token_from_headers(&headers),
            Err(ApiError::NotAuthenticated(BAD_CHARACTERS))
        ));
    }

    #[test]
    fn anonymous_context_requires_credentials() {
        let ctx = RequestContext::anonymous();
        assert!(ctx.caller().is_none());
        assert!(matches!(
            ctx.require_caller(),
            Err(ApiError::NotAuthenticated(NO_CREDENTIALS))
        ));

        let ctx = RequestContext::authenticated(Caller {
            id: 1,
            username: "ada".to_string(),
        });
        assert_eq!(ctx.require_caller().unwrap().id, 1);
    }
}

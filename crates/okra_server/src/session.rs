//! Researcher login sessions and device authentication.
//!
//! # Responsibility
//! - Gate researcher views behind the `okra_session` cookie.
//! - Resolve `Authorization: Bearer <device key>` to a participant.
//!
//! # Invariants
//! - Unauthenticated researcher requests get `302 /login?next=<path>`.
//! - Redirect targets accepted from clients are local absolute paths only.

use crate::error::ApiError;
use crate::state::SharedState;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::{AUTHORIZATION, COOKIE, LOCATION};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use log::debug;
use okra_core::{
    AuthService, Participant, ParticipantService, SqliteParticipantRepository,
    SqliteUserRepository, User,
};

pub const SESSION_COOKIE: &str = "okra_session";
pub const LOGIN_PATH: &str = "/login";
pub const DEFAULT_LANDING: &str = "/experiments";

/// Researcher resolved from the session cookie.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Participant resolved from the device key.
#[derive(Debug, Clone)]
pub struct Device(pub Participant);

/// Middleware for researcher-only routes.
pub async fn require_login(
    State(state): State<SharedState>,
    mut request: Request,
    next: Next,
) -> Response {
    let user = match session_token(request.headers()) {
        Some(token) => match resolve_session(&state, token) {
            Ok(user) => user,
            Err(err) => return err.into_response(),
        },
        None => None,
    };

    match user {
        Some(user) => {
            request.extensions_mut().insert(CurrentUser(user));
            next.run(request).await
        }
        None => {
            let target = request
                .uri()
                .path_and_query()
                .map(|value| value.as_str())
                .unwrap_or("/");
            debug!("event=login_required module=http status=ok path={}", request.uri().path());
            found(&login_redirect(target))
        }
    }
}

fn resolve_session(state: &SharedState, token: &str) -> Result<Option<User>, ApiError> {
    state.with_db(|conn| {
        let service = AuthService::new(SqliteUserRepository::try_new(conn)?, state.session_ttl());
        Ok(service.authenticate_session(token)?)
    })
}

impl FromRequestParts<SharedState> for Device {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let Some(device_key) = bearer_token(&parts.headers) else {
            return Err(ApiError::unauthorized("missing device key"));
        };
        state.with_db(|conn| {
            let service = ParticipantService::new(SqliteParticipantRepository::try_new(conn)?);
            Ok(Device(service.authenticate_device(device_key)?))
        })
    }
}

/// Session token from the request's `Cookie` headers.
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

/// Device key from `Authorization: Bearer <key>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

pub fn session_cookie(token: &str, max_age_secs: u64) -> String {
    format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}")
}

pub fn cleared_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// `/login?next=<target>`, with `/` left unescaped.
pub fn login_redirect(target: &str) -> String {
    let encoded = urlencoding::encode(target).replace("%2F", "/");
    format!("{LOGIN_PATH}?next={encoded}")
}

/// Accepts `next` only when it stays on this host.
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path
        }
        _ => DEFAULT_LANDING,
    }
}

/// Plain `302 Found` to `location`.
pub fn found(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::FOUND, [(LOCATION, value)]).into_response(),
        Err(err) => ApiError::internal(err).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::{bearer_token, login_redirect, safe_next, session_cookie, session_token};
    use axum::http::header::{AUTHORIZATION, COOKIE};
    use axum::http::{HeaderMap, HeaderValue};

    #[test]
    fn session_token_is_found_among_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("theme=dark"));
        headers.append(
            COOKIE,
            HeaderValue::from_static("lang=en; okra_session=abc123; other=1"),
        );
        assert_eq!(session_token(&headers), Some("abc123"));
    }

    #[test]
    fn empty_or_missing_session_cookie_is_none() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_token(&headers), None);
        headers.insert(COOKIE, HeaderValue::from_static("okra_session="));
        assert_eq!(session_token(&headers), None);
    }

    #[test]
    fn bearer_token_requires_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer key123"));
        assert_eq!(bearer_token(&headers), Some("key123"));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic key123"));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn session_cookie_is_http_only() {
        let cookie = session_cookie("tok", 60);
        assert!(cookie.starts_with("okra_session=tok;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
    }

    #[test]
    fn login_redirect_encodes_the_target() {
        assert_eq!(login_redirect("/experiments"), "/login?next=/experiments");
        assert_eq!(
            login_redirect("/experiments?a=1&b=2"),
            "/login?next=/experiments%3Fa%3D1%26b%3D2"
        );
    }

    #[test]
    fn safe_next_rejects_foreign_targets() {
        assert_eq!(safe_next(Some("/participants")), "/participants");
        assert_eq!(safe_next(Some("//evil.example")), "/experiments");
        assert_eq!(safe_next(Some("https://evil.example")), "/experiments");
        assert_eq!(safe_next(None), "/experiments");
    }
}

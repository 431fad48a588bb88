//! Researcher login and logout.

use super::ApiResult;
use crate::error::ApiError;
use crate::session::{cleared_session_cookie, found, safe_next, session_cookie, session_token, LOGIN_PATH};
use crate::state::SharedState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, HeaderValue};
use axum::response::Response;
use axum::Json;
use okra_core::{AuthService, SqliteUserRepository};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub(super) struct LoginQuery {
    next: Option<String>,
}

#[derive(Deserialize)]
pub(super) struct Credentials {
    username: String,
    password: String,
}

/// Tells the client where a successful login will land.
pub(super) async fn login_page(Query(query): Query<LoginQuery>) -> Json<Value> {
    Json(json!({ "next": safe_next(query.next.as_deref()) }))
}

pub(super) async fn login(
    State(state): State<SharedState>,
    Query(query): Query<LoginQuery>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(credentials) = payload?;
    let session = state.with_db(|conn| {
        let service = AuthService::new(SqliteUserRepository::try_new(conn)?, state.session_ttl());
        Ok::<_, ApiError>(service.login(&credentials.username, &credentials.password)?)
    })?;

    let mut response = found(safe_next(query.next.as_deref()));
    let cookie = session_cookie(&session.token, state.session_ttl().as_secs());
    response.headers_mut().insert(
        SET_COOKIE,
        HeaderValue::from_str(&cookie).map_err(ApiError::internal)?,
    );
    Ok(response)
}

pub(super) async fn logout(State(state): State<SharedState>, headers: HeaderMap) -> ApiResult<Response> {
    if let Some(token) = session_token(&headers) {
        state.with_db(|conn| {
            let service =
                AuthService::new(SqliteUserRepository::try_new(conn)?, state.session_ttl());
            Ok::<_, ApiError>(service.logout(token)?)
        })?;
    }

    let mut response = found(LOGIN_PATH);
    response.headers_mut().insert(
        SET_COOKIE,
        HeaderValue::from_str(&cleared_session_cookie()).map_err(ApiError::internal)?,
    );
    Ok(response)
}

use crate::session::{Phase, Session, SessionError};
use crate::state;
use crate::templates;

use axum::Json;
use axum::body::Body;
use axum::extract::Form;
use axum::extract::Query;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::HeaderValue;
use axum::http::Request;
use axum::http::StatusCode;
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use serde::Deserialize;
use serde::Serialize;

#[derive(Serialize)]
struct AuthErrorResponse {
    error: &'static str,
}

/// Rebuilds the session from the auth cookie and the stored user record and
/// hands it to the handlers as a request extension. Requests without a live
/// session are sent to the login page.
pub(crate) async fn session_middleware(
    State(state): State<state::AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let path = req.uri().path();
    if is_public_path(path) {
        return next.run(req).await;
    }
    let wants_json = path == "/events";

    let session = match auth_cookie(req.headers(), state.auth.cookie_name()) {
        Some(token) => match state.auth.verify_token(token) {
            Ok(username) => match Session::restore(&state.store, &username).await {
                Ok(session) => session,
                Err(err) => {
                    tracing::error!(%username, %err, "failed to load session user");
                    return (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response();
                }
            },
            Err(err) => {
                tracing::warn!(%err, "rejected auth cookie");
                Session::new()
            }
        },
        None => Session::new(),
    };

    if session.phase() == Phase::LoggedOut {
        if wants_json {
            return (
                StatusCode::UNAUTHORIZED,
                Json(AuthErrorResponse {
                    error: "unauthorized",
                }),
            )
                .into_response();
        }
        return Redirect::to("/login").into_response();
    }

    req.extensions_mut().insert(session);
    next.run(req).await
}

fn is_public_path(path: &str) -> bool {
    path == "/login" || path == "/logout" || path == "/health" || path.starts_with("/static/")
}

fn auth_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    for header in headers.get_all(COOKIE).iter() {
        if let Ok(raw) = header.to_str()
            && let Some(value) = cookie_from_header(raw, name)
        {
            return Some(value);
        }
    }
    None
}

fn cookie_from_header<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    for part in header.split(';') {
        let trimmed = part.trim();
        if let Some((cookie_name, cookie_value)) = trimmed.split_once('=')
            && cookie_name == name
            && !cookie_value.is_empty()
        {
            return Some(cookie_value);
        }
    }
    None
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginQuery {
    declined: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginForm {
    username: String,
    password: String,
}

pub(crate) async fn login_form(
    State(state): State<state::AppState>,
    Query(query): Query<LoginQuery>,
) -> templates::LoginTemplate {
    templates::LoginTemplate {
        app_name: state.config.app_name,
        error: String::new(),
        declined: query.declined.is_some_and(|flag| flag == "1"),
    }
}

pub(crate) async fn login_submit(
    State(state): State<state::AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Response, (StatusCode, templates::LoginTemplate)> {
    let mut session = Session::new();
    match session
        .login(&state.store, &form.username, &form.password)
        .await
    {
        Ok(_) => {}
        Err(SessionError::InvalidCredentials) => {
            return Err(login_error(
                &state.config.app_name,
                StatusCode::UNAUTHORIZED,
                "Invalid credentials",
            ));
        }
        Err(err) => {
            tracing::error!(%err, "login failed");
            return Err(login_error(
                &state.config.app_name,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to sign in.",
            ));
        }
    }

    let token = match state.auth.issue_token(&form.username) {
        Ok(token) => token,
        Err(err) => {
            tracing::error!(%err, "failed to issue auth token");
            return Err(login_error(
                &state.config.app_name,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to sign in.",
            ));
        }
    };

    tracing::info!(username = %form.username, phase = ?session.phase(), "user logged in");
    let mut response = Redirect::to("/").into_response();
    let cookie = state.auth.auth_cookie(&token);
    response.headers_mut().append(
        SET_COOKIE,
        HeaderValue::from_str(&cookie).expect("auth cookie header"),
    );
    Ok(response)
}

pub(crate) async fn logout(State(state): State<state::AppState>) -> Response {
    clear_session(&state, "/login")
}

/// Redirects to `location` while dropping the auth cookie.
pub(crate) fn clear_session(state: &state::AppState, location: &str) -> Response {
    let mut response = Redirect::to(location).into_response();
    let cookie = state.auth.clear_cookie();
    response.headers_mut().append(
        SET_COOKIE,
        HeaderValue::from_str(&cookie).expect("logout cookie header"),
    );
    response
}

fn login_error(
    app_name: &str,
    status: StatusCode,
    message: &str,
) -> (StatusCode, templates::LoginTemplate) {
    (
        status,
        templates::LoginTemplate {
            app_name: app_name.to_string(),
            error: message.to_string(),
            declined: false,
        },
    )
}

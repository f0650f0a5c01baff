use crate::actions::{ActionError, Confirmation, Outcome};
use crate::adapters::MemoryStore;
use crate::assets;
use crate::auth::{AuthError, AuthState};
use crate::config;
use crate::live::LiveView;
use crate::ports::StoreError;
use crate::seed::{self, SeedError, SeedFile};
use crate::session::{CurrentUser, Phase, Session, SessionError};
use crate::state;

use axum::Router;
use axum::http::StatusCode;
use axum::middleware;
use axum::response::Redirect;
use axum::routing::get;
use axum::routing::post;
use serde::Deserialize;

mod auth;
mod chat;
mod event;
mod items;
mod stream;
mod users;

pub(crate) type HandlerError = (StatusCode, &'static str);

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("invalid auth configuration: {0}")]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Seed(#[from] SeedError),
    #[error("failed to open live view: {0}")]
    Store(#[from] StoreError),
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

pub async fn app(config: config::AppConfig) -> Result<Router, StartupError> {
    app_with_store(config, MemoryStore::new()).await
}

/// Builds the router on top of an existing store, applying the configured
/// seed file first.
pub async fn app_with_store(
    config: config::AppConfig,
    store: MemoryStore,
) -> Result<Router, StartupError> {
    let auth = AuthState::from_config(&config)?;
    if let Some(path) = config.seed.as_deref() {
        let seed_file = SeedFile::load(path)?;
        let summary = seed::apply(&store, &seed_file).await?;
        tracing::info!(
            path = %path.display(),
            users = summary.users,
            items = summary.items,
            event = summary.event,
            "applied seed file"
        );
    }
    let live = LiveView::open(&store).await?;
    let state = state::AppState {
        config,
        auth,
        store,
        live,
    };

    Ok(Router::new()
        .route("/", get(event::home))
        .route("/login", get(auth::login_form).post(auth::login_submit))
        .route("/logout", post(auth::logout))
        .route("/rsvp/confirm", post(event::rsvp_confirm))
        .route("/rsvp/decline", post(event::rsvp_decline))
        .route("/rsvp/cancel", post(event::rsvp_cancel))
        .route("/details", post(event::save_details))
        .route("/users", post(users::user_create))
        .route("/users/{username}/delete", post(users::user_delete))
        .route("/items", post(items::item_create))
        .route("/items/{id}/save", post(items::item_save))
        .route("/items/{id}/delete", post(items::item_delete))
        .route("/items/{id}/claim", post(items::item_claim))
        .route("/items/{id}/return", post(items::item_return))
        .route("/messages", post(chat::message_send))
        .route("/messages/{id}/delete", post(chat::message_delete))
        .route("/events", get(stream::events))
        .route("/static/style.css", get(assets::stylesheet))
        .route("/static/app.js", get(assets::app_script))
        .route("/health", get(health))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state,
            auth::session_middleware,
        )))
}

pub(crate) async fn health() -> &'static str {
    "ok"
}

/// Hidden field that the page script sets once the user accepted the
/// browser confirm dialog.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ConfirmForm {
    #[serde(default)]
    confirmed: Option<String>,
}

impl ConfirmForm {
    pub(crate) fn confirmation(&self) -> Confirmation {
        Confirmation::from_flag(self.confirmed.as_deref() == Some("true"))
    }
}

pub(crate) fn require_active(session: &Session) -> Result<&CurrentUser, HandlerError> {
    match (session.phase(), session.current_user()) {
        (Phase::Active, Some(user)) => Ok(user),
        _ => Err((StatusCode::FORBIDDEN, "confirm your arrival first")),
    }
}

pub(crate) fn back_home(action: &'static str, outcome: Outcome) -> Redirect {
    if let Outcome::Skipped(reason) = outcome {
        tracing::debug!(action, ?reason, "action skipped");
    }
    Redirect::to("/")
}

pub(crate) fn action_error(action: &'static str, err: ActionError) -> HandlerError {
    match err {
        ActionError::Forbidden { .. } => {
            tracing::warn!(action, %err, "rejected action");
            (StatusCode::FORBIDDEN, "forbidden")
        }
        ActionError::Store(StoreError::NotFound { .. }) => (StatusCode::NOT_FOUND, "not found"),
        ActionError::Store(StoreError::InvalidPath { .. }) => {
            (StatusCode::BAD_REQUEST, "invalid id")
        }
        err => {
            tracing::error!(action, %err, "action failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        }
    }
}

pub(crate) fn session_error(action: &'static str, err: SessionError) -> HandlerError {
    match err {
        SessionError::InvalidTransition { .. } => (StatusCode::CONFLICT, "not allowed right now"),
        err => {
            tracing::error!(action, %err, "session transition failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        }
    }
}

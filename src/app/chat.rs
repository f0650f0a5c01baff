use crate::actions;
use crate::app::{ConfirmForm, HandlerError, action_error, back_home, require_active};
use crate::session::Session;
use crate::state;

use axum::Extension;
use axum::extract::Form;
use axum::extract::Path;
use axum::extract::State;
use axum::response::Redirect;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct MessageForm {
    #[serde(default)]
    text: String,
}

pub(crate) async fn message_send(
    State(state): State<state::AppState>,
    Extension(session): Extension<Session>,
    Form(form): Form<MessageForm>,
) -> Result<Redirect, HandlerError> {
    let user = require_active(&session)?;
    let outcome = actions::send_message(&state.store, user, &form.text)
        .await
        .map_err(|err| action_error("send message", err))?;
    Ok(back_home("send message", outcome))
}

pub(crate) async fn message_delete(
    State(state): State<state::AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Form(form): Form<ConfirmForm>,
) -> Result<Redirect, HandlerError> {
    let user = require_active(&session)?;
    let outcome = actions::delete_message(&state.store, user, &id, form.confirmation())
        .await
        .map_err(|err| action_error("delete message", err))?;
    Ok(back_home("delete message", outcome))
}

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

/// Raw item fields as typed into the form. `max` stays text until the
/// reducer coerces it.
#[derive(Debug, Deserialize)]
pub(crate) struct ItemForm {
    #[serde(default)]
    name: String,
    #[serde(default)]
    details: String,
    #[serde(default)]
    max: String,
}

pub(crate) async fn item_create(
    State(state): State<state::AppState>,
    Extension(session): Extension<Session>,
    Form(form): Form<ItemForm>,
) -> Result<Redirect, HandlerError> {
    let user = require_active(&session)?;
    let outcome = actions::create_item(&state.store, user, &form.name, &form.details, &form.max)
        .await
        .map_err(|err| action_error("create item", err))?;
    Ok(back_home("create item", outcome))
}

pub(crate) async fn item_save(
    State(state): State<state::AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Form(form): Form<ItemForm>,
) -> Result<Redirect, HandlerError> {
    let user = require_active(&session)?;
    let outcome =
        actions::save_edit(&state.store, user, &id, &form.name, &form.details, &form.max)
            .await
            .map_err(|err| action_error("save item", err))?;
    Ok(back_home("save item", outcome))
}

pub(crate) async fn item_delete(
    State(state): State<state::AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Form(form): Form<ConfirmForm>,
) -> Result<Redirect, HandlerError> {
    let user = require_active(&session)?;
    let outcome = actions::delete_item(&state.store, user, &id, form.confirmation())
        .await
        .map_err(|err| action_error("delete item", err))?;
    Ok(back_home("delete item", outcome))
}

pub(crate) async fn item_claim(
    State(state): State<state::AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Result<Redirect, HandlerError> {
    let user = require_active(&session)?;
    let outcome = actions::claim_item(&state.store, user, &id)
        .await
        .map_err(|err| action_error("claim item", err))?;
    Ok(back_home("claim item", outcome))
}

pub(crate) async fn item_return(
    State(state): State<state::AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Result<Redirect, HandlerError> {
    let user = require_active(&session)?;
    let outcome = actions::return_item(&state.store, user, &id)
        .await
        .map_err(|err| action_error("return item", err))?;
    Ok(back_home("return item", outcome))
}

use crate::actions;
use crate::app::auth;
use crate::app::{HandlerError, action_error, back_home, require_active, session_error};
use crate::live::{self, Guest};
use crate::model::{ClaimState, Item, Message, Role};
use crate::session::{CurrentUser, Phase, Session};
use crate::state;
use crate::templates;

use axum::Extension;
use axum::extract::Form;
use axum::extract::Query;
use axum::extract::State;
use axum::response::{IntoResponse, Redirect, Response};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct HomeQuery {
    edit: Option<String>,
    details: Option<String>,
}

/// Renders the RSVP prompt until the user confirmed, the event page after.
pub(crate) async fn home(
    State(state): State<state::AppState>,
    Extension(session): Extension<Session>,
    Query(query): Query<HomeQuery>,
) -> Result<Response, HandlerError> {
    let Some(user) = session.current_user() else {
        return Ok(Redirect::to("/login").into_response());
    };
    if session.phase() == Phase::AwaitingRsvp {
        return Ok(rsvp_page(&state).into_response());
    }
    Ok(home_page(&state, user, &query).into_response())
}

fn rsvp_page(state: &state::AppState) -> templates::RsvpTemplate {
    templates::RsvpTemplate {
        app_name: state.config.app_name.clone(),
        details: state.live.event_details(),
        guests: guest_rows(state.live.confirmed_guests()),
    }
}

fn home_page(
    state: &state::AppState,
    user: &CurrentUser,
    query: &HomeQuery,
) -> templates::HomeTemplate {
    let is_admin = user.is_admin();
    let editing = if is_admin { query.edit.as_deref() } else { None };
    let users = state.live.users();
    let items = state.live.items();

    let managed_users = if user.role.manages_event() {
        users
            .iter()
            .filter(|candidate| candidate.role != Role::Admin)
            .map(|candidate| user_row(&candidate.username))
            .collect()
    } else {
        Vec::new()
    };
    let my_items = live::claimed_items(&items, &user.username)
        .into_iter()
        .map(|item| item_row(item, &user.username, None))
        .collect();

    templates::HomeTemplate {
        app_name: state.config.app_name.clone(),
        username: user.username.clone(),
        is_admin,
        is_creator: user.is_creator(),
        is_guest: user.role == Role::User,
        details: state.live.event_details(),
        editing_details: is_admin && query.details.as_deref() == Some("edit"),
        guests: guest_rows(live::confirmed_guests(&users, &items)),
        users: managed_users,
        items: items
            .iter()
            .map(|item| item_row(item, &user.username, editing))
            .collect(),
        my_items,
        messages: state.live.messages().iter().map(message_row).collect(),
    }
}

fn user_row(username: &str) -> templates::UserRow {
    templates::UserRow {
        username: username.to_string(),
        delete_path: format!(
            "/users/{}/delete",
            utf8_percent_encode(username, NON_ALPHANUMERIC)
        ),
    }
}

fn guest_rows(guests: Vec<Guest>) -> Vec<templates::GuestRow> {
    guests
        .into_iter()
        .enumerate()
        .map(|(index, guest)| templates::GuestRow {
            position: index + 1,
            username: guest.username,
            claimed: guest.claimed_items.join(", "),
        })
        .collect()
}

fn item_row(item: &Item, viewer: &str, editing: Option<&str>) -> templates::ItemRow {
    let state = item.claim_state(viewer);
    templates::ItemRow {
        id: item.id.clone(),
        name: item.name.clone(),
        details: item.details.clone(),
        max: item.max,
        capacity: item.capacity_label(),
        claimers: item.claimed_by.join(", "),
        claim_label: state.label(),
        claimable: state == ClaimState::Available,
        claimed: state == ClaimState::Claimed,
        editing: editing == Some(item.id.as_str()),
    }
}

fn message_row(message: &Message) -> templates::MessageRow {
    templates::MessageRow {
        id: message.id.clone(),
        user: message.user.clone(),
        text: message.text.clone(),
        posted_at: message.posted_at_label(),
        posted_at_iso: message.posted_at_iso(),
    }
}

pub(crate) async fn rsvp_confirm(
    State(state): State<state::AppState>,
    Extension(mut session): Extension<Session>,
) -> Result<Redirect, HandlerError> {
    session
        .confirm_arrival(&state.store)
        .await
        .map_err(|err| session_error("confirm arrival", err))?;
    Ok(Redirect::to("/"))
}

pub(crate) async fn rsvp_decline(
    State(state): State<state::AppState>,
    Extension(mut session): Extension<Session>,
) -> Result<Response, HandlerError> {
    session
        .decline_arrival(&state.store)
        .await
        .map_err(|err| session_error("decline arrival", err))?;
    Ok(auth::clear_session(&state, "/login?declined=1"))
}

pub(crate) async fn rsvp_cancel(
    State(state): State<state::AppState>,
    Extension(mut session): Extension<Session>,
) -> Result<Redirect, HandlerError> {
    let items = state.live.items();
    session
        .cancel_arrival(&state.store, &items)
        .await
        .map_err(|err| session_error("cancel arrival", err))?;
    Ok(Redirect::to("/"))
}

#[derive(Debug, Deserialize)]
pub(crate) struct DetailsForm {
    #[serde(default)]
    details: String,
}

pub(crate) async fn save_details(
    State(state): State<state::AppState>,
    Extension(session): Extension<Session>,
    Form(form): Form<DetailsForm>,
) -> Result<Redirect, HandlerError> {
    let user = require_active(&session)?;
    let outcome = actions::save_details(&state.store, user, &form.details)
        .await
        .map_err(|err| action_error("save details", err))?;
    Ok(back_home("save details", outcome))
}

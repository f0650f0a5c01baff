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
pub(crate) struct UserForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

pub(crate) async fn user_create(
    State(state): State<state::AppState>,
    Extension(session): Extension<Session>,
    Form(form): Form<UserForm>,
) -> Result<Redirect, HandlerError> {
    let user = require_active(&session)?;
    let outcome = actions::create_user(&state.store, user, &form.username, &form.password)
        .await
        .map_err(|err| action_error("create user", err))?;
    if outcome == actions::Outcome::Applied {
        tracing::info!(created_by = %user.username, username = %form.username.trim(), "user created");
    }
    Ok(back_home("create user", outcome))
}

pub(crate) async fn user_delete(
    State(state): State<state::AppState>,
    Extension(session): Extension<Session>,
    Path(username): Path<String>,
    Form(form): Form<ConfirmForm>,
) -> Result<Redirect, HandlerError> {
    let user = require_active(&session)?;
    let outcome = actions::delete_user(&state.store, user, &username, form.confirmation())
        .await
        .map_err(|err| action_error("delete user", err))?;
    if outcome == actions::Outcome::Applied {
        tracing::info!(deleted_by = %user.username, %username, "user deleted");
    }
    Ok(back_home("delete user", outcome))
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use crate::adapters::MemoryStore;
    use crate::app::tests::{body_text, form_request, get_request, location, login, send, test_app};
    use crate::auth;
    use crate::model::{self, Role};
    use crate::ports::DocumentStore;
    use crate::testing;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn user_create__should_add_guest_who_can_log_in() {
        // Given
        let store = MemoryStore::new();
        testing::insert_user(&store, "cora", Role::Creator, true).await;
        let app = test_app(&store).await;
        let cookie = login(&app, "cora").await;

        // When
        let response = send(
            &app,
            form_request("/users", Some(&cookie), "username=dan&password=secret"),
        )
        .await;

        // Then
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let dan = testing::user(&store, "dan").await;
        assert_eq!(dan.role, Role::User);
        assert!(!dan.coming);
        assert!(auth::verify_password("secret", &dan.password_hash));
        let dan_cookie = login(&app, "dan").await;
        let page = body_text(send(&app, get_request("/", Some(&dan_cookie))).await).await;
        assert!(page.contains("Are you coming?"));
    }

    #[tokio::test]
    async fn user_create__should_forbid_guests() {
        // Given
        let store = MemoryStore::new();
        testing::insert_user(&store, "ana", Role::User, true).await;
        let app = test_app(&store).await;
        let cookie = login(&app, "ana").await;

        // When
        let response = send(
            &app,
            form_request("/users", Some(&cookie), "username=eve&password=pw"),
        )
        .await;

        // Then
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(
            store
                .get_document(model::USERS, "eve")
                .await
                .expect("get")
                .is_none()
        );
    }

    #[tokio::test]
    async fn user_delete__should_remove_confirmed_and_protect_admin() {
        // Given
        let store = MemoryStore::new();
        testing::insert_user(&store, "admin", Role::Admin, true).await;
        testing::insert_user(&store, "ana", Role::User, true).await;
        let app = test_app(&store).await;
        let cookie = login(&app, "admin").await;

        // When
        let removed = send(
            &app,
            form_request("/users/ana/delete", Some(&cookie), "confirmed=true"),
        )
        .await;
        let protected = send(
            &app,
            form_request("/users/admin/delete", Some(&cookie), "confirmed=true"),
        )
        .await;

        // Then
        assert_eq!(removed.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&removed), "/");
        assert!(
            store
                .get_document(model::USERS, "ana")
                .await
                .expect("get")
                .is_none()
        );
        assert_eq!(protected.status(), StatusCode::SEE_OTHER);
        assert_eq!(testing::user(&store, "admin").await.role, Role::Admin);
    }

    #[tokio::test]
    async fn user_delete__should_reach_names_with_url_characters() {
        // Given
        let store = MemoryStore::new();
        testing::insert_user(&store, "admin", Role::Admin, true).await;
        let app = test_app(&store).await;
        let cookie = login(&app, "admin").await;
        send(
            &app,
            form_request("/users", Some(&cookie), "username=who%3F+me&password=pw"),
        )
        .await;
        assert_eq!(testing::user(&store, "who? me").await.role, Role::User);
        let page = body_text(send(&app, get_request("/", Some(&cookie))).await).await;
        let delete_path = "/users/who%3F%20me/delete";
        assert!(page.contains(&format!("action=\"{delete_path}\"")));

        // When
        let response = send(&app, form_request(delete_path, Some(&cookie), "confirmed=true")).await;

        // Then
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(
            store
                .get_document(model::USERS, "who? me")
                .await
                .expect("get")
                .is_none()
        );
    }
}

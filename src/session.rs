use crate::auth;
use crate::model::{self, FromDocument, Item, Role, User};
use crate::ports::{DocumentStore, Patch, StoreError};

use futures::future::join_all;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub username: String,
    pub role: Role,
    pub coming: bool,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_creator(&self) -> bool {
        self.role == Role::Creator
    }
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            role: user.role,
            coming: user.coming,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    LoggedOut,
    AwaitingRsvp,
    Active,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("cannot {action} while {phase:?}")]
    InvalidTransition { action: &'static str, phase: Phase },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Who is logged in and where they are in the RSVP flow.
///
/// The phase is derived from the cached `coming` flag: a logged-in user who
/// has not confirmed sits in `AwaitingRsvp`, a confirmed one is `Active`.
/// `declined` survives logout so the login screen can say why the user is
/// back there.
#[derive(Debug, Clone, Default)]
pub struct Session {
    current: Option<CurrentUser>,
    declined: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resume(user: CurrentUser) -> Self {
        Self {
            current: Some(user),
            declined: false,
        }
    }

    /// Rebuilds a session from the stored record of `username`. A missing or
    /// unreadable record yields a logged-out session.
    pub async fn restore<S: DocumentStore>(store: &S, username: &str) -> Result<Self, StoreError> {
        let Some(document) = store.get_document(model::USERS, username).await? else {
            return Ok(Self::new());
        };
        match User::from_document(&document) {
            Ok(user) => Ok(Self::resume(CurrentUser::from(&user))),
            Err(err) => {
                tracing::warn!(%username, %err, "stored user record is unreadable");
                Ok(Self::new())
            }
        }
    }

    pub fn phase(&self) -> Phase {
        match &self.current {
            None => Phase::LoggedOut,
            Some(user) if user.coming => Phase::Active,
            Some(_) => Phase::AwaitingRsvp,
        }
    }

    pub fn current_user(&self) -> Option<&CurrentUser> {
        self.current.as_ref()
    }

    pub fn declined(&self) -> bool {
        self.declined
    }

    pub async fn login<S: DocumentStore>(
        &mut self,
        store: &S,
        username: &str,
        password: &str,
    ) -> Result<Phase, SessionError> {
        if username.is_empty() || password.is_empty() {
            return Err(SessionError::InvalidCredentials);
        }
        // A name that cannot be a document id names no user either.
        let document = match store.get_document(model::USERS, username).await {
            Ok(Some(document)) => document,
            Ok(None) | Err(StoreError::InvalidPath { .. }) => {
                return Err(SessionError::InvalidCredentials);
            }
            Err(err) => return Err(err.into()),
        };
        let user =
            User::from_document(&document).map_err(|_| SessionError::InvalidCredentials)?;
        if !auth::verify_password(password, &user.password_hash) {
            return Err(SessionError::InvalidCredentials);
        }

        self.current = Some(CurrentUser::from(&user));
        self.declined = false;
        Ok(self.phase())
    }

    pub async fn confirm_arrival<S: DocumentStore>(&mut self, store: &S) -> Result<(), SessionError> {
        let username = self.require(Phase::AwaitingRsvp, "confirm arrival")?;
        store
            .update_fields(model::USERS, &username, Patch::new().set("coming", true))
            .await?;
        self.set_coming(true);
        Ok(())
    }

    pub async fn decline_arrival<S: DocumentStore>(&mut self, store: &S) -> Result<(), SessionError> {
        let username = self.require(Phase::AwaitingRsvp, "decline arrival")?;
        store
            .update_fields(model::USERS, &username, Patch::new().set("coming", false))
            .await?;
        self.current = None;
        self.declined = true;
        Ok(())
    }

    /// Releases every claim the user holds in `items`, then withdraws the
    /// RSVP. The releases run concurrently and are not atomic: if one fails
    /// the others still land and nothing is rolled back.
    pub async fn cancel_arrival<S: DocumentStore>(
        &mut self,
        store: &S,
        items: &[Item],
    ) -> Result<(), SessionError> {
        let username = self.require(Phase::Active, "cancel arrival")?;
        let releases = items
            .iter()
            .filter(|item| item.is_claimed_by(&username))
            .map(|item| {
                store.update_fields(
                    model::ITEMS,
                    &item.id,
                    Patch::new().array_remove("claimedBy", username.as_str()),
                )
            });
        for result in join_all(releases).await {
            result?;
        }

        store
            .update_fields(model::USERS, &username, Patch::new().set("coming", false))
            .await?;
        self.set_coming(false);
        Ok(())
    }

    pub fn logout(&mut self) {
        self.current = None;
    }

    fn require(&self, expected: Phase, action: &'static str) -> Result<String, SessionError> {
        let phase = self.phase();
        match &self.current {
            Some(user) if phase == expected => Ok(user.username.clone()),
            _ => Err(SessionError::InvalidTransition { action, phase }),
        }
    }

    fn set_coming(&mut self, coming: bool) {
        if let Some(user) = self.current.as_mut() {
            user.coming = coming;
        }
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use crate::testing::{self, FailingStore, PASSWORD};

    #[tokio::test]
    async fn login__should_route_unconfirmed_user_to_rsvp() {
        // Given
        let store = testing::store();
        testing::insert_user(&store, "ana", Role::User, false).await;
        let mut session = Session::new();

        // When
        let phase = session.login(&store, "ana", PASSWORD).await.expect("login");

        // Then
        assert_eq!(phase, Phase::AwaitingRsvp);
        assert_eq!(session.current_user().expect("user").username, "ana");
    }

    #[tokio::test]
    async fn login__should_route_confirmed_user_to_main_view() {
        // Given
        let store = testing::store();
        testing::insert_user(&store, "ana", Role::User, true).await;
        let mut session = Session::new();

        // When
        let phase = session.login(&store, "ana", PASSWORD).await.expect("login");

        // Then
        assert_eq!(phase, Phase::Active);
    }

    #[tokio::test]
    async fn login__should_report_same_error_for_wrong_password_and_unknown_user() {
        // Given
        let store = testing::store();
        testing::insert_user(&store, "ana", Role::User, true).await;
        let mut session = Session::new();

        // When
        let wrong_password = session.login(&store, "ana", "nope").await;
        let unknown_user = session.login(&store, "zoe", PASSWORD).await;

        // Then
        let wrong_password = wrong_password.expect_err("wrong password");
        let unknown_user = unknown_user.expect_err("unknown user");
        assert!(matches!(wrong_password, SessionError::InvalidCredentials));
        assert!(matches!(unknown_user, SessionError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), "Invalid credentials");
        assert_eq!(unknown_user.to_string(), wrong_password.to_string());
        assert_eq!(session.phase(), Phase::LoggedOut);
    }

    #[tokio::test]
    async fn login__should_treat_unaddressable_username_as_unknown() {
        // Given
        let store = testing::store();
        testing::insert_user(&store, "ana", Role::User, true).await;
        let mut session = Session::new();

        // When
        let result = session.login(&store, "no/such", PASSWORD).await;

        // Then
        let err = result.expect_err("unaddressable user");
        assert!(matches!(err, SessionError::InvalidCredentials));
        assert_eq!(err.to_string(), "Invalid credentials");
        assert_eq!(session.phase(), Phase::LoggedOut);
    }

    #[tokio::test]
    async fn login__should_reject_empty_input() {
        // Given
        let store = testing::store();
        let mut session = Session::new();

        // Then
        assert!(matches!(
            session.login(&store, "", "").await,
            Err(SessionError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn confirm_arrival__should_store_coming_and_activate() {
        // Given
        let store = testing::store();
        testing::insert_user(&store, "ana", Role::User, false).await;
        let mut session = Session::new();
        session.login(&store, "ana", PASSWORD).await.expect("login");

        // When
        session.confirm_arrival(&store).await.expect("confirm");

        // Then
        assert_eq!(session.phase(), Phase::Active);
        assert!(testing::user(&store, "ana").await.coming);
    }

    #[tokio::test]
    async fn decline_arrival__should_clear_session_and_route_next_login_to_rsvp() {
        // Given
        let store = testing::store();
        testing::insert_user(&store, "ana", Role::User, false).await;
        let mut session = Session::new();
        session.login(&store, "ana", PASSWORD).await.expect("login");

        // When
        session.decline_arrival(&store).await.expect("decline");

        // Then
        assert_eq!(session.phase(), Phase::LoggedOut);
        assert!(session.declined());
        assert!(!testing::user(&store, "ana").await.coming);

        let phase = session.login(&store, "ana", PASSWORD).await.expect("login");
        assert_eq!(phase, Phase::AwaitingRsvp);
        assert!(!session.declined());
    }

    #[tokio::test]
    async fn cancel_arrival__should_release_every_claim_and_withdraw_rsvp() {
        // Given
        let store = testing::store();
        testing::insert_user(&store, "ana", Role::User, true).await;
        let a = testing::insert_item(&store, "A", 0, &["ana", "ben"]).await;
        let b = testing::insert_item(&store, "B", 2, &["ana"]).await;
        let c = testing::insert_item(&store, "C", 0, &["ben"]).await;
        let items = vec![
            testing::item(&store, &a).await,
            testing::item(&store, &b).await,
            testing::item(&store, &c).await,
        ];
        let mut session = Session::new();
        session.login(&store, "ana", PASSWORD).await.expect("login");

        // When
        session
            .cancel_arrival(&store, &items)
            .await
            .expect("cancel arrival");

        // Then
        assert_eq!(testing::item(&store, &a).await.claimed_by, vec!["ben"]);
        assert!(testing::item(&store, &b).await.claimed_by.is_empty());
        assert_eq!(testing::item(&store, &c).await.claimed_by, vec!["ben"]);
        assert!(!testing::user(&store, "ana").await.coming);
        assert_eq!(session.phase(), Phase::AwaitingRsvp);
    }

    #[tokio::test]
    async fn cancel_arrival__should_keep_partial_releases_when_one_write_fails() {
        // Given
        let store = testing::store();
        testing::insert_user(&store, "ana", Role::User, true).await;
        let a = testing::insert_item(&store, "A", 0, &["ana"]).await;
        let b = testing::insert_item(&store, "B", 0, &["ana"]).await;
        let items = vec![testing::item(&store, &a).await, testing::item(&store, &b).await];
        let failing = FailingStore::new(store.clone(), &b);
        let mut session = Session::new();
        session.login(&failing, "ana", PASSWORD).await.expect("login");

        // When
        let result = session.cancel_arrival(&failing, &items).await;

        // Then
        assert!(matches!(result, Err(SessionError::Store(_))));
        assert!(testing::item(&store, &a).await.claimed_by.is_empty());
        assert_eq!(testing::item(&store, &b).await.claimed_by, vec!["ana"]);
        assert!(testing::user(&store, "ana").await.coming);
        assert_eq!(session.phase(), Phase::Active);
    }

    #[tokio::test]
    async fn logout__should_leave_stored_rsvp_untouched() {
        // Given
        let store = testing::store();
        testing::insert_user(&store, "ana", Role::User, true).await;
        let mut session = Session::new();
        session.login(&store, "ana", PASSWORD).await.expect("login");

        // When
        session.logout();

        // Then
        assert_eq!(session.phase(), Phase::LoggedOut);
        assert!(testing::user(&store, "ana").await.coming);
    }

    #[tokio::test]
    async fn confirm_arrival__should_reject_logged_out_session() {
        // Given
        let store = testing::store();
        let mut session = Session::new();

        // When
        let result = session.confirm_arrival(&store).await;

        // Then
        assert!(matches!(
            result,
            Err(SessionError::InvalidTransition {
                phase: Phase::LoggedOut,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn restore__should_log_out_deleted_users() {
        // Given
        let store = testing::store();

        // When
        let session = Session::restore(&store, "ghost").await.expect("restore");

        // Then
        assert_eq!(session.phase(), Phase::LoggedOut);
    }
}

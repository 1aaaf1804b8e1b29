//! Profile settings: view and edit the signed-in user's account.
//!
//! Login, email and the Telegram link are shown optimistically and rolled
//! back if the server refuses. Password changes are never optimistic; they
//! only report the outcome.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use schoolhub_protocol::{
    EmailUpdate, Endpoint, LoginUpdate, PasswordChange, Profile, TelegramConnect,
};
use schoolhub_session::TokenStorage;
use schoolhub_state::Optimistic;
use schoolhub_transport::Transport;
use url::Url;

use crate::ClientError;
use crate::client::Api;

/// Minimum length of a new password, in characters.
pub const MIN_PASSWORD_CHARS: usize = 6;

const PROFILE: &str = "profile";

/// The editable part of the profile form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileEdit {
    pub login: String,
    /// Empty or `None` leaves the email as it is.
    pub email: Option<String>,
}

impl From<&Profile> for ProfileEdit {
    fn from(profile: &Profile) -> Self {
        Self {
            login: profile.login.clone(),
            email: profile.email.clone(),
        }
    }
}

/// Result of [`ProfileSettings::save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Nothing differed from the confirmed profile; no request was sent.
    Unchanged,
    Saved(Profile),
}

pub struct ProfileSettings<T, S> {
    api: Arc<Api<T, S>>,
    view: Mutex<Option<Optimistic<Profile>>>,
}

impl<T: Transport, S: TokenStorage> ProfileSettings<T, S> {
    pub(crate) fn new(api: Arc<Api<T, S>>) -> Self {
        Self {
            api,
            view: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Optimistic<Profile>>> {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The profile as the user should see it, `None` before [`load`](Self::load).
    pub fn view(&self) -> Option<Profile> {
        self.lock().as_ref().map(|slot| slot.view().clone())
    }

    pub fn is_pending(&self) -> bool {
        self.lock().as_ref().is_some_and(Optimistic::is_pending)
    }

    /// Fetches the profile.
    ///
    /// # Errors
    /// The request error, with an error notice.
    pub async fn load(&self) -> Result<Profile, ClientError> {
        match self.api.fetch::<Profile>(&Endpoint::profile()).await {
            Ok(profile) => {
                let mut view = self.lock();
                match view.as_mut() {
                    Some(slot) => slot.refresh(profile.clone()),
                    None => *view = Some(Optimistic::new(profile.clone())),
                }
                Ok(profile)
            }
            Err(e) => {
                self.api.report_failure("Failed to load profile", &e);
                Err(e)
            }
        }
    }

    /// Saves the edited login and email. Only fields that differ from the
    /// confirmed profile are sent; when both changed, both requests go out
    /// together. Each field settles on its own response, so a login the
    /// server accepted stays even if the email is refused.
    ///
    /// # Errors
    /// - [`ClientError::Validation`] if the profile is not loaded or the
    ///   login is blank
    /// - [`ClientError::State`] if another change is still in flight
    /// - the first request error, after the refused fields have been
    ///   restored
    pub async fn save(&self, edit: ProfileEdit) -> Result<SaveOutcome, ClientError> {
        let login = edit.login.trim().to_string();
        if login.is_empty() {
            return Err(ClientError::Validation("login cannot be empty".into()));
        }
        let email = edit
            .email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());

        let (login_change, email_change) = {
            let mut view = self.lock();
            let slot = view.as_mut().ok_or_else(not_loaded)?;
            let confirmed = slot.confirmed();
            let login_change = (login != confirmed.login).then(|| login.clone());
            let email_change = email.filter(|e| confirmed.email.as_deref() != Some(e.as_str()));
            if login_change.is_none() && email_change.is_none() {
                drop(view);
                self.api.notices().info("No changes to save");
                return Ok(SaveOutcome::Unchanged);
            }
            let (login, email) = (login_change.clone(), email_change.clone());
            slot.begin(PROFILE, move |p| {
                if let Some(login) = &login {
                    p.login = login.clone();
                }
                if let Some(email) = &email {
                    p.email = Some(email.clone());
                }
            })?;
            (login_change, email_change)
        };

        let set_login = async {
            match &login_change {
                Some(login) => self
                    .api
                    .call_unit(
                        &Endpoint::set_login(),
                        Some(&LoginUpdate {
                            login: login.clone(),
                        }),
                    )
                    .await
                    .map(drop),
                None => Ok(()),
            }
        };
        let set_email = async {
            match &email_change {
                Some(email) => self
                    .api
                    .call_unit(
                        &Endpoint::set_email(),
                        Some(&EmailUpdate {
                            email: email.clone(),
                        }),
                    )
                    .await
                    .map(drop),
                None => Ok(()),
            }
        };
        let (login_result, email_result) = tokio::join!(set_login, set_email);

        let saved = {
            let mut view = self.lock();
            let slot = view.as_mut().ok_or_else(not_loaded)?;
            let mut accepted = slot.confirmed().clone();
            if let (Ok(()), Some(login)) = (&login_result, login_change) {
                accepted.login = login;
            }
            if let (Ok(()), Some(email)) = (&email_result, email_change) {
                accepted.email = Some(email);
            }
            slot.commit(PROFILE, Some(accepted))?.clone()
        };
        match login_result.and(email_result) {
            Ok(()) => {
                tracing::info!(login = %saved.login, "profile updated");
                self.api.notices().success("Profile updated");
                Ok(SaveOutcome::Saved(saved))
            }
            Err(e) => {
                self.api.report_failure("Failed to save changes", &e);
                Err(e)
            }
        }
    }

    /// Links an email address to an account that has none.
    ///
    /// # Errors
    /// [`ClientError::Validation`] unless the address contains `@`;
    /// otherwise as for [`save`](Self::save).
    pub async fn link_email(&self, email: &str) -> Result<Profile, ClientError> {
        let email = email.trim().to_string();
        if !email.contains('@') {
            return Err(ClientError::Validation("enter a valid email address".into()));
        }
        let linked = email.clone();
        self.begin(move |p| p.email = Some(linked.clone()))?;
        let result = self
            .api
            .call_unit(&Endpoint::set_email(), Some(&EmailUpdate { email }))
            .await
            .map(drop);
        self.settle(
            result,
            "Failed to link email",
            "Email linked, check your inbox for a confirmation letter",
        )
    }

    /// Changes the password. Not optimistic; nothing local changes.
    ///
    /// # Errors
    /// [`ClientError::Validation`] if either field is empty or the new
    /// password is shorter than [`MIN_PASSWORD_CHARS`]; otherwise the
    /// request error, with a notice.
    pub async fn change_password(
        &self,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), ClientError> {
        if current_password.is_empty() || new_password.is_empty() {
            return Err(ClientError::Validation("fill in both password fields".into()));
        }
        if new_password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(ClientError::Validation(format!(
                "new password must be at least {MIN_PASSWORD_CHARS} characters"
            )));
        }
        let body = PasswordChange {
            current_password: current_password.to_string(),
            new_password: new_password.to_string(),
        };
        match self
            .api
            .call_unit(&Endpoint::change_password(), Some(&body))
            .await
        {
            Ok(_) => {
                tracing::info!("password changed");
                self.api.notices().success("Password changed");
                Ok(())
            }
            Err(e) => {
                self.api.report_failure("Failed to change password", &e);
                Err(e)
            }
        }
    }

    /// Asks for the link that connects a Telegram account. The caller opens
    /// it; the profile updates on the next [`load`](Self::load).
    ///
    /// # Errors
    /// [`ClientError::LinkUnavailable`] if the server's URL is unusable,
    /// otherwise the request error.
    pub async fn connect_telegram(&self) -> Result<Url, ClientError> {
        let result = self
            .api
            .fetch::<TelegramConnect>(&Endpoint::telegram_connect())
            .await
            .and_then(|link| {
                link.validated_url()
                    .map_err(|e| ClientError::LinkUnavailable(e.to_string()))
            });
        if let Err(e) = &result {
            self.api.report_failure("Failed to link Telegram", e);
        }
        result
    }

    /// Unlinks Telegram; the name disappears right away.
    ///
    /// # Errors
    /// As for [`save`](Self::save).
    pub async fn disconnect_telegram(&self) -> Result<Profile, ClientError> {
        self.begin(|p| p.telegram_name = None)?;
        let result = self
            .api
            .call_unit::<()>(&Endpoint::telegram_disconnect(), None)
            .await
            .map(drop);
        self.settle(result, "Failed to unlink Telegram", "Telegram unlinked")
    }

    fn begin(
        &self,
        delta: impl Fn(&mut Profile) + Send + Sync + 'static,
    ) -> Result<(), ClientError> {
        let mut view = self.lock();
        let slot = view.as_mut().ok_or_else(not_loaded)?;
        slot.begin(PROFILE, delta)?;
        Ok(())
    }

    /// Commits or rolls back the pending change and raises the matching
    /// notice.
    fn settle(
        &self,
        result: Result<(), ClientError>,
        failure: &str,
        success: &str,
    ) -> Result<Profile, ClientError> {
        let settled = {
            let mut view = self.lock();
            let slot = view.as_mut().ok_or_else(not_loaded)?;
            match &result {
                Ok(()) => slot.commit(PROFILE, None)?.clone(),
                Err(_) => slot.rollback(PROFILE)?.clone(),
            }
        };
        match result {
            Ok(()) => {
                tracing::info!(login = %settled.login, "profile updated");
                self.api.notices().success(success);
                Ok(settled)
            }
            Err(e) => {
                self.api.report_failure(failure, &e);
                Err(e)
            }
        }
    }
}

fn not_loaded() -> ClientError {
    ClientError::Validation("profile is not loaded yet".into())
}

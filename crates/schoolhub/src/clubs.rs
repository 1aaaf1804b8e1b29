//! Clubs directory: list, detail, create, join and leave.
//!
//! Join and leave are optimistic. The membership flag and member count
//! change before the request goes out and are put back if the server says
//! no. Creating a club is not optimistic (the server assigns the id), but
//! the created club is merged into the list by id, so a repeated response
//! never shows up twice.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use schoolhub_protocol::{Club, ClubId, ClubRef, Endpoint, NewClub, TitleAvailability, TitleCheck};
use schoolhub_session::TokenStorage;
use schoolhub_state::Reconciler;
use schoolhub_transport::Transport;

use crate::ClientError;
use crate::client::Api;

/// Local view of the clubs list plus the operations that change it.
pub struct ClubsDirectory<T, S> {
    api: Arc<Api<T, S>>,
    view: Mutex<Reconciler<Club>>,
}

impl<T: Transport, S: TokenStorage> ClubsDirectory<T, S> {
    pub(crate) fn new(api: Arc<Api<T, S>>) -> Self {
        Self {
            api,
            view: Mutex::new(Reconciler::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Reconciler<Club>> {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every club as the user should see it now, pending changes included.
    pub fn view(&self) -> Vec<Club> {
        self.lock().view().into_iter().cloned().collect()
    }

    pub fn get(&self, id: ClubId) -> Option<Club> {
        self.lock().get(id).cloned()
    }

    pub fn is_pending(&self, id: ClubId) -> bool {
        self.lock().is_pending(id)
    }

    /// Reloads the list from the server.
    ///
    /// # Errors
    /// The request error; an error notice is raised too and the previous
    /// view is kept.
    pub async fn refresh(&self) -> Result<Vec<Club>, ClientError> {
        match self.api.fetch::<Vec<Club>>(&Endpoint::club_list()).await {
            Ok(clubs) => {
                tracing::debug!(count = clubs.len(), "clubs loaded");
                self.lock().replace_all(clubs);
                Ok(self.view())
            }
            Err(e) => {
                self.api.report_failure("Failed to load clubs", &e);
                Err(e)
            }
        }
    }

    /// Loads one club's full record and merges it into the view.
    ///
    /// # Errors
    /// The request error; an error notice is raised too.
    pub async fn detail(&self, id: ClubId) -> Result<Club, ClientError> {
        match self.api.fetch::<Club>(&Endpoint::club_detail(id)).await {
            Ok(club) if club.id == id => {
                let mut view = self.lock();
                view.merge_confirmed(club.clone());
                Ok(view.get(id).cloned().unwrap_or(club))
            }
            Ok(club) => {
                let e = ClientError::Protocol(schoolhub_protocol::ProtocolError::Malformed(
                    format!("asked for {id}, got {}", club.id),
                ));
                self.api.report_failure("Failed to load club", &e);
                Err(e)
            }
            Err(e) => {
                self.api.report_failure("Failed to load club", &e);
                Err(e)
            }
        }
    }

    /// Asks whether `title` is still free. Blank titles are never sent.
    ///
    /// # Errors
    /// [`ClientError::Validation`] for a blank title, otherwise the request
    /// error.
    pub async fn check_title(&self, title: &str) -> Result<bool, ClientError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ClientError::Validation("club title is required".into()));
        }
        let body = TitleCheck {
            title: title.to_string(),
        };
        let answer: TitleAvailability = self.api.call(&Endpoint::club_check_title(), &body).await?;
        tracing::debug!(title, unique = answer.is_unique, "title checked");
        Ok(answer.is_unique)
    }

    /// Creates a club and adds the server's record to the view.
    ///
    /// # Errors
    /// [`ClientError::Validation`] unless title, description and direction
    /// are all filled in; otherwise the request error (with a notice).
    pub async fn create(&self, club: NewClub) -> Result<Club, ClientError> {
        if !club.is_complete() {
            return Err(ClientError::Validation(
                "title, description and direction are required".into(),
            ));
        }
        match self.api.call::<_, Club>(&Endpoint::club_create(), &club).await {
            Ok(created) => {
                tracing::info!(club_id = %created.id, title = %created.title, "club created");
                self.lock().merge_confirmed(created.clone());
                self.api.notices().success("Club created");
                Ok(created)
            }
            Err(e) => {
                self.api.report_failure("Failed to create club", &e);
                Err(e)
            }
        }
    }

    /// Joins a club: `joined = true`, one more member (saturating), right away.
    ///
    /// # Errors
    /// - [`ClientError::State`] if the club is unknown or already has a
    ///   change in flight (nothing is sent)
    /// - the request error, after the view has been restored
    pub async fn join(&self, id: ClubId) -> Result<Club, ClientError> {
        self.mutate(id, Endpoint::club_join(), "Failed to join club", |club| {
            club.joined = true;
            club.members_count = club.members_count.saturating_add(1);
        })
        .await
    }

    /// Leaves a club: `joined = false`, one member fewer (never below 0).
    ///
    /// # Errors
    /// Same as [`join`](Self::join).
    pub async fn leave(&self, id: ClubId) -> Result<Club, ClientError> {
        self.mutate(id, Endpoint::club_leave(), "Failed to leave club", |club| {
            club.joined = false;
            club.members_count = club.members_count.saturating_sub(1);
        })
        .await
    }

    async fn mutate(
        &self,
        id: ClubId,
        endpoint: Endpoint,
        failure: &str,
        delta: impl Fn(&mut Club) + Send + Sync + 'static,
    ) -> Result<Club, ClientError> {
        self.lock().begin(id, delta)?;

        let body = ClubRef { club_id: id };
        match self.api.call_unit(&endpoint, Some(&body)).await {
            Ok(response) => {
                // Some deployments echo the updated club; others send `{}`.
                let server = self
                    .api
                    .decode::<Club>(&response)
                    .ok()
                    .filter(|club| club.id == id);
                let mut view = self.lock();
                let confirmed = view.commit(id, server)?.clone();
                tracing::info!(
                    club_id = %id,
                    joined = confirmed.joined,
                    members = confirmed.members_count,
                    "membership updated"
                );
                Ok(confirmed)
            }
            Err(e) => {
                self.lock().rollback(id)?;
                self.api.report_failure(failure, &e);
                Err(e)
            }
        }
    }
}

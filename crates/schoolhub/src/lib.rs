//! # SchoolHub
//!
//! Client core for the SchoolHub school-community app: sign-in, schedule,
//! clubs, news and profile settings, everything below the rendering layer.
//!
//! The client authenticates with a bearer token kept in a [`SessionStore`],
//! talks to the REST API through a [`Transport`], and keeps optimistic view
//! state for the screens that mutate data.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use schoolhub::prelude::*;
//!
//! # async fn run() -> Result<(), ClientError> {
//! let client = SchoolHubClient::builder()
//!     .config(ClientConfig::from_env()?)
//!     .build()?;
//!
//! client
//!     .credential_login()
//!     .submit(Credentials::new("anna", "secret"))
//!     .await?;
//!
//! let clubs = client.clubs();
//! for club in clubs.refresh().await? {
//!     println!("{} ({} members)", club.title, club.members_count);
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod clubs;
mod config;
mod error;
mod external_login;
mod feeds;
mod login;
mod profile;
pub mod telemetry;

pub use client::{SchoolHubClient, SchoolHubClientBuilder};
pub use clubs::ClubsDirectory;
pub use config::{ClientConfig, DEFAULT_API_URL, ENV_API_URL, ENV_TIMEOUT_SECS};
pub use error::{ClientError, ErrorKind};
pub use external_login::{
    ExternalLoginFlow, ExternalLoginState, LinkOpener, LoginOutcome, PendingLoginAttempt,
};
pub use feeds::week_of;
pub use login::{CredentialLogin, LoginState, RejectReason};
pub use profile::{MIN_PASSWORD_CHARS, ProfileEdit, ProfileSettings, SaveOutcome};

pub use schoolhub_poll::PollConfig;
pub use schoolhub_protocol as protocol;
pub use schoolhub_session::{
    FileTokenStorage, MemoryTokenStorage, SessionError, SessionEvent, SessionStore, TokenStorage,
};
pub use schoolhub_state::{Notice, NoticeId, NoticeKind};
pub use schoolhub_transport::{HttpTransport, Transport};

/// Everything an application usually needs, in one import.
pub mod prelude {
    pub use crate::{
        ClientConfig, ClientError, ClubsDirectory, CredentialLogin, ErrorKind,
        ExternalLoginFlow, ExternalLoginState, LinkOpener, LoginOutcome, LoginState, Notice,
        NoticeKind, PollConfig, ProfileEdit, ProfileSettings, RejectReason, SaveOutcome,
        SchoolHubClient, SessionEvent, TokenStorage, Transport, week_of,
    };
    pub use schoolhub_protocol::{
        Club, ClubId, Credentials, Lesson, NewClub, NewsFeed, NewsItem, Profile, SessionToken,
    };
}

//! Wire protocol for the SchoolHub API.
//!
//! This crate defines what travels between the client and the server:
//!
//! - **Types** ([`Club`], [`Profile`], [`Lesson`], [`NewsItem`], the auth
//!   bodies, ...): one explicit schema per endpoint.
//! - **Endpoints** ([`Endpoint`]): method, path and auth requirement of
//!   every call.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how bodies become bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong at the boundary.
//!
//! ```text
//! Transport (bytes) → Protocol (typed bodies) → Client (flows, state)
//! ```

mod codec;
mod endpoint;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use endpoint::{Endpoint, Method};
pub use error::ProtocolError;
pub use types::{
    Administration, Club, ClubId, ClubRef, Credentials, EmailUpdate, ErrorBody,
    ExternalLoginLink, ExternalLoginPoll, Lesson, LoginUpdate, NEWS_PREVIEW_CHARS, NewClub,
    NewsFeed, NewsItem, PasswordChange, PasswordReset, Profile, SessionToken, TelegramConnect,
    TemporaryToken, TitleAvailability, TitleCheck, TokenResponse,
};

//! The endpoint table: method, path, query and auth requirement for every
//! call the client makes.
//!
//! Paths are relative to the API base URL. Keeping them in one place means
//! the transport never builds a path by hand and tests can assert against
//! the same constructors the client uses.

use std::fmt;

use chrono::NaiveDate;

use crate::{ClubId, NewsFeed};

/// HTTP methods used by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        })
    }
}

/// A single API call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub method: Method,
    pub path: String,
    pub query: Vec<(&'static str, String)>,
    /// Whether the call needs `Authorization: Bearer <token>`.
    pub authenticated: bool,
}

impl Endpoint {
    fn new(method: Method, path: impl Into<String>, authenticated: bool) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            authenticated,
        }
    }

    fn with_query(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.query.push((key, value.into()));
        self
    }

    // -- auth ---------------------------------------------------------------

    pub fn credential_login() -> Self {
        Self::new(Method::Post, "/auth", false)
    }

    pub fn external_login_link() -> Self {
        Self::new(Method::Get, "/auth/telegram/url", false)
    }

    pub fn external_login_poll() -> Self {
        Self::new(Method::Post, "/auth/telegram", false)
    }

    pub fn forgot_password() -> Self {
        Self::new(Method::Post, "/auth/forgot_password", false)
    }

    // -- settings -----------------------------------------------------------

    pub fn profile() -> Self {
        Self::new(Method::Get, "/settings/info", true)
    }

    pub fn set_login() -> Self {
        Self::new(Method::Post, "/settings/login/set", true)
    }

    pub fn set_email() -> Self {
        Self::new(Method::Post, "/settings/email/set", true)
    }

    pub fn change_password() -> Self {
        Self::new(Method::Post, "/settings/password/change", true)
    }

    pub fn telegram_connect() -> Self {
        Self::new(Method::Get, "/settings/telegram/connect", true)
    }

    pub fn telegram_disconnect() -> Self {
        Self::new(Method::Delete, "/settings/telegram/out", true)
    }

    // -- clubs --------------------------------------------------------------

    pub fn club_list() -> Self {
        Self::new(Method::Get, "/clubs/list", true)
    }

    pub fn club_detail(id: ClubId) -> Self {
        Self::new(Method::Get, format!("/clubs/get/{}", id.0), true)
    }

    pub fn club_create() -> Self {
        Self::new(Method::Post, "/clubs/new", true)
    }

    pub fn club_check_title() -> Self {
        Self::new(Method::Post, "/clubs/check_title", true)
    }

    pub fn club_join() -> Self {
        Self::new(Method::Post, "/clubs/join", true)
    }

    pub fn club_leave() -> Self {
        Self::new(Method::Post, "/clubs/leave", true)
    }

    // -- feeds --------------------------------------------------------------

    pub fn schedule(date: NaiveDate) -> Self {
        Self::new(Method::Get, "/schedule", true)
            .with_query("date", date.format("%Y-%m-%d").to_string())
    }

    pub fn news(feed: NewsFeed) -> Self {
        Self::new(Method::Get, format!("/news/{}", feed.slug()), true)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_formats_date_query() {
        let ep = Endpoint::schedule(NaiveDate::from_ymd_opt(2025, 9, 1).unwrap());
        assert_eq!(ep.path, "/schedule");
        assert_eq!(ep.query, vec![("date", "2025-09-01".to_string())]);
        assert!(ep.authenticated);
    }

    #[test]
    fn test_auth_endpoints_are_unauthenticated() {
        for ep in [
            Endpoint::credential_login(),
            Endpoint::external_login_link(),
            Endpoint::external_login_poll(),
            Endpoint::forgot_password(),
        ] {
            assert!(!ep.authenticated, "{ep} should not need a token");
        }
    }

    #[test]
    fn test_club_detail_embeds_id() {
        assert_eq!(Endpoint::club_detail(ClubId(17)).path, "/clubs/get/17");
    }

    #[test]
    fn test_news_path_per_feed() {
        assert_eq!(Endpoint::news(NewsFeed::Olympiads).path, "/news/olympiads");
    }

    #[test]
    fn test_display_shows_method_and_path() {
        assert_eq!(Endpoint::telegram_disconnect().to_string(), "DELETE /settings/telegram/out");
    }
}

//! Request and response schemas for every SchoolHub endpoint.
//!
//! The server's JSON is loosely shaped (fields come and go, one field is
//! sometimes a name and sometimes an id). Each endpoint gets an explicit
//! type here, so anything that does not fit is rejected at the boundary
//! instead of leaking half-read values into the client state.

use std::fmt;

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

use crate::ProtocolError;

/// Length of the description preview shown in news lists.
pub const NEWS_PREVIEW_CHARS: usize = 120;

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

/// Opaque bearer credential authorizing API calls.
///
/// `Debug` never prints the value, so a token can't end up in a log line
/// by accident. Use [`as_str`](Self::as_str) where the raw value is needed
/// (the `Authorization` header, the token file).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    /// `true` for an empty or whitespace-only token, which the server
    /// occasionally sends instead of an error status.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(***)")
    }
}

/// Short-lived identifier that ties an external-login link request to the
/// polls that follow it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemporaryToken(String);

impl TemporaryToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for TemporaryToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TemporaryToken(***)")
    }
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

/// Body of `POST /auth`.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub identifier: String,
    pub password: String,
}

impl Credentials {
    pub fn new(identifier: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("password", &"***")
            .finish()
    }
}

/// `{ "token": ... }`: returned by credential login and by a completed
/// external-login poll.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub token: SessionToken,
}

/// Response of `GET /auth/telegram/url`.
#[derive(Debug, Clone, Deserialize)]
pub struct ExternalLoginLink {
    /// Deep link the user must open to confirm the login.
    pub url: String,
    /// Correlates the polls with this attempt.
    pub token: TemporaryToken,
}

impl ExternalLoginLink {
    /// Parses `url` and checks that it is an absolute http(s) URL.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Malformed`] for relative URLs, other schemes
    /// (`javascript:`, `file:`, ...) and URLs without a host.
    pub fn validated_url(&self) -> Result<Url, ProtocolError> {
        parse_web_url(&self.url)
    }
}

/// Body of `POST /auth/telegram`.
#[derive(Debug, Clone, Serialize)]
pub struct ExternalLoginPoll {
    pub token: TemporaryToken,
}

/// Body of `POST /auth/forgot_password`.
#[derive(Clone, Serialize)]
pub struct PasswordReset {
    pub identifier: String,
    pub new_password: String,
}

impl fmt::Debug for PasswordReset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordReset")
            .field("identifier", &self.identifier)
            .field("new_password", &"***")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Response of `GET /settings/info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    #[serde(default)]
    pub surname: String,
    #[serde(default)]
    pub login: String,
    /// The server sends `""` for "no email linked"; both map to `None`.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub telegram_name: Option<String>,
    #[serde(default)]
    pub class_number: u8,
    #[serde(default)]
    pub class_letter: String,
}

impl Profile {
    /// "Name S.": first name plus surname initial.
    pub fn display_name(&self) -> String {
        match self.surname.chars().next() {
            Some(initial) => format!("{} {initial}.", self.name),
            None => self.name.clone(),
        }
    }

    /// "10A" style class label, or `None` when the class is unknown.
    pub fn class_label(&self) -> Option<String> {
        (self.class_number > 0).then(|| format!("{}{}", self.class_number, self.class_letter))
    }

    pub fn has_telegram(&self) -> bool {
        self.telegram_name.is_some()
    }
}

/// Body of `POST /settings/login/set`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginUpdate {
    pub login: String,
}

/// Body of `POST /settings/email/set`.
#[derive(Debug, Clone, Serialize)]
pub struct EmailUpdate {
    pub email: String,
}

/// Body of `POST /settings/password/change`.
#[derive(Clone, Serialize)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

impl fmt::Debug for PasswordChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordChange { .. }")
    }
}

/// Response of `GET /settings/telegram/connect`.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConnect {
    pub url: String,
}

impl TelegramConnect {
    /// Same rules as [`ExternalLoginLink::validated_url`].
    pub fn validated_url(&self) -> Result<Url, ProtocolError> {
        parse_web_url(&self.url)
    }
}

// ---------------------------------------------------------------------------
// Clubs
// ---------------------------------------------------------------------------

/// Server-assigned club identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClubId(pub u64);

impl fmt::Display for ClubId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "club-{}", self.0)
    }
}

/// Who runs a club. The server sends either the administrator's display
/// name or their numeric user id, depending on the endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Administration {
    Id(u64),
    Name(String),
}

impl fmt::Display for Administration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "user #{id}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

/// A club as returned by `/clubs/list`, `/clubs/get/{id}` and `/clubs/new`.
///
/// List entries omit the description, hence the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Club {
    pub id: ClubId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default)]
    pub class_limit_min: Option<u8>,
    #[serde(default)]
    pub class_limit_max: Option<u8>,
    #[serde(default)]
    pub members_count: u32,
    #[serde(default)]
    pub joined: bool,
    #[serde(default)]
    pub administration: Option<Administration>,
}

impl Club {
    /// "grades 5-9" style range, when the server provides both limits.
    pub fn grade_range(&self) -> Option<(u8, u8)> {
        self.class_limit_min.zip(self.class_limit_max)
    }
}

/// Body of `POST /clubs/join` and `POST /clubs/leave`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ClubRef {
    #[serde(rename = "clubId")]
    pub club_id: ClubId,
}

/// Body of `POST /clubs/check_title`.
#[derive(Debug, Clone, Serialize)]
pub struct TitleCheck {
    pub title: String,
}

/// Response of `POST /clubs/check_title`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TitleAvailability {
    #[serde(rename = "isUnique")]
    pub is_unique: bool,
}

/// Body of `POST /clubs/new`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NewClub {
    pub title: String,
    pub description: String,
    pub direction: String,
}

impl NewClub {
    /// All three fields are required and must not be blank.
    pub fn is_complete(&self) -> bool {
        [&self.title, &self.description, &self.direction]
            .iter()
            .all(|field| !field.trim().is_empty())
    }
}

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

/// One entry of `GET /schedule?date=...`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    #[serde(default)]
    pub title: Option<String>,
    pub start_time: String,
    pub stop_time: String,
    #[serde(default)]
    pub classrooms: Option<Vec<String>>,
}

impl Lesson {
    pub fn time_range(&self) -> String {
        format!("{} – {}", self.start_time, self.stop_time)
    }

    pub fn subject(&self) -> &str {
        self.title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or("Untitled lesson")
    }

    pub fn rooms(&self) -> String {
        match &self.classrooms {
            Some(rooms) if !rooms.is_empty() => rooms.join(", "),
            _ => "No classroom".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// News
// ---------------------------------------------------------------------------

/// The three news feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NewsFeed {
    Achievements,
    Events,
    Olympiads,
}

impl NewsFeed {
    pub const ALL: [NewsFeed; 3] = [Self::Achievements, Self::Events, Self::Olympiads];

    pub fn slug(self) -> &'static str {
        match self {
            Self::Achievements => "achievements",
            Self::Events => "events",
            Self::Olympiads => "olympiads",
        }
    }
}

impl fmt::Display for NewsFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl std::str::FromStr for NewsFeed {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|feed| feed.slug().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown news feed '{s}'"))
    }
}

/// One entry of a news feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// ISO date or RFC 3339 timestamp; see [`NewsItem::published_on`].
    pub date: String,
    #[serde(default)]
    pub image_path: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl NewsItem {
    /// The publication day, accepting both `2025-03-01` and full
    /// RFC 3339 timestamps. `None` if the server sent something else.
    pub fn published_on(&self) -> Option<NaiveDate> {
        DateTime::parse_from_rfc3339(&self.date)
            .map(|dt| dt.date_naive())
            .or_else(|_| NaiveDate::parse_from_str(&self.date, "%Y-%m-%d"))
            .ok()
    }

    /// First [`NEWS_PREVIEW_CHARS`] characters of the description.
    pub fn preview(&self) -> String {
        let mut chars = self.description.chars();
        let head: String = chars.by_ref().take(NEWS_PREVIEW_CHARS).collect();
        if chars.next().is_some() {
            format!("{head}...")
        } else {
            head
        }
    }

    /// Absolute URL of the item's image, resolved against the API base.
    /// A base without a trailing `/` keeps its last segment.
    pub fn image_url(&self, base: &Url) -> Option<Url> {
        let path = self.image_path.as_deref()?.trim();
        if path.is_empty() {
            return None;
        }
        let mut base = base.clone();
        if !base.path().ends_with('/') {
            let dir = format!("{}/", base.path());
            base.set_path(&dir);
        }
        base.join(path.trim_start_matches('/')).ok()
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Optional `{ "message": ... }` body of a rejected request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_web_url(raw: &str) -> Result<Url, ProtocolError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ProtocolError::Malformed(format!("invalid link '{raw}': {e}")))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ProtocolError::Malformed(format!(
            "link '{raw}' is not an absolute http(s) URL"
        )));
    }
    Ok(url)
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(url: &str) -> ExternalLoginLink {
        ExternalLoginLink {
            url: url.to_string(),
            token: TemporaryToken::new("tmp"),
        }
    }

    // =====================================================================
    // Tokens
    // =====================================================================

    #[test]
    fn test_session_token_debug_hides_value() {
        let token = SessionToken::new("super-secret");
        assert_eq!(format!("{token:?}"), "SessionToken(***)");
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = Credentials::new("ivanov", "hunter2");
        let printed = format!("{creds:?}");
        assert!(printed.contains("ivanov"));
        assert!(!printed.contains("hunter2"));
    }

    #[test]
    fn test_session_token_blank_detection() {
        assert!(SessionToken::new("  ").is_blank());
        assert!(!SessionToken::new("abc").is_blank());
    }

    // =====================================================================
    // Link validation
    // =====================================================================

    #[test]
    fn test_validated_url_accepts_https() {
        let url = link("https://t.me/school_hub_bot?start=abc").validated_url().unwrap();
        assert_eq!(url.host_str(), Some("t.me"));
    }

    #[test]
    fn test_validated_url_rejects_relative() {
        assert!(matches!(
            link("/auth/telegram").validated_url(),
            Err(ProtocolError::Malformed(_))
        ));
    }

    #[test]
    fn test_validated_url_rejects_other_schemes() {
        assert!(link("tg://resolve?domain=bot").validated_url().is_err());
        assert!(link("javascript:alert(1)").validated_url().is_err());
    }

    #[test]
    fn test_validated_url_rejects_empty() {
        assert!(link("").validated_url().is_err());
    }

    // =====================================================================
    // Clubs
    // =====================================================================

    #[test]
    fn test_club_administration_accepts_name_or_id() {
        let by_name: Club = serde_json::from_str(
            r#"{"id": 3, "title": "Chess", "administration": "Petrova A."}"#,
        )
        .unwrap();
        assert_eq!(
            by_name.administration,
            Some(Administration::Name("Petrova A.".into()))
        );

        let by_id: Club =
            serde_json::from_str(r#"{"id": 3, "title": "Chess", "administration": 42}"#).unwrap();
        assert_eq!(by_id.administration, Some(Administration::Id(42)));
    }

    #[test]
    fn test_club_administration_object_is_rejected() {
        let result: Result<Club, _> = serde_json::from_str(
            r#"{"id": 3, "title": "Chess", "administration": {"who": "?"}}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_club_list_entry_defaults_missing_fields() {
        let club: Club = serde_json::from_str(r#"{"id": 1, "title": "Robotics"}"#).unwrap();
        assert_eq!(club.members_count, 0);
        assert!(!club.joined);
        assert!(club.description.is_empty());
        assert_eq!(club.grade_range(), None);
    }

    #[test]
    fn test_club_negative_member_count_is_rejected() {
        let result: Result<Club, _> =
            serde_json::from_str(r#"{"id": 1, "title": "x", "members_count": -1}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_club_ref_uses_camel_case_key() {
        let json = serde_json::to_value(ClubRef { club_id: ClubId(9) }).unwrap();
        assert_eq!(json, serde_json::json!({ "clubId": 9 }));
    }

    #[test]
    fn test_title_availability_reads_is_unique() {
        let body: TitleAvailability = serde_json::from_str(r#"{"isUnique": false}"#).unwrap();
        assert!(!body.is_unique);
    }

    #[test]
    fn test_new_club_requires_all_fields() {
        let mut club = NewClub {
            title: "Chess".into(),
            description: "Weekly games".into(),
            direction: " ".into(),
        };
        assert!(!club.is_complete());
        club.direction = "Sport".into();
        assert!(club.is_complete());
    }

    // =====================================================================
    // Profile
    // =====================================================================

    #[test]
    fn test_profile_empty_email_is_none() {
        let profile: Profile = serde_json::from_str(
            r#"{"name": "Anna", "surname": "Ivanova", "login": "anna", "email": "",
                "telegram_name": null, "class_number": 10, "class_letter": "B"}"#,
        )
        .unwrap();
        assert_eq!(profile.email, None);
        assert!(!profile.has_telegram());
        assert_eq!(profile.display_name(), "Anna I.");
        assert_eq!(profile.class_label().as_deref(), Some("10B"));
    }

    #[test]
    fn test_profile_unknown_class_has_no_label() {
        let profile: Profile = serde_json::from_str(r#"{"name": "Anna"}"#).unwrap();
        assert_eq!(profile.class_label(), None);
        assert_eq!(profile.display_name(), "Anna");
    }

    // =====================================================================
    // Schedule / News
    // =====================================================================

    #[test]
    fn test_lesson_fallbacks() {
        let lesson: Lesson =
            serde_json::from_str(r#"{"start_time": "08:30", "stop_time": "09:15"}"#).unwrap();
        assert_eq!(lesson.subject(), "Untitled lesson");
        assert_eq!(lesson.rooms(), "No classroom");
        assert_eq!(lesson.time_range(), "08:30 – 09:15");
    }

    #[test]
    fn test_lesson_joins_classrooms() {
        let lesson: Lesson = serde_json::from_str(
            r#"{"title": "Physics", "start_time": "10:00", "stop_time": "10:45",
                "classrooms": ["201", "204"]}"#,
        )
        .unwrap();
        assert_eq!(lesson.subject(), "Physics");
        assert_eq!(lesson.rooms(), "201, 204");
    }

    #[test]
    fn test_news_feed_parses_case_insensitively() {
        assert_eq!("Events".parse::<NewsFeed>().unwrap(), NewsFeed::Events);
        assert!("sports".parse::<NewsFeed>().is_err());
    }

    #[test]
    fn test_news_item_published_on_accepts_both_formats() {
        let mut item = NewsItem {
            title: "t".into(),
            description: String::new(),
            date: "2025-03-01".into(),
            image_path: None,
            url: None,
        };
        assert_eq!(item.published_on(), NaiveDate::from_ymd_opt(2025, 3, 1));
        item.date = "2025-03-01T09:30:00+03:00".into();
        assert_eq!(item.published_on(), NaiveDate::from_ymd_opt(2025, 3, 1));
        item.date = "yesterday".into();
        assert_eq!(item.published_on(), None);
    }

    #[test]
    fn test_news_item_preview_truncates_long_descriptions() {
        let item = NewsItem {
            title: "t".into(),
            description: "я".repeat(200),
            date: "2025-03-01".into(),
            image_path: None,
            url: None,
        };
        let preview = item.preview();
        assert!(preview.ends_with("..."));
        assert_eq!(preview.chars().count(), NEWS_PREVIEW_CHARS + 3);
    }

    #[test]
    fn test_news_item_image_url_resolves_against_base() {
        let base = Url::parse("https://api.example.test/").unwrap();
        let item = NewsItem {
            title: "t".into(),
            description: "short".into(),
            date: "2025-03-01".into(),
            image_path: Some("/uploads/a.png".into()),
            url: None,
        };
        assert_eq!(
            item.image_url(&base).unwrap().as_str(),
            "https://api.example.test/uploads/a.png"
        );
        assert_eq!(item.preview(), "short");
    }

    #[test]
    fn test_news_item_image_url_base_without_slash_keeps_segment() {
        let base = Url::parse("http://localhost:8080/api").unwrap();
        let item = NewsItem {
            title: "t".into(),
            description: String::new(),
            date: "2025-03-01".into(),
            image_path: Some("/uploads/a.png".into()),
            url: None,
        };
        assert_eq!(
            item.image_url(&base).unwrap().as_str(),
            "http://localhost:8080/api/uploads/a.png"
        );
    }

    #[test]
    fn test_news_item_image_url_blank_path_is_none() {
        let base = Url::parse("http://localhost:8080/api/").unwrap();
        let item = NewsItem {
            title: "t".into(),
            description: String::new(),
            date: "2025-03-01".into(),
            image_path: Some("  ".into()),
            url: None,
        };
        assert_eq!(item.image_url(&base), None);
    }
}

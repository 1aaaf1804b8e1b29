//! Client configuration.

use std::time::Duration;

use schoolhub_poll::PollConfig;
use schoolhub_state::DEFAULT_NOTICE_TTL;
use tracing::warn;
use url::Url;

use crate::ClientError;

/// Production API root.
pub const DEFAULT_API_URL: &str = "https://api.school-hub.ru/";

/// Environment variable overriding [`ClientConfig::base_url`].
pub const ENV_API_URL: &str = "SCHOOLHUB_API_URL";

/// Environment variable overriding [`ClientConfig::request_timeout`], in
/// whole seconds.
pub const ENV_TIMEOUT_SECS: &str = "SCHOOLHUB_TIMEOUT_SECS";

/// Everything tunable about the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// API root; endpoint paths are joined onto it.
    pub base_url: Url,
    /// Timeout for every request except login polls. Default: 10 s.
    pub request_timeout: Duration,
    /// External-login polling budget.
    pub poll: PollConfig,
    /// How long transient notices stay up. Default: 5 s.
    pub notice_ttl: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout: Duration::from_secs(10),
            poll: PollConfig::default(),
            notice_ttl: DEFAULT_NOTICE_TTL,
            user_agent: concat!("schoolhub/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ClientConfig {
    pub const MIN_REQUEST_TIMEOUT: Duration = Duration::from_secs(1);
    pub const MAX_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

    /// Defaults overridden by `SCHOOLHUB_API_URL` and
    /// `SCHOOLHUB_TIMEOUT_SECS` where set.
    ///
    /// # Errors
    /// [`ClientError::Config`] if a variable is set but unparseable.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// [`from_env`](Self::from_env) with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ClientError> {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            config.base_url = Url::parse(raw.trim())
                .map_err(|e| ClientError::Config(format!("{ENV_API_URL}='{raw}': {e}")))?;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS).filter(|v| !v.trim().is_empty()) {
            let secs: u64 = raw
                .trim()
                .parse()
                .map_err(|e| ClientError::Config(format!("{ENV_TIMEOUT_SECS}='{raw}': {e}")))?;
            config.request_timeout = Duration::from_secs(secs);
        }

        Ok(config.validated())
    }

    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// Called by the client builder. Rules:
    /// - `request_timeout` kept within
    ///   `MIN_REQUEST_TIMEOUT..=MAX_REQUEST_TIMEOUT`.
    /// - `poll` validated by [`PollConfig::validated`].
    /// - A zero `notice_ttl` falls back to the default.
    pub fn validated(mut self) -> Self {
        if self.request_timeout < Self::MIN_REQUEST_TIMEOUT
            || self.request_timeout > Self::MAX_REQUEST_TIMEOUT
        {
            let clamped = self
                .request_timeout
                .clamp(Self::MIN_REQUEST_TIMEOUT, Self::MAX_REQUEST_TIMEOUT);
            warn!(
                requested_ms = self.request_timeout.as_millis() as u64,
                clamped_ms = clamped.as_millis() as u64,
                "request_timeout out of range, clamping"
            );
            self.request_timeout = clamped;
        }
        self.poll = self.poll.validated();
        if self.notice_ttl.is_zero() {
            warn!("notice_ttl is zero, using default");
            self.notice_ttl = DEFAULT_NOTICE_TTL;
        }
        self
    }
}

fn default_base_url() -> Url {
    Url::parse(DEFAULT_API_URL).expect("DEFAULT_API_URL is an absolute URL")
}

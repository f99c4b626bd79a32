//! Configuration for the status bot.

use std::env;
use tracing::warn;

/// Secret used when `GITLAB_HOOK_SECRET` is unset.
pub const DEFAULT_HOOK_SECRET: &str = "DoNotUseInProduction";

/// Status bot configuration, built once at startup.
#[derive(Clone)]
pub struct Config {
    /// HTTP server port.
    pub port: u16,
    /// Shared secret expected in `X-Gitlab-Token`.
    pub hook_secret: String,
    /// Personal/project access token with `api` scope.
    pub api_token: Option<String>,
    /// GitLab base URL (without `/api/v4`).
    pub gitlab_url: String,
    /// Per-request timeout for GitLab API calls.
    pub request_timeout_secs: u64,
    /// Page size used when walking a merge request's closes-list.
    pub page_size: u32,
    /// Serialize label updates per issue (off by default).
    pub serialize_issue_updates: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("hook_secret", &"<redacted>")
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("gitlab_url", &self.gitlab_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("page_size", &self.page_size)
            .field("serialize_issue_updates", &self.serialize_issue_updates)
            .finish()
    }
}

impl Config {
    /// Load configuration from the process environment, reading `.env` first if present.
    #[must_use]
    pub fn from_env() -> Self {
        // A missing .env file is the normal case in containers
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let hook_secret = get("GITLAB_HOOK_SECRET")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| {
                warn!("GITLAB_HOOK_SECRET not set - using insecure default secret");
                DEFAULT_HOOK_SECRET.to_string()
            });

        Self {
            port: get("STATUS_BOT_PORT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(5000),
            hook_secret,
            api_token: get("GITLAB_API_TOKEN").filter(|s| !s.is_empty()),
            gitlab_url: get("GITLAB_URL")
                .map(|s| s.trim_end_matches('/').to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "https://gitlab.com".to_string()),
            request_timeout_secs: get("GITLAB_REQUEST_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
            page_size: get("GITLAB_PAGE_SIZE")
                .and_then(|s| s.parse().ok())
                .filter(|n| (1..=100).contains(n))
                .unwrap_or(20),
            serialize_issue_updates: get("STATUS_BOT_SERIALIZE_ISSUES")
                .is_some_and(|v| v == "true" || v == "1"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

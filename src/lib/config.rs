use std::{
    collections::BTreeSet,
    env,
    path::{Path, PathBuf},
};

use thiserror::Error;

use crate::ApiToken;

/// Where images go when `SAVE_PATH` is not set.
pub const DEFAULT_SAVE_PATH: &str = "/home/pi/received_images/";

/// Default long-poll timeout in seconds.
pub const DEFAULT_POLL_TIMEOUT_S: i64 = 60;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("BOT_TOKEN is not set; put it in the environment or a .env file")]
    MissingToken,

    #[error("ALLOWED_USER_IDS must be comma-separated integers, got {0:?}")]
    InvalidUserId(String),

    #[error("POLL_TIMEOUT must be a positive integer, got {0:?}")]
    InvalidPollTimeout(String),
}

/// The Telegram user ids allowed to store images.
#[derive(Debug, Clone, PartialEq)]
pub struct AllowList(BTreeSet<i64>);

impl AllowList {
    pub fn new(ids: impl IntoIterator<Item = i64>) -> Self {
        Self(ids.into_iter().collect())
    }

    pub fn contains(&self, user_id: i64) -> bool {
        self.0.contains(&user_id)
    }
}

impl std::fmt::Display for AllowList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ids: Vec<String> = self.0.iter().map(|id| id.to_string()).collect();
        f.write_str(&ids.join(", "))
    }
}

/// Parses a comma-separated list of user ids. Blank entries are skipped, and a
/// list with no ids at all means "no restriction".
pub fn parse_allowed_users(value: &str) -> Result<Option<AllowList>, ConfigError> {
    let ids = value
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| {
            id.parse::<i64>()
                .map_err(|_| ConfigError::InvalidUserId(id.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if ids.is_empty() {
        return Ok(None);
    }

    Ok(Some(AllowList::new(ids)))
}

/// Parses a long-poll timeout in seconds, which must be positive.
pub fn parse_poll_timeout(value: &str) -> Result<i64, ConfigError> {
    value
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|timeout| *timeout > 0)
        .ok_or_else(|| ConfigError::InvalidPollTimeout(value.to_string()))
}

/// Process-wide settings, read once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct Config {
    pub token: ApiToken,
    pub save_path: PathBuf,

    /// `None` means everyone may store images.
    pub allowed_users: Option<AllowList>,

    pub poll_timeout_s: i64,
}

impl Config {
    pub fn new(token: impl Into<ApiToken>, save_path: impl Into<PathBuf>) -> Self {
        Self {
            token: token.into(),
            save_path: save_path.into(),
            allowed_users: None,
            poll_timeout_s: DEFAULT_POLL_TIMEOUT_S,
        }
    }

    pub fn with_allowed_users(mut self, allowed_users: impl IntoIterator<Item = i64>) -> Self {
        self.allowed_users = Some(AllowList::new(allowed_users));
        self
    }

    pub fn with_save_path(mut self, save_path: impl Into<PathBuf>) -> Self {
        self.save_path = save_path.into();
        self
    }

    pub fn with_poll_timeout_s(mut self, timeout_s: i64) -> Self {
        self.poll_timeout_s = timeout_s;
        self
    }

    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name to
    /// its value. A malformed `ALLOWED_USER_IDS` is logged and ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let token = lookup("BOT_TOKEN")
            .filter(|token| !token.trim().is_empty())
            .ok_or(ConfigError::MissingToken)?;

        let save_path = lookup("SAVE_PATH")
            .filter(|path| !path.is_empty())
            .unwrap_or_else(|| DEFAULT_SAVE_PATH.to_string());

        let allowed_users = match lookup("ALLOWED_USER_IDS") {
            None => None,
            Some(value) => parse_allowed_users(&value).unwrap_or_else(|err| {
                warn!("{}; allowing all users", err);
                None
            }),
        };

        let poll_timeout_s = match lookup("POLL_TIMEOUT") {
            None => DEFAULT_POLL_TIMEOUT_S,
            Some(value) => parse_poll_timeout(&value)?,
        };

        Ok(Self {
            token: token.into(),
            save_path: PathBuf::from(save_path),
            allowed_users,
            poll_timeout_s,
        })
    }

    pub fn save_path(&self) -> &Path {
        &self.save_path
    }

    /// Returns true if `user_id` may store images.
    pub fn is_authorized(&self, user_id: i64) -> bool {
        self.allowed_users
            .as_ref()
            .map_or(true, |allowed| allowed.contains(user_id))
    }
}

//! Application configuration, built once at startup and passed by reference

use crate::error::{OutreachError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const GOOGLE_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const GMAIL_SEND_SCOPE: &str = "https://www.googleapis.com/auth/gmail.send";

/// OAuth web-client settings for the mail provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OAuthClientConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub auth_uri: String,
    pub token_uri: String,
    pub scopes: Vec<String>,
}

impl OAuthClientConfig {
    /// Consent-screen URL requesting offline access
    pub fn authorization_url(&self, state: &str) -> Result<Url> {
        let scope = self.scopes.join(" ");
        Url::parse_with_params(
            &self.auth_uri,
            [
                ("response_type", "code"),
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("scope", scope.as_str()),
                ("state", state),
                ("access_type", "offline"),
                ("include_granted_scopes", "true"),
            ],
        )
        .map_err(|e| OutreachError::InvalidConfig {
            key: "auth_uri".into(),
            details: e.to_string(),
        })
    }
}

/// Inclusive bounds of the pause between consecutive sends, in seconds.
///
/// Only constructible through [`DelayRange::new`], so `min <= max` holds.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct DelayRange {
    min_secs: u64,
    max_secs: u64,
}

impl DelayRange {
    pub fn new(min_secs: u64, max_secs: u64) -> Result<Self> {
        if min_secs > max_secs {
            return Err(OutreachError::InvalidConfig {
                key: "OUTREACH_SEND_DELAY_MIN_SECS".into(),
                details: format!("minimum {min_secs}s exceeds maximum {max_secs}s"),
            });
        }
        Ok(Self { min_secs, max_secs })
    }

    #[must_use]
    pub const fn min_secs(&self) -> u64 {
        self.min_secs
    }

    #[must_use]
    pub const fn max_secs(&self) -> u64 {
        self.max_secs
    }

    #[must_use]
    pub const fn min(&self) -> Duration {
        Duration::from_secs(self.min_secs)
    }

    #[must_use]
    pub const fn max(&self) -> Duration {
        Duration::from_secs(self.max_secs)
    }
}

impl Default for DelayRange {
    fn default() -> Self {
        Self {
            min_secs: 5,
            max_secs: 12,
        }
    }
}

/// Everything the request handlers need from the environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub oauth: OAuthClientConfig,
    pub upload_dir: PathBuf,
    pub send_delay: DelayRange,
    pub trial_duration: chrono::Duration,
    pub access_db_path: PathBuf,
    pub payment_api_key: Option<String>,
    pub session_secret: Option<String>,
}

impl AppConfig {
    /// Load from the process environment, reading `.env` first if present
    pub fn from_env() -> Result<Self> {
        // Development convenience; absence is fine
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| OutreachError::MissingConfig(key.to_string()))
        };

        let oauth = OAuthClientConfig {
            client_id: required("GOOGLE_CLIENT_ID")?,
            client_secret: required("GOOGLE_CLIENT_SECRET")?,
            redirect_uri: required("REDIRECT_URI")?,
            auth_uri: GOOGLE_AUTH_URI.to_string(),
            token_uri: GOOGLE_TOKEN_URI.to_string(),
            scopes: vec![GMAIL_SEND_SCOPE.to_string()],
        };

        let defaults = DelayRange::default();
        let send_delay = DelayRange::new(
            parse_or(&lookup, "OUTREACH_SEND_DELAY_MIN_SECS", defaults.min_secs())?,
            parse_or(&lookup, "OUTREACH_SEND_DELAY_MAX_SECS", defaults.max_secs())?,
        )?;

        let trial_days: i64 = parse_or(&lookup, "OUTREACH_TRIAL_DAYS", 1)?;
        if trial_days < 1 {
            return Err(OutreachError::InvalidConfig {
                key: "OUTREACH_TRIAL_DAYS".into(),
                details: format!("must be at least 1, got {trial_days}"),
            });
        }

        let trial_duration = chrono::TimeDelta::try_days(trial_days).ok_or_else(|| {
            OutreachError::InvalidConfig {
                key: "OUTREACH_TRIAL_DAYS".into(),
                details: format!("{trial_days} days is out of range"),
            }
        })?;

        Ok(Self {
            oauth,
            upload_dir: lookup("OUTREACH_UPLOAD_DIR")
                .map_or_else(|| PathBuf::from("/tmp"), PathBuf::from),
            send_delay,
            trial_duration,
            access_db_path: lookup("OUTREACH_ACCESS_DB")
                .map_or_else(|| PathBuf::from("access.json"), PathBuf::from),
            payment_api_key: lookup("PAYMENT_API_KEY"),
            session_secret: lookup("SESSION_SECRET"),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse()
            .map_err(|e: T::Err| OutreachError::InvalidConfig {
                key: key.to_string(),
                details: e.to_string(),
            })
    })
}

use serde::Deserialize;
use std::fmt;
use std::time::Duration;

use crate::client::TimelineQuery;
use crate::error::{Error, Result};

pub const DEFAULT_COUNT: u32 = 20;
pub const DEFAULT_CACHE_EXPIRATION_SECS: u64 = 60;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const REDACTED: &str = "***REDACTED***";

/// Application credentials. Requests are signed with empty access-token
/// fields, which is enough to read a public timeline.
#[derive(Clone)]
pub struct Credentials {
    pub consumer_key: String,
    pub consumer_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("consumer_key", &REDACTED)
            .field("consumer_secret", &REDACTED)
            .finish()
    }
}

/// Loosely specified fetch options, as a caller or a config file supplies
/// them. Turn into a [`FetchConfig`] before use.
#[derive(Clone, Default, Deserialize)]
pub struct FetchOptions {
    pub consumer_key: Option<String>,
    pub consumer_secret: Option<String>,
    pub screen_name: Option<String>,
    pub count: Option<u32>,
    pub include_retweets: Option<bool>,
    pub show_retweeted_by: Option<bool>,
    pub cache_enabled: Option<bool>,
    pub cache_expiration_seconds: Option<u64>,
}

impl fmt::Debug for FetchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchOptions")
            .field("consumer_key", &self.consumer_key.as_ref().map(|_| REDACTED))
            .field("consumer_secret", &self.consumer_secret.as_ref().map(|_| REDACTED))
            .field("screen_name", &self.screen_name)
            .field("count", &self.count)
            .field("include_retweets", &self.include_retweets)
            .field("show_retweeted_by", &self.show_retweeted_by)
            .field("cache_enabled", &self.cache_enabled)
            .field("cache_expiration_seconds", &self.cache_expiration_seconds)
            .finish()
    }
}

impl FetchOptions {
    /// Fill every unset field from `fallback`.
    pub fn or(self, fallback: FetchOptions) -> FetchOptions {
        FetchOptions {
            consumer_key: self.consumer_key.or(fallback.consumer_key),
            consumer_secret: self.consumer_secret.or(fallback.consumer_secret),
            screen_name: self.screen_name.or(fallback.screen_name),
            count: self.count.or(fallback.count),
            include_retweets: self.include_retweets.or(fallback.include_retweets),
            show_retweeted_by: self.show_retweeted_by.or(fallback.show_retweeted_by),
            cache_enabled: self.cache_enabled.or(fallback.cache_enabled),
            cache_expiration_seconds: self
                .cache_expiration_seconds
                .or(fallback.cache_expiration_seconds),
        }
    }
}

/// Validated fetch configuration with defaults applied.
#[derive(Clone)]
pub struct FetchConfig {
    credentials: Credentials,
    screen_name: String,
    count: u32,
    include_retweets: bool,
    show_retweeted_by: bool,
    cache_enabled: bool,
    cache_expiration: Duration,
}

impl fmt::Debug for FetchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchConfig")
            .field("credentials", &self.credentials)
            .field("screen_name", &self.screen_name)
            .field("count", &self.count)
            .field("include_retweets", &self.include_retweets)
            .field("show_retweeted_by", &self.show_retweeted_by)
            .field("cache_enabled", &self.cache_enabled)
            .field("cache_expiration", &self.cache_expiration)
            .finish()
    }
}

impl TryFrom<FetchOptions> for FetchConfig {
    type Error = Error;

    fn try_from(options: FetchOptions) -> Result<Self> {
        Self::from_options(options)
    }
}

impl FetchConfig {
    /// Check required fields in declaration order and apply defaults. Fails
    /// on the first missing field.
    pub fn from_options(options: FetchOptions) -> Result<Self> {
        let consumer_key = required(options.consumer_key, "consumer_key")?;
        let consumer_secret = required(options.consumer_secret, "consumer_secret")?;
        let screen_name = required(
            options.screen_name.map(|name| normalize_screen_name(&name).to_string()),
            "screen_name",
        )?;

        let count = options.count.unwrap_or(DEFAULT_COUNT);
        if count == 0 {
            return Err(Error::InvalidField {
                field: "count",
                reason: "must be at least 1".into(),
            });
        }

        Ok(Self {
            credentials: Credentials {
                consumer_key,
                consumer_secret,
            },
            screen_name,
            count,
            include_retweets: options.include_retweets.unwrap_or(true),
            show_retweeted_by: options.show_retweeted_by.unwrap_or(true),
            cache_enabled: options.cache_enabled.unwrap_or(true),
            cache_expiration: Duration::from_secs(
                options
                    .cache_expiration_seconds
                    .unwrap_or(DEFAULT_CACHE_EXPIRATION_SECS),
            ),
        })
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn screen_name(&self) -> &str {
        &self.screen_name
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn include_retweets(&self) -> bool {
        self.include_retweets
    }

    pub fn show_retweeted_by(&self) -> bool {
        self.show_retweeted_by
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache_enabled
    }

    pub fn cache_expiration(&self) -> Duration {
        self.cache_expiration
    }

    pub fn query(&self) -> TimelineQuery {
        TimelineQuery {
            screen_name: self.screen_name.clone(),
            count: self.count,
            include_retweets: self.include_retweets,
        }
    }
}

/// Account handle as the API and the cache key expect it: no surrounding
/// whitespace and no leading `@`.
pub fn normalize_screen_name(screen_name: &str) -> &str {
    let trimmed = screen_name.trim();
    trimmed.strip_prefix('@').unwrap_or(trimmed).trim_start()
}

fn required(value: Option<String>, field: &'static str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(Error::MissingField { field }),
    }
}

/// Contents of the server's TOML config file. Credentials are mandatory; the
/// remaining fetch options act as defaults for every tool call.
#[derive(Clone, Deserialize)]
pub struct Settings {
    #[serde(flatten)]
    pub defaults: FetchOptions,
    pub timeout_secs: Option<u64>,
    pub base_url: Option<String>,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("defaults", &self.defaults)
            .field("timeout_secs", &self.timeout_secs)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), String> {
        if self.defaults.consumer_key.as_deref().is_none_or(|k| k.trim().is_empty()) {
            return Err("'consumer_key' is missing or empty in config".into());
        }
        if self
            .defaults
            .consumer_secret
            .as_deref()
            .is_none_or(|s| s.trim().is_empty())
        {
            return Err("'consumer_secret' is missing or empty in config".into());
        }
        if self.defaults.count == Some(0) {
            return Err("'count' must be at least 1".into());
        }
        if self.timeout_secs == Some(0) {
            return Err("'timeout_secs' must be at least 1".into());
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> FetchOptions {
        FetchOptions {
            consumer_key: Some("ck".into()),
            consumer_secret: Some("cs".into()),
            screen_name: Some("netglooweb".into()),
            ..Default::default()
        }
    }

    fn missing_field(options: FetchOptions) -> &'static str {
        match FetchConfig::from_options(options) {
            Err(Error::MissingField { field }) => field,
            other => panic!("expected a missing field error, got {other:?}"),
        }
    }

    #[test]
    fn defaults_are_applied() {
        let config = FetchConfig::from_options(complete()).unwrap();
        assert_eq!(config.screen_name(), "netglooweb");
        assert_eq!(config.count(), 20);
        assert!(config.include_retweets());
        assert!(config.show_retweeted_by());
        assert!(config.cache_enabled());
        assert_eq!(config.cache_expiration(), Duration::from_secs(60));
    }

    #[test]
    fn explicit_values_win_over_defaults() {
        let config = FetchConfig::from_options(FetchOptions {
            count: Some(5),
            include_retweets: Some(false),
            show_retweeted_by: Some(false),
            cache_enabled: Some(false),
            cache_expiration_seconds: Some(0),
            ..complete()
        })
        .unwrap();

        assert_eq!(config.count(), 5);
        assert!(!config.include_retweets());
        assert!(!config.show_retweeted_by());
        assert!(!config.cache_enabled());
        assert_eq!(config.cache_expiration(), Duration::ZERO);
    }

    #[test]
    fn each_required_field_is_reported() {
        assert_eq!(
            missing_field(FetchOptions {
                consumer_key: None,
                ..complete()
            }),
            "consumer_key"
        );
        assert_eq!(
            missing_field(FetchOptions {
                consumer_secret: None,
                ..complete()
            }),
            "consumer_secret"
        );
        assert_eq!(
            missing_field(FetchOptions {
                screen_name: Some("   ".into()),
                ..complete()
            }),
            "screen_name"
        );
    }

    #[test]
    fn first_missing_field_is_reported() {
        assert_eq!(missing_field(FetchOptions::default()), "consumer_key");
        assert_eq!(
            missing_field(FetchOptions {
                consumer_key: Some("ck".into()),
                ..Default::default()
            }),
            "consumer_secret"
        );
    }

    #[test]
    fn screen_name_is_normalized() {
        let config = FetchConfig::from_options(FetchOptions {
            screen_name: Some("  @nasa ".into()),
            ..complete()
        })
        .unwrap();
        assert_eq!(config.screen_name(), "nasa");
        assert_eq!(config.query().screen_name, "nasa");

        assert_eq!(
            missing_field(FetchOptions {
                screen_name: Some(" @ ".into()),
                ..complete()
            }),
            "screen_name"
        );
    }

    #[test]
    fn zero_count_is_rejected() {
        let err = FetchConfig::from_options(FetchOptions {
            count: Some(0),
            ..complete()
        })
        .unwrap_err();
        assert!(matches!(err, Error::InvalidField { field: "count", .. }));
    }

    #[test]
    fn or_prefers_explicit_values() {
        let merged = FetchOptions {
            screen_name: Some("nasa".into()),
            count: Some(3),
            ..Default::default()
        }
        .or(FetchOptions {
            count: Some(10),
            cache_enabled: Some(false),
            ..complete()
        });

        assert_eq!(merged.screen_name.as_deref(), Some("nasa"));
        assert_eq!(merged.count, Some(3));
        assert_eq!(merged.cache_enabled, Some(false));
        assert_eq!(merged.consumer_key.as_deref(), Some("ck"));
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let config = FetchConfig::from_options(FetchOptions {
            consumer_secret: Some("super-secret".into()),
            ..complete()
        })
        .unwrap();
        let rendered = format!("{config:?} {:?}", complete());
        assert!(!rendered.contains("super-secret"));
        assert!(!rendered.contains("\"ck\""));
        assert!(rendered.contains("netglooweb"));
    }

    #[test]
    fn settings_parse_from_toml() {
        let settings: Settings = toml::from_str(
            r#"
            consumer_key = "ck"
            consumer_secret = "cs"
            screen_name = "netglooweb"
            count = 5
            timeout_secs = 10
            "#,
        )
        .unwrap();

        assert!(settings.validate().is_ok());
        assert_eq!(settings.defaults.count, Some(5));
        assert_eq!(settings.timeout(), Duration::from_secs(10));
        assert_eq!(settings.base_url, None);
    }

    #[test]
    fn settings_without_credentials_are_invalid() {
        let settings: Settings = toml::from_str(r#"consumer_key = "ck""#).unwrap();
        let err = settings.validate().unwrap_err();
        assert!(err.contains("consumer_secret"));
    }
}

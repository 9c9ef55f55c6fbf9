//! calsync configuration.
//!
//! Read from ~/.config/calsync/config.toml (or the file named by
//! `CALSYNC_CONFIG`), with `CALSYNC__*` environment variables layered on top,
//! e.g. `CALSYNC__GOOGLE__REFRESH_TOKEN`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use calsync_core::{Compensation, SyncOptions, WeekdayZone};
use calsync_google::session::DEFAULT_TOKEN_URL;
use calsync_google::{Endpoints, GoogleCredentials, google::DEFAULT_API_BASE};
use chrono_tz::Tz;
use config::{Environment, File, FileFormat};
use serde::{Deserialize, Deserializer};

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Google calendar whose recurring events receive the descriptions
    pub calendar_id: String,

    /// iCal feed the descriptions come from
    pub feed_url: String,

    pub google: GoogleConfig,

    #[serde(default)]
    pub schedule: ScheduleConfig,

    #[serde(default)]
    pub matching: MatchingConfig,

    #[serde(default = "default_http_timeout", deserialize_with = "humantime_duration")]
    pub http_timeout: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleConfig {
    #[serde(flatten)]
    pub credentials: GoogleCredentials,

    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default = "default_token_url")]
    pub token_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    /// Delay between the end of one cycle and the start of the next
    #[serde(default = "default_interval", deserialize_with = "humantime_duration")]
    pub interval: Duration,

    /// Random extra delay, up to this much, added to each interval
    #[serde(default, deserialize_with = "humantime_duration")]
    pub jitter: Duration,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        ScheduleConfig {
            interval: default_interval(),
            jitter: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingConfig {
    /// Fixed offset added to feed timestamps (Pacific Daylight Time by default)
    #[serde(default = "default_source_offset", deserialize_with = "humantime_duration")]
    pub source_offset: Duration,

    /// Convert feed timestamps through the tz database instead of the fixed offset
    #[serde(default)]
    pub zone_aware: bool,

    /// Zone for feed timestamps without a usable label (zone-aware mode only)
    #[serde(default = "default_fallback_zone")]
    pub fallback_zone: String,

    /// Zone the weekday of calendar series is read in; the system zone if unset
    #[serde(default)]
    pub weekday_zone: Option<String>,

    #[serde(default = "default_true")]
    pub notify_attendees: bool,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        MatchingConfig {
            source_offset: default_source_offset(),
            zone_aware: false,
            fallback_zone: default_fallback_zone(),
            weekday_zone: None,
            notify_attendees: true,
        }
    }
}

/// No zone is more than a day away from UTC.
const MAX_SOURCE_OFFSET: Duration = Duration::from_secs(24 * 60 * 60);

fn default_http_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_interval() -> Duration {
    Duration::from_secs(10 * 60)
}

fn default_source_offset() -> Duration {
    Duration::from_secs(7 * 60 * 60)
}

fn default_fallback_zone() -> String {
    "America/Los_Angeles".to_string()
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_token_url() -> String {
    DEFAULT_TOKEN_URL.to_string()
}

fn default_true() -> bool {
    true
}

/// Durations are written the humantime way: "10m", "1h 30m", "45s".
fn humantime_duration<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    humantime::parse_duration(&s).map_err(serde::de::Error::custom)
}

/// Get the config file path (~/.config/calsync/config.toml unless CALSYNC_CONFIG is set)
pub fn config_path() -> Result<PathBuf> {
    if let Some(path) = std::env::var_os("CALSYNC_CONFIG") {
        return Ok(PathBuf::from(path));
    }

    Ok(dirs::config_dir()
        .context("Could not determine config directory")?
        .join("calsync")
        .join("config.toml"))
}

impl SyncConfig {
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml).required(false))
            .add_source(Environment::with_prefix("CALSYNC").separator("__"))
            .build()
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let config: SyncConfig = match settings.try_deserialize() {
            Ok(config) => config,
            Err(e) if !path.exists() => anyhow::bail!(
                "Config file not found at {} ({})\n\n\
                Create it with:\n\n\
                calendar_id = \"team@group.calendar.google.com\"\n\
                feed_url = \"https://example.com/team_schedule.ics\"\n\n\
                [google]\n\
                account = \"coach@example.org\"\n\
                client_id = \"your-client-id.apps.googleusercontent.com\"\n\
                client_secret = \"your-client-secret\"\n\
                refresh_token = \"1//refresh-token\"",
                path.display(),
                e
            ),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to parse config from {}", path.display()));
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document, without file or environment lookup.
    #[cfg(test)]
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: SyncConfig = config::Config::builder()
            .add_source(File::from_str(contents, FileFormat::Toml))
            .build()
            .context("Failed to read config")?
            .try_deserialize()
            .context("Failed to parse config")?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.calendar_id.trim().is_empty() {
            anyhow::bail!("calendar_id must not be empty");
        }
        if self.feed_url.trim().is_empty() {
            anyhow::bail!("feed_url must not be empty");
        }
        if self.schedule.interval.is_zero() {
            anyhow::bail!("schedule.interval must be greater than zero");
        }
        if self.matching.source_offset > MAX_SOURCE_OFFSET {
            anyhow::bail!(
                "matching.source_offset must be at most {}",
                humantime::format_duration(MAX_SOURCE_OFFSET)
            );
        }
        Ok(())
    }

    pub fn endpoints(&self) -> Result<Endpoints> {
        Endpoints::new(&self.google.api_base, &self.google.token_url)
            .context("Invalid Google endpoint configuration")
    }

    pub fn sync_options(&self) -> Result<SyncOptions> {
        let matching = &self.matching;

        let compensation = if matching.zone_aware {
            Compensation::ZoneAware {
                fallback: parse_zone(&matching.fallback_zone)?,
            }
        } else {
            let offset = chrono::Duration::from_std(matching.source_offset)
                .context("matching.source_offset is out of range")?;
            Compensation::FixedOffset(offset)
        };

        let weekday_zone = match matching.weekday_zone.as_deref() {
            Some(name) => WeekdayZone::Named(parse_zone(name)?),
            None => WeekdayZone::Local,
        };

        Ok(SyncOptions {
            compensation,
            weekday_zone,
            notify_attendees: matching.notify_attendees,
        })
    }
}

fn parse_zone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|e| anyhow::anyhow!("Unknown time zone '{}': {}", name, e))
}

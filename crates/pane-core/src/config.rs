//! Device configuration.
//!
//! The firmware bakes these values in at build time and the simulator reads
//! them from a TOML file; both end up with the same [`Config`].

use embassy_time::Duration;
use heapless::String;
use serde::Deserialize;
use thiserror_no_std::Error;

use crate::display::DISPLAY_HEIGHT_PX;
use crate::transport::RequestStyle;

pub const SSID_LEN: usize = 32;
pub const PASSWORD_LEN: usize = 64;
pub const BASE_URL_LEN: usize = 96;
pub const PAGE_ID_LEN: usize = 32;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is too long")]
    TooLong(&'static str),
    #[error("WiFi SSID is empty")]
    EmptySsid,
    #[error("server base URL is empty")]
    EmptyBaseUrl,
    #[error("tick period must be non-zero")]
    ZeroTick,
    #[error("stream period must be non-zero")]
    ZeroStreamPeriod,
    #[error("region count must be non-zero")]
    ZeroRegions,
    #[error("{regions} regions do not evenly divide a {height} px display")]
    RegionsDoNotDivide { height: u32, regions: u8 },
    #[error("failure threshold must be non-zero")]
    ZeroThreshold,
}

/// Which top-level loop drives the display.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Pager,
    Stream,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub internet: InternetConfig,
    pub server: ServerConfig,
    pub mode: Mode,
    pub pager: PagerConfig,
    pub stream: StreamConfig,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct InternetConfig {
    pub ssid: String<SSID_LEN>,
    pub password: String<PASSWORD_LEN>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    /// Scheme, host and port, without a trailing slash.
    pub base_url: String<BASE_URL_LEN>,
    /// Page identifier appended to the base URL for region and action requests.
    pub page: String<PAGE_ID_LEN>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let mut base_url = String::new();
        let _ = base_url.push_str("http://192.168.1.10:8080");
        let mut page = String::new();
        let _ = page.push_str("live");
        Self { base_url, page }
    }
}

#[derive(Deserialize, Debug, Clone, Copy)]
#[serde(default)]
pub struct PagerConfig {
    pub tick_ms: u32,
    /// How long the full header stays up after a switch or scheduled render.
    pub header_lifetime_ms: u32,
}

impl Default for PagerConfig {
    fn default() -> Self {
        Self {
            tick_ms: 100,
            header_lifetime_ms: 3_000,
        }
    }
}

impl PagerConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms as u64)
    }

    pub fn header_lifetime(&self) -> Duration {
        Duration::from_millis(self.header_lifetime_ms as u64)
    }
}

#[derive(Deserialize, Debug, Clone, Copy)]
#[serde(default)]
pub struct StreamConfig {
    /// Number of horizontal slices the screen is fetched in.
    pub regions: u8,
    pub period_ms: u32,
    /// Consecutive failed fetches before the backlight is switched off.
    pub failure_threshold: u32,
    /// How button commands are named when forwarded to the server.
    pub command_style: RequestStyle,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            regions: 1,
            period_ms: 40,
            failure_threshold: 5,
            command_style: RequestStyle::Url,
        }
    }
}

impl StreamConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms as u64)
    }
}

impl Config {
    /// Build a configuration from the four values every device needs,
    /// leaving everything else at its default.
    pub fn from_parts(
        ssid: &str,
        password: &str,
        base_url: &str,
        page: &str,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.internet.ssid = bounded(ssid, "ssid")?;
        config.internet.password = bounded(password, "password")?;
        config.server.base_url = bounded(base_url.trim_end_matches('/'), "base_url")?;
        config.server.page = bounded(page, "page")?;
        Ok(config)
    }

    /// Reject values the scheduler and streamer cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.internet.ssid.is_empty() {
            return Err(ConfigError::EmptySsid);
        }
        if self.server.base_url.is_empty() {
            return Err(ConfigError::EmptyBaseUrl);
        }
        if self.pager.tick_ms == 0 {
            return Err(ConfigError::ZeroTick);
        }
        if self.stream.period_ms == 0 {
            return Err(ConfigError::ZeroStreamPeriod);
        }
        if self.stream.regions == 0 {
            return Err(ConfigError::ZeroRegions);
        }
        if DISPLAY_HEIGHT_PX % self.stream.regions as u32 != 0 {
            return Err(ConfigError::RegionsDoNotDivide {
                height: DISPLAY_HEIGHT_PX,
                regions: self.stream.regions,
            });
        }
        if self.stream.failure_threshold == 0 {
            return Err(ConfigError::ZeroThreshold);
        }
        Ok(())
    }
}

fn bounded<const N: usize>(value: &str, field: &'static str) -> Result<String<N>, ConfigError> {
    let mut out = String::new();
    out.push_str(value).map_err(|_| ConfigError::TooLong(field))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Config {
        Config::from_parts("home", "hunter22", "http://10.0.0.2:8080/", "live").unwrap()
    }

    #[test]
    fn test_from_parts_strips_trailing_slash() {
        let config = valid();
        assert_eq!(config.server.base_url.as_str(), "http://10.0.0.2:8080");
        assert_eq!(config.server.page.as_str(), "live");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.mode, Mode::Pager);
        assert_eq!(config.pager.tick(), Duration::from_millis(100));
        assert_eq!(config.stream.period(), Duration::from_millis(40));
        assert_eq!(config.stream.failure_threshold, 5);
        assert_eq!(config.stream.regions, 1);
    }

    #[test]
    fn test_oversized_ssid_rejected() {
        let long = "x".repeat(SSID_LEN + 1);
        let err = Config::from_parts(&long, "", "http://a", "p").unwrap_err();
        assert_eq!(err, ConfigError::TooLong("ssid"));
    }

    #[test]
    fn test_validate_rejects_empty_ssid() {
        let mut config = valid();
        config.internet.ssid.clear();
        assert_eq!(config.validate(), Err(ConfigError::EmptySsid));
    }

    #[test]
    fn test_validate_rejects_uneven_regions() {
        let mut config = valid();
        config.stream.regions = 3;
        assert_eq!(
            config.validate(),
            Err(ConfigError::RegionsDoNotDivide {
                height: 160,
                regions: 3
            })
        );

        config.stream.regions = 4;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let mut config = valid();
        config.pager.tick_ms = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroTick));

        let mut config = valid();
        config.stream.failure_threshold = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroThreshold));

        let mut config = valid();
        config.stream.regions = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroRegions));
    }
}

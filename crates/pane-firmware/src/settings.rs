//! Settings baked in by `build.rs`.

use log::warn;
use pane_core::config::{Config, ConfigError, Mode};

const WIFI_SSID: &str = env!("PANE_WIFI_SSID");
const WIFI_PASSWORD: &str = env!("PANE_WIFI_PASSWORD");
const SERVER_URL: &str = env!("PANE_SERVER_URL");
const PAGE: &str = env!("PANE_PAGE");
const MODE: &str = env!("PANE_MODE");
const REGIONS: &str = env!("PANE_REGIONS");

/// The validated device configuration. Unset values keep their defaults.
pub fn device_config() -> Result<Config, ConfigError> {
    let defaults = Config::default();
    let server_url = non_empty(SERVER_URL).unwrap_or(&defaults.server.base_url);
    let page = non_empty(PAGE).unwrap_or(&defaults.server.page);

    let mut config = Config::from_parts(WIFI_SSID, WIFI_PASSWORD, server_url, page)?;
    config.mode = parse_mode(MODE);
    if let Some(regions) = non_empty(REGIONS) {
        match regions.parse() {
            Ok(regions) => config.stream.regions = regions,
            Err(_) => warn!("Ignoring PANE_REGIONS={}", regions),
        }
    }

    config.validate()?;
    Ok(config)
}

fn non_empty(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

fn parse_mode(value: &str) -> Mode {
    match value.trim() {
        "stream" => Mode::Stream,
        "" | "pager" => Mode::Pager,
        other => {
            warn!("Unknown PANE_MODE {}, using pager", other);
            Mode::Pager
        }
    }
}

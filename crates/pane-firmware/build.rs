//! Bakes the device settings from `.env` (or the build environment) into the
//! firmware image.

const SETTINGS: [&str; 6] = [
    "PANE_WIFI_SSID",
    "PANE_WIFI_PASSWORD",
    "PANE_SERVER_URL",
    "PANE_PAGE",
    "PANE_MODE",
    "PANE_REGIONS",
];

fn main() {
    if let Ok(path) = dotenvy::dotenv() {
        println!("cargo:rerun-if-changed={}", path.display());
    }

    for key in SETTINGS {
        let value = std::env::var(key).unwrap_or_default();
        println!("cargo:rustc-env={key}={value}");
        println!("cargo:rerun-if-env-changed={key}");
    }

    println!("cargo:rustc-link-arg=-Tlinkall.x");
}

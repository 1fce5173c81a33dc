//! Wi-Fi association and reconnection.

use embassy_net::Stack;
use embassy_time::{Duration, Timer, WithTimeout};
use esp_radio::wifi::{ClientConfig, ModeConfig, WifiController, WifiError};
use log::{info, warn};

const RETRY_BACKOFF_MIN_SECS: u64 = 2;
const RETRY_BACKOFF_MAX_SECS: u64 = 120;
const DHCP_TIMEOUT: Duration = Duration::from_secs(20);
const LINK_POLL_INTERVAL: Duration = Duration::from_millis(1000);

pub fn configure(
    controller: &mut WifiController<'_>,
    ssid: &str,
    password: &str,
) -> Result<(), WifiError> {
    let client_config = ModeConfig::Client(
        ClientConfig::default()
            .with_ssid(ssid.into())
            .with_password(password.into()),
    );
    controller.set_config(&client_config)
}

/// 2, 4, 8 ... seconds, capped at two minutes.
fn retry_backoff_secs(consecutive_failures: u32) -> u64 {
    let shift = consecutive_failures.min(6);
    RETRY_BACKOFF_MIN_SECS
        .saturating_mul(1u64 << shift)
        .min(RETRY_BACKOFF_MAX_SECS)
}

async fn wait_before_retry(consecutive_failures: &mut u32) {
    let delay_secs = retry_backoff_secs(*consecutive_failures);
    *consecutive_failures = consecutive_failures.saturating_add(1);
    info!(
        "Wi-Fi retrying in {}s ({} failures in a row)",
        delay_secs, *consecutive_failures
    );
    Timer::after_secs(delay_secs).await;
}

/// Keep the station associated forever, reconnecting whenever the link or
/// the DHCP lease is lost.
pub async fn connection_loop(controller: &mut WifiController<'_>, stack: Stack<'_>) -> ! {
    let mut consecutive_failures = 0u32;

    loop {
        if !controller.is_started().unwrap_or(false) {
            info!("Starting Wi-Fi");
            if let Err(e) = controller.start_async().await {
                warn!("Wi-Fi start failed: {:?}", e);
                wait_before_retry(&mut consecutive_failures).await;
                continue;
            }
        }

        if let Err(e) = controller.connect_async().await {
            warn!("Wi-Fi connect failed: {:?}", e);
            let _ = controller.disconnect_async().await;
            wait_before_retry(&mut consecutive_failures).await;
            continue;
        }

        if stack.wait_config_up().with_timeout(DHCP_TIMEOUT).await.is_err() {
            warn!("DHCP timed out, reconnecting");
            let _ = controller.disconnect_async().await;
            wait_before_retry(&mut consecutive_failures).await;
            continue;
        }

        if let Some(config) = stack.config_v4() {
            info!("Wi-Fi connected, address {}", config.address);
        }
        consecutive_failures = 0;

        while stack.is_link_up()
            && stack.config_v4().is_some()
            && matches!(controller.is_connected(), Ok(true))
        {
            Timer::after(LINK_POLL_INTERVAL).await;
        }

        warn!("Wi-Fi link lost, reconnecting");
        let _ = controller.disconnect_async().await;
        wait_before_retry(&mut consecutive_failures).await;
    }
}

/// Wait until the stack has a link and an IPv4 address.
pub async fn wait_for_ip(stack: Stack<'_>) {
    info!("Waiting for link...");
    while !stack.is_link_up() {
        Timer::after_millis(500).await;
    }

    info!("Waiting for IP...");
    loop {
        if let Some(config) = stack.config_v4() {
            info!("Got IP: {}", config.address);
            return;
        }
        Timer::after_millis(500).await;
    }
}

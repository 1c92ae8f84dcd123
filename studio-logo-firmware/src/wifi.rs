//! Station-mode Wi-Fi with credentials baked in at build time.

use anyhow::{anyhow, Result};
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::modem::Modem;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};
use log::{debug, info, warn};
use std::time::{Duration, Instant};

const WIFI_SSID: &str = env!("WIFI_SSID");
const WIFI_PASSWORD: &str = env!("WIFI_PASSWORD");

/// Delay between join attempts at boot
const RETRY_DELAY_MS: u32 = 1000;

/// Minimum time between reconnect attempts from the main loop
const RECONNECT_BACKOFF: Duration = Duration::from_secs(5);

/// Per-attempt wait for an IP address
const IP_WAIT: Duration = Duration::from_secs(3);

pub struct WifiLink {
    wifi: BlockingWifi<EspWifi<'static>>,
    last_attempt: Option<Instant>,
}

impl WifiLink {
    pub fn start(
        modem: Modem,
        sys_loop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
    ) -> Result<Self> {
        info!("Initializing WiFi...");
        let mut wifi = BlockingWifi::wrap(EspWifi::new(modem, sys_loop.clone(), Some(nvs))?, sys_loop)?;

        let auth_method = if WIFI_PASSWORD.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        wifi.set_configuration(&Configuration::Client(ClientConfiguration {
            ssid: WIFI_SSID
                .try_into()
                .map_err(|()| anyhow!("WiFi SSID '{WIFI_SSID}' is too long"))?,
            password: WIFI_PASSWORD
                .try_into()
                .map_err(|()| anyhow!("WiFi password is too long"))?,
            auth_method,
            ..Default::default()
        }))?;
        wifi.start()?;
        info!("WiFi started");

        Ok(Self {
            wifi,
            last_attempt: None,
        })
    }

    /// Keep trying until the station has an IP address.
    pub fn connect_blocking(&mut self) {
        loop {
            match self.try_connect() {
                Ok(()) => return,
                Err(e) => {
                    debug!("Connecting to WiFi... ({e})");
                    FreeRtos::delay_ms(RETRY_DELAY_MS);
                }
            }
        }
    }

    /// Check the link and start one reconnect attempt if it dropped.
    ///
    /// Attempts are spaced by [`RECONNECT_BACKOFF`] so a missing access point
    /// does not stall the controller loop.
    pub fn ensure_connected(&mut self) -> bool {
        if self.wifi.is_connected().unwrap_or(false) {
            return true;
        }
        if self
            .last_attempt
            .is_some_and(|at| at.elapsed() < RECONNECT_BACKOFF)
        {
            return false;
        }
        warn!("WiFi disconnected from '{WIFI_SSID}', reconnecting");
        match self.try_connect() {
            Ok(()) => true,
            Err(e) => {
                warn!("WiFi reconnect failed: {e}");
                false
            }
        }
    }

    fn try_connect(&mut self) -> Result<()> {
        self.last_attempt = Some(Instant::now());
        self.wifi.connect()?;
        let wifi = &self.wifi;
        wifi.ip_wait_while(|| wifi.is_up().map(|up| !up), Some(IP_WAIT))?;
        let ip_info = self.wifi.wifi().sta_netif().get_ip_info()?;
        info!("WiFi connected to '{WIFI_SSID}' with IP: {}", ip_info.ip);
        Ok(())
    }
}

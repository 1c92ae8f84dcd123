use anyhow::{anyhow, Result};
use log::{debug, info, warn, LevelFilter};
use serde::{Deserialize, Serialize};
use studio_logo_lib::control::{DEFAULT_MODE_TOPIC, DEFAULT_PALETTE_TOPIC};
use studio_logo_lib::controller::DEFAULT_INTERVAL_MS;
use studio_logo_lib::transition::{DEFAULT_DURATION_MS, DEFAULT_FRAME_STEP_MS};
use studio_logo_lib::{PowerBudget, Timing, Topics, STRIP_LEN};

use crate::storage::NvsStore;

const NVS_CONFIG_KEY: &str = "config";

/// Broker used when neither NVS nor the build environment names one.
const FALLBACK_MQTT_URL: &str = "mqtt://mqtt.local:1883";

/// Configurable log level
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
}

impl LogLevel {
    #[must_use]
    pub const fn as_level_filter(self) -> LevelFilter {
        match self {
            Self::Off => LevelFilter::Off,
            Self::Error => LevelFilter::Error,
            Self::Warn => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_mqtt_url")]
    pub mqtt_url: String,
    #[serde(default = "default_mqtt_client_id")]
    pub mqtt_client_id: String,
    #[serde(default = "default_mode_topic")]
    pub mode_topic: String,
    #[serde(default = "default_palette_topic")]
    pub palette_topic: String,
    #[serde(default = "default_led_gpio")]
    pub led_gpio: u8,
    #[serde(default = "default_total_leds")]
    pub total_leds: usize,
    /// Global LED brightness (0-255), applied after section brightness
    #[serde(default = "default_brightness")]
    pub brightness: u8,
    /// Supply current limit for the whole strip
    #[serde(default = "default_max_milliamps")]
    pub max_milliamps: u32,
    #[serde(default = "default_volts")]
    pub volts: u32,
    /// Time between mode ticks (ms)
    #[serde(default = "default_transition_interval_ms")]
    pub transition_interval_ms: u64,
    /// Length of a rotation blend (ms)
    #[serde(default = "default_transition_duration_ms")]
    pub transition_duration_ms: u64,
    /// Sleep between blend frames (ms)
    #[serde(default = "default_frame_step_ms")]
    pub frame_step_ms: u64,
    #[serde(default)]
    pub log_level: LogLevel,
}

fn default_mqtt_url() -> String {
    option_env!("MQTT_URL")
        .unwrap_or(FALLBACK_MQTT_URL)
        .to_string()
}

fn default_mqtt_client_id() -> String {
    "studio-logo".to_string()
}

fn default_mode_topic() -> String {
    DEFAULT_MODE_TOPIC.to_string()
}

fn default_palette_topic() -> String {
    DEFAULT_PALETTE_TOPIC.to_string()
}

const fn default_led_gpio() -> u8 {
    5
}

const fn default_total_leds() -> usize {
    STRIP_LEN
}

const fn default_brightness() -> u8 {
    255
}

const fn default_max_milliamps() -> u32 {
    1000
}

const fn default_volts() -> u32 {
    5
}

const fn default_transition_interval_ms() -> u64 {
    DEFAULT_INTERVAL_MS
}

const fn default_transition_duration_ms() -> u64 {
    DEFAULT_DURATION_MS
}

const fn default_frame_step_ms() -> u64 {
    DEFAULT_FRAME_STEP_MS
}

/// Shortest accepted tick interval
const MIN_TRANSITION_INTERVAL_MS: u64 = 1000;

/// Longest accepted blend; must stay under the task watchdog timeout
const MAX_TRANSITION_DURATION_MS: u64 = 3000;

impl Default for Config {
    fn default() -> Self {
        Self {
            mqtt_url: default_mqtt_url(),
            mqtt_client_id: default_mqtt_client_id(),
            mode_topic: default_mode_topic(),
            palette_topic: default_palette_topic(),
            led_gpio: default_led_gpio(),
            total_leds: default_total_leds(),
            brightness: default_brightness(),
            max_milliamps: default_max_milliamps(),
            volts: default_volts(),
            transition_interval_ms: default_transition_interval_ms(),
            transition_duration_ms: default_transition_duration_ms(),
            frame_step_ms: default_frame_step_ms(),
            log_level: LogLevel::default(),
        }
    }
}

impl Config {
    /// Clamp values to valid ranges and fix invalid values
    pub fn validate(&mut self) {
        if self.mqtt_url.is_empty() {
            warn!("MQTT URL is empty, resetting to default");
            self.mqtt_url = default_mqtt_url();
        }
        if self.mqtt_client_id.is_empty() {
            warn!("MQTT client id is empty, resetting to default");
            self.mqtt_client_id = default_mqtt_client_id();
        }
        if self.mode_topic.is_empty() {
            warn!("Mode topic is empty, resetting to default");
            self.mode_topic = default_mode_topic();
        }
        if self.palette_topic.is_empty() {
            warn!("Palette topic is empty, resetting to default");
            self.palette_topic = default_palette_topic();
        }
        if self.total_leds == 0 {
            warn!("total_leds is 0, resetting to {STRIP_LEN}");
            self.total_leds = default_total_leds();
        }
        if self.transition_duration_ms > MAX_TRANSITION_DURATION_MS {
            warn!(
                "Clamping transition_duration_ms from {} to {MAX_TRANSITION_DURATION_MS}",
                self.transition_duration_ms
            );
            self.transition_duration_ms = MAX_TRANSITION_DURATION_MS;
        }
        if self.transition_interval_ms < MIN_TRANSITION_INTERVAL_MS {
            warn!(
                "Clamping transition_interval_ms from {} to {MIN_TRANSITION_INTERVAL_MS}",
                self.transition_interval_ms
            );
            self.transition_interval_ms = MIN_TRANSITION_INTERVAL_MS;
        }
        if self.frame_step_ms == 0 {
            warn!("frame_step_ms is 0, resetting to {DEFAULT_FRAME_STEP_MS}");
            self.frame_step_ms = DEFAULT_FRAME_STEP_MS;
        }
    }

    /// Load from NVS, or store and return the defaults on first boot.
    pub fn load_or_default(store: &mut NvsStore) -> Self {
        match Self::load(store) {
            Ok(mut config) => {
                info!("Loaded config from NVS");
                config.validate();
                config
            }
            Err(e) => {
                warn!("Failed to load config from NVS: {e}, using defaults");
                let config = Self::default();
                if let Err(e) = config.save(store) {
                    warn!("Failed to save default config: {e}");
                }
                config
            }
        }
    }

    pub fn load(store: &NvsStore) -> Result<Self> {
        debug!("Loading config from NVS");
        let buf = store
            .load_blob(NVS_CONFIG_KEY)?
            .ok_or_else(|| anyhow!("No config found in NVS"))?;
        let config: Self = serde_json::from_slice(&buf)?;
        debug!(
            "Config parsed: mqtt_url={:?}, log_level={:?}, led_gpio={}",
            config.mqtt_url, config.log_level, config.led_gpio
        );
        Ok(config)
    }

    pub fn save(&self, store: &mut NvsStore) -> Result<()> {
        let json = serde_json::to_vec(self)?;
        debug!("Config JSON size: {} bytes", json.len());
        store.save_blob(NVS_CONFIG_KEY, &json)?;
        info!("Config saved to NVS");
        Ok(())
    }

    pub fn topics(&self) -> Topics {
        Topics {
            mode: self.mode_topic.clone(),
            palette: self.palette_topic.clone(),
        }
    }

    pub const fn timing(&self) -> Timing {
        Timing {
            interval_ms: self.transition_interval_ms,
            duration_ms: self.transition_duration_ms,
            frame_step_ms: self.frame_step_ms,
        }
    }

    pub const fn power_budget(&self) -> PowerBudget {
        PowerBudget::new(self.volts, self.max_milliamps)
    }
}

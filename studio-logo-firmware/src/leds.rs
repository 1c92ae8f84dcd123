//! WS2812 output for the sign
//!
//! Frames arrive already scaled by section brightness. Before transmission the
//! global brightness is lowered as far as needed to keep the strip inside its
//! power budget, and each pixel gets the strip's colour correction.

use anyhow::Result;
use esp_idf_hal::gpio::OutputPin;
use esp_idf_hal::peripheral::Peripheral;
use esp_idf_hal::rmt::config::TransmitConfig;
use esp_idf_hal::rmt::{RmtChannel, TxRmtDriver};
use log::debug;
use smart_leds::{brightness, SmartLedsWrite, RGB8};
use studio_logo_lib::power::max_brightness;
use studio_logo_lib::render::{correct, TYPICAL_LED_STRIP};
use studio_logo_lib::{Error, LedOutput, PowerBudget};
use ws2812_esp32_rmt_driver::Ws2812Esp32Rmt;

pub const STATUS_CONNECTING: RGB8 = RGB8::new(255, 0, 0);
pub const STATUS_CONNECTED: RGB8 = RGB8::new(0, 255, 0);

pub struct LedController {
    driver: Ws2812Esp32Rmt<'static>,
    brightness: u8,
    budget: PowerBudget,
    total_leds: usize,
    last_limited: Option<u8>,
}

impl LedController {
    pub fn new<C: RmtChannel, P: OutputPin>(
        pin: impl Peripheral<P = P> + 'static,
        channel: impl Peripheral<P = C> + 'static,
        total_leds: usize,
        initial_brightness: u8,
        budget: PowerBudget,
    ) -> Result<Self> {
        debug!(
            "Creating LED controller: {total_leds} LEDs, brightness {initial_brightness}, {}mW budget",
            budget.max_milliwatts()
        );
        // Extra RMT memory blocks keep the timing stable while Wi-Fi interrupts are active
        let config = TransmitConfig::new().clock_divider(1).mem_block_num(4);
        let tx_driver = TxRmtDriver::new(channel, pin, &config)?;
        let driver = Ws2812Esp32Rmt::new_with_rmt_driver(tx_driver)?;

        Ok(Self {
            driver,
            brightness: initial_brightness,
            budget,
            total_leds,
            last_limited: None,
        })
    }

    /// Light only pixel 0 in `color`; used while the network comes up.
    pub fn show_status(&mut self, color: RGB8) -> Result<()> {
        let mut leds = vec![RGB8::default(); self.total_leds];
        if let Some(first) = leds.first_mut() {
            *first = color;
        }
        self.write_leds(&leds)?;
        Ok(())
    }

    fn write_leds(&mut self, leds: &[RGB8]) -> Result<()> {
        let limited = max_brightness(leds, self.brightness, self.budget);
        if limited < self.brightness && self.last_limited != Some(limited) {
            debug!("Power limit: brightness {} -> {limited}", self.brightness);
        }
        self.last_limited = Some(limited);
        let corrected = leds.iter().map(|&px| correct(px, TYPICAL_LED_STRIP));
        self.driver.write(brightness(corrected, limited))?;
        Ok(())
    }
}

impl LedOutput for LedController {
    fn show(&mut self, pixels: &[RGB8]) -> studio_logo_lib::Result<()> {
        self.write_leds(pixels)
            .map_err(|e| Error::OutputUnavailable {
                reason: e.to_string(),
            })
    }
}

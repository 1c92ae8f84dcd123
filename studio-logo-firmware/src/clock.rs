use esp_idf_hal::delay::FreeRtos;
use std::time::Instant;
use studio_logo_lib::FrameClock;

/// Monotonic milliseconds since boot; sleeping yields to FreeRTOS.
pub struct EspClock {
    start: Instant,
}

impl EspClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for EspClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock for EspClock {
    fn now_ms(&self) -> u64 {
        u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn sleep_ms(&mut self, ms: u64) {
        FreeRtos::delay_ms(u32::try_from(ms).unwrap_or(u32::MAX));
    }
}

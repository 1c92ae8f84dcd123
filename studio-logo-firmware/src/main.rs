use anyhow::Result;
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::AnyIOPin;
use esp_idf_hal::prelude::*;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::{debug, error, info, warn};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;
use studio_logo_lib::{
    Controller, ControllerState, FrameClock, KeyValueStore, LedOutput, Palette, TickScheduler,
};

mod clock;
mod config;
mod leds;
mod mqtt;
mod storage;
mod thread_util;
mod watchdog;
mod wifi;

use clock::EspClock;
use config::Config;
use leds::{LedController, STATUS_CONNECTED, STATUS_CONNECTING};
use mqtt::{BusEvent, MqttBus};
use storage::NvsStore;
use watchdog::WatchdogHandle;
use wifi::WifiLink;

/// Longest single wait in the controller loop
const POLL_INTERVAL_MS: u64 = 1000;

/// How long the connected status pixel stays up before the palette takes over
const STATUS_HOLD_MS: u32 = 5000;

fn main() -> Result<()> {
    // It is necessary to call this function once. Otherwise some patches to the runtime
    // implemented by esp-idf-sys might not link properly. See https://github.com/esp-rs/esp-idf-template/issues/71
    esp_idf_svc::sys::link_patches();

    // Bind the log crate to the ESP Logging facilities
    esp_idf_svc::log::EspLogger::initialize_default();

    info!("Starting studio logo firmware...");

    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    let mut store = NvsStore::open(nvs.clone())?;
    let config = Config::load_or_default(&mut store);

    // Apply configured log level
    let level = config.log_level.as_level_filter();
    // Set for all targets (use "*" for global)
    if let Err(e) = esp_idf_svc::log::set_target_level("*", level) {
        warn!("Failed to set log level: {e}");
    } else {
        info!("Log level set to {:?}", config.log_level);
    }

    info!("Initializing LED controller on GPIO {}...", config.led_gpio);
    // SAFETY: We trust the user-configured GPIO pin number is valid for this board
    let led_pin = unsafe { AnyIOPin::new(i32::from(config.led_gpio)) };
    let mut leds = LedController::new(
        led_pin,
        peripherals.rmt.channel0,
        config.total_leds,
        config.brightness,
        config.power_budget(),
    )?;

    if let Err(e) = leds.show_status(STATUS_CONNECTING) {
        warn!("Failed to show WiFi status: {e}");
    }
    let mut wifi = WifiLink::start(peripherals.modem, sys_loop, nvs)?;
    wifi.connect_blocking();
    if let Err(e) = leds.show_status(STATUS_CONNECTED) {
        warn!("Failed to show WiFi status: {e}");
    }
    FreeRtos::delay_ms(STATUS_HOLD_MS);

    let timing = config.timing();
    let state = ControllerState::new(Palette::studio_logo()?, config.total_leds);
    let mut controller = Controller::new(state, store, leds, EspClock::new()).with_timing(timing);
    controller.startup();

    let (events_tx, events_rx) = mpsc::channel();
    let mut bus = MqttBus::start(
        &config.mqtt_url,
        &config.mqtt_client_id,
        config.topics(),
        events_tx,
    )?;

    info!("All systems running!");
    run(&mut controller, &mut bus, &mut wifi, &events_rx)
}

/// Controller loop: apply bus events as they arrive and tick on schedule.
fn run<S, O, C>(
    controller: &mut Controller<S, O, C>,
    bus: &mut MqttBus,
    wifi: &mut WifiLink,
    events: &Receiver<BusEvent>,
) -> Result<()>
where
    S: KeyValueStore,
    O: LedOutput,
    C: FrameClock,
{
    let watchdog = WatchdogHandle::register(c"controller")?;
    let interval_ms = controller.timing().interval_ms;
    let mut scheduler = TickScheduler::new(interval_ms, controller.clock().now_ms());
    info!("Controller loop started, ticking every {interval_ms}ms");

    loop {
        watchdog.feed();

        let wait_ms = scheduler
            .remaining(controller.clock().now_ms())
            .min(POLL_INTERVAL_MS);
        match events.recv_timeout(Duration::from_millis(wait_ms)) {
            Ok(BusEvent::Connected) => {
                info!("MQTT connected");
                if let Err(e) = bus.subscribe_all() {
                    error!("MQTT subscribe failed: {e:?}");
                }
            }
            Ok(BusEvent::Disconnected) => {
                warn!("MQTT disconnected, client will reconnect");
            }
            Ok(BusEvent::Control(message)) => {
                debug!("Control message: {message:?}");
                let problems = controller.handle(message);
                if !problems.is_empty() {
                    debug!("Message applied with {} problems", problems.len());
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                error!("MQTT event channel closed");
                FreeRtos::delay_ms(1000);
            }
        }

        wifi.ensure_connected();

        if scheduler.due(controller.clock().now_ms()) {
            let outcome = controller.tick();
            debug!("Tick: {outcome:?}");
        }
    }
}

//! Helper for spawning threads with FreeRTOS task names
//!
//! Rust's `std::thread::Builder::name()` sets the pthread name after creation,
//! but ESP-IDF creates the FreeRTOS task at pthread creation time with the
//! default name. This module uses `ThreadSpawnConfiguration` to set the name
//! and stack size before spawning.

use esp_idf_hal::task::thread::ThreadSpawnConfiguration;
use esp_idf_svc::sys::EspError;
use std::ffi::CStr;
use std::thread::JoinHandle;

/// Spawn a thread with a FreeRTOS task name and stack size in bytes.
///
/// FreeRTOS task names are limited to 16 characters including the null terminator.
///
/// # Example
/// ```ignore
/// spawn_named(c"mqtt_pump", 8192, || { /* ... */ })?;
/// ```
pub fn spawn_named<F, T>(name: &'static CStr, stack_size: usize, f: F) -> Result<JoinHandle<T>, EspError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    // Get current config to restore after spawn
    let prev_conf = ThreadSpawnConfiguration::get();

    let conf = ThreadSpawnConfiguration {
        name: Some(name.to_bytes_with_nul()),
        stack_size,
        ..Default::default()
    };
    conf.set()?;

    let handle = std::thread::spawn(f);

    // Restore previous config, or the defaults if none was set
    prev_conf.unwrap_or_default().set()?;

    Ok(handle)
}

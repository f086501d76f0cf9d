//! Process-wide RHI state: the logger sink and the driver backend registry.

use std::sync::{OnceLock, RwLock};
use std::time::SystemTime;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use crate::device::{Device, DeviceConfig};
use crate::driver::Driver;
use crate::error::{Error, Result};
use crate::log::{DefaultLogger, LogEntry, LogSeverity, Logger};

/// Factory building a driver for a backend name
pub type DriverFactory = Box<dyn Fn(&DeviceConfig) -> Result<Box<dyn Driver>> + Send + Sync>;

static LOGGER: OnceLock<RwLock<Box<dyn Logger>>> = OnceLock::new();
static BACKENDS: OnceLock<Mutex<FxHashMap<String, DriverFactory>>> = OnceLock::new();

fn backends() -> &'static Mutex<FxHashMap<String, DriverFactory>> {
    BACKENDS.get_or_init(|| Mutex::new(FxHashMap::default()))
}

fn logger() -> &'static RwLock<Box<dyn Logger>> {
    LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)))
}

/// Global entry point of the RHI
///
/// Backends register a driver factory under a name; applications then ask
/// for a logical device by that name.
///
/// ```no_run
/// use hearth_rhi::hearth::{Rhi, DeviceConfig};
///
/// hearth_rhi_headless::register();
/// let device = Rhi::create_logical_device("headless", DeviceConfig::default())
///     .expect("headless backend");
/// ```
pub struct Rhi;

impl Rhi {
    /// Register (or replace) a driver backend under `name`
    pub fn register_backend<F>(name: &str, factory: F)
    where
        F: Fn(&DeviceConfig) -> Result<Box<dyn Driver>> + Send + Sync + 'static,
    {
        let replaced = backends()
            .lock()
            .insert(name.to_string(), Box::new(factory))
            .is_some();
        if replaced {
            crate::rhi_warn!("hearth::Rhi", "Backend '{}' re-registered", name);
        } else {
            crate::rhi_debug!("hearth::Rhi", "Backend '{}' registered", name);
        }
    }

    /// Names of every registered backend, sorted
    pub fn available_backends() -> Vec<String> {
        let mut names: Vec<String> = backends().lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Create a logical device on the named backend
    ///
    /// Returns `None` (after logging) when the backend is unknown or its
    /// driver fails to initialize.
    pub fn create_logical_device(backend: &str, config: DeviceConfig) -> Option<Device> {
        match Self::try_create_logical_device(backend, config) {
            Ok(device) => Some(device),
            Err(err) => {
                crate::rhi_error!("hearth::Rhi", "Cannot create device on '{}': {}", backend, err);
                None
            }
        }
    }

    fn try_create_logical_device(backend: &str, config: DeviceConfig) -> Result<Device> {
        let driver = {
            let registry = backends().lock();
            let factory = registry.get(backend).ok_or_else(|| {
                Error::InitializationFailed(format!("unknown backend '{}'", backend))
            })?;
            factory(&config)?
        };
        Device::from_driver(driver, config)
    }

    /// Remove every registered backend (test isolation)
    pub fn reset_for_testing() {
        backends().lock().clear();
    }

    /// Replace the logger sink
    pub fn set_logger<L: Logger + 'static>(logger_impl: L) {
        if let Ok(mut lock) = logger().write() {
            *lock = Box::new(logger_impl);
        }
    }

    /// Restore the colored console logger
    pub fn reset_logger() {
        if let Ok(mut lock) = logger().write() {
            *lock = Box::new(DefaultLogger);
        }
    }

    /// Log without location (used by the rhi_* macros)
    pub fn log(severity: LogSeverity, source: &str, message: String) {
        if let Ok(lock) = logger().read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: None,
                line: None,
            });
        }
    }

    /// Log with file:line (used by rhi_error!/rhi_err!)
    pub fn log_detailed(
        severity: LogSeverity,
        source: &str,
        message: String,
        file: &'static str,
        line: u32,
    ) {
        if let Ok(lock) = logger().read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: Some(file),
                line: Some(line),
            });
        }
    }
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;

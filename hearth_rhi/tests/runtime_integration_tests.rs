//! Integration tests for the backend registry and the logging system
//!
//! Both are process-wide, so every test here is serialized.
//!
//! Run with: cargo test --test runtime_integration_tests

use std::sync::{Arc, Mutex};
use hearth_rhi::hearth::log::{LogEntry, LogSeverity, Logger};
use hearth_rhi::hearth::resource::{BufferDesc, BufferUsage};
use hearth_rhi::hearth::driver::ContextId;
use hearth_rhi::hearth::{Device, DeviceConfig, Error, Rhi};
use hearth_rhi_headless::HeadlessDriver;
use serial_test::serial;

// ============================================================================
// TEST LOGGER IMPLEMENTATION
// ============================================================================

/// Test logger that captures log entries for verification
struct TestLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl TestLogger {
    fn new() -> (Self, Arc<Mutex<Vec<LogEntry>>>) {
        let entries = Arc::new(Mutex::new(Vec::new()));
        (Self { entries: entries.clone() }, entries)
    }
}

impl Logger for TestLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

fn messages_from(entries: &Arc<Mutex<Vec<LogEntry>>>, source: &str) -> Vec<LogEntry> {
    entries
        .lock()
        .unwrap()
        .iter()
        .filter(|e| e.source == source)
        .cloned()
        .collect()
}

// ============================================================================
// BACKEND REGISTRY
// ============================================================================

#[test]
#[serial]
fn test_integration_headless_backend_registration() {
    Rhi::reset_for_testing();
    assert!(Rhi::available_backends().is_empty());

    hearth_rhi_headless::register();

    assert_eq!(Rhi::available_backends(), vec![hearth_rhi_headless::BACKEND_NAME.to_string()]);
    let device = Rhi::create_logical_device(
        hearth_rhi_headless::BACKEND_NAME,
        DeviceConfig::default().with_debug_name("registry").with_main_surface(320, 200),
    )
    .unwrap();
    let ctx = device.create_context(None).unwrap();
    assert!(ctx.is_main());
    assert_eq!(ctx.surface().width, 320);
    assert_eq!(device.config().debug_name, "registry");

    drop(ctx);
    drop(device);
    Rhi::reset_for_testing();
}

#[test]
#[serial]
fn test_integration_unknown_backend_returns_none() {
    Rhi::reset_for_testing();
    let (logger, entries) = TestLogger::new();
    Rhi::set_logger(logger);

    let device = Rhi::create_logical_device("vulkan", DeviceConfig::default());

    assert!(device.is_none());
    let errors = messages_from(&entries, "hearth::Rhi");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].severity, LogSeverity::Error);
    assert!(errors[0].message.contains("unknown backend 'vulkan'"));
    assert!(errors[0].file.is_some());

    Rhi::reset_logger();
}

#[test]
#[serial]
fn test_integration_factory_failure_returns_none() {
    Rhi::reset_for_testing();
    Rhi::register_backend("broken", |_| Err(Error::InitializationFailed("no display".to_string())));
    Rhi::register_backend("sorted-after", |config| Ok(Box::new(HeadlessDriver::from_config(config))));

    assert_eq!(Rhi::available_backends(), vec!["broken".to_string(), "sorted-after".to_string()]);
    assert!(Rhi::create_logical_device("broken", DeviceConfig::default()).is_none());
    assert!(Rhi::create_logical_device("sorted-after", DeviceConfig::default()).is_some());

    Rhi::reset_for_testing();
}

#[test]
#[serial]
fn test_integration_reregistering_backend_warns() {
    Rhi::reset_for_testing();
    let (logger, entries) = TestLogger::new();
    Rhi::set_logger(logger);

    hearth_rhi_headless::register();
    hearth_rhi_headless::register();

    let warnings: Vec<LogEntry> = messages_from(&entries, "hearth::Rhi")
        .into_iter()
        .filter(|e| e.severity == LogSeverity::Warn)
        .collect();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].message.contains("re-registered"));
    assert_eq!(Rhi::available_backends().len(), 1);

    Rhi::reset_logger();
    Rhi::reset_for_testing();
}

// ============================================================================
// LOGGING
// ============================================================================

#[test]
#[serial]
fn test_integration_custom_logger() {
    let (logger, entries) = TestLogger::new();
    Rhi::set_logger(logger);

    Rhi::log(LogSeverity::Info, "test::module", "Test info message".to_string());
    Rhi::log(LogSeverity::Warn, "test::module", "Test warning message".to_string());
    Rhi::log_detailed(LogSeverity::Error, "test::module", "Test error message".to_string(), "lib.rs", 42);

    let logged = messages_from(&entries, "test::module");
    assert_eq!(logged.len(), 3);
    assert_eq!(logged[0].severity, LogSeverity::Info);
    assert_eq!(logged[1].message, "Test warning message");
    assert_eq!((logged[2].file, logged[2].line), (Some("lib.rs"), Some(42)));
    assert_eq!((logged[0].file, logged[0].line), (None, None));

    Rhi::reset_logger();
}

#[test]
#[serial]
fn test_integration_driver_validation_reaches_the_logger() {
    let (logger, entries) = TestLogger::new();
    Rhi::set_logger(logger);
    let config = DeviceConfig::default().with_debug_name("validated").with_validation(true);
    let driver = HeadlessDriver::from_config(&config);
    let monitor = driver.monitor();
    let device = Device::from_driver(Box::new(driver), config).unwrap();
    let mut ctx = device.create_context(None).unwrap();
    let buffer = device.create_buffer(&BufferDesc::new(16, BufferUsage::STORAGE), None).unwrap();

    ctx.write_buffer(&buffer, 0, &[1, 2, 3, 4]);
    assert!(messages_from(&entries, "hearth::Headless").is_empty());

    // Misuse straight on the driver, below the RHI
    assert!(!device.driver().lock().make_current(Some(ContextId(999))));

    let warnings = messages_from(&entries, "hearth::Headless");
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].severity, LogSeverity::Warn);
    assert!(warnings[0].message.starts_with("make_current"));
    assert_eq!(monitor.errors().len(), 1);
    assert!(messages_from(&entries, "hearth::Device").iter().any(|e| e.message.contains("validated")));

    drop(buffer);
    drop(ctx);
    drop(device);
    Rhi::reset_logger();
}

#[test]
#[serial]
fn test_integration_silent_driver_keeps_errors_for_inspection() {
    let (logger, entries) = TestLogger::new();
    Rhi::set_logger(logger);
    let config = DeviceConfig::default().with_validation(false);
    let driver = HeadlessDriver::from_config(&config);
    let monitor = driver.monitor();
    let device = Device::from_driver(Box::new(driver), config).unwrap();
    let ctx = device.create_context(None).unwrap();

    assert!(!device.driver().lock().make_current(Some(ContextId(999))));

    assert_eq!(monitor.errors().len(), 1);
    assert!(messages_from(&entries, "hearth::Headless").is_empty());
    // The failed switch left the main context current
    assert_eq!(monitor.current_context(), Some(ctx.id()));

    drop(ctx);
    drop(device);
    Rhi::reset_logger();
}

/*!
# Hearth RHI - Headless Backend

GPU-less driver for `hearth_rhi`.

Native objects are simulated in memory (buffer contents, texture storage,
sparse page commitment, framebuffer attachments, queries, fences) and every
call is validated the way a strict driver would, including the per-context
ownership of vertex arrays, program pipelines and framebuffers. Violations
are logged through the RHI logger and kept for inspection.

Useful for tests, CI machines without a GPU and tooling that only needs the
RHI's bookkeeping.
*/

mod world;
mod headless_driver;
mod monitor;

pub use headless_driver::HeadlessDriver;
pub use monitor::HeadlessMonitor;
pub use world::{Command, ObjectKind};

use hearth_rhi::hearth::Rhi;

/// Backend name used with [`Rhi::create_logical_device`]
pub const BACKEND_NAME: &str = "headless";

/// Register the headless backend with the RHI
///
/// # Example
///
/// ```
/// use hearth_rhi::hearth::{DeviceConfig, Rhi};
///
/// hearth_rhi_headless::register();
/// let device = Rhi::create_logical_device("headless", DeviceConfig::default()).unwrap();
/// let context = device.create_context(None).unwrap();
/// assert!(context.is_main());
/// ```
pub fn register() {
    Rhi::register_backend(BACKEND_NAME, |config| Ok(Box::new(HeadlessDriver::from_config(config))));
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

mod config;
mod device;

pub use config::*;
pub use device::*;
pub(crate) use device::DeviceShared;

mod driver;
mod shared;
pub mod native;

#[cfg(test)]
pub(crate) mod mock_driver;

pub use driver::*;
pub use shared::SharedDriver;
pub(crate) use shared::Release;

//! GPU fences

use std::sync::Arc;
use crate::driver::{native, NativeEnum, NativeHandle, Release, SharedDriver};

/// Outcome of waiting on a fence from the CPU
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStatus {
    /// Signaled before the wait started
    AlreadySignaled,
    /// Signaled during the wait
    ConditionSatisfied,
    TimeoutExpired,
    /// The driver reported an error (lost context, invalid sync)
    Failed,
}

impl WaitStatus {
    pub(crate) fn from_native(value: NativeEnum) -> Self {
        match value {
            native::ALREADY_SIGNALED => WaitStatus::AlreadySignaled,
            native::CONDITION_SATISFIED => WaitStatus::ConditionSatisfied,
            native::TIMEOUT_EXPIRED => WaitStatus::TimeoutExpired,
            _ => WaitStatus::Failed,
        }
    }

    pub fn is_signaled(self) -> bool {
        matches!(self, WaitStatus::AlreadySignaled | WaitStatus::ConditionSatisfied)
    }
}

/// Sync object inserted into a context's command stream
pub struct Fence {
    sync: NativeHandle,
    driver: Arc<SharedDriver>,
}

impl Fence {
    pub(crate) fn new(sync: NativeHandle, driver: Arc<SharedDriver>) -> Self {
        Self { sync, driver }
    }

    pub fn handle(&self) -> NativeHandle {
        self.sync
    }

    /// Block until signaled or `timeout_ns` elapses
    pub fn wait(&self, timeout_ns: u64) -> WaitStatus {
        let status = WaitStatus::from_native(self.driver.lock().client_wait_sync(self.sync, true, timeout_ns));
        if status == WaitStatus::Failed {
            crate::rhi_error!("hearth::Fence", "Waiting on sync {} failed", self.sync);
        }
        status
    }

    /// Non-blocking poll
    pub fn is_signaled(&self) -> bool {
        WaitStatus::from_native(self.driver.lock().client_wait_sync(self.sync, false, 0)).is_signaled()
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        self.driver.release(Release::Sync(self.sync));
    }
}

use std::sync::Arc;
use crate::driver::{ContextId, SharedDriver};

/// Keeps a context current; dropping it makes the previous context current again
#[must_use = "the previous context is restored as soon as the scope is dropped"]
pub struct ContextScope {
    driver: Arc<SharedDriver>,
    previous: Option<ContextId>,
    activated: ContextId,
}

impl ContextScope {
    pub(crate) fn enter(driver: &Arc<SharedDriver>, context: ContextId) -> Self {
        let mut gl = driver.lock();
        let previous = gl.current_context();
        if previous != Some(context) && !gl.make_current(Some(context)) {
            crate::rhi_error!("hearth::ContextScope", "Cannot make context {:?} current", context);
        }
        drop(gl);
        Self {
            driver: Arc::clone(driver),
            previous,
            activated: context,
        }
    }

    pub fn context(&self) -> ContextId {
        self.activated
    }

    /// Context current before this scope
    pub fn previous(&self) -> Option<ContextId> {
        self.previous
    }
}

impl Drop for ContextScope {
    fn drop(&mut self) {
        if self.previous == Some(self.activated) {
            return;
        }
        let mut gl = self.driver.lock();
        if !gl.make_current(self.previous) {
            crate::rhi_warn!("hearth::ContextScope", "Cannot restore context {:?}", self.previous);
        }
    }
}

//! Driver ownership shared by the device, its contexts and every resource.
//!
//! Resources release their native objects from `Drop`, which may run while
//! another part of the RHI holds the driver lock. Releases are therefore
//! queued and executed the next time the driver is locked.

use parking_lot::{Mutex, MutexGuard};
use smallvec::SmallVec;
use super::{ContextId, Driver, NativeHandle};

/// Native object awaiting deletion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Release {
    Buffer(NativeHandle),
    Texture(NativeHandle),
    Sampler(NativeHandle),
    Program(NativeHandle),
    Query(NativeHandle),
    TransformFeedback(NativeHandle),
    Sync(NativeHandle),
    /// Container objects are not shared between contexts: delete with `context` current
    VertexArray { context: ContextId, handle: NativeHandle },
    ProgramPipeline { context: ContextId, handle: NativeHandle },
}

impl Release {
    fn context(&self) -> Option<ContextId> {
        match *self {
            Release::VertexArray { context, .. } | Release::ProgramPipeline { context, .. } => {
                Some(context)
            }
            _ => None,
        }
    }

    fn execute(self, gl: &mut dyn Driver) {
        match self {
            Release::Buffer(h) => gl.delete_buffer(h),
            Release::Texture(h) => gl.delete_texture(h),
            Release::Sampler(h) => gl.delete_sampler(h),
            Release::Program(h) => gl.delete_program(h),
            Release::Query(h) => gl.delete_query(h),
            Release::TransformFeedback(h) => gl.delete_transform_feedback(h),
            Release::Sync(h) => gl.delete_sync(h),
            Release::VertexArray { handle, .. } => gl.delete_vertex_array(handle),
            Release::ProgramPipeline { handle, .. } => gl.delete_program_pipeline(handle),
        }
    }
}

/// The driver plus its deferred-release queue
pub struct SharedDriver {
    driver: Mutex<Box<dyn Driver>>,
    releases: Mutex<Vec<Release>>,
}

impl SharedDriver {
    pub fn new(driver: Box<dyn Driver>) -> Self {
        Self {
            driver: Mutex::new(driver),
            releases: Mutex::new(Vec::new()),
        }
    }

    /// Lock the driver, executing queued releases first
    pub fn lock(&self) -> MutexGuard<'_, Box<dyn Driver>> {
        let mut gl = self.driver.lock();
        self.flush_releases(&mut **gl);
        gl
    }

    /// Queue a native object for deletion
    pub(crate) fn release(&self, release: Release) {
        self.releases.lock().push(release);
    }

    /// Number of releases waiting for the next lock
    pub fn pending_releases(&self) -> usize {
        self.releases.lock().len()
    }

    fn flush_releases(&self, gl: &mut dyn Driver) {
        let pending = std::mem::take(&mut *self.releases.lock());
        if pending.is_empty() {
            return;
        }
        Self::execute(pending, gl);
    }

    /// Execute the releases bound to `context` (which must be current) and
    /// drop the ones nobody can execute anymore once it is destroyed.
    pub(crate) fn flush_context_releases(&self, gl: &mut dyn Driver, context: ContextId) {
        let mine: Vec<Release> = {
            let mut queue = self.releases.lock();
            let (mine, others): (Vec<Release>, Vec<Release>) = queue
                .drain(..)
                .partition(|r| r.context() == Some(context));
            *queue = others;
            mine
        };
        for release in mine {
            release.execute(gl);
        }
    }

    fn execute(pending: Vec<Release>, gl: &mut dyn Driver) {
        let mut per_context: SmallVec<[(ContextId, Release); 8]> = SmallVec::new();
        for release in pending {
            match release.context() {
                Some(context) => per_context.push((context, release)),
                None => release.execute(gl),
            }
        }
        if per_context.is_empty() {
            return;
        }

        let previous = gl.current_context();
        per_context.sort_by_key(|(context, _)| *context);
        let mut active = previous;
        for (context, release) in per_context {
            if active != Some(context) {
                if !gl.make_current(Some(context)) {
                    crate::rhi_warn!(
                        "hearth::Driver",
                        "Context {:?} is gone, dropping {:?}",
                        context,
                        release
                    );
                    continue;
                }
                active = Some(context);
            }
            release.execute(gl);
        }
        if active != previous {
            gl.make_current(previous);
        }
    }
}

impl Drop for SharedDriver {
    fn drop(&mut self) {
        let pending = std::mem::take(self.releases.get_mut());
        if !pending.is_empty() {
            Self::execute(pending, &mut **self.driver.get_mut());
        }
    }
}

#[cfg(test)]
#[path = "shared_tests.rs"]
mod tests;

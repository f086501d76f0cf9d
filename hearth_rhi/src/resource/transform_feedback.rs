//! Transform feedback objects

use std::sync::Arc;
use crate::driver::{NativeHandle, Release, SharedDriver};
use crate::error::Result;
use super::{next_uid, Buffer};

/// Maximum capture buffers per transform feedback object
pub const MAX_TRANSFORM_FEEDBACK_BUFFERS: usize = 4;

/// One capture buffer range
#[derive(Debug, Clone)]
pub struct TransformFeedbackBinding {
    pub buffer: Arc<Buffer>,
    pub offset: u64,
    pub size: u64,
}

/// Transform feedback object with its capture buffers
///
/// Holds its buffers alive for as long as it exists.
pub struct TransformFeedback {
    uid: u64,
    handle: NativeHandle,
    bindings: Vec<TransformFeedbackBinding>,
    driver: Arc<SharedDriver>,
}

impl TransformFeedback {
    pub(crate) fn create(driver: &Arc<SharedDriver>, bindings: &[TransformFeedbackBinding]) -> Result<Self> {
        if bindings.len() > MAX_TRANSFORM_FEEDBACK_BUFFERS {
            crate::rhi_error!(
                "hearth::TransformFeedback",
                "{} capture buffers requested, at most {} supported",
                bindings.len(),
                MAX_TRANSFORM_FEEDBACK_BUFFERS
            );
            return Err(crate::error::Error::InvalidResource("too many capture buffers".to_string()));
        }

        let mut gl = driver.lock();
        let handle = gl.create_transform_feedback();
        if handle == 0 {
            crate::rhi_bail!("hearth::TransformFeedback", "Driver refused to create a transform feedback object");
        }
        for (index, binding) in bindings.iter().enumerate() {
            gl.transform_feedback_buffer_range(handle, index as u32, binding.buffer.handle(), binding.offset, binding.size);
        }
        drop(gl);

        Ok(Self {
            uid: next_uid(),
            handle,
            bindings: bindings.to_vec(),
            driver: Arc::clone(driver),
        })
    }

    pub fn uid(&self) -> u64 {
        self.uid
    }

    pub fn handle(&self) -> NativeHandle {
        self.handle
    }

    pub fn bindings(&self) -> &[TransformFeedbackBinding] {
        &self.bindings
    }
}

impl Drop for TransformFeedback {
    fn drop(&mut self) {
        self.driver.release(Release::TransformFeedback(self.handle));
    }
}

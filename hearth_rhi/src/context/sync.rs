//! Queries, transform feedback and synchronization commands.

use std::sync::Arc;
use bitflags::bitflags;
use crate::driver::{native, NativeEnum, NativeHandle};
use crate::resource::{Buffer, Fence, QueryPool, QueryType, TransformFeedback, WaitStatus};
use super::immediate_context::ImmediateContext;

bitflags! {
    /// Incoherent writes that must become visible before the named use
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MemoryBarriers: u32 {
        const VERTEX_ATTRIB_ARRAY = native::VERTEX_ATTRIB_ARRAY_BARRIER_BIT;
        const ELEMENT_ARRAY = native::ELEMENT_ARRAY_BARRIER_BIT;
        const UNIFORM = native::UNIFORM_BARRIER_BIT;
        const TEXTURE_FETCH = native::TEXTURE_FETCH_BARRIER_BIT;
        const SHADER_IMAGE_ACCESS = native::SHADER_IMAGE_ACCESS_BARRIER_BIT;
        const COMMAND = native::COMMAND_BARRIER_BIT;
        const PIXEL_BUFFER = native::PIXEL_BUFFER_BARRIER_BIT;
        const TEXTURE_UPDATE = native::TEXTURE_UPDATE_BARRIER_BIT;
        const BUFFER_UPDATE = native::BUFFER_UPDATE_BARRIER_BIT;
        const FRAMEBUFFER = native::FRAMEBUFFER_BARRIER_BIT;
        const TRANSFORM_FEEDBACK = native::TRANSFORM_FEEDBACK_BARRIER_BIT;
        const ATOMIC_COUNTER = native::ATOMIC_COUNTER_BARRIER_BIT;
        const SHADER_STORAGE = native::SHADER_STORAGE_BARRIER_BIT;
        const CLIENT_MAPPED_BUFFER = native::CLIENT_MAPPED_BUFFER_BARRIER_BIT;
        const QUERY_BUFFER = native::QUERY_BUFFER_BARRIER_BIT;
    }
}

impl MemoryBarriers {
    /// Every barrier bit the driver knows
    pub fn everything() -> Self {
        Self::from_bits_retain(native::ALL_BARRIER_BITS)
    }
}

/// Transform feedback capture running on a context
#[derive(Debug, Clone, Copy)]
pub(crate) struct ActiveTransformFeedback {
    pub uid: u64,
    pub primitive_mode: NativeEnum,
    pub paused: bool,
}

/// Capture primitive class of a draw topology
fn capture_mode(topology: NativeEnum) -> Option<NativeEnum> {
    match topology {
        native::POINTS => Some(native::POINTS),
        native::LINES | native::LINE_STRIP | native::LINE_LOOP => Some(native::LINES),
        native::TRIANGLES | native::TRIANGLE_STRIP | native::TRIANGLE_FAN => Some(native::TRIANGLES),
        _ => None,
    }
}

impl ImmediateContext {
    // ===== QUERIES =====

    /// Start query `index` of `pool`; one query per type may be active
    pub fn begin_query(&mut self, pool: &QueryPool, index: u32) {
        debug_assert!(pool.query_type() != QueryType::Timestamp, "timestamps are written, not begun");
        let target = pool.target();
        let active = self.active_queries.iter().any(|&(t, _)| t == target);
        debug_assert!(!active, "a {:?} query is already active", pool.query_type());
        if active || pool.query_type() == QueryType::Timestamp {
            crate::rhi_error!("hearth::ImmediateContext", "Cannot begin a {:?} query here", pool.query_type());
            return;
        }
        let query = pool.query(index);
        self.with_gl(|_, gl| gl.begin_query(target, query));
        self.active_queries.push((target, query));
    }

    pub fn end_query(&mut self, pool: &QueryPool, index: u32) {
        let target = pool.target();
        let query = pool.query(index);
        let Some(position) = self.active_queries.iter().position(|&active| active == (target, query)) else {
            debug_assert!(false, "end_query without a matching begin_query");
            crate::rhi_error!("hearth::ImmediateContext", "end_query without a matching begin_query");
            return;
        };
        self.active_queries.remove(position);
        self.with_gl(|_, gl| gl.end_query(target));
    }

    /// Record the GPU time once previous commands complete
    pub fn write_timestamp(&mut self, pool: &QueryPool, index: u32) {
        debug_assert_eq!(pool.query_type(), QueryType::Timestamp);
        if pool.query_type() != QueryType::Timestamp {
            crate::rhi_error!("hearth::ImmediateContext", "write_timestamp on a {:?} pool", pool.query_type());
            return;
        }
        let query = pool.query(index);
        self.with_gl(|_, gl| gl.query_counter(query, native::TIMESTAMP));
    }

    /// Write `count` 64-bit results into `buffer` on the GPU timeline
    pub fn copy_query_results(&mut self, pool: &QueryPool, first: u32, count: u32, buffer: &Buffer, offset: u64, wait: bool) {
        let end = u64::from(first) + u64::from(count);
        if end > u64::from(pool.len()) || offset + u64::from(count) * 8 > buffer.size() {
            debug_assert!(false, "query result copy out of range");
            crate::rhi_error!("hearth::ImmediateContext", "Query result copy out of range");
            return;
        }
        let pname = if wait { native::QUERY_RESULT } else { native::QUERY_RESULT_NO_WAIT };
        self.with_gl(|_, gl| {
            for i in 0..count {
                gl.get_query_buffer_object_u64(pool.query(first + i), buffer.handle(), pname, offset + u64::from(i) * 8);
            }
        });
    }

    /// Read results on the CPU; `false` when `wait` is off and a result is not ready yet
    pub fn get_query_results(&mut self, pool: &QueryPool, first: u32, out: &mut [u64], wait: bool) -> bool {
        if u64::from(first) + out.len() as u64 > u64::from(pool.len()) {
            debug_assert!(false, "query readback out of range");
            crate::rhi_error!("hearth::ImmediateContext", "Query readback out of range");
            return false;
        }
        let pname = if wait { native::QUERY_RESULT } else { native::QUERY_RESULT_NO_WAIT };
        self.with_gl(|_, gl| {
            for (i, slot) in out.iter_mut().enumerate() {
                match gl.get_query_object_u64(pool.query(first + i as u32), pname) {
                    Some(value) => *slot = value,
                    None => return false,
                }
            }
            true
        })
    }

    // ===== TRANSFORM FEEDBACK =====

    /// Start capturing into `xfb` with the bound pipeline's primitive class
    pub fn begin_transform_feedback(&mut self, xfb: &TransformFeedback) {
        debug_assert!(self.transform_feedback.is_none(), "transform feedback already active");
        let mode = self
            .pipeline
            .as_ref()
            .filter(|p| !p.is_compute())
            .and_then(|p| capture_mode(p.topology()));
        let Some(mode) = mode.filter(|_| self.transform_feedback.is_none()) else {
            crate::rhi_error!(
                "hearth::ImmediateContext",
                "begin_transform_feedback needs a point, line or triangle pipeline and no active capture"
            );
            return;
        };
        self.with_gl(|ctx, gl| {
            ctx.bind_transform_feedback_object(gl, xfb.handle());
            gl.begin_transform_feedback(mode);
        });
        self.transform_feedback = Some(ActiveTransformFeedback {
            uid: xfb.uid(),
            primitive_mode: mode,
            paused: false,
        });
    }

    pub fn pause_transform_feedback(&mut self) {
        match self.transform_feedback.as_mut() {
            Some(active) if !active.paused => active.paused = true,
            _ => {
                debug_assert!(false, "no running transform feedback to pause");
                return;
            }
        }
        self.with_gl(|_, gl| gl.pause_transform_feedback());
    }

    pub fn resume_transform_feedback(&mut self) {
        match self.transform_feedback.as_mut() {
            Some(active) if active.paused => active.paused = false,
            _ => {
                debug_assert!(false, "no paused transform feedback to resume");
                return;
            }
        }
        self.with_gl(|_, gl| gl.resume_transform_feedback());
    }

    pub fn end_transform_feedback(&mut self) {
        let Some(active) = self.transform_feedback.take() else {
            debug_assert!(false, "end_transform_feedback without a capture");
            return;
        };
        crate::rhi_trace!(
            "hearth::ImmediateContext",
            "Transform feedback {} captured as {:#x}",
            active.uid,
            active.primitive_mode
        );
        self.with_gl(|_, gl| gl.end_transform_feedback());
    }

    /// Draw the vertices captured by `xfb` with the bound pipeline
    pub fn draw_transform_feedback(&mut self, xfb: &TransformFeedback, instance_count: u32) {
        if instance_count == 0 {
            return;
        }
        let Some(pipeline) = self.pipeline.clone().filter(|p| !p.is_compute()) else {
            debug_assert!(false, "draw_transform_feedback without a graphics pipeline");
            crate::rhi_error!("hearth::ImmediateContext", "draw_transform_feedback without a graphics pipeline");
            return;
        };
        self.with_gl(|ctx, gl| {
            ctx.update_vertex_buffers(gl, &pipeline);
            ctx.update_shader_bindings(gl, &pipeline);
            gl.draw_transform_feedback(pipeline.topology(), xfb.handle(), instance_count as i32);
        });
        self.stats.draw_calls += 1;
    }

    fn bind_transform_feedback_object(&mut self, gl: &mut dyn crate::driver::Driver, handle: NativeHandle) {
        if self.state.transform_feedback != handle {
            gl.bind_transform_feedback(handle);
            self.state.transform_feedback = handle;
        }
    }

    // ===== SYNCHRONIZATION =====

    /// Fence signaled once every command issued so far completes
    pub fn fence_sync(&mut self) -> Fence {
        let sync = self.with_gl(|_, gl| gl.fence_sync());
        Fence::new(sync, Arc::clone(&self.device.driver))
    }

    /// Block the CPU on `fence`, flushing this context first
    pub fn client_wait(&mut self, fence: &Fence, timeout_ns: u64) -> WaitStatus {
        let status = WaitStatus::from_native(self.with_gl(|_, gl| gl.client_wait_sync(fence.handle(), true, timeout_ns)));
        if status == WaitStatus::Failed {
            crate::rhi_error!("hearth::ImmediateContext", "Waiting on sync {} failed", fence.handle());
        }
        status
    }

    /// Make this context's GPU queue wait on `fence` (typically from another context)
    pub fn server_wait(&mut self, fence: &Fence) {
        self.with_gl(|_, gl| gl.wait_sync(fence.handle()));
    }

    pub fn memory_barrier(&mut self, barriers: MemoryBarriers) {
        if barriers.is_empty() {
            return;
        }
        self.with_gl(|_, gl| gl.memory_barrier(barriers.bits()));
    }

    /// Order framebuffer writes before texture fetches of the same texels
    pub fn texture_barrier(&mut self) {
        self.with_gl(|_, gl| gl.texture_barrier());
    }

    pub fn flush(&mut self) {
        self.with_gl(|_, gl| gl.flush());
    }

    pub fn finish(&mut self) {
        self.with_gl(|_, gl| gl.finish());
    }
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;

//! Vertex input layouts and their per-context vertex array objects.
//!
//! A layout is immutable and shareable across contexts. The native vertex
//! array it configures is a container object, so each context that draws
//! with the layout gets its own lazily created VAO.

use std::sync::Arc;
use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use crate::driver::{ContextId, Driver, NativeHandle, Release, SharedDriver};
use crate::error::{Error, Result};
use crate::resource::next_uid;
use crate::state_tables;
use super::per_context::PerContext;

/// Maximum vertex buffer bindings
pub const MAX_VERTEX_BUFFERS: usize = 16;

/// Maximum vertex attribute locations
pub const MAX_VERTEX_ATTRIBUTES: usize = 16;

/// Format of one vertex attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    Float,
    Float2,
    Float3,
    Float4,
    Half2,
    Half4,
    UByte4,
    UByte4Norm,
    Byte4Norm,
    Short2,
    Short2Norm,
    UShort2Norm,
    Short4Norm,
    UInt,
    UInt2,
    UInt3,
    UInt4,
    Int,
    Int2,
    Int3,
    Int4,
    Rgb10A2Norm,
}

impl VertexFormat {
    pub const COUNT: usize = 22;

    /// Size in bytes
    pub fn size(self) -> u32 {
        state_tables::vertex_format(self).size
    }
}

/// Vertex input rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexInputRate {
    PerVertex,
    /// Advance once every `divisor` instances
    PerInstance(u32),
}

/// Vertex buffer binding slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexBufferLayout {
    pub binding: u32,
    pub stride: u32,
    pub input_rate: VertexInputRate,
}

/// Vertex attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    pub location: u32,
    pub binding: u32,
    pub format: VertexFormat,
    pub offset: u32,
}

/// Complete vertex input description
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct VertexLayoutDesc {
    pub buffers: Vec<VertexBufferLayout>,
    pub attributes: Vec<VertexAttribute>,
}

impl VertexLayoutDesc {
    fn validate(&self) -> std::result::Result<(), String> {
        let mut bindings = FxHashSet::default();
        for buffer in &self.buffers {
            if buffer.binding as usize >= MAX_VERTEX_BUFFERS {
                return Err(format!("binding {} exceeds {}", buffer.binding, MAX_VERTEX_BUFFERS));
            }
            if !bindings.insert(buffer.binding) {
                return Err(format!("binding {} declared twice", buffer.binding));
            }
        }

        let mut locations = FxHashSet::default();
        for attribute in &self.attributes {
            if attribute.location as usize >= MAX_VERTEX_ATTRIBUTES {
                return Err(format!("location {} exceeds {}", attribute.location, MAX_VERTEX_ATTRIBUTES));
            }
            if !locations.insert(attribute.location) {
                return Err(format!("location {} declared twice", attribute.location));
            }
            let Some(buffer) = self.buffers.iter().find(|b| b.binding == attribute.binding) else {
                return Err(format!(
                    "location {} reads undeclared binding {}",
                    attribute.location, attribute.binding
                ));
            };
            if buffer.stride != 0 && attribute.offset + attribute.format.size() > buffer.stride {
                return Err(format!(
                    "location {} ({:?} at offset {}) overruns stride {}",
                    attribute.location, attribute.format, attribute.offset, buffer.stride
                ));
            }
        }
        Ok(())
    }
}

/// Buffer last attached to a VAO binding slot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct AttachedBuffer {
    pub uid: u64,
    pub offset: u64,
}

/// One context's vertex array and what is currently attached to it
#[derive(Debug)]
pub(crate) struct VaoState {
    pub handle: NativeHandle,
    pub vertex_buffers: [AttachedBuffer; MAX_VERTEX_BUFFERS],
    pub index_buffer_uid: u64,
}

/// Immutable vertex input layout
pub struct VertexLayout {
    uid: u64,
    desc: VertexLayoutDesc,
    strides: [u32; MAX_VERTEX_BUFFERS],
    vaos: Mutex<PerContext<VaoState>>,
    driver: Arc<SharedDriver>,
}

impl VertexLayout {
    pub(crate) fn create(driver: &Arc<SharedDriver>, desc: &VertexLayoutDesc) -> Result<Self> {
        if let Err(reason) = desc.validate() {
            crate::rhi_error!("hearth::VertexLayout", "Invalid vertex layout: {}", reason);
            return Err(Error::InvalidResource(reason));
        }
        let mut strides = [0u32; MAX_VERTEX_BUFFERS];
        for buffer in &desc.buffers {
            strides[buffer.binding as usize] = buffer.stride;
        }
        Ok(Self {
            uid: next_uid(),
            desc: desc.clone(),
            strides,
            vaos: Mutex::new(PerContext::default()),
            driver: Arc::clone(driver),
        })
    }

    pub fn uid(&self) -> u64 {
        self.uid
    }

    pub fn desc(&self) -> &VertexLayoutDesc {
        &self.desc
    }

    /// Stride of a binding slot (0 when undeclared)
    pub fn stride(&self, binding: u32) -> u32 {
        self.strides[binding as usize]
    }

    /// Number of contexts currently owning a VAO for this layout
    pub fn vao_count(&self) -> usize {
        self.vaos.lock().len()
    }

    /// Run `f` on the VAO state of `context`, creating and configuring the
    /// VAO on first use. `context` must be current on `gl`.
    pub(crate) fn with_vao<R>(
        &self,
        gl: &mut dyn Driver,
        context: ContextId,
        is_main: bool,
        f: impl FnOnce(&mut dyn Driver, &mut VaoState) -> R,
    ) -> R {
        let mut vaos = self.vaos.lock();
        if let Some(state) = vaos.get_mut(context) {
            return f(gl, state);
        }
        let handle = self.build_vao(gl);
        crate::rhi_trace!("hearth::VertexLayout", "Layout {} created VAO {} on context {:?}", self.uid, handle, context);
        let state = vaos.insert(
            context,
            is_main,
            VaoState {
                handle,
                vertex_buffers: [AttachedBuffer::default(); MAX_VERTEX_BUFFERS],
                index_buffer_uid: 0,
            },
        );
        f(gl, state)
    }

    /// Delete the VAO of `context` (which must be current)
    pub(crate) fn destroy_vao(&self, gl: &mut dyn Driver, context: ContextId) {
        if let Some(state) = self.vaos.lock().remove(context) {
            gl.delete_vertex_array(state.handle);
        }
    }

    fn build_vao(&self, gl: &mut dyn Driver) -> NativeHandle {
        let vao = gl.create_vertex_array();
        for attribute in &self.desc.attributes {
            let info = state_tables::vertex_format(attribute.format);
            gl.enable_vertex_array_attrib(vao, attribute.location);
            gl.vertex_array_attrib_format(vao, attribute.location, info.native, attribute.offset);
            gl.vertex_array_attrib_binding(vao, attribute.location, attribute.binding);
        }
        for buffer in &self.desc.buffers {
            if let VertexInputRate::PerInstance(divisor) = buffer.input_rate {
                gl.vertex_array_binding_divisor(vao, buffer.binding, divisor.max(1));
            }
        }
        vao
    }
}

impl Drop for VertexLayout {
    fn drop(&mut self) {
        for (context, state) in self.vaos.get_mut().drain() {
            self.driver.release(Release::VertexArray { context, handle: state.handle });
        }
    }
}

impl std::fmt::Debug for VertexLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VertexLayout").field("uid", &self.uid).field("desc", &self.desc).finish()
    }
}

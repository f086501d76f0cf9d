//! Buffer resource

use std::sync::Arc;
use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};
use crate::driver::{native, NativeHandle, Release, SharedDriver};
use crate::error::{Error, Result};
use super::next_uid;

bitflags! {
    /// How a buffer will be bound
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        const VERTEX = 1 << 0;
        const INDEX = 1 << 1;
        const UNIFORM = 1 << 2;
        const STORAGE = 1 << 3;
        const INDIRECT = 1 << 4;
        const TRANSFER_SRC = 1 << 5;
        const TRANSFER_DST = 1 << 6;
        const QUERY_RESULT = 1 << 7;
        const TRANSFORM_FEEDBACK = 1 << 8;
    }
}

/// CPU access pattern of a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryAccess {
    /// Updated only through `write_buffer`/copies
    GpuOnly,
    /// Mapped for writing
    Upload,
    /// Mapped for reading
    Readback,
    /// Persistently and coherently mapped for writing
    Persistent,
}

impl MemoryAccess {
    /// Native immutable-storage flags
    pub(crate) fn storage_flags(self) -> u32 {
        match self {
            MemoryAccess::GpuOnly => native::DYNAMIC_STORAGE_BIT,
            MemoryAccess::Upload => native::DYNAMIC_STORAGE_BIT | native::MAP_WRITE_BIT,
            MemoryAccess::Readback => native::MAP_READ_BIT | native::CLIENT_STORAGE_BIT,
            MemoryAccess::Persistent => {
                native::DYNAMIC_STORAGE_BIT
                    | native::MAP_WRITE_BIT
                    | native::MAP_PERSISTENT_BIT
                    | native::MAP_COHERENT_BIT
            }
        }
    }
}

/// Buffer creation parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferDesc {
    pub size: u64,
    pub usage: BufferUsage,
    pub access: MemoryAccess,
}

impl BufferDesc {
    pub fn new(size: u64, usage: BufferUsage) -> Self {
        Self { size, usage, access: MemoryAccess::GpuOnly }
    }

    pub fn with_access(mut self, access: MemoryAccess) -> Self {
        self.access = access;
        self
    }
}

/// GPU buffer
pub struct Buffer {
    uid: u64,
    handle: NativeHandle,
    desc: BufferDesc,
    driver: Arc<SharedDriver>,
}

impl Buffer {
    pub(crate) fn create(driver: &Arc<SharedDriver>, desc: &BufferDesc, data: Option<&[u8]>) -> Result<Self> {
        if desc.size == 0 {
            crate::rhi_error!("hearth::Buffer", "Cannot create a zero-sized buffer");
            return Err(Error::InvalidResource("zero-sized buffer".to_string()));
        }
        if let Some(data) = data {
            if data.len() as u64 > desc.size {
                crate::rhi_error!(
                    "hearth::Buffer",
                    "Initial data ({} bytes) exceeds buffer size ({} bytes)",
                    data.len(),
                    desc.size
                );
                return Err(Error::InvalidResource("initial data larger than buffer".to_string()));
            }
        }

        let mut gl = driver.lock();
        let handle = gl.create_buffer();
        if handle == 0 {
            crate::rhi_bail!("hearth::Buffer", "Driver refused to create a buffer");
        }
        if !gl.buffer_storage(handle, desc.size, data, desc.access.storage_flags()) {
            gl.delete_buffer(handle);
            crate::rhi_error!("hearth::Buffer", "Out of memory allocating {} bytes", desc.size);
            return Err(Error::OutOfMemory);
        }
        drop(gl);

        Ok(Self {
            uid: next_uid(),
            handle,
            desc: *desc,
            driver: Arc::clone(driver),
        })
    }

    pub fn uid(&self) -> u64 {
        self.uid
    }

    pub fn handle(&self) -> NativeHandle {
        self.handle
    }

    pub fn desc(&self) -> &BufferDesc {
        &self.desc
    }

    pub fn size(&self) -> u64 {
        self.desc.size
    }

    pub fn usage(&self) -> BufferUsage {
        self.desc.usage
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        self.driver.release(Release::Buffer(self.handle));
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("uid", &self.uid)
            .field("handle", &self.handle)
            .field("desc", &self.desc)
            .finish()
    }
}

// ===== INDIRECT COMMANDS =====

/// Layout of one non-indexed indirect draw record
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct DrawIndirectCommand {
    pub vertex_count: u32,
    pub instance_count: u32,
    pub first_vertex: u32,
    pub first_instance: u32,
}

/// Layout of one indexed indirect draw record
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct DrawIndexedIndirectCommand {
    pub index_count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub base_vertex: i32,
    pub first_instance: u32,
}

/// Layout of one indirect dispatch record
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct DispatchIndirectCommand {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

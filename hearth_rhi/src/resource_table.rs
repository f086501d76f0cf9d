//! Resource tables: the texture, image and buffer slots a pipeline reads.
//!
//! A table stores native handles tagged with the owning resource's UID. It
//! does not keep resources alive; contexts compare UIDs (plus offset and
//! size for buffers) against what they last applied to decide which slots
//! need a native rebind.

use crate::driver::{NativeEnum, NativeHandle};
use crate::resource::{next_uid, Buffer, Sampler, Texture};
use crate::state_tables;

/// Texture (sampled) slots
pub const MAX_TEXTURE_SLOTS: usize = 32;

/// Storage image slots
pub const MAX_IMAGE_SLOTS: usize = 8;

/// Uniform/storage buffer slots
pub const MAX_BUFFER_SLOTS: usize = 24;

/// Shader access to a storage image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageAccess {
    ReadOnly,
    WriteOnly,
    #[default]
    ReadWrite,
}

/// Sampled texture binding (uid 0 = unbound)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextureSlot {
    pub uid: u64,
    pub handle: NativeHandle,
    /// Sampler overriding the pipeline's immutable one (0 = none)
    pub sampler: NativeHandle,
}

/// Storage image binding (uid 0 = unbound)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageSlot {
    pub uid: u64,
    pub handle: NativeHandle,
    pub level: u32,
    /// `None` binds every layer
    pub layer: Option<u32>,
    pub access: ImageAccess,
    pub format: NativeEnum,
}

/// Buffer range binding (uid 0 = unbound)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferSlot {
    pub uid: u64,
    pub handle: NativeHandle,
    pub offset: u64,
    pub size: u64,
}

/// Fixed-size set of resource bindings
///
/// `(uid, version)` identifies the table's exact contents: every setter
/// bumps the version and a clone gets a fresh uid.
#[derive(Debug)]
pub struct ResourceTable {
    uid: u64,
    version: u64,
    textures: [TextureSlot; MAX_TEXTURE_SLOTS],
    images: [ImageSlot; MAX_IMAGE_SLOTS],
    buffers: [BufferSlot; MAX_BUFFER_SLOTS],
}

impl Clone for ResourceTable {
    fn clone(&self) -> Self {
        Self {
            uid: next_uid(),
            version: 0,
            textures: self.textures,
            images: self.images,
            buffers: self.buffers,
        }
    }
}

impl Default for ResourceTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceTable {
    pub fn new() -> Self {
        Self {
            uid: next_uid(),
            version: 0,
            textures: [TextureSlot::default(); MAX_TEXTURE_SLOTS],
            images: [ImageSlot::default(); MAX_IMAGE_SLOTS],
            buffers: [BufferSlot::default(); MAX_BUFFER_SLOTS],
        }
    }

    pub fn uid(&self) -> u64 {
        self.uid
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn set_texture(&mut self, slot: usize, texture: &Texture) {
        debug_assert!(slot < MAX_TEXTURE_SLOTS, "texture slot {} out of range", slot);
        self.version += 1;
        self.textures[slot] = TextureSlot {
            uid: texture.uid(),
            handle: texture.handle(),
            sampler: 0,
        };
    }

    /// Bind a texture with an explicit sampler (overrides the pipeline's)
    pub fn set_texture_with_sampler(&mut self, slot: usize, texture: &Texture, sampler: &Sampler) {
        debug_assert!(slot < MAX_TEXTURE_SLOTS, "texture slot {} out of range", slot);
        self.version += 1;
        self.textures[slot] = TextureSlot {
            uid: texture.uid(),
            handle: texture.handle(),
            sampler: sampler.handle(),
        };
    }

    pub fn set_image(&mut self, slot: usize, texture: &Texture, level: u32, layer: Option<u32>, access: ImageAccess) {
        debug_assert!(slot < MAX_IMAGE_SLOTS, "image slot {} out of range", slot);
        debug_assert!(level < texture.mip_levels(), "image level {} out of range", level);
        self.version += 1;
        self.images[slot] = ImageSlot {
            uid: texture.uid(),
            handle: texture.handle(),
            level,
            layer,
            access,
            format: state_tables::format_info(texture.format()).internal_format,
        };
    }

    /// Bind `size` bytes of `buffer` from `offset`; a size of 0 means "to the end"
    pub fn set_buffer(&mut self, slot: usize, buffer: &Buffer, offset: u64, size: u64) {
        debug_assert!(slot < MAX_BUFFER_SLOTS, "buffer slot {} out of range", slot);
        debug_assert!(offset <= buffer.size(), "buffer offset {} beyond size {}", offset, buffer.size());
        let size = if size == 0 { buffer.size() - offset } else { size };
        self.version += 1;
        self.buffers[slot] = BufferSlot {
            uid: buffer.uid(),
            handle: buffer.handle(),
            offset,
            size,
        };
    }

    pub fn clear_texture(&mut self, slot: usize) {
        self.version += 1;
        self.textures[slot] = TextureSlot::default();
    }

    pub fn clear_image(&mut self, slot: usize) {
        self.version += 1;
        self.images[slot] = ImageSlot::default();
    }

    pub fn clear_buffer(&mut self, slot: usize) {
        self.version += 1;
        self.buffers[slot] = BufferSlot::default();
    }

    /// Unbind every slot
    pub fn clear(&mut self) {
        self.version += 1;
        self.textures = [TextureSlot::default(); MAX_TEXTURE_SLOTS];
        self.images = [ImageSlot::default(); MAX_IMAGE_SLOTS];
        self.buffers = [BufferSlot::default(); MAX_BUFFER_SLOTS];
    }

    pub fn texture(&self, slot: usize) -> &TextureSlot {
        &self.textures[slot]
    }

    pub fn image(&self, slot: usize) -> &ImageSlot {
        &self.images[slot]
    }

    pub fn buffer(&self, slot: usize) -> &BufferSlot {
        &self.buffers[slot]
    }

    pub(crate) fn textures(&self) -> &[TextureSlot; MAX_TEXTURE_SLOTS] {
        &self.textures
    }

    pub(crate) fn images(&self) -> &[ImageSlot; MAX_IMAGE_SLOTS] {
        &self.images
    }

    pub(crate) fn buffers(&self) -> &[BufferSlot; MAX_BUFFER_SLOTS] {
        &self.buffers
    }
}

#[cfg(test)]
#[path = "resource_table_tests.rs"]
mod tests;

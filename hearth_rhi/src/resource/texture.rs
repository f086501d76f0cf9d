//! Texture resource and attachment views

use std::sync::Arc;
use bitflags::bitflags;
use crate::driver::{native, NativeEnum, NativeHandle, Release, SharedDriver};
use crate::error::Result;
use crate::state_tables;
use super::{next_uid, TextureArena, TextureFormat, TextureKey};

/// Dimensionality of a texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureType {
    Tex1D,
    Tex1DArray,
    Tex2D,
    Tex2DArray,
    Tex3D,
    Cube,
    CubeArray,
}

impl TextureType {
    pub fn is_array(self) -> bool {
        matches!(self, TextureType::Tex1DArray | TextureType::Tex2DArray | TextureType::CubeArray)
    }
}

bitflags! {
    /// How a texture will be used
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        const SAMPLED = 1 << 0;
        const STORAGE = 1 << 1;
        const RENDER_TARGET = 1 << 2;
        const TRANSFER_SRC = 1 << 3;
        const TRANSFER_DST = 1 << 4;
    }
}

/// Texture creation parameters
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextureDesc {
    pub texture_type: TextureType,
    pub format: TextureFormat,
    pub width: u32,
    pub height: u32,
    /// Depth of a 3D texture, layer count of an array texture, 1 otherwise
    pub depth_or_layers: u32,
    pub mip_levels: u32,
    pub samples: u32,
    pub usage: TextureUsage,
}

impl TextureDesc {
    /// Single-level sampled 2D texture
    pub fn new_2d(format: TextureFormat, width: u32, height: u32) -> Self {
        Self {
            texture_type: TextureType::Tex2D,
            format,
            width,
            height,
            depth_or_layers: 1,
            mip_levels: 1,
            samples: 1,
            usage: TextureUsage::SAMPLED | TextureUsage::TRANSFER_DST,
        }
    }

    /// Single-level 2D render target that can also be sampled
    pub fn render_target(format: TextureFormat, width: u32, height: u32) -> Self {
        Self {
            usage: TextureUsage::RENDER_TARGET | TextureUsage::SAMPLED,
            ..Self::new_2d(format, width, height)
        }
    }

    pub fn with_mip_levels(mut self, mip_levels: u32) -> Self {
        self.mip_levels = mip_levels;
        self
    }

    pub fn with_samples(mut self, samples: u32) -> Self {
        self.samples = samples;
        self
    }

    /// Full mip chain length for the largest dimension
    pub fn max_mip_levels(&self) -> u32 {
        let largest = self.width.max(self.height).max(match self.texture_type {
            TextureType::Tex3D => self.depth_or_layers,
            _ => 1,
        });
        32 - largest.max(1).leading_zeros()
    }

    pub(crate) fn validate(&self) -> std::result::Result<(), String> {
        if self.width == 0 || self.height == 0 || self.depth_or_layers == 0 {
            return Err(format!("zero-sized texture {}x{}x{}", self.width, self.height, self.depth_or_layers));
        }
        if self.mip_levels == 0 || self.mip_levels > self.max_mip_levels() {
            return Err(format!(
                "mip level count {} outside 1..={}",
                self.mip_levels,
                self.max_mip_levels()
            ));
        }
        if self.samples == 0 {
            return Err("sample count must be at least 1".to_string());
        }
        if self.samples > 1 {
            if !matches!(self.texture_type, TextureType::Tex2D | TextureType::Tex2DArray) {
                return Err(format!("{:?} textures cannot be multisampled", self.texture_type));
            }
            if self.mip_levels != 1 {
                return Err("multisampled textures have exactly one mip level".to_string());
            }
        }
        if matches!(self.texture_type, TextureType::Cube | TextureType::CubeArray) && self.width != self.height {
            return Err(format!("cube faces must be square, got {}x{}", self.width, self.height));
        }
        if matches!(self.texture_type, TextureType::Tex1D | TextureType::Tex1DArray) && self.height != 1 {
            return Err("1D textures have a height of 1".to_string());
        }
        Ok(())
    }

    /// (width, height, depth) as passed to native storage allocation
    fn storage_extent(&self) -> (u32, u32, u32) {
        match self.texture_type {
            TextureType::Tex1D => (self.width, 1, 1),
            TextureType::Tex1DArray => (self.width, self.depth_or_layers, 1),
            TextureType::Tex2D | TextureType::Cube => (self.width, self.height, 1),
            TextureType::Tex2DArray | TextureType::Tex3D => (self.width, self.height, self.depth_or_layers),
            TextureType::CubeArray => (self.width, self.height, self.depth_or_layers * 6),
        }
    }
}

/// GPU texture
///
/// Identity (for framebuffer caching) is the arena key, which stops
/// resolving the moment the texture is dropped.
pub struct Texture {
    uid: u64,
    key: TextureKey,
    handle: NativeHandle,
    target: NativeEnum,
    desc: TextureDesc,
    page_size: Option<[u32; 3]>,
    driver: Arc<SharedDriver>,
    arena: TextureArena,
}

impl Texture {
    pub(crate) fn create(
        driver: &Arc<SharedDriver>,
        arena: &TextureArena,
        desc: &TextureDesc,
        sparse: bool,
    ) -> Result<Self> {
        if let Err(reason) = desc.validate() {
            crate::rhi_error!("hearth::Texture", "Invalid texture description: {}", reason);
            return Err(crate::error::Error::InvalidResource(reason));
        }

        let info = state_tables::format_info(desc.format);
        let target = state_tables::texture_target(desc.texture_type, desc.samples);
        let (width, height, depth) = desc.storage_extent();

        let mut gl = driver.lock();
        let handle = gl.create_texture(target);
        if handle == 0 {
            crate::rhi_bail!("hearth::Texture", "Driver refused to create a {:?} texture", desc.texture_type);
        }

        let mut page_size = None;
        if sparse {
            page_size = gl.virtual_page_size(target, info.internal_format);
            if page_size.is_none() {
                gl.delete_texture(handle);
                crate::rhi_error!("hearth::Texture", "Format {:?} has no sparse page size", desc.format);
                return Err(crate::error::Error::Unsupported(format!("sparse {:?}", desc.format)));
            }
            gl.texture_parameter_i(handle, native::TEXTURE_SPARSE, 1);
        }

        if !gl.texture_storage(handle, target, desc.mip_levels, info.internal_format, width, height, depth, desc.samples) {
            gl.delete_texture(handle);
            crate::rhi_error!(
                "hearth::Texture",
                "Out of memory allocating {}x{}x{} {:?}",
                width,
                height,
                depth,
                desc.format
            );
            return Err(crate::error::Error::OutOfMemory);
        }
        drop(gl);

        let key = arena.lock().insert(handle);
        Ok(Self {
            uid: next_uid(),
            key,
            handle,
            target,
            desc: desc.clone(),
            page_size,
            driver: Arc::clone(driver),
            arena: Arc::clone(arena),
        })
    }

    pub fn uid(&self) -> u64 {
        self.uid
    }

    pub fn key(&self) -> TextureKey {
        self.key
    }

    pub fn handle(&self) -> NativeHandle {
        self.handle
    }

    pub fn target(&self) -> NativeEnum {
        self.target
    }

    pub fn desc(&self) -> &TextureDesc {
        &self.desc
    }

    pub fn format(&self) -> TextureFormat {
        self.desc.format
    }

    pub fn width(&self) -> u32 {
        self.desc.width
    }

    pub fn height(&self) -> u32 {
        self.desc.height
    }

    pub fn mip_levels(&self) -> u32 {
        self.desc.mip_levels
    }

    pub fn samples(&self) -> u32 {
        self.desc.samples
    }

    pub fn is_sparse(&self) -> bool {
        self.page_size.is_some()
    }

    /// Sparse page size, `None` for fully resident textures
    pub fn page_size(&self) -> Option<[u32; 3]> {
        self.page_size
    }

    /// Extent of a mip level
    pub fn level_extent(&self, level: u32) -> (u32, u32, u32) {
        let (w, h, d) = self.desc.storage_extent();
        let shrink = |extent: u32| extent.checked_shr(level).unwrap_or(0).max(1);
        let depth = if self.desc.texture_type == TextureType::Tex3D { shrink(d) } else { d };
        (shrink(w), shrink(h), depth)
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        self.arena.lock().remove(self.key);
        self.driver.release(Release::Texture(self.handle));
    }
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("uid", &self.uid)
            .field("handle", &self.handle)
            .field("desc", &self.desc)
            .finish()
    }
}

/// A mip level (and optionally a single layer) of a texture, used as a
/// render-pass attachment
#[derive(Debug, Clone)]
pub struct TextureView {
    pub texture: Arc<Texture>,
    pub level: u32,
    /// `None` attaches every layer (layered rendering on array/cube/3D textures)
    pub layer: Option<u32>,
}

impl TextureView {
    pub fn new(texture: Arc<Texture>) -> Self {
        Self { texture, level: 0, layer: None }
    }

    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    pub fn with_layer(mut self, layer: u32) -> Self {
        self.layer = Some(layer);
        self
    }

    /// Whether the attachment spans several layers
    pub fn is_layered(&self) -> bool {
        self.layer.is_none()
            && (self.texture.desc.texture_type.is_array()
                || matches!(self.texture.desc.texture_type, TextureType::Cube | TextureType::Tex3D))
    }
}

#[cfg(test)]
#[path = "texture_tests.rs"]
mod tests;

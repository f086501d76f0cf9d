//! Sampler resource

use std::hash::{Hash, Hasher};
use std::sync::Arc;
use crate::driver::{native, NativeHandle, Release, SharedDriver};
use crate::error::Result;
use crate::pipeline::CompareOp;
use crate::state_tables;
use super::next_uid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Filter {
    Nearest,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MipmapMode {
    /// Sample level 0 only
    None,
    Nearest,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressMode {
    Repeat,
    MirroredRepeat,
    ClampToEdge,
    ClampToBorder,
    MirrorClampToEdge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BorderColor {
    TransparentBlack,
    OpaqueBlack,
    OpaqueWhite,
}

impl BorderColor {
    fn rgba(self) -> [f32; 4] {
        match self {
            BorderColor::TransparentBlack => [0.0, 0.0, 0.0, 0.0],
            BorderColor::OpaqueBlack => [0.0, 0.0, 0.0, 1.0],
            BorderColor::OpaqueWhite => [1.0, 1.0, 1.0, 1.0],
        }
    }
}

/// Sampler creation parameters (deduplicated by the device)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerDesc {
    pub mag_filter: Filter,
    pub min_filter: Filter,
    pub mipmap_mode: MipmapMode,
    pub address_u: AddressMode,
    pub address_v: AddressMode,
    pub address_w: AddressMode,
    pub lod_bias: f32,
    pub min_lod: f32,
    pub max_lod: f32,
    /// 1 disables anisotropic filtering
    pub max_anisotropy: u32,
    /// Depth comparison for shadow samplers
    pub compare: Option<CompareOp>,
    pub border_color: BorderColor,
}

impl Default for SamplerDesc {
    fn default() -> Self {
        Self {
            mag_filter: Filter::Linear,
            min_filter: Filter::Linear,
            mipmap_mode: MipmapMode::Linear,
            address_u: AddressMode::Repeat,
            address_v: AddressMode::Repeat,
            address_w: AddressMode::Repeat,
            lod_bias: 0.0,
            min_lod: 0.0,
            max_lod: 1000.0,
            max_anisotropy: 1,
            compare: None,
            border_color: BorderColor::TransparentBlack,
        }
    }
}

impl SamplerDesc {
    pub fn nearest_clamp() -> Self {
        Self {
            mag_filter: Filter::Nearest,
            min_filter: Filter::Nearest,
            mipmap_mode: MipmapMode::None,
            address_u: AddressMode::ClampToEdge,
            address_v: AddressMode::ClampToEdge,
            address_w: AddressMode::ClampToEdge,
            ..Default::default()
        }
    }

    pub fn shadow() -> Self {
        Self {
            compare: Some(CompareOp::LessOrEqual),
            address_u: AddressMode::ClampToBorder,
            address_v: AddressMode::ClampToBorder,
            address_w: AddressMode::ClampToBorder,
            border_color: BorderColor::OpaqueWhite,
            mipmap_mode: MipmapMode::None,
            ..Default::default()
        }
    }
}

impl Eq for SamplerDesc {}

impl Hash for SamplerDesc {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.mag_filter.hash(state);
        self.min_filter.hash(state);
        self.mipmap_mode.hash(state);
        self.address_u.hash(state);
        self.address_v.hash(state);
        self.address_w.hash(state);
        self.lod_bias.to_bits().hash(state);
        self.min_lod.to_bits().hash(state);
        self.max_lod.to_bits().hash(state);
        self.max_anisotropy.hash(state);
        self.compare.hash(state);
        self.border_color.hash(state);
    }
}

/// Native sampler object
pub struct Sampler {
    uid: u64,
    handle: NativeHandle,
    desc: SamplerDesc,
    driver: Arc<SharedDriver>,
}

impl Sampler {
    pub(crate) fn create(driver: &Arc<SharedDriver>, desc: &SamplerDesc, max_anisotropy: f32) -> Result<Self> {
        let mut gl = driver.lock();
        let handle = gl.create_sampler();
        if handle == 0 {
            crate::rhi_bail!("hearth::Sampler", "Driver refused to create a sampler");
        }

        let min = state_tables::min_filter(desc.min_filter, desc.mipmap_mode) as i32;
        gl.sampler_parameter_i(handle, native::TEXTURE_MIN_FILTER, min);
        gl.sampler_parameter_i(handle, native::TEXTURE_MAG_FILTER, state_tables::mag_filter(desc.mag_filter) as i32);
        gl.sampler_parameter_i(handle, native::TEXTURE_WRAP_S, state_tables::address_mode(desc.address_u) as i32);
        gl.sampler_parameter_i(handle, native::TEXTURE_WRAP_T, state_tables::address_mode(desc.address_v) as i32);
        gl.sampler_parameter_i(handle, native::TEXTURE_WRAP_R, state_tables::address_mode(desc.address_w) as i32);
        gl.sampler_parameter_f(handle, native::TEXTURE_LOD_BIAS, desc.lod_bias);
        gl.sampler_parameter_f(handle, native::TEXTURE_MIN_LOD, desc.min_lod);
        gl.sampler_parameter_f(handle, native::TEXTURE_MAX_LOD, desc.max_lod);
        if desc.max_anisotropy > 1 {
            let anisotropy = (desc.max_anisotropy as f32).min(max_anisotropy);
            gl.sampler_parameter_f(handle, native::TEXTURE_MAX_ANISOTROPY, anisotropy);
        }
        if let Some(compare) = desc.compare {
            gl.sampler_parameter_i(handle, native::TEXTURE_COMPARE_MODE, native::COMPARE_REF_TO_TEXTURE as i32);
            gl.sampler_parameter_i(handle, native::TEXTURE_COMPARE_FUNC, state_tables::compare_op(compare) as i32);
        }
        if [desc.address_u, desc.address_v, desc.address_w].contains(&AddressMode::ClampToBorder) {
            gl.sampler_parameter_fv(handle, native::TEXTURE_BORDER_COLOR, desc.border_color.rgba());
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

    pub fn desc(&self) -> &SamplerDesc {
        &self.desc
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        self.driver.release(Release::Sampler(self.handle));
    }
}

impl std::fmt::Debug for Sampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sampler").field("uid", &self.uid).field("handle", &self.handle).finish()
    }
}

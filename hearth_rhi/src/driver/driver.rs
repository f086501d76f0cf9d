//! Driver trait: the legacy, globally stateful API the RHI sits on.
//!
//! Every method maps one-to-one onto a native entry point. The RHI never
//! reads driver state back; it keeps its own shadow copy (see
//! `BindingState`) and only issues the calls needed to move from the
//! shadowed state to the requested one.

use std::ptr::NonNull;

/// Native object name (0 is the null object)
pub type NativeHandle = u32;

/// Native enumerant (see [`super::native`])
pub type NativeEnum = u32;

/// Null native object
pub const NULL_HANDLE: NativeHandle = 0;

/// Identifier of a native rendering context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(pub u32);

/// Drawable surface a context renders its default framebuffer into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceInfo {
    pub width: u32,
    pub height: u32,
}

impl Default for SurfaceInfo {
    fn default() -> Self {
        Self { width: 1280, height: 720 }
    }
}

/// Limits and optional features reported by the driver
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriverCaps {
    pub max_color_attachments: u32,
    pub max_viewports: u32,
    pub max_texture_units: u32,
    pub max_image_units: u32,
    pub max_uniform_buffer_bindings: u32,
    pub max_storage_buffer_bindings: u32,
    pub max_vertex_attrib_bindings: u32,
    pub max_anisotropy: f32,
    pub sparse_texture: bool,
    pub bindless_texture: bool,
    pub spirv_binaries: bool,
}

impl Default for DriverCaps {
    fn default() -> Self {
        Self {
            max_color_attachments: 8,
            max_viewports: 16,
            max_texture_units: 32,
            max_image_units: 8,
            max_uniform_buffer_bindings: 24,
            max_storage_buffer_bindings: 24,
            max_vertex_attrib_bindings: 16,
            max_anisotropy: 16.0,
            sparse_texture: true,
            bindless_texture: true,
            spirv_binaries: true,
        }
    }
}

/// Box (origin + extent) inside a texture level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Region3D {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

impl Region3D {
    /// 2D region at layer/slice 0
    pub fn rect(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, z: 0, width, height, depth: 1 }
    }
}

/// Vertex attribute layout in native terms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeAttribFormat {
    pub components: u32,
    pub component_type: NativeEnum,
    pub normalized: bool,
    /// Fetch as integer (no float conversion)
    pub integer: bool,
}

/// Upload source: client memory or an offset into the bound unpack buffer
#[derive(Debug, Clone, Copy)]
pub enum PixelSource<'a> {
    Slice(&'a [u8]),
    UnpackBufferOffset(u64),
}

/// Readback destination: client memory or an offset into the bound pack buffer
#[derive(Debug)]
pub enum PixelTarget<'a> {
    Slice(&'a mut [u8]),
    PackBufferOffset(u64),
}

/// The native graphics driver
///
/// Implementations live in backend crates (`hearth_rhi_headless` ships a
/// GPU-less one) and are handed to the RHI through
/// [`Rhi::register_backend`](crate::hearth::Rhi::register_backend) or
/// [`Device::from_driver`](crate::hearth::Device::from_driver).
pub trait Driver: Send {
    // ===== CONTEXTS =====

    fn capabilities(&self) -> DriverCaps;
    fn create_context(&mut self, id: ContextId, surface: SurfaceInfo) -> bool;
    fn destroy_context(&mut self, id: ContextId);
    fn make_current(&mut self, id: Option<ContextId>) -> bool;
    fn current_context(&self) -> Option<ContextId>;

    // ===== FIXED-FUNCTION STATE =====

    fn enable(&mut self, cap: NativeEnum);
    fn disable(&mut self, cap: NativeEnum);
    fn enable_i(&mut self, cap: NativeEnum, index: u32);
    fn disable_i(&mut self, cap: NativeEnum, index: u32);
    fn blend_func_separate_i(
        &mut self,
        buffer: u32,
        src_rgb: NativeEnum,
        dst_rgb: NativeEnum,
        src_alpha: NativeEnum,
        dst_alpha: NativeEnum,
    );
    fn blend_equation_separate_i(&mut self, buffer: u32, mode_rgb: NativeEnum, mode_alpha: NativeEnum);
    fn color_mask_i(&mut self, buffer: u32, red: bool, green: bool, blue: bool, alpha: bool);
    fn blend_color(&mut self, rgba: [f32; 4]);
    fn cull_face(&mut self, mode: NativeEnum);
    fn front_face(&mut self, mode: NativeEnum);
    fn polygon_mode(&mut self, mode: NativeEnum);
    fn polygon_offset_clamp(&mut self, factor: f32, units: f32, clamp: f32);
    fn depth_func(&mut self, func: NativeEnum);
    fn depth_mask(&mut self, write: bool);
    fn stencil_func_separate(&mut self, face: NativeEnum, func: NativeEnum, reference: u32, mask: u32);
    fn stencil_op_separate(&mut self, face: NativeEnum, sfail: NativeEnum, dpfail: NativeEnum, dppass: NativeEnum);
    fn stencil_mask_separate(&mut self, face: NativeEnum, mask: u32);
    fn viewport_array(&mut self, first: u32, viewports: &[[f32; 4]]);
    fn depth_range_array(&mut self, first: u32, ranges: &[[f64; 2]]);
    fn scissor_array(&mut self, first: u32, rects: &[[i32; 4]]);
    fn patch_vertices(&mut self, count: u32);
    fn pixel_store_i(&mut self, pname: NativeEnum, value: i32);

    // ===== PROGRAMS =====

    fn create_shader_program(&mut self, stage: NativeEnum, source: &str) -> NativeHandle;
    fn create_shader_program_binary(&mut self, stage: NativeEnum, format: NativeEnum, binary: &[u8], entry_point: &str) -> NativeHandle;
    fn program_link_status(&mut self, program: NativeHandle) -> bool;
    fn program_info_log(&mut self, program: NativeHandle) -> String;
    fn delete_program(&mut self, program: NativeHandle);
    fn create_program_pipeline(&mut self) -> NativeHandle;
    fn use_program_stages(&mut self, pipeline: NativeHandle, stage_bits: u32, program: NativeHandle);
    fn bind_program_pipeline(&mut self, pipeline: NativeHandle);
    fn delete_program_pipeline(&mut self, pipeline: NativeHandle);

    // ===== VERTEX ARRAYS =====

    fn create_vertex_array(&mut self) -> NativeHandle;
    fn delete_vertex_array(&mut self, vao: NativeHandle);
    fn bind_vertex_array(&mut self, vao: NativeHandle);
    fn vertex_array_attrib_format(&mut self, vao: NativeHandle, attrib: u32, format: NativeAttribFormat, relative_offset: u32);
    fn vertex_array_attrib_binding(&mut self, vao: NativeHandle, attrib: u32, binding: u32);
    fn enable_vertex_array_attrib(&mut self, vao: NativeHandle, attrib: u32);
    fn vertex_array_binding_divisor(&mut self, vao: NativeHandle, binding: u32, divisor: u32);
    fn vertex_array_vertex_buffer(&mut self, vao: NativeHandle, binding: u32, buffer: NativeHandle, offset: u64, stride: u32);
    fn vertex_array_element_buffer(&mut self, vao: NativeHandle, buffer: NativeHandle);

    // ===== BUFFERS =====

    fn create_buffer(&mut self) -> NativeHandle;
    /// Allocate immutable storage; `false` when the driver is out of memory
    fn buffer_storage(&mut self, buffer: NativeHandle, size: u64, data: Option<&[u8]>, flags: u32) -> bool;
    fn delete_buffer(&mut self, buffer: NativeHandle);
    fn buffer_sub_data(&mut self, buffer: NativeHandle, offset: u64, data: &[u8]);
    fn get_buffer_sub_data(&mut self, buffer: NativeHandle, offset: u64, out: &mut [u8]);
    fn copy_buffer_sub_data(&mut self, src: NativeHandle, dst: NativeHandle, src_offset: u64, dst_offset: u64, size: u64);
    fn clear_buffer_sub_data(&mut self, buffer: NativeHandle, internal_format: NativeEnum, offset: u64, size: u64, format: NativeEnum, ty: NativeEnum, value: &[u8]);
    fn map_buffer_range(&mut self, buffer: NativeHandle, offset: u64, length: u64, access: u32) -> Option<NonNull<u8>>;
    fn flush_mapped_buffer_range(&mut self, buffer: NativeHandle, offset: u64, length: u64);
    fn unmap_buffer(&mut self, buffer: NativeHandle) -> bool;
    fn bind_buffer(&mut self, target: NativeEnum, buffer: NativeHandle);
    fn bind_buffer_range(&mut self, target: NativeEnum, index: u32, buffer: NativeHandle, offset: u64, size: u64);

    // ===== TEXTURES =====

    fn create_texture(&mut self, target: NativeEnum) -> NativeHandle;
    /// Allocate immutable storage; `false` when the driver is out of memory
    #[allow(clippy::too_many_arguments)]
    fn texture_storage(
        &mut self,
        texture: NativeHandle,
        target: NativeEnum,
        levels: u32,
        internal_format: NativeEnum,
        width: u32,
        height: u32,
        depth: u32,
        samples: u32,
    ) -> bool;
    fn delete_texture(&mut self, texture: NativeHandle);
    fn texture_parameter_i(&mut self, texture: NativeHandle, pname: NativeEnum, value: i32);
    fn texture_sub_image(&mut self, texture: NativeHandle, level: u32, region: Region3D, format: NativeEnum, ty: NativeEnum, pixels: PixelSource<'_>);
    fn get_texture_sub_image(&mut self, texture: NativeHandle, level: u32, region: Region3D, format: NativeEnum, ty: NativeEnum, pixels: PixelTarget<'_>);
    #[allow(clippy::too_many_arguments)]
    fn copy_image_sub_data(
        &mut self,
        src: NativeHandle,
        src_target: NativeEnum,
        src_level: u32,
        src_origin: [i32; 3],
        dst: NativeHandle,
        dst_target: NativeEnum,
        dst_level: u32,
        dst_origin: [i32; 3],
        extent: [u32; 3],
    );
    fn clear_tex_sub_image(&mut self, texture: NativeHandle, level: u32, region: Region3D, format: NativeEnum, ty: NativeEnum, value: &[u8]);
    fn generate_texture_mipmap(&mut self, texture: NativeHandle);
    /// Sparse page size for the format, or `None` when unsupported
    fn virtual_page_size(&mut self, target: NativeEnum, internal_format: NativeEnum) -> Option<[u32; 3]>;
    fn texture_page_commitment(&mut self, texture: NativeHandle, level: u32, region: Region3D, commit: bool);
    /// Resident bindless handle for a texture/sampler pair
    fn texture_handle(&mut self, texture: NativeHandle, sampler: NativeHandle) -> Option<u64>;

    // ===== SAMPLERS =====

    fn create_sampler(&mut self) -> NativeHandle;
    fn sampler_parameter_i(&mut self, sampler: NativeHandle, pname: NativeEnum, value: i32);
    fn sampler_parameter_f(&mut self, sampler: NativeHandle, pname: NativeEnum, value: f32);
    fn sampler_parameter_fv(&mut self, sampler: NativeHandle, pname: NativeEnum, value: [f32; 4]);
    fn delete_sampler(&mut self, sampler: NativeHandle);

    // ===== RESOURCE UNITS =====

    fn bind_texture_unit(&mut self, unit: u32, texture: NativeHandle);
    fn bind_sampler(&mut self, unit: u32, sampler: NativeHandle);
    #[allow(clippy::too_many_arguments)]
    fn bind_image_texture(&mut self, unit: u32, texture: NativeHandle, level: u32, layered: bool, layer: u32, access: NativeEnum, format: NativeEnum);

    // ===== FRAMEBUFFERS =====

    fn create_framebuffer(&mut self) -> NativeHandle;
    fn delete_framebuffer(&mut self, framebuffer: NativeHandle);
    fn framebuffer_texture(&mut self, framebuffer: NativeHandle, attachment: NativeEnum, texture: NativeHandle, level: u32);
    fn framebuffer_texture_layer(&mut self, framebuffer: NativeHandle, attachment: NativeEnum, texture: NativeHandle, level: u32, layer: u32);
    fn check_framebuffer_status(&mut self, framebuffer: NativeHandle) -> NativeEnum;
    fn bind_framebuffer(&mut self, target: NativeEnum, framebuffer: NativeHandle);
    fn framebuffer_draw_buffers(&mut self, framebuffer: NativeHandle, buffers: &[NativeEnum]);
    fn clear_framebuffer_fv(&mut self, framebuffer: NativeHandle, buffer: NativeEnum, draw_buffer: i32, value: [f32; 4]);
    fn clear_framebuffer_iv(&mut self, framebuffer: NativeHandle, buffer: NativeEnum, draw_buffer: i32, value: [i32; 4]);
    fn clear_framebuffer_uiv(&mut self, framebuffer: NativeHandle, buffer: NativeEnum, draw_buffer: i32, value: [u32; 4]);
    fn clear_framebuffer_fi(&mut self, framebuffer: NativeHandle, depth: f32, stencil: i32);
    fn invalidate_framebuffer(&mut self, framebuffer: NativeHandle, attachments: &[NativeEnum]);
    #[allow(clippy::too_many_arguments)]
    fn blit_framebuffer(&mut self, src: NativeHandle, dst: NativeHandle, src_rect: [i32; 4], dst_rect: [i32; 4], mask: u32, filter: NativeEnum);

    // ===== DRAW / DISPATCH =====

    fn draw_arrays(&mut self, mode: NativeEnum, first: i32, count: i32, instances: i32, base_instance: u32);
    #[allow(clippy::too_many_arguments)]
    fn draw_elements(&mut self, mode: NativeEnum, count: i32, index_type: NativeEnum, offset: u64, instances: i32, base_vertex: i32, base_instance: u32);
    fn multi_draw_arrays_indirect(&mut self, mode: NativeEnum, offset: u64, draw_count: i32, stride: i32);
    fn multi_draw_elements_indirect(&mut self, mode: NativeEnum, index_type: NativeEnum, offset: u64, draw_count: i32, stride: i32);
    fn dispatch_compute(&mut self, x: u32, y: u32, z: u32);
    fn dispatch_compute_indirect(&mut self, offset: u64);

    // ===== QUERIES =====

    fn create_query(&mut self, target: NativeEnum) -> NativeHandle;
    fn delete_query(&mut self, query: NativeHandle);
    fn begin_query(&mut self, target: NativeEnum, query: NativeHandle);
    fn end_query(&mut self, target: NativeEnum);
    fn query_counter(&mut self, query: NativeHandle, target: NativeEnum);
    /// Query result; `None` when `pname` is QUERY_RESULT_NO_WAIT and the value is not ready
    fn get_query_object_u64(&mut self, query: NativeHandle, pname: NativeEnum) -> Option<u64>;
    fn get_query_buffer_object_u64(&mut self, query: NativeHandle, buffer: NativeHandle, pname: NativeEnum, offset: u64);

    // ===== TRANSFORM FEEDBACK =====

    fn create_transform_feedback(&mut self) -> NativeHandle;
    fn delete_transform_feedback(&mut self, xfb: NativeHandle);
    fn transform_feedback_buffer_range(&mut self, xfb: NativeHandle, index: u32, buffer: NativeHandle, offset: u64, size: u64);
    fn bind_transform_feedback(&mut self, xfb: NativeHandle);
    fn begin_transform_feedback(&mut self, primitive_mode: NativeEnum);
    fn pause_transform_feedback(&mut self);
    fn resume_transform_feedback(&mut self);
    fn end_transform_feedback(&mut self);
    fn draw_transform_feedback(&mut self, mode: NativeEnum, xfb: NativeHandle, instances: i32);

    // ===== SYNC =====

    fn fence_sync(&mut self) -> NativeHandle;
    /// Returns ALREADY_SIGNALED, CONDITION_SATISFIED, TIMEOUT_EXPIRED or WAIT_FAILED
    fn client_wait_sync(&mut self, sync: NativeHandle, flush: bool, timeout_ns: u64) -> NativeEnum;
    fn wait_sync(&mut self, sync: NativeHandle);
    fn delete_sync(&mut self, sync: NativeHandle);
    fn memory_barrier(&mut self, bits: u32);
    fn texture_barrier(&mut self);
    fn flush(&mut self);
    fn finish(&mut self);
}

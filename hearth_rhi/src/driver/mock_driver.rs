//! Recording driver for unit tests.
//!
//! Every call is appended to a shared trace as `name(args)`, so tests can
//! assert on exactly what the RHI sent to the driver.

use std::ptr::NonNull;
use std::sync::Arc;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use super::native;
use super::*;

#[derive(Default)]
struct MockShared {
    calls: Vec<String>,
    fail_link: bool,
    fail_storage: bool,
    incomplete_framebuffers: bool,
    wait_result: Option<NativeEnum>,
    caps: Option<DriverCaps>,
}

/// Handle onto the calls recorded by a [`MockDriver`]
#[derive(Clone, Default)]
pub(crate) struct MockTrace(Arc<Mutex<MockShared>>);

impl MockTrace {
    pub fn calls(&self) -> Vec<String> {
        self.0.lock().calls.clone()
    }

    /// Number of calls to `name`
    pub fn count(&self, name: &str) -> usize {
        let prefix = format!("{}(", name);
        self.0.lock().calls.iter().filter(|c| c.starts_with(&prefix)).count()
    }

    /// Calls to `name`, arguments included
    pub fn find(&self, name: &str) -> Vec<String> {
        let prefix = format!("{}(", name);
        self.0
            .lock()
            .calls
            .iter()
            .filter(|c| c.starts_with(&prefix))
            .cloned()
            .collect()
    }

    pub fn contains(&self, call: &str) -> bool {
        self.0.lock().calls.iter().any(|c| c == call)
    }

    pub fn clear(&self) {
        self.0.lock().calls.clear();
    }

    pub fn fail_link(&self, fail: bool) {
        self.0.lock().fail_link = fail;
    }

    pub fn fail_storage(&self, fail: bool) {
        self.0.lock().fail_storage = fail;
    }

    pub fn incomplete_framebuffers(&self, incomplete: bool) {
        self.0.lock().incomplete_framebuffers = incomplete;
    }

    pub fn wait_result(&self, result: NativeEnum) {
        self.0.lock().wait_result = Some(result);
    }

    pub fn set_caps(&self, caps: DriverCaps) {
        self.0.lock().caps = Some(caps);
    }
}

pub(crate) struct MockDriver {
    shared: MockTrace,
    next_handle: NativeHandle,
    current: Option<ContextId>,
    buffers: FxHashMap<NativeHandle, Vec<u8>>,
}

impl MockDriver {
    pub fn new() -> (Self, MockTrace) {
        let trace = MockTrace::default();
        (
            Self {
                shared: trace.clone(),
                next_handle: 1,
                current: None,
                buffers: FxHashMap::default(),
            },
            trace,
        )
    }

    fn rec(&self, call: String) {
        self.shared.0.lock().calls.push(call);
    }

    fn handle(&mut self) -> NativeHandle {
        let h = self.next_handle;
        self.next_handle += 1;
        h
    }
}

impl Driver for MockDriver {
    fn capabilities(&self) -> DriverCaps {
        self.shared.0.lock().caps.unwrap_or_default()
    }

    fn create_context(&mut self, id: ContextId, surface: SurfaceInfo) -> bool {
        self.rec(format!("create_context({}, {}x{})", id.0, surface.width, surface.height));
        true
    }

    fn destroy_context(&mut self, id: ContextId) {
        self.rec(format!("destroy_context({})", id.0));
        if self.current == Some(id) {
            self.current = None;
        }
    }

    fn make_current(&mut self, id: Option<ContextId>) -> bool {
        self.rec(format!("make_current({:?})", id.map(|c| c.0)));
        self.current = id;
        true
    }

    fn current_context(&self) -> Option<ContextId> {
        self.current
    }

    fn enable(&mut self, cap: NativeEnum) {
        self.rec(format!("enable({:#x})", cap));
    }

    fn disable(&mut self, cap: NativeEnum) {
        self.rec(format!("disable({:#x})", cap));
    }

    fn enable_i(&mut self, cap: NativeEnum, index: u32) {
        self.rec(format!("enable_i({:#x}, {})", cap, index));
    }

    fn disable_i(&mut self, cap: NativeEnum, index: u32) {
        self.rec(format!("disable_i({:#x}, {})", cap, index));
    }

    fn blend_func_separate_i(&mut self, buffer: u32, src_rgb: NativeEnum, dst_rgb: NativeEnum, src_alpha: NativeEnum, dst_alpha: NativeEnum) {
        self.rec(format!(
            "blend_func_separate_i({}, {:#x}, {:#x}, {:#x}, {:#x})",
            buffer, src_rgb, dst_rgb, src_alpha, dst_alpha
        ));
    }

    fn blend_equation_separate_i(&mut self, buffer: u32, mode_rgb: NativeEnum, mode_alpha: NativeEnum) {
        self.rec(format!("blend_equation_separate_i({}, {:#x}, {:#x})", buffer, mode_rgb, mode_alpha));
    }

    fn color_mask_i(&mut self, buffer: u32, red: bool, green: bool, blue: bool, alpha: bool) {
        self.rec(format!("color_mask_i({}, {}, {}, {}, {})", buffer, red, green, blue, alpha));
    }

    fn blend_color(&mut self, rgba: [f32; 4]) {
        self.rec(format!("blend_color({:?})", rgba));
    }

    fn cull_face(&mut self, mode: NativeEnum) {
        self.rec(format!("cull_face({:#x})", mode));
    }

    fn front_face(&mut self, mode: NativeEnum) {
        self.rec(format!("front_face({:#x})", mode));
    }

    fn polygon_mode(&mut self, mode: NativeEnum) {
        self.rec(format!("polygon_mode({:#x})", mode));
    }

    fn polygon_offset_clamp(&mut self, factor: f32, units: f32, clamp: f32) {
        self.rec(format!("polygon_offset_clamp({}, {}, {})", factor, units, clamp));
    }

    fn depth_func(&mut self, func: NativeEnum) {
        self.rec(format!("depth_func({:#x})", func));
    }

    fn depth_mask(&mut self, write: bool) {
        self.rec(format!("depth_mask({})", write));
    }

    fn stencil_func_separate(&mut self, face: NativeEnum, func: NativeEnum, reference: u32, mask: u32) {
        self.rec(format!("stencil_func_separate({:#x}, {:#x}, {}, {:#x})", face, func, reference, mask));
    }

    fn stencil_op_separate(&mut self, face: NativeEnum, sfail: NativeEnum, dpfail: NativeEnum, dppass: NativeEnum) {
        self.rec(format!("stencil_op_separate({:#x}, {:#x}, {:#x}, {:#x})", face, sfail, dpfail, dppass));
    }

    fn stencil_mask_separate(&mut self, face: NativeEnum, mask: u32) {
        self.rec(format!("stencil_mask_separate({:#x}, {:#x})", face, mask));
    }

    fn viewport_array(&mut self, first: u32, viewports: &[[f32; 4]]) {
        self.rec(format!("viewport_array({}, {:?})", first, viewports));
    }

    fn depth_range_array(&mut self, first: u32, ranges: &[[f64; 2]]) {
        self.rec(format!("depth_range_array({}, {:?})", first, ranges));
    }

    fn scissor_array(&mut self, first: u32, rects: &[[i32; 4]]) {
        self.rec(format!("scissor_array({}, {:?})", first, rects));
    }

    fn patch_vertices(&mut self, count: u32) {
        self.rec(format!("patch_vertices({})", count));
    }

    fn pixel_store_i(&mut self, pname: NativeEnum, value: i32) {
        self.rec(format!("pixel_store_i({:#x}, {})", pname, value));
    }

    fn create_shader_program(&mut self, stage: NativeEnum, _source: &str) -> NativeHandle {
        let h = self.handle();
        self.rec(format!("create_shader_program({:#x}) -> {}", stage, h));
        h
    }

    fn create_shader_program_binary(&mut self, stage: NativeEnum, format: NativeEnum, binary: &[u8], entry_point: &str) -> NativeHandle {
        let h = self.handle();
        self.rec(format!(
            "create_shader_program_binary({:#x}, {:#x}, {} bytes, {}) -> {}",
            stage,
            format,
            binary.len(),
            entry_point,
            h
        ));
        h
    }

    fn program_link_status(&mut self, program: NativeHandle) -> bool {
        self.rec(format!("program_link_status({})", program));
        !self.shared.0.lock().fail_link
    }

    fn program_info_log(&mut self, program: NativeHandle) -> String {
        self.rec(format!("program_info_log({})", program));
        "0:1(1): error: syntax error".to_string()
    }

    fn delete_program(&mut self, program: NativeHandle) {
        self.rec(format!("delete_program({})", program));
    }

    fn create_program_pipeline(&mut self) -> NativeHandle {
        let h = self.handle();
        self.rec(format!("create_program_pipeline() -> {}", h));
        h
    }

    fn use_program_stages(&mut self, pipeline: NativeHandle, stage_bits: u32, program: NativeHandle) {
        self.rec(format!("use_program_stages({}, {:#x}, {})", pipeline, stage_bits, program));
    }

    fn bind_program_pipeline(&mut self, pipeline: NativeHandle) {
        self.rec(format!("bind_program_pipeline({})", pipeline));
    }

    fn delete_program_pipeline(&mut self, pipeline: NativeHandle) {
        self.rec(format!("delete_program_pipeline({})", pipeline));
    }

    fn create_vertex_array(&mut self) -> NativeHandle {
        let h = self.handle();
        self.rec(format!("create_vertex_array() -> {}", h));
        h
    }

    fn delete_vertex_array(&mut self, vao: NativeHandle) {
        self.rec(format!("delete_vertex_array({})", vao));
    }

    fn bind_vertex_array(&mut self, vao: NativeHandle) {
        self.rec(format!("bind_vertex_array({})", vao));
    }

    fn vertex_array_attrib_format(&mut self, vao: NativeHandle, attrib: u32, format: NativeAttribFormat, relative_offset: u32) {
        self.rec(format!(
            "vertex_array_attrib_format({}, {}, {}, {:#x}, {}, {}, {})",
            vao,
            attrib,
            format.components,
            format.component_type,
            format.normalized,
            format.integer,
            relative_offset
        ));
    }

    fn vertex_array_attrib_binding(&mut self, vao: NativeHandle, attrib: u32, binding: u32) {
        self.rec(format!("vertex_array_attrib_binding({}, {}, {})", vao, attrib, binding));
    }

    fn enable_vertex_array_attrib(&mut self, vao: NativeHandle, attrib: u32) {
        self.rec(format!("enable_vertex_array_attrib({}, {})", vao, attrib));
    }

    fn vertex_array_binding_divisor(&mut self, vao: NativeHandle, binding: u32, divisor: u32) {
        self.rec(format!("vertex_array_binding_divisor({}, {}, {})", vao, binding, divisor));
    }

    fn vertex_array_vertex_buffer(&mut self, vao: NativeHandle, binding: u32, buffer: NativeHandle, offset: u64, stride: u32) {
        self.rec(format!("vertex_array_vertex_buffer({}, {}, {}, {}, {})", vao, binding, buffer, offset, stride));
    }

    fn vertex_array_element_buffer(&mut self, vao: NativeHandle, buffer: NativeHandle) {
        self.rec(format!("vertex_array_element_buffer({}, {})", vao, buffer));
    }

    fn create_buffer(&mut self) -> NativeHandle {
        let h = self.handle();
        self.rec(format!("create_buffer() -> {}", h));
        h
    }

    fn buffer_storage(&mut self, buffer: NativeHandle, size: u64, data: Option<&[u8]>, flags: u32) -> bool {
        self.rec(format!("buffer_storage({}, {}, {}, {:#x})", buffer, size, data.is_some(), flags));
        if self.shared.0.lock().fail_storage {
            return false;
        }
        let mut bytes = vec![0u8; size as usize];
        if let Some(data) = data {
            let n = data.len().min(bytes.len());
            bytes[..n].copy_from_slice(&data[..n]);
        }
        self.buffers.insert(buffer, bytes);
        true
    }

    fn delete_buffer(&mut self, buffer: NativeHandle) {
        self.rec(format!("delete_buffer({})", buffer));
        self.buffers.remove(&buffer);
    }

    fn buffer_sub_data(&mut self, buffer: NativeHandle, offset: u64, data: &[u8]) {
        self.rec(format!("buffer_sub_data({}, {}, {})", buffer, offset, data.len()));
        if let Some(bytes) = self.buffers.get_mut(&buffer) {
            let start = offset as usize;
            bytes[start..start + data.len()].copy_from_slice(data);
        }
    }

    fn get_buffer_sub_data(&mut self, buffer: NativeHandle, offset: u64, out: &mut [u8]) {
        self.rec(format!("get_buffer_sub_data({}, {}, {})", buffer, offset, out.len()));
        if let Some(bytes) = self.buffers.get(&buffer) {
            let start = offset as usize;
            out.copy_from_slice(&bytes[start..start + out.len()]);
        }
    }

    fn copy_buffer_sub_data(&mut self, src: NativeHandle, dst: NativeHandle, src_offset: u64, dst_offset: u64, size: u64) {
        self.rec(format!("copy_buffer_sub_data({}, {}, {}, {}, {})", src, dst, src_offset, dst_offset, size));
    }

    fn clear_buffer_sub_data(&mut self, buffer: NativeHandle, internal_format: NativeEnum, offset: u64, size: u64, format: NativeEnum, ty: NativeEnum, value: &[u8]) {
        self.rec(format!(
            "clear_buffer_sub_data({}, {:#x}, {}, {}, {:#x}, {:#x}, {})",
            buffer,
            internal_format,
            offset,
            size,
            format,
            ty,
            value.len()
        ));
    }

    fn map_buffer_range(&mut self, buffer: NativeHandle, offset: u64, length: u64, access: u32) -> Option<NonNull<u8>> {
        self.rec(format!("map_buffer_range({}, {}, {}, {:#x})", buffer, offset, length, access));
        let bytes = self.buffers.get_mut(&buffer)?;
        if offset + length > bytes.len() as u64 {
            return None;
        }
        NonNull::new(bytes[offset as usize..].as_mut_ptr())
    }

    fn flush_mapped_buffer_range(&mut self, buffer: NativeHandle, offset: u64, length: u64) {
        self.rec(format!("flush_mapped_buffer_range({}, {}, {})", buffer, offset, length));
    }

    fn unmap_buffer(&mut self, buffer: NativeHandle) -> bool {
        self.rec(format!("unmap_buffer({})", buffer));
        true
    }

    fn bind_buffer(&mut self, target: NativeEnum, buffer: NativeHandle) {
        self.rec(format!("bind_buffer({:#x}, {})", target, buffer));
    }

    fn bind_buffer_range(&mut self, target: NativeEnum, index: u32, buffer: NativeHandle, offset: u64, size: u64) {
        self.rec(format!("bind_buffer_range({:#x}, {}, {}, {}, {})", target, index, buffer, offset, size));
    }

    fn create_texture(&mut self, target: NativeEnum) -> NativeHandle {
        let h = self.handle();
        self.rec(format!("create_texture({:#x}) -> {}", target, h));
        h
    }

    fn texture_storage(&mut self, texture: NativeHandle, target: NativeEnum, levels: u32, internal_format: NativeEnum, width: u32, height: u32, depth: u32, samples: u32) -> bool {
        self.rec(format!(
            "texture_storage({}, {:#x}, {}, {:#x}, {}, {}, {}, {})",
            texture, target, levels, internal_format, width, height, depth, samples
        ));
        !self.shared.0.lock().fail_storage
    }

    fn delete_texture(&mut self, texture: NativeHandle) {
        self.rec(format!("delete_texture({})", texture));
    }

    fn texture_parameter_i(&mut self, texture: NativeHandle, pname: NativeEnum, value: i32) {
        self.rec(format!("texture_parameter_i({}, {:#x}, {})", texture, pname, value));
    }

    fn texture_sub_image(&mut self, texture: NativeHandle, level: u32, region: Region3D, format: NativeEnum, ty: NativeEnum, pixels: PixelSource<'_>) {
        let source = match pixels {
            PixelSource::Slice(bytes) => format!("{} bytes", bytes.len()),
            PixelSource::UnpackBufferOffset(offset) => format!("pbo+{}", offset),
        };
        self.rec(format!(
            "texture_sub_image({}, {}, {:?}, {:#x}, {:#x}, {})",
            texture, level, region, format, ty, source
        ));
    }

    fn get_texture_sub_image(&mut self, texture: NativeHandle, level: u32, region: Region3D, format: NativeEnum, ty: NativeEnum, pixels: PixelTarget<'_>) {
        let target = match pixels {
            PixelTarget::Slice(bytes) => {
                bytes.fill(0xAB);
                format!("{} bytes", bytes.len())
            }
            PixelTarget::PackBufferOffset(offset) => format!("pbo+{}", offset),
        };
        self.rec(format!(
            "get_texture_sub_image({}, {}, {:?}, {:#x}, {:#x}, {})",
            texture, level, region, format, ty, target
        ));
    }

    fn copy_image_sub_data(&mut self, src: NativeHandle, src_target: NativeEnum, src_level: u32, src_origin: [i32; 3], dst: NativeHandle, dst_target: NativeEnum, dst_level: u32, dst_origin: [i32; 3], extent: [u32; 3]) {
        self.rec(format!(
            "copy_image_sub_data({}, {:#x}, {}, {:?}, {}, {:#x}, {}, {:?}, {:?})",
            src, src_target, src_level, src_origin, dst, dst_target, dst_level, dst_origin, extent
        ));
    }

    fn clear_tex_sub_image(&mut self, texture: NativeHandle, level: u32, region: Region3D, format: NativeEnum, ty: NativeEnum, value: &[u8]) {
        self.rec(format!(
            "clear_tex_sub_image({}, {}, {:?}, {:#x}, {:#x}, {})",
            texture,
            level,
            region,
            format,
            ty,
            value.len()
        ));
    }

    fn generate_texture_mipmap(&mut self, texture: NativeHandle) {
        self.rec(format!("generate_texture_mipmap({})", texture));
    }

    fn virtual_page_size(&mut self, target: NativeEnum, internal_format: NativeEnum) -> Option<[u32; 3]> {
        self.rec(format!("virtual_page_size({:#x}, {:#x})", target, internal_format));
        if self.capabilities().sparse_texture {
            Some([128, 128, 1])
        } else {
            None
        }
    }

    fn texture_page_commitment(&mut self, texture: NativeHandle, level: u32, region: Region3D, commit: bool) {
        self.rec(format!("texture_page_commitment({}, {}, {:?}, {})", texture, level, region, commit));
    }

    fn texture_handle(&mut self, texture: NativeHandle, sampler: NativeHandle) -> Option<u64> {
        self.rec(format!("texture_handle({}, {})", texture, sampler));
        if self.capabilities().bindless_texture {
            Some(((texture as u64) << 32) | sampler as u64)
        } else {
            None
        }
    }

    fn create_sampler(&mut self) -> NativeHandle {
        let h = self.handle();
        self.rec(format!("create_sampler() -> {}", h));
        h
    }

    fn sampler_parameter_i(&mut self, sampler: NativeHandle, pname: NativeEnum, value: i32) {
        self.rec(format!("sampler_parameter_i({}, {:#x}, {:#x})", sampler, pname, value));
    }

    fn sampler_parameter_f(&mut self, sampler: NativeHandle, pname: NativeEnum, value: f32) {
        self.rec(format!("sampler_parameter_f({}, {:#x}, {})", sampler, pname, value));
    }

    fn sampler_parameter_fv(&mut self, sampler: NativeHandle, pname: NativeEnum, value: [f32; 4]) {
        self.rec(format!("sampler_parameter_fv({}, {:#x}, {:?})", sampler, pname, value));
    }

    fn delete_sampler(&mut self, sampler: NativeHandle) {
        self.rec(format!("delete_sampler({})", sampler));
    }

    fn bind_texture_unit(&mut self, unit: u32, texture: NativeHandle) {
        self.rec(format!("bind_texture_unit({}, {})", unit, texture));
    }

    fn bind_sampler(&mut self, unit: u32, sampler: NativeHandle) {
        self.rec(format!("bind_sampler({}, {})", unit, sampler));
    }

    fn bind_image_texture(&mut self, unit: u32, texture: NativeHandle, level: u32, layered: bool, layer: u32, access: NativeEnum, format: NativeEnum) {
        self.rec(format!(
            "bind_image_texture({}, {}, {}, {}, {}, {:#x}, {:#x})",
            unit, texture, level, layered, layer, access, format
        ));
    }

    fn create_framebuffer(&mut self) -> NativeHandle {
        let h = self.handle();
        self.rec(format!("create_framebuffer() -> {}", h));
        h
    }

    fn delete_framebuffer(&mut self, framebuffer: NativeHandle) {
        self.rec(format!("delete_framebuffer({})", framebuffer));
    }

    fn framebuffer_texture(&mut self, framebuffer: NativeHandle, attachment: NativeEnum, texture: NativeHandle, level: u32) {
        self.rec(format!("framebuffer_texture({}, {:#x}, {}, {})", framebuffer, attachment, texture, level));
    }

    fn framebuffer_texture_layer(&mut self, framebuffer: NativeHandle, attachment: NativeEnum, texture: NativeHandle, level: u32, layer: u32) {
        self.rec(format!(
            "framebuffer_texture_layer({}, {:#x}, {}, {}, {})",
            framebuffer, attachment, texture, level, layer
        ));
    }

    fn check_framebuffer_status(&mut self, framebuffer: NativeHandle) -> NativeEnum {
        self.rec(format!("check_framebuffer_status({})", framebuffer));
        if self.shared.0.lock().incomplete_framebuffers {
            0x8CD6
        } else {
            native::FRAMEBUFFER_COMPLETE
        }
    }

    fn bind_framebuffer(&mut self, target: NativeEnum, framebuffer: NativeHandle) {
        self.rec(format!("bind_framebuffer({:#x}, {})", target, framebuffer));
    }

    fn framebuffer_draw_buffers(&mut self, framebuffer: NativeHandle, buffers: &[NativeEnum]) {
        let list: Vec<String> = buffers.iter().map(|b| format!("{:#x}", b)).collect();
        self.rec(format!("framebuffer_draw_buffers({}, [{}])", framebuffer, list.join(", ")));
    }

    fn clear_framebuffer_fv(&mut self, framebuffer: NativeHandle, buffer: NativeEnum, draw_buffer: i32, value: [f32; 4]) {
        self.rec(format!("clear_framebuffer_fv({}, {:#x}, {}, {:?})", framebuffer, buffer, draw_buffer, value));
    }

    fn clear_framebuffer_iv(&mut self, framebuffer: NativeHandle, buffer: NativeEnum, draw_buffer: i32, value: [i32; 4]) {
        self.rec(format!("clear_framebuffer_iv({}, {:#x}, {}, {:?})", framebuffer, buffer, draw_buffer, value));
    }

    fn clear_framebuffer_uiv(&mut self, framebuffer: NativeHandle, buffer: NativeEnum, draw_buffer: i32, value: [u32; 4]) {
        self.rec(format!("clear_framebuffer_uiv({}, {:#x}, {}, {:?})", framebuffer, buffer, draw_buffer, value));
    }

    fn clear_framebuffer_fi(&mut self, framebuffer: NativeHandle, depth: f32, stencil: i32) {
        self.rec(format!("clear_framebuffer_fi({}, {}, {})", framebuffer, depth, stencil));
    }

    fn invalidate_framebuffer(&mut self, framebuffer: NativeHandle, attachments: &[NativeEnum]) {
        let list: Vec<String> = attachments.iter().map(|a| format!("{:#x}", a)).collect();
        self.rec(format!("invalidate_framebuffer({}, [{}])", framebuffer, list.join(", ")));
    }

    fn blit_framebuffer(&mut self, src: NativeHandle, dst: NativeHandle, src_rect: [i32; 4], dst_rect: [i32; 4], mask: u32, filter: NativeEnum) {
        self.rec(format!(
            "blit_framebuffer({}, {}, {:?}, {:?}, {:#x}, {:#x})",
            src, dst, src_rect, dst_rect, mask, filter
        ));
    }

    fn draw_arrays(&mut self, mode: NativeEnum, first: i32, count: i32, instances: i32, base_instance: u32) {
        self.rec(format!("draw_arrays({:#x}, {}, {}, {}, {})", mode, first, count, instances, base_instance));
    }

    fn draw_elements(&mut self, mode: NativeEnum, count: i32, index_type: NativeEnum, offset: u64, instances: i32, base_vertex: i32, base_instance: u32) {
        self.rec(format!(
            "draw_elements({:#x}, {}, {:#x}, {}, {}, {}, {})",
            mode, count, index_type, offset, instances, base_vertex, base_instance
        ));
    }

    fn multi_draw_arrays_indirect(&mut self, mode: NativeEnum, offset: u64, draw_count: i32, stride: i32) {
        self.rec(format!("multi_draw_arrays_indirect({:#x}, {}, {}, {})", mode, offset, draw_count, stride));
    }

    fn multi_draw_elements_indirect(&mut self, mode: NativeEnum, index_type: NativeEnum, offset: u64, draw_count: i32, stride: i32) {
        self.rec(format!(
            "multi_draw_elements_indirect({:#x}, {:#x}, {}, {}, {})",
            mode, index_type, offset, draw_count, stride
        ));
    }

    fn dispatch_compute(&mut self, x: u32, y: u32, z: u32) {
        self.rec(format!("dispatch_compute({}, {}, {})", x, y, z));
    }

    fn dispatch_compute_indirect(&mut self, offset: u64) {
        self.rec(format!("dispatch_compute_indirect({})", offset));
    }

    fn create_query(&mut self, target: NativeEnum) -> NativeHandle {
        let h = self.handle();
        self.rec(format!("create_query({:#x}) -> {}", target, h));
        h
    }

    fn delete_query(&mut self, query: NativeHandle) {
        self.rec(format!("delete_query({})", query));
    }

    fn begin_query(&mut self, target: NativeEnum, query: NativeHandle) {
        self.rec(format!("begin_query({:#x}, {})", target, query));
    }

    fn end_query(&mut self, target: NativeEnum) {
        self.rec(format!("end_query({:#x})", target));
    }

    fn query_counter(&mut self, query: NativeHandle, target: NativeEnum) {
        self.rec(format!("query_counter({}, {:#x})", query, target));
    }

    fn get_query_object_u64(&mut self, query: NativeHandle, pname: NativeEnum) -> Option<u64> {
        self.rec(format!("get_query_object_u64({}, {:#x})", query, pname));
        Some(query as u64 * 10)
    }

    fn get_query_buffer_object_u64(&mut self, query: NativeHandle, buffer: NativeHandle, pname: NativeEnum, offset: u64) {
        self.rec(format!("get_query_buffer_object_u64({}, {}, {:#x}, {})", query, buffer, pname, offset));
    }

    fn create_transform_feedback(&mut self) -> NativeHandle {
        let h = self.handle();
        self.rec(format!("create_transform_feedback() -> {}", h));
        h
    }

    fn delete_transform_feedback(&mut self, xfb: NativeHandle) {
        self.rec(format!("delete_transform_feedback({})", xfb));
    }

    fn transform_feedback_buffer_range(&mut self, xfb: NativeHandle, index: u32, buffer: NativeHandle, offset: u64, size: u64) {
        self.rec(format!(
            "transform_feedback_buffer_range({}, {}, {}, {}, {})",
            xfb, index, buffer, offset, size
        ));
    }

    fn bind_transform_feedback(&mut self, xfb: NativeHandle) {
        self.rec(format!("bind_transform_feedback({})", xfb));
    }

    fn begin_transform_feedback(&mut self, primitive_mode: NativeEnum) {
        self.rec(format!("begin_transform_feedback({:#x})", primitive_mode));
    }

    fn pause_transform_feedback(&mut self) {
        self.rec("pause_transform_feedback()".to_string());
    }

    fn resume_transform_feedback(&mut self) {
        self.rec("resume_transform_feedback()".to_string());
    }

    fn end_transform_feedback(&mut self) {
        self.rec("end_transform_feedback()".to_string());
    }

    fn draw_transform_feedback(&mut self, mode: NativeEnum, xfb: NativeHandle, instances: i32) {
        self.rec(format!("draw_transform_feedback({:#x}, {}, {})", mode, xfb, instances));
    }

    fn fence_sync(&mut self) -> NativeHandle {
        let h = self.handle();
        self.rec(format!("fence_sync() -> {}", h));
        h
    }

    fn client_wait_sync(&mut self, sync: NativeHandle, flush: bool, timeout_ns: u64) -> NativeEnum {
        self.rec(format!("client_wait_sync({}, {}, {})", sync, flush, timeout_ns));
        self.shared.0.lock().wait_result.unwrap_or(native::ALREADY_SIGNALED)
    }

    fn wait_sync(&mut self, sync: NativeHandle) {
        self.rec(format!("wait_sync({})", sync));
    }

    fn delete_sync(&mut self, sync: NativeHandle) {
        self.rec(format!("delete_sync({})", sync));
    }

    fn memory_barrier(&mut self, bits: u32) {
        self.rec(format!("memory_barrier({:#x})", bits));
    }

    fn texture_barrier(&mut self) {
        self.rec("texture_barrier()".to_string());
    }

    fn flush(&mut self) {
        self.rec("flush()".to_string());
    }

    fn finish(&mut self) {
        self.rec("finish()".to_string());
    }
}

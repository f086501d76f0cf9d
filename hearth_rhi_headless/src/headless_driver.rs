//! GPU-less implementation of the driver trait.
//!
//! Objects live in memory and every call is checked against the rules a
//! strict driver enforces. Violations never abort: they are logged and kept
//! for inspection through [`HeadlessMonitor`].

use std::ptr::NonNull;
use std::sync::Arc;
use parking_lot::{Mutex, MutexGuard};
use rustc_hash::FxHashSet;
use hearth_rhi::hearth::driver::{
    native, ContextId, Driver, DriverCaps, NativeAttribFormat, NativeEnum, NativeHandle, PixelSource, PixelTarget,
    Region3D, SurfaceInfo,
};
use hearth_rhi::hearth::DeviceConfig;
use crate::monitor::HeadlessMonitor;
use crate::world::{
    pages_in, page_size, texture_bytes, Attachment, BufferObject, Command, FramebufferObject, ObjectData, ObjectKind,
    ProgramObject, QueryObject, TextureObject, TransformFeedbackObject, VertexArrayObject, World,
};

const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Simulated driver
pub struct HeadlessDriver {
    world: Arc<Mutex<World>>,
}

impl HeadlessDriver {
    pub fn new() -> Self {
        Self::with_caps(DriverCaps::default())
    }

    pub fn with_caps(caps: DriverCaps) -> Self {
        Self { world: Arc::new(Mutex::new(World::new(caps))) }
    }

    /// Driver configured from device settings (validation messages follow `config.validation`)
    pub fn from_config(config: &DeviceConfig) -> Self {
        let driver = Self::new();
        driver.world.lock().log_errors = config.validation;
        driver
    }

    /// Fail allocations once `bytes` of buffer and texture storage are in use
    pub fn with_memory_budget(self, bytes: u64) -> Self {
        self.world.lock().memory_budget = Some(bytes);
        self
    }

    /// Handle for inspecting the simulated state after the driver is handed to a device
    pub fn monitor(&self) -> HeadlessMonitor {
        HeadlessMonitor::new(Arc::clone(&self.world))
    }

    fn enter(&self, call: &'static str) -> MutexGuard<'_, World> {
        let mut world = self.world.lock();
        world.record(call);
        world
    }

    /// Record a call that acts on the current context
    fn context_command(&self, call: &'static str) {
        let mut world = self.enter(call);
        world.context(call);
    }
}

impl Default for HeadlessDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HeadlessDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let world = self.world.lock();
        f.debug_struct("HeadlessDriver")
            .field("objects", &world.objects.len())
            .field("contexts", &world.contexts.len())
            .field("current", &world.current)
            .field("errors", &world.errors.len())
            .finish()
    }
}

/// Range check shared by every buffer access
fn in_range(world: &mut World, call: &str, buffer: NativeHandle, offset: u64, size: u64) -> bool {
    if !world.check(call, buffer, ObjectKind::Buffer) {
        return false;
    }
    let len = world.buffer_mut(buffer).map(|b| b.bytes.len() as u64).unwrap_or(0);
    if offset.checked_add(size).map_or(true, |end| end > len) {
        world.error(call, format!("range {}+{} outside buffer {} ({} bytes)", offset, size, buffer, len));
        return false;
    }
    true
}

fn texture_region_ok(world: &mut World, call: &str, texture: NativeHandle, level: u32, region: &Region3D) -> bool {
    if !world.check(call, texture, ObjectKind::Texture) {
        return false;
    }
    let Some(object) = world.texture(texture) else {
        return false;
    };
    if !object.allocated || level >= object.levels {
        let levels = object.levels;
        world.error(call, format!("level {} of texture {} has no storage ({} levels)", level, texture, levels));
        return false;
    }
    let extent = object.level_extent(level);
    let fits = region.x >= 0
        && region.y >= 0
        && region.z >= 0
        && region.x as u64 + u64::from(region.width) <= u64::from(extent[0])
        && region.y as u64 + u64::from(region.height) <= u64::from(extent[1])
        && region.z as u64 + u64::from(region.depth) <= u64::from(extent[2]);
    if !fits {
        world.error(call, format!("{:?} outside level {} of texture {} ({:?})", region, level, texture, extent));
    }
    fits
}

fn bound_buffer(world: &mut World, call: &str, target: NativeEnum) -> NativeHandle {
    match world.context(call) {
        Some(id) => world.ctx(id).buffer(target),
        None => 0,
    }
}

impl Driver for HeadlessDriver {
    // ===== CONTEXTS =====

    fn capabilities(&self) -> DriverCaps {
        self.world.lock().caps
    }

    fn create_context(&mut self, id: ContextId, surface: SurfaceInfo) -> bool {
        self.enter("create_context").add_context(id, surface)
    }

    fn destroy_context(&mut self, id: ContextId) {
        self.enter("destroy_context").remove_context(id);
    }

    fn make_current(&mut self, id: Option<ContextId>) -> bool {
        let mut world = self.enter("make_current");
        if let Some(id) = id {
            if !world.contexts.contains_key(&id) {
                world.error("make_current", format!("unknown {:?}", id));
                return false;
            }
        }
        world.current = id;
        true
    }

    fn current_context(&self) -> Option<ContextId> {
        self.world.lock().current
    }

    // ===== FIXED-FUNCTION STATE =====

    fn enable(&mut self, cap: NativeEnum) {
        let mut world = self.enter("enable");
        if let Some(id) = world.context("enable") {
            world.ctx(id).enabled.insert((cap, 0));
        }
    }

    fn disable(&mut self, cap: NativeEnum) {
        let mut world = self.enter("disable");
        if let Some(id) = world.context("disable") {
            world.ctx(id).enabled.retain(|&(c, _)| c != cap);
        }
    }

    fn enable_i(&mut self, cap: NativeEnum, index: u32) {
        let mut world = self.enter("enable_i");
        if let Some(id) = world.context("enable_i") {
            world.ctx(id).enabled.insert((cap, index));
        }
    }

    fn disable_i(&mut self, cap: NativeEnum, index: u32) {
        let mut world = self.enter("disable_i");
        if let Some(id) = world.context("disable_i") {
            world.ctx(id).enabled.remove(&(cap, index));
        }
    }

    fn blend_func_separate_i(&mut self, buffer: u32, _: NativeEnum, _: NativeEnum, _: NativeEnum, _: NativeEnum) {
        let mut world = self.enter("blend_func_separate_i");
        world.context("blend_func_separate_i");
        if buffer >= world.caps.max_color_attachments {
            world.error("blend_func_separate_i", format!("draw buffer {} out of range", buffer));
        }
    }

    fn blend_equation_separate_i(&mut self, buffer: u32, _: NativeEnum, _: NativeEnum) {
        let mut world = self.enter("blend_equation_separate_i");
        world.context("blend_equation_separate_i");
        if buffer >= world.caps.max_color_attachments {
            world.error("blend_equation_separate_i", format!("draw buffer {} out of range", buffer));
        }
    }

    fn color_mask_i(&mut self, buffer: u32, _: bool, _: bool, _: bool, _: bool) {
        let mut world = self.enter("color_mask_i");
        world.context("color_mask_i");
        if buffer >= world.caps.max_color_attachments {
            world.error("color_mask_i", format!("draw buffer {} out of range", buffer));
        }
    }

    fn blend_color(&mut self, _: [f32; 4]) {
        self.context_command("blend_color");
    }

    fn cull_face(&mut self, _: NativeEnum) {
        self.context_command("cull_face");
    }

    fn front_face(&mut self, _: NativeEnum) {
        self.context_command("front_face");
    }

    fn polygon_mode(&mut self, _: NativeEnum) {
        self.context_command("polygon_mode");
    }

    fn polygon_offset_clamp(&mut self, _: f32, _: f32, _: f32) {
        self.context_command("polygon_offset_clamp");
    }

    fn depth_func(&mut self, _: NativeEnum) {
        self.context_command("depth_func");
    }

    fn depth_mask(&mut self, _: bool) {
        self.context_command("depth_mask");
    }

    fn stencil_func_separate(&mut self, _: NativeEnum, _: NativeEnum, _: u32, _: u32) {
        self.context_command("stencil_func_separate");
    }

    fn stencil_op_separate(&mut self, _: NativeEnum, _: NativeEnum, _: NativeEnum, _: NativeEnum) {
        self.context_command("stencil_op_separate");
    }

    fn stencil_mask_separate(&mut self, _: NativeEnum, _: u32) {
        self.context_command("stencil_mask_separate");
    }

    fn viewport_array(&mut self, first: u32, viewports: &[[f32; 4]]) {
        let mut world = self.enter("viewport_array");
        world.context("viewport_array");
        if first as usize + viewports.len() > world.caps.max_viewports as usize {
            world.error("viewport_array", format!("{} viewports from {} exceed the limit", viewports.len(), first));
        }
        if viewports.iter().any(|v| v[2] < 0.0 || v[3] < 0.0) {
            world.error("viewport_array", "negative viewport extent".to_string());
        }
    }

    fn depth_range_array(&mut self, first: u32, ranges: &[[f64; 2]]) {
        let mut world = self.enter("depth_range_array");
        world.context("depth_range_array");
        if first as usize + ranges.len() > world.caps.max_viewports as usize {
            world.error("depth_range_array", format!("{} ranges from {} exceed the limit", ranges.len(), first));
        }
    }

    fn scissor_array(&mut self, first: u32, rects: &[[i32; 4]]) {
        let mut world = self.enter("scissor_array");
        world.context("scissor_array");
        if first as usize + rects.len() > world.caps.max_viewports as usize {
            world.error("scissor_array", format!("{} scissors from {} exceed the limit", rects.len(), first));
        }
        if rects.iter().any(|r| r[2] < 0 || r[3] < 0) {
            world.error("scissor_array", "negative scissor extent".to_string());
        }
    }

    fn patch_vertices(&mut self, count: u32) {
        let mut world = self.enter("patch_vertices");
        world.context("patch_vertices");
        if count == 0 || count > 32 {
            world.error("patch_vertices", format!("{} control points", count));
        }
    }

    fn pixel_store_i(&mut self, _: NativeEnum, value: i32) {
        let mut world = self.enter("pixel_store_i");
        world.context("pixel_store_i");
        if value < 0 {
            world.error("pixel_store_i", format!("negative value {}", value));
        }
    }

    // ===== PROGRAMS =====

    fn create_shader_program(&mut self, stage: NativeEnum, source: &str) -> NativeHandle {
        let mut world = self.enter("create_shader_program");
        let failure = if source.trim().is_empty() {
            Some("0:0(0): error: empty shader".to_string())
        } else {
            source
                .lines()
                .enumerate()
                .find(|(_, line)| line.trim_start().starts_with("#error"))
                .map(|(n, line)| format!("0:{}(1): error: {}", n + 1, line.trim_start()))
        };
        let program = ProgramObject {
            stage,
            linked: failure.is_none(),
            info_log: failure.unwrap_or_default(),
        };
        world.create(ObjectKind::Program, ObjectData::Program(program))
    }

    fn create_shader_program_binary(&mut self, stage: NativeEnum, format: NativeEnum, binary: &[u8], entry_point: &str) -> NativeHandle {
        let mut world = self.enter("create_shader_program_binary");
        let failure = if !world.caps.spirv_binaries || format != native::SHADER_BINARY_FORMAT_SPIR_V {
            Some(format!("binary format {:#x} not supported", format))
        } else if binary.len() < 4 || binary.len() % 4 != 0 {
            Some(format!("SPIR-V module of {} bytes is not word aligned", binary.len()))
        } else if u32::from_le_bytes([binary[0], binary[1], binary[2], binary[3]]) != SPIRV_MAGIC {
            Some("bad SPIR-V magic number".to_string())
        } else if entry_point.is_empty() {
            Some("missing entry point".to_string())
        } else {
            None
        };
        let program = ProgramObject {
            stage,
            linked: failure.is_none(),
            info_log: failure.unwrap_or_default(),
        };
        world.create(ObjectKind::Program, ObjectData::Program(program))
    }

    fn program_link_status(&mut self, program: NativeHandle) -> bool {
        let mut world = self.enter("program_link_status");
        world.check("program_link_status", program, ObjectKind::Program)
            && world.program(program).is_some_and(|p| p.linked)
    }

    fn program_info_log(&mut self, program: NativeHandle) -> String {
        let mut world = self.enter("program_info_log");
        if !world.check("program_info_log", program, ObjectKind::Program) {
            return String::new();
        }
        world.program(program).map(|p| p.info_log.clone()).unwrap_or_default()
    }

    fn delete_program(&mut self, program: NativeHandle) {
        self.enter("delete_program").delete("delete_program", program, ObjectKind::Program);
    }

    fn create_program_pipeline(&mut self) -> NativeHandle {
        let mut world = self.enter("create_program_pipeline");
        world.context("create_program_pipeline");
        world.create(ObjectKind::ProgramPipeline, ObjectData::Plain)
    }

    fn use_program_stages(&mut self, pipeline: NativeHandle, stage_bits: u32, program: NativeHandle) {
        let mut world = self.enter("use_program_stages");
        if !world.check("use_program_stages", pipeline, ObjectKind::ProgramPipeline) {
            return;
        }
        if program == 0 {
            return;
        }
        if !world.check("use_program_stages", program, ObjectKind::Program) {
            return;
        }
        let Some((stage, linked)) = world.program(program).map(|p| (p.stage, p.linked)) else {
            return;
        };
        if !linked {
            world.error("use_program_stages", format!("program {} is not linked", program));
        }
        if stage_bits & stage_bit(stage) == 0 {
            world.error(
                "use_program_stages",
                format!("program {} ({:#x}) not covered by stage bits {:#x}", program, stage, stage_bits),
            );
        }
    }

    fn bind_program_pipeline(&mut self, pipeline: NativeHandle) {
        let mut world = self.enter("bind_program_pipeline");
        let Some(id) = world.context("bind_program_pipeline") else {
            return;
        };
        if world.check_or_null("bind_program_pipeline", pipeline, ObjectKind::ProgramPipeline) {
            world.ctx(id).program_pipeline = pipeline;
        }
    }

    fn delete_program_pipeline(&mut self, pipeline: NativeHandle) {
        self.enter("delete_program_pipeline")
            .delete("delete_program_pipeline", pipeline, ObjectKind::ProgramPipeline);
    }

    // ===== VERTEX ARRAYS =====

    fn create_vertex_array(&mut self) -> NativeHandle {
        let mut world = self.enter("create_vertex_array");
        world.context("create_vertex_array");
        world.create(ObjectKind::VertexArray, ObjectData::VertexArray(VertexArrayObject::default()))
    }

    fn delete_vertex_array(&mut self, vao: NativeHandle) {
        self.enter("delete_vertex_array").delete("delete_vertex_array", vao, ObjectKind::VertexArray);
    }

    fn bind_vertex_array(&mut self, vao: NativeHandle) {
        let mut world = self.enter("bind_vertex_array");
        let Some(id) = world.context("bind_vertex_array") else {
            return;
        };
        if world.check_or_null("bind_vertex_array", vao, ObjectKind::VertexArray) {
            world.ctx(id).vertex_array = vao;
        }
    }

    fn vertex_array_attrib_format(&mut self, vao: NativeHandle, attrib: u32, format: NativeAttribFormat, _: u32) {
        let mut world = self.enter("vertex_array_attrib_format");
        if !world.check("vertex_array_attrib_format", vao, ObjectKind::VertexArray) {
            return;
        }
        if attrib >= world.caps.max_vertex_attrib_bindings || !(1..=4).contains(&format.components) {
            world.error("vertex_array_attrib_format", format!("attribute {} with {:?}", attrib, format));
        }
    }

    fn vertex_array_attrib_binding(&mut self, vao: NativeHandle, attrib: u32, binding: u32) {
        let mut world = self.enter("vertex_array_attrib_binding");
        if !world.check("vertex_array_attrib_binding", vao, ObjectKind::VertexArray) {
            return;
        }
        let limit = world.caps.max_vertex_attrib_bindings;
        if attrib >= limit || binding >= limit {
            world.error("vertex_array_attrib_binding", format!("attribute {} -> binding {}", attrib, binding));
        }
    }

    fn enable_vertex_array_attrib(&mut self, vao: NativeHandle, attrib: u32) {
        let mut world = self.enter("enable_vertex_array_attrib");
        if !world.check("enable_vertex_array_attrib", vao, ObjectKind::VertexArray) {
            return;
        }
        if let Some(array) = world.vertex_array_mut(vao) {
            array.enabled_attribs |= 1 << attrib.min(31);
        }
    }

    fn vertex_array_binding_divisor(&mut self, vao: NativeHandle, _: u32, _: u32) {
        let mut world = self.enter("vertex_array_binding_divisor");
        world.check("vertex_array_binding_divisor", vao, ObjectKind::VertexArray);
    }

    fn vertex_array_vertex_buffer(&mut self, vao: NativeHandle, binding: u32, buffer: NativeHandle, _: u64, _: u32) {
        let mut world = self.enter("vertex_array_vertex_buffer");
        if !world.check("vertex_array_vertex_buffer", vao, ObjectKind::VertexArray) {
            return;
        }
        world.check_or_null("vertex_array_vertex_buffer", buffer, ObjectKind::Buffer);
        if binding >= world.caps.max_vertex_attrib_bindings {
            world.error("vertex_array_vertex_buffer", format!("binding {} out of range", binding));
        }
    }

    fn vertex_array_element_buffer(&mut self, vao: NativeHandle, buffer: NativeHandle) {
        let mut world = self.enter("vertex_array_element_buffer");
        if !world.check("vertex_array_element_buffer", vao, ObjectKind::VertexArray)
            || !world.check_or_null("vertex_array_element_buffer", buffer, ObjectKind::Buffer)
        {
            return;
        }
        if let Some(array) = world.vertex_array_mut(vao) {
            array.element_buffer = buffer;
        }
    }

    // ===== BUFFERS =====

    fn create_buffer(&mut self) -> NativeHandle {
        let buffer = BufferObject { bytes: Vec::new(), flags: 0, allocated: false, mapped: None };
        self.enter("create_buffer").create(ObjectKind::Buffer, ObjectData::Buffer(buffer))
    }

    fn buffer_storage(&mut self, buffer: NativeHandle, size: u64, data: Option<&[u8]>, flags: u32) -> bool {
        let mut world = self.enter("buffer_storage");
        if !world.check("buffer_storage", buffer, ObjectKind::Buffer) {
            return false;
        }
        if world.buffer_mut(buffer).is_some_and(|b| b.allocated) {
            world.error("buffer_storage", format!("buffer {} storage is immutable", buffer));
            return false;
        }
        if size == 0 {
            world.error("buffer_storage", "zero-sized storage".to_string());
            return false;
        }
        if !world.allocate(size) {
            return false;
        }
        let mut bytes = vec![0u8; size as usize];
        if let Some(data) = data {
            let n = data.len().min(bytes.len());
            bytes[..n].copy_from_slice(&data[..n]);
        }
        if let Some(object) = world.buffer_mut(buffer) {
            object.bytes = bytes;
            object.flags = flags;
            object.allocated = true;
        }
        true
    }

    fn delete_buffer(&mut self, buffer: NativeHandle) {
        self.enter("delete_buffer").delete("delete_buffer", buffer, ObjectKind::Buffer);
    }

    fn buffer_sub_data(&mut self, buffer: NativeHandle, offset: u64, data: &[u8]) {
        let mut world = self.enter("buffer_sub_data");
        if !in_range(&mut world, "buffer_sub_data", buffer, offset, data.len() as u64) {
            return;
        }
        let Some(object) = world.buffer_mut(buffer) else {
            return;
        };
        if object.flags & native::DYNAMIC_STORAGE_BIT == 0 {
            world.error("buffer_sub_data", format!("buffer {} lacks dynamic storage", buffer));
            return;
        }
        if object.mapped.is_some_and(|(_, _, access)| access & native::MAP_PERSISTENT_BIT == 0) {
            world.error("buffer_sub_data", format!("buffer {} is mapped", buffer));
            return;
        }
        let start = offset as usize;
        object.bytes[start..start + data.len()].copy_from_slice(data);
    }

    fn get_buffer_sub_data(&mut self, buffer: NativeHandle, offset: u64, out: &mut [u8]) {
        let mut world = self.enter("get_buffer_sub_data");
        if !in_range(&mut world, "get_buffer_sub_data", buffer, offset, out.len() as u64) {
            return;
        }
        if let Some(object) = world.buffer_mut(buffer) {
            let start = offset as usize;
            out.copy_from_slice(&object.bytes[start..start + out.len()]);
        }
    }

    fn copy_buffer_sub_data(&mut self, src: NativeHandle, dst: NativeHandle, src_offset: u64, dst_offset: u64, size: u64) {
        let mut world = self.enter("copy_buffer_sub_data");
        if !in_range(&mut world, "copy_buffer_sub_data", src, src_offset, size)
            || !in_range(&mut world, "copy_buffer_sub_data", dst, dst_offset, size)
        {
            return;
        }
        if src == dst && src_offset < dst_offset + size && dst_offset < src_offset + size {
            world.error("copy_buffer_sub_data", format!("overlapping copy inside buffer {}", src));
            return;
        }
        let (s, d, n) = (src_offset as usize, dst_offset as usize, size as usize);
        let chunk = match world.buffer_mut(src) {
            Some(object) => object.bytes[s..s + n].to_vec(),
            None => return,
        };
        if let Some(object) = world.buffer_mut(dst) {
            object.bytes[d..d + n].copy_from_slice(&chunk);
        }
    }

    fn clear_buffer_sub_data(&mut self, buffer: NativeHandle, _: NativeEnum, offset: u64, size: u64, _: NativeEnum, _: NativeEnum, value: &[u8]) {
        let mut world = self.enter("clear_buffer_sub_data");
        if !in_range(&mut world, "clear_buffer_sub_data", buffer, offset, size) {
            return;
        }
        if value.is_empty() || size % value.len() as u64 != 0 {
            world.error("clear_buffer_sub_data", format!("{} bytes is not a multiple of the value size", size));
            return;
        }
        if let Some(object) = world.buffer_mut(buffer) {
            let start = offset as usize;
            for chunk in object.bytes[start..start + size as usize].chunks_mut(value.len()) {
                chunk.copy_from_slice(value);
            }
        }
    }

    fn map_buffer_range(&mut self, buffer: NativeHandle, offset: u64, length: u64, access: u32) -> Option<NonNull<u8>> {
        let mut world = self.enter("map_buffer_range");
        if !in_range(&mut world, "map_buffer_range", buffer, offset, length) || length == 0 {
            return None;
        }
        let object = world.buffer_mut(buffer)?;
        let needed = access & (native::MAP_READ_BIT | native::MAP_WRITE_BIT | native::MAP_PERSISTENT_BIT | native::MAP_COHERENT_BIT);
        let problem = if object.mapped.is_some() {
            Some(format!("buffer {} is already mapped", buffer))
        } else if needed & !object.flags != 0 {
            Some(format!("access {:#x} not allowed by storage flags {:#x}", access, object.flags))
        } else if access & (native::MAP_READ_BIT | native::MAP_WRITE_BIT) == 0 {
            Some("mapping neither reads nor writes".to_string())
        } else {
            None
        };
        if let Some(message) = problem {
            world.error("map_buffer_range", message);
            return None;
        }
        if access & native::MAP_INVALIDATE_BUFFER_BIT != 0 {
            object.bytes.fill(0);
        }
        object.mapped = Some((offset, length, access));
        // Storage is immutable, so the allocation never moves while mapped
        NonNull::new(object.bytes[offset as usize..].as_mut_ptr())
    }

    fn flush_mapped_buffer_range(&mut self, buffer: NativeHandle, offset: u64, length: u64) {
        let mut world = self.enter("flush_mapped_buffer_range");
        if !world.check("flush_mapped_buffer_range", buffer, ObjectKind::Buffer) {
            return;
        }
        let mapped = world.buffer_mut(buffer).and_then(|b| b.mapped);
        match mapped {
            Some((_, len, access)) if access & native::MAP_FLUSH_EXPLICIT_BIT != 0 && offset + length <= len => {}
            Some(_) => world.error(
                "flush_mapped_buffer_range",
                format!("flush {}+{} invalid for the mapping of buffer {}", offset, length, buffer),
            ),
            None => world.error("flush_mapped_buffer_range", format!("buffer {} is not mapped", buffer)),
        }
    }

    fn unmap_buffer(&mut self, buffer: NativeHandle) -> bool {
        let mut world = self.enter("unmap_buffer");
        if !world.check("unmap_buffer", buffer, ObjectKind::Buffer) {
            return false;
        }
        let was_mapped = world.buffer_mut(buffer).and_then(|b| b.mapped.take()).is_some();
        if !was_mapped {
            world.error("unmap_buffer", format!("buffer {} is not mapped", buffer));
        }
        was_mapped
    }

    fn bind_buffer(&mut self, target: NativeEnum, buffer: NativeHandle) {
        let mut world = self.enter("bind_buffer");
        let Some(id) = world.context("bind_buffer") else {
            return;
        };
        if world.check_or_null("bind_buffer", buffer, ObjectKind::Buffer) {
            world.ctx(id).buffers.insert(target, buffer);
        }
    }

    fn bind_buffer_range(&mut self, target: NativeEnum, index: u32, buffer: NativeHandle, offset: u64, size: u64) {
        let mut world = self.enter("bind_buffer_range");
        if world.context("bind_buffer_range").is_none() {
            return;
        }
        let limit = match target {
            native::UNIFORM_BUFFER => world.caps.max_uniform_buffer_bindings,
            native::SHADER_STORAGE_BUFFER => world.caps.max_storage_buffer_bindings,
            _ => u32::MAX,
        };
        if index >= limit {
            world.error("bind_buffer_range", format!("index {} out of range for {:#x}", index, target));
            return;
        }
        if buffer != 0 {
            in_range(&mut world, "bind_buffer_range", buffer, offset, size);
        }
    }

    // ===== TEXTURES =====

    fn create_texture(&mut self, target: NativeEnum) -> NativeHandle {
        let texture = TextureObject {
            target,
            internal_format: 0,
            levels: 0,
            extent: [0; 3],
            samples: 0,
            allocated: false,
            sparse: false,
            committed: FxHashSet::default(),
        };
        self.enter("create_texture").create(ObjectKind::Texture, ObjectData::Texture(texture))
    }

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
    ) -> bool {
        let mut world = self.enter("texture_storage");
        if !world.check("texture_storage", texture, ObjectKind::Texture) {
            return false;
        }
        let problem = match world.texture(texture) {
            Some(object) if object.allocated => Some(format!("texture {} storage is immutable", texture)),
            Some(object) if object.target != target => {
                Some(format!("target {:#x} does not match creation target {:#x}", target, object.target))
            }
            _ if levels == 0 || width == 0 || height == 0 || depth == 0 => {
                Some(format!("empty storage {}x{}x{} with {} levels", width, height, depth, levels))
            }
            _ => None,
        };
        if let Some(message) = problem {
            world.error("texture_storage", message);
            return false;
        }

        let mut object = TextureObject {
            target,
            internal_format,
            levels,
            extent: [width, height, depth],
            samples: samples.max(1),
            allocated: true,
            sparse: world.texture(texture).is_some_and(|t| t.sparse),
            committed: FxHashSet::default(),
        };
        // Sparse textures only consume memory for committed pages
        if !object.sparse && !world.allocate(texture_bytes(&object)) {
            return false;
        }
        if let Some(slot) = world.texture_mut(texture) {
            std::mem::swap(slot, &mut object);
        }
        true
    }

    fn delete_texture(&mut self, texture: NativeHandle) {
        self.enter("delete_texture").delete("delete_texture", texture, ObjectKind::Texture);
    }

    fn texture_parameter_i(&mut self, texture: NativeHandle, pname: NativeEnum, value: i32) {
        let mut world = self.enter("texture_parameter_i");
        if !world.check("texture_parameter_i", texture, ObjectKind::Texture) {
            return;
        }
        if pname == native::TEXTURE_SPARSE {
            let allocated = world.texture(texture).is_some_and(|t| t.allocated);
            if allocated {
                world.error("texture_parameter_i", format!("texture {} already has storage", texture));
            } else if !world.caps.sparse_texture {
                world.error("texture_parameter_i", "sparse textures unsupported".to_string());
            } else if let Some(object) = world.texture_mut(texture) {
                object.sparse = value != 0;
            }
        }
    }

    fn texture_sub_image(&mut self, texture: NativeHandle, level: u32, region: Region3D, _: NativeEnum, _: NativeEnum, pixels: PixelSource<'_>) {
        let mut world = self.enter("texture_sub_image");
        if !texture_region_ok(&mut world, "texture_sub_image", texture, level, &region) {
            return;
        }
        let unpack = bound_buffer(&mut world, "texture_sub_image", native::PIXEL_UNPACK_BUFFER);
        match pixels {
            PixelSource::Slice(_) if unpack != 0 => world.error(
                "texture_sub_image",
                format!("client pointer used while unpack buffer {} is bound", unpack),
            ),
            PixelSource::UnpackBufferOffset(_) if unpack == 0 => {
                world.error("texture_sub_image", "no unpack buffer bound".to_string())
            }
            _ => {}
        }
    }

    fn get_texture_sub_image(&mut self, texture: NativeHandle, level: u32, region: Region3D, _: NativeEnum, _: NativeEnum, pixels: PixelTarget<'_>) {
        let mut world = self.enter("get_texture_sub_image");
        if !texture_region_ok(&mut world, "get_texture_sub_image", texture, level, &region) {
            return;
        }
        let pack = bound_buffer(&mut world, "get_texture_sub_image", native::PIXEL_PACK_BUFFER);
        match pixels {
            PixelTarget::Slice(_) if pack != 0 => world.error(
                "get_texture_sub_image",
                format!("client pointer used while pack buffer {} is bound", pack),
            ),
            // Texel contents are not simulated
            PixelTarget::Slice(out) => out.fill(0),
            PixelTarget::PackBufferOffset(_) if pack == 0 => {
                world.error("get_texture_sub_image", "no pack buffer bound".to_string())
            }
            PixelTarget::PackBufferOffset(_) => {}
        }
    }

    fn copy_image_sub_data(
        &mut self,
        src: NativeHandle,
        _: NativeEnum,
        src_level: u32,
        src_origin: [i32; 3],
        dst: NativeHandle,
        _: NativeEnum,
        dst_level: u32,
        dst_origin: [i32; 3],
        extent: [u32; 3],
    ) {
        let mut world = self.enter("copy_image_sub_data");
        let region = |origin: [i32; 3]| Region3D {
            x: origin[0],
            y: origin[1],
            z: origin[2],
            width: extent[0],
            height: extent[1],
            depth: extent[2],
        };
        texture_region_ok(&mut world, "copy_image_sub_data", src, src_level, &region(src_origin));
        texture_region_ok(&mut world, "copy_image_sub_data", dst, dst_level, &region(dst_origin));
    }

    fn clear_tex_sub_image(&mut self, texture: NativeHandle, level: u32, region: Region3D, _: NativeEnum, _: NativeEnum, _: &[u8]) {
        let mut world = self.enter("clear_tex_sub_image");
        texture_region_ok(&mut world, "clear_tex_sub_image", texture, level, &region);
    }

    fn generate_texture_mipmap(&mut self, texture: NativeHandle) {
        let mut world = self.enter("generate_texture_mipmap");
        if !world.check("generate_texture_mipmap", texture, ObjectKind::Texture) {
            return;
        }
        if world.texture(texture).is_some_and(|t| t.samples > 1) {
            world.error("generate_texture_mipmap", format!("texture {} is multisampled", texture));
        }
    }

    fn virtual_page_size(&mut self, _: NativeEnum, internal_format: NativeEnum) -> Option<[u32; 3]> {
        let world = self.enter("virtual_page_size");
        world.caps.sparse_texture.then(|| page_size(internal_format))
    }

    fn texture_page_commitment(&mut self, texture: NativeHandle, level: u32, region: Region3D, commit: bool) {
        let mut world = self.enter("texture_page_commitment");
        if !texture_region_ok(&mut world, "texture_page_commitment", texture, level, &region) {
            return;
        }
        let Some(object) = world.texture(texture) else {
            return;
        };
        if !object.sparse {
            world.error("texture_page_commitment", format!("texture {} is not sparse", texture));
            return;
        }
        let Some(pages) = pages_in(object, level, &region) else {
            world.error("texture_page_commitment", format!("{:?} is not page aligned", region));
            return;
        };
        let page_bytes = 64 * 1024;
        let mut delta: i64 = 0;
        if let Some(object) = world.texture_mut(texture) {
            for page in pages {
                let changed = if commit {
                    object.committed.insert((level, page))
                } else {
                    object.committed.remove(&(level, page))
                };
                if changed {
                    delta += if commit { page_bytes } else { -page_bytes };
                }
            }
        }
        if delta >= 0 {
            if !world.allocate(delta as u64) {
                world.error("texture_page_commitment", "out of memory committing pages".to_string());
            }
        } else {
            world.memory_used = world.memory_used.saturating_sub(delta.unsigned_abs());
        }
    }

    fn texture_handle(&mut self, texture: NativeHandle, sampler: NativeHandle) -> Option<u64> {
        let mut world = self.enter("texture_handle");
        if !world.caps.bindless_texture {
            world.error("texture_handle", "bindless textures unsupported".to_string());
            return None;
        }
        if !world.check("texture_handle", texture, ObjectKind::Texture)
            || !world.check_or_null("texture_handle", sampler, ObjectKind::Sampler)
        {
            return None;
        }
        world.next_bindless += 1;
        Some(world.next_bindless)
    }

    // ===== SAMPLERS =====

    fn create_sampler(&mut self) -> NativeHandle {
        self.enter("create_sampler").create(ObjectKind::Sampler, ObjectData::Plain)
    }

    fn sampler_parameter_i(&mut self, sampler: NativeHandle, _: NativeEnum, _: i32) {
        let mut world = self.enter("sampler_parameter_i");
        world.check("sampler_parameter_i", sampler, ObjectKind::Sampler);
    }

    fn sampler_parameter_f(&mut self, sampler: NativeHandle, pname: NativeEnum, value: f32) {
        let mut world = self.enter("sampler_parameter_f");
        if !world.check("sampler_parameter_f", sampler, ObjectKind::Sampler) {
            return;
        }
        if pname == native::TEXTURE_MAX_ANISOTROPY && (value < 1.0 || value > world.caps.max_anisotropy) {
            world.error("sampler_parameter_f", format!("anisotropy {} out of range", value));
        }
    }

    fn sampler_parameter_fv(&mut self, sampler: NativeHandle, _: NativeEnum, _: [f32; 4]) {
        let mut world = self.enter("sampler_parameter_fv");
        world.check("sampler_parameter_fv", sampler, ObjectKind::Sampler);
    }

    fn delete_sampler(&mut self, sampler: NativeHandle) {
        self.enter("delete_sampler").delete("delete_sampler", sampler, ObjectKind::Sampler);
    }

    // ===== RESOURCE UNITS =====

    fn bind_texture_unit(&mut self, unit: u32, texture: NativeHandle) {
        let mut world = self.enter("bind_texture_unit");
        world.context("bind_texture_unit");
        if unit >= world.caps.max_texture_units {
            world.error("bind_texture_unit", format!("unit {} out of range", unit));
        }
        world.check_or_null("bind_texture_unit", texture, ObjectKind::Texture);
    }

    fn bind_sampler(&mut self, unit: u32, sampler: NativeHandle) {
        let mut world = self.enter("bind_sampler");
        world.context("bind_sampler");
        if unit >= world.caps.max_texture_units {
            world.error("bind_sampler", format!("unit {} out of range", unit));
        }
        world.check_or_null("bind_sampler", sampler, ObjectKind::Sampler);
    }

    fn bind_image_texture(&mut self, unit: u32, texture: NativeHandle, level: u32, _: bool, _: u32, _: NativeEnum, _: NativeEnum) {
        let mut world = self.enter("bind_image_texture");
        world.context("bind_image_texture");
        if unit >= world.caps.max_image_units {
            world.error("bind_image_texture", format!("unit {} out of range", unit));
        }
        if texture != 0 && world.check("bind_image_texture", texture, ObjectKind::Texture) {
            let levels = world.texture(texture).map(|t| t.levels).unwrap_or(0);
            if level >= levels {
                world.error("bind_image_texture", format!("level {} of texture {} missing", level, texture));
            }
        }
    }

    // ===== FRAMEBUFFERS =====

    fn create_framebuffer(&mut self) -> NativeHandle {
        let mut world = self.enter("create_framebuffer");
        world.context("create_framebuffer");
        world.create(ObjectKind::Framebuffer, ObjectData::Framebuffer(FramebufferObject::default()))
    }

    fn delete_framebuffer(&mut self, framebuffer: NativeHandle) {
        self.enter("delete_framebuffer").delete("delete_framebuffer", framebuffer, ObjectKind::Framebuffer);
    }

    fn framebuffer_texture(&mut self, framebuffer: NativeHandle, attachment: NativeEnum, texture: NativeHandle, level: u32) {
        let mut world = self.enter("framebuffer_texture");
        if !world.check("framebuffer_texture", framebuffer, ObjectKind::Framebuffer)
            || !world.check_or_null("framebuffer_texture", texture, ObjectKind::Texture)
        {
            return;
        }
        if let Some(object) = world.framebuffer_mut(framebuffer) {
            if texture == 0 {
                object.attachments.remove(&attachment);
            } else {
                object.attachments.insert(attachment, Attachment { texture, level, layer: None });
            }
        }
    }

    fn framebuffer_texture_layer(&mut self, framebuffer: NativeHandle, attachment: NativeEnum, texture: NativeHandle, level: u32, layer: u32) {
        let mut world = self.enter("framebuffer_texture_layer");
        if !world.check("framebuffer_texture_layer", framebuffer, ObjectKind::Framebuffer)
            || !world.check_or_null("framebuffer_texture_layer", texture, ObjectKind::Texture)
        {
            return;
        }
        if let Some(object) = world.framebuffer_mut(framebuffer) {
            if texture == 0 {
                object.attachments.remove(&attachment);
            } else {
                object.attachments.insert(attachment, Attachment { texture, level, layer: Some(layer) });
            }
        }
    }

    fn check_framebuffer_status(&mut self, framebuffer: NativeHandle) -> NativeEnum {
        let mut world = self.enter("check_framebuffer_status");
        if framebuffer == 0 {
            return native::FRAMEBUFFER_COMPLETE;
        }
        if !world.check("check_framebuffer_status", framebuffer, ObjectKind::Framebuffer) {
            return crate::world::INCOMPLETE_ATTACHMENT;
        }
        world.framebuffer_status(framebuffer)
    }

    fn bind_framebuffer(&mut self, target: NativeEnum, framebuffer: NativeHandle) {
        let mut world = self.enter("bind_framebuffer");
        let Some(id) = world.context("bind_framebuffer") else {
            return;
        };
        if !world.check_or_null("bind_framebuffer", framebuffer, ObjectKind::Framebuffer) {
            return;
        }
        let state = world.ctx(id);
        match target {
            native::DRAW_FRAMEBUFFER => state.draw_framebuffer = framebuffer,
            native::READ_FRAMEBUFFER => state.read_framebuffer = framebuffer,
            _ => {
                state.draw_framebuffer = framebuffer;
                state.read_framebuffer = framebuffer;
            }
        }
    }

    fn framebuffer_draw_buffers(&mut self, framebuffer: NativeHandle, buffers: &[NativeEnum]) {
        let mut world = self.enter("framebuffer_draw_buffers");
        if buffers.len() > world.caps.max_color_attachments as usize {
            world.error("framebuffer_draw_buffers", format!("{} draw buffers exceed the limit", buffers.len()));
            return;
        }
        if framebuffer == 0 || !world.check("framebuffer_draw_buffers", framebuffer, ObjectKind::Framebuffer) {
            return;
        }
        if let Some(object) = world.framebuffer_mut(framebuffer) {
            object.draw_buffers = buffers.to_vec();
        }
    }

    fn clear_framebuffer_fv(&mut self, framebuffer: NativeHandle, buffer: NativeEnum, draw_buffer: i32, _: [f32; 4]) {
        let mut world = self.enter("clear_framebuffer_fv");
        clear_color(&mut world, "clear_framebuffer_fv", framebuffer, buffer, draw_buffer);
    }

    fn clear_framebuffer_iv(&mut self, framebuffer: NativeHandle, buffer: NativeEnum, draw_buffer: i32, _: [i32; 4]) {
        let mut world = self.enter("clear_framebuffer_iv");
        clear_color(&mut world, "clear_framebuffer_iv", framebuffer, buffer, draw_buffer);
    }

    fn clear_framebuffer_uiv(&mut self, framebuffer: NativeHandle, buffer: NativeEnum, draw_buffer: i32, _: [u32; 4]) {
        let mut world = self.enter("clear_framebuffer_uiv");
        clear_color(&mut world, "clear_framebuffer_uiv", framebuffer, buffer, draw_buffer);
    }

    fn clear_framebuffer_fi(&mut self, framebuffer: NativeHandle, _: f32, _: i32) {
        let mut world = self.enter("clear_framebuffer_fi");
        let Some(id) = world.context("clear_framebuffer_fi") else {
            return;
        };
        if !world.check_or_null("clear_framebuffer_fi", framebuffer, ObjectKind::Framebuffer) {
            return;
        }
        world.commands.push(Command::ClearDepthStencil {
            context: id,
            framebuffer,
            buffer: native::DEPTH_STENCIL,
        });
    }

    fn invalidate_framebuffer(&mut self, framebuffer: NativeHandle, attachments: &[NativeEnum]) {
        let mut world = self.enter("invalidate_framebuffer");
        let Some(id) = world.context("invalidate_framebuffer") else {
            return;
        };
        if !world.check_or_null("invalidate_framebuffer", framebuffer, ObjectKind::Framebuffer) {
            return;
        }
        if framebuffer != 0 {
            let missing: Vec<NativeEnum> = match world.framebuffer_mut(framebuffer) {
                Some(object) => attachments
                    .iter()
                    .copied()
                    .filter(|a| !object.attachments.contains_key(a))
                    .collect(),
                None => Vec::new(),
            };
            if !missing.is_empty() {
                world.error(
                    "invalidate_framebuffer",
                    format!("framebuffer {} has no attachments {:x?}", framebuffer, missing),
                );
            }
        }
        world.commands.push(Command::Invalidate { context: id, framebuffer, attachments: attachments.to_vec() });
    }

    fn blit_framebuffer(&mut self, src: NativeHandle, dst: NativeHandle, _: [i32; 4], _: [i32; 4], mask: u32, filter: NativeEnum) {
        let mut world = self.enter("blit_framebuffer");
        let Some(id) = world.context("blit_framebuffer") else {
            return;
        };
        if !world.check_or_null("blit_framebuffer", src, ObjectKind::Framebuffer)
            || !world.check_or_null("blit_framebuffer", dst, ObjectKind::Framebuffer)
        {
            return;
        }
        if mask & (native::DEPTH_BUFFER_BIT | native::STENCIL_BUFFER_BIT) != 0 && filter != native::NEAREST {
            world.error("blit_framebuffer", "depth/stencil blits require nearest filtering".to_string());
            return;
        }
        world.commands.push(Command::Blit { context: id, src, dst, mask });
    }

    // ===== DRAW / DISPATCH =====

    fn draw_arrays(&mut self, mode: NativeEnum, _: i32, count: i32, instances: i32, _: u32) {
        let mut world = self.enter("draw_arrays");
        world.draw("draw_arrays", Some((mode, count.max(0) as u64)), Some(instances.max(0) as u32), false);
    }

    fn draw_elements(&mut self, mode: NativeEnum, count: i32, _: NativeEnum, _: u64, instances: i32, _: i32, _: u32) {
        let mut world = self.enter("draw_elements");
        world.draw("draw_elements", Some((mode, count.max(0) as u64)), Some(instances.max(0) as u32), true);
    }

    fn multi_draw_arrays_indirect(&mut self, _: NativeEnum, _: u64, _: i32, _: i32) {
        let mut world = self.enter("multi_draw_arrays_indirect");
        if bound_buffer(&mut world, "multi_draw_arrays_indirect", native::DRAW_INDIRECT_BUFFER) == 0 {
            world.error("multi_draw_arrays_indirect", "no indirect buffer bound".to_string());
        }
        world.draw("multi_draw_arrays_indirect", None, None, false);
    }

    fn multi_draw_elements_indirect(&mut self, _: NativeEnum, _: NativeEnum, _: u64, _: i32, _: i32) {
        let mut world = self.enter("multi_draw_elements_indirect");
        if bound_buffer(&mut world, "multi_draw_elements_indirect", native::DRAW_INDIRECT_BUFFER) == 0 {
            world.error("multi_draw_elements_indirect", "no indirect buffer bound".to_string());
        }
        world.draw("multi_draw_elements_indirect", None, None, true);
    }

    fn dispatch_compute(&mut self, x: u32, y: u32, z: u32) {
        let mut world = self.enter("dispatch_compute");
        dispatch(&mut world, "dispatch_compute", Some([x, y, z]));
    }

    fn dispatch_compute_indirect(&mut self, _: u64) {
        let mut world = self.enter("dispatch_compute_indirect");
        if bound_buffer(&mut world, "dispatch_compute_indirect", native::DISPATCH_INDIRECT_BUFFER) == 0 {
            world.error("dispatch_compute_indirect", "no dispatch buffer bound".to_string());
        }
        dispatch(&mut world, "dispatch_compute_indirect", None);
    }

    // ===== QUERIES =====

    fn create_query(&mut self, target: NativeEnum) -> NativeHandle {
        let query = QueryObject { target, start: 0, accumulated: 0, result: None };
        self.enter("create_query").create(ObjectKind::Query, ObjectData::Query(query))
    }

    fn delete_query(&mut self, query: NativeHandle) {
        self.enter("delete_query").delete("delete_query", query, ObjectKind::Query);
    }

    fn begin_query(&mut self, target: NativeEnum, query: NativeHandle) {
        let mut world = self.enter("begin_query");
        let Some(id) = world.context("begin_query") else {
            return;
        };
        if !world.check("begin_query", query, ObjectKind::Query) {
            return;
        }
        if world.ctx(id).active_queries.contains_key(&target) {
            world.error("begin_query", format!("a {:#x} query is already active", target));
            return;
        }
        let clock = world.clock_ns;
        let Some(object) = world.query_mut(query) else {
            return;
        };
        if object.target != target {
            let created = object.target;
            world.error("begin_query", format!("query {} was created for {:#x}", query, created));
            return;
        }
        object.start = clock;
        object.accumulated = 0;
        object.result = None;
        world.ctx(id).active_queries.insert(target, query);
    }

    fn end_query(&mut self, target: NativeEnum) {
        let mut world = self.enter("end_query");
        let Some(id) = world.context("end_query") else {
            return;
        };
        let Some(query) = world.ctx(id).active_queries.remove(&target) else {
            world.error("end_query", format!("no active {:#x} query", target));
            return;
        };
        let clock = world.clock_ns;
        if let Some(object) = world.query_mut(query) {
            object.result = Some(match target {
                native::TIME_ELAPSED => clock - object.start,
                native::ANY_SAMPLES_PASSED | native::ANY_SAMPLES_PASSED_CONSERVATIVE => {
                    u64::from(object.accumulated > 0)
                }
                _ => object.accumulated,
            });
        }
    }

    fn query_counter(&mut self, query: NativeHandle, target: NativeEnum) {
        let mut world = self.enter("query_counter");
        if target != native::TIMESTAMP {
            world.error("query_counter", format!("target {:#x} is not TIMESTAMP", target));
            return;
        }
        if !world.check("query_counter", query, ObjectKind::Query) {
            return;
        }
        let clock = world.clock_ns;
        if let Some(object) = world.query_mut(query) {
            object.result = Some(clock);
        }
    }

    fn get_query_object_u64(&mut self, query: NativeHandle, pname: NativeEnum) -> Option<u64> {
        let mut world = self.enter("get_query_object_u64");
        if !world.check("get_query_object_u64", query, ObjectKind::Query) {
            return Some(0);
        }
        let result = world.query_mut(query).and_then(|q| q.result);
        match pname {
            native::QUERY_RESULT_AVAILABLE => Some(u64::from(result.is_some())),
            native::QUERY_RESULT_NO_WAIT => result,
            _ => {
                if result.is_none() {
                    world.error("get_query_object_u64", format!("query {} never completed", query));
                }
                Some(result.unwrap_or(0))
            }
        }
    }

    fn get_query_buffer_object_u64(&mut self, query: NativeHandle, buffer: NativeHandle, pname: NativeEnum, offset: u64) {
        let mut world = self.enter("get_query_buffer_object_u64");
        if !world.check("get_query_buffer_object_u64", query, ObjectKind::Query)
            || !in_range(&mut world, "get_query_buffer_object_u64", buffer, offset, 8)
        {
            return;
        }
        let result = world.query_mut(query).and_then(|q| q.result);
        let value = match (pname, result) {
            (native::QUERY_RESULT_AVAILABLE, r) => Some(u64::from(r.is_some())),
            (native::QUERY_RESULT_NO_WAIT, None) => None,
            (_, r) => Some(r.unwrap_or(0)),
        };
        if let (Some(value), Some(object)) = (value, world.buffer_mut(buffer)) {
            let start = offset as usize;
            object.bytes[start..start + 8].copy_from_slice(&value.to_le_bytes());
        }
    }

    // ===== TRANSFORM FEEDBACK =====

    fn create_transform_feedback(&mut self) -> NativeHandle {
        self.enter("create_transform_feedback").create(
            ObjectKind::TransformFeedback,
            ObjectData::TransformFeedback(TransformFeedbackObject::default()),
        )
    }

    fn delete_transform_feedback(&mut self, xfb: NativeHandle) {
        let mut world = self.enter("delete_transform_feedback");
        let active = world.contexts.values().any(|c| c.transform_feedback == xfb && c.xfb_active);
        if active {
            world.error("delete_transform_feedback", format!("transform feedback {} is active", xfb));
            return;
        }
        world.delete("delete_transform_feedback", xfb, ObjectKind::TransformFeedback);
    }

    fn transform_feedback_buffer_range(&mut self, xfb: NativeHandle, index: u32, buffer: NativeHandle, offset: u64, size: u64) {
        let mut world = self.enter("transform_feedback_buffer_range");
        if !world.check("transform_feedback_buffer_range", xfb, ObjectKind::TransformFeedback)
            || !in_range(&mut world, "transform_feedback_buffer_range", buffer, offset, size)
        {
            return;
        }
        if let Some(object) = world.xfb_mut(xfb) {
            object.buffers.insert(index, buffer);
        }
    }

    fn bind_transform_feedback(&mut self, xfb: NativeHandle) {
        let mut world = self.enter("bind_transform_feedback");
        let Some(id) = world.context("bind_transform_feedback") else {
            return;
        };
        if world.ctx(id).xfb_active && !world.ctx(id).xfb_paused {
            world.error("bind_transform_feedback", "transform feedback is active".to_string());
            return;
        }
        if world.check_or_null("bind_transform_feedback", xfb, ObjectKind::TransformFeedback) {
            world.ctx(id).transform_feedback = xfb;
        }
    }

    fn begin_transform_feedback(&mut self, _: NativeEnum) {
        let mut world = self.enter("begin_transform_feedback");
        let Some(id) = world.context("begin_transform_feedback") else {
            return;
        };
        let (bound, active) = {
            let state = world.ctx(id);
            (state.transform_feedback, state.xfb_active)
        };
        if active {
            world.error("begin_transform_feedback", "already active".to_string());
            return;
        }
        if world.xfb_mut(bound).map_or(true, |x| x.buffers.is_empty()) {
            world.error("begin_transform_feedback", format!("object {} has no capture buffers", bound));
        }
        let state = world.ctx(id);
        state.xfb_active = true;
        state.xfb_paused = false;
        state.xfb_vertices = 0;
    }

    fn pause_transform_feedback(&mut self) {
        let mut world = self.enter("pause_transform_feedback");
        let Some(id) = world.context("pause_transform_feedback") else {
            return;
        };
        let state = world.ctx(id);
        if !state.xfb_active || state.xfb_paused {
            world.error("pause_transform_feedback", "not active or already paused".to_string());
            return;
        }
        world.ctx(id).xfb_paused = true;
    }

    fn resume_transform_feedback(&mut self) {
        let mut world = self.enter("resume_transform_feedback");
        let Some(id) = world.context("resume_transform_feedback") else {
            return;
        };
        let state = world.ctx(id);
        if !state.xfb_active || !state.xfb_paused {
            world.error("resume_transform_feedback", "not paused".to_string());
            return;
        }
        world.ctx(id).xfb_paused = false;
    }

    fn end_transform_feedback(&mut self) {
        let mut world = self.enter("end_transform_feedback");
        let Some(id) = world.context("end_transform_feedback") else {
            return;
        };
        let (bound, active, vertices) = {
            let state = world.ctx(id);
            (state.transform_feedback, state.xfb_active, state.xfb_vertices)
        };
        if !active {
            world.error("end_transform_feedback", "not active".to_string());
            return;
        }
        let state = world.ctx(id);
        state.xfb_active = false;
        state.xfb_paused = false;
        if let Some(object) = world.xfb_mut(bound) {
            object.captured_vertices = Some(vertices);
        }
    }

    fn draw_transform_feedback(&mut self, mode: NativeEnum, xfb: NativeHandle, instances: i32) {
        let mut world = self.enter("draw_transform_feedback");
        if !world.check("draw_transform_feedback", xfb, ObjectKind::TransformFeedback) {
            return;
        }
        let Some(captured) = world.xfb_mut(xfb).and_then(|x| x.captured_vertices) else {
            world.error("draw_transform_feedback", format!("object {} never completed a capture", xfb));
            return;
        };
        world.draw("draw_transform_feedback", Some((mode, captured)), Some(instances.max(0) as u32), false);
    }

    // ===== SYNC =====

    fn fence_sync(&mut self) -> NativeHandle {
        let mut world = self.enter("fence_sync");
        world.context("fence_sync");
        world.create(ObjectKind::Sync, ObjectData::Plain)
    }

    fn client_wait_sync(&mut self, sync: NativeHandle, _: bool, _: u64) -> NativeEnum {
        let mut world = self.enter("client_wait_sync");
        // Work completes at submission
        if world.check("client_wait_sync", sync, ObjectKind::Sync) {
            native::ALREADY_SIGNALED
        } else {
            native::WAIT_FAILED
        }
    }

    fn wait_sync(&mut self, sync: NativeHandle) {
        let mut world = self.enter("wait_sync");
        world.check("wait_sync", sync, ObjectKind::Sync);
    }

    fn delete_sync(&mut self, sync: NativeHandle) {
        self.enter("delete_sync").delete("delete_sync", sync, ObjectKind::Sync);
    }

    fn memory_barrier(&mut self, bits: u32) {
        let mut world = self.enter("memory_barrier");
        if bits == 0 {
            world.error("memory_barrier", "empty barrier".to_string());
        }
    }

    fn texture_barrier(&mut self) {
        self.context_command("texture_barrier");
    }

    fn flush(&mut self) {
        self.context_command("flush");
    }

    fn finish(&mut self) {
        self.context_command("finish");
    }
}

fn stage_bit(stage: NativeEnum) -> u32 {
    match stage {
        native::VERTEX_SHADER => native::VERTEX_SHADER_BIT,
        native::FRAGMENT_SHADER => native::FRAGMENT_SHADER_BIT,
        native::GEOMETRY_SHADER => native::GEOMETRY_SHADER_BIT,
        native::TESS_CONTROL_SHADER => native::TESS_CONTROL_SHADER_BIT,
        native::TESS_EVALUATION_SHADER => native::TESS_EVALUATION_SHADER_BIT,
        native::COMPUTE_SHADER => native::COMPUTE_SHADER_BIT,
        _ => 0,
    }
}

fn clear_color(world: &mut World, call: &'static str, framebuffer: NativeHandle, buffer: NativeEnum, draw_buffer: i32) {
    let Some(id) = world.context(call) else {
        return;
    };
    if !world.check_or_null(call, framebuffer, ObjectKind::Framebuffer) {
        return;
    }
    match buffer {
        native::COLOR => {}
        native::DEPTH | native::STENCIL => {
            if draw_buffer != 0 {
                world.error(call, format!("draw buffer {} must be 0 for {:#x}", draw_buffer, buffer));
                return;
            }
            world.commands.push(Command::ClearDepthStencil { context: id, framebuffer, buffer });
            return;
        }
        _ => {
            world.error(call, format!("buffer {:#x} cannot be cleared", buffer));
            return;
        }
    }
    let draw_buffers = if framebuffer == 0 {
        1
    } else {
        world.framebuffer_mut(framebuffer).map(|f| f.draw_buffers.len()).unwrap_or(0)
    };
    if draw_buffer < 0 || draw_buffer as usize >= draw_buffers {
        world.error(call, format!("draw buffer {} not enabled on framebuffer {}", draw_buffer, framebuffer));
        return;
    }
    world.commands.push(Command::ClearColor { context: id, framebuffer, draw_buffer });
}

fn dispatch(world: &mut World, call: &'static str, groups: Option<[u32; 3]>) {
    let Some(id) = world.context(call) else {
        return;
    };
    let program_pipeline = world.ctx(id).program_pipeline;
    if program_pipeline == 0 {
        world.error(call, "no program pipeline bound".to_string());
    }
    world.commands.push(Command::Dispatch { context: id, program_pipeline, groups });
}

#[cfg(test)]
#[path = "headless_driver_tests.rs"]
mod tests;

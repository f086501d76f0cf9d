//! The command context.
//!
//! An `ImmediateContext` records nothing: every command goes straight to the
//! driver. What it adds is a mirror of the native state (`BindingState`) so
//! that bind calls only emit the driver calls whose values actually change,
//! and deferred vertex/resource binding so draws rebind only stale slots.

use std::sync::Arc;
use smallvec::SmallVec;
use crate::device::{CoordinateConvention, DeviceShared};
use crate::driver::{native, ContextId, Driver, NativeHandle, SurfaceInfo};
use crate::pipeline::{AttachedBuffer, BufferBindingType, IndexType, Pipeline};
use crate::render_pass::FramebufferCache;
use crate::resource::Buffer;
use crate::resource_table::ResourceTable;
use crate::state_tables;
use super::binding_state::{AppliedBuffer, BindingState, MAX_VIEWPORTS};
use super::pass::ActivePass;
use super::scope::ContextScope;
use super::stats::ContextStats;
use super::sync::ActiveTransformFeedback;

/// Viewport rectangle plus depth range, in the device's coordinate convention
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height, min_depth: 0.0, max_depth: 1.0 }
    }
}

/// Integer rectangle (scissors, render areas), in the device's coordinate convention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Rectangle at the origin
    pub fn sized(width: u32, height: u32) -> Self {
        Self { x: 0, y: 0, width, height }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct VertexBufferBinding {
    pub uid: u64,
    pub handle: NativeHandle,
    pub offset: u64,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct IndexBufferBinding {
    pub uid: u64,
    pub handle: NativeHandle,
    pub offset: u64,
    pub index_type: IndexType,
}

/// Explicit command context bound to one native context and window surface
pub struct ImmediateContext {
    pub(crate) id: ContextId,
    pub(crate) is_main: bool,
    pub(crate) surface: SurfaceInfo,
    pub(crate) device: Arc<DeviceShared>,
    pub(crate) state: BindingState,
    pub(crate) pipeline: Option<Arc<Pipeline>>,
    pub(crate) vertex_buffers: [VertexBufferBinding; crate::pipeline::MAX_VERTEX_BUFFERS],
    pub(crate) index_buffer: Option<IndexBufferBinding>,
    root_table: ResourceTable,
    user_table: Option<ResourceTable>,
    pub(crate) framebuffers: FramebufferCache,
    pub(crate) pass: Option<ActivePass>,
    /// VAO used by pipelines without a vertex layout, with its index buffer uid
    empty_vao: Option<(NativeHandle, u64)>,
    pub(crate) active_queries: SmallVec<[(crate::driver::NativeEnum, NativeHandle); 4]>,
    pub(crate) transform_feedback: Option<ActiveTransformFeedback>,
    pub(crate) stats: ContextStats,
}

impl ImmediateContext {
    pub(crate) fn new(device: Arc<DeviceShared>, id: ContextId, is_main: bool, surface: SurfaceInfo) -> Self {
        Self {
            id,
            is_main,
            surface,
            device,
            state: BindingState::default(),
            pipeline: None,
            vertex_buffers: [VertexBufferBinding::default(); crate::pipeline::MAX_VERTEX_BUFFERS],
            index_buffer: None,
            root_table: ResourceTable::new(),
            user_table: None,
            framebuffers: FramebufferCache::new(),
            pass: None,
            empty_vao: None,
            active_queries: SmallVec::new(),
            transform_feedback: None,
            stats: ContextStats::default(),
        }
    }

    /// Run `f` with the driver locked; the context must be current
    pub(crate) fn with_gl<R>(&mut self, f: impl FnOnce(&mut Self, &mut dyn Driver) -> R) -> R {
        let driver = Arc::clone(&self.device.driver);
        let mut gl = driver.lock();
        debug_assert_eq!(
            gl.current_context(),
            Some(self.id),
            "context {:?} used while not current",
            self.id
        );
        f(self, &mut **gl)
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    /// Whether this is the device's first (main) context
    pub fn is_main(&self) -> bool {
        self.is_main
    }

    pub fn surface(&self) -> SurfaceInfo {
        self.surface
    }

    /// Track a window resize; the default framebuffer follows on the next pass
    pub fn resize_surface(&mut self, width: u32, height: u32) {
        self.surface = SurfaceInfo { width, height };
    }

    pub fn coordinate_convention(&self) -> CoordinateConvention {
        self.device.config.coordinate_convention
    }

    /// Make this context current until the returned scope is dropped
    pub fn activate(&self) -> ContextScope {
        ContextScope::enter(&self.device.driver, self.id)
    }

    pub fn stats(&self) -> &ContextStats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }

    /// Number of framebuffer objects cached by this context
    pub fn cached_framebuffer_count(&self) -> usize {
        self.framebuffers.len()
    }

    // ===== PIPELINE =====

    /// Bind `pipeline`, emitting driver calls only for state that differs
    pub fn bind_pipeline(&mut self, pipeline: &Arc<Pipeline>) {
        if self.state.pipeline_uid == pipeline.uid() {
            return;
        }

        self.with_gl(|ctx, gl| {
            let program = pipeline.program_pipeline(gl, ctx.id, ctx.is_main);
            if program != ctx.state.program_pipeline {
                gl.bind_program_pipeline(program);
                ctx.state.program_pipeline = program;
            }
            if pipeline.is_compute() {
                return;
            }

            let targets = ctx.device.caps.max_color_attachments as usize;
            let transitions = [
                ctx.state.apply_blend(gl, pipeline.blend_state(), targets),
                ctx.state.apply_rasterizer(gl, pipeline.rasterizer_state()),
                ctx.state.apply_depth_stencil(gl, pipeline.depth_stencil_state()),
            ];
            ctx.stats.state_transitions += transitions.iter().filter(|&&t| t).count() as u64;

            if pipeline.primitive_restart() != ctx.state.primitive_restart {
                if pipeline.primitive_restart() {
                    gl.enable(native::PRIMITIVE_RESTART_FIXED_INDEX);
                } else {
                    gl.disable(native::PRIMITIVE_RESTART_FIXED_INDEX);
                }
                ctx.state.primitive_restart = pipeline.primitive_restart();
            }
            if pipeline.topology() == native::PATCHES && pipeline.patch_control_points() != ctx.state.patch_vertices {
                gl.patch_vertices(pipeline.patch_control_points());
                ctx.state.patch_vertices = pipeline.patch_control_points();
            }
        });

        crate::rhi_trace!("hearth::ImmediateContext", "Bound pipeline {}", pipeline.uid());
        self.state.pipeline_uid = pipeline.uid();
        self.pipeline = Some(Arc::clone(pipeline));
        self.stats.pipeline_binds += 1;
    }

    pub fn bound_pipeline(&self) -> Option<&Arc<Pipeline>> {
        self.pipeline.as_ref()
    }

    // ===== VERTEX INPUT =====

    /// Record a vertex buffer for `slot`; attached to the VAO at the next draw
    pub fn bind_vertex_buffer(&mut self, slot: u32, buffer: &Buffer, offset: u64) {
        debug_assert!((slot as usize) < crate::pipeline::MAX_VERTEX_BUFFERS, "vertex buffer slot {} out of range", slot);
        self.vertex_buffers[slot as usize] = VertexBufferBinding {
            uid: buffer.uid(),
            handle: buffer.handle(),
            offset,
        };
    }

    pub fn bind_vertex_buffers(&mut self, first: u32, buffers: &[(&Buffer, u64)]) {
        for (i, (buffer, offset)) in buffers.iter().enumerate() {
            self.bind_vertex_buffer(first + i as u32, buffer, *offset);
        }
    }

    pub fn bind_index_buffer(&mut self, buffer: &Buffer, offset: u64, index_type: IndexType) {
        self.index_buffer = Some(IndexBufferBinding {
            uid: buffer.uid(),
            handle: buffer.handle(),
            offset,
            index_type,
        });
    }

    // ===== RESOURCE TABLES =====

    /// Table read by the next draw or dispatch
    pub fn resource_table(&self) -> &ResourceTable {
        self.user_table.as_ref().unwrap_or(&self.root_table)
    }

    pub fn resource_table_mut(&mut self) -> &mut ResourceTable {
        self.user_table.as_mut().unwrap_or(&mut self.root_table)
    }

    /// Swap in a user table; returns the previously bound user table
    pub fn bind_resource_table(&mut self, table: ResourceTable) -> Option<ResourceTable> {
        self.user_table.replace(table)
    }

    /// Fall back to the context's root table
    pub fn unbind_resource_table(&mut self) -> Option<ResourceTable> {
        self.user_table.take()
    }

    // ===== DYNAMIC STATE =====

    pub fn set_blend_constants(&mut self, rgba: [f32; 4]) {
        self.with_gl(|ctx, gl| ctx.state.set_blend_constants(gl, rgba));
    }

    pub fn set_stencil_reference(&mut self, reference: u32) {
        self.with_gl(|ctx, gl| ctx.state.set_stencil_reference(gl, reference));
    }

    /// Height Y coordinates are flipped against
    pub(crate) fn target_height(&self) -> u32 {
        self.pass
            .as_ref()
            .map_or(self.surface.height, |pass| pass.framebuffer.height())
    }

    fn flip_y(&self, y: f32, height: f32) -> f32 {
        match self.coordinate_convention() {
            CoordinateConvention::UpperLeft => self.target_height() as f32 - (y + height),
            CoordinateConvention::LowerLeft => y,
        }
    }

    pub(crate) fn native_rect(&self, rect: Rect) -> [i32; 4] {
        let y = match self.coordinate_convention() {
            CoordinateConvention::UpperLeft => self.target_height() as i32 - (rect.y + rect.height as i32),
            CoordinateConvention::LowerLeft => rect.y,
        };
        [rect.x, y, rect.width as i32, rect.height as i32]
    }

    fn viewport_limit(&self) -> usize {
        MAX_VIEWPORTS.min(self.device.caps.max_viewports as usize)
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.set_viewports(0, &[viewport]);
    }

    pub fn set_viewport_indexed(&mut self, index: u32, viewport: Viewport) {
        self.set_viewports(index, &[viewport]);
    }

    pub fn set_viewports(&mut self, first: u32, viewports: &[Viewport]) {
        let first = first as usize;
        debug_assert!(first + viewports.len() <= self.viewport_limit(), "viewport range out of bounds");
        if first + viewports.len() > self.viewport_limit() {
            crate::rhi_error!("hearth::ImmediateContext", "Viewports {}..{} exceed the limit", first, first + viewports.len());
            return;
        }
        let rects: SmallVec<[[f32; 4]; MAX_VIEWPORTS]> = viewports
            .iter()
            .map(|v| [v.x, self.flip_y(v.y, v.height), v.width, v.height])
            .collect();
        let ranges: SmallVec<[[f64; 2]; MAX_VIEWPORTS]> = viewports
            .iter()
            .map(|v| [f64::from(v.min_depth), f64::from(v.max_depth)])
            .collect();
        self.with_gl(|ctx, gl| {
            ctx.state.set_viewports(gl, first, &rects);
            ctx.state.set_depth_ranges(gl, first, &ranges);
        });
    }

    pub fn set_scissor(&mut self, rect: Rect) {
        self.set_scissors(0, &[rect]);
    }

    pub fn set_scissor_indexed(&mut self, index: u32, rect: Rect) {
        self.set_scissors(index, &[rect]);
    }

    pub fn set_scissors(&mut self, first: u32, rects: &[Rect]) {
        let first = first as usize;
        debug_assert!(first + rects.len() <= self.viewport_limit(), "scissor range out of bounds");
        if first + rects.len() > self.viewport_limit() {
            crate::rhi_error!("hearth::ImmediateContext", "Scissors {}..{} exceed the limit", first, first + rects.len());
            return;
        }
        let native: SmallVec<[[i32; 4]; MAX_VIEWPORTS]> = rects.iter().map(|r| self.native_rect(*r)).collect();
        self.with_gl(|ctx, gl| ctx.state.set_scissors(gl, first, &native));
    }

    // ===== DRAW / DISPATCH =====

    fn graphics_pipeline(&self, command: &str) -> Option<Arc<Pipeline>> {
        let pipeline = self.pipeline.clone().filter(|p| !p.is_compute());
        debug_assert!(pipeline.is_some(), "{} without a bound graphics pipeline", command);
        if pipeline.is_none() {
            crate::rhi_error!("hearth::ImmediateContext", "{} without a bound graphics pipeline", command);
        }
        pipeline
    }

    fn compute_pipeline(&self, command: &str) -> Option<Arc<Pipeline>> {
        let pipeline = self.pipeline.clone().filter(|p| p.is_compute());
        debug_assert!(pipeline.is_some(), "{} without a bound compute pipeline", command);
        if pipeline.is_none() {
            crate::rhi_error!("hearth::ImmediateContext", "{} without a bound compute pipeline", command);
        }
        pipeline
    }

    /// Non-indexed draw; a zero vertex or instance count does nothing
    pub fn draw(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32) {
        if vertex_count == 0 || instance_count == 0 {
            return;
        }
        let Some(pipeline) = self.graphics_pipeline("draw") else {
            return;
        };
        self.with_gl(|ctx, gl| {
            ctx.update_vertex_buffers(gl, &pipeline);
            ctx.update_shader_bindings(gl, &pipeline);
            gl.draw_arrays(
                pipeline.topology(),
                first_vertex as i32,
                vertex_count as i32,
                instance_count as i32,
                first_instance,
            );
        });
        self.stats.draw_calls += 1;
    }

    /// Indexed draw; a zero index or instance count does nothing
    pub fn draw_indexed(&mut self, index_count: u32, instance_count: u32, first_index: u32, base_vertex: i32, first_instance: u32) {
        if index_count == 0 || instance_count == 0 {
            return;
        }
        let Some(pipeline) = self.graphics_pipeline("draw_indexed") else {
            return;
        };
        let Some(index) = self.index_buffer else {
            debug_assert!(false, "draw_indexed without an index buffer");
            crate::rhi_error!("hearth::ImmediateContext", "draw_indexed without an index buffer");
            return;
        };
        self.with_gl(|ctx, gl| {
            ctx.update_vertex_and_index_buffers(gl, &pipeline);
            ctx.update_shader_bindings(gl, &pipeline);
            gl.draw_elements(
                pipeline.topology(),
                index_count as i32,
                state_tables::index_type(index.index_type),
                index.offset + u64::from(first_index) * index.index_type.size(),
                instance_count as i32,
                base_vertex,
                first_instance,
            );
        });
        self.stats.draw_calls += 1;
    }

    /// `draw_count` draws whose parameters are read from `buffer`
    /// (`DrawIndirectCommand` records, `stride` 0 = tightly packed)
    pub fn draw_indirect(&mut self, buffer: &Buffer, offset: u64, draw_count: u32, stride: u32) {
        if draw_count == 0 {
            return;
        }
        let Some(pipeline) = self.graphics_pipeline("draw_indirect") else {
            return;
        };
        self.with_gl(|ctx, gl| {
            ctx.update_vertex_buffers(gl, &pipeline);
            ctx.update_shader_bindings(gl, &pipeline);
            ctx.bind_indirect_buffer(gl, buffer.handle());
            gl.multi_draw_arrays_indirect(pipeline.topology(), offset, draw_count as i32, stride as i32);
        });
        self.stats.draw_calls += 1;
    }

    /// Indexed variant of [`draw_indirect`](Self::draw_indirect) (`DrawIndexedIndirectCommand` records)
    pub fn draw_indexed_indirect(&mut self, buffer: &Buffer, offset: u64, draw_count: u32, stride: u32) {
        if draw_count == 0 {
            return;
        }
        let Some(pipeline) = self.graphics_pipeline("draw_indexed_indirect") else {
            return;
        };
        let Some(index) = self.index_buffer else {
            debug_assert!(false, "draw_indexed_indirect without an index buffer");
            crate::rhi_error!("hearth::ImmediateContext", "draw_indexed_indirect without an index buffer");
            return;
        };
        self.with_gl(|ctx, gl| {
            ctx.update_vertex_and_index_buffers(gl, &pipeline);
            ctx.update_shader_bindings(gl, &pipeline);
            ctx.bind_indirect_buffer(gl, buffer.handle());
            gl.multi_draw_elements_indirect(
                pipeline.topology(),
                state_tables::index_type(index.index_type),
                offset,
                draw_count as i32,
                stride as i32,
            );
        });
        self.stats.draw_calls += 1;
    }

    pub fn dispatch(&mut self, x: u32, y: u32, z: u32) {
        if x == 0 || y == 0 || z == 0 {
            return;
        }
        let Some(pipeline) = self.compute_pipeline("dispatch") else {
            return;
        };
        self.with_gl(|ctx, gl| {
            ctx.update_shader_bindings(gl, &pipeline);
            gl.dispatch_compute(x, y, z);
        });
        self.stats.dispatches += 1;
    }

    /// Dispatch with group counts read from `buffer` (`DispatchIndirectCommand`)
    pub fn dispatch_indirect(&mut self, buffer: &Buffer, offset: u64) {
        let Some(pipeline) = self.compute_pipeline("dispatch_indirect") else {
            return;
        };
        self.with_gl(|ctx, gl| {
            ctx.update_shader_bindings(gl, &pipeline);
            if ctx.state.dispatch_indirect_buffer != buffer.handle() {
                gl.bind_buffer(native::DISPATCH_INDIRECT_BUFFER, buffer.handle());
                ctx.state.dispatch_indirect_buffer = buffer.handle();
            }
            gl.dispatch_compute_indirect(offset);
        });
        self.stats.dispatches += 1;
    }

    fn bind_indirect_buffer(&mut self, gl: &mut dyn Driver, handle: NativeHandle) {
        if self.state.indirect_buffer != handle {
            gl.bind_buffer(native::DRAW_INDIRECT_BUFFER, handle);
            self.state.indirect_buffer = handle;
        }
    }

    // ===== DEFERRED BINDING =====

    /// Bind the pipeline's VAO and attach the vertex buffers that changed
    pub(crate) fn update_vertex_buffers(&mut self, gl: &mut dyn Driver, pipeline: &Pipeline) {
        self.update_vertex_input(gl, pipeline, false);
    }

    /// [`update_vertex_buffers`](Self::update_vertex_buffers) plus the index buffer
    pub(crate) fn update_vertex_and_index_buffers(&mut self, gl: &mut dyn Driver, pipeline: &Pipeline) {
        self.update_vertex_input(gl, pipeline, true);
    }

    fn update_vertex_input(&mut self, gl: &mut dyn Driver, pipeline: &Pipeline, indexed: bool) {
        let index = self.index_buffer.filter(|_| indexed);

        let Some(layout) = pipeline.vertex_layout() else {
            let (vao, index_uid) = match self.empty_vao {
                Some(empty) => empty,
                None => (gl.create_vertex_array(), 0),
            };
            self.state.bind_vertex_array(gl, vao);
            let mut index_uid = index_uid;
            if let Some(index) = index {
                if index.uid != index_uid {
                    gl.vertex_array_element_buffer(vao, index.handle);
                    index_uid = index.uid;
                    self.stats.vertex_buffer_rebinds += 1;
                }
            }
            self.empty_vao = Some((vao, index_uid));
            return;
        };

        let validate = self.device.config.validation;
        let bindings = &self.vertex_buffers;
        let state = &mut self.state;
        let stats = &mut self.stats;
        layout.with_vao(gl, self.id, self.is_main, |gl, vao| {
            state.bind_vertex_array(gl, vao.handle);
            for buffer in &layout.desc().buffers {
                let slot = buffer.binding as usize;
                let wanted = bindings[slot];
                if validate && wanted.uid == 0 {
                    crate::rhi_warn!("hearth::ImmediateContext", "Vertex buffer slot {} is not bound", slot);
                }
                let attached = AttachedBuffer { uid: wanted.uid, offset: wanted.offset };
                if vao.vertex_buffers[slot] != attached {
                    gl.vertex_array_vertex_buffer(vao.handle, buffer.binding, wanted.handle, wanted.offset, buffer.stride);
                    vao.vertex_buffers[slot] = attached;
                    stats.vertex_buffer_rebinds += 1;
                }
            }
            if let Some(index) = index {
                if vao.index_buffer_uid != index.uid {
                    gl.vertex_array_element_buffer(vao.handle, index.handle);
                    vao.index_buffer_uid = index.uid;
                    stats.vertex_buffer_rebinds += 1;
                }
            }
        });
    }

    /// Rebind the texture, image and buffer slots whose contents changed
    pub(crate) fn update_shader_bindings(&mut self, gl: &mut dyn Driver, pipeline: &Pipeline) {
        let table = self.user_table.as_ref().unwrap_or(&self.root_table);
        let key = (table.uid(), table.version(), pipeline.uid());
        if self.state.applied_table == Some(key) {
            return;
        }

        let caps = &self.device.caps;
        let mut rebinds = 0;

        for (unit, slot) in table.textures().iter().enumerate().take(caps.max_texture_units as usize) {
            let sampler = if slot.sampler != 0 {
                slot.sampler
            } else {
                pipeline.sampler(unit).map_or(0, |s| s.handle())
            };
            let applied = &mut self.state.textures[unit];
            if applied.uid != slot.uid || applied.handle != slot.handle {
                gl.bind_texture_unit(unit as u32, slot.handle);
                applied.uid = slot.uid;
                applied.handle = slot.handle;
                rebinds += 1;
            }
            if applied.sampler != sampler {
                gl.bind_sampler(unit as u32, sampler);
                applied.sampler = sampler;
                rebinds += 1;
            }
        }

        for (unit, slot) in table.images().iter().enumerate().take(caps.max_image_units as usize) {
            let applied = &mut self.state.images[unit];
            if *applied == *slot {
                continue;
            }
            let format = if slot.uid == 0 { native::R8 } else { slot.format };
            gl.bind_image_texture(
                unit as u32,
                slot.handle,
                slot.level,
                slot.layer.is_none(),
                slot.layer.unwrap_or(0),
                state_tables::image_access(slot.access),
                format,
            );
            *applied = *slot;
            rebinds += 1;
        }

        for (index, slot) in table.buffers().iter().enumerate() {
            let target = match pipeline.buffer_type(index) {
                BufferBindingType::Uniform => native::UNIFORM_BUFFER,
                BufferBindingType::Storage => native::SHADER_STORAGE_BUFFER,
            };
            let applied = &mut self.state.buffers[index];
            let wanted = AppliedBuffer { slot: *slot, target };
            if *applied == wanted || (slot.uid == 0 && applied.slot.uid == 0) {
                continue;
            }
            gl.bind_buffer_range(target, index as u32, slot.handle, slot.offset, slot.size);
            *applied = wanted;
            rebinds += 1;
        }

        self.state.applied_table = Some(key);
        self.stats.shader_binding_rebinds += rebinds;
    }
}

impl Drop for ImmediateContext {
    fn drop(&mut self) {
        let driver = Arc::clone(&self.device.driver);
        let mut gl = driver.lock();
        let previous = gl.current_context();
        if previous != Some(self.id) && !gl.make_current(Some(self.id)) {
            crate::rhi_warn!("hearth::ImmediateContext", "Context {:?} lost before teardown", self.id);
        }

        self.device.destroy_context_objects(&mut **gl, self.id);
        self.framebuffers.destroy_all(&mut **gl);
        if let Some((vao, _)) = self.empty_vao.take() {
            gl.delete_vertex_array(vao);
        }
        driver.flush_context_releases(&mut **gl, self.id);

        let restore = previous.filter(|&p| p != self.id);
        gl.make_current(restore);
        gl.destroy_context(self.id);
        drop(gl);

        self.device.unregister_context(self.id);
        crate::rhi_debug!("hearth::ImmediateContext", "Context {:?} destroyed", self.id);
    }
}

impl std::fmt::Debug for ImmediateContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImmediateContext")
            .field("id", &self.id)
            .field("is_main", &self.is_main)
            .field("surface", &self.surface)
            .field("in_render_pass", &self.pass.is_some())
            .finish()
    }
}

#[cfg(test)]
#[path = "immediate_context_tests.rs"]
mod tests;

//! Mirror of the native state last applied by a context.
//!
//! Every field starts at the driver's documented default, so the first
//! transition only touches what actually differs from a fresh context. The
//! mirror is only ever used for diffing; it owns nothing.

use smallvec::SmallVec;
use crate::driver::{native, Driver, NativeEnum, NativeHandle};
use crate::pipeline::{
    BlendState, BlendStateDesc, CompareOp, CullMode, DepthBias, DepthStencilState, FrontFace,
    PolygonMode, RasterizerState, RenderTargetBlend, StencilFaceState, MAX_COLOR_ATTACHMENTS,
};
use crate::resource_table::{BufferSlot, ImageSlot, MAX_BUFFER_SLOTS, MAX_IMAGE_SLOTS, MAX_TEXTURE_SLOTS};
use crate::state_tables;

/// Viewport array size tracked by the mirror
pub const MAX_VIEWPORTS: usize = 16;

/// Texture unit as last applied
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct AppliedTexture {
    pub uid: u64,
    pub handle: NativeHandle,
    pub sampler: NativeHandle,
}

/// Indexed buffer binding as last applied
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct AppliedBuffer {
    pub slot: BufferSlot,
    pub target: NativeEnum,
}

/// Pixel store parameters of one transfer direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PixelStore {
    pub alignment: u32,
    pub row_length: u32,
    pub image_height: u32,
    /// Pixel pack/unpack buffer bound for this direction
    pub buffer: NativeHandle,
}

impl Default for PixelStore {
    fn default() -> Self {
        Self { alignment: 4, row_length: 0, image_height: 0, buffer: 0 }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct BindingState {
    // ----- pipeline -----
    pub pipeline_uid: u64,
    pub program_pipeline: NativeHandle,
    pub blend_id: u64,
    pub rasterizer_id: u64,
    pub depth_stencil_id: u64,

    // ----- blend -----
    pub blend_targets: [RenderTargetBlend; MAX_COLOR_ATTACHMENTS],
    pub alpha_to_coverage: bool,
    pub blend_constants: [f32; 4],

    // ----- rasterizer -----
    pub cull_enabled: bool,
    pub cull_face: NativeEnum,
    pub front_face: FrontFace,
    pub polygon_mode: PolygonMode,
    /// Polygon offset capability currently enabled, if any
    pub polygon_offset_cap: Option<NativeEnum>,
    pub depth_bias: DepthBias,
    pub depth_clamp: bool,
    pub scissor_test: bool,
    pub rasterizer_discard: bool,

    // ----- depth / stencil -----
    pub depth_test: bool,
    pub depth_write: bool,
    pub depth_compare: CompareOp,
    pub stencil_test: bool,
    pub stencil_front: StencilFaceState,
    pub stencil_back: StencilFaceState,
    /// Masks are tracked over the 8 stencil bits every format here carries
    pub stencil_read_mask: u32,
    pub stencil_write_mask: u32,
    pub stencil_reference: u32,

    // ----- input assembly -----
    pub patch_vertices: u32,
    pub primitive_restart: bool,
    pub vertex_array: NativeHandle,
    pub indirect_buffer: NativeHandle,
    pub dispatch_indirect_buffer: NativeHandle,

    // ----- output -----
    pub draw_framebuffer: NativeHandle,
    /// Draw buffer list last set, tagged with the framebuffer uid it belongs to
    pub draw_buffers: Option<(u64, SmallVec<[NativeEnum; MAX_COLOR_ATTACHMENTS]>)>,
    /// `None` until first set: the initial values depend on the surface
    pub viewports: [Option<[f32; 4]>; MAX_VIEWPORTS],
    pub depth_ranges: [[f64; 2]; MAX_VIEWPORTS],
    pub scissors: [Option<[i32; 4]>; MAX_VIEWPORTS],

    // ----- shader resources -----
    pub textures: [AppliedTexture; MAX_TEXTURE_SLOTS],
    pub images: [ImageSlot; MAX_IMAGE_SLOTS],
    pub buffers: [AppliedBuffer; MAX_BUFFER_SLOTS],
    /// (resource table uid, version, pipeline uid) last fully applied
    pub applied_table: Option<(u64, u64, u64)>,

    // ----- transfers -----
    pub unpack: PixelStore,
    pub pack: PixelStore,
    pub transform_feedback: NativeHandle,
}

impl Default for BindingState {
    fn default() -> Self {
        Self {
            pipeline_uid: 0,
            program_pipeline: 0,
            blend_id: 0,
            rasterizer_id: 0,
            depth_stencil_id: 0,
            blend_targets: [RenderTargetBlend::default(); MAX_COLOR_ATTACHMENTS],
            alpha_to_coverage: false,
            blend_constants: [0.0; 4],
            cull_enabled: false,
            cull_face: native::BACK,
            front_face: FrontFace::CounterClockwise,
            polygon_mode: PolygonMode::Fill,
            polygon_offset_cap: None,
            depth_bias: DepthBias::default(),
            depth_clamp: false,
            scissor_test: false,
            rasterizer_discard: false,
            depth_test: false,
            depth_write: true,
            depth_compare: CompareOp::Less,
            stencil_test: false,
            stencil_front: StencilFaceState::default(),
            stencil_back: StencilFaceState::default(),
            stencil_read_mask: 0xFF,
            stencil_write_mask: 0xFF,
            stencil_reference: 0,
            patch_vertices: 3,
            primitive_restart: false,
            vertex_array: 0,
            indirect_buffer: 0,
            dispatch_indirect_buffer: 0,
            draw_framebuffer: 0,
            draw_buffers: None,
            viewports: [None; MAX_VIEWPORTS],
            depth_ranges: [[0.0, 1.0]; MAX_VIEWPORTS],
            scissors: [None; MAX_VIEWPORTS],
            textures: [AppliedTexture::default(); MAX_TEXTURE_SLOTS],
            images: [ImageSlot::default(); MAX_IMAGE_SLOTS],
            buffers: [AppliedBuffer::default(); MAX_BUFFER_SLOTS],
            applied_table: None,
            unpack: PixelStore::default(),
            pack: PixelStore::default(),
            transform_feedback: 0,
        }
    }
}

fn toggle(gl: &mut dyn Driver, cap: NativeEnum, on: bool) {
    if on {
        gl.enable(cap);
    } else {
        gl.disable(cap);
    }
}

impl BindingState {
    /// Transition to `state`; false when it already was the current one
    pub fn apply_blend(&mut self, gl: &mut dyn Driver, state: &BlendState, color_targets: usize) -> bool {
        if self.blend_id == state.id() {
            return false;
        }
        let desc: &BlendStateDesc = state.desc();
        if desc.alpha_to_coverage != self.alpha_to_coverage {
            toggle(gl, native::SAMPLE_ALPHA_TO_COVERAGE, desc.alpha_to_coverage);
            self.alpha_to_coverage = desc.alpha_to_coverage;
        }

        for index in 0..color_targets.min(MAX_COLOR_ATTACHMENTS) {
            let wanted = *desc.target(index);
            let current = &mut self.blend_targets[index];
            let buffer = index as u32;

            if wanted.blend_enable != current.blend_enable {
                if wanted.blend_enable {
                    gl.enable_i(native::BLEND, buffer);
                } else {
                    gl.disable_i(native::BLEND, buffer);
                }
                current.blend_enable = wanted.blend_enable;
            }
            // Factors and equations are irrelevant while blending is off
            if wanted.blend_enable {
                if (wanted.src_color, wanted.dst_color, wanted.src_alpha, wanted.dst_alpha)
                    != (current.src_color, current.dst_color, current.src_alpha, current.dst_alpha)
                {
                    gl.blend_func_separate_i(
                        buffer,
                        state_tables::blend_factor(wanted.src_color),
                        state_tables::blend_factor(wanted.dst_color),
                        state_tables::blend_factor(wanted.src_alpha),
                        state_tables::blend_factor(wanted.dst_alpha),
                    );
                    current.src_color = wanted.src_color;
                    current.dst_color = wanted.dst_color;
                    current.src_alpha = wanted.src_alpha;
                    current.dst_alpha = wanted.dst_alpha;
                }
                if (wanted.color_op, wanted.alpha_op) != (current.color_op, current.alpha_op) {
                    gl.blend_equation_separate_i(
                        buffer,
                        state_tables::blend_op(wanted.color_op),
                        state_tables::blend_op(wanted.alpha_op),
                    );
                    current.color_op = wanted.color_op;
                    current.alpha_op = wanted.alpha_op;
                }
            }
            if wanted.write_mask != current.write_mask {
                self.set_color_mask(gl, index, wanted.write_mask);
            }
        }
        self.blend_id = state.id();
        true
    }

    pub fn set_color_mask(&mut self, gl: &mut dyn Driver, index: usize, mask: crate::pipeline::ColorWriteMask) {
        use crate::pipeline::ColorWriteMask as M;
        gl.color_mask_i(
            index as u32,
            mask.contains(M::RED),
            mask.contains(M::GREEN),
            mask.contains(M::BLUE),
            mask.contains(M::ALPHA),
        );
        self.blend_targets[index].write_mask = mask;
    }

    pub fn apply_rasterizer(&mut self, gl: &mut dyn Driver, state: &RasterizerState) -> bool {
        if self.rasterizer_id == state.id() {
            return false;
        }
        let desc = state.desc();

        let cull_enabled = desc.cull_mode != CullMode::None;
        if cull_enabled != self.cull_enabled {
            toggle(gl, native::CULL_FACE, cull_enabled);
            self.cull_enabled = cull_enabled;
        }
        if let Some(face) = state_tables::cull_face(desc.cull_mode) {
            if face != self.cull_face {
                gl.cull_face(face);
                self.cull_face = face;
            }
        }
        if desc.front_face != self.front_face {
            gl.front_face(state_tables::front_face(desc.front_face));
            self.front_face = desc.front_face;
        }
        if desc.polygon_mode != self.polygon_mode {
            gl.polygon_mode(state_tables::polygon_mode(desc.polygon_mode));
            self.polygon_mode = desc.polygon_mode;
        }

        let offset_cap = desc
            .depth_bias
            .is_enabled()
            .then(|| state_tables::polygon_offset_cap(desc.polygon_mode));
        if offset_cap != self.polygon_offset_cap {
            if let Some(old) = self.polygon_offset_cap {
                gl.disable(old);
            }
            if let Some(new) = offset_cap {
                gl.enable(new);
            }
            self.polygon_offset_cap = offset_cap;
        }
        if offset_cap.is_some() && desc.depth_bias != self.depth_bias {
            gl.polygon_offset_clamp(desc.depth_bias.slope, desc.depth_bias.constant, desc.depth_bias.clamp);
            self.depth_bias = desc.depth_bias;
        }

        if desc.depth_clamp != self.depth_clamp {
            toggle(gl, native::DEPTH_CLAMP, desc.depth_clamp);
            self.depth_clamp = desc.depth_clamp;
        }
        if desc.scissor_test != self.scissor_test {
            self.set_scissor_test(gl, desc.scissor_test);
        }
        if desc.rasterizer_discard != self.rasterizer_discard {
            self.set_rasterizer_discard(gl, desc.rasterizer_discard);
        }
        self.rasterizer_id = state.id();
        true
    }

    pub fn set_scissor_test(&mut self, gl: &mut dyn Driver, enabled: bool) {
        toggle(gl, native::SCISSOR_TEST, enabled);
        self.scissor_test = enabled;
    }

    pub fn set_rasterizer_discard(&mut self, gl: &mut dyn Driver, enabled: bool) {
        toggle(gl, native::RASTERIZER_DISCARD, enabled);
        self.rasterizer_discard = enabled;
    }

    pub fn apply_depth_stencil(&mut self, gl: &mut dyn Driver, state: &DepthStencilState) -> bool {
        if self.depth_stencil_id == state.id() {
            return false;
        }
        let desc = state.desc();

        if desc.depth_test != self.depth_test {
            toggle(gl, native::DEPTH_TEST, desc.depth_test);
            self.depth_test = desc.depth_test;
        }
        if desc.depth_write != self.depth_write {
            self.set_depth_write(gl, desc.depth_write);
        }
        if desc.depth_compare != self.depth_compare {
            gl.depth_func(state_tables::compare_op(desc.depth_compare));
            self.depth_compare = desc.depth_compare;
        }

        if desc.stencil_test != self.stencil_test {
            toggle(gl, native::STENCIL_TEST, desc.stencil_test);
            self.stencil_test = desc.stencil_test;
        }
        let read_mask = u32::from(desc.stencil_read_mask);
        let mask_changed = read_mask != self.stencil_read_mask;
        self.stencil_read_mask = read_mask;
        let reference = self.stencil_reference;
        for (face, wanted, current) in [
            (native::FRONT, desc.front, &mut self.stencil_front),
            (native::BACK, desc.back, &mut self.stencil_back),
        ] {
            if mask_changed || wanted.compare != current.compare {
                gl.stencil_func_separate(face, state_tables::compare_op(wanted.compare), reference, read_mask);
            }
            if (wanted.fail_op, wanted.depth_fail_op, wanted.pass_op)
                != (current.fail_op, current.depth_fail_op, current.pass_op)
            {
                gl.stencil_op_separate(
                    face,
                    state_tables::stencil_op(wanted.fail_op),
                    state_tables::stencil_op(wanted.depth_fail_op),
                    state_tables::stencil_op(wanted.pass_op),
                );
            }
            *current = wanted;
        }
        let write_mask = u32::from(desc.stencil_write_mask);
        if write_mask != self.stencil_write_mask {
            self.set_stencil_write_mask(gl, write_mask);
        }
        self.depth_stencil_id = state.id();
        true
    }

    pub fn set_depth_write(&mut self, gl: &mut dyn Driver, enabled: bool) {
        gl.depth_mask(enabled);
        self.depth_write = enabled;
    }

    pub fn set_stencil_write_mask(&mut self, gl: &mut dyn Driver, mask: u32) {
        gl.stencil_mask_separate(native::FRONT_AND_BACK, mask);
        self.stencil_write_mask = mask;
    }

    /// Re-issue both stencil functions with a new reference value
    pub fn set_stencil_reference(&mut self, gl: &mut dyn Driver, reference: u32) {
        if reference == self.stencil_reference {
            return;
        }
        for (face, current) in [(native::FRONT, self.stencil_front), (native::BACK, self.stencil_back)] {
            gl.stencil_func_separate(face, state_tables::compare_op(current.compare), reference, self.stencil_read_mask);
        }
        self.stencil_reference = reference;
    }

    pub fn set_blend_constants(&mut self, gl: &mut dyn Driver, rgba: [f32; 4]) {
        if rgba != self.blend_constants {
            gl.blend_color(rgba);
            self.blend_constants = rgba;
        }
    }

    pub fn bind_draw_framebuffer(&mut self, gl: &mut dyn Driver, handle: NativeHandle) -> bool {
        if handle == self.draw_framebuffer {
            return false;
        }
        gl.bind_framebuffer(native::DRAW_FRAMEBUFFER, handle);
        self.draw_framebuffer = handle;
        true
    }

    /// Set viewports `first..`; only the changed sub-range reaches the driver
    pub fn set_viewports(&mut self, gl: &mut dyn Driver, first: usize, viewports: &[[f32; 4]]) {
        let current = &mut self.viewports[first..first + viewports.len()];
        if let Some((lo, hi)) = changed_range(current, viewports) {
            gl.viewport_array((first + lo) as u32, &viewports[lo..=hi]);
            for (slot, value) in current[lo..=hi].iter_mut().zip(&viewports[lo..=hi]) {
                *slot = Some(*value);
            }
        }
    }

    pub fn set_depth_ranges(&mut self, gl: &mut dyn Driver, first: usize, ranges: &[[f64; 2]]) {
        let current = &mut self.depth_ranges[first..first + ranges.len()];
        let lo = current.iter().zip(ranges).position(|(a, b)| a != b);
        let hi = current.iter().zip(ranges).rposition(|(a, b)| a != b);
        if let (Some(lo), Some(hi)) = (lo, hi) {
            gl.depth_range_array((first + lo) as u32, &ranges[lo..=hi]);
            current[lo..=hi].copy_from_slice(&ranges[lo..=hi]);
        }
    }

    pub fn set_scissors(&mut self, gl: &mut dyn Driver, first: usize, rects: &[[i32; 4]]) {
        let current = &mut self.scissors[first..first + rects.len()];
        if let Some((lo, hi)) = changed_range(current, rects) {
            gl.scissor_array((first + lo) as u32, &rects[lo..=hi]);
            for (slot, value) in current[lo..=hi].iter_mut().zip(&rects[lo..=hi]) {
                *slot = Some(*value);
            }
        }
    }

    pub fn bind_vertex_array(&mut self, gl: &mut dyn Driver, vao: NativeHandle) {
        if vao != self.vertex_array {
            gl.bind_vertex_array(vao);
            self.vertex_array = vao;
        }
    }
}

/// First and last index where `current` differs from `wanted`
fn changed_range<T: PartialEq + Copy>(current: &[Option<T>], wanted: &[T]) -> Option<(usize, usize)> {
    let differs = |(a, b): (&Option<T>, &T)| *a != Some(*b);
    let lo = current.iter().zip(wanted).position(differs)?;
    let hi = current.iter().zip(wanted).rposition(differs)?;
    Some((lo, hi))
}

#[cfg(test)]
#[path = "binding_state_tests.rs"]
mod tests;

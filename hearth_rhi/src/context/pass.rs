//! Render pass execution: `{Idle, InPass(subpass)}`.
//!
//! Beginning a subpass binds the framebuffer, points the draw buffers at the
//! subpass color references and clears attachments on first use. Ending one
//! invalidates attachments on last use whose contents are not stored.

use std::sync::Arc;
use smallvec::SmallVec;
use crate::driver::{native, Driver, NativeEnum};
use crate::error::{Error, Result};
use crate::pipeline::{ColorWriteMask, MAX_COLOR_ATTACHMENTS};
use crate::render_pass::{
    AttachmentRange, ClearValue, Framebuffer, FramebufferTarget, LoadOp, RenderPass, StoreOp,
};
use crate::resource::{ClearKind, FormatAspect};
use crate::state_tables;
use super::immediate_context::{ImmediateContext, Rect, Viewport};

/// Parameters of [`ImmediateContext::begin_render_pass`]
#[derive(Debug, Clone, Copy)]
pub struct RenderPassBeginInfo<'a> {
    pub render_pass: &'a Arc<RenderPass>,
    pub target: FramebufferTarget<'a>,
    /// `None` covers the whole framebuffer
    pub render_area: Option<Rect>,
    /// Overrides the clear values of the pass, by attachment index
    pub clear_values: &'a [ClearValue],
}

impl<'a> RenderPassBeginInfo<'a> {
    pub fn new(render_pass: &'a Arc<RenderPass>, target: FramebufferTarget<'a>) -> Self {
        Self {
            render_pass,
            target,
            render_area: None,
            clear_values: &[],
        }
    }

    pub fn with_render_area(mut self, area: Rect) -> Self {
        self.render_area = Some(area);
        self
    }

    pub fn with_clear_values(mut self, values: &'a [ClearValue]) -> Self {
        self.clear_values = values;
        self
    }
}

/// Pass currently executing on a context
#[derive(Debug)]
pub(crate) struct ActivePass {
    pub render_pass: Arc<RenderPass>,
    pub framebuffer: Arc<Framebuffer>,
    pub subpass: u32,
    pub ranges: SmallVec<[AttachmentRange; 9]>,
    pub render_area: Rect,
    pub clear_values: SmallVec<[ClearValue; 9]>,
}

impl ImmediateContext {
    /// Enter subpass 0 of a render pass
    pub fn begin_render_pass(&mut self, info: &RenderPassBeginInfo<'_>) -> Result<()> {
        debug_assert!(self.pass.is_none(), "begin_render_pass inside a render pass");
        if self.pass.is_some() {
            crate::rhi_bail!("hearth::ImmediateContext", "begin_render_pass inside a render pass");
        }

        let pass = info.render_pass;
        match info.target {
            FramebufferTarget::Default => {
                if pass.color_attachment_count() > 1 {
                    crate::rhi_error!(
                        "hearth::ImmediateContext",
                        "Pass {} has {} color attachments, the window has one",
                        pass.uid(),
                        pass.color_attachment_count()
                    );
                    return Err(Error::InvalidResource("default framebuffer has one color buffer".to_string()));
                }
            }
            FramebufferTarget::Attachments(views) => {
                if views.len() != pass.attachment_count() {
                    crate::rhi_error!(
                        "hearth::ImmediateContext",
                        "Pass {} declares {} attachments, {} views given",
                        pass.uid(),
                        pass.attachment_count(),
                        views.len()
                    );
                    return Err(Error::InvalidResource("attachment count mismatch".to_string()));
                }
                let validate = self.device.config.validation;
                for (index, view) in views.iter().enumerate().filter(|_| validate) {
                    let expected = pass.attachment(index as u32).format;
                    if view.texture.format() != expected {
                        crate::rhi_error!(
                            "hearth::ImmediateContext",
                            "Attachment {} is {:?}, pass expects {:?}",
                            index,
                            view.texture.format(),
                            expected
                        );
                        return Err(Error::InvalidResource(format!("attachment {} format mismatch", index)));
                    }
                }
            }
        }

        let framebuffer = self.with_gl(|ctx, gl| ctx.framebuffers.get_framebuffer(gl, info.target, ctx.surface))?;
        let render_area = info
            .render_area
            .unwrap_or_else(|| Rect::sized(framebuffer.width(), framebuffer.height()));
        let clear_values = (0..pass.attachment_count() as u32)
            .map(|i| {
                info.clear_values
                    .get(i as usize)
                    .copied()
                    .unwrap_or(pass.attachment(i).clear_value)
            })
            .collect();

        self.pass = Some(ActivePass {
            render_pass: Arc::clone(pass),
            framebuffer,
            subpass: 0,
            ranges: pass.attachment_ranges(),
            render_area,
            clear_values,
        });

        self.set_viewport(Viewport::new(
            render_area.x as f32,
            render_area.y as f32,
            render_area.width as f32,
            render_area.height as f32,
        ));
        self.set_scissor(render_area);
        crate::rhi_trace!("hearth::ImmediateContext", "Begin render pass {}", pass.uid());
        self.begin_subpass();
        Ok(())
    }

    /// Finish the current subpass and start the next one
    pub fn next_subpass(&mut self) {
        let Some(pass) = self.pass.as_ref() else {
            debug_assert!(false, "next_subpass outside a render pass");
            crate::rhi_error!("hearth::ImmediateContext", "next_subpass outside a render pass");
            return;
        };
        let next = pass.subpass + 1;
        debug_assert!(
            next < pass.render_pass.subpass_count(),
            "next_subpass past the last subpass of pass {}",
            pass.render_pass.uid()
        );
        if next >= pass.render_pass.subpass_count() {
            crate::rhi_error!("hearth::ImmediateContext", "next_subpass past the last subpass");
            return;
        }

        self.end_subpass();
        if let Some(pass) = self.pass.as_mut() {
            pass.subpass = next;
        }
        self.begin_subpass();
    }

    /// Finish the last subpass and return to idle
    pub fn end_render_pass(&mut self) {
        let Some(pass) = self.pass.as_ref() else {
            debug_assert!(false, "end_render_pass outside a render pass");
            crate::rhi_error!("hearth::ImmediateContext", "end_render_pass outside a render pass");
            return;
        };
        debug_assert_eq!(
            pass.subpass + 1,
            pass.render_pass.subpass_count(),
            "end_render_pass before the last subpass"
        );
        self.end_subpass();
        if let Some(pass) = self.pass.take() {
            crate::rhi_trace!("hearth::ImmediateContext", "End render pass {}", pass.render_pass.uid());
        }
    }

    pub fn is_in_render_pass(&self) -> bool {
        self.pass.is_some()
    }

    /// Index of the executing subpass
    pub fn current_subpass(&self) -> Option<u32> {
        self.pass.as_ref().map(|p| p.subpass)
    }

    /// Framebuffer of the executing pass
    pub fn current_framebuffer(&self) -> Option<&Arc<Framebuffer>> {
        self.pass.as_ref().map(|p| &p.framebuffer)
    }

    /// Drop cached framebuffers whose textures are gone; returns how many
    pub fn cleanup_outdated_framebuffers(&mut self) -> usize {
        let arena = Arc::clone(&self.device.arena);
        let removed = self.with_gl(|ctx, gl| ctx.framebuffers.cleanup_outdated(gl, &arena));
        if removed > 0 {
            crate::rhi_debug!("hearth::ImmediateContext", "Removed {} outdated framebuffers", removed);
        }
        removed
    }

    fn begin_subpass(&mut self) {
        let Some(pass) = self.pass.as_ref() else {
            return;
        };
        let render_pass = Arc::clone(&pass.render_pass);
        let framebuffer = Arc::clone(&pass.framebuffer);
        let subpass = pass.subpass;
        let desc = render_pass.subpass(subpass);

        let draw_buffers: SmallVec<[NativeEnum; MAX_COLOR_ATTACHMENTS]> = if framebuffer.is_default() {
            SmallVec::from_slice(&[if desc.color_attachments.is_empty() { native::NONE } else { native::BACK }])
        } else if desc.color_attachments.is_empty() {
            SmallVec::from_slice(&[native::NONE])
        } else {
            desc.color_attachments
                .iter()
                .filter_map(|&a| render_pass.color_slot(a))
                .map(|slot| native::COLOR_ATTACHMENT0 + slot)
                .collect()
        };

        let clears: SmallVec<[(u32, ClearValue); 9]> = desc
            .references()
            .filter(|&a| {
                pass.ranges[a as usize].is_first(subpass) && render_pass.attachment(a).load_op == LoadOp::Clear
            })
            .map(|a| (a, pass.clear_values[a as usize]))
            .collect();
        let render_area = self.native_rect(pass.render_area);

        self.with_gl(|ctx, gl| {
            if ctx.state.bind_draw_framebuffer(gl, framebuffer.handle()) {
                ctx.stats.framebuffer_binds += 1;
            }
            let list_changed = ctx
                .state
                .draw_buffers
                .as_ref()
                .map_or(true, |(uid, list)| *uid != framebuffer.uid() || *list != draw_buffers);
            if list_changed {
                gl.framebuffer_draw_buffers(framebuffer.handle(), &draw_buffers);
                ctx.state.draw_buffers = Some((framebuffer.uid(), draw_buffers));
            }
            if !clears.is_empty() {
                ctx.clear_attachments(gl, &render_pass, &framebuffer, subpass, &clears, render_area);
            }
        });

        self.stats.subpass_begins += 1;
        crate::rhi_trace!("hearth::ImmediateContext", "Begin subpass {} of pass {}", subpass, render_pass.uid());
    }

    fn end_subpass(&mut self) {
        let Some(pass) = self.pass.as_ref() else {
            return;
        };
        let subpass = pass.subpass;
        let framebuffer = Arc::clone(&pass.framebuffer);
        let render_pass = Arc::clone(&pass.render_pass);

        let mut attachments: SmallVec<[NativeEnum; 9]> = SmallVec::new();
        for reference in render_pass.subpass(subpass).references() {
            if !pass.ranges[reference as usize].is_last(subpass)
                || render_pass.attachment(reference).store_op != StoreOp::DontCare
            {
                continue;
            }
            let aspect = render_pass.attachment(reference).format.aspect();
            if framebuffer.is_default() {
                match aspect {
                    FormatAspect::Color => attachments.push(native::COLOR),
                    FormatAspect::Depth => attachments.push(native::DEPTH),
                    FormatAspect::Stencil => attachments.push(native::STENCIL),
                    FormatAspect::DepthStencil => attachments.extend_from_slice(&[native::DEPTH, native::STENCIL]),
                }
            } else if let Some(slot) = render_pass.color_slot(reference) {
                attachments.push(native::COLOR_ATTACHMENT0 + slot);
            } else {
                attachments.push(state_tables::depth_stencil_attachment(aspect));
            }
        }

        if !attachments.is_empty() {
            self.with_gl(|_, gl| gl.invalidate_framebuffer(framebuffer.handle(), &attachments));
            self.stats.attachment_invalidations += attachments.len() as u64;
        }
        self.stats.subpass_ends += 1;
        crate::rhi_trace!("hearth::ImmediateContext", "End subpass {} of pass {}", subpass, render_pass.uid());
    }

    /// Clear attachments on first use, scissored to the render area with every write enabled
    fn clear_attachments(
        &mut self,
        gl: &mut dyn Driver,
        render_pass: &RenderPass,
        framebuffer: &Framebuffer,
        subpass: u32,
        clears: &[(u32, ClearValue)],
        render_area: [i32; 4],
    ) {
        let saved_scissor_test = self.state.scissor_test;
        let saved_discard = self.state.rasterizer_discard;
        let saved_scissor = self.state.scissors[0];
        let saved_depth_write = self.state.depth_write;
        let saved_stencil_mask = self.state.stencil_write_mask;
        let mut saved_masks: SmallVec<[(usize, ColorWriteMask); MAX_COLOR_ATTACHMENTS]> = SmallVec::new();

        if !saved_scissor_test {
            self.state.set_scissor_test(gl, true);
        }
        self.state.set_scissors(gl, 0, &[render_area]);
        if saved_discard {
            self.state.set_rasterizer_discard(gl, false);
        }

        let colors = &render_pass.subpass(subpass).color_attachments;
        let handle = framebuffer.handle();
        for &(attachment, value) in clears {
            let kind = render_pass.attachment(attachment).format.clear_kind();
            match kind {
                ClearKind::Float | ClearKind::Int | ClearKind::Uint => {
                    let Some(draw_buffer) = colors.iter().position(|&c| c == attachment) else {
                        continue;
                    };
                    let mask = self.state.blend_targets[draw_buffer].write_mask;
                    if mask != ColorWriteMask::ALL {
                        saved_masks.push((draw_buffer, mask));
                        self.state.set_color_mask(gl, draw_buffer, ColorWriteMask::ALL);
                    }
                    let draw_buffer = draw_buffer as i32;
                    match (kind, value) {
                        (ClearKind::Int, ClearValue::ColorInt(v)) => gl.clear_framebuffer_iv(handle, native::COLOR, draw_buffer, v),
                        (ClearKind::Uint, ClearValue::ColorUint(v)) => gl.clear_framebuffer_uiv(handle, native::COLOR, draw_buffer, v),
                        (ClearKind::Float, ClearValue::Color(v)) => gl.clear_framebuffer_fv(handle, native::COLOR, draw_buffer, v),
                        (_, other) => {
                            crate::rhi_warn!(
                                "hearth::ImmediateContext",
                                "Clear value {:?} does not match attachment {} ({:?})",
                                other,
                                attachment,
                                kind
                            );
                            continue;
                        }
                    }
                }
                ClearKind::Depth | ClearKind::Stencil | ClearKind::DepthStencil => {
                    let ClearValue::DepthStencil { depth, stencil } = value else {
                        crate::rhi_warn!(
                            "hearth::ImmediateContext",
                            "Clear value {:?} does not match attachment {} ({:?})",
                            value,
                            attachment,
                            kind
                        );
                        continue;
                    };
                    if kind != ClearKind::Stencil && !self.state.depth_write {
                        self.state.set_depth_write(gl, true);
                    }
                    if kind != ClearKind::Depth && self.state.stencil_write_mask != 0xFF {
                        self.state.set_stencil_write_mask(gl, 0xFF);
                    }
                    match kind {
                        ClearKind::Depth => gl.clear_framebuffer_fv(handle, native::DEPTH, 0, [depth, 0.0, 0.0, 0.0]),
                        ClearKind::Stencil => gl.clear_framebuffer_iv(handle, native::STENCIL, 0, [stencil as i32, 0, 0, 0]),
                        _ => gl.clear_framebuffer_fi(handle, depth, stencil as i32),
                    }
                }
            }
            self.stats.attachment_clears += 1;
        }

        for (index, mask) in saved_masks {
            self.state.set_color_mask(gl, index, mask);
        }
        if self.state.stencil_write_mask != saved_stencil_mask {
            self.state.set_stencil_write_mask(gl, saved_stencil_mask);
        }
        if self.state.depth_write != saved_depth_write {
            self.state.set_depth_write(gl, saved_depth_write);
        }
        if saved_discard {
            self.state.set_rasterizer_discard(gl, true);
        }
        if let Some(scissor) = saved_scissor {
            self.state.set_scissors(gl, 0, &[scissor]);
        }
        if !saved_scissor_test {
            self.state.set_scissor_test(gl, false);
        }
    }
}

#[cfg(test)]
#[path = "pass_tests.rs"]
mod tests;

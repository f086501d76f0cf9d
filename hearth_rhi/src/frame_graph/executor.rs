//! Sequential frame graph execution.
//!
//! Per step: acquire the transients it declares from the pool, run it on the
//! right context, release what it marks as done. Steps never overlap.

use std::sync::Arc;
use smallvec::SmallVec;
use crate::context::{ImmediateContext, RenderPassBeginInfo};
use crate::device::Device;
use crate::error::{Error, Result};
use crate::pipeline::MAX_COLOR_ATTACHMENTS;
use crate::render_pass::FramebufferTarget;
use crate::resource::{Texture, TextureView};
use super::frame_graph::{
    FrameGraph, FrameResources, PassTarget, RenderPassStep, ResourceNode, ResourceSource, Step, StepKind,
};
use super::render_target_pool::RenderTargetPool;

/// Runs frame graphs and keeps the transient pool alive between frames
#[derive(Default)]
pub struct FrameGraphExecutor {
    pool: RenderTargetPool,
    frames: u64,
}

impl FrameGraphExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pool(&self) -> &RenderTargetPool {
        &self.pool
    }

    pub fn pool_mut(&mut self) -> &mut RenderTargetPool {
        &mut self.pool
    }

    pub fn frames_executed(&self) -> u64 {
        self.frames
    }

    /// Execute every step of `graph` in order on `context`
    ///
    /// Passes targeting another context's window run on the matching entry of
    /// `other_contexts`, which is made current for the pass only. A failing
    /// step stops the frame; transients still held are returned to the pool.
    ///
    /// # Panics
    ///
    /// When the pool cannot provide a transient texture.
    pub fn execute(
        &mut self,
        device: &Device,
        graph: &mut FrameGraph<'_>,
        context: &mut ImmediateContext,
        other_contexts: &mut [&mut ImmediateContext],
    ) -> Result<()> {
        context.reset_stats();
        context.cleanup_outdated_framebuffers();
        for other in other_contexts.iter_mut() {
            other.reset_stats();
            let _scope = other.activate();
            other.cleanup_outdated_framebuffers();
        }

        let FrameGraph { resources, steps } = graph;
        let mut textures: Vec<Option<Arc<Texture>>> = resources
            .iter()
            .map(|node| match &node.source {
                ResourceSource::Imported(texture) => Some(Arc::clone(texture)),
                ResourceSource::Transient(_) => None,
            })
            .collect();

        let mut result = Ok(());
        for step in steps.iter_mut() {
            for id in step.acquire.iter() {
                let r = id.0 as usize;
                self.acquire(device, &resources[r], &mut textures[r], &step.name);
            }

            result = Self::check_resolved(step, resources, &textures)
                .and_then(|()| Self::run_step(device, step, &textures, context, other_contexts));

            for id in step.release.iter() {
                let r = id.0 as usize;
                if matches!(resources[r].source, ResourceSource::Transient(_)) {
                    if let Some(texture) = textures[r].take() {
                        self.pool.release(texture);
                    }
                }
            }
            if result.is_err() {
                break;
            }
        }

        for (node, slot) in resources.iter().zip(textures.iter_mut()) {
            if !matches!(node.source, ResourceSource::Transient(_)) {
                continue;
            }
            if let Some(texture) = slot.take() {
                crate::rhi_debug!("hearth::FrameGraph", "Transient '{}' released at end of frame", node.name);
                self.pool.release(texture);
            }
        }

        self.pool.trim(device.config().transient_max_idle_frames);
        self.frames += 1;
        result
    }

    fn acquire(&mut self, device: &Device, node: &ResourceNode, slot: &mut Option<Arc<Texture>>, step: &str) {
        let ResourceSource::Transient(desc) = &node.source else {
            return;
        };
        debug_assert!(slot.is_none(), "transient '{}' acquired twice", node.name);
        if slot.is_some() {
            return;
        }
        match self.pool.acquire(device, desc) {
            Ok(texture) => *slot = Some(texture),
            Err(err) => {
                crate::rhi_error!(
                    "hearth::FrameGraph",
                    "Step '{}' cannot acquire transient '{}': {}",
                    step,
                    node.name,
                    err
                );
                panic!("frame graph step '{}' cannot acquire transient '{}': {}", step, node.name, err);
            }
        }
    }

    /// Every resource a step uses must be available when it runs
    fn check_resolved(step: &Step<'_>, resources: &[ResourceNode], textures: &[Option<Arc<Texture>>]) -> Result<()> {
        for id in step.uses() {
            if textures[id.0 as usize].is_none() {
                let name = &resources[id.0 as usize].name;
                debug_assert!(false, "step '{}' uses '{}' outside its lifetime", step.name, name);
                crate::rhi_error!("hearth::FrameGraph", "Step '{}' uses '{}' outside its lifetime", step.name, name);
                return Err(Error::InvalidResource(format!("'{}' is not acquired", name)));
            }
        }
        Ok(())
    }

    fn run_step(
        device: &Device,
        step: &mut Step<'_>,
        textures: &[Option<Arc<Texture>>],
        context: &mut ImmediateContext,
        other_contexts: &mut [&mut ImmediateContext],
    ) -> Result<()> {
        let resources = FrameResources { textures };
        crate::rhi_trace!("hearth::FrameGraph", "Step '{}'", step.name);

        let result = match &mut step.kind {
            StepKind::Task { callback, .. } => callback(context, &resources),
            StepKind::RenderPass(pass) => match pass.target {
                PassTarget::ContextFramebuffer(id) if id != context.id() => {
                    let Some(target) = other_contexts.iter_mut().find(|c| c.id() == id) else {
                        if device.is_context_alive(id) {
                            crate::rhi_error!(
                                "hearth::FrameGraph",
                                "Step '{}' targets {:?}, which was not handed to the executor",
                                step.name,
                                id
                            );
                        } else {
                            crate::rhi_error!("hearth::FrameGraph", "Step '{}' targets destroyed {:?}", step.name, id);
                        }
                        return Err(Error::InvalidResource(format!("context {:?} unavailable", id)));
                    };
                    let _scope = target.activate();
                    Self::run_render_pass(pass, &resources, target)
                }
                _ => Self::run_render_pass(pass, &resources, context),
            },
        };

        if let Err(err) = &result {
            crate::rhi_error!("hearth::FrameGraph", "Step '{}' failed: {}", step.name, err);
        }
        result
    }

    fn run_render_pass(
        pass: &mut RenderPassStep<'_>,
        resources: &FrameResources<'_>,
        context: &mut ImmediateContext,
    ) -> Result<()> {
        let views: SmallVec<[TextureView; MAX_COLOR_ATTACHMENTS + 1]> = match &pass.target {
            PassTarget::Resources(ids) => ids.iter().filter_map(|&id| resources.view(id)).collect(),
            _ => SmallVec::new(),
        };
        let target = match &pass.target {
            PassTarget::Resources(_) => FramebufferTarget::Attachments(&views),
            _ => FramebufferTarget::Default,
        };

        let mut info = RenderPassBeginInfo::new(&pass.render_pass, target).with_clear_values(&pass.clear_values);
        if let Some(area) = pass.render_area {
            info = info.with_render_area(area);
        }
        context.begin_render_pass(&info)?;

        // A failing callback skips the remaining ones but the pass still ends
        let mut result = Ok(());
        for subpass in 0..pass.render_pass.subpass_count() {
            if subpass > 0 {
                context.next_subpass();
            }
            if result.is_ok() {
                if let Some(callback) = pass.subpasses.get_mut(subpass as usize) {
                    result = callback(context, resources);
                }
            }
        }
        context.end_render_pass();
        result
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;

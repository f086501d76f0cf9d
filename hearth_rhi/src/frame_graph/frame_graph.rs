//! Frame graph: a linear timeline of render passes and custom tasks.
//!
//! Resources are either transient (described by a `TextureDesc` and taken
//! from the executor's pool for the steps that need them) or imported
//! (existing textures owned by the caller). Each step lists the transient
//! resources it acquires before running and releases after running, either
//! marked explicitly or derived by [`FrameGraph::compute_lifetimes`].

use std::sync::Arc;
use smallvec::SmallVec;
use crate::context::{ImmediateContext, Rect};
use crate::driver::ContextId;
use crate::error::Result;
use crate::pipeline::MAX_COLOR_ATTACHMENTS;
use crate::render_pass::{ClearValue, RenderPass};
use crate::resource::{Texture, TextureDesc, TextureView};

/// Index of a resource declared on a [`FrameGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceId(pub(crate) u32);

/// Index of a step of a [`FrameGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StepId(pub(crate) u32);

/// Where a resource's texture comes from
#[derive(Debug, Clone)]
pub enum ResourceSource {
    /// Taken from the render target pool while the graph needs it
    Transient(TextureDesc),
    /// Owned by the caller, always available
    Imported(Arc<Texture>),
}

#[derive(Debug)]
pub(crate) struct ResourceNode {
    pub name: String,
    pub source: ResourceSource,
}

/// What a render-pass step renders into
#[derive(Debug, Clone)]
pub enum PassTarget {
    /// Graph resources in render-pass attachment order
    Resources(SmallVec<[ResourceId; MAX_COLOR_ATTACHMENTS + 1]>),
    /// Window back buffer of the executing context
    DefaultFramebuffer,
    /// Window back buffer of another context; the executor switches to it
    /// for the duration of the pass
    ContextFramebuffer(ContextId),
}

impl PassTarget {
    pub fn resources(ids: &[ResourceId]) -> Self {
        PassTarget::Resources(SmallVec::from_slice(ids))
    }

    fn resource_ids(&self) -> &[ResourceId] {
        match self {
            PassTarget::Resources(ids) => ids,
            _ => &[],
        }
    }
}

/// Textures resolved for the step being executed
pub struct FrameResources<'r> {
    pub(crate) textures: &'r [Option<Arc<Texture>>],
}

impl FrameResources<'_> {
    /// Texture of `id`, `None` when a transient is not acquired at this step
    pub fn texture(&self, id: ResourceId) -> Option<&Arc<Texture>> {
        self.textures.get(id.0 as usize).and_then(Option::as_ref)
    }

    /// Mip 0 view of `id`
    pub fn view(&self, id: ResourceId) -> Option<TextureView> {
        self.texture(id).map(|t| TextureView::new(Arc::clone(t)))
    }
}

/// Commands recorded inside one subpass
pub type SubpassCallback<'a> = Box<dyn FnMut(&mut ImmediateContext, &FrameResources<'_>) -> Result<()> + 'a>;

/// Commands recorded by a custom task
pub type TaskCallback<'a> = Box<dyn FnMut(&mut ImmediateContext, &FrameResources<'_>) -> Result<()> + 'a>;

/// Render pass step description
pub struct RenderPassStep<'a> {
    pub(crate) render_pass: Arc<RenderPass>,
    pub(crate) target: PassTarget,
    pub(crate) render_area: Option<Rect>,
    pub(crate) clear_values: SmallVec<[ClearValue; MAX_COLOR_ATTACHMENTS + 1]>,
    pub(crate) reads: SmallVec<[ResourceId; 8]>,
    pub(crate) subpasses: Vec<SubpassCallback<'a>>,
}

impl<'a> RenderPassStep<'a> {
    pub fn new(render_pass: &Arc<RenderPass>, target: PassTarget) -> Self {
        Self {
            render_pass: Arc::clone(render_pass),
            target,
            render_area: None,
            clear_values: SmallVec::new(),
            reads: SmallVec::new(),
            subpasses: Vec::new(),
        }
    }

    pub fn with_render_area(mut self, area: Rect) -> Self {
        self.render_area = Some(area);
        self
    }

    pub fn with_clear_values(mut self, values: &[ClearValue]) -> Self {
        self.clear_values = SmallVec::from_slice(values);
        self
    }

    /// Resources sampled by the pass (they must stay acquired while it runs)
    pub fn reads(mut self, ids: &[ResourceId]) -> Self {
        self.reads.extend_from_slice(ids);
        self
    }

    /// Commands of the next subpass, in subpass order; subpasses without a
    /// callback still run their clears and invalidations
    pub fn subpass<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&mut ImmediateContext, &FrameResources<'_>) -> Result<()> + 'a,
    {
        self.subpasses.push(Box::new(callback));
        self
    }
}

pub(crate) enum StepKind<'a> {
    RenderPass(RenderPassStep<'a>),
    Task {
        uses: SmallVec<[ResourceId; 8]>,
        callback: TaskCallback<'a>,
    },
}

pub(crate) struct Step<'a> {
    pub name: String,
    pub kind: StepKind<'a>,
    pub acquire: SmallVec<[ResourceId; 8]>,
    pub release: SmallVec<[ResourceId; 8]>,
}

impl Step<'_> {
    /// Every resource the step touches
    pub fn uses(&self) -> SmallVec<[ResourceId; 16]> {
        let mut uses: SmallVec<[ResourceId; 16]> = SmallVec::new();
        match &self.kind {
            StepKind::RenderPass(pass) => {
                uses.extend_from_slice(pass.target.resource_ids());
                uses.extend_from_slice(&pass.reads);
            }
            StepKind::Task { uses: ids, .. } => uses.extend_from_slice(ids),
        }
        uses
    }
}

/// Timeline of steps over declared resources
#[derive(Default)]
pub struct FrameGraph<'a> {
    pub(crate) resources: Vec<ResourceNode>,
    pub(crate) steps: Vec<Step<'a>>,
}

impl<'a> FrameGraph<'a> {
    pub fn new() -> Self {
        Self { resources: Vec::new(), steps: Vec::new() }
    }

    /// Declare a texture that only lives while the graph needs it
    pub fn create_texture(&mut self, name: &str, desc: TextureDesc) -> ResourceId {
        self.add_resource(name, ResourceSource::Transient(desc))
    }

    /// Declare an existing texture
    pub fn import_texture(&mut self, name: &str, texture: &Arc<Texture>) -> ResourceId {
        self.add_resource(name, ResourceSource::Imported(Arc::clone(texture)))
    }

    fn add_resource(&mut self, name: &str, source: ResourceSource) -> ResourceId {
        let id = ResourceId(self.resources.len() as u32);
        self.resources.push(ResourceNode { name: name.to_string(), source });
        id
    }

    pub fn add_render_pass(&mut self, name: &str, step: RenderPassStep<'a>) -> StepId {
        debug_assert!(
            step.subpasses.len() <= step.render_pass.subpass_count() as usize,
            "step '{}' has {} subpass callbacks for {} subpasses",
            name,
            step.subpasses.len(),
            step.render_pass.subpass_count()
        );
        self.check_ids(name, step.target.resource_ids());
        self.check_ids(name, &step.reads);
        self.add_step(name, StepKind::RenderPass(step))
    }

    /// Opaque work (copies, compute dispatches) on the executing context
    pub fn add_task<F>(&mut self, name: &str, uses: &[ResourceId], callback: F) -> StepId
    where
        F: FnMut(&mut ImmediateContext, &FrameResources<'_>) -> Result<()> + 'a,
    {
        self.check_ids(name, uses);
        self.add_step(
            name,
            StepKind::Task {
                uses: SmallVec::from_slice(uses),
                callback: Box::new(callback),
            },
        )
    }

    fn add_step(&mut self, name: &str, kind: StepKind<'a>) -> StepId {
        let id = StepId(self.steps.len() as u32);
        self.steps.push(Step {
            name: name.to_string(),
            kind,
            acquire: SmallVec::new(),
            release: SmallVec::new(),
        });
        id
    }

    fn check_ids(&self, step: &str, ids: &[ResourceId]) {
        for id in ids {
            debug_assert!(
                (id.0 as usize) < self.resources.len(),
                "step '{}' uses undeclared resource {:?}",
                step,
                id
            );
        }
    }

    /// Take `resource` from the pool before `step` runs
    pub fn acquire(&mut self, step: StepId, resource: ResourceId) {
        self.steps[step.0 as usize].acquire.push(resource);
    }

    /// Return `resource` to the pool after `step` ran
    pub fn release(&mut self, step: StepId, resource: ResourceId) {
        self.steps[step.0 as usize].release.push(resource);
    }

    /// Replace every acquire/release mark: a transient is acquired by the
    /// first step that uses it and released by the last one
    pub fn compute_lifetimes(&mut self) {
        let mut first: Vec<Option<usize>> = vec![None; self.resources.len()];
        let mut last: Vec<Option<usize>> = vec![None; self.resources.len()];
        for (index, step) in self.steps.iter().enumerate() {
            for id in step.uses() {
                let r = id.0 as usize;
                first[r].get_or_insert(index);
                last[r] = Some(index);
            }
        }

        for step in &mut self.steps {
            step.acquire.clear();
            step.release.clear();
        }
        for (r, node) in self.resources.iter().enumerate() {
            if !matches!(node.source, ResourceSource::Transient(_)) {
                continue;
            }
            match (first[r], last[r]) {
                (Some(first), Some(last)) => {
                    self.steps[first].acquire.push(ResourceId(r as u32));
                    self.steps[last].release.push(ResourceId(r as u32));
                }
                _ => crate::rhi_debug!("hearth::FrameGraph", "Transient '{}' is never used", node.name),
            }
        }
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn resource_name(&self, id: ResourceId) -> &str {
        &self.resources[id.0 as usize].name
    }

    pub fn step_name(&self, id: StepId) -> &str {
        &self.steps[id.0 as usize].name
    }

    /// Resources acquired before `step`
    pub fn acquires(&self, step: StepId) -> &[ResourceId] {
        &self.steps[step.0 as usize].acquire
    }

    /// Resources released after `step`
    pub fn releases(&self, step: StepId) -> &[ResourceId] {
        &self.steps[step.0 as usize].release
    }
}

#[cfg(test)]
#[path = "frame_graph_tests.rs"]
mod tests;

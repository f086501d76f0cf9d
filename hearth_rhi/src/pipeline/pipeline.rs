//! Graphics and compute pipelines.
//!
//! A pipeline bundles separable stage programs with shared state records.
//! The program pipeline object that links the stages together is a
//! container object, created per context on first bind.

use std::sync::Arc;
use parking_lot::Mutex;
use smallvec::SmallVec;
use crate::driver::{ContextId, Driver, NativeEnum, NativeHandle, Release, SharedDriver};
use crate::resource::{next_uid, Sampler, SamplerDesc, Shader, ShaderStage};
use crate::resource_table::{MAX_BUFFER_SLOTS, MAX_TEXTURE_SLOTS};
use crate::state_tables;
use super::per_context::PerContext;
use super::state::*;
use super::vertex_layout::VertexLayout;

/// Binding-point family of a buffer slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BufferBindingType {
    #[default]
    Uniform,
    Storage,
}

/// Graphics pipeline creation parameters
#[derive(Debug, Clone)]
pub struct PipelineDesc {
    pub vertex: Option<Arc<Shader>>,
    pub tess_control: Option<Arc<Shader>>,
    pub tess_evaluation: Option<Arc<Shader>>,
    pub geometry: Option<Arc<Shader>>,
    pub fragment: Option<Arc<Shader>>,
    /// `None` for pipelines that generate vertices in the shader
    pub vertex_layout: Option<Arc<VertexLayout>>,
    pub topology: PrimitiveTopology,
    pub patch_control_points: u32,
    pub primitive_restart: bool,
    pub blend: BlendStateDesc,
    pub rasterizer: RasterizerStateDesc,
    pub depth_stencil: DepthStencilStateDesc,
    /// Immutable samplers per texture slot
    pub samplers: Vec<(u32, SamplerDesc)>,
    /// Binding family per buffer slot (unlisted slots are uniform)
    pub buffers: Vec<(u32, BufferBindingType)>,
}

impl Default for PipelineDesc {
    fn default() -> Self {
        Self {
            vertex: None,
            tess_control: None,
            tess_evaluation: None,
            geometry: None,
            fragment: None,
            vertex_layout: None,
            topology: PrimitiveTopology::TriangleList,
            patch_control_points: 0,
            primitive_restart: false,
            blend: BlendStateDesc::default(),
            rasterizer: RasterizerStateDesc::default(),
            depth_stencil: DepthStencilStateDesc::default(),
            samplers: Vec::new(),
            buffers: Vec::new(),
        }
    }
}

impl PipelineDesc {
    pub(crate) fn validate(&self) -> std::result::Result<(), String> {
        let slots = [
            (&self.vertex, ShaderStage::Vertex),
            (&self.tess_control, ShaderStage::TessControl),
            (&self.tess_evaluation, ShaderStage::TessEvaluation),
            (&self.geometry, ShaderStage::Geometry),
            (&self.fragment, ShaderStage::Fragment),
        ];
        for (shader, expected) in slots {
            if let Some(shader) = shader {
                if shader.stage() != expected {
                    return Err(format!("{:?} shader bound to the {:?} slot", shader.stage(), expected));
                }
            }
        }
        if self.vertex.is_none() {
            return Err("graphics pipelines need a vertex shader".to_string());
        }
        if self.tess_control.is_some() && self.tess_evaluation.is_none() {
            return Err("tessellation control without evaluation shader".to_string());
        }
        let tessellated = self.tess_evaluation.is_some();
        if tessellated != (self.topology == PrimitiveTopology::PatchList) {
            return Err("patch topology and tessellation shaders go together".to_string());
        }
        if tessellated && !(1..=32).contains(&self.patch_control_points) {
            return Err(format!("{} patch control points", self.patch_control_points));
        }
        validate_slots(&self.samplers, &self.buffers)
    }
}

/// Compute pipeline creation parameters
#[derive(Debug, Clone)]
pub struct ComputePipelineDesc {
    pub shader: Arc<Shader>,
    pub samplers: Vec<(u32, SamplerDesc)>,
    pub buffers: Vec<(u32, BufferBindingType)>,
}

impl ComputePipelineDesc {
    pub fn new(shader: Arc<Shader>) -> Self {
        Self { shader, samplers: Vec::new(), buffers: Vec::new() }
    }

    pub(crate) fn validate(&self) -> std::result::Result<(), String> {
        if self.shader.stage() != ShaderStage::Compute {
            return Err(format!("{:?} shader used as compute", self.shader.stage()));
        }
        validate_slots(&self.samplers, &self.buffers)
    }
}

fn validate_slots(
    samplers: &[(u32, SamplerDesc)],
    buffers: &[(u32, BufferBindingType)],
) -> std::result::Result<(), String> {
    if let Some((slot, _)) = samplers.iter().find(|(slot, _)| *slot as usize >= MAX_TEXTURE_SLOTS) {
        return Err(format!("sampler slot {} exceeds {}", slot, MAX_TEXTURE_SLOTS));
    }
    if let Some((slot, _)) = buffers.iter().find(|(slot, _)| *slot as usize >= MAX_BUFFER_SLOTS) {
        return Err(format!("buffer slot {} exceeds {}", slot, MAX_BUFFER_SLOTS));
    }
    Ok(())
}

/// Graphics or compute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineKind {
    Graphics,
    Compute,
}

/// Everything `Pipeline::new` needs once the device has deduplicated state
pub(crate) struct PipelineParts {
    pub kind: PipelineKind,
    pub stages: SmallVec<[Arc<Shader>; 5]>,
    pub vertex_layout: Option<Arc<VertexLayout>>,
    pub topology: PrimitiveTopology,
    pub patch_control_points: u32,
    pub primitive_restart: bool,
    pub blend: Arc<BlendState>,
    pub rasterizer: Arc<RasterizerState>,
    pub depth_stencil: Arc<DepthStencilState>,
    pub samplers: Vec<(u32, Arc<Sampler>)>,
    pub buffers: Vec<(u32, BufferBindingType)>,
}

/// Immutable pipeline
pub struct Pipeline {
    uid: u64,
    kind: PipelineKind,
    stages: SmallVec<[Arc<Shader>; 5]>,
    vertex_layout: Option<Arc<VertexLayout>>,
    topology: NativeEnum,
    patch_control_points: u32,
    primitive_restart: bool,
    blend: Arc<BlendState>,
    rasterizer: Arc<RasterizerState>,
    depth_stencil: Arc<DepthStencilState>,
    samplers: Vec<Option<Arc<Sampler>>>,
    buffer_types: [BufferBindingType; MAX_BUFFER_SLOTS],
    program_pipelines: Mutex<PerContext<NativeHandle>>,
    driver: Arc<SharedDriver>,
}

impl Pipeline {
    pub(crate) fn new(driver: &Arc<SharedDriver>, parts: PipelineParts) -> Self {
        let mut samplers = vec![None; MAX_TEXTURE_SLOTS];
        for (slot, sampler) in parts.samplers {
            samplers[slot as usize] = Some(sampler);
        }
        let mut buffer_types = [BufferBindingType::Uniform; MAX_BUFFER_SLOTS];
        for (slot, ty) in parts.buffers {
            buffer_types[slot as usize] = ty;
        }
        Self {
            uid: next_uid(),
            kind: parts.kind,
            stages: parts.stages,
            vertex_layout: parts.vertex_layout,
            topology: state_tables::primitive_topology(parts.topology),
            patch_control_points: parts.patch_control_points,
            primitive_restart: parts.primitive_restart,
            blend: parts.blend,
            rasterizer: parts.rasterizer,
            depth_stencil: parts.depth_stencil,
            samplers,
            buffer_types,
            program_pipelines: Mutex::new(PerContext::default()),
            driver: Arc::clone(driver),
        }
    }

    pub fn uid(&self) -> u64 {
        self.uid
    }

    pub fn kind(&self) -> PipelineKind {
        self.kind
    }

    pub fn is_compute(&self) -> bool {
        self.kind == PipelineKind::Compute
    }

    pub fn stages(&self) -> &[Arc<Shader>] {
        &self.stages
    }

    pub fn vertex_layout(&self) -> Option<&Arc<VertexLayout>> {
        self.vertex_layout.as_ref()
    }

    /// Native primitive mode used by draws
    pub fn topology(&self) -> NativeEnum {
        self.topology
    }

    pub fn patch_control_points(&self) -> u32 {
        self.patch_control_points
    }

    pub fn primitive_restart(&self) -> bool {
        self.primitive_restart
    }

    pub fn blend_state(&self) -> &Arc<BlendState> {
        &self.blend
    }

    pub fn rasterizer_state(&self) -> &Arc<RasterizerState> {
        &self.rasterizer
    }

    pub fn depth_stencil_state(&self) -> &Arc<DepthStencilState> {
        &self.depth_stencil
    }

    /// Immutable sampler of a texture slot
    pub fn sampler(&self, slot: usize) -> Option<&Arc<Sampler>> {
        self.samplers[slot].as_ref()
    }

    pub fn buffer_type(&self, slot: usize) -> BufferBindingType {
        self.buffer_types[slot]
    }

    /// Program pipeline of `context`, created and linked on first use
    ///
    /// `context` must be current on `gl`.
    pub(crate) fn program_pipeline(&self, gl: &mut dyn Driver, context: ContextId, is_main: bool) -> NativeHandle {
        let mut pipelines = self.program_pipelines.lock();
        if let Some(handle) = pipelines.get_mut(context) {
            return *handle;
        }
        let handle = gl.create_program_pipeline();
        for shader in &self.stages {
            let (_, bit) = state_tables::shader_stage(shader.stage());
            gl.use_program_stages(handle, bit, shader.program());
        }
        crate::rhi_trace!(
            "hearth::Pipeline",
            "Pipeline {} created program pipeline {} on context {:?}",
            self.uid,
            handle,
            context
        );
        *pipelines.insert(context, is_main, handle)
    }

    /// Delete the program pipeline of `context` (which must be current)
    pub(crate) fn destroy_program_pipeline(&self, gl: &mut dyn Driver, context: ContextId) {
        if let Some(handle) = self.program_pipelines.lock().remove(context) {
            gl.delete_program_pipeline(handle);
        }
    }

    pub fn program_pipeline_count(&self) -> usize {
        self.program_pipelines.lock().len()
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        for (context, handle) in self.program_pipelines.get_mut().drain() {
            self.driver.release(Release::ProgramPipeline { context, handle });
        }
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("uid", &self.uid)
            .field("kind", &self.kind)
            .field("stages", &self.stages.len())
            .finish()
    }
}

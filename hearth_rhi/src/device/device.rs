//! Logical device: the composition root of the RHI.
//!
//! The device creates every resource, deduplicates immutable state records
//! and samplers, and keeps the registry of contexts and per-context objects
//! so that tearing a context down frees exactly what it owns.

use std::sync::{Arc, Weak};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use smallvec::SmallVec;
use crate::context::ImmediateContext;
use crate::driver::{ContextId, Driver, DriverCaps, SharedDriver, SurfaceInfo};
use crate::error::{Error, Result};
use crate::pipeline::{
    BlendState, BlendStateDesc, ComputePipelineDesc, DepthStencilState, DepthStencilStateDesc,
    Pipeline, PipelineDesc, PipelineKind, PipelineParts, RasterizerState, RasterizerStateDesc,
    VertexLayout, VertexLayoutDesc,
};
use crate::render_pass::{RenderPass, RenderPassDesc};
use crate::resource::{
    Buffer, BufferDesc, QueryPool, QueryType, Sampler, SamplerDesc, Shader, ShaderSource,
    ShaderStage, Texture, TextureArena, TextureDesc, TransformFeedback, TransformFeedbackBinding,
};
use crate::resource_table::ResourceTable;
use super::DeviceConfig;

/// Live contexts and the per-context objects created on them
#[derive(Default)]
struct Registry {
    next_context: u32,
    main_context: Option<ContextId>,
    contexts: FxHashMap<ContextId, SurfaceInfo>,
    vertex_layouts: Vec<Weak<VertexLayout>>,
    pipelines: Vec<Weak<Pipeline>>,
}

/// State shared between a device and its contexts
pub(crate) struct DeviceShared {
    pub driver: Arc<SharedDriver>,
    pub arena: TextureArena,
    pub caps: DriverCaps,
    pub config: DeviceConfig,
    registry: Mutex<Registry>,
}

impl DeviceShared {
    /// Allocate a context id; the first context ever created is the main one
    fn register_context(&self, surface: SurfaceInfo) -> (ContextId, bool) {
        let mut registry = self.registry.lock();
        registry.next_context += 1;
        let id = ContextId(registry.next_context);
        let is_main = registry.main_context.is_none();
        if is_main {
            registry.main_context = Some(id);
        }
        registry.contexts.insert(id, surface);
        (id, is_main)
    }

    pub(crate) fn unregister_context(&self, id: ContextId) {
        self.registry.lock().contexts.remove(&id);
    }

    pub(crate) fn is_context_alive(&self, id: ContextId) -> bool {
        self.registry.lock().contexts.contains_key(&id)
    }

    /// Delete the VAOs and program pipelines owned by `context` (which must be current)
    pub(crate) fn destroy_context_objects(&self, gl: &mut dyn Driver, context: ContextId) {
        let (layouts, pipelines): (SmallVec<[Arc<VertexLayout>; 16]>, SmallVec<[Arc<Pipeline>; 16]>) = {
            let mut registry = self.registry.lock();
            registry.vertex_layouts.retain(|w| w.strong_count() > 0);
            registry.pipelines.retain(|w| w.strong_count() > 0);
            (
                registry.vertex_layouts.iter().filter_map(Weak::upgrade).collect(),
                registry.pipelines.iter().filter_map(Weak::upgrade).collect(),
            )
        };
        for layout in &layouts {
            layout.destroy_vao(gl, context);
        }
        for pipeline in &pipelines {
            pipeline.destroy_program_pipeline(gl, context);
        }
        crate::rhi_debug!(
            "hearth::Device",
            "Released per-context objects of {:?} ({} layouts, {} pipelines tracked)",
            context,
            layouts.len(),
            pipelines.len()
        );
    }
}

/// Deduplicated immutable objects, keyed by their description
#[derive(Default)]
struct DedupCaches {
    samplers: FxHashMap<SamplerDesc, Arc<Sampler>>,
    blend: FxHashMap<BlendStateDesc, Arc<BlendState>>,
    rasterizer: FxHashMap<RasterizerStateDesc, Arc<RasterizerState>>,
    depth_stencil: FxHashMap<DepthStencilStateDesc, Arc<DepthStencilState>>,
}

/// Sizes of the device-level caches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceCacheStats {
    pub samplers: usize,
    pub blend_states: usize,
    pub rasterizer_states: usize,
    pub depth_stencil_states: usize,
    pub vertex_layouts: usize,
    pub pipelines: usize,
    pub contexts: usize,
}

/// Logical device
pub struct Device {
    shared: Arc<DeviceShared>,
    caches: Mutex<DedupCaches>,
}

impl Device {
    /// Wrap an already created driver
    pub fn from_driver(driver: Box<dyn Driver>, config: DeviceConfig) -> Result<Self> {
        let caps = driver.capabilities();
        if caps.max_color_attachments == 0 || caps.max_viewports == 0 {
            crate::rhi_error!("hearth::Device", "Driver reports unusable limits: {:?}", caps);
            return Err(Error::InitializationFailed("driver reports zero attachments or viewports".to_string()));
        }
        crate::rhi_info!(
            "hearth::Device",
            "Device '{}' created (sparse: {}, bindless: {}, spir-v: {})",
            config.debug_name,
            caps.sparse_texture,
            caps.bindless_texture,
            caps.spirv_binaries
        );
        Ok(Self {
            shared: Arc::new(DeviceShared {
                driver: Arc::new(SharedDriver::new(driver)),
                arena: Arc::new(Mutex::new(SlotMap::with_key())),
                caps,
                config,
                registry: Mutex::new(Registry::default()),
            }),
            caches: Mutex::new(DedupCaches::default()),
        })
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.shared.config
    }

    pub fn capabilities(&self) -> &DriverCaps {
        &self.shared.caps
    }

    /// The driver shared by every object of this device
    pub fn driver(&self) -> &Arc<SharedDriver> {
        &self.shared.driver
    }

    // ===== CONTEXTS =====

    /// Create a command context for a window surface
    ///
    /// The first context becomes the main context and is made current;
    /// later ones must be activated explicitly. `None` uses the configured
    /// main surface size.
    pub fn create_context(&self, surface: Option<SurfaceInfo>) -> Result<ImmediateContext> {
        let surface = surface.unwrap_or(self.shared.config.main_surface);
        let (id, is_main) = self.shared.register_context(surface);

        let mut gl = self.shared.driver.lock();
        if !gl.create_context(id, surface) {
            drop(gl);
            self.shared.unregister_context(id);
            crate::rhi_bail!("hearth::Device", "Driver failed to create context {:?}", id);
        }
        if is_main && !gl.make_current(Some(id)) {
            gl.destroy_context(id);
            drop(gl);
            self.shared.unregister_context(id);
            crate::rhi_bail!("hearth::Device", "Cannot make the main context current");
        }
        drop(gl);

        crate::rhi_debug!(
            "hearth::Device",
            "Context {:?} created ({}x{}, main: {})",
            id,
            surface.width,
            surface.height,
            is_main
        );
        Ok(ImmediateContext::new(Arc::clone(&self.shared), id, is_main, surface))
    }

    pub fn context_count(&self) -> usize {
        self.shared.registry.lock().contexts.len()
    }

    /// Whether a context with this id exists and has not been dropped
    pub fn is_context_alive(&self, id: ContextId) -> bool {
        self.shared.is_context_alive(id)
    }

    // ===== RESOURCES =====

    pub fn create_buffer(&self, desc: &BufferDesc, data: Option<&[u8]>) -> Result<Arc<Buffer>> {
        Buffer::create(&self.shared.driver, desc, data).map(Arc::new)
    }

    pub fn create_texture(&self, desc: &TextureDesc) -> Result<Arc<Texture>> {
        Texture::create(&self.shared.driver, &self.shared.arena, desc, false).map(Arc::new)
    }

    /// Texture whose pages are committed explicitly (see `ImmediateContext::commit_pages`)
    pub fn create_sparse_texture(&self, desc: &TextureDesc) -> Result<Arc<Texture>> {
        if !self.shared.caps.sparse_texture {
            crate::rhi_error!("hearth::Device", "Sparse textures are not supported by this driver");
            return Err(Error::Unsupported("sparse textures".to_string()));
        }
        Texture::create(&self.shared.driver, &self.shared.arena, desc, true).map(Arc::new)
    }

    /// Shared sampler for `desc`
    pub fn create_sampler(&self, desc: &SamplerDesc) -> Result<Arc<Sampler>> {
        let mut caches = self.caches.lock();
        if let Some(sampler) = caches.samplers.get(desc) {
            return Ok(Arc::clone(sampler));
        }
        let sampler = Arc::new(Sampler::create(&self.shared.driver, desc, self.shared.caps.max_anisotropy)?);
        caches.samplers.insert(*desc, Arc::clone(&sampler));
        Ok(sampler)
    }

    pub fn create_blend_state(&self, desc: &BlendStateDesc) -> Arc<BlendState> {
        let mut caches = self.caches.lock();
        Arc::clone(caches.blend.entry(*desc).or_insert_with(|| Arc::new(BlendState::new(*desc))))
    }

    pub fn create_rasterizer_state(&self, desc: &RasterizerStateDesc) -> Arc<RasterizerState> {
        let mut caches = self.caches.lock();
        Arc::clone(caches.rasterizer.entry(*desc).or_insert_with(|| Arc::new(RasterizerState::new(*desc))))
    }

    pub fn create_depth_stencil_state(&self, desc: &DepthStencilStateDesc) -> Arc<DepthStencilState> {
        let mut caches = self.caches.lock();
        Arc::clone(
            caches
                .depth_stencil
                .entry(*desc)
                .or_insert_with(|| Arc::new(DepthStencilState::new(*desc))),
        )
    }

    pub fn create_vertex_layout(&self, desc: &VertexLayoutDesc) -> Result<Arc<VertexLayout>> {
        let layout = Arc::new(VertexLayout::create(&self.shared.driver, desc)?);
        self.shared.registry.lock().vertex_layouts.push(Arc::downgrade(&layout));
        Ok(layout)
    }

    pub fn create_shader_from_code(&self, stage: ShaderStage, code: &str) -> Result<Arc<Shader>> {
        Shader::create(&self.shared.driver, stage, ShaderSource::Code(code)).map(Arc::new)
    }

    pub fn create_shader_from_binary(&self, stage: ShaderStage, binary: &[u8], entry_point: &str) -> Result<Arc<Shader>> {
        Shader::create(&self.shared.driver, stage, ShaderSource::SpirV { binary, entry_point }).map(Arc::new)
    }

    pub fn create_pipeline(&self, desc: &PipelineDesc) -> Result<Arc<Pipeline>> {
        if let Err(reason) = desc.validate() {
            crate::rhi_error!("hearth::Device", "Invalid pipeline: {}", reason);
            return Err(Error::InvalidResource(reason));
        }
        let stages = [&desc.vertex, &desc.tess_control, &desc.tess_evaluation, &desc.geometry, &desc.fragment]
            .into_iter()
            .flatten()
            .cloned()
            .collect();
        let parts = PipelineParts {
            kind: PipelineKind::Graphics,
            stages,
            vertex_layout: desc.vertex_layout.clone(),
            topology: desc.topology,
            patch_control_points: desc.patch_control_points,
            primitive_restart: desc.primitive_restart,
            blend: self.create_blend_state(&desc.blend),
            rasterizer: self.create_rasterizer_state(&desc.rasterizer),
            depth_stencil: self.create_depth_stencil_state(&desc.depth_stencil),
            samplers: self.create_pipeline_samplers(&desc.samplers)?,
            buffers: desc.buffers.clone(),
        };
        Ok(self.track_pipeline(Pipeline::new(&self.shared.driver, parts)))
    }

    pub fn create_compute_pipeline(&self, desc: &ComputePipelineDesc) -> Result<Arc<Pipeline>> {
        if let Err(reason) = desc.validate() {
            crate::rhi_error!("hearth::Device", "Invalid compute pipeline: {}", reason);
            return Err(Error::InvalidResource(reason));
        }
        let parts = PipelineParts {
            kind: PipelineKind::Compute,
            stages: SmallVec::from_elem(Arc::clone(&desc.shader), 1),
            vertex_layout: None,
            topology: crate::pipeline::PrimitiveTopology::PointList,
            patch_control_points: 0,
            primitive_restart: false,
            blend: self.create_blend_state(&BlendStateDesc::default()),
            rasterizer: self.create_rasterizer_state(&RasterizerStateDesc::default()),
            depth_stencil: self.create_depth_stencil_state(&DepthStencilStateDesc::default()),
            samplers: self.create_pipeline_samplers(&desc.samplers)?,
            buffers: desc.buffers.clone(),
        };
        Ok(self.track_pipeline(Pipeline::new(&self.shared.driver, parts)))
    }

    fn create_pipeline_samplers(&self, samplers: &[(u32, SamplerDesc)]) -> Result<Vec<(u32, Arc<Sampler>)>> {
        samplers
            .iter()
            .map(|(slot, desc)| Ok((*slot, self.create_sampler(desc)?)))
            .collect()
    }

    fn track_pipeline(&self, pipeline: Pipeline) -> Arc<Pipeline> {
        let pipeline = Arc::new(pipeline);
        self.shared.registry.lock().pipelines.push(Arc::downgrade(&pipeline));
        pipeline
    }

    pub fn create_render_pass(&self, desc: RenderPassDesc) -> Result<Arc<RenderPass>> {
        if desc.attachments.iter().filter(|a| a.format.is_color()).count() > self.shared.caps.max_color_attachments as usize {
            crate::rhi_error!(
                "hearth::Device",
                "Render pass exceeds the driver's {} color attachments",
                self.shared.caps.max_color_attachments
            );
            return Err(Error::Unsupported("color attachment count".to_string()));
        }
        RenderPass::new(desc).map(Arc::new)
    }

    pub fn create_transform_feedback(&self, bindings: &[TransformFeedbackBinding]) -> Result<Arc<TransformFeedback>> {
        TransformFeedback::create(&self.shared.driver, bindings).map(Arc::new)
    }

    pub fn create_query_pool(&self, query_type: QueryType, count: u32) -> Result<Arc<QueryPool>> {
        QueryPool::create(&self.shared.driver, query_type, count).map(Arc::new)
    }

    /// Empty table; bind it on a context with `ImmediateContext::bind_resource_table`
    pub fn create_resource_table(&self) -> ResourceTable {
        ResourceTable::new()
    }

    // ===== MAINTENANCE =====

    /// Drop cached objects nobody else references; returns how many went away
    pub fn collect_garbage(&self) -> usize {
        let mut caches = self.caches.lock();
        let before = caches.samplers.len() + caches.blend.len() + caches.rasterizer.len() + caches.depth_stencil.len();
        caches.samplers.retain(|_, s| Arc::strong_count(s) > 1);
        caches.blend.retain(|_, s| Arc::strong_count(s) > 1);
        caches.rasterizer.retain(|_, s| Arc::strong_count(s) > 1);
        caches.depth_stencil.retain(|_, s| Arc::strong_count(s) > 1);
        let after = caches.samplers.len() + caches.blend.len() + caches.rasterizer.len() + caches.depth_stencil.len();
        drop(caches);

        let mut registry = self.shared.registry.lock();
        registry.vertex_layouts.retain(|w| w.strong_count() > 0);
        registry.pipelines.retain(|w| w.strong_count() > 0);
        drop(registry);

        // Flush the releases the dropped objects queued
        drop(self.shared.driver.lock());
        before - after
    }

    pub fn cache_stats(&self) -> DeviceCacheStats {
        let caches = self.caches.lock();
        let registry = self.shared.registry.lock();
        DeviceCacheStats {
            samplers: caches.samplers.len(),
            blend_states: caches.blend.len(),
            rasterizer_states: caches.rasterizer.len(),
            depth_stencil_states: caches.depth_stencil.len(),
            vertex_layouts: registry.vertex_layouts.iter().filter(|w| w.strong_count() > 0).count(),
            pipelines: registry.pipelines.iter().filter(|w| w.strong_count() > 0).count(),
            contexts: registry.contexts.len(),
        }
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("name", &self.shared.config.debug_name)
            .field("caps", &self.shared.caps)
            .finish()
    }
}

#[cfg(test)]
#[path = "device_tests.rs"]
mod tests;

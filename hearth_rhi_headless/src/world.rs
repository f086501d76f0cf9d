//! Simulated driver state.
//!
//! One share group: buffers, textures, samplers, programs, queries, syncs and
//! transform feedback objects are visible from every context; vertex arrays,
//! program pipelines and framebuffers belong to the context that created them.

use rustc_hash::{FxHashMap, FxHashSet};
use hearth_rhi::hearth::driver::{native, ContextId, DriverCaps, NativeEnum, NativeHandle, Region3D, SurfaceInfo};

pub(crate) const INCOMPLETE_ATTACHMENT: NativeEnum = 0x8CD6;
pub(crate) const INCOMPLETE_MISSING_ATTACHMENT: NativeEnum = 0x8CD7;
pub(crate) const INCOMPLETE_MULTISAMPLE: NativeEnum = 0x8D56;

/// Kind of a simulated native object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Buffer,
    Texture,
    Sampler,
    Program,
    ProgramPipeline,
    VertexArray,
    Framebuffer,
    Query,
    TransformFeedback,
    Sync,
}

impl ObjectKind {
    /// Objects owned by a single context
    pub fn is_container(self) -> bool {
        matches!(self, ObjectKind::ProgramPipeline | ObjectKind::VertexArray | ObjectKind::Framebuffer)
    }
}

/// Framebuffer-level work observed by the driver, in submission order
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    ClearColor { context: ContextId, framebuffer: NativeHandle, draw_buffer: i32 },
    ClearDepthStencil { context: ContextId, framebuffer: NativeHandle, buffer: NativeEnum },
    Invalidate { context: ContextId, framebuffer: NativeHandle, attachments: Vec<NativeEnum> },
    Draw {
        context: ContextId,
        framebuffer: NativeHandle,
        vertex_array: NativeHandle,
        program_pipeline: NativeHandle,
        /// `None` for indirect draws
        instances: Option<u32>,
    },
    Dispatch { context: ContextId, program_pipeline: NativeHandle, groups: Option<[u32; 3]> },
    Blit { context: ContextId, src: NativeHandle, dst: NativeHandle, mask: u32 },
}

pub(crate) struct BufferObject {
    pub bytes: Vec<u8>,
    pub flags: u32,
    pub allocated: bool,
    pub mapped: Option<(u64, u64, u32)>,
}

pub(crate) struct TextureObject {
    pub target: NativeEnum,
    pub internal_format: NativeEnum,
    pub levels: u32,
    pub extent: [u32; 3],
    pub samples: u32,
    pub allocated: bool,
    pub sparse: bool,
    pub committed: FxHashSet<(u32, [u32; 3])>,
}

impl TextureObject {
    pub fn level_extent(&self, level: u32) -> [u32; 3] {
        let depth = if self.target == native::TEXTURE_3D { (self.extent[2] >> level).max(1) } else { self.extent[2] };
        [(self.extent[0] >> level).max(1), (self.extent[1] >> level).max(1), depth]
    }
}

#[derive(Clone, Copy)]
pub(crate) struct Attachment {
    pub texture: NativeHandle,
    pub level: u32,
    pub layer: Option<u32>,
}

#[derive(Default)]
pub(crate) struct FramebufferObject {
    pub attachments: FxHashMap<NativeEnum, Attachment>,
    pub draw_buffers: Vec<NativeEnum>,
}

#[derive(Default)]
pub(crate) struct VertexArrayObject {
    pub enabled_attribs: u32,
    pub element_buffer: NativeHandle,
}

pub(crate) struct ProgramObject {
    pub stage: NativeEnum,
    pub linked: bool,
    pub info_log: String,
}

pub(crate) struct QueryObject {
    pub target: NativeEnum,
    /// Clock at begin for TIME_ELAPSED
    pub start: u64,
    pub accumulated: u64,
    pub result: Option<u64>,
}

#[derive(Default)]
pub(crate) struct TransformFeedbackObject {
    pub buffers: FxHashMap<u32, NativeHandle>,
    pub captured_vertices: Option<u64>,
}

pub(crate) enum ObjectData {
    Buffer(BufferObject),
    Texture(TextureObject),
    Program(ProgramObject),
    VertexArray(VertexArrayObject),
    Framebuffer(FramebufferObject),
    Query(QueryObject),
    TransformFeedback(TransformFeedbackObject),
    Plain,
}

pub(crate) struct Object {
    pub kind: ObjectKind,
    pub owner: Option<ContextId>,
    pub data: ObjectData,
}

/// Per-context binding state
pub(crate) struct ContextState {
    pub surface: SurfaceInfo,
    pub draw_framebuffer: NativeHandle,
    pub read_framebuffer: NativeHandle,
    pub vertex_array: NativeHandle,
    pub program_pipeline: NativeHandle,
    pub transform_feedback: NativeHandle,
    pub xfb_active: bool,
    pub xfb_paused: bool,
    pub xfb_vertices: u64,
    pub buffers: FxHashMap<NativeEnum, NativeHandle>,
    pub enabled: FxHashSet<(NativeEnum, u32)>,
    pub active_queries: FxHashMap<NativeEnum, NativeHandle>,
}

impl ContextState {
    fn new(surface: SurfaceInfo) -> Self {
        Self {
            surface,
            draw_framebuffer: 0,
            read_framebuffer: 0,
            vertex_array: 0,
            program_pipeline: 0,
            transform_feedback: 0,
            xfb_active: false,
            xfb_paused: false,
            xfb_vertices: 0,
            buffers: FxHashMap::default(),
            enabled: FxHashSet::default(),
            active_queries: FxHashMap::default(),
        }
    }

    pub fn buffer(&self, target: NativeEnum) -> NativeHandle {
        self.buffers.get(&target).copied().unwrap_or(0)
    }
}

pub(crate) struct World {
    pub caps: DriverCaps,
    pub memory_budget: Option<u64>,
    pub memory_used: u64,
    pub log_errors: bool,
    pub next_handle: NativeHandle,
    pub next_bindless: u64,
    pub clock_ns: u64,
    pub objects: FxHashMap<NativeHandle, Object>,
    pub contexts: FxHashMap<ContextId, ContextState>,
    pub current: Option<ContextId>,
    pub calls: FxHashMap<&'static str, u64>,
    pub commands: Vec<Command>,
    pub errors: Vec<String>,
}

impl World {
    pub fn new(caps: DriverCaps) -> Self {
        Self {
            caps,
            memory_budget: None,
            memory_used: 0,
            log_errors: true,
            next_handle: 1,
            next_bindless: 0x1_0000_0000,
            clock_ns: 0,
            objects: FxHashMap::default(),
            contexts: FxHashMap::default(),
            current: None,
            calls: FxHashMap::default(),
            commands: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Count an entry point and advance the fake GPU clock
    pub fn record(&mut self, call: &'static str) {
        *self.calls.entry(call).or_insert(0) += 1;
        self.clock_ns += 250;
    }

    /// Record a usage error the way a debug-output callback would
    pub fn error(&mut self, call: &str, message: String) {
        if self.log_errors {
            hearth_rhi::rhi_warn!("hearth::Headless", "{}: {}", call, message);
        }
        self.errors.push(format!("{}: {}", call, message));
    }

    // ===== CONTEXTS =====

    pub fn add_context(&mut self, id: ContextId, surface: SurfaceInfo) -> bool {
        if self.contexts.contains_key(&id) {
            self.error("create_context", format!("{:?} already exists", id));
            return false;
        }
        self.contexts.insert(id, ContextState::new(surface));
        true
    }

    pub fn remove_context(&mut self, id: ContextId) {
        if self.contexts.remove(&id).is_none() {
            self.error("destroy_context", format!("unknown {:?}", id));
            return;
        }
        // Container objects die with their context
        let orphans: Vec<NativeHandle> = self
            .objects
            .iter()
            .filter(|(_, object)| object.owner == Some(id))
            .map(|(&handle, _)| handle)
            .collect();
        for handle in orphans {
            self.objects.remove(&handle);
        }
        if self.current == Some(id) {
            self.current = None;
        }
    }

    /// Current context state; records an error when nothing is current
    pub fn context(&mut self, call: &str) -> Option<ContextId> {
        if self.current.is_none() {
            self.error(call, "no current context".to_string());
        }
        self.current
    }

    pub fn ctx(&mut self, id: ContextId) -> &mut ContextState {
        self.contexts.entry(id).or_insert_with(|| ContextState::new(SurfaceInfo::default()))
    }

    // ===== OBJECTS =====

    pub fn create(&mut self, kind: ObjectKind, data: ObjectData) -> NativeHandle {
        let handle = self.next_handle;
        self.next_handle += 1;
        let owner = if kind.is_container() { self.current } else { None };
        self.objects.insert(handle, Object { kind, owner, data });
        handle
    }

    /// Whether `handle` names a live object of `kind` usable from the current context
    pub fn check(&mut self, call: &str, handle: NativeHandle, kind: ObjectKind) -> bool {
        let problem = match self.objects.get(&handle) {
            None => Some(format!("{:?} {} does not exist", kind, handle)),
            Some(object) if object.kind != kind => {
                Some(format!("{} is a {:?}, not a {:?}", handle, object.kind, kind))
            }
            Some(object) if object.owner.is_some() && object.owner != self.current => Some(format!(
                "{:?} {} belongs to {:?}, current is {:?}",
                kind, handle, object.owner, self.current
            )),
            Some(_) => None,
        };
        match problem {
            Some(message) => {
                self.error(call, message);
                false
            }
            None => true,
        }
    }

    /// Same as [`World::check`] but 0 (the default object) is accepted
    pub fn check_or_null(&mut self, call: &str, handle: NativeHandle, kind: ObjectKind) -> bool {
        handle == 0 || self.check(call, handle, kind)
    }

    pub fn delete(&mut self, call: &str, handle: NativeHandle, kind: ObjectKind) {
        if handle == 0 {
            return;
        }
        if !self.check(call, handle, kind) {
            return;
        }
        if let Some(object) = self.objects.remove(&handle) {
            match object.data {
                ObjectData::Buffer(buffer) if buffer.allocated => {
                    self.memory_used = self.memory_used.saturating_sub(buffer.bytes.len() as u64)
                }
                ObjectData::Texture(texture) if texture.allocated && !texture.sparse => {
                    self.memory_used = self.memory_used.saturating_sub(texture_bytes(&texture))
                }
                _ => {}
            }
        }
        let reset = |h: &mut NativeHandle| {
            if *h == handle {
                *h = 0;
            }
        };
        for state in self.contexts.values_mut() {
            match kind {
                ObjectKind::Framebuffer => {
                    reset(&mut state.draw_framebuffer);
                    reset(&mut state.read_framebuffer);
                }
                ObjectKind::VertexArray => reset(&mut state.vertex_array),
                ObjectKind::ProgramPipeline => reset(&mut state.program_pipeline),
                ObjectKind::TransformFeedback => reset(&mut state.transform_feedback),
                ObjectKind::Buffer => state.buffers.retain(|_, h| *h != handle),
                _ => {}
            }
        }
    }

    pub fn buffer_mut(&mut self, handle: NativeHandle) -> Option<&mut BufferObject> {
        match self.objects.get_mut(&handle).map(|o| &mut o.data) {
            Some(ObjectData::Buffer(buffer)) => Some(buffer),
            _ => None,
        }
    }

    pub fn texture(&self, handle: NativeHandle) -> Option<&TextureObject> {
        match self.objects.get(&handle).map(|o| &o.data) {
            Some(ObjectData::Texture(texture)) => Some(texture),
            _ => None,
        }
    }

    pub fn texture_mut(&mut self, handle: NativeHandle) -> Option<&mut TextureObject> {
        match self.objects.get_mut(&handle).map(|o| &mut o.data) {
            Some(ObjectData::Texture(texture)) => Some(texture),
            _ => None,
        }
    }

    pub fn program(&self, handle: NativeHandle) -> Option<&ProgramObject> {
        match self.objects.get(&handle).map(|o| &o.data) {
            Some(ObjectData::Program(program)) => Some(program),
            _ => None,
        }
    }

    pub fn framebuffer_mut(&mut self, handle: NativeHandle) -> Option<&mut FramebufferObject> {
        match self.objects.get_mut(&handle).map(|o| &mut o.data) {
            Some(ObjectData::Framebuffer(framebuffer)) => Some(framebuffer),
            _ => None,
        }
    }

    pub fn vertex_array_mut(&mut self, handle: NativeHandle) -> Option<&mut VertexArrayObject> {
        match self.objects.get_mut(&handle).map(|o| &mut o.data) {
            Some(ObjectData::VertexArray(vao)) => Some(vao),
            _ => None,
        }
    }

    pub fn query_mut(&mut self, handle: NativeHandle) -> Option<&mut QueryObject> {
        match self.objects.get_mut(&handle).map(|o| &mut o.data) {
            Some(ObjectData::Query(query)) => Some(query),
            _ => None,
        }
    }

    pub fn xfb_mut(&mut self, handle: NativeHandle) -> Option<&mut TransformFeedbackObject> {
        match self.objects.get_mut(&handle).map(|o| &mut o.data) {
            Some(ObjectData::TransformFeedback(xfb)) => Some(xfb),
            _ => None,
        }
    }

    /// Charge an allocation against the memory budget
    pub fn allocate(&mut self, bytes: u64) -> bool {
        if let Some(budget) = self.memory_budget {
            if self.memory_used + bytes > budget {
                return false;
            }
        }
        self.memory_used += bytes;
        true
    }

    // ===== FRAMEBUFFERS =====

    pub fn framebuffer_status(&self, handle: NativeHandle) -> NativeEnum {
        let Some(Object { data: ObjectData::Framebuffer(framebuffer), .. }) = self.objects.get(&handle) else {
            return INCOMPLETE_ATTACHMENT;
        };
        if framebuffer.attachments.is_empty() {
            return INCOMPLETE_MISSING_ATTACHMENT;
        }
        let mut samples = None;
        for attachment in framebuffer.attachments.values() {
            let Some(texture) = self.texture(attachment.texture) else {
                return INCOMPLETE_ATTACHMENT;
            };
            if !texture.allocated || attachment.level >= texture.levels {
                return INCOMPLETE_ATTACHMENT;
            }
            if let Some(layer) = attachment.layer {
                if layer >= texture.level_extent(attachment.level)[2] {
                    return INCOMPLETE_ATTACHMENT;
                }
            }
            match samples {
                None => samples = Some(texture.samples),
                Some(s) if s != texture.samples => return INCOMPLETE_MULTISAMPLE,
                Some(_) => {}
            }
        }
        native::FRAMEBUFFER_COMPLETE
    }

    // ===== DRAWS =====

    /// Validate draw state and account the work in active queries
    pub fn draw(&mut self, call: &'static str, vertices: Option<(NativeEnum, u64)>, instances: Option<u32>, indexed: bool) {
        let Some(id) = self.context(call) else {
            return;
        };
        let (framebuffer, vertex_array, program_pipeline) = {
            let state = self.ctx(id);
            (state.draw_framebuffer, state.vertex_array, state.program_pipeline)
        };
        if program_pipeline == 0 {
            self.error(call, "no program pipeline bound".to_string());
        }
        if vertex_array == 0 {
            self.error(call, "no vertex array bound".to_string());
        } else if indexed {
            let element_buffer = self.vertex_array_mut(vertex_array).map(|v| v.element_buffer).unwrap_or(0);
            if element_buffer == 0 {
                self.error(call, format!("vertex array {} has no element buffer", vertex_array));
            }
        }
        if framebuffer != 0 && self.framebuffer_status(framebuffer) != native::FRAMEBUFFER_COMPLETE {
            self.error(call, format!("framebuffer {} is incomplete", framebuffer));
        }

        if let Some((mode, count)) = vertices {
            let instances = u64::from(instances.unwrap_or(1));
            let primitives = primitive_count(mode, count) * instances;
            let state = self.ctx(id);
            if state.xfb_active && !state.xfb_paused {
                state.xfb_vertices += count * instances;
            }
            let active: Vec<(NativeEnum, NativeHandle)> = state.active_queries.iter().map(|(&t, &q)| (t, q)).collect();
            for (target, query) in active {
                let add = match target {
                    native::SAMPLES_PASSED | native::ANY_SAMPLES_PASSED | native::ANY_SAMPLES_PASSED_CONSERVATIVE => {
                        count * instances
                    }
                    native::PRIMITIVES_GENERATED | native::TRANSFORM_FEEDBACK_PRIMITIVES_WRITTEN => primitives,
                    _ => 0,
                };
                if let Some(q) = self.query_mut(query) {
                    q.accumulated += add;
                }
            }
        }
        self.commands.push(Command::Draw { context: id, framebuffer, vertex_array, program_pipeline, instances });
    }
}

/// Bytes per texel of the internal formats the RHI allocates
pub(crate) fn texel_size(internal_format: NativeEnum) -> u64 {
    match internal_format {
        native::R8 | native::R8UI | native::STENCIL_INDEX8 => 1,
        native::RG8 | native::R16F | native::R16UI | native::DEPTH_COMPONENT16 => 2,
        native::RGBA16F | native::RG32F | native::RG32UI | native::DEPTH32F_STENCIL8 => 8,
        native::RGBA32F | native::RGBA32UI | native::RGBA32I => 16,
        _ => 4,
    }
}

pub(crate) fn texture_bytes(texture: &TextureObject) -> u64 {
    let texel = texel_size(texture.internal_format) * u64::from(texture.samples.max(1));
    (0..texture.levels)
        .map(|level| {
            let [w, h, d] = texture.level_extent(level);
            u64::from(w) * u64::from(h) * u64::from(d) * texel
        })
        .sum()
}

/// 64 KiB sparse pages, shaped by texel size
pub(crate) fn page_size(internal_format: NativeEnum) -> [u32; 3] {
    match texel_size(internal_format) {
        1 => [256, 256, 1],
        2 => [256, 128, 1],
        8 => [128, 64, 1],
        16 => [64, 64, 1],
        _ => [128, 128, 1],
    }
}

/// Pages of `level` touched by `region`, or `None` when the region is not page aligned
pub(crate) fn pages_in(texture: &TextureObject, level: u32, region: &Region3D) -> Option<Vec<[u32; 3]>> {
    let page = page_size(texture.internal_format);
    let extent = texture.level_extent(level);
    if region.x < 0 || region.y < 0 || region.z < 0 {
        return None;
    }
    let origin = [region.x as u32, region.y as u32, region.z as u32];
    let size = [region.width, region.height, region.depth];
    for axis in 0..3 {
        let end = origin[axis] + size[axis];
        if origin[axis] % page[axis] != 0 || end > extent[axis] || (end % page[axis] != 0 && end != extent[axis]) {
            return None;
        }
    }
    let mut pages = Vec::new();
    for z in (origin[2]..origin[2] + size[2]).step_by(page[2] as usize) {
        for y in (origin[1]..origin[1] + size[1]).step_by(page[1] as usize) {
            for x in (origin[0]..origin[0] + size[0]).step_by(page[0] as usize) {
                pages.push([x / page[0], y / page[1], z / page[2]]);
            }
        }
    }
    Some(pages)
}

pub(crate) fn primitive_count(mode: NativeEnum, vertices: u64) -> u64 {
    match mode {
        native::POINTS => vertices,
        native::LINES => vertices / 2,
        native::LINE_STRIP => vertices.saturating_sub(1),
        native::LINE_LOOP => vertices,
        native::TRIANGLES => vertices / 3,
        native::TRIANGLE_STRIP | native::TRIANGLE_FAN => vertices.saturating_sub(2),
        native::LINES_ADJACENCY => vertices / 4,
        native::TRIANGLES_ADJACENCY => vertices / 6,
        _ => vertices,
    }
}

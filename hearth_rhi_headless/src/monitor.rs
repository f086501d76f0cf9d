//! Read side of the simulated driver

use std::sync::Arc;
use parking_lot::Mutex;
use hearth_rhi::hearth::driver::{ContextId, NativeEnum, NativeHandle, SurfaceInfo};
use crate::world::{Command, ObjectData, ObjectKind, World};

/// Inspects a [`HeadlessDriver`](crate::HeadlessDriver) that is owned by a device
#[derive(Clone)]
pub struct HeadlessMonitor {
    world: Arc<Mutex<World>>,
}

impl HeadlessMonitor {
    pub(crate) fn new(world: Arc<Mutex<World>>) -> Self {
        Self { world }
    }

    // ===== CALLS =====

    /// Times the driver entry point `name` was called
    pub fn call_count(&self, name: &str) -> u64 {
        self.world.lock().calls.get(name).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> u64 {
        self.world.lock().calls.values().sum()
    }

    /// Clears, invalidations, draws, dispatches and blits in submission order
    pub fn commands(&self) -> Vec<Command> {
        self.world.lock().commands.clone()
    }

    /// Forget call counts and commands (object state is kept)
    pub fn reset_counters(&self) {
        let mut world = self.world.lock();
        world.calls.clear();
        world.commands.clear();
    }

    // ===== VALIDATION =====

    /// Usage errors detected so far
    pub fn errors(&self) -> Vec<String> {
        self.world.lock().errors.clone()
    }

    pub fn take_errors(&self) -> Vec<String> {
        std::mem::take(&mut self.world.lock().errors)
    }

    // ===== OBJECTS =====

    pub fn live_objects(&self, kind: ObjectKind) -> usize {
        self.world.lock().objects.values().filter(|o| o.kind == kind).count()
    }

    pub fn total_live_objects(&self) -> usize {
        self.world.lock().objects.len()
    }

    pub fn is_alive(&self, handle: NativeHandle) -> bool {
        self.world.lock().objects.contains_key(&handle)
    }

    /// Context owning a container object
    pub fn owner(&self, handle: NativeHandle) -> Option<ContextId> {
        self.world.lock().objects.get(&handle).and_then(|o| o.owner)
    }

    pub fn buffer_contents(&self, buffer: NativeHandle) -> Option<Vec<u8>> {
        match self.world.lock().objects.get(&buffer).map(|o| &o.data) {
            Some(ObjectData::Buffer(b)) => Some(b.bytes.clone()),
            _ => None,
        }
    }

    pub fn is_mapped(&self, buffer: NativeHandle) -> bool {
        matches!(
            self.world.lock().objects.get(&buffer).map(|o| &o.data),
            Some(ObjectData::Buffer(b)) if b.mapped.is_some()
        )
    }

    /// Committed pages of a sparse texture, across every level
    pub fn committed_pages(&self, texture: NativeHandle) -> usize {
        match self.world.lock().objects.get(&texture).map(|o| &o.data) {
            Some(ObjectData::Texture(t)) => t.committed.len(),
            _ => 0,
        }
    }

    /// Attachment points of a framebuffer with their textures, sorted by attachment
    pub fn framebuffer_attachments(&self, framebuffer: NativeHandle) -> Vec<(NativeEnum, NativeHandle)> {
        let world = self.world.lock();
        let mut attachments: Vec<(NativeEnum, NativeHandle)> = match world.objects.get(&framebuffer).map(|o| &o.data) {
            Some(ObjectData::Framebuffer(f)) => f.attachments.iter().map(|(&a, att)| (a, att.texture)).collect(),
            _ => Vec::new(),
        };
        attachments.sort_unstable();
        attachments
    }

    pub fn draw_buffers(&self, framebuffer: NativeHandle) -> Vec<NativeEnum> {
        match self.world.lock().objects.get(&framebuffer).map(|o| &o.data) {
            Some(ObjectData::Framebuffer(f)) => f.draw_buffers.clone(),
            _ => Vec::new(),
        }
    }

    /// Bytes of buffer, texture and committed sparse storage in use
    pub fn memory_used(&self) -> u64 {
        self.world.lock().memory_used
    }

    // ===== CONTEXTS =====

    pub fn current_context(&self) -> Option<ContextId> {
        self.world.lock().current
    }

    pub fn context_count(&self) -> usize {
        self.world.lock().contexts.len()
    }

    pub fn surface(&self, context: ContextId) -> Option<SurfaceInfo> {
        self.world.lock().contexts.get(&context).map(|c| c.surface)
    }

    /// Draw framebuffer bound on `context`
    pub fn bound_framebuffer(&self, context: ContextId) -> Option<NativeHandle> {
        self.world.lock().contexts.get(&context).map(|c| c.draw_framebuffer)
    }

    pub fn is_enabled(&self, context: ContextId, cap: NativeEnum, index: u32) -> bool {
        self.world
            .lock()
            .contexts
            .get(&context)
            .is_some_and(|c| c.enabled.contains(&(cap, index)))
    }
}

impl std::fmt::Debug for HeadlessMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let world = self.world.lock();
        f.debug_struct("HeadlessMonitor")
            .field("objects", &world.objects.len())
            .field("errors", &world.errors.len())
            .finish()
    }
}

/// Per-context command counters, reset by the caller (usually once per frame)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContextStats {
    pub draw_calls: u64,
    pub dispatches: u64,
    pub pipeline_binds: u64,
    /// Blend/rasterizer/depth-stencil groups that had to be diffed
    pub state_transitions: u64,
    pub framebuffer_binds: u64,
    pub subpass_begins: u64,
    pub subpass_ends: u64,
    pub attachment_clears: u64,
    pub attachment_invalidations: u64,
    pub vertex_buffer_rebinds: u64,
    pub shader_binding_rebinds: u64,
}

impl ContextStats {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

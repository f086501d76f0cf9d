mod binding_state;
mod immediate_context;
mod pass;
mod scope;
mod stats;
mod sync;
mod transfer;

pub use binding_state::MAX_VIEWPORTS;
pub use immediate_context::{ImmediateContext, Rect, Viewport};
pub use pass::RenderPassBeginInfo;
pub use scope::ContextScope;
pub use stats::ContextStats;
pub use sync::MemoryBarriers;
pub use transfer::{BlitMask, MapAccess, MapFlags, PixelLayout};

#[cfg(test)]
pub(crate) mod test_fixture;

//! Frame graph: declarative per-frame timeline of passes and tasks, with
//! transient render targets bracketed by acquire/release.

mod executor;
mod frame_graph;
mod render_target_pool;

pub use executor::FrameGraphExecutor;
pub use frame_graph::{
    FrameGraph, FrameResources, PassTarget, RenderPassStep, ResourceId, ResourceSource, StepId,
    SubpassCallback, TaskCallback,
};
pub use render_target_pool::{PoolStats, RenderTargetPool};

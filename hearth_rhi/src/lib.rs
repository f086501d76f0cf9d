/*!
# Hearth RHI

Explicit rendering hardware interface over a legacy, globally stateful
graphics driver.

Applications describe work the way a modern explicit API does (render passes
with subpasses, pipelines with immutable state, resource tables, frame
graphs). The command context translates it into the smallest sequence of
calls on the underlying driver by diffing against the state it last applied,
and memoizes the driver objects derived from logical identities
(framebuffers, vertex arrays, program pipelines).

## Architecture

- **Driver**: the native, implicitly stateful API; backends implement it
- **Device**: composition root creating every resource, deduplicating state
  records and samplers
- **ImmediateContext**: command context with state diffing and the render
  pass state machine
- **FramebufferCache**: framebuffers keyed by attachment identity, holding
  generation-checked references to their textures
- **FrameGraph**: timeline of passes and tasks with pooled transient targets

Backends register with [`hearth::Rhi::register_backend`]; `hearth_rhi_headless`
provides a GPU-less one.
*/

// Internal modules
mod error;
mod runtime;
mod state_tables;
pub mod log;
pub mod driver;
pub mod resource;
pub mod resource_table;
pub mod pipeline;
pub mod render_pass;
pub mod context;
pub mod device;
pub mod frame_graph;

// Main hearth namespace module
pub mod hearth {
    // Error types
    pub use crate::error::{Error, Result};

    // Runtime singleton and backend registry
    pub use crate::runtime::{DriverFactory, Rhi};

    // Composition root and command context
    pub use crate::device::{CoordinateConvention, Device, DeviceCacheStats, DeviceConfig};
    pub use crate::context::{ContextScope, ContextStats, ImmediateContext};

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{DefaultLogger, LogEntry, LogSeverity, Logger};
    }

    // Driver seam for backend crates
    pub mod driver {
        pub use crate::driver::*;
    }

    // Resource sub-module
    pub mod resource {
        pub use crate::resource::*;
        pub use crate::resource_table::*;
    }

    // Pipeline and render pass description types
    pub mod render {
        pub use crate::pipeline::*;
        pub use crate::render_pass::*;
        pub use crate::context::{
            BlitMask, MapAccess, MapFlags, MemoryBarriers, PixelLayout, Rect, RenderPassBeginInfo, Viewport,
        };
    }

    // Frame graph sub-module
    pub mod frame_graph {
        pub use crate::frame_graph::*;
    }
}

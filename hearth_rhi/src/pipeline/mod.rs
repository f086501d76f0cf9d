mod per_context;
mod pipeline;
mod state;
mod vertex_layout;

pub use pipeline::*;
pub use state::*;
pub use vertex_layout::{
    VertexAttribute, VertexBufferLayout, VertexFormat, VertexInputRate, VertexLayout,
    VertexLayoutDesc, MAX_VERTEX_ATTRIBUTES, MAX_VERTEX_BUFFERS,
};
pub(crate) use vertex_layout::AttachedBuffer;

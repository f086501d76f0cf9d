mod framebuffer;
mod render_pass;

pub use framebuffer::*;
pub use render_pass::*;

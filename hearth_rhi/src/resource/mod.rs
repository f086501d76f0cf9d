mod buffer;
mod fence;
mod format;
mod query;
mod sampler;
mod shader;
mod texture;
mod transform_feedback;

pub use buffer::*;
pub use fence::*;
pub use format::*;
pub use query::*;
pub use sampler::*;
pub use shader::*;
pub use texture::*;
pub use transform_feedback::*;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use parking_lot::Mutex;
use slotmap::{new_key_type, SlotMap};
use crate::driver::NativeHandle;

static NEXT_UID: AtomicU64 = AtomicU64::new(1);

/// Process-unique, never-reused object id (0 means "nothing bound")
pub(crate) fn next_uid() -> u64 {
    NEXT_UID.fetch_add(1, Ordering::Relaxed)
}

new_key_type! {
    /// Generation-checked identity of a live texture
    pub struct TextureKey;
}

/// Live textures; a key stops resolving once its texture is dropped
pub(crate) type TextureArena = Arc<Mutex<SlotMap<TextureKey, NativeHandle>>>;

//! Framebuffer objects and the per-context framebuffer cache.
//!
//! Framebuffers are keyed by the identity of their attachments (arena key,
//! mip level, layer), never by texture contents. The cache holds no
//! ownership of the attachments: an entry whose texture key no longer
//! resolves in the arena is outdated and gets destroyed by
//! [`FramebufferCache::cleanup_outdated`].

use std::hash::{Hash, Hasher};
use std::sync::Arc;
use rustc_hash::{FxHashMap, FxHasher};
use smallvec::SmallVec;
use crate::driver::{native, Driver, NativeHandle, SurfaceInfo};
use crate::error::{Error, Result};
use crate::pipeline::MAX_COLOR_ATTACHMENTS;
use crate::resource::{next_uid, TextureArena, TextureKey, TextureView};
use crate::state_tables;

/// Identity of one attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttachmentId {
    pub key: TextureKey,
    pub level: u32,
    pub layer: Option<u32>,
}

impl AttachmentId {
    pub fn of(view: &TextureView) -> Self {
        Self {
            key: view.texture.key(),
            level: view.level,
            layer: view.layer,
        }
    }
}

/// What a render pass renders into
#[derive(Debug, Clone, Copy)]
pub enum FramebufferTarget<'a> {
    /// The context's window back buffer
    Default,
    /// Texture views in render-pass attachment order
    Attachments(&'a [TextureView]),
}

/// A native framebuffer (or the window back buffer when `handle == 0`)
#[derive(Debug)]
pub struct Framebuffer {
    uid: u64,
    handle: NativeHandle,
    width: u32,
    height: u32,
    layered: bool,
    color_attachments: SmallVec<[AttachmentId; MAX_COLOR_ATTACHMENTS]>,
    depth_stencil: Option<AttachmentId>,
}

impl Framebuffer {
    fn default_for(surface: SurfaceInfo) -> Self {
        Self {
            uid: next_uid(),
            handle: 0,
            width: surface.width,
            height: surface.height,
            layered: false,
            color_attachments: SmallVec::new(),
            depth_stencil: None,
        }
    }

    pub fn uid(&self) -> u64 {
        self.uid
    }

    pub fn handle(&self) -> NativeHandle {
        self.handle
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_default(&self) -> bool {
        self.handle == 0
    }

    pub fn is_layered(&self) -> bool {
        self.layered
    }

    pub fn color_attachments(&self) -> &[AttachmentId] {
        &self.color_attachments
    }

    pub fn depth_stencil_attachment(&self) -> Option<AttachmentId> {
        self.depth_stencil
    }

    fn same_attachments(&self, colors: &[AttachmentId], depth_stencil: Option<AttachmentId>) -> bool {
        self.color_attachments.as_slice() == colors && self.depth_stencil == depth_stencil
    }

    /// Whether an attachment texture has been destroyed
    fn is_outdated(&self, arena: &TextureArena) -> bool {
        let arena = arena.lock();
        self.color_attachments
            .iter()
            .chain(self.depth_stencil.iter())
            .any(|id| !arena.contains_key(id.key))
    }
}

/// Size and layering shared by all attachments of a framebuffer
struct AttachmentSet {
    colors: SmallVec<[AttachmentId; MAX_COLOR_ATTACHMENTS]>,
    depth_stencil: Option<AttachmentId>,
    width: u32,
    height: u32,
    layered: bool,
}

impl AttachmentSet {
    fn from_views(views: &[TextureView]) -> std::result::Result<Self, String> {
        let first = views.first().ok_or_else(|| "framebuffer without attachments".to_string())?;
        if let Some((index, view)) = views.iter().enumerate().find(|(_, v)| v.level >= v.texture.mip_levels()) {
            return Err(format!("attachment {} level {} of {}", index, view.level, view.texture.mip_levels()));
        }
        let (width, height, _) = first.texture.level_extent(first.level);
        let layered = first.is_layered();

        let mut colors = SmallVec::new();
        let mut depth_stencil = None;
        for (index, view) in views.iter().enumerate() {
            let texture = &view.texture;
            let (w, h, layers) = texture.level_extent(view.level);
            if (w, h) != (width, height) {
                return Err(format!(
                    "attachment {} is {}x{}, expected {}x{}",
                    index, w, h, width, height
                ));
            }
            if let Some(layer) = view.layer {
                if layer >= layers {
                    return Err(format!("attachment {} layer {} of {}", index, layer, layers));
                }
            }
            if view.is_layered() != layered {
                return Err("layered and single-layer attachments cannot be mixed".to_string());
            }

            if texture.format().is_color() {
                if colors.len() == MAX_COLOR_ATTACHMENTS {
                    return Err(format!("more than {} color attachments", MAX_COLOR_ATTACHMENTS));
                }
                colors.push(AttachmentId::of(view));
            } else if depth_stencil.replace(AttachmentId::of(view)).is_some() {
                return Err("more than one depth/stencil attachment".to_string());
            }
        }

        Ok(Self { colors, depth_stencil, width, height, layered })
    }

    fn hash_key(&self) -> u64 {
        let mut hasher = FxHasher::default();
        self.colors.hash(&mut hasher);
        self.depth_stencil.hash(&mut hasher);
        hasher.finish()
    }
}

/// Per-context memo of framebuffer objects
#[derive(Default)]
pub struct FramebufferCache {
    buckets: FxHashMap<u64, SmallVec<[Arc<Framebuffer>; 1]>>,
    default: Option<Arc<Framebuffer>>,
}

impl FramebufferCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached attachment framebuffers (the default one excluded)
    pub fn len(&self) -> usize {
        self.buckets.values().map(|bucket| bucket.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached framebuffer for `target`, created on a miss
    pub(crate) fn get_framebuffer(
        &mut self,
        gl: &mut dyn Driver,
        target: FramebufferTarget<'_>,
        surface: SurfaceInfo,
    ) -> Result<Arc<Framebuffer>> {
        let views = match target {
            FramebufferTarget::Default => return Ok(self.default_framebuffer(surface)),
            FramebufferTarget::Attachments(views) => views,
        };

        let set = match AttachmentSet::from_views(views) {
            Ok(set) => set,
            Err(reason) => {
                crate::rhi_error!("hearth::FramebufferCache", "Invalid attachment set: {}", reason);
                return Err(Error::InvalidResource(reason));
            }
        };

        let key = set.hash_key();
        if let Some(found) = self
            .buckets
            .get(&key)
            .and_then(|bucket| bucket.iter().find(|fb| fb.same_attachments(&set.colors, set.depth_stencil)))
        {
            return Ok(Arc::clone(found));
        }

        let framebuffer = Arc::new(Self::create(gl, views, set)?);
        self.buckets.entry(key).or_default().push(Arc::clone(&framebuffer));
        Ok(framebuffer)
    }

    fn default_framebuffer(&mut self, surface: SurfaceInfo) -> Arc<Framebuffer> {
        if let Some(fb) = &self.default {
            if fb.width == surface.width && fb.height == surface.height {
                return Arc::clone(fb);
            }
        }
        let fb = Arc::new(Framebuffer::default_for(surface));
        self.default = Some(Arc::clone(&fb));
        fb
    }

    fn create(gl: &mut dyn Driver, views: &[TextureView], set: AttachmentSet) -> Result<Framebuffer> {
        let handle = gl.create_framebuffer();
        if handle == 0 {
            crate::rhi_bail!("hearth::FramebufferCache", "Driver refused to create a framebuffer");
        }

        let mut color_slot = 0;
        for view in views {
            let texture = &view.texture;
            let attachment = if texture.format().is_color() {
                color_slot += 1;
                native::COLOR_ATTACHMENT0 + color_slot - 1
            } else {
                state_tables::depth_stencil_attachment(texture.format().aspect())
            };
            match view.layer {
                Some(layer) => gl.framebuffer_texture_layer(handle, attachment, texture.handle(), view.level, layer),
                None => gl.framebuffer_texture(handle, attachment, texture.handle(), view.level),
            }
        }

        let status = gl.check_framebuffer_status(handle);
        if status != native::FRAMEBUFFER_COMPLETE {
            gl.delete_framebuffer(handle);
            crate::rhi_bail!("hearth::FramebufferCache", "Framebuffer incomplete (status {:#x})", status);
        }

        crate::rhi_debug!(
            "hearth::FramebufferCache",
            "Created framebuffer {} ({}x{}, {} color, depth/stencil: {})",
            handle,
            set.width,
            set.height,
            set.colors.len(),
            set.depth_stencil.is_some()
        );

        Ok(Framebuffer {
            uid: next_uid(),
            handle,
            width: set.width,
            height: set.height,
            layered: set.layered,
            color_attachments: set.colors,
            depth_stencil: set.depth_stencil,
        })
    }

    /// Destroy every framebuffer with a destroyed attachment; returns how many
    pub(crate) fn cleanup_outdated(&mut self, gl: &mut dyn Driver, arena: &TextureArena) -> usize {
        let mut removed = 0;
        self.buckets.retain(|_, bucket| {
            bucket.retain(|fb| {
                if fb.is_outdated(arena) {
                    gl.delete_framebuffer(fb.handle);
                    removed += 1;
                    false
                } else {
                    true
                }
            });
            !bucket.is_empty()
        });
        if removed > 0 {
            crate::rhi_debug!("hearth::FramebufferCache", "Removed {} outdated framebuffer(s)", removed);
        }
        removed
    }

    /// Destroy everything (the owning context must be current)
    pub(crate) fn destroy_all(&mut self, gl: &mut dyn Driver) {
        for (_, bucket) in self.buckets.drain() {
            for fb in bucket {
                gl.delete_framebuffer(fb.handle);
            }
        }
        self.default = None;
    }
}

#[cfg(test)]
#[path = "framebuffer_tests.rs"]
mod tests;

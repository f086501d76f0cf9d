//! Render pass model: ordered attachments plus ordered subpasses.
//!
//! Attachments are numbered by declaration order. Color attachments map to
//! framebuffer color slots in that same order (skipping depth/stencil ones),
//! so subpass references translate directly into draw-buffer lists.

use smallvec::SmallVec;
use crate::error::{Error, Result};
use crate::pipeline::MAX_COLOR_ATTACHMENTS;
use crate::resource::{next_uid, TextureFormat};

/// What happens to an attachment's contents when first used in a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadOp {
    Load,
    Clear,
    DontCare,
}

/// What happens to an attachment's contents after its last use in a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Store,
    DontCare,
}

/// Clear value of an attachment; the variant must match the format's clear kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    Color([f32; 4]),
    ColorInt([i32; 4]),
    ColorUint([u32; 4]),
    DepthStencil { depth: f32, stencil: u32 },
}

impl Default for ClearValue {
    fn default() -> Self {
        ClearValue::Color([0.0, 0.0, 0.0, 1.0])
    }
}

/// One attachment of a render pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttachmentDesc {
    pub format: TextureFormat,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
    pub clear_value: ClearValue,
}

impl AttachmentDesc {
    /// Loaded and stored, nothing cleared
    pub fn new(format: TextureFormat) -> Self {
        let clear_value = if format.is_color() {
            ClearValue::default()
        } else {
            ClearValue::DepthStencil { depth: 1.0, stencil: 0 }
        };
        Self {
            format,
            load_op: LoadOp::Load,
            store_op: StoreOp::Store,
            clear_value,
        }
    }

    /// Cleared on first use
    pub fn cleared(format: TextureFormat, clear_value: ClearValue) -> Self {
        Self {
            load_op: LoadOp::Clear,
            clear_value,
            ..Self::new(format)
        }
    }

    pub fn with_load_op(mut self, load_op: LoadOp) -> Self {
        self.load_op = load_op;
        self
    }

    pub fn with_store_op(mut self, store_op: StoreOp) -> Self {
        self.store_op = store_op;
        self
    }
}

/// Attachments written by one subpass (indices into the pass's attachment list)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubpassDesc {
    pub color_attachments: SmallVec<[u32; MAX_COLOR_ATTACHMENTS]>,
    pub depth_stencil_attachment: Option<u32>,
}

impl SubpassDesc {
    pub fn new(color_attachments: &[u32]) -> Self {
        Self {
            color_attachments: SmallVec::from_slice(color_attachments),
            depth_stencil_attachment: None,
        }
    }

    pub fn with_depth_stencil(mut self, attachment: u32) -> Self {
        self.depth_stencil_attachment = Some(attachment);
        self
    }

    /// Every attachment index this subpass references
    pub fn references(&self) -> impl Iterator<Item = u32> + '_ {
        self.color_attachments.iter().copied().chain(self.depth_stencil_attachment)
    }
}

/// Render pass creation parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderPassDesc {
    pub attachments: Vec<AttachmentDesc>,
    pub subpasses: Vec<SubpassDesc>,
}

/// Subpasses in which an attachment is used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AttachmentRange {
    /// `None` when no subpass references the attachment
    pub first_subpass: Option<u32>,
    pub last_subpass: Option<u32>,
}

impl AttachmentRange {
    pub fn is_first(&self, subpass: u32) -> bool {
        self.first_subpass == Some(subpass)
    }

    pub fn is_last(&self, subpass: u32) -> bool {
        self.last_subpass == Some(subpass)
    }
}

/// Validated render pass
#[derive(Debug)]
pub struct RenderPass {
    uid: u64,
    desc: RenderPassDesc,
    /// Framebuffer color slot of each attachment (`None` for depth/stencil)
    color_slots: SmallVec<[Option<u32>; MAX_COLOR_ATTACHMENTS]>,
    depth_stencil: Option<u32>,
}

impl RenderPass {
    pub(crate) fn new(desc: RenderPassDesc) -> Result<Self> {
        if let Err(reason) = Self::validate(&desc) {
            crate::rhi_error!("hearth::RenderPass", "Invalid render pass: {}", reason);
            return Err(Error::InvalidResource(reason));
        }

        let mut color_slots = SmallVec::new();
        let mut depth_stencil = None;
        let mut next_slot = 0;
        for (index, attachment) in desc.attachments.iter().enumerate() {
            if attachment.format.is_color() {
                color_slots.push(Some(next_slot));
                next_slot += 1;
            } else {
                color_slots.push(None);
                depth_stencil = Some(index as u32);
            }
        }

        Ok(Self {
            uid: next_uid(),
            desc,
            color_slots,
            depth_stencil,
        })
    }

    fn validate(desc: &RenderPassDesc) -> std::result::Result<(), String> {
        if desc.subpasses.is_empty() {
            return Err("a render pass needs at least one subpass".to_string());
        }
        let colors = desc.attachments.iter().filter(|a| a.format.is_color()).count();
        if colors > MAX_COLOR_ATTACHMENTS {
            return Err(format!("{} color attachments, at most {}", colors, MAX_COLOR_ATTACHMENTS));
        }
        if desc.attachments.len() - colors > 1 {
            return Err("at most one depth/stencil attachment".to_string());
        }

        for (index, subpass) in desc.subpasses.iter().enumerate() {
            let mut seen: SmallVec<[u32; 9]> = SmallVec::new();
            for reference in subpass.references() {
                if reference as usize >= desc.attachments.len() {
                    return Err(format!(
                        "subpass {} references attachment {} of {}",
                        index,
                        reference,
                        desc.attachments.len()
                    ));
                }
                if seen.contains(&reference) {
                    return Err(format!("subpass {} references attachment {} twice", index, reference));
                }
                seen.push(reference);
            }
            if let Some(&bad) = subpass
                .color_attachments
                .iter()
                .find(|&&r| !desc.attachments[r as usize].format.is_color())
            {
                return Err(format!("subpass {} uses depth attachment {} as color", index, bad));
            }
            if let Some(ds) = subpass.depth_stencil_attachment {
                if desc.attachments[ds as usize].format.is_color() {
                    return Err(format!("subpass {} uses color attachment {} as depth/stencil", index, ds));
                }
            }
        }
        Ok(())
    }

    pub fn uid(&self) -> u64 {
        self.uid
    }

    pub fn desc(&self) -> &RenderPassDesc {
        &self.desc
    }

    pub fn attachment(&self, index: u32) -> &AttachmentDesc {
        &self.desc.attachments[index as usize]
    }

    pub fn attachment_count(&self) -> usize {
        self.desc.attachments.len()
    }

    pub fn subpass(&self, index: u32) -> &SubpassDesc {
        &self.desc.subpasses[index as usize]
    }

    pub fn subpass_count(&self) -> u32 {
        self.desc.subpasses.len() as u32
    }

    pub fn color_attachment_count(&self) -> usize {
        self.color_slots.iter().flatten().count()
    }

    /// Framebuffer color slot of attachment `index`
    pub fn color_slot(&self, index: u32) -> Option<u32> {
        self.color_slots[index as usize]
    }

    /// Index of the depth/stencil attachment, if any
    pub fn depth_stencil_attachment(&self) -> Option<u32> {
        self.depth_stencil
    }

    /// First and last subpass using each attachment
    pub fn attachment_ranges(&self) -> SmallVec<[AttachmentRange; 9]> {
        let mut ranges: SmallVec<[AttachmentRange; 9]> =
            SmallVec::from_elem(AttachmentRange::default(), self.desc.attachments.len());
        for (index, subpass) in self.desc.subpasses.iter().enumerate() {
            for reference in subpass.references() {
                let range = &mut ranges[reference as usize];
                if range.first_subpass.is_none() {
                    range.first_subpass = Some(index as u32);
                }
                range.last_subpass = Some(index as u32);
            }
        }
        ranges
    }
}

#[cfg(test)]
#[path = "render_pass_tests.rs"]
mod tests;

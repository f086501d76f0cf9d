//! Pool of transient render targets.
//!
//! Textures are recycled by exact description. A released texture waits in
//! its free list until a later acquire with the same description picks it up,
//! or until it has been idle for more frames than `trim` allows.

use std::sync::Arc;
use rustc_hash::FxHashMap;
use crate::device::Device;
use crate::error::Result;
use crate::resource::{Texture, TextureDesc};

/// Pool counters; `created`, `reused` and `destroyed` accumulate over the pool lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub created: u64,
    pub reused: u64,
    pub destroyed: u64,
    /// Textures currently handed out
    pub active: usize,
    /// Textures waiting in the free lists
    pub free: usize,
}

struct PooledTarget {
    texture: Arc<Texture>,
    /// `trim` calls survived without being reused
    idle_frames: u32,
}

/// Free lists of render targets keyed by their description
#[derive(Default)]
pub struct RenderTargetPool {
    free: FxHashMap<TextureDesc, Vec<PooledTarget>>,
    active: usize,
    created: u64,
    reused: u64,
    destroyed: u64,
}

impl RenderTargetPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// A texture matching `desc`, reused when one is free and created otherwise
    pub fn acquire(&mut self, device: &Device, desc: &TextureDesc) -> Result<Arc<Texture>> {
        if let Some(target) = self.free.get_mut(desc).and_then(Vec::pop) {
            self.reused += 1;
            self.active += 1;
            return Ok(target.texture);
        }

        let texture = device.create_texture(desc)?;
        crate::rhi_debug!(
            "hearth::RenderTargetPool",
            "New transient {:?} {}x{} (texture {})",
            desc.format,
            desc.width,
            desc.height,
            texture.uid()
        );
        self.created += 1;
        self.active += 1;
        Ok(texture)
    }

    /// Hand a texture back for reuse
    pub fn release(&mut self, texture: Arc<Texture>) {
        debug_assert!(self.active > 0, "release without a matching acquire");
        self.active = self.active.saturating_sub(1);
        self.free
            .entry(texture.desc().clone())
            .or_default()
            .push(PooledTarget { texture, idle_frames: 0 });
    }

    /// Age every free texture by one frame and drop those idle for more than
    /// `max_idle_frames`; returns how many were dropped
    pub fn trim(&mut self, max_idle_frames: u32) -> usize {
        let mut dropped = 0;
        for list in self.free.values_mut() {
            for target in list.iter_mut() {
                target.idle_frames += 1;
            }
            let before = list.len();
            list.retain(|t| t.idle_frames <= max_idle_frames);
            dropped += before - list.len();
        }
        self.free.retain(|_, list| !list.is_empty());

        if dropped > 0 {
            self.destroyed += dropped as u64;
            crate::rhi_debug!("hearth::RenderTargetPool", "Trimmed {} idle render targets", dropped);
        }
        dropped
    }

    /// Drop every free texture
    pub fn clear(&mut self) {
        let count: usize = self.free.values().map(Vec::len).sum();
        self.destroyed += count as u64;
        self.free.clear();
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            created: self.created,
            reused: self.reused,
            destroyed: self.destroyed,
            active: self.active,
            free: self.free.values().map(Vec::len).sum(),
        }
    }
}

#[cfg(test)]
#[path = "render_target_pool_tests.rs"]
mod tests;

//! Copies, clears, uploads, readbacks, mapping and sparse commitment.
//!
//! Pixel transfers carry an explicit [`PixelLayout`]; the pack and unpack
//! parameters are diffed against what the context last set, like any other
//! state.

use std::ptr::NonNull;
use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};
use crate::driver::{native, Driver, NativeEnum, PixelSource, PixelTarget, Region3D};
use crate::render_pass::{ClearValue, FramebufferTarget};
use crate::resource::{Buffer, Filter, Sampler, Texture};
use crate::state_tables;
use super::binding_state::PixelStore;
use super::immediate_context::{ImmediateContext, Rect};
use crate::device::CoordinateConvention;

/// Row and image pitch of client-side or buffer-side pixel data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelLayout {
    /// Row start alignment in bytes (1, 2, 4 or 8)
    pub alignment: u32,
    /// Pixels per row; 0 = the region width
    pub row_length: u32,
    /// Rows per image; 0 = the region height
    pub image_height: u32,
}

impl Default for PixelLayout {
    fn default() -> Self {
        Self { alignment: 4, row_length: 0, image_height: 0 }
    }
}

impl PixelLayout {
    /// Tightly packed rows
    pub fn packed() -> Self {
        Self { alignment: 1, row_length: 0, image_height: 0 }
    }

    /// Bytes spanned by `region` for pixels of `bytes_per_pixel`
    pub fn required_size(&self, region: &Region3D, bytes_per_pixel: u32) -> u64 {
        if region.width == 0 || region.height == 0 || region.depth == 0 {
            return 0;
        }
        let alignment = u64::from(self.alignment.max(1));
        let row_pixels = u64::from(if self.row_length != 0 { self.row_length } else { region.width });
        let row_bytes = (row_pixels * u64::from(bytes_per_pixel)).div_ceil(alignment) * alignment;
        let rows = u64::from(if self.image_height != 0 { self.image_height } else { region.height });
        row_bytes * rows * u64::from(region.depth - 1)
            + row_bytes * u64::from(region.height - 1)
            + u64::from(region.width) * u64::from(bytes_per_pixel)
    }
}

/// CPU access direction of a mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapAccess {
    Read,
    Write,
    ReadWrite,
}

bitflags! {
    /// Mapping behavior
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MapFlags: u32 {
        /// Previous contents of the range may be discarded
        const INVALIDATE_RANGE = native::MAP_INVALIDATE_RANGE_BIT;
        /// Previous contents of the whole buffer may be discarded
        const INVALIDATE_BUFFER = native::MAP_INVALIDATE_BUFFER_BIT;
        /// Writes become visible only through `flush_mapped_range`
        const FLUSH_EXPLICIT = native::MAP_FLUSH_EXPLICIT_BIT;
        /// Skip synchronization with pending GPU work
        const UNSYNCHRONIZED = native::MAP_UNSYNCHRONIZED_BIT;
        /// Mapping stays valid while the GPU uses the buffer
        const PERSISTENT = native::MAP_PERSISTENT_BIT;
        const COHERENT = native::MAP_COHERENT_BIT;
    }
}

bitflags! {
    /// Planes copied by `blit_framebuffer`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BlitMask: u32 {
        const COLOR = native::COLOR_BUFFER_BIT;
        const DEPTH = native::DEPTH_BUFFER_BIT;
        const STENCIL = native::STENCIL_BUFFER_BIT;
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct DepthStencilClear {
    depth: f32,
    stencil: u32,
}

/// Log and reject a transfer whose arguments are out of range
macro_rules! reject_if {
    ($cond:expr, $($arg:tt)+) => {
        if $cond {
            debug_assert!(false, $($arg)+);
            crate::rhi_error!("hearth::ImmediateContext", $($arg)+);
            return Default::default();
        }
    };
}

fn apply_pixel_store(gl: &mut dyn Driver, store: &mut PixelStore, layout: PixelLayout, names: [NativeEnum; 3]) {
    if store.alignment != layout.alignment {
        gl.pixel_store_i(names[0], layout.alignment as i32);
        store.alignment = layout.alignment;
    }
    if store.row_length != layout.row_length {
        gl.pixel_store_i(names[1], layout.row_length as i32);
        store.row_length = layout.row_length;
    }
    if store.image_height != layout.image_height {
        gl.pixel_store_i(names[2], layout.image_height as i32);
        store.image_height = layout.image_height;
    }
}

const UNPACK_NAMES: [NativeEnum; 3] = [native::UNPACK_ALIGNMENT, native::UNPACK_ROW_LENGTH, native::UNPACK_IMAGE_HEIGHT];
const PACK_NAMES: [NativeEnum; 3] = [native::PACK_ALIGNMENT, native::PACK_ROW_LENGTH, native::PACK_IMAGE_HEIGHT];

fn region_fits(texture: &Texture, level: u32, region: &Region3D) -> bool {
    if level >= texture.mip_levels() {
        return false;
    }
    let (w, h, d) = texture.level_extent(level);
    region.x >= 0
        && region.y >= 0
        && region.z >= 0
        && region.x as u64 + u64::from(region.width) <= u64::from(w)
        && region.y as u64 + u64::from(region.height) <= u64::from(h)
        && region.z as u64 + u64::from(region.depth) <= u64::from(d)
}

impl ImmediateContext {
    // ===== BUFFERS =====

    pub fn write_buffer(&mut self, buffer: &Buffer, offset: u64, data: &[u8]) {
        reject_if!(
            offset + data.len() as u64 > buffer.size(),
            "write of {} bytes at {} overruns buffer {} ({} bytes)",
            data.len(),
            offset,
            buffer.uid(),
            buffer.size()
        );
        if data.is_empty() {
            return;
        }
        self.with_gl(|_, gl| gl.buffer_sub_data(buffer.handle(), offset, data));
    }

    pub fn read_buffer(&mut self, buffer: &Buffer, offset: u64, out: &mut [u8]) {
        reject_if!(
            offset + out.len() as u64 > buffer.size(),
            "read of {} bytes at {} overruns buffer {} ({} bytes)",
            out.len(),
            offset,
            buffer.uid(),
            buffer.size()
        );
        if out.is_empty() {
            return;
        }
        self.with_gl(|_, gl| gl.get_buffer_sub_data(buffer.handle(), offset, out));
    }

    pub fn copy_buffer(&mut self, src: &Buffer, src_offset: u64, dst: &Buffer, dst_offset: u64, size: u64) {
        reject_if!(
            src_offset + size > src.size() || dst_offset + size > dst.size(),
            "buffer copy of {} bytes out of range",
            size
        );
        reject_if!(
            src.uid() == dst.uid() && src_offset < dst_offset + size && dst_offset < src_offset + size,
            "overlapping copy inside buffer {}",
            src.uid()
        );
        if size == 0 {
            return;
        }
        self.with_gl(|_, gl| gl.copy_buffer_sub_data(src.handle(), dst.handle(), src_offset, dst_offset, size));
    }

    /// Fill a range with a repeated 32-bit value (`offset` and `size` 4-byte aligned)
    pub fn clear_buffer(&mut self, buffer: &Buffer, offset: u64, size: u64, value: u32) {
        reject_if!(offset % 4 != 0 || size % 4 != 0, "buffer clear range must be 4-byte aligned");
        reject_if!(offset + size > buffer.size(), "buffer clear out of range");
        if size == 0 {
            return;
        }
        self.with_gl(|_, gl| {
            gl.clear_buffer_sub_data(
                buffer.handle(),
                native::R32UI,
                offset,
                size,
                native::RED_INTEGER,
                native::UNSIGNED_INT,
                bytemuck::bytes_of(&value),
            )
        });
    }

    // ===== MAPPING =====

    /// Map a buffer range; `None` when the buffer's memory access forbids it
    pub fn map_buffer(
        &mut self,
        buffer: &Buffer,
        offset: u64,
        size: u64,
        access: MapAccess,
        flags: MapFlags,
    ) -> Option<NonNull<u8>> {
        reject_if!(size == 0 || offset + size > buffer.size(), "map range out of bounds");
        let storage = buffer.desc().access.storage_flags();
        let mut bits = flags.bits();
        match access {
            MapAccess::Read => bits |= native::MAP_READ_BIT,
            MapAccess::Write => bits |= native::MAP_WRITE_BIT,
            MapAccess::ReadWrite => bits |= native::MAP_READ_BIT | native::MAP_WRITE_BIT,
        }
        let required = bits
            & (native::MAP_READ_BIT | native::MAP_WRITE_BIT | native::MAP_PERSISTENT_BIT | native::MAP_COHERENT_BIT);
        reject_if!(
            required & !storage != 0,
            "buffer {} ({:?}) cannot be mapped for {:?} with {:?}",
            buffer.uid(),
            buffer.desc().access,
            access,
            flags
        );
        reject_if!(
            access == MapAccess::Read
                && flags.intersects(MapFlags::INVALIDATE_RANGE | MapFlags::INVALIDATE_BUFFER | MapFlags::UNSYNCHRONIZED),
            "read mappings cannot invalidate or skip synchronization"
        );
        reject_if!(
            flags.contains(MapFlags::FLUSH_EXPLICIT) && access == MapAccess::Read,
            "explicit flushes need a write mapping"
        );

        let ptr = self.with_gl(|_, gl| gl.map_buffer_range(buffer.handle(), offset, size, bits));
        if ptr.is_none() {
            crate::rhi_error!("hearth::ImmediateContext", "Driver failed to map buffer {}", buffer.uid());
        }
        ptr
    }

    /// Make writes to an explicitly flushed mapping visible (range relative to the mapping)
    pub fn flush_mapped_range(&mut self, buffer: &Buffer, offset: u64, size: u64) {
        self.with_gl(|_, gl| gl.flush_mapped_buffer_range(buffer.handle(), offset, size));
    }

    /// Returns `false` when the contents were lost while mapped
    pub fn unmap_buffer(&mut self, buffer: &Buffer) -> bool {
        let intact = self.with_gl(|_, gl| gl.unmap_buffer(buffer.handle()));
        if !intact {
            crate::rhi_warn!("hearth::ImmediateContext", "Buffer {} contents lost while mapped", buffer.uid());
        }
        intact
    }

    // ===== TEXTURES =====

    fn unbind_pixel_buffer(&mut self, gl: &mut dyn Driver, unpack: bool) {
        let (store, target) = if unpack {
            (&mut self.state.unpack, native::PIXEL_UNPACK_BUFFER)
        } else {
            (&mut self.state.pack, native::PIXEL_PACK_BUFFER)
        };
        if store.buffer != 0 {
            gl.bind_buffer(target, 0);
            store.buffer = 0;
        }
    }

    fn bind_pixel_buffer(&mut self, gl: &mut dyn Driver, unpack: bool, buffer: &Buffer) {
        let (store, target) = if unpack {
            (&mut self.state.unpack, native::PIXEL_UNPACK_BUFFER)
        } else {
            (&mut self.state.pack, native::PIXEL_PACK_BUFFER)
        };
        if store.buffer != buffer.handle() {
            gl.bind_buffer(target, buffer.handle());
            store.buffer = buffer.handle();
        }
    }

    /// Upload client pixels into a texture region
    pub fn write_texture(&mut self, texture: &Texture, level: u32, region: Region3D, data: &[u8], layout: PixelLayout) {
        reject_if!(!region_fits(texture, level, &region), "texture write region out of bounds");
        let info = state_tables::format_info(texture.format());
        let required = layout.required_size(&region, info.bytes_per_pixel);
        reject_if!(
            (data.len() as u64) < required,
            "texture write needs {} bytes, {} given",
            required,
            data.len()
        );
        self.with_gl(|ctx, gl| {
            ctx.unbind_pixel_buffer(gl, true);
            apply_pixel_store(gl, &mut ctx.state.unpack, layout, UNPACK_NAMES);
            gl.texture_sub_image(
                texture.handle(),
                level,
                region,
                info.pixel_format,
                info.pixel_type,
                PixelSource::Slice(data),
            );
        });
    }

    /// Read a texture region back into client memory
    pub fn read_texture(&mut self, texture: &Texture, level: u32, region: Region3D, out: &mut [u8], layout: PixelLayout) {
        reject_if!(!region_fits(texture, level, &region), "texture read region out of bounds");
        let info = state_tables::format_info(texture.format());
        let required = layout.required_size(&region, info.bytes_per_pixel);
        reject_if!(
            (out.len() as u64) < required,
            "texture read needs {} bytes, {} given",
            required,
            out.len()
        );
        self.with_gl(|ctx, gl| {
            ctx.unbind_pixel_buffer(gl, false);
            apply_pixel_store(gl, &mut ctx.state.pack, layout, PACK_NAMES);
            gl.get_texture_sub_image(
                texture.handle(),
                level,
                region,
                info.pixel_format,
                info.pixel_type,
                PixelTarget::Slice(out),
            );
        });
    }

    /// Upload from a buffer (bound as the pixel unpack buffer)
    pub fn copy_buffer_to_texture(
        &mut self,
        buffer: &Buffer,
        offset: u64,
        texture: &Texture,
        level: u32,
        region: Region3D,
        layout: PixelLayout,
    ) {
        reject_if!(!region_fits(texture, level, &region), "texture write region out of bounds");
        let info = state_tables::format_info(texture.format());
        reject_if!(
            offset + layout.required_size(&region, info.bytes_per_pixel) > buffer.size(),
            "buffer {} too small for the upload",
            buffer.uid()
        );
        self.with_gl(|ctx, gl| {
            ctx.bind_pixel_buffer(gl, true, buffer);
            apply_pixel_store(gl, &mut ctx.state.unpack, layout, UNPACK_NAMES);
            gl.texture_sub_image(
                texture.handle(),
                level,
                region,
                info.pixel_format,
                info.pixel_type,
                PixelSource::UnpackBufferOffset(offset),
            );
        });
    }

    /// Read back into a buffer (bound as the pixel pack buffer)
    pub fn copy_texture_to_buffer(
        &mut self,
        texture: &Texture,
        level: u32,
        region: Region3D,
        buffer: &Buffer,
        offset: u64,
        layout: PixelLayout,
    ) {
        reject_if!(!region_fits(texture, level, &region), "texture read region out of bounds");
        let info = state_tables::format_info(texture.format());
        reject_if!(
            offset + layout.required_size(&region, info.bytes_per_pixel) > buffer.size(),
            "buffer {} too small for the readback",
            buffer.uid()
        );
        self.with_gl(|ctx, gl| {
            ctx.bind_pixel_buffer(gl, false, buffer);
            apply_pixel_store(gl, &mut ctx.state.pack, layout, PACK_NAMES);
            gl.get_texture_sub_image(
                texture.handle(),
                level,
                region,
                info.pixel_format,
                info.pixel_type,
                PixelTarget::PackBufferOffset(offset),
            );
        });
    }

    /// Texel copy between two textures of compatible formats
    #[allow(clippy::too_many_arguments)]
    pub fn copy_texture(
        &mut self,
        src: &Texture,
        src_level: u32,
        src_origin: [i32; 3],
        dst: &Texture,
        dst_level: u32,
        dst_origin: [i32; 3],
        extent: [u32; 3],
    ) {
        let src_region = Region3D {
            x: src_origin[0],
            y: src_origin[1],
            z: src_origin[2],
            width: extent[0],
            height: extent[1],
            depth: extent[2],
        };
        let dst_region = Region3D {
            x: dst_origin[0],
            y: dst_origin[1],
            z: dst_origin[2],
            ..src_region
        };
        reject_if!(
            !region_fits(src, src_level, &src_region) || !region_fits(dst, dst_level, &dst_region),
            "texture copy region out of bounds"
        );
        reject_if!(
            src.format().bytes_per_pixel() != dst.format().bytes_per_pixel(),
            "cannot copy {:?} into {:?}",
            src.format(),
            dst.format()
        );
        self.with_gl(|_, gl| {
            gl.copy_image_sub_data(
                src.handle(),
                src.target(),
                src_level,
                src_origin,
                dst.handle(),
                dst.target(),
                dst_level,
                dst_origin,
                extent,
            )
        });
    }

    /// Clear a texture level (or a region of it) to `value`
    pub fn clear_texture(&mut self, texture: &Texture, level: u32, region: Option<Region3D>, value: ClearValue) {
        reject_if!(level >= texture.mip_levels(), "texture clear level {} out of range", level);
        let region = region.unwrap_or_else(|| {
            let (width, height, depth) = texture.level_extent(level);
            Region3D { x: 0, y: 0, z: 0, width, height, depth }
        });
        reject_if!(!region_fits(texture, level, &region), "texture clear region out of bounds");

        let format = texture.format();
        let depth_stencil;
        let (pixel_format, pixel_type, bytes): (NativeEnum, NativeEnum, &[u8]) = match value {
            ClearValue::Color(ref v) => (native::RGBA, native::FLOAT, bytemuck::cast_slice(v)),
            ClearValue::ColorInt(ref v) => (native::RGBA_INTEGER, native::INT, bytemuck::cast_slice(v)),
            ClearValue::ColorUint(ref v) => (native::RGBA_INTEGER, native::UNSIGNED_INT, bytemuck::cast_slice(v)),
            ClearValue::DepthStencil { depth, stencil } => {
                depth_stencil = DepthStencilClear { depth, stencil };
                if format.has_depth() && format.has_stencil() {
                    (native::DEPTH_STENCIL, native::FLOAT_32_UNSIGNED_INT_24_8_REV, bytemuck::bytes_of(&depth_stencil))
                } else if format.has_depth() {
                    (native::DEPTH_COMPONENT, native::FLOAT, bytemuck::bytes_of(&depth_stencil.depth))
                } else {
                    (native::STENCIL_INDEX, native::UNSIGNED_INT, bytemuck::bytes_of(&depth_stencil.stencil))
                }
            }
        };
        reject_if!(
            format.is_color() == matches!(value, ClearValue::DepthStencil { .. }),
            "clear value {:?} does not fit {:?}",
            value,
            format
        );
        self.with_gl(|_, gl| gl.clear_tex_sub_image(texture.handle(), level, region, pixel_format, pixel_type, bytes));
    }

    /// Rebuild levels 1.. from level 0
    pub fn generate_mipmaps(&mut self, texture: &Texture) {
        if texture.mip_levels() <= 1 {
            return;
        }
        self.with_gl(|_, gl| gl.generate_texture_mipmap(texture.handle()));
    }

    /// Copy (and scale) a rectangle between two framebuffers
    pub fn blit_framebuffer(
        &mut self,
        src: FramebufferTarget<'_>,
        src_rect: Rect,
        dst: FramebufferTarget<'_>,
        dst_rect: Rect,
        mask: BlitMask,
        filter: Filter,
    ) -> crate::error::Result<()> {
        if mask.is_empty() {
            return Ok(());
        }
        if filter == Filter::Linear && mask.intersects(BlitMask::DEPTH | BlitMask::STENCIL) {
            crate::rhi_bail!("hearth::ImmediateContext", "Depth/stencil blits must use nearest filtering");
        }
        let convention = self.coordinate_convention();
        self.with_gl(|ctx, gl| {
            let src_fb = ctx.framebuffers.get_framebuffer(gl, src, ctx.surface)?;
            let dst_fb = ctx.framebuffers.get_framebuffer(gl, dst, ctx.surface)?;
            let corners = |rect: Rect, height: u32| {
                let y = match convention {
                    CoordinateConvention::UpperLeft => height as i32 - (rect.y + rect.height as i32),
                    CoordinateConvention::LowerLeft => rect.y,
                };
                [rect.x, y, rect.x + rect.width as i32, y + rect.height as i32]
            };
            gl.blit_framebuffer(
                src_fb.handle(),
                dst_fb.handle(),
                corners(src_rect, src_fb.height()),
                corners(dst_rect, dst_fb.height()),
                mask.bits(),
                state_tables::mag_filter(filter),
            );
            Ok(())
        })
    }

    // ===== SPARSE =====

    /// Make the pages covering `region` resident; `false` (logged) for
    /// geometry the sparse page size cannot express
    pub fn commit_pages(&mut self, texture: &Texture, level: u32, region: Region3D) -> bool {
        self.page_commitment(texture, level, region, true)
    }

    /// Release the pages covering `region`; same geometry rules as [`commit_pages`](Self::commit_pages)
    pub fn uncommit_pages(&mut self, texture: &Texture, level: u32, region: Region3D) -> bool {
        self.page_commitment(texture, level, region, false)
    }

    fn page_commitment(&mut self, texture: &Texture, level: u32, region: Region3D, commit: bool) -> bool {
        let Some(page) = texture.page_size() else {
            crate::rhi_error!("hearth::ImmediateContext", "Texture {} is not sparse", texture.uid());
            return false;
        };
        if !region_fits(texture, level, &region) {
            crate::rhi_error!("hearth::ImmediateContext", "Page region {:?} out of bounds for level {}", region, level);
            return false;
        }
        let (w, h, d) = texture.level_extent(level);
        let aligned = |origin: i32, size: u32, page: u32, edge: u32| {
            let origin = origin as u32;
            origin % page == 0 && (size % page == 0 || origin + size == edge)
        };
        if !aligned(region.x, region.width, page[0], w)
            || !aligned(region.y, region.height, page[1], h)
            || !aligned(region.z, region.depth, page[2], d)
        {
            crate::rhi_error!(
                "hearth::ImmediateContext",
                "Region {:?} is not aligned to the {:?} page size",
                region,
                page
            );
            return false;
        }
        self.with_gl(|_, gl| gl.texture_page_commitment(texture.handle(), level, region, commit));
        true
    }

    // ===== BINDLESS =====

    /// Resident bindless handle, `None` without driver support
    pub fn texture_handle(&mut self, texture: &Texture, sampler: Option<&Sampler>) -> Option<u64> {
        if !self.device.caps.bindless_texture {
            crate::rhi_warn!("hearth::ImmediateContext", "Bindless textures are not supported by the driver");
            return None;
        }
        let sampler = sampler.map_or(0, |s| s.handle());
        self.with_gl(|_, gl| gl.texture_handle(texture.handle(), sampler))
    }
}

#[cfg(test)]
#[path = "transfer_tests.rs"]
mod tests;

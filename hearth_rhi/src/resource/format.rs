//! Texture formats and their aspect/clear classification.
//!
//! One enumeration covers color, depth and stencil formats; the
//! classification tables in `state_tables` decide which clear entry point
//! and attachment point a format uses.

use crate::state_tables;

/// Texel format of a texture or render target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    R8Unorm,
    Rg8Unorm,
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Bgra8Unorm,
    R16Float,
    Rg16Float,
    Rgba16Float,
    R32Float,
    Rg32Float,
    Rgba32Float,
    R8Uint,
    R16Uint,
    R32Uint,
    Rg32Uint,
    Rgba32Uint,
    R32Sint,
    Rgba32Sint,
    Rgb10A2Unorm,
    Rg11B10Float,
    D16Unorm,
    D24Unorm,
    D24UnormS8Uint,
    D32Float,
    D32FloatS8Uint,
    S8Uint,
}

impl TextureFormat {
    pub const COUNT: usize = 26;

    pub fn aspect(self) -> FormatAspect {
        state_tables::format_info(self).aspect
    }

    pub fn clear_kind(self) -> ClearKind {
        state_tables::format_info(self).clear_kind
    }

    pub fn bytes_per_pixel(self) -> u32 {
        state_tables::format_info(self).bytes_per_pixel
    }

    pub fn is_color(self) -> bool {
        self.aspect() == FormatAspect::Color
    }

    pub fn has_depth(self) -> bool {
        matches!(self.aspect(), FormatAspect::Depth | FormatAspect::DepthStencil)
    }

    pub fn has_stencil(self) -> bool {
        matches!(self.aspect(), FormatAspect::Stencil | FormatAspect::DepthStencil)
    }
}

/// Which planes a format carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatAspect {
    Color,
    Depth,
    Stencil,
    DepthStencil,
}

/// Clear entry point a format needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClearKind {
    /// Normalized / float color: clear with float values
    Float,
    /// Signed integer color
    Int,
    /// Unsigned integer color
    Uint,
    Depth,
    Stencil,
    DepthStencil,
}

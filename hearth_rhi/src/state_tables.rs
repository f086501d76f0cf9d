//! Constant translation tables from RHI enumerations to native enumerants.
//!
//! Every table is indexed by the enum discriminant, so lookups are a single
//! array access and the tables can be checked exhaustively in tests.

use crate::driver::native::*;
use crate::driver::{NativeAttribFormat, NativeEnum};
use crate::pipeline::{
    BlendFactor, BlendOp, CompareOp, CullMode, FrontFace, IndexType, PolygonMode,
    PrimitiveTopology, StencilOp, VertexFormat,
};
use crate::resource::{
    AddressMode, ClearKind, Filter, FormatAspect, MipmapMode, QueryType, ShaderStage,
    TextureFormat, TextureType,
};
use crate::resource_table::ImageAccess;

// ===== BLEND =====

const BLEND_FACTORS: [NativeEnum; BlendFactor::COUNT] = [
    ZERO,
    ONE,
    SRC_COLOR,
    ONE_MINUS_SRC_COLOR,
    DST_COLOR,
    ONE_MINUS_DST_COLOR,
    SRC_ALPHA,
    ONE_MINUS_SRC_ALPHA,
    DST_ALPHA,
    ONE_MINUS_DST_ALPHA,
    CONSTANT_COLOR,
    ONE_MINUS_CONSTANT_COLOR,
    CONSTANT_ALPHA,
    ONE_MINUS_CONSTANT_ALPHA,
    SRC_ALPHA_SATURATE,
    SRC1_COLOR,
    ONE_MINUS_SRC1_COLOR,
    SRC1_ALPHA,
    ONE_MINUS_SRC1_ALPHA,
];

const BLEND_OPS: [NativeEnum; BlendOp::COUNT] = [
    FUNC_ADD,
    FUNC_SUBTRACT,
    FUNC_REVERSE_SUBTRACT,
    MIN,
    MAX,
];

pub fn blend_factor(factor: BlendFactor) -> NativeEnum {
    BLEND_FACTORS[factor as usize]
}

pub fn blend_op(op: BlendOp) -> NativeEnum {
    BLEND_OPS[op as usize]
}

// ===== DEPTH / STENCIL =====

const COMPARE_OPS: [NativeEnum; CompareOp::COUNT] = [
    NEVER, LESS, EQUAL, LEQUAL, GREATER, NOTEQUAL, GEQUAL, ALWAYS,
];

const STENCIL_OPS: [NativeEnum; StencilOp::COUNT] = [
    KEEP, ZERO, REPLACE, INCR, DECR, INVERT, INCR_WRAP, DECR_WRAP,
];

pub fn compare_op(op: CompareOp) -> NativeEnum {
    COMPARE_OPS[op as usize]
}

pub fn stencil_op(op: StencilOp) -> NativeEnum {
    STENCIL_OPS[op as usize]
}

// ===== RASTERIZER =====

// CullMode::None has no face; callers disable culling instead
const CULL_FACES: [NativeEnum; CullMode::COUNT] = [NONE, FRONT, BACK, FRONT_AND_BACK];

pub fn cull_face(mode: CullMode) -> Option<NativeEnum> {
    match mode {
        CullMode::None => None,
        _ => Some(CULL_FACES[mode as usize]),
    }
}

pub fn front_face(face: FrontFace) -> NativeEnum {
    [CCW, CW][face as usize]
}

pub fn polygon_mode(mode: PolygonMode) -> NativeEnum {
    [FILL, LINE, POINT][mode as usize]
}

/// Capability toggled together with depth bias for a polygon mode
pub fn polygon_offset_cap(mode: PolygonMode) -> NativeEnum {
    [POLYGON_OFFSET_FILL, POLYGON_OFFSET_LINE, POLYGON_OFFSET_POINT][mode as usize]
}

// ===== INPUT ASSEMBLY =====

const TOPOLOGIES: [NativeEnum; PrimitiveTopology::COUNT] = [
    POINTS,
    LINES,
    LINE_STRIP,
    LINE_LOOP,
    TRIANGLES,
    TRIANGLE_STRIP,
    TRIANGLE_FAN,
    LINES_ADJACENCY,
    LINE_STRIP_ADJACENCY,
    TRIANGLES_ADJACENCY,
    TRIANGLE_STRIP_ADJACENCY,
    PATCHES,
];

pub fn primitive_topology(topology: PrimitiveTopology) -> NativeEnum {
    TOPOLOGIES[topology as usize]
}

pub fn index_type(ty: IndexType) -> NativeEnum {
    [UNSIGNED_SHORT, UNSIGNED_INT][ty as usize]
}

/// Native layout and byte size of a vertex format
#[derive(Debug, Clone, Copy)]
pub struct VertexFormatInfo {
    pub native: NativeAttribFormat,
    pub size: u32,
}

const fn vf(components: u32, component_type: NativeEnum, normalized: bool, integer: bool, size: u32) -> VertexFormatInfo {
    VertexFormatInfo {
        native: NativeAttribFormat { components, component_type, normalized, integer },
        size,
    }
}

const VERTEX_FORMATS: [VertexFormatInfo; VertexFormat::COUNT] = [
    vf(1, FLOAT, false, false, 4),                         // Float
    vf(2, FLOAT, false, false, 8),                         // Float2
    vf(3, FLOAT, false, false, 12),                        // Float3
    vf(4, FLOAT, false, false, 16),                        // Float4
    vf(2, HALF_FLOAT, false, false, 4),                    // Half2
    vf(4, HALF_FLOAT, false, false, 8),                    // Half4
    vf(4, UNSIGNED_BYTE, false, true, 4),                  // UByte4
    vf(4, UNSIGNED_BYTE, true, false, 4),                  // UByte4Norm
    vf(4, BYTE, true, false, 4),                           // Byte4Norm
    vf(2, SHORT, false, true, 4),                          // Short2
    vf(2, SHORT, true, false, 4),                          // Short2Norm
    vf(2, UNSIGNED_SHORT, true, false, 4),                 // UShort2Norm
    vf(4, SHORT, true, false, 8),                          // Short4Norm
    vf(1, UNSIGNED_INT, false, true, 4),                   // UInt
    vf(2, UNSIGNED_INT, false, true, 8),                   // UInt2
    vf(3, UNSIGNED_INT, false, true, 12),                  // UInt3
    vf(4, UNSIGNED_INT, false, true, 16),                  // UInt4
    vf(1, INT, false, true, 4),                            // Int
    vf(2, INT, false, true, 8),                            // Int2
    vf(3, INT, false, true, 12),                           // Int3
    vf(4, INT, false, true, 16),                           // Int4
    vf(4, UNSIGNED_INT_2_10_10_10_REV, true, false, 4),    // Rgb10A2Norm
];

pub fn vertex_format(format: VertexFormat) -> &'static VertexFormatInfo {
    &VERTEX_FORMATS[format as usize]
}

// ===== TEXTURE FORMATS =====

/// Native description and classification of a texture format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatInfo {
    pub internal_format: NativeEnum,
    pub pixel_format: NativeEnum,
    pub pixel_type: NativeEnum,
    pub aspect: FormatAspect,
    pub clear_kind: ClearKind,
    pub bytes_per_pixel: u32,
}

const fn fi(
    internal_format: NativeEnum,
    pixel_format: NativeEnum,
    pixel_type: NativeEnum,
    aspect: FormatAspect,
    clear_kind: ClearKind,
    bytes_per_pixel: u32,
) -> FormatInfo {
    FormatInfo { internal_format, pixel_format, pixel_type, aspect, clear_kind, bytes_per_pixel }
}

use FormatAspect as A;
use ClearKind as K;

const FORMATS: [FormatInfo; TextureFormat::COUNT] = [
    fi(R8, RED, UNSIGNED_BYTE, A::Color, K::Float, 1),
    fi(RG8, RG, UNSIGNED_BYTE, A::Color, K::Float, 2),
    fi(RGBA8, RGBA, UNSIGNED_BYTE, A::Color, K::Float, 4),
    fi(SRGB8_ALPHA8, RGBA, UNSIGNED_BYTE, A::Color, K::Float, 4),
    fi(RGBA8, BGRA, UNSIGNED_BYTE, A::Color, K::Float, 4),
    fi(R16F, RED, HALF_FLOAT, A::Color, K::Float, 2),
    fi(RG16F, RG, HALF_FLOAT, A::Color, K::Float, 4),
    fi(RGBA16F, RGBA, HALF_FLOAT, A::Color, K::Float, 8),
    fi(R32F, RED, FLOAT, A::Color, K::Float, 4),
    fi(RG32F, RG, FLOAT, A::Color, K::Float, 8),
    fi(RGBA32F, RGBA, FLOAT, A::Color, K::Float, 16),
    fi(R8UI, RED_INTEGER, UNSIGNED_BYTE, A::Color, K::Uint, 1),
    fi(R16UI, RED_INTEGER, UNSIGNED_SHORT, A::Color, K::Uint, 2),
    fi(R32UI, RED_INTEGER, UNSIGNED_INT, A::Color, K::Uint, 4),
    fi(RG32UI, RG_INTEGER, UNSIGNED_INT, A::Color, K::Uint, 8),
    fi(RGBA32UI, RGBA_INTEGER, UNSIGNED_INT, A::Color, K::Uint, 16),
    fi(R32I, RED_INTEGER, INT, A::Color, K::Int, 4),
    fi(RGBA32I, RGBA_INTEGER, INT, A::Color, K::Int, 16),
    fi(RGB10_A2, RGBA, UNSIGNED_INT_2_10_10_10_REV, A::Color, K::Float, 4),
    fi(R11F_G11F_B10F, RGB, UNSIGNED_INT_10F_11F_11F_REV, A::Color, K::Float, 4),
    fi(DEPTH_COMPONENT16, DEPTH_COMPONENT, UNSIGNED_SHORT, A::Depth, K::Depth, 2),
    fi(DEPTH_COMPONENT24, DEPTH_COMPONENT, UNSIGNED_INT, A::Depth, K::Depth, 4),
    fi(DEPTH24_STENCIL8, DEPTH_STENCIL, UNSIGNED_INT_24_8, A::DepthStencil, K::DepthStencil, 4),
    fi(DEPTH_COMPONENT32F, DEPTH_COMPONENT, FLOAT, A::Depth, K::Depth, 4),
    fi(DEPTH32F_STENCIL8, DEPTH_STENCIL, FLOAT_32_UNSIGNED_INT_24_8_REV, A::DepthStencil, K::DepthStencil, 8),
    fi(STENCIL_INDEX8, STENCIL_INDEX, UNSIGNED_BYTE, A::Stencil, K::Stencil, 1),
];

pub fn format_info(format: TextureFormat) -> &'static FormatInfo {
    &FORMATS[format as usize]
}

/// Framebuffer attachment point of a non-color aspect
pub fn depth_stencil_attachment(aspect: FormatAspect) -> NativeEnum {
    match aspect {
        FormatAspect::Depth => DEPTH_ATTACHMENT,
        FormatAspect::Stencil => STENCIL_ATTACHMENT,
        FormatAspect::DepthStencil => DEPTH_STENCIL_ATTACHMENT,
        FormatAspect::Color => NONE,
    }
}

// ===== TEXTURES / SAMPLERS =====

pub fn texture_target(ty: TextureType, samples: u32) -> NativeEnum {
    match (ty, samples > 1) {
        (TextureType::Tex2D, true) => TEXTURE_2D_MULTISAMPLE,
        (TextureType::Tex2DArray, true) => TEXTURE_2D_MULTISAMPLE_ARRAY,
        (TextureType::Tex1D, _) => TEXTURE_1D,
        (TextureType::Tex1DArray, _) => TEXTURE_1D_ARRAY,
        (TextureType::Tex2D, false) => TEXTURE_2D,
        (TextureType::Tex2DArray, false) => TEXTURE_2D_ARRAY,
        (TextureType::Tex3D, _) => TEXTURE_3D,
        (TextureType::Cube, _) => TEXTURE_CUBE_MAP,
        (TextureType::CubeArray, _) => TEXTURE_CUBE_MAP_ARRAY,
    }
}

const MIN_FILTERS: [[NativeEnum; 3]; 2] = [
    [NEAREST, NEAREST_MIPMAP_NEAREST, NEAREST_MIPMAP_LINEAR],
    [LINEAR, LINEAR_MIPMAP_NEAREST, LINEAR_MIPMAP_LINEAR],
];

pub fn min_filter(filter: Filter, mipmap: MipmapMode) -> NativeEnum {
    MIN_FILTERS[filter as usize][mipmap as usize]
}

pub fn mag_filter(filter: Filter) -> NativeEnum {
    [NEAREST, LINEAR][filter as usize]
}

pub fn address_mode(mode: AddressMode) -> NativeEnum {
    [REPEAT, MIRRORED_REPEAT, CLAMP_TO_EDGE, CLAMP_TO_BORDER, MIRROR_CLAMP_TO_EDGE][mode as usize]
}

pub fn image_access(access: ImageAccess) -> NativeEnum {
    [READ_ONLY, WRITE_ONLY, READ_WRITE][access as usize]
}

// ===== SHADERS / QUERIES =====

/// Native shader type and program-pipeline stage bit
pub fn shader_stage(stage: ShaderStage) -> (NativeEnum, u32) {
    [
        (VERTEX_SHADER, VERTEX_SHADER_BIT),
        (TESS_CONTROL_SHADER, TESS_CONTROL_SHADER_BIT),
        (TESS_EVALUATION_SHADER, TESS_EVALUATION_SHADER_BIT),
        (GEOMETRY_SHADER, GEOMETRY_SHADER_BIT),
        (FRAGMENT_SHADER, FRAGMENT_SHADER_BIT),
        (COMPUTE_SHADER, COMPUTE_SHADER_BIT),
    ][stage as usize]
}

pub fn query_target(ty: QueryType) -> NativeEnum {
    [
        SAMPLES_PASSED,
        ANY_SAMPLES_PASSED,
        PRIMITIVES_GENERATED,
        TRANSFORM_FEEDBACK_PRIMITIVES_WRITTEN,
        TIME_ELAPSED,
        TIMESTAMP,
    ][ty as usize]
}

#[cfg(test)]
#[path = "state_tables_tests.rs"]
mod tests;

//! Native enumerant values understood by [`Driver`](super::Driver) implementations.
//!
//! The numbering follows the legacy desktop API the RHI targets, so a real
//! backend can forward values untouched.

#![allow(missing_docs)]

use super::NativeEnum;

// ===== CAPABILITIES (enable/disable) =====

pub const BLEND: NativeEnum = 0x0BE2;
pub const CULL_FACE: NativeEnum = 0x0B44;
pub const DEPTH_TEST: NativeEnum = 0x0B71;
pub const STENCIL_TEST: NativeEnum = 0x0B90;
pub const SCISSOR_TEST: NativeEnum = 0x0C11;
pub const RASTERIZER_DISCARD: NativeEnum = 0x8C89;
pub const POLYGON_OFFSET_POINT: NativeEnum = 0x2A01;
pub const POLYGON_OFFSET_LINE: NativeEnum = 0x2A02;
pub const POLYGON_OFFSET_FILL: NativeEnum = 0x8037;
pub const DEPTH_CLAMP: NativeEnum = 0x864F;
pub const MULTISAMPLE: NativeEnum = 0x809D;
pub const SAMPLE_ALPHA_TO_COVERAGE: NativeEnum = 0x809E;
pub const PRIMITIVE_RESTART_FIXED_INDEX: NativeEnum = 0x8D69;
pub const FRAMEBUFFER_SRGB: NativeEnum = 0x8DB9;
pub const TEXTURE_CUBE_MAP_SEAMLESS: NativeEnum = 0x884F;
pub const PROGRAM_POINT_SIZE: NativeEnum = 0x8642;

// ===== BLEND =====

pub const ZERO: NativeEnum = 0;
pub const ONE: NativeEnum = 1;
pub const SRC_COLOR: NativeEnum = 0x0300;
pub const ONE_MINUS_SRC_COLOR: NativeEnum = 0x0301;
pub const SRC_ALPHA: NativeEnum = 0x0302;
pub const ONE_MINUS_SRC_ALPHA: NativeEnum = 0x0303;
pub const DST_ALPHA: NativeEnum = 0x0304;
pub const ONE_MINUS_DST_ALPHA: NativeEnum = 0x0305;
pub const DST_COLOR: NativeEnum = 0x0306;
pub const ONE_MINUS_DST_COLOR: NativeEnum = 0x0307;
pub const SRC_ALPHA_SATURATE: NativeEnum = 0x0308;
pub const CONSTANT_COLOR: NativeEnum = 0x8001;
pub const ONE_MINUS_CONSTANT_COLOR: NativeEnum = 0x8002;
pub const CONSTANT_ALPHA: NativeEnum = 0x8003;
pub const ONE_MINUS_CONSTANT_ALPHA: NativeEnum = 0x8004;
pub const SRC1_ALPHA: NativeEnum = 0x8589;
pub const SRC1_COLOR: NativeEnum = 0x88F9;
pub const ONE_MINUS_SRC1_COLOR: NativeEnum = 0x88FA;
pub const ONE_MINUS_SRC1_ALPHA: NativeEnum = 0x88FB;

pub const FUNC_ADD: NativeEnum = 0x8006;
pub const MIN: NativeEnum = 0x8007;
pub const MAX: NativeEnum = 0x8008;
pub const FUNC_SUBTRACT: NativeEnum = 0x800A;
pub const FUNC_REVERSE_SUBTRACT: NativeEnum = 0x800B;

// ===== COMPARISON / STENCIL =====

pub const NEVER: NativeEnum = 0x0200;
pub const LESS: NativeEnum = 0x0201;
pub const EQUAL: NativeEnum = 0x0202;
pub const LEQUAL: NativeEnum = 0x0203;
pub const GREATER: NativeEnum = 0x0204;
pub const NOTEQUAL: NativeEnum = 0x0205;
pub const GEQUAL: NativeEnum = 0x0206;
pub const ALWAYS: NativeEnum = 0x0207;

pub const KEEP: NativeEnum = 0x1E00;
pub const REPLACE: NativeEnum = 0x1E01;
pub const INCR: NativeEnum = 0x1E02;
pub const DECR: NativeEnum = 0x1E03;
pub const INVERT: NativeEnum = 0x150A;
pub const INCR_WRAP: NativeEnum = 0x8507;
pub const DECR_WRAP: NativeEnum = 0x8508;

// ===== RASTERIZER =====

pub const FRONT: NativeEnum = 0x0404;
pub const BACK: NativeEnum = 0x0405;
pub const FRONT_AND_BACK: NativeEnum = 0x0408;
pub const CW: NativeEnum = 0x0900;
pub const CCW: NativeEnum = 0x0901;
pub const POINT: NativeEnum = 0x1B00;
pub const LINE: NativeEnum = 0x1B01;
pub const FILL: NativeEnum = 0x1B02;

// ===== PRIMITIVES =====

pub const POINTS: NativeEnum = 0x0000;
pub const LINES: NativeEnum = 0x0001;
pub const LINE_LOOP: NativeEnum = 0x0002;
pub const LINE_STRIP: NativeEnum = 0x0003;
pub const TRIANGLES: NativeEnum = 0x0004;
pub const TRIANGLE_STRIP: NativeEnum = 0x0005;
pub const TRIANGLE_FAN: NativeEnum = 0x0006;
pub const LINES_ADJACENCY: NativeEnum = 0x000A;
pub const LINE_STRIP_ADJACENCY: NativeEnum = 0x000B;
pub const TRIANGLES_ADJACENCY: NativeEnum = 0x000C;
pub const TRIANGLE_STRIP_ADJACENCY: NativeEnum = 0x000D;
pub const PATCHES: NativeEnum = 0x000E;

// ===== COMPONENT TYPES =====

pub const BYTE: NativeEnum = 0x1400;
pub const UNSIGNED_BYTE: NativeEnum = 0x1401;
pub const SHORT: NativeEnum = 0x1402;
pub const UNSIGNED_SHORT: NativeEnum = 0x1403;
pub const INT: NativeEnum = 0x1404;
pub const UNSIGNED_INT: NativeEnum = 0x1405;
pub const FLOAT: NativeEnum = 0x1406;
pub const HALF_FLOAT: NativeEnum = 0x140B;
pub const UNSIGNED_INT_2_10_10_10_REV: NativeEnum = 0x8368;
pub const UNSIGNED_INT_24_8: NativeEnum = 0x84FA;
pub const UNSIGNED_INT_10F_11F_11F_REV: NativeEnum = 0x8C3B;
pub const FLOAT_32_UNSIGNED_INT_24_8_REV: NativeEnum = 0x8DAD;
pub const INT_2_10_10_10_REV: NativeEnum = 0x8D9F;

// ===== PIXEL FORMATS =====

pub const STENCIL_INDEX: NativeEnum = 0x1901;
pub const DEPTH_COMPONENT: NativeEnum = 0x1902;
pub const RED: NativeEnum = 0x1903;
pub const RGB: NativeEnum = 0x1907;
pub const RGBA: NativeEnum = 0x1908;
pub const BGRA: NativeEnum = 0x80E1;
pub const RG: NativeEnum = 0x8227;
pub const RG_INTEGER: NativeEnum = 0x8228;
pub const DEPTH_STENCIL: NativeEnum = 0x84F9;
pub const RED_INTEGER: NativeEnum = 0x8D94;
pub const RGBA_INTEGER: NativeEnum = 0x8D99;

// ===== INTERNAL FORMATS =====

pub const RGBA8: NativeEnum = 0x8058;
pub const RGB10_A2: NativeEnum = 0x8059;
pub const R8: NativeEnum = 0x8229;
pub const RG8: NativeEnum = 0x822B;
pub const R16F: NativeEnum = 0x822D;
pub const R32F: NativeEnum = 0x822E;
pub const RG16F: NativeEnum = 0x822F;
pub const RG32F: NativeEnum = 0x8230;
pub const R8UI: NativeEnum = 0x8232;
pub const R16UI: NativeEnum = 0x8234;
pub const R32I: NativeEnum = 0x8235;
pub const R32UI: NativeEnum = 0x8236;
pub const RG32UI: NativeEnum = 0x823C;
pub const RGBA32F: NativeEnum = 0x8814;
pub const RGBA16F: NativeEnum = 0x881A;
pub const R11F_G11F_B10F: NativeEnum = 0x8C3A;
pub const SRGB8_ALPHA8: NativeEnum = 0x8C43;
pub const RGBA32UI: NativeEnum = 0x8D70;
pub const RGBA32I: NativeEnum = 0x8D82;
pub const DEPTH_COMPONENT16: NativeEnum = 0x81A5;
pub const DEPTH_COMPONENT24: NativeEnum = 0x81A6;
pub const DEPTH24_STENCIL8: NativeEnum = 0x88F0;
pub const DEPTH_COMPONENT32F: NativeEnum = 0x8CAC;
pub const DEPTH32F_STENCIL8: NativeEnum = 0x8CAD;
pub const STENCIL_INDEX8: NativeEnum = 0x8D48;

// ===== TEXTURE TARGETS AND PARAMETERS =====

pub const TEXTURE_1D: NativeEnum = 0x0DE0;
pub const TEXTURE_2D: NativeEnum = 0x0DE1;
pub const TEXTURE_3D: NativeEnum = 0x806F;
pub const TEXTURE_CUBE_MAP: NativeEnum = 0x8513;
pub const TEXTURE_1D_ARRAY: NativeEnum = 0x8C18;
pub const TEXTURE_2D_ARRAY: NativeEnum = 0x8C1A;
pub const TEXTURE_CUBE_MAP_ARRAY: NativeEnum = 0x9009;
pub const TEXTURE_2D_MULTISAMPLE: NativeEnum = 0x9100;
pub const TEXTURE_2D_MULTISAMPLE_ARRAY: NativeEnum = 0x9102;

pub const TEXTURE_BASE_LEVEL: NativeEnum = 0x813C;
pub const TEXTURE_MAX_LEVEL: NativeEnum = 0x813D;
pub const TEXTURE_SPARSE: NativeEnum = 0x91A6;

// ===== SAMPLER PARAMETERS =====

pub const TEXTURE_BORDER_COLOR: NativeEnum = 0x1004;
pub const TEXTURE_MAG_FILTER: NativeEnum = 0x2800;
pub const TEXTURE_MIN_FILTER: NativeEnum = 0x2801;
pub const TEXTURE_WRAP_S: NativeEnum = 0x2802;
pub const TEXTURE_WRAP_T: NativeEnum = 0x2803;
pub const TEXTURE_WRAP_R: NativeEnum = 0x8072;
pub const TEXTURE_MIN_LOD: NativeEnum = 0x813A;
pub const TEXTURE_MAX_LOD: NativeEnum = 0x813B;
pub const TEXTURE_MAX_ANISOTROPY: NativeEnum = 0x84FE;
pub const TEXTURE_LOD_BIAS: NativeEnum = 0x8501;
pub const TEXTURE_COMPARE_MODE: NativeEnum = 0x884C;
pub const TEXTURE_COMPARE_FUNC: NativeEnum = 0x884D;
pub const COMPARE_REF_TO_TEXTURE: NativeEnum = 0x884E;

pub const NEAREST: NativeEnum = 0x2600;
pub const LINEAR: NativeEnum = 0x2601;
pub const NEAREST_MIPMAP_NEAREST: NativeEnum = 0x2700;
pub const LINEAR_MIPMAP_NEAREST: NativeEnum = 0x2701;
pub const NEAREST_MIPMAP_LINEAR: NativeEnum = 0x2702;
pub const LINEAR_MIPMAP_LINEAR: NativeEnum = 0x2703;

pub const REPEAT: NativeEnum = 0x2901;
pub const CLAMP_TO_BORDER: NativeEnum = 0x812D;
pub const CLAMP_TO_EDGE: NativeEnum = 0x812F;
pub const MIRRORED_REPEAT: NativeEnum = 0x8370;
pub const MIRROR_CLAMP_TO_EDGE: NativeEnum = 0x8743;

// ===== BUFFERS =====

pub const ARRAY_BUFFER: NativeEnum = 0x8892;
pub const ELEMENT_ARRAY_BUFFER: NativeEnum = 0x8893;
pub const PIXEL_PACK_BUFFER: NativeEnum = 0x88EB;
pub const PIXEL_UNPACK_BUFFER: NativeEnum = 0x88EC;
pub const UNIFORM_BUFFER: NativeEnum = 0x8A11;
pub const TRANSFORM_FEEDBACK_BUFFER: NativeEnum = 0x8C8E;
pub const DRAW_INDIRECT_BUFFER: NativeEnum = 0x8F3F;
pub const DISPATCH_INDIRECT_BUFFER: NativeEnum = 0x90EE;
pub const SHADER_STORAGE_BUFFER: NativeEnum = 0x90D2;
pub const QUERY_BUFFER: NativeEnum = 0x9192;
pub const ATOMIC_COUNTER_BUFFER: NativeEnum = 0x92C0;

pub const MAP_READ_BIT: u32 = 0x0001;
pub const MAP_WRITE_BIT: u32 = 0x0002;
pub const MAP_INVALIDATE_RANGE_BIT: u32 = 0x0004;
pub const MAP_INVALIDATE_BUFFER_BIT: u32 = 0x0008;
pub const MAP_FLUSH_EXPLICIT_BIT: u32 = 0x0010;
pub const MAP_UNSYNCHRONIZED_BIT: u32 = 0x0020;
pub const MAP_PERSISTENT_BIT: u32 = 0x0040;
pub const MAP_COHERENT_BIT: u32 = 0x0080;
pub const DYNAMIC_STORAGE_BIT: u32 = 0x0100;
pub const CLIENT_STORAGE_BIT: u32 = 0x0200;

// ===== FRAMEBUFFERS =====

pub const NONE: NativeEnum = 0;
pub const COLOR: NativeEnum = 0x1800;
pub const DEPTH: NativeEnum = 0x1801;
pub const STENCIL: NativeEnum = 0x1802;
pub const DEPTH_STENCIL_ATTACHMENT: NativeEnum = 0x821A;
pub const READ_FRAMEBUFFER: NativeEnum = 0x8CA8;
pub const DRAW_FRAMEBUFFER: NativeEnum = 0x8CA9;
pub const FRAMEBUFFER_COMPLETE: NativeEnum = 0x8CD5;
pub const COLOR_ATTACHMENT0: NativeEnum = 0x8CE0;
pub const DEPTH_ATTACHMENT: NativeEnum = 0x8D00;
pub const STENCIL_ATTACHMENT: NativeEnum = 0x8D20;
pub const FRAMEBUFFER: NativeEnum = 0x8D40;

pub const DEPTH_BUFFER_BIT: u32 = 0x0100;
pub const STENCIL_BUFFER_BIT: u32 = 0x0400;
pub const COLOR_BUFFER_BIT: u32 = 0x4000;

// ===== PIXEL STORE =====

pub const UNPACK_ROW_LENGTH: NativeEnum = 0x0CF2;
pub const UNPACK_ALIGNMENT: NativeEnum = 0x0CF5;
pub const PACK_ROW_LENGTH: NativeEnum = 0x0D02;
pub const PACK_ALIGNMENT: NativeEnum = 0x0D05;
pub const PACK_IMAGE_HEIGHT: NativeEnum = 0x806C;
pub const UNPACK_IMAGE_HEIGHT: NativeEnum = 0x806E;

// ===== SHADERS =====

pub const FRAGMENT_SHADER: NativeEnum = 0x8B30;
pub const VERTEX_SHADER: NativeEnum = 0x8B31;
pub const GEOMETRY_SHADER: NativeEnum = 0x8DD9;
pub const TESS_EVALUATION_SHADER: NativeEnum = 0x8E87;
pub const TESS_CONTROL_SHADER: NativeEnum = 0x8E88;
pub const COMPUTE_SHADER: NativeEnum = 0x91B9;
pub const SHADER_BINARY_FORMAT_SPIR_V: NativeEnum = 0x9551;

pub const VERTEX_SHADER_BIT: u32 = 0x0001;
pub const FRAGMENT_SHADER_BIT: u32 = 0x0002;
pub const GEOMETRY_SHADER_BIT: u32 = 0x0004;
pub const TESS_CONTROL_SHADER_BIT: u32 = 0x0008;
pub const TESS_EVALUATION_SHADER_BIT: u32 = 0x0010;
pub const COMPUTE_SHADER_BIT: u32 = 0x0020;

// ===== IMAGE ACCESS =====

pub const READ_ONLY: NativeEnum = 0x88B8;
pub const WRITE_ONLY: NativeEnum = 0x88B9;
pub const READ_WRITE: NativeEnum = 0x88BA;

// ===== QUERIES =====

pub const TIME_ELAPSED: NativeEnum = 0x88BF;
pub const QUERY_RESULT: NativeEnum = 0x8866;
pub const QUERY_RESULT_AVAILABLE: NativeEnum = 0x8867;
pub const SAMPLES_PASSED: NativeEnum = 0x8914;
pub const PRIMITIVES_GENERATED: NativeEnum = 0x8C87;
pub const TRANSFORM_FEEDBACK_PRIMITIVES_WRITTEN: NativeEnum = 0x8C88;
pub const ANY_SAMPLES_PASSED: NativeEnum = 0x8C2F;
pub const ANY_SAMPLES_PASSED_CONSERVATIVE: NativeEnum = 0x8D6A;
pub const TIMESTAMP: NativeEnum = 0x8E28;
pub const QUERY_RESULT_NO_WAIT: NativeEnum = 0x9194;

// ===== SYNC =====

pub const ALREADY_SIGNALED: NativeEnum = 0x911A;
pub const TIMEOUT_EXPIRED: NativeEnum = 0x911B;
pub const CONDITION_SATISFIED: NativeEnum = 0x911C;
pub const WAIT_FAILED: NativeEnum = 0x911D;

pub const VERTEX_ATTRIB_ARRAY_BARRIER_BIT: u32 = 0x0001;
pub const ELEMENT_ARRAY_BARRIER_BIT: u32 = 0x0002;
pub const UNIFORM_BARRIER_BIT: u32 = 0x0004;
pub const TEXTURE_FETCH_BARRIER_BIT: u32 = 0x0008;
pub const SHADER_IMAGE_ACCESS_BARRIER_BIT: u32 = 0x0020;
pub const COMMAND_BARRIER_BIT: u32 = 0x0040;
pub const PIXEL_BUFFER_BARRIER_BIT: u32 = 0x0080;
pub const TEXTURE_UPDATE_BARRIER_BIT: u32 = 0x0100;
pub const BUFFER_UPDATE_BARRIER_BIT: u32 = 0x0200;
pub const FRAMEBUFFER_BARRIER_BIT: u32 = 0x0400;
pub const TRANSFORM_FEEDBACK_BARRIER_BIT: u32 = 0x0800;
pub const ATOMIC_COUNTER_BARRIER_BIT: u32 = 0x1000;
pub const SHADER_STORAGE_BARRIER_BIT: u32 = 0x2000;
pub const CLIENT_MAPPED_BUFFER_BARRIER_BIT: u32 = 0x4000;
pub const QUERY_BUFFER_BARRIER_BIT: u32 = 0x8000;
pub const ALL_BARRIER_BITS: u32 = 0xFFFF_FFFF;

//! Fixed-function state descriptions and their deduplicated records.
//!
//! Descriptions are plain values. The device turns each distinct description
//! into one shared record carrying a process-unique id, so contexts can
//! skip an entire state group by comparing ids.

use std::hash::{Hash, Hasher};
use bitflags::bitflags;
use crate::resource::next_uid;

/// Maximum simultaneously bound color attachments
pub const MAX_COLOR_ATTACHMENTS: usize = 8;

// ===== BLEND =====

/// Blend factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    DstColor,
    OneMinusDstColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
    ConstantColor,
    OneMinusConstantColor,
    ConstantAlpha,
    OneMinusConstantAlpha,
    SrcAlphaSaturate,
    Src1Color,
    OneMinusSrc1Color,
    Src1Alpha,
    OneMinusSrc1Alpha,
}

impl BlendFactor {
    pub const COUNT: usize = 19;
}

/// Blend equation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendOp {
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

impl BlendOp {
    pub const COUNT: usize = 5;
}

bitflags! {
    /// Color channels a render target writes
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ColorWriteMask: u8 {
        const RED = 0b0001;
        const GREEN = 0b0010;
        const BLUE = 0b0100;
        const ALPHA = 0b1000;
        const ALL = Self::RED.bits() | Self::GREEN.bits() | Self::BLUE.bits() | Self::ALPHA.bits();
    }
}

/// Blend configuration of one render target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderTargetBlend {
    pub blend_enable: bool,
    pub src_color: BlendFactor,
    pub dst_color: BlendFactor,
    pub color_op: BlendOp,
    pub src_alpha: BlendFactor,
    pub dst_alpha: BlendFactor,
    pub alpha_op: BlendOp,
    pub write_mask: ColorWriteMask,
}

impl Default for RenderTargetBlend {
    fn default() -> Self {
        Self {
            blend_enable: false,
            src_color: BlendFactor::One,
            dst_color: BlendFactor::Zero,
            color_op: BlendOp::Add,
            src_alpha: BlendFactor::One,
            dst_alpha: BlendFactor::Zero,
            alpha_op: BlendOp::Add,
            write_mask: ColorWriteMask::ALL,
        }
    }
}

impl RenderTargetBlend {
    /// Classic `src * a + dst * (1 - a)`
    pub fn alpha_blending() -> Self {
        Self {
            blend_enable: true,
            src_color: BlendFactor::SrcAlpha,
            dst_color: BlendFactor::OneMinusSrcAlpha,
            src_alpha: BlendFactor::One,
            dst_alpha: BlendFactor::OneMinusSrcAlpha,
            ..Default::default()
        }
    }

    pub fn additive() -> Self {
        Self {
            blend_enable: true,
            src_color: BlendFactor::One,
            dst_color: BlendFactor::One,
            src_alpha: BlendFactor::One,
            dst_alpha: BlendFactor::One,
            ..Default::default()
        }
    }
}

/// Blend state of all render targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BlendStateDesc {
    pub alpha_to_coverage: bool,
    /// When false, `render_targets[0]` applies to every target
    pub independent_blend: bool,
    pub render_targets: [RenderTargetBlend; MAX_COLOR_ATTACHMENTS],
}

impl BlendStateDesc {
    /// Same blend on every render target
    pub fn uniform(target: RenderTargetBlend) -> Self {
        Self {
            render_targets: [target; MAX_COLOR_ATTACHMENTS],
            ..Default::default()
        }
    }

    /// Effective blend of render target `index`
    pub fn target(&self, index: usize) -> &RenderTargetBlend {
        if self.independent_blend {
            &self.render_targets[index]
        } else {
            &self.render_targets[0]
        }
    }
}

// ===== DEPTH / STENCIL =====

/// Comparison function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Never,
    Less,
    Equal,
    LessOrEqual,
    Greater,
    NotEqual,
    GreaterOrEqual,
    Always,
}

impl CompareOp {
    pub const COUNT: usize = 8;
}

/// Stencil operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StencilOp {
    Keep,
    Zero,
    Replace,
    IncrementAndClamp,
    DecrementAndClamp,
    Invert,
    IncrementAndWrap,
    DecrementAndWrap,
}

impl StencilOp {
    pub const COUNT: usize = 8;
}

/// Stencil behavior of one face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StencilFaceState {
    pub fail_op: StencilOp,
    pub depth_fail_op: StencilOp,
    pub pass_op: StencilOp,
    pub compare: CompareOp,
}

impl Default for StencilFaceState {
    fn default() -> Self {
        Self {
            fail_op: StencilOp::Keep,
            depth_fail_op: StencilOp::Keep,
            pass_op: StencilOp::Keep,
            compare: CompareOp::Always,
        }
    }
}

/// Depth and stencil test configuration
///
/// The stencil reference is dynamic (see `ImmediateContext::set_stencil_reference`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthStencilStateDesc {
    pub depth_test: bool,
    pub depth_write: bool,
    pub depth_compare: CompareOp,
    pub stencil_test: bool,
    pub stencil_read_mask: u8,
    pub stencil_write_mask: u8,
    pub front: StencilFaceState,
    pub back: StencilFaceState,
}

impl Default for DepthStencilStateDesc {
    fn default() -> Self {
        Self {
            depth_test: true,
            depth_write: true,
            depth_compare: CompareOp::Less,
            stencil_test: false,
            stencil_read_mask: 0xFF,
            stencil_write_mask: 0xFF,
            front: StencilFaceState::default(),
            back: StencilFaceState::default(),
        }
    }
}

impl DepthStencilStateDesc {
    /// No depth or stencil testing at all
    pub fn disabled() -> Self {
        Self {
            depth_test: false,
            depth_write: false,
            depth_compare: CompareOp::Always,
            ..Default::default()
        }
    }
}

// ===== RASTERIZER =====

/// Face culling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullMode {
    None,
    Front,
    Back,
    FrontAndBack,
}

impl CullMode {
    pub const COUNT: usize = 4;
}

/// Winding order of front faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrontFace {
    CounterClockwise,
    Clockwise,
}

/// Polygon rasterization mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolygonMode {
    Fill,
    Line,
    Point,
}

/// Depth bias; all-zero means disabled
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DepthBias {
    pub constant: f32,
    pub slope: f32,
    pub clamp: f32,
}

impl DepthBias {
    pub fn is_enabled(&self) -> bool {
        self.constant != 0.0 || self.slope != 0.0
    }
}

impl Eq for DepthBias {}

impl Hash for DepthBias {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.constant.to_bits().hash(state);
        self.slope.to_bits().hash(state);
        self.clamp.to_bits().hash(state);
    }
}

/// Rasterizer configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RasterizerStateDesc {
    pub cull_mode: CullMode,
    pub front_face: FrontFace,
    pub polygon_mode: PolygonMode,
    pub depth_bias: DepthBias,
    pub depth_clamp: bool,
    pub scissor_test: bool,
    pub rasterizer_discard: bool,
}

impl Default for RasterizerStateDesc {
    fn default() -> Self {
        Self {
            cull_mode: CullMode::Back,
            front_face: FrontFace::CounterClockwise,
            polygon_mode: PolygonMode::Fill,
            depth_bias: DepthBias::default(),
            depth_clamp: false,
            scissor_test: false,
            rasterizer_discard: false,
        }
    }
}

// ===== INPUT ASSEMBLY =====

/// Primitive topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveTopology {
    PointList,
    LineList,
    LineStrip,
    LineLoop,
    TriangleList,
    TriangleStrip,
    TriangleFan,
    LineListAdjacency,
    LineStripAdjacency,
    TriangleListAdjacency,
    TriangleStripAdjacency,
    PatchList,
}

impl PrimitiveTopology {
    pub const COUNT: usize = 12;
}

/// Index element type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexType {
    U16,
    U32,
}

impl IndexType {
    pub fn size(self) -> u64 {
        match self {
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }
}

// ===== DEDUPLICATED RECORDS =====

macro_rules! state_record {
    ($(#[$meta:meta])* $name:ident, $desc:ty) => {
        $(#[$meta])*
        #[derive(Debug)]
        pub struct $name {
            id: u64,
            desc: $desc,
        }

        impl $name {
            pub(crate) fn new(desc: $desc) -> Self {
                Self { id: next_uid(), desc }
            }

            /// Process-unique id; equal ids mean identical state
            pub fn id(&self) -> u64 {
                self.id
            }

            pub fn desc(&self) -> &$desc {
                &self.desc
            }
        }
    };
}

state_record!(
    /// Shared, immutable blend state
    BlendState,
    BlendStateDesc
);
state_record!(
    /// Shared, immutable rasterizer state
    RasterizerState,
    RasterizerStateDesc
);
state_record!(
    /// Shared, immutable depth-stencil state
    DepthStencilState,
    DepthStencilStateDesc
);

//! Device configuration

use crate::driver::SurfaceInfo;

/// Where the origin of viewport and scissor rectangles lies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoordinateConvention {
    /// Origin at the top-left corner, Y pointing down (rectangles are flipped
    /// against the framebuffer height before reaching the driver)
    #[default]
    UpperLeft,
    /// Native convention: origin at the bottom-left corner
    LowerLeft,
}

/// Logical device creation parameters
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Name used in log messages
    pub debug_name: String,
    /// Extra argument checking on resource creation and commands
    pub validation: bool,
    pub coordinate_convention: CoordinateConvention,
    /// Frames an idle transient render target survives in the pool
    pub transient_max_idle_frames: u32,
    /// Window surface of the main context
    pub main_surface: SurfaceInfo,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            debug_name: "hearth".to_string(),
            validation: cfg!(debug_assertions),
            coordinate_convention: CoordinateConvention::default(),
            transient_max_idle_frames: 3,
            main_surface: SurfaceInfo::default(),
        }
    }
}

impl DeviceConfig {
    pub fn with_debug_name(mut self, name: impl Into<String>) -> Self {
        self.debug_name = name.into();
        self
    }

    pub fn with_validation(mut self, validation: bool) -> Self {
        self.validation = validation;
        self
    }

    pub fn with_coordinate_convention(mut self, convention: CoordinateConvention) -> Self {
        self.coordinate_convention = convention;
        self
    }

    pub fn with_main_surface(mut self, width: u32, height: u32) -> Self {
        self.main_surface = SurfaceInfo { width, height };
        self
    }

    pub fn with_transient_max_idle_frames(mut self, frames: u32) -> Self {
        self.transient_max_idle_frames = frames;
        self
    }
}

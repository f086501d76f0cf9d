#![allow(dead_code)]
//! Headless test utilities - Device and main context over the simulated driver
//!
//! Each call builds its own driver, so tests never share native state and can
//! run in parallel. The returned [`HeadlessMonitor`] keeps reading the
//! driver's state after the device has taken ownership of it.

use std::sync::Arc;
use hearth_rhi::hearth::{Device, DeviceConfig, ImmediateContext};
use hearth_rhi::hearth::render::{Pipeline, PipelineDesc, RenderPass, RenderPassDesc};
use hearth_rhi::hearth::resource::{Shader, ShaderStage, TextureDesc, TextureFormat, TextureView};
use hearth_rhi_headless::{HeadlessDriver, HeadlessMonitor};

/// Device, main context and monitor of one headless driver
pub struct HeadlessSetup {
    // Dropped before the device
    pub ctx: ImmediateContext,
    pub device: Device,
    pub monitor: HeadlessMonitor,
}

impl HeadlessSetup {
    /// 800x600 main surface
    pub fn new() -> Self {
        Self::with_config(DeviceConfig::default().with_main_surface(800, 600))
    }

    pub fn with_config(config: DeviceConfig) -> Self {
        Self::with_driver(HeadlessDriver::new(), config)
    }

    /// Device over a driver configured by the caller (memory budget, caps)
    pub fn with_driver(driver: HeadlessDriver, config: DeviceConfig) -> Self {
        let monitor = driver.monitor();
        let device = Device::from_driver(Box::new(driver), config).expect("headless device");
        let ctx = device.create_context(None).expect("main context");
        Self { ctx, device, monitor }
    }

    pub fn shader(&self, stage: ShaderStage) -> Arc<Shader> {
        self.device
            .create_shader_from_code(stage, "#version 450\nvoid main() {}\n")
            .expect("shader")
    }

    /// Graphics pipeline; missing vertex/fragment stages get empty shaders
    pub fn pipeline(&self, mut desc: PipelineDesc) -> Arc<Pipeline> {
        if desc.vertex.is_none() {
            desc.vertex = Some(self.shader(ShaderStage::Vertex));
        }
        if desc.fragment.is_none() {
            desc.fragment = Some(self.shader(ShaderStage::Fragment));
        }
        self.device.create_pipeline(&desc).expect("pipeline")
    }

    pub fn render_pass(&self, desc: RenderPassDesc) -> Arc<RenderPass> {
        self.device.create_render_pass(desc).expect("render pass")
    }

    /// Render target view of a fresh texture
    pub fn target(&self, format: TextureFormat, width: u32, height: u32) -> TextureView {
        let texture = self
            .device
            .create_texture(&TextureDesc::render_target(format, width, height))
            .expect("render target");
        TextureView::new(texture)
    }

    /// Assert the driver saw no usage error
    pub fn assert_clean(&self) {
        let errors = self.monitor.errors();
        assert!(errors.is_empty(), "driver reported errors: {:#?}", errors);
    }
}

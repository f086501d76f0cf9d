//! Device + main context over the recording driver, shared by the context tests

use std::sync::Arc;
use crate::device::{CoordinateConvention, Device, DeviceConfig};
use crate::driver::mock_driver::{MockDriver, MockTrace};
use crate::pipeline::{Pipeline, PipelineDesc};
use crate::resource::{Buffer, BufferDesc, BufferUsage, Shader, ShaderStage, Texture, TextureDesc, TextureFormat, TextureView};
use super::ImmediateContext;

pub(crate) struct Fixture {
    // Dropped before the device
    pub ctx: ImmediateContext,
    pub device: Device,
    pub trace: MockTrace,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(DeviceConfig::default().with_main_surface(800, 600))
    }

    pub fn lower_left() -> Self {
        Self::with_config(
            DeviceConfig::default()
                .with_main_surface(800, 600)
                .with_coordinate_convention(CoordinateConvention::LowerLeft),
        )
    }

    pub fn with_config(config: DeviceConfig) -> Self {
        let (mock, trace) = MockDriver::new();
        let device = Device::from_driver(Box::new(mock), config).unwrap();
        let ctx = device.create_context(None).unwrap();
        Self { ctx, device, trace }
    }

    pub fn shader(&self, stage: ShaderStage) -> Arc<Shader> {
        self.device.create_shader_from_code(stage, "void main() {}").unwrap()
    }

    /// Graphics pipeline; missing vertex/fragment stages are filled in
    pub fn pipeline(&self, mut desc: PipelineDesc) -> Arc<Pipeline> {
        if desc.vertex.is_none() {
            desc.vertex = Some(self.shader(ShaderStage::Vertex));
        }
        if desc.fragment.is_none() {
            desc.fragment = Some(self.shader(ShaderStage::Fragment));
        }
        self.device.create_pipeline(&desc).unwrap()
    }

    pub fn buffer(&self, size: u64, usage: BufferUsage) -> Arc<Buffer> {
        self.device.create_buffer(&BufferDesc::new(size, usage), None).unwrap()
    }

    pub fn texture(&self, desc: TextureDesc) -> Arc<Texture> {
        self.device.create_texture(&desc).unwrap()
    }

    pub fn target(&self, format: TextureFormat, width: u32, height: u32) -> TextureView {
        TextureView::new(self.texture(TextureDesc::render_target(format, width, height)))
    }

    /// Forget everything recorded so far
    pub fn reset_trace(&self) {
        self.trace.clear();
    }
}

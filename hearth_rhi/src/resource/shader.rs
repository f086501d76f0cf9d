//! Shader programs (one separable program per stage)

use std::sync::Arc;
use crate::driver::{native, NativeHandle, Release, SharedDriver};
use crate::error::Result;
use crate::state_tables;
use super::next_uid;

/// Programmable pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    TessControl,
    TessEvaluation,
    Geometry,
    Fragment,
    Compute,
}

/// Shader source handed to the driver
#[derive(Debug, Clone, Copy)]
pub enum ShaderSource<'a> {
    /// High-level source text
    Code(&'a str),
    /// SPIR-V module with its entry point
    SpirV { binary: &'a [u8], entry_point: &'a str },
}

/// Compiled and linked single-stage program
pub struct Shader {
    uid: u64,
    stage: ShaderStage,
    program: NativeHandle,
    driver: Arc<SharedDriver>,
}

impl Shader {
    pub(crate) fn create(driver: &Arc<SharedDriver>, stage: ShaderStage, source: ShaderSource<'_>) -> Result<Self> {
        let (native_stage, _) = state_tables::shader_stage(stage);
        let mut gl = driver.lock();
        let program = match source {
            ShaderSource::Code(code) => gl.create_shader_program(native_stage, code),
            ShaderSource::SpirV { binary, entry_point } => {
                if !gl.capabilities().spirv_binaries {
                    crate::rhi_error!("hearth::Shader", "Driver cannot consume SPIR-V binaries");
                    return Err(crate::error::Error::Unsupported("SPIR-V shaders".to_string()));
                }
                gl.create_shader_program_binary(native_stage, native::SHADER_BINARY_FORMAT_SPIR_V, binary, entry_point)
            }
        };
        if program == 0 {
            crate::rhi_bail!("hearth::Shader", "Driver refused to create a {:?} program", stage);
        }
        if !gl.program_link_status(program) {
            let log = gl.program_info_log(program);
            gl.delete_program(program);
            crate::rhi_bail!("hearth::Shader", "{:?} shader failed to link: {}", stage, log);
        }
        drop(gl);

        crate::rhi_debug!("hearth::Shader", "{:?} program {} linked", stage, program);
        Ok(Self {
            uid: next_uid(),
            stage,
            program,
            driver: Arc::clone(driver),
        })
    }

    pub fn uid(&self) -> u64 {
        self.uid
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn program(&self) -> NativeHandle {
        self.program
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        self.driver.release(Release::Program(self.program));
    }
}

impl std::fmt::Debug for Shader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shader")
            .field("uid", &self.uid)
            .field("stage", &self.stage)
            .field("program", &self.program)
            .finish()
    }
}

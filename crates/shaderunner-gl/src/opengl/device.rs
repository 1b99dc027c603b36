//! [`GlDevice`]: shader compilation and attribute-less drawing over raw GL.

use anyhow::Result;
use gl::types::{GLchar, GLenum, GLint, GLsizei};

use crate::backend::{Primitive, ShaderBackend, UniformValue};
use crate::error;
use crate::handle::{ProgramHandle, ShaderHandle, VertexArrayHandle};
use crate::stage::ShaderStage;

/// A compiled GL shader object.
#[derive(Debug)]
pub struct GlShader {
    handle: ShaderHandle,
    stage: ShaderStage,
}

impl GlShader {
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn name(&self) -> u32 {
        self.handle.get()
    }
}

/// A linked GL program object.
#[derive(Debug)]
pub struct GlProgram {
    handle: ProgramHandle,
}

impl GlProgram {
    pub fn name(&self) -> u32 {
        self.handle.get()
    }
}

/// OpenGL implementation of [`ShaderBackend`].
///
/// Every draw is attribute-less: vertex positions are generated in the
/// vertex stage from `gl_VertexID`, so a single empty vertex array object is
/// bound for all draws.
pub struct GlDevice {
    dummy_vao: VertexArrayHandle,
}

// Every method assumes the context that created the device is current.
impl GlDevice {
    /// Create the device. GL function pointers must already be loaded.
    pub fn new() -> Result<Self> {
        let mut dummy_vao = VertexArrayHandle::empty();
        unsafe { gl::GenVertexArrays(1, dummy_vao.as_mut_ptr()) };
        error::check_error()?;
        tracing::debug!(vao = dummy_vao.get(), "GL device created");
        Ok(Self { dummy_vao })
    }
}

impl ShaderBackend for GlDevice {
    type Shader = GlShader;
    type Program = GlProgram;

    fn compile_stage(
        &mut self,
        stage: ShaderStage,
        sources: &[&str],
    ) -> std::result::Result<GlShader, String> {
        let pointers: Vec<*const GLchar> = sources.iter().map(|s| s.as_ptr().cast()).collect();
        let lengths: Vec<GLint> = sources.iter().map(|s| s.len() as GLint).collect();

        let handle = ShaderHandle::new(unsafe { gl::CreateShader(stage.gl_enum()) });
        if handle.is_empty() {
            return Err(format!("glCreateShader failed for the {stage} stage"));
        }
        unsafe {
            gl::ShaderSource(
                handle.get(),
                sources.len() as GLsizei,
                pointers.as_ptr(),
                lengths.as_ptr(),
            );
            gl::CompileShader(handle.get());
        }

        if !error::shader_compiled(handle.get()) {
            return Err(error::shader_info_log(handle.get()));
        }
        Ok(GlShader { handle, stage })
    }

    fn link_program(&mut self, shaders: &[&GlShader]) -> std::result::Result<GlProgram, String> {
        let handle = ProgramHandle::new(unsafe { gl::CreateProgram() });
        if handle.is_empty() {
            return Err("glCreateProgram failed".to_owned());
        }
        unsafe {
            for shader in shaders {
                gl::AttachShader(handle.get(), shader.name());
            }
            gl::LinkProgram(handle.get());
            for shader in shaders {
                gl::DetachShader(handle.get(), shader.name());
            }
        }

        if !error::program_linked(handle.get()) {
            return Err(error::program_info_log(handle.get()));
        }
        Ok(GlProgram { handle })
    }

    fn use_program(&mut self, program: Option<&GlProgram>) {
        unsafe { gl::UseProgram(program.map_or(0, GlProgram::name)) };
    }

    fn uniform_location(&mut self, program: &GlProgram, name: &str) -> Option<i32> {
        let c_name = std::ffi::CString::new(name).ok()?;
        let location = unsafe { gl::GetUniformLocation(program.name(), c_name.as_ptr()) };
        (location >= 0).then_some(location)
    }

    fn set_uniform(&mut self, location: i32, value: UniformValue<'_>) {
        unsafe {
            match value {
                UniformValue::Float(v) => gl::Uniform1f(location, v),
                UniformValue::Int(v) => gl::Uniform1i(location, v),
                UniformValue::UInt(v) => gl::Uniform1ui(location, v),
                UniformValue::Vec2([x, y]) => gl::Uniform2f(location, x, y),
                UniformValue::Vec3(v) => gl::Uniform3fv(location, 1, v.as_ptr()),
                UniformValue::Mat4(m) => gl::UniformMatrix4fv(location, 1, gl::FALSE, m.as_ptr()),
                UniformValue::Vec3Array(values) => {
                    if !values.is_empty() {
                        gl::Uniform3fv(location, values.len() as GLsizei, values.as_ptr().cast());
                    }
                }
            }
        }
    }

    fn draw(&mut self, primitive: Primitive, count: i32) {
        let mode: GLenum = match primitive {
            Primitive::Points => gl::POINTS,
            Primitive::Triangles => gl::TRIANGLES,
        };
        unsafe {
            gl::BindVertexArray(self.dummy_vao.get());
            gl::DrawArrays(mode, 0, count);
            gl::BindVertexArray(0);
        }
    }

    fn clear_color(&mut self, rgba: [f32; 4]) {
        unsafe { gl::ClearBufferfv(gl::COLOR, 0, rgba.as_ptr()) };
    }

    fn clear_depth(&mut self) {
        let depth = 1.0f32;
        unsafe { gl::ClearBufferfv(gl::DEPTH, 0, &depth) };
    }

    fn set_depth_test(&mut self, enabled: bool) {
        unsafe {
            if enabled {
                gl::Enable(gl::DEPTH_TEST);
            } else {
                gl::Disable(gl::DEPTH_TEST);
            }
        }
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        unsafe {
            gl::Viewport(0, 0, width as GLint, height as GLint);
            #[cfg(debug_assertions)]
            crate::validate_gl::validate_viewport(width, height);
        }
    }

    fn check_error(&mut self) -> Result<()> {
        error::check_error()
    }
}

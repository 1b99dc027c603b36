//! Common interface for shader compilation, uniform upload and drawing.

use anyhow::Result;

use crate::stage::ShaderStage;

/// A uniform value to upload to the currently used program.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue<'a> {
    Float(f32),
    Int(i32),
    UInt(u32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    /// Column-major 4x4 matrix.
    Mat4(&'a [f32; 16]),
    Vec3Array(&'a [[f32; 3]]),
}

/// Primitive topology for attribute-less draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Points,
    Triangles,
}

/// Common interface for the graphics backend driven by the sandbox.
///
/// The OpenGL implementation is [`GlDevice`](crate::opengl::GlDevice). All
/// calls are made from the single rendering thread.
///
/// Compilation and linking never fail hard: the `Err` side carries the raw
/// diagnostic text of the backend, which the caller turns into a structured
/// log. Shader and program objects release their backend resources when
/// dropped.
pub trait ShaderBackend {
    /// A compiled shader stage object.
    type Shader;
    /// A linked program.
    type Program;

    /// Compile `sources` (concatenated in order) as one `stage` object.
    fn compile_stage(
        &mut self,
        stage: ShaderStage,
        sources: &[&str],
    ) -> std::result::Result<Self::Shader, String>;

    /// Link a program from compiled stage objects.
    fn link_program(
        &mut self,
        shaders: &[&Self::Shader],
    ) -> std::result::Result<Self::Program, String>;

    /// Install `program` for subsequent uniform uploads and draws, or
    /// uninstall any program with `None`.
    fn use_program(&mut self, program: Option<&Self::Program>);

    /// Look up a uniform location, `None` if the program has no such active
    /// uniform.
    fn uniform_location(&mut self, program: &Self::Program, name: &str) -> Option<i32>;

    /// Upload a value to `location` of the installed program.
    fn set_uniform(&mut self, location: i32, value: UniformValue<'_>);

    /// Draw `count` vertices without vertex attributes.
    fn draw(&mut self, primitive: Primitive, count: i32);

    /// Clear color attachment 0.
    fn clear_color(&mut self, rgba: [f32; 4]);

    /// Clear the depth attachment to 1.0.
    fn clear_depth(&mut self);

    fn set_depth_test(&mut self, enabled: bool);

    fn set_viewport(&mut self, width: u32, height: u32);

    /// Report (and reset) the backend error state.
    fn check_error(&mut self) -> Result<()>;
}

//! Kernel source assembly.
//!
//! A kernel is the user-editable body of one pipeline stage. The compiled
//! translation unit is always `prefix + kernel + suffix`:
//!
//! - the prefix is shared by every stage and declares the standard uniforms
//! - the suffix is stage-specific and defines the real `main`, forwarding to
//!   the user entry point (`vertexMain`, `imageMain`, `geometryMain`)
//!
//! Prefix and suffix are built once and never change at runtime.

use std::borrow::Cow;
use std::fmt;

use once_cell::sync::Lazy;
use shaderunner_gl::ShaderStage;

pub const GLSL_VERSION: &str = "#version 330 core\n";

pub const TIME_UNIFORM: &str = "iTime";
pub const RESOLUTION_UNIFORM: &str = "iResolution";
pub const PROJECTION_UNIFORM: &str = "iProjectionMat";
pub const GIZMO_POSITIONS_UNIFORM: &str = "iGizmoPositions";
pub const GIZMO_COUNT_UNIFORM: &str = "iGizmoCount";

/// Length of the gizmo position uniform array.
pub const MAX_GIZMOS: usize = 16;

const VERTEX_ENTRY_POINT: &str = "vertexMain";
const FRAGMENT_ENTRY_POINT: &str = "imageMain";
const GEOMETRY_ENTRY_POINT: &str = "geometryMain";

static PREFIX: Lazy<String> = Lazy::new(|| {
    format!(
        "{GLSL_VERSION}\
         uniform float {TIME_UNIFORM};\n\
         uniform vec2 {RESOLUTION_UNIFORM};\n\
         uniform mat4 {PROJECTION_UNIFORM};\n\
         uniform vec3 {GIZMO_POSITIONS_UNIFORM}[{MAX_GIZMOS}];\n\
         uniform int {GIZMO_COUNT_UNIFORM};\n"
    )
});

static PREFIX_LINES: Lazy<u32> = Lazy::new(|| PREFIX.matches('\n').count() as u32);

static SUFFIXES: Lazy<[String; ShaderStage::COUNT]> = Lazy::new(|| {
    ShaderStage::ALL.map(|stage| {
        let (entry_point, body) = match stage {
            ShaderStage::Vertex => (
                VERTEX_ENTRY_POINT,
                "void main()\n\
                 {\n\
                 \x20   vec4 vert_position = vec4(0.0);\n\
                 \x20   SR_ENTRY_POINT(vert_position);\n\
                 \x20   gl_Position = vert_position;\n\
                 }\n",
            ),
            ShaderStage::Fragment => (
                FRAGMENT_ENTRY_POINT,
                "out vec4 frag_color;\n\
                 void main()\n\
                 {\n\
                 \x20   frag_color = vec4(0.0);\n\
                 \x20   vec2 frag_coord = floor(gl_FragCoord).xy;\n\
                 \x20   SR_ENTRY_POINT(frag_color, frag_coord);\n\
                 }\n",
            ),
            ShaderStage::Geometry => (
                GEOMETRY_ENTRY_POINT,
                "void main()\n\
                 {\n\
                 \x20   SR_ENTRY_POINT();\n\
                 }\n",
            ),
        };
        format!("\n#define SR_ENTRY_POINT {entry_point}\n{body}")
    })
});

const DEFAULT_VERTEX_KERNEL: &str = "\
const vec2 kTriVertices[] = vec2[3](vec2(-1.0, 3.0), vec2(-1.0, -1.0), vec2(3.0, -1.0));
void vertexMain(inout vec4 vert_position)
{
    vert_position = vec4(kTriVertices[gl_VertexID], 0.0, 1.0);
}
";

const DEFAULT_FRAGMENT_KERNEL: &str = "\
void imageMain(inout vec4 frag_color, vec2 frag_coord)
{
    frag_color = vec4(1.0 - float(gl_PrimitiveID), 0.0, 1.0, 1.0);
}
";

const DEFAULT_GEOMETRY_KERNEL: &str = "\
layout(triangles) in;
layout(triangle_strip, max_vertices = 3) out;
void geometryMain()
{
    for (int i = 0; i < 3; ++i)
    {
        gl_Position = gl_in[i].gl_Position;
        gl_PrimitiveID = gl_PrimitiveIDIn;
        EmitVertex();
    }
    EndPrimitive();
}
";

/// The built-in kernel used for `stage` until a user file is loaded.
pub fn default_kernel(stage: ShaderStage) -> &'static str {
    match stage {
        ShaderStage::Vertex => DEFAULT_VERTEX_KERNEL,
        ShaderStage::Fragment => DEFAULT_FRAGMENT_KERNEL,
        ShaderStage::Geometry => DEFAULT_GEOMETRY_KERNEL,
    }
}

/// Shared uniform declarations, starting with the `#version` line.
pub fn prefix() -> &'static str {
    PREFIX.as_str()
}

/// Entry-point trampoline for `stage`.
pub fn suffix(stage: ShaderStage) -> &'static str {
    SUFFIXES[stage.index()].as_str()
}

/// Number of lines the prefix occupies before the user kernel.
pub fn prefix_lines() -> u32 {
    *PREFIX_LINES
}

/// One stage's full translation unit, kept as separate compile fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelSource {
    stage: ShaderStage,
    fragments: Vec<Cow<'static, str>>,
}

/// Wrap `kernel` with the prefix and the `stage` suffix.
pub fn assemble(stage: ShaderStage, kernel: &str) -> KernelSource {
    KernelSource {
        stage,
        fragments: vec![
            Cow::Borrowed(prefix()),
            Cow::Owned(kernel.to_owned()),
            Cow::Borrowed(suffix(stage)),
        ],
    }
}

impl KernelSource {
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    /// Fragments in compile order, ready for `glShaderSource`.
    pub fn fragments(&self) -> Vec<&str> {
        self.fragments.iter().map(|f| f.as_ref()).collect()
    }

    /// The user kernel text.
    pub fn kernel(&self) -> &str {
        &self.fragments[1]
    }

    /// Map a line of the assembled source to a 1-based line of the user
    /// kernel, or 0 when it falls in the prefix or the suffix.
    pub fn kernel_line(&self, assembled_line: u32) -> u32 {
        let offset = prefix_lines();
        if assembled_line <= offset {
            return 0;
        }
        let line = assembled_line - offset;
        if line as usize > self.kernel().lines().count() {
            0
        } else {
            line
        }
    }
}

impl fmt::Display for KernelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for fragment in &self.fragments {
            f.write_str(fragment)?;
        }
        Ok(())
    }
}

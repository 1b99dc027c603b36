//! GLSL version detection.

use glium::CapabilitiesSource;

/// Whether the context can compile `#version 330 core` kernels.
pub fn supports_kernel_glsl(ctx: &impl CapabilitiesSource) -> bool {
    ctx.get_capabilities()
        .supported_glsl_versions
        .iter()
        .any(|v| matches!(v, glium::Version(glium::Api::Gl, major, minor) if (*major, *minor) >= (3, 3)))
}

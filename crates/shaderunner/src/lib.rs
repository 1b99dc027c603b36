//! Live-reloading GLSL shader sandbox.
//!
//! A [`RenderContext`] watches kernel files and hot-swaps the full-screen
//! program whenever a kernel compiles and links; broken kernels produce an
//! error log and leave the last good program running. A [`GizmoLayer`]
//! draws pickable 3D handles into an ID buffer, and [`FrameMediator`] ties
//! both together behind host input events.
//!
//! Everything is generic over the [`shaderunner_gl::ShaderBackend`] and
//! [`shaderunner_gl::PickTarget`] traits; the OpenGL implementations live in
//! `shaderunner-gl`.

pub mod cache;
pub mod camera;
pub mod compiler;
pub mod config;
pub mod gizmo;
pub mod input;
pub mod kernel;
pub mod mediator;
pub mod overlay;
pub mod render_context;
pub mod watcher;

#[cfg(test)]
mod test_support;

pub use cache::ShaderCache;
pub use camera::Camera;
pub use compiler::{CompileResult, ErrorLogEntry};
pub use config::SandboxConfig;
pub use gizmo::{GizmoDescriptor, GizmoLayer, GizmoType, PickPayload};
pub use input::{InteractionState, Key, KeyMods, SpecialKey};
pub use kernel::KernelSource;
pub use mediator::{FrameMediator, LayerFlags};
pub use overlay::{ConsoleOverlay, ErrorConsole, KernelControls, Overlay};
pub use render_context::{
    CompileListener, LogListener, RenderContext, RenderState, SceneUniforms, UniformBinding,
};
pub use watcher::SourceWatcher;

//! Graphics backend seam for the shader sandbox.
//!
//! This crate defines the [`ShaderBackend`] and [`PickTarget`] traits, the
//! interfaces the sandbox core drives for shader compilation, uniform upload,
//! drawing and ID-buffer picking. The OpenGL implementations live in
//! [`opengl`]; the core never touches GL directly.
//!
//! Owned GL object names are wrapped in [`handle::Handle`], which deletes the
//! object through a deleter policy when dropped.

pub mod backend;
pub mod error;
pub mod handle;
pub mod loader;
pub mod pick;
pub mod stage;
pub mod validate_gl;

pub mod opengl;

pub use backend::{Primitive, ShaderBackend, UniformValue};
pub use loader::load_gl;
pub use pick::PickTarget;
pub use stage::{ShaderStage, StageSet};

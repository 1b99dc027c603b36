//! OpenGL implementations of the backend traits.
//!
//! [`GlDevice`] compiles, links and draws through raw GL calls in the
//! current context. [`PickFramebuffer`] is the off-screen color + ID target
//! used for mouse picking.

mod device;
mod framebuffer;

pub use device::{GlDevice, GlProgram, GlShader};
pub use framebuffer::PickFramebuffer;

//! Owned OpenGL object names.
//!
//! [`Handle`] exclusively owns one GL object name and deletes it through its
//! [`Deleter`] policy on drop. Zero is the empty sentinel and is never
//! deleted. Handles are move-only.

use std::fmt;
use std::marker::PhantomData;

use gl::types::GLuint;

/// Deletion policy for one kind of GL object.
pub trait Deleter {
    /// Human-readable object kind, used in trace output.
    const KIND: &'static str;

    /// Delete `name`. Never called with zero.
    ///
    /// # Safety
    ///
    /// A GL context owning `name` must be current.
    unsafe fn delete(name: GLuint);
}

pub struct Handle<D: Deleter> {
    name: GLuint,
    _policy: PhantomData<D>,
}

impl<D: Deleter> Handle<D> {
    /// Take ownership of `name`.
    pub fn new(name: GLuint) -> Self {
        Self {
            name,
            _policy: PhantomData,
        }
    }

    pub const fn empty() -> Self {
        Self {
            name: 0,
            _policy: PhantomData,
        }
    }

    pub fn get(&self) -> GLuint {
        self.name
    }

    pub fn is_empty(&self) -> bool {
        self.name == 0
    }

    /// Delete the owned object and take ownership of `name` instead.
    pub fn reset(&mut self, name: GLuint) {
        self.delete();
        self.name = name;
    }

    /// Give up ownership without deleting.
    pub fn release(mut self) -> GLuint {
        std::mem::replace(&mut self.name, 0)
    }

    /// Pointer for `glGen*` style out-parameters.
    pub fn as_mut_ptr(&mut self) -> *mut GLuint {
        &mut self.name
    }

    fn delete(&mut self) {
        if self.name != 0 {
            tracing::trace!(kind = D::KIND, name = self.name, "deleting GL object");
            unsafe { D::delete(self.name) };
            self.name = 0;
        }
    }
}

impl<D: Deleter> Default for Handle<D> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<D: Deleter> Drop for Handle<D> {
    fn drop(&mut self) {
        self.delete();
    }
}

impl<D: Deleter> fmt::Debug for Handle<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", D::KIND, self.name)
    }
}

pub struct ShaderDeleter;
pub struct ProgramDeleter;
pub struct TextureDeleter;
pub struct VertexArrayDeleter;
pub struct FramebufferDeleter;

impl Deleter for ShaderDeleter {
    const KIND: &'static str = "shader";
    unsafe fn delete(name: GLuint) {
        gl::DeleteShader(name);
    }
}

impl Deleter for ProgramDeleter {
    const KIND: &'static str = "program";
    unsafe fn delete(name: GLuint) {
        gl::DeleteProgram(name);
    }
}

impl Deleter for TextureDeleter {
    const KIND: &'static str = "texture";
    unsafe fn delete(name: GLuint) {
        gl::DeleteTextures(1, &name);
    }
}

impl Deleter for VertexArrayDeleter {
    const KIND: &'static str = "vertex array";
    unsafe fn delete(name: GLuint) {
        gl::DeleteVertexArrays(1, &name);
    }
}

impl Deleter for FramebufferDeleter {
    const KIND: &'static str = "framebuffer";
    unsafe fn delete(name: GLuint) {
        gl::DeleteFramebuffers(1, &name);
    }
}

pub type ShaderHandle = Handle<ShaderDeleter>;
pub type ProgramHandle = Handle<ProgramDeleter>;
pub type TextureHandle = Handle<TextureDeleter>;
pub type VertexArrayHandle = Handle<VertexArrayDeleter>;
pub type FramebufferHandle = Handle<FramebufferDeleter>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    thread_local! {
        static DELETED: RefCell<Vec<GLuint>> = const { RefCell::new(Vec::new()) };
    }

    struct Recording;

    impl Deleter for Recording {
        const KIND: &'static str = "recording";
        unsafe fn delete(name: GLuint) {
            DELETED.with(|d| d.borrow_mut().push(name));
        }
    }

    fn deleted() -> Vec<GLuint> {
        DELETED.with(|d| d.borrow().clone())
    }

    #[test]
    fn drop_deletes_owned_name() {
        DELETED.with(|d| d.borrow_mut().clear());
        {
            let _h = Handle::<Recording>::new(7);
        }
        assert_eq!(deleted(), vec![7]);
    }

    #[test]
    fn empty_handle_is_never_deleted() {
        DELETED.with(|d| d.borrow_mut().clear());
        {
            let h = Handle::<Recording>::empty();
            assert!(h.is_empty());
        }
        assert!(deleted().is_empty());
    }

    #[test]
    fn reset_deletes_previous_and_release_skips_delete() {
        DELETED.with(|d| d.borrow_mut().clear());
        let mut h = Handle::<Recording>::new(3);
        h.reset(4);
        assert_eq!(deleted(), vec![3]);
        assert_eq!(h.release(), 4);
        assert_eq!(deleted(), vec![3]);
    }

    #[test]
    fn moving_transfers_ownership() {
        DELETED.with(|d| d.borrow_mut().clear());
        let a = Handle::<Recording>::new(9);
        let b = a;
        assert_eq!(b.get(), 9);
        drop(b);
        assert_eq!(deleted(), vec![9]);
    }
}

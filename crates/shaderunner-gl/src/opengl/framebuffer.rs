//! [`PickFramebuffer`]: color + ID render target for mouse picking.
//!
//! Layout:
//!
//! - `COLOR_ATTACHMENT0`: `RGBA8`, the visible image, blitted to the back
//!   buffer at the end of the frame
//! - `COLOR_ATTACHMENT1`: `R32F`, one pick payload per pixel stored as float
//!   bits
//! - depth/stencil: `DEPTH24_STENCIL8`, for gizmo occlusion

use anyhow::{bail, Result};
use gl::types::{GLenum, GLint, GLuint};

use crate::error;
use crate::handle::{FramebufferHandle, TextureHandle};
use crate::pick::PickTarget;

const DRAW_BUFFERS: [GLenum; 2] = [gl::COLOR_ATTACHMENT0, gl::COLOR_ATTACHMENT1];
const ID_CLEAR: [f32; 4] = [0.0; 4];

pub struct PickFramebuffer {
    fbo: FramebufferHandle,
    color: TextureHandle,
    ids: TextureHandle,
    depth: TextureHandle,
    width: u32,
    height: u32,
}

impl PickFramebuffer {
    /// Create a target of the given size.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let mut target = Self {
            fbo: FramebufferHandle::empty(),
            color: TextureHandle::empty(),
            ids: TextureHandle::empty(),
            depth: TextureHandle::empty(),
            width: 0,
            height: 0,
        };
        target.resize(width, height)?;
        Ok(target)
    }

    pub fn fbo(&self) -> GLuint {
        self.fbo.get()
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    fn storage_texture(format: GLenum, width: u32, height: u32) -> TextureHandle {
        let mut texture = TextureHandle::empty();
        unsafe {
            gl::GenTextures(1, texture.as_mut_ptr());
            gl::BindTexture(gl::TEXTURE_2D, texture.get());
            gl::TexStorage2D(gl::TEXTURE_2D, 1, format, width as GLint, height as GLint);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MIN_FILTER, gl::NEAREST as GLint);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MAG_FILTER, gl::NEAREST as GLint);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_WRAP_S, gl::CLAMP_TO_EDGE as GLint);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_WRAP_T, gl::CLAMP_TO_EDGE as GLint);
            gl::BindTexture(gl::TEXTURE_2D, 0);
        }
        texture
    }

    fn release(&mut self) {
        unsafe { gl::BindFramebuffer(gl::FRAMEBUFFER, 0) };
        self.fbo.reset(0);
        self.color.reset(0);
        self.ids.reset(0);
        self.depth.reset(0);
        self.width = 0;
        self.height = 0;
    }
}

impl PickTarget for PickFramebuffer {
    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if self.width == width && self.height == height && !self.fbo.is_empty() {
            return Ok(());
        }
        if width == 0 || height == 0 {
            bail!("pick framebuffer needs a non-empty size, got {width}x{height}");
        }

        self.release();

        self.color = Self::storage_texture(gl::RGBA8, width, height);
        self.ids = Self::storage_texture(gl::R32F, width, height);
        self.depth = Self::storage_texture(gl::DEPTH24_STENCIL8, width, height);

        let status = unsafe {
            gl::GenFramebuffers(1, self.fbo.as_mut_ptr());
            gl::BindFramebuffer(gl::FRAMEBUFFER, self.fbo.get());
            gl::FramebufferTexture(gl::FRAMEBUFFER, gl::COLOR_ATTACHMENT0, self.color.get(), 0);
            gl::FramebufferTexture(gl::FRAMEBUFFER, gl::COLOR_ATTACHMENT1, self.ids.get(), 0);
            gl::FramebufferTexture(
                gl::FRAMEBUFFER,
                gl::DEPTH_STENCIL_ATTACHMENT,
                self.depth.get(),
                0,
            );
            let status = gl::CheckFramebufferStatus(gl::FRAMEBUFFER);
            gl::BindFramebuffer(gl::FRAMEBUFFER, 0);
            status
        };

        if status != gl::FRAMEBUFFER_COMPLETE {
            self.release();
            bail!("pick framebuffer incomplete: {}", error::enum_string(status));
        }
        error::check_error()?;

        self.width = width;
        self.height = height;
        tracing::debug!(width, height, fbo = self.fbo.get(), "pick framebuffer created");
        Ok(())
    }

    fn bind(&mut self) {
        unsafe {
            gl::BindFramebuffer(gl::FRAMEBUFFER, self.fbo.get());
            gl::DrawBuffers(DRAW_BUFFERS.len() as i32, DRAW_BUFFERS.as_ptr());
        }
    }

    fn unbind(&mut self) {
        unsafe { gl::BindFramebuffer(gl::FRAMEBUFFER, 0) };
    }

    fn clear_ids(&mut self) {
        unsafe { gl::ClearBufferfv(gl::COLOR, 1, ID_CLEAR.as_ptr()) };
    }

    fn read_id(&mut self, x: i32, y: i32) -> f32 {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return 0.0;
        }
        let mut value = 0.0f32;
        unsafe {
            gl::BindFramebuffer(gl::READ_FRAMEBUFFER, self.fbo.get());
            gl::ReadBuffer(gl::COLOR_ATTACHMENT1);
            gl::ReadPixels(
                x,
                y,
                1,
                1,
                gl::RED,
                gl::FLOAT,
                (&mut value as *mut f32).cast(),
            );
            gl::ReadBuffer(gl::NONE);
            gl::BindFramebuffer(gl::READ_FRAMEBUFFER, 0);
        }
        value
    }

    fn blit_to_screen(&mut self, width: u32, height: u32) {
        unsafe {
            gl::BindFramebuffer(gl::READ_FRAMEBUFFER, self.fbo.get());
            gl::ReadBuffer(gl::COLOR_ATTACHMENT0);
            gl::BindFramebuffer(gl::DRAW_FRAMEBUFFER, 0);
            gl::DrawBuffer(gl::BACK);
            gl::BlitFramebuffer(
                0,
                0,
                self.width as GLint,
                self.height as GLint,
                0,
                0,
                width as GLint,
                height as GLint,
                gl::COLOR_BUFFER_BIT,
                gl::NEAREST,
            );
            gl::BindFramebuffer(gl::FRAMEBUFFER, 0);
        }
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl Drop for PickFramebuffer {
    fn drop(&mut self) {
        self.release();
    }
}

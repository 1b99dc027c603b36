//! Common interface for the off-screen picking target.

use anyhow::Result;

/// Off-screen render target with a color attachment and a single-float ID
/// attachment.
///
/// Attachment 0 receives the visible image and is blitted to the back
/// buffer at the end of a frame. Attachment 1 stores one `f32` per pixel
/// whose bits are the pick payload of the object covering that pixel.
pub trait PickTarget {
    /// Recreate the attachments if dimensions changed.
    fn resize(&mut self, width: u32, height: u32) -> Result<()>;

    /// Bind as the draw framebuffer with both attachments enabled.
    fn bind(&mut self);

    /// Restore the default framebuffer.
    fn unbind(&mut self);

    /// Clear the ID attachment to 0.0 ("nothing").
    fn clear_ids(&mut self);

    /// Read back the ID attachment at pixel `(x, y)`, origin bottom-left.
    ///
    /// Returns 0.0 outside the target.
    fn read_id(&mut self, x: i32, y: i32) -> f32;

    /// Copy attachment 0 to the default back buffer.
    fn blit_to_screen(&mut self, width: u32, height: u32);

    /// Current dimensions of the attachments.
    fn dimensions(&self) -> (u32, u32);
}

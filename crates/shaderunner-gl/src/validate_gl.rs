//! Reset the state of the OpenGL context between layers.

/// Unbind programs, vertex arrays, 2D textures and framebuffers, and restore
/// the default blend/depth state.
///
/// # Safety
///
/// Must be called with a valid OpenGL context current.
pub unsafe fn reset_state() {
    gl::UseProgram(0);
    gl::BindVertexArray(0);

    gl::ActiveTexture(gl::TEXTURE0);
    gl::BindTexture(gl::TEXTURE_2D, 0);

    gl::Disable(gl::BLEND);
    gl::BlendFunc(gl::ONE, gl::ZERO);
    gl::Disable(gl::DEPTH_TEST);

    gl::BindFramebuffer(gl::FRAMEBUFFER, 0);
}

/// Assert that the viewport matches expected dimensions and scissor test is
/// disabled.
///
/// # Safety
///
/// Must be called with a valid OpenGL context current.
pub unsafe fn validate_viewport(width: u32, height: u32) {
    let scissor_enabled = gl::IsEnabled(gl::SCISSOR_TEST);
    debug_assert_eq!(scissor_enabled, gl::FALSE, "SCISSOR_TEST is enabled");

    let mut dims: [i32; 4] = [0; 4];
    gl::GetIntegerv(gl::VIEWPORT, dims.as_mut_ptr());
    debug_assert_eq!(
        dims,
        [0, 0, width as i32, height as i32],
        "VIEWPORT wrong value: {dims:?}"
    );
}

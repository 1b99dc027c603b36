//! GL function pointer loading.

use std::sync::Once;

static GL_INIT_ONCE: Once = Once::new();

/// Load GL function pointers for the current context.
///
/// Pointers are loaded exactly once via `gl_loader`; later calls are no-ops.
/// A context must be current on the calling thread.
pub fn load_gl() {
    GL_INIT_ONCE.call_once(|| {
        gl_loader::init_gl();
        gl::load_with(|s| gl_loader::get_proc_address(s).cast());
        tracing::debug!("GL function pointers loaded");
    });
}

/// Version, vendor and renderer strings of the current context.
pub fn context_description() -> Option<String> {
    let read = |name| unsafe {
        let ptr = gl::GetString(name);
        if ptr.is_null() {
            None
        } else {
            Some(
                std::ffi::CStr::from_ptr(ptr.cast())
                    .to_string_lossy()
                    .into_owned(),
            )
        }
    };
    Some(format!(
        "{} / {} / {}",
        read(gl::VERSION)?,
        read(gl::VENDOR)?,
        read(gl::RENDERER)?
    ))
}

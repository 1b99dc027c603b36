//! GL error state, info logs and debug output.

use std::ffi::{c_void, CStr};

use anyhow::{bail, Result};
use gl::types::{GLchar, GLenum, GLint, GLsizei, GLuint};

/// Human-readable name of a GL error or debug-output enum.
pub fn enum_string(value: GLenum) -> &'static str {
    match value {
        gl::NO_ERROR => "None",
        gl::INVALID_ENUM => "Invalid enum",
        gl::INVALID_VALUE => "Invalid value",
        gl::INVALID_OPERATION => "Invalid operation",
        gl::INVALID_FRAMEBUFFER_OPERATION => "Invalid framebuffer operation",
        gl::OUT_OF_MEMORY => "Out of memory",
        gl::STACK_UNDERFLOW => "Stack underflow",
        gl::STACK_OVERFLOW => "Stack overflow",

        gl::DEBUG_SOURCE_API => "API",
        gl::DEBUG_SOURCE_WINDOW_SYSTEM => "Window system",
        gl::DEBUG_SOURCE_SHADER_COMPILER => "Shader compiler",
        gl::DEBUG_SOURCE_THIRD_PARTY => "Third party",
        gl::DEBUG_SOURCE_APPLICATION => "Application",
        gl::DEBUG_SOURCE_OTHER => "Other",

        gl::DEBUG_TYPE_ERROR => "Error",
        gl::DEBUG_TYPE_DEPRECATED_BEHAVIOR => "Deprecated behaviour",
        gl::DEBUG_TYPE_UNDEFINED_BEHAVIOR => "Undefined behaviour",
        gl::DEBUG_TYPE_PORTABILITY => "Portability",
        gl::DEBUG_TYPE_PERFORMANCE => "Performance",
        gl::DEBUG_TYPE_MARKER => "Marker",
        gl::DEBUG_TYPE_PUSH_GROUP => "Push group",
        gl::DEBUG_TYPE_POP_GROUP => "Pop group",
        gl::DEBUG_TYPE_OTHER => "Other",

        gl::DEBUG_SEVERITY_HIGH => "High",
        gl::DEBUG_SEVERITY_MEDIUM => "Medium",
        gl::DEBUG_SEVERITY_LOW => "Low",
        gl::DEBUG_SEVERITY_NOTIFICATION => "Notification",

        gl::FRAMEBUFFER_COMPLETE => "Framebuffer complete",
        gl::FRAMEBUFFER_INCOMPLETE_ATTACHMENT => "Framebuffer incomplete attachment",
        gl::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT => "Framebuffer missing attachment",
        gl::FRAMEBUFFER_UNSUPPORTED => "Framebuffer unsupported",

        _ => "Unknown enum",
    }
}

/// Drain the GL error queue. Returns whether any error was pending.
pub fn drain_errors() -> bool {
    let mut had_error = false;
    unsafe {
        while gl::GetError() != gl::NO_ERROR {
            had_error = true;
        }
    }
    had_error
}

/// Fail with the first pending GL error, draining the rest.
pub fn check_error() -> Result<()> {
    let code = unsafe { gl::GetError() };
    if code == gl::NO_ERROR {
        return Ok(());
    }
    drain_errors();
    bail!("OpenGL error: {} (0x{code:04x})", enum_string(code))
}

/// Whether `glCompileShader` succeeded on `shader`.
pub fn shader_compiled(shader: GLuint) -> bool {
    let mut status = gl::FALSE as GLint;
    unsafe { gl::GetShaderiv(shader, gl::COMPILE_STATUS, &mut status) };
    status == gl::TRUE as GLint
}

/// Whether `glLinkProgram` succeeded on `program`.
pub fn program_linked(program: GLuint) -> bool {
    let mut status = gl::FALSE as GLint;
    unsafe { gl::GetProgramiv(program, gl::LINK_STATUS, &mut status) };
    status == gl::TRUE as GLint
}

pub fn shader_info_log(shader: GLuint) -> String {
    let mut len: GLint = 0;
    unsafe { gl::GetShaderiv(shader, gl::INFO_LOG_LENGTH, &mut len) };
    read_info_log(len, |cap, written, buf| unsafe {
        gl::GetShaderInfoLog(shader, cap, written, buf)
    })
}

pub fn program_info_log(program: GLuint) -> String {
    let mut len: GLint = 0;
    unsafe { gl::GetProgramiv(program, gl::INFO_LOG_LENGTH, &mut len) };
    read_info_log(len, |cap, written, buf| unsafe {
        gl::GetProgramInfoLog(program, cap, written, buf)
    })
}

fn read_info_log(len: GLint, fetch: impl FnOnce(GLsizei, *mut GLsizei, *mut GLchar)) -> String {
    if len <= 0 {
        return String::new();
    }
    let mut buf = vec![0u8; len as usize];
    let mut written: GLsizei = 0;
    fetch(len, &mut written, buf.as_mut_ptr().cast());
    buf.truncate(written.max(0) as usize);
    String::from_utf8_lossy(&buf).into_owned()
}

// ---------------------------------------------------------------------------
// Debug output
// ---------------------------------------------------------------------------

/// GL debug-output forwarding to `tracing`.
pub struct DebugMessages;

impl DebugMessages {
    /// Enable `GL_DEBUG_OUTPUT` and forward messages at `min_severity` or
    /// above.
    ///
    /// Does nothing when the context does not expose `glDebugMessageCallback`.
    pub fn install(min_severity: GLenum) {
        if !gl::DebugMessageCallback::is_loaded() {
            tracing::debug!("GL debug output unavailable");
            return;
        }
        unsafe {
            gl::Enable(gl::DEBUG_OUTPUT);
            gl::DebugMessageCallback(Some(forward_debug_message), std::ptr::null());
            gl::DebugMessageControl(
                gl::DONT_CARE,
                gl::DONT_CARE,
                gl::DONT_CARE,
                0,
                std::ptr::null(),
                gl::TRUE,
            );
            for severity in severities_below(min_severity) {
                gl::DebugMessageControl(
                    gl::DONT_CARE,
                    gl::DONT_CARE,
                    *severity,
                    0,
                    std::ptr::null(),
                    gl::FALSE,
                );
            }
        }
        drain_errors();
    }
}

/// Severities strictly less important than `min`.
fn severities_below(min: GLenum) -> &'static [GLenum] {
    match min {
        gl::DEBUG_SEVERITY_HIGH => &[
            gl::DEBUG_SEVERITY_MEDIUM,
            gl::DEBUG_SEVERITY_LOW,
            gl::DEBUG_SEVERITY_NOTIFICATION,
        ],
        gl::DEBUG_SEVERITY_MEDIUM => &[gl::DEBUG_SEVERITY_LOW, gl::DEBUG_SEVERITY_NOTIFICATION],
        gl::DEBUG_SEVERITY_LOW => &[gl::DEBUG_SEVERITY_NOTIFICATION],
        _ => &[],
    }
}

extern "system" fn forward_debug_message(
    source: GLenum,
    kind: GLenum,
    _id: GLuint,
    severity: GLenum,
    length: GLsizei,
    message: *const GLchar,
    _user: *mut c_void,
) {
    if message.is_null() {
        return;
    }
    let text = if length > 0 {
        let bytes = unsafe { std::slice::from_raw_parts(message.cast::<u8>(), length as usize) };
        String::from_utf8_lossy(bytes).into_owned()
    } else {
        unsafe { CStr::from_ptr(message) }.to_string_lossy().into_owned()
    };
    let (source, kind, level) = (enum_string(source), enum_string(kind), enum_string(severity));
    match severity {
        gl::DEBUG_SEVERITY_HIGH => tracing::error!("[{source}] [{kind}] [{level}] {text}"),
        gl::DEBUG_SEVERITY_MEDIUM => tracing::warn!("[{source}] [{kind}] [{level}] {text}"),
        gl::DEBUG_SEVERITY_LOW => tracing::debug!("[{source}] [{kind}] [{level}] {text}"),
        _ => tracing::trace!("[{source}] [{kind}] [{level}] {text}"),
    }
}

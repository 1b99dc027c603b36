//! Stage compilation and program linking with structured diagnostics.
//!
//! Compilation never fails hard. A rejected kernel yields a [`CompileResult`]
//! without a shader and a non-empty error log whose line numbers point into
//! the user kernel.

use std::fmt;

use shaderunner_gl::ShaderBackend;

use crate::kernel::KernelSource;

/// One diagnostic, mapped back to the user kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorLogEntry {
    /// 1-based line in the user kernel, 0 when not attributable to it.
    pub line: u32,
    pub message: String,
}

impl fmt::Display for ErrorLogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.line, self.message)
    }
}

/// Outcome of compiling one stage. `shader` is `None` on failure, in which
/// case `log` is non-empty.
#[derive(Debug)]
pub struct CompileResult<S> {
    pub shader: Option<S>,
    pub log: Vec<ErrorLogEntry>,
}

impl<S> CompileResult<S> {
    pub fn is_success(&self) -> bool {
        self.shader.is_some()
    }
}

/// Compile one assembled kernel.
pub fn compile<B: ShaderBackend>(backend: &mut B, source: &KernelSource) -> CompileResult<B::Shader> {
    match backend.compile_stage(source.stage(), &source.fragments()) {
        Ok(shader) => CompileResult {
            shader: Some(shader),
            log: Vec::new(),
        },
        Err(raw) => {
            let log = parse_info_log(&raw, |line| source.kernel_line(line));
            tracing::debug!(stage = %source.stage(), errors = log.len(), "compile failed");
            CompileResult { shader: None, log }
        }
    }
}

/// Link compiled stages. A failure is reported as a log whose entries are
/// not attributable to a kernel line.
pub fn link<B: ShaderBackend>(
    backend: &mut B,
    shaders: &[&B::Shader],
) -> Result<B::Program, Vec<ErrorLogEntry>> {
    backend
        .link_program(shaders)
        .map_err(|raw| parse_info_log(&raw, |_| 0))
}

/// Render a log as one entry per line.
pub fn describe(log: &[ErrorLogEntry]) -> String {
    log.iter()
        .map(ErrorLogEntry::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Info log parsing
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq)]
enum Severity {
    Error,
    Warning,
}

#[derive(Debug, PartialEq, Eq)]
struct Diagnostic<'a> {
    severity: Severity,
    line: u32,
    message: &'a str,
}

/// Parse a backend info log into error entries, remapping line numbers with
/// `map_line`. Warnings are dropped.
///
/// Understands the Mesa (`0:12(5): error: ...`), NVIDIA
/// (`0(12) : error C0000: ...`) and AMD/Apple (`ERROR: 0:12: ...`) formats.
/// When no line is recognised the raw text becomes a single entry at line 0,
/// so a failed compile never yields an empty log.
pub fn parse_info_log(raw: &str, map_line: impl Fn(u32) -> u32) -> Vec<ErrorLogEntry> {
    let mut entries = Vec::new();

    for text in raw.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let Some(diagnostic) = parse_diagnostic(text) else {
            continue;
        };
        if diagnostic.severity == Severity::Error {
            entries.push(ErrorLogEntry {
                line: map_line(diagnostic.line),
                message: diagnostic.message.to_owned(),
            });
        }
    }

    if entries.is_empty() {
        let message = raw.trim();
        entries.push(ErrorLogEntry {
            line: 0,
            message: if message.is_empty() {
                "unknown error (empty info log)".to_owned()
            } else {
                message.to_owned()
            },
        });
    }
    entries
}

fn parse_diagnostic(text: &str) -> Option<Diagnostic<'_>> {
    parse_amd(text)
        .or_else(|| parse_mesa(text))
        .or_else(|| parse_nvidia(text))
}

fn severity_of(kind: &str) -> Option<Severity> {
    let kind = kind.trim().to_ascii_lowercase();
    if kind.contains("warning") {
        Some(Severity::Warning)
    } else if kind.contains("error") {
        Some(Severity::Error)
    } else {
        None
    }
}

fn number(text: &str) -> Option<u32> {
    let text = text.trim();
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// `ERROR: 0:12: message`
fn parse_amd(text: &str) -> Option<Diagnostic<'_>> {
    let (kind, rest) = text.split_once(": ")?;
    if kind.contains(|c: char| c.is_ascii_digit() || c == '(') {
        return None;
    }
    let severity = severity_of(kind)?;
    let (_source, rest) = rest.split_once(':').filter(|(s, _)| number(s).is_some())?;
    let (line, message) = rest.split_once(':')?;
    Some(Diagnostic {
        severity,
        line: number(line)?,
        message: message.trim(),
    })
}

/// `0:12(5): error: message`
fn parse_mesa(text: &str) -> Option<Diagnostic<'_>> {
    let (_source, rest) = text.split_once(':').filter(|(s, _)| number(s).is_some())?;
    let (line, rest) = rest.split_once('(')?;
    let (_column, rest) = rest.split_once(')')?;
    let rest = rest.trim_start().strip_prefix(':')?;
    let (kind, message) = rest.split_once(':')?;
    Some(Diagnostic {
        severity: severity_of(kind)?,
        line: number(line)?,
        message: message.trim(),
    })
}

/// `0(12) : error C0000: message`
fn parse_nvidia(text: &str) -> Option<Diagnostic<'_>> {
    let (_source, rest) = text.split_once('(').filter(|(s, _)| number(s).is_some())?;
    let (line, rest) = rest.split_once(')')?;
    let rest = rest.trim_start().strip_prefix(':')?;
    let (kind, message) = rest.split_once(':')?;
    Some(Diagnostic {
        severity: severity_of(kind.split_whitespace().next()?)?,
        line: number(line)?,
        message: message.trim(),
    })
}

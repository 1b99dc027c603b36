//! Overlay contracts and the built-in console overlay.
//!
//! The overlay only talks to the rest of the sandbox through
//! [`KernelControls`] and a read-only [`InteractionState`] snapshot. The
//! default [`ConsoleOverlay`] renders through `tracing` and takes commands
//! from a one-line prompt: `Tab` opens it, `Enter` submits, `Escape`
//! cancels. A `name=value` command sets a uniform binding, anything else is
//! taken as a new fragment kernel path.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use shaderunner_gl::ShaderStage;

use crate::compiler::ErrorLogEntry;
use crate::input::{InteractionState, Key, KeyMods, SpecialKey};
use crate::render_context::{CompileListener, LogListener, UniformBinding};

/// Kernel queries and submissions available to an overlay.
pub trait KernelControls {
    /// Path of the watched fragment kernel.
    fn kernel_path(&self) -> Option<&Path>;

    fn submit_kernel_path(&mut self, path: PathBuf);

    fn uniform_bindings(&self) -> &[UniformBinding];

    fn submit_uniform_bindings(&mut self, bindings: Vec<UniformBinding>);
}

/// The top-most layer, drawn after the picking composite.
pub trait Overlay {
    fn run_frame(&mut self, controls: &mut dyn KernelControls, state: &InteractionState);

    /// Returns `true` when the overlay consumed the key.
    fn key_event(&mut self, key: Key, mods: KeyMods, down: bool) -> bool;

    /// Returns `true` when the overlay consumed the character.
    fn text_input(&mut self, ch: char) -> bool;
}

// ---------------------------------------------------------------------------
// Error console
// ---------------------------------------------------------------------------

/// Text of the latest compile log of every stage, followed by the last
/// link log. Each entry reads `"{line} {source line}\n{message}\n"`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ErrorConsole {
    stages: [String; ShaderStage::COUNT],
    link: String,
    text: String,
}

impl ErrorConsole {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Replace the section of `stage` with `log` formatted against `kernel`.
    /// Any link log is dropped, since it belongs to an older build.
    pub fn set_stage_log(&mut self, stage: ShaderStage, kernel: &str, log: &[ErrorLogEntry]) {
        self.stages[stage.index()] = format_log(kernel, log);
        self.link.clear();
        self.rebuild();
    }

    pub fn set_link_log(&mut self, log: &[ErrorLogEntry]) {
        self.link = format_log("", log);
        self.rebuild();
    }

    fn rebuild(&mut self) {
        self.text = self.stages.concat();
        self.text.push_str(&self.link);
    }
}

fn format_log(kernel: &str, log: &[ErrorLogEntry]) -> String {
    let mut text = String::new();
    for entry in log {
        let source_line = (entry.line as usize)
            .checked_sub(1)
            .and_then(|i| kernel.lines().nth(i))
            .map(str::trim)
            .unwrap_or("");
        text.push_str(&format!("{} {}\n{}\n", entry.line, source_line, entry.message));
    }
    text
}

impl CompileListener for Rc<RefCell<ErrorConsole>> {
    fn on_compile_finished(
        &mut self,
        stage: ShaderStage,
        path: Option<&Path>,
        kernel: &str,
        log: &[ErrorLogEntry],
    ) {
        LogListener.on_compile_finished(stage, path, kernel, log);
        self.borrow_mut().set_stage_log(stage, kernel, log);
    }

    fn on_link_failed(&mut self, log: &[ErrorLogEntry]) {
        LogListener.on_link_failed(log);
        self.borrow_mut().set_link_log(log);
    }
}

// ---------------------------------------------------------------------------
// Console overlay
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Command {
    KernelPath(PathBuf),
    Uniform(UniformBinding),
}

fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if let Some((name, value)) = line.split_once('=') {
        if let Ok(value) = value.trim().parse::<f32>() {
            let name = name.trim();
            if !name.is_empty() {
                return Some(Command::Uniform(UniformBinding::new(name, value)));
            }
        }
    }
    Some(Command::KernelPath(PathBuf::from(line)))
}

/// Console-backed overlay.
pub struct ConsoleOverlay {
    console: Rc<RefCell<ErrorConsole>>,
    shown: ErrorConsole,
    prompt: Option<String>,
    submitted: Vec<Command>,
    last_state: Option<(u32, u32)>,
}

impl ConsoleOverlay {
    pub fn new(console: Rc<RefCell<ErrorConsole>>) -> Self {
        Self {
            console,
            shown: ErrorConsole::default(),
            prompt: None,
            submitted: Vec::new(),
            last_state: None,
        }
    }

    pub fn is_prompt_open(&self) -> bool {
        self.prompt.is_some()
    }

    fn apply(controls: &mut dyn KernelControls, command: Command) {
        match command {
            Command::KernelPath(path) => {
                tracing::info!(path = %path.display(), "kernel path submitted");
                controls.submit_kernel_path(path);
            }
            Command::Uniform(binding) => {
                let mut bindings = controls.uniform_bindings().to_vec();
                match bindings.iter_mut().find(|b| b.name == binding.name) {
                    Some(existing) => existing.value = binding.value,
                    None => bindings.push(binding.clone()),
                }
                tracing::info!(name = %binding.name, value = binding.value, "uniform set");
                controls.submit_uniform_bindings(bindings);
            }
        }
    }
}

impl Overlay for ConsoleOverlay {
    fn run_frame(&mut self, controls: &mut dyn KernelControls, state: &InteractionState) {
        for command in self.submitted.drain(..) {
            Self::apply(controls, command);
        }

        let console = self.console.borrow();
        if *console != self.shown {
            if !console.is_empty() {
                tracing::warn!("kernel errors:\n{}", console.text());
            } else if !self.shown.is_empty() {
                tracing::info!("kernel errors cleared");
            }
            self.shown = console.clone();
        }

        let picking = (state.hover.bits(), state.selected.bits());
        if self.last_state != Some(picking) {
            tracing::trace!(
                hover = picking.0,
                selected = picking.1,
                camera = ?state.camera_position,
                "interaction state"
            );
            self.last_state = Some(picking);
        }
    }

    fn key_event(&mut self, key: Key, _mods: KeyMods, down: bool) -> bool {
        let Some(prompt) = self.prompt.as_mut() else {
            if down && key == Key::Special(SpecialKey::Tab) {
                self.prompt = Some(String::new());
                return true;
            }
            return false;
        };
        if !down {
            return true;
        }
        match key {
            Key::Special(SpecialKey::Enter) => {
                if let Some(command) = parse_command(prompt) {
                    self.submitted.push(command);
                }
                self.prompt = None;
            }
            Key::Special(SpecialKey::Escape) => self.prompt = None,
            Key::Special(SpecialKey::Backspace) => {
                prompt.pop();
            }
            _ => {}
        }
        true
    }

    fn text_input(&mut self, ch: char) -> bool {
        match self.prompt.as_mut() {
            Some(prompt) => {
                if !ch.is_control() {
                    prompt.push(ch);
                }
                true
            }
            None => false,
        }
    }
}

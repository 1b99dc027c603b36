//! Window event loop driving the [`FrameMediator`].

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

use anyhow::{anyhow, bail, Result};
use glium::backend::glutin::SimpleWindowBuilder;
use glium::glutin::surface::WindowSurface;
use glium::winit::application::ApplicationHandler;
use glium::winit::event::{ElementState, MouseButton, WindowEvent};
use glium::winit::event_loop::{ActiveEventLoop, EventLoop};
use glium::winit::keyboard::{Key as WinitKey, ModifiersState, NamedKey};
use glium::winit::window::{Window, WindowId};
use glium::{CapabilitiesSource, Display};
use shaderunner::{
    ConsoleOverlay, ErrorConsole, FrameMediator, KeyMods, LayerFlags, Overlay, SandboxConfig,
    SpecialKey,
};
use shaderunner_gl::error::DebugMessages;
use shaderunner_gl::opengl::{GlDevice, PickFramebuffer};
use shaderunner_gl::validate_gl::reset_state;

use crate::glsl;

/// Host key code for a winit logical key: special keys map to
/// [`SpecialKey`] codes, printable ASCII to its character code.
pub fn key_code(key: &WinitKey) -> Option<u32> {
    let special = match key {
        WinitKey::Named(named) => match named {
            NamedKey::Tab => SpecialKey::Tab,
            NamedKey::ArrowLeft => SpecialKey::Left,
            NamedKey::ArrowRight => SpecialKey::Right,
            NamedKey::ArrowUp => SpecialKey::Up,
            NamedKey::ArrowDown => SpecialKey::Down,
            NamedKey::PageUp => SpecialKey::PageUp,
            NamedKey::PageDown => SpecialKey::PageDown,
            NamedKey::Home => SpecialKey::Home,
            NamedKey::End => SpecialKey::End,
            NamedKey::Insert => SpecialKey::Insert,
            NamedKey::Delete => SpecialKey::Delete,
            NamedKey::Backspace => SpecialKey::Backspace,
            NamedKey::Enter => SpecialKey::Enter,
            NamedKey::Escape => SpecialKey::Escape,
            NamedKey::Space => return Some(u32::from(b' ')),
            _ => return None,
        },
        WinitKey::Character(text) => {
            let mut chars = text.chars();
            return match (chars.next(), chars.next()) {
                (Some(ch), None) if ch.is_ascii_graphic() => Some(ch as u32),
                _ => None,
            };
        }
        _ => return None,
    };
    Some(special as u32)
}

pub fn mod_bits(state: ModifiersState) -> u32 {
    let mut mods = KeyMods::empty();
    mods.set(KeyMods::CTRL, state.control_key());
    mods.set(KeyMods::SHIFT, state.shift_key());
    mods.set(KeyMods::ALT, state.alt_key());
    mods.bits()
}

/// The sandbox window. Field order matters: the mediator owns GL objects and
/// must drop while the display's context is still alive.
pub struct Sandbox {
    mediator: FrameMediator<GlDevice, PickFramebuffer>,
    display: Display<WindowSurface>,
    window: Window,
    mods: u32,
    last_frame: Instant,
    error: Option<anyhow::Error>,
}

impl Sandbox {
    pub fn new(event_loop: &EventLoop<()>, config: SandboxConfig) -> Result<Self> {
        let (window, display) = SimpleWindowBuilder::new()
            .with_title("shaderunner")
            .with_inner_size(config.width, config.height)
            .build(event_loop);

        if !glsl::supports_kernel_glsl(&*display) {
            bail!(
                "context does not support GLSL 3.30 (available: {:?})",
                display.get_capabilities().supported_glsl_versions
            );
        }

        shaderunner_gl::load_gl();
        if let Some(description) = shaderunner_gl::loader::context_description() {
            tracing::info!("OpenGL context: {description}");
        }
        DebugMessages::install(gl::DEBUG_SEVERITY_MEDIUM);

        let size = window.inner_size();
        let config = SandboxConfig {
            width: size.width.max(1),
            height: size.height.max(1),
            ..config
        };

        let console = Rc::new(RefCell::new(ErrorConsole::default()));
        let overlay = config
            .layers
            .contains(LayerFlags::OVERLAY)
            .then(|| Box::new(ConsoleOverlay::new(console.clone())) as Box<dyn Overlay>);
        let device = GlDevice::new()?;
        let target = PickFramebuffer::new(config.width, config.height)?;
        let mediator = FrameMediator::new(device, target, config, Box::new(console), overlay)?;

        Ok(Self {
            mediator,
            display,
            window,
            mods: 0,
            last_frame: Instant::now(),
            error: None,
        })
    }

    /// The error that stopped the event loop, if any.
    pub fn finish(self) -> Result<()> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        let alive = self.mediator.run_frame(dt);
        unsafe { reset_state() };
        if let Err(err) = self.display.swap_buffers() {
            self.error = Some(anyhow!("swap buffers failed: {err:?}"));
            event_loop.exit();
            return;
        }
        if !alive {
            tracing::error!("frame failed, shutting down");
            self.error = Some(anyhow!("frame rendering failed"));
            event_loop.exit();
        }
    }
}

impl ApplicationHandler for Sandbox {
    fn resumed(&mut self, _event_loop: &ActiveEventLoop) {
        self.window.request_redraw();
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                self.display.resize((size.width, size.height));
                self.mediator.resize(size.width, size.height);
            }
            WindowEvent::Focused(false) => self.mediator.focus_lost(),
            WindowEvent::ModifiersChanged(modifiers) => self.mods = mod_bits(modifiers.state()),
            WindowEvent::CursorMoved { position, .. } => {
                let height = self.mediator.state().screen_size[1] as i32;
                self.mediator
                    .mouse_move(position.x as i32, height - 1 - position.y as i32);
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => self.mediator.mouse_down(state == ElementState::Pressed),
            WindowEvent::KeyboardInput { event, .. } => {
                let down = event.state == ElementState::Pressed;
                if let Some(code) = key_code(&event.logical_key) {
                    self.mediator.key_event(code, self.mods, down);
                }
                if let (true, Some(text)) = (down, event.text.as_ref()) {
                    for ch in text.chars() {
                        self.mediator.text_input(ch);
                    }
                }
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        self.window.request_redraw();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shaderunner::Key;

    #[test]
    fn named_keys_map_to_special_codes() {
        let code = key_code(&WinitKey::Named(NamedKey::Escape)).unwrap();
        assert_eq!(Key::from_code(code), Some(Key::Special(SpecialKey::Escape)));
        let code = key_code(&WinitKey::Named(NamedKey::ArrowUp)).unwrap();
        assert_eq!(Key::from_code(code), Some(Key::Special(SpecialKey::Up)));
        assert_eq!(key_code(&WinitKey::Named(NamedKey::F5)), None);
    }

    #[test]
    fn characters_map_to_ascii() {
        let code = key_code(&WinitKey::Character("w".into())).unwrap();
        assert_eq!(Key::from_code(code), Some(Key::Char(b'W')));
        assert_eq!(key_code(&WinitKey::Named(NamedKey::Space)), Some(0x20));
        assert_eq!(key_code(&WinitKey::Character("é".into())), None);
    }

    #[test]
    fn modifier_bits_follow_key_mods() {
        let state = ModifiersState::CONTROL | ModifiersState::ALT;
        let mods = KeyMods::from_bits_truncate(mod_bits(state));
        assert!(mods.contains(KeyMods::CTRL | KeyMods::ALT));
        assert!(!mods.contains(KeyMods::SHIFT));
    }
}

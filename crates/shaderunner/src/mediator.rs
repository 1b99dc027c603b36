//! Frame mediator: input routing and per-frame layer composition.
//!
//! Frame order: integrate the camera, bind the pick target, draw the kernel
//! pass, draw (or just clear) the gizmo ID pass, blit the color attachment
//! to the back buffer, and finally run the overlay.

use anyhow::Result;
use glam::{IVec2, Mat4, Vec3};
use shaderunner_gl::{PickTarget, ShaderBackend};

use crate::camera::{projection_for, Camera};
use crate::config::SandboxConfig;
use crate::gizmo::{GizmoDescriptor, GizmoLayer, GizmoType};
use crate::input::{InteractionState, Key, KeyMods};
use crate::overlay::{KernelControls, Overlay};
use crate::render_context::{CompileListener, RenderContext, SceneUniforms};

bitflags::bitflags! {
    /// Which layers a mediator drives.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LayerFlags: u32 {
        const SHADER = 1 << 0;
        const GIZMO = 1 << 1;
        const OVERLAY = 1 << 2;
    }
}

/// Three transform handles above a row of boxes.
pub fn default_scene() -> Vec<GizmoDescriptor> {
    let handles = (-1..=1).map(|i| {
        GizmoDescriptor::new(GizmoType::Transform, Vec3::new(i as f32 * 1.5, 0.5, -4.0))
    });
    let boxes = (-2..=2).map(|i| {
        GizmoDescriptor::new(GizmoType::Box, Vec3::new(i as f32 * 0.75, -1.0, -4.0))
    });
    handles.chain(boxes).collect()
}

pub struct FrameMediator<B: ShaderBackend, P: PickTarget> {
    backend: B,
    target: P,
    render: Option<RenderContext<B>>,
    gizmos: Option<GizmoLayer<B>>,
    overlay: Option<Box<dyn Overlay>>,
    config: SandboxConfig,
    camera: Camera,
    state: InteractionState,
    projection: Mat4,
    view_projection: Mat4,
}

impl<B: ShaderBackend, P: PickTarget> FrameMediator<B, P> {
    /// Build the layers enabled in `config.layers` and start watching the
    /// configured kernel files.
    pub fn new(
        mut backend: B,
        mut target: P,
        config: SandboxConfig,
        listener: Box<dyn CompileListener>,
        overlay: Option<Box<dyn Overlay>>,
    ) -> Result<Self> {
        let (width, height) = (config.width.max(1), config.height.max(1));

        let render = if config.layers.contains(LayerFlags::SHADER) {
            let mut render = RenderContext::new(&mut backend, config.stages(), listener)?;
            render.set_resolution(width, height);
            render.set_reload_period(config.reload_period);
            for (stage, path) in config.kernel_paths() {
                render.watch(stage, path);
            }
            Some(render)
        } else {
            None
        };

        let gizmos = if config.layers.contains(LayerFlags::GIZMO) {
            target.resize(width, height)?;
            let mut layer = GizmoLayer::new(&mut backend, config.drag_sensitivity)?;
            for gizmo in default_scene() {
                layer.push(gizmo);
            }
            Some(layer)
        } else {
            None
        };

        let overlay = overlay.filter(|_| config.layers.contains(LayerFlags::OVERLAY));

        let state = InteractionState::new([width, height], config.show_gizmos);
        let projection = projection_for(&config.projection, width, height);

        tracing::info!(width, height, layers = ?config.layers, "frame mediator ready");
        Ok(Self {
            backend,
            target,
            render,
            gizmos,
            overlay,
            config,
            camera: Camera::default(),
            state,
            projection,
            view_projection: projection,
        })
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn render_context(&self) -> Option<&RenderContext<B>> {
        self.render.as_ref()
    }

    pub fn render_context_mut(&mut self) -> Option<&mut RenderContext<B>> {
        self.render.as_mut()
    }

    pub fn gizmo_layer(&self) -> Option<&GizmoLayer<B>> {
        self.gizmos.as_ref()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn height_over_width(&self) -> f32 {
        self.state.screen_size[1] as f32 / self.state.screen_size[0].max(1) as f32
    }

    // -----------------------------------------------------------------------
    // Host events
    // -----------------------------------------------------------------------

    pub fn resize(&mut self, width: u32, height: u32) {
        let (width, height) = (width.max(1), height.max(1));
        if self.state.screen_size == [width, height] {
            return;
        }
        self.state.screen_size = [width, height];
        if let Some(render) = self.render.as_mut() {
            render.set_resolution(width, height);
        }
        if self.gizmos.is_some() {
            if let Err(err) = self.target.resize(width, height) {
                tracing::error!("{err:#}");
            }
        }
        self.projection = projection_for(&self.config.projection, width, height);
        tracing::debug!(width, height, "resized");
    }

    pub fn mouse_down(&mut self, down: bool) {
        if self.state.mouse_down == down {
            return;
        }
        self.state.mouse_down = down;

        if let Some(gizmos) = self.gizmos.as_mut() {
            if down {
                gizmos.press();
            } else {
                gizmos.release();
            }
            self.state.hover = gizmos.hover();
            self.state.selected = gizmos.selected();
        }
    }

    /// Mouse moved to `(x, y)`, origin bottom-left.
    pub fn mouse_move(&mut self, x: i32, y: i32) {
        let position = IVec2::new(x, y);
        if self.state.mouse_position == position {
            return;
        }
        let delta = if self.state.mouse_position == IVec2::splat(-1) {
            IVec2::ZERO
        } else {
            position - self.state.mouse_position
        };
        self.state.mouse_position = position;
        self.state.mouse_delta += delta;

        let height_over_width = self.height_over_width();
        let mut dragging = false;
        if let Some(gizmos) = self.gizmos.as_mut() {
            if !gizmos.selected().is_none() {
                dragging = true;
                gizmos.drag(delta.as_vec2(), &self.view_projection, height_over_width);
            } else {
                let payload = gizmos.pick(&mut self.target, x, y);
                gizmos.update_hover(payload);
                self.state.hover = gizmos.hover();
            }
        }

        let look = self.config.camera.look_sensitivity;
        if self.state.mouse_down && !dragging && look > 0.0 && delta != IVec2::ZERO {
            self.camera
                .rotate(delta.y as f32 * look, -(delta.x as f32) * look);
        }
    }

    /// Raw host key event. `code` and `mods` use the [`Key`] and
    /// [`KeyMods`] encodings.
    pub fn key_event(&mut self, code: u32, mods: u32, down: bool) {
        let mods = KeyMods::from_bits_truncate(mods);
        self.state.modifiers = mods;
        let Some(key) = Key::from_code(code) else {
            return;
        };
        if let Some(overlay) = self.overlay.as_mut() {
            if overlay.key_event(key, mods, down) {
                return;
            }
        }
        if down && key == Key::Char(b'G') && mods.contains(KeyMods::CTRL) {
            self.state.enable_gizmos = !self.state.enable_gizmos;
            tracing::info!(enabled = self.state.enable_gizmos, "gizmo display toggled");
        }
        self.state.set_down(key, down);
    }

    pub fn text_input(&mut self, ch: char) {
        if let Some(overlay) = self.overlay.as_mut() {
            overlay.text_input(ch);
        }
    }

    /// Window lost focus.
    pub fn focus_lost(&mut self) {
        self.state.release_keys();
    }

    // -----------------------------------------------------------------------
    // Frame
    // -----------------------------------------------------------------------

    /// Run one frame of `dt` seconds. Returns `false` on an unrecoverable
    /// backend failure.
    pub fn run_frame(&mut self, dt: f32) -> bool {
        self.camera
            .integrate(&self.state, dt, &self.config.camera);
        self.state.camera_position = self.camera.position;
        self.state.camera_rotation = [self.camera.pitch(), self.camera.yaw()];
        self.view_projection = self.projection * self.camera.view();

        let [width, height] = self.state.screen_size;
        let mut alive = true;

        if self.gizmos.is_some() {
            self.target.bind();
        }

        if let Some(render) = self.render.as_mut() {
            let matrix = self.view_projection.to_cols_array();
            let positions = self
                .gizmos
                .as_ref()
                .map(GizmoLayer::positions)
                .unwrap_or_default();
            let scene = SceneUniforms {
                projection: Some(&matrix),
                gizmo_positions: &positions,
            };
            if let Err(err) = render.render_frame(&mut self.backend, dt, &scene) {
                tracing::error!("kernel pass failed: {err:#}");
                alive = false;
            }
        }

        if let Some(gizmos) = self.gizmos.as_ref() {
            gizmos.render(
                &mut self.backend,
                &mut self.target,
                &self.view_projection,
                self.state.enable_gizmos,
            );
            self.target.unbind();
            self.target.blit_to_screen(width, height);
        }

        if let Err(err) = self.backend.check_error() {
            tracing::error!("frame failed: {err:#}");
            alive = false;
        }

        if let (Some(overlay), Some(render)) = (self.overlay.as_mut(), self.render.as_mut()) {
            overlay.run_frame(render as &mut dyn KernelControls, &self.state);
        }

        self.state.mouse_delta = IVec2::ZERO;
        alive
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gizmo::PickPayload;
    use crate::input::SpecialKey;
    use crate::render_context::{LogListener, UniformBinding};
    use crate::test_support::{FakeBackend, FakeTarget};

    fn mediator(config: SandboxConfig) -> FrameMediator<FakeBackend, FakeTarget> {
        FrameMediator::new(
            FakeBackend::default(),
            FakeTarget::default(),
            config,
            Box::new(LogListener),
            None,
        )
        .unwrap()
    }

    fn small() -> SandboxConfig {
        SandboxConfig {
            width: 800,
            height: 600,
            ..SandboxConfig::default()
        }
    }

    #[test]
    fn default_scene_fits_the_uniform_array() {
        let scene = default_scene();
        assert!(scene.len() <= crate::kernel::MAX_GIZMOS);
        assert_eq!(
            scene.iter().filter(|g| g.kind == GizmoType::Transform).count(),
            3
        );
    }

    #[test]
    fn layers_follow_flags() {
        let mut config = small();
        config.layers.remove(LayerFlags::GIZMO);
        let m = mediator(config);
        assert!(m.render_context().is_some());
        assert!(m.gizmo_layer().is_none());
    }

    #[test]
    fn frame_composites_through_the_pick_target() {
        let mut m = mediator(small());
        assert!(m.run_frame(0.016));
        assert_eq!(m.target.clears, 1);
        assert_eq!(m.target.blits, 1);
        assert!(!m.target.bound);
        assert_eq!(m.target.dimensions(), (800, 600));
        // kernel pass plus one point per gizmo
        assert_eq!(m.backend().draws(), 1 + default_scene().len());
    }

    #[test]
    fn hidden_gizmos_only_clear_ids() {
        let mut config = small();
        config.show_gizmos = false;
        let mut m = mediator(config);
        m.run_frame(0.016);
        assert_eq!(m.target.clears, 1);
        assert_eq!(m.backend().draws(), 1);
    }

    #[test]
    fn mistyped_binding_keeps_the_frame_alive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.glsl");
        std::fs::write(
            &path,
            "uniform vec3 speed;\nvoid imageMain(inout vec4 c, vec2 p){ c = vec4(speed, 1.0); }",
        )
        .unwrap();
        let mut m = mediator(SandboxConfig {
            fragment_kernel: Some(path),
            ..small()
        });
        m.render_context_mut()
            .unwrap()
            .set_uniforms(vec![UniformBinding::new("speed", 1.0)]);

        assert!(m.run_frame(0.016));
        assert!(m.run_frame(0.016));
    }

    #[test]
    fn ctrl_g_toggles_gizmo_display() {
        let mut m = mediator(small());
        assert!(m.state().enable_gizmos);
        m.key_event('g' as u32, KeyMods::CTRL.bits(), true);
        assert!(!m.state().enable_gizmos);
    }

    #[test]
    fn hover_and_drag_through_mouse_events() {
        let mut m = mediator(small());
        m.run_frame(0.016);
        let handle_y = PickPayload::pack(2, 1);
        m.target.ids.insert((400, 300), handle_y.to_f32());

        m.mouse_move(400, 300);
        assert_eq!(m.state().hover, handle_y);

        m.mouse_down(true);
        assert_eq!(m.state().selected, handle_y);
        let before = m.gizmo_layer().unwrap().gizmos()[1].position;

        m.mouse_move(400, 320);
        let after = m.gizmo_layer().unwrap().gizmos()[1].position;
        assert!(after.y > before.y);
        assert_eq!(after.x, before.x);
        assert_eq!(after.z, before.z);
        // no mouse-look while dragging
        assert_eq!(m.camera().yaw(), 0.0);

        m.mouse_down(false);
        assert!(m.state().selected.is_none());
        assert!(m.state().hover.is_none());
    }

    #[test]
    fn mouse_look_rotates_the_camera_when_nothing_is_selected() {
        let mut m = mediator(small());
        m.mouse_move(100, 100);
        m.mouse_down(true);
        m.mouse_move(110, 100);
        assert!(m.camera().yaw() > 0.0);
    }

    #[test]
    fn held_keys_move_the_camera() {
        let mut m = mediator(small());
        m.key_event('w' as u32, 0, true);
        m.run_frame(1.0);
        assert!(m.state().camera_position.z < 0.0);
        m.key_event('w' as u32, 0, false);
        let z = m.state().camera_position.z;
        m.run_frame(1.0);
        assert_eq!(m.state().camera_position.z, z);
        m.key_event(SpecialKey::Escape as u32, 0, true);
    }
}

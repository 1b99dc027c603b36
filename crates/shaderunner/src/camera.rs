//! Free-fly camera and the perspective projection shared by all layers.

use glam::{Mat4, Quat, Vec3};

use crate::config::{CameraSettings, ProjectionSettings};
use crate::input::{InteractionState, Key, KeyMods, SpecialKey};

/// Perspective projection with a horizontal field of view.
///
/// `height_over_width` is the inverse aspect ratio of the viewport; `alpha`
/// the horizontal field of view in radians.
pub fn perspective(near: f32, far: f32, alpha: f32, height_over_width: f32) -> Mat4 {
    let inv_tan_half_alpha = 1.0 / (alpha * 0.5).tan();
    let inv_fmn = 1.0 / (far - near);
    Mat4::from_cols_array(&[
        inv_tan_half_alpha,
        0.0,
        0.0,
        0.0,
        0.0,
        (1.0 / height_over_width) * inv_tan_half_alpha,
        0.0,
        0.0,
        0.0,
        0.0,
        -(far + near) * inv_fmn,
        -1.0,
        0.0,
        0.0,
        -2.0 * far * near * inv_fmn,
        0.0,
    ])
}

/// Projection for a `width` x `height` viewport.
pub fn projection_for(settings: &ProjectionSettings, width: u32, height: u32) -> Mat4 {
    let height_over_width = height.max(1) as f32 / width.max(1) as f32;
    perspective(
        settings.near,
        settings.far,
        settings.fov_degrees.to_radians(),
        height_over_width,
    )
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    /// Degrees, in [0, 360).
    pitch: f32,
    /// Degrees, in [0, 360).
    yaw: f32,
}

impl Camera {
    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn rotate(&mut self, pitch: f32, yaw: f32) {
        self.pitch = (self.pitch + pitch).rem_euclid(360.0);
        self.yaw = (self.yaw + yaw).rem_euclid(360.0);
    }

    pub fn orientation(&self) -> Quat {
        Quat::from_rotation_y(self.yaw.to_radians()) * Quat::from_rotation_x(self.pitch.to_radians())
    }

    pub fn forward(&self) -> Vec3 {
        self.orientation() * Vec3::NEG_Z
    }

    pub fn right(&self) -> Vec3 {
        self.orientation() * Vec3::X
    }

    /// World to camera transform.
    pub fn view(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.orientation(), self.position).inverse()
    }

    /// Integrate held keys over `dt` seconds.
    ///
    /// W/S move forward and back, A/D strafe, Q/E move down and up, arrow
    /// keys rotate. Shift multiplies the translation speed.
    pub fn integrate(&mut self, input: &InteractionState, dt: f32, settings: &CameraSettings) {
        let axis = |positive: Key, negative: Key| -> f32 {
            input.is_down(positive) as i32 as f32 - input.is_down(negative) as i32 as f32
        };

        let turn = dt * settings.rotation_speed;
        let pitch = axis(Key::Special(SpecialKey::Up), Key::Special(SpecialKey::Down));
        let yaw = axis(Key::Special(SpecialKey::Left), Key::Special(SpecialKey::Right));
        if pitch != 0.0 || yaw != 0.0 {
            self.rotate(pitch * turn, yaw * turn);
        }

        let mut speed = dt * settings.speed;
        if input.modifiers.contains(KeyMods::SHIFT) {
            speed *= settings.fast_multiplier;
        }
        let forward = axis(Key::Char(b'W'), Key::Char(b'S'));
        let strafe = axis(Key::Char(b'D'), Key::Char(b'A'));
        let lift = axis(Key::Char(b'E'), Key::Char(b'Q'));
        let motion = self.forward() * forward + self.right() * strafe + Vec3::Y * lift;
        if motion != Vec3::ZERO {
            self.position += motion * speed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn perspective_matches_column_layout() {
        let m = perspective(0.01, 1000.0, std::f32::consts::FRAC_PI_2, 0.5).to_cols_array();
        assert!(approx(m[0], 1.0));
        assert!(approx(m[5], 2.0));
        assert!(approx(m[11], -1.0));
        assert!(approx(m[10], -(1000.01) / (999.99)));
        assert!(approx(m[14], -2.0 * 1000.0 * 0.01 / 999.99));
        assert_eq!(m[15], 0.0);
    }

    #[test]
    fn rotation_wraps_into_range() {
        let mut camera = Camera::default();
        camera.rotate(-10.0, 370.0);
        assert!(approx(camera.pitch(), 350.0));
        assert!(approx(camera.yaw(), 10.0));
    }

    #[test]
    fn w_moves_along_negative_z() {
        let mut camera = Camera::default();
        let mut input = InteractionState::default();
        input.set_down(Key::Char(b'W'), true);
        camera.integrate(&input, 0.5, &CameraSettings::default());
        assert!(approx(camera.position.z, -0.5));
        assert!(approx(camera.position.x, 0.0));
    }

    #[test]
    fn shift_speeds_up_translation() {
        let mut camera = Camera::default();
        let mut input = InteractionState::default();
        input.set_down(Key::Char(b'E'), true);
        input.modifiers = KeyMods::SHIFT;
        camera.integrate(&input, 0.01, &CameraSettings::default());
        assert!(approx(camera.position.y, 1.0));
    }

    #[test]
    fn view_of_the_origin_camera_is_identity() {
        assert!(Camera::default().view().abs_diff_eq(Mat4::IDENTITY, 1e-6));
    }
}

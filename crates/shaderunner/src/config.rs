//! Sandbox configuration.

use std::path::PathBuf;

use shaderunner_gl::{ShaderStage, StageSet};

use crate::mediator::LayerFlags;

/// Free-fly camera tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraSettings {
    /// World units per second.
    pub speed: f32,
    /// Degrees per second for the arrow keys.
    pub rotation_speed: f32,
    /// Speed factor while Shift is held.
    pub fast_multiplier: f32,
    /// Degrees per pixel of mouse motion, 0 disables mouse-look.
    pub look_sensitivity: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            speed: 1.0,
            rotation_speed: 90.0,
            fast_multiplier: 100.0,
            look_sensitivity: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionSettings {
    pub near: f32,
    pub far: f32,
    /// Horizontal field of view in degrees.
    pub fov_degrees: f32,
}

impl Default for ProjectionSettings {
    fn default() -> Self {
        Self {
            near: 0.01,
            far: 1000.0,
            fov_degrees: 90.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SandboxConfig {
    pub width: u32,
    pub height: u32,
    /// Seconds of accumulated frame time between kernel file checks.
    pub reload_period: f32,
    pub drag_sensitivity: f32,
    pub camera: CameraSettings,
    pub projection: ProjectionSettings,
    pub layers: LayerFlags,
    /// Draw gizmos at startup. The ID buffer is maintained either way.
    pub show_gizmos: bool,
    pub fragment_kernel: Option<PathBuf>,
    pub vertex_kernel: Option<PathBuf>,
    pub geometry_kernel: Option<PathBuf>,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            reload_period: 1.0,
            drag_sensitivity: 0.01,
            camera: CameraSettings::default(),
            projection: ProjectionSettings::default(),
            layers: LayerFlags::all(),
            show_gizmos: true,
            fragment_kernel: None,
            vertex_kernel: None,
            geometry_kernel: None,
        }
    }
}

impl SandboxConfig {
    /// Active stages: vertex and fragment, plus geometry when a geometry
    /// kernel is configured.
    pub fn stages(&self) -> StageSet {
        let stages = StageSet::graphics();
        if self.geometry_kernel.is_some() {
            stages | StageSet::GEOMETRY
        } else {
            stages
        }
    }

    /// Configured kernel files, by stage.
    pub fn kernel_paths(&self) -> impl Iterator<Item = (ShaderStage, &PathBuf)> {
        [
            (ShaderStage::Vertex, self.vertex_kernel.as_ref()),
            (ShaderStage::Fragment, self.fragment_kernel.as_ref()),
            (ShaderStage::Geometry, self.geometry_kernel.as_ref()),
        ]
        .into_iter()
        .filter_map(|(stage, path)| path.map(|p| (stage, p)))
    }
}

use std::path::PathBuf;

use clap::Parser;
use shaderunner::{LayerFlags, SandboxConfig};

pub const DEFAULT_LOG_FILTER: &str = "shaderunner=info";

#[derive(Parser, Debug)]
#[command(
    name = "shaderunner",
    version,
    about = "Live-reloading GLSL shader sandbox with pickable gizmos"
)]
pub struct Cli {
    /// Fragment kernel to watch. Without one the built-in kernel is shown.
    #[arg(value_name = "KERNEL")]
    pub kernel: Option<PathBuf>,

    /// Vertex kernel to watch
    #[arg(long, value_name = "PATH")]
    pub vertex: Option<PathBuf>,

    /// Geometry kernel to watch; enables the geometry stage
    #[arg(long, value_name = "PATH")]
    pub geometry: Option<PathBuf>,

    #[arg(long, default_value_t = 1280)]
    pub width: u32,

    #[arg(long, default_value_t = 720)]
    pub height: u32,

    /// Seconds between kernel file checks
    #[arg(long, value_name = "SECS", default_value_t = 1.0)]
    pub reload_period: f32,

    /// Disable the gizmo layer and its ID buffer
    #[arg(long)]
    pub no_gizmos: bool,

    /// Disable the console overlay
    #[arg(long)]
    pub no_overlay: bool,

    /// Log filter directives
    #[arg(long, env = "RUST_LOG", default_value = DEFAULT_LOG_FILTER)]
    pub log: String,
}

impl Cli {
    pub fn into_config(self) -> SandboxConfig {
        let mut layers = LayerFlags::all();
        if self.no_gizmos {
            layers.remove(LayerFlags::GIZMO);
        }
        if self.no_overlay {
            layers.remove(LayerFlags::OVERLAY);
        }
        SandboxConfig {
            width: self.width.max(1),
            height: self.height.max(1),
            reload_period: self.reload_period.max(0.0),
            layers,
            fragment_kernel: self.kernel,
            vertex_kernel: self.vertex,
            geometry_kernel: self.geometry,
            ..SandboxConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shaderunner_gl::{ShaderStage, StageSet};

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("shaderunner").chain(args.iter().copied()))
            .expect("arguments should parse")
    }

    #[test]
    fn defaults_show_every_layer() {
        let config = parse(&[]).into_config();
        assert_eq!((config.width, config.height), (1280, 720));
        assert_eq!(config.layers, LayerFlags::all());
        assert!(config.fragment_kernel.is_none());
        assert_eq!(config.stages(), StageSet::graphics());
    }

    #[test]
    fn kernel_paths_map_to_stages() {
        let config = parse(&["plasma.glsl", "--geometry", "extrude.glsl"]).into_config();
        let paths: Vec<_> = config.kernel_paths().map(|(stage, _)| stage).collect();
        assert_eq!(paths, [ShaderStage::Fragment, ShaderStage::Geometry]);
        assert!(config.stages().has(ShaderStage::Geometry));
    }

    #[test]
    fn layer_switches_remove_layers() {
        let config = parse(&["--no-gizmos", "--no-overlay"]).into_config();
        assert!(config.layers.contains(LayerFlags::SHADER));
        assert!(!config.layers.contains(LayerFlags::GIZMO));
        assert!(!config.layers.contains(LayerFlags::OVERLAY));
    }

    #[test]
    fn zero_sizes_are_clamped() {
        let config = parse(&["--width", "0", "--reload-period", "-3"]).into_config();
        assert_eq!(config.width, 1);
        assert_eq!(config.reload_period, 0.0);
    }
}

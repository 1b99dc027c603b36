//! Pipeline stages and stage sets.

use std::fmt;

/// A programmable pipeline stage that needs its own compiled shader object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Geometry,
}

impl ShaderStage {
    /// Number of stages, usable as an array length.
    pub const COUNT: usize = 3;

    /// Every stage, in slot order.
    pub const ALL: [ShaderStage; Self::COUNT] =
        [ShaderStage::Vertex, ShaderStage::Fragment, ShaderStage::Geometry];

    /// Slot index of the stage in per-stage arrays.
    pub const fn index(self) -> usize {
        match self {
            ShaderStage::Vertex => 0,
            ShaderStage::Fragment => 1,
            ShaderStage::Geometry => 2,
        }
    }

    /// The GL shader type enum for this stage.
    pub const fn gl_enum(self) -> gl::types::GLenum {
        match self {
            ShaderStage::Vertex => gl::VERTEX_SHADER,
            ShaderStage::Fragment => gl::FRAGMENT_SHADER,
            ShaderStage::Geometry => gl::GEOMETRY_SHADER,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
            ShaderStage::Geometry => "geometry",
        }
    }

    /// The single-stage [`StageSet`] for this stage.
    pub const fn flag(self) -> StageSet {
        match self {
            ShaderStage::Vertex => StageSet::VERTEX,
            ShaderStage::Fragment => StageSet::FRAGMENT,
            ShaderStage::Geometry => StageSet::GEOMETRY,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

bitflags::bitflags! {
    /// A set of active stages.
    ///
    /// [`StageSet::stages`] always yields stages in slot order (vertex,
    /// fragment, geometry), which is also the attach order used when linking.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StageSet: u8 {
        const VERTEX = 1 << 0;
        const FRAGMENT = 1 << 1;
        const GEOMETRY = 1 << 2;
    }
}

impl StageSet {
    /// Vertex + fragment, the set every program needs.
    pub const fn graphics() -> Self {
        Self::VERTEX.union(Self::FRAGMENT)
    }

    pub const fn has(self, stage: ShaderStage) -> bool {
        self.contains(stage.flag())
    }

    pub fn len(self) -> usize {
        self.bits().count_ones() as usize
    }

    pub fn stages(self) -> impl Iterator<Item = ShaderStage> {
        ShaderStage::ALL
            .into_iter()
            .filter(move |stage| self.has(*stage))
    }
}

impl Default for StageSet {
    fn default() -> Self {
        Self::graphics()
    }
}

impl From<ShaderStage> for StageSet {
    fn from(stage: ShaderStage) -> Self {
        stage.flag()
    }
}

//! Gizmo layer: ID-buffer picking, hover/select and drag.
//!
//! Every gizmo is drawn as a single point that a geometry stage expands into
//! a box or a three-axis transform handle. Besides its color, the fragment
//! stage writes a [`PickPayload`] into the float ID attachment, so a single
//! pixel read-back tells which gizmo (and which axis) is under the mouse.

use anyhow::{anyhow, Result};
use glam::{Mat4, Vec2, Vec3};
use shaderunner_gl::{PickTarget, Primitive, ShaderBackend, ShaderStage, UniformValue};

use crate::kernel::{GLSL_VERSION, MAX_GIZMOS};

const GIZMO_INDEX_MASK: u32 = 0x00ff_ffff;
const SUB_INDEX_SHIFT: u32 = 24;

pub const COLOR_OFF: Vec3 = Vec3::new(0.0, 1.0, 0.0);
pub const COLOR_ON: Vec3 = Vec3::new(1.0, 0.0, 0.0);

/// Gizmo identifier as stored in the ID buffer.
///
/// Bits 0-23 hold the 1-based gizmo index, bits 24-31 the sub-gizmo index
/// (the axis of a transform handle). Zero means "nothing".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PickPayload(u32);

impl PickPayload {
    pub const NONE: Self = Self(0);

    pub const fn pack(gizmo_index: u32, sub_index: u8) -> Self {
        Self((gizmo_index & GIZMO_INDEX_MASK) | ((sub_index as u32) << SUB_INDEX_SHIFT))
    }

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Reinterpret a value read back from the ID attachment.
    pub fn from_f32(value: f32) -> Self {
        Self(value.to_bits())
    }

    pub fn to_f32(self) -> f32 {
        f32::from_bits(self.0)
    }

    pub const fn gizmo_index(self) -> u32 {
        unpack_gizmo_index(self.0)
    }

    pub const fn sub_index(self) -> u32 {
        unpack_sub_index(self.0)
    }

    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

pub const fn unpack_gizmo_index(bits: u32) -> u32 {
    bits & GIZMO_INDEX_MASK
}

pub const fn unpack_sub_index(bits: u32) -> u32 {
    bits >> SUB_INDEX_SHIFT
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GizmoType {
    Box,
    Transform,
}

impl GizmoType {
    const COUNT: usize = 2;

    const fn index(self) -> usize {
        match self {
            GizmoType::Box => 0,
            GizmoType::Transform => 1,
        }
    }

    fn geometry_source(self) -> &'static str {
        match self {
            GizmoType::Box => BOX_GEOM,
            GizmoType::Transform => TRANSFORM_GEOM,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GizmoDescriptor {
    pub kind: GizmoType,
    pub position: Vec3,
    pub color: Vec3,
}

impl GizmoDescriptor {
    pub fn new(kind: GizmoType, position: Vec3) -> Self {
        Self {
            kind,
            position,
            color: COLOR_OFF,
        }
    }
}

/// Result of a hover update that changed the hovered target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoverChange {
    pub left: PickPayload,
    pub entered: PickPayload,
}

// ---------------------------------------------------------------------------
// Programs
// ---------------------------------------------------------------------------

const GIZMO_VERT: &str = r#"
uniform vec3 uPosition;

void main()
{
    gl_Position = vec4(uPosition, 1.0);
}
"#;

const BOX_GEOM: &str = r#"
layout(points) in;
layout(triangle_strip, max_vertices = 14) out;

out vec3 gsVertColor;
flat out int gsSubIndex;

uniform mat4 uProjectionMat;
uniform vec3 uGizmoColor;

const vec4 kBaseExtent = 0.1 * vec4(1.0, 1.0, 1.0, 0.0);

void emit(vec4 in_position, vec4 corner)
{
    gl_Position = uProjectionMat * (in_position + corner * kBaseExtent);
    gsVertColor = uGizmoColor;
    gsSubIndex = 0;
    EmitVertex();
}

void main()
{
    vec4 p = gl_in[0].gl_Position;
    emit(p, vec4(-1, -1, -1, 0));
    emit(p, vec4( 1, -1, -1, 0));
    emit(p, vec4(-1, -1,  1, 0));
    emit(p, vec4( 1, -1,  1, 0));
    emit(p, vec4( 1,  1,  1, 0));
    emit(p, vec4( 1, -1, -1, 0));
    emit(p, vec4( 1,  1, -1, 0));
    emit(p, vec4(-1, -1, -1, 0));
    emit(p, vec4(-1,  1, -1, 0));
    emit(p, vec4(-1, -1,  1, 0));
    emit(p, vec4(-1,  1,  1, 0));
    emit(p, vec4( 1,  1,  1, 0));
    emit(p, vec4(-1,  1, -1, 0));
    emit(p, vec4( 1,  1, -1, 0));
    EndPrimitive();
}
"#;

const TRANSFORM_GEOM: &str = r#"
layout(points) in;
layout(triangle_strip, max_vertices = 42) out;

out vec3 gsVertColor;
flat out int gsSubIndex;

uniform mat4 uProjectionMat;

void emit(vec4 in_position, vec4 corner, vec4 extent, vec3 color, int axis)
{
    gl_Position = uProjectionMat * (in_position + corner * extent);
    gsVertColor = color;
    gsSubIndex = axis;
    EmitVertex();
}

void cube(vec4 p, vec4 center, vec4 extent, vec3 color, int axis)
{
    emit(p, center + vec4(-0.5, -0.5, -0.5, 0), extent, color, axis);
    emit(p, center + vec4( 0.5, -0.5, -0.5, 0), extent, color, axis);
    emit(p, center + vec4(-0.5, -0.5,  0.5, 0), extent, color, axis);
    emit(p, center + vec4( 0.5, -0.5,  0.5, 0), extent, color, axis);
    emit(p, center + vec4( 0.5,  0.5,  0.5, 0), extent, color, axis);
    emit(p, center + vec4( 0.5, -0.5, -0.5, 0), extent, color, axis);
    emit(p, center + vec4( 0.5,  0.5, -0.5, 0), extent, color, axis);
    emit(p, center + vec4(-0.5, -0.5, -0.5, 0), extent, color, axis);
    emit(p, center + vec4(-0.5,  0.5, -0.5, 0), extent, color, axis);
    emit(p, center + vec4(-0.5, -0.5,  0.5, 0), extent, color, axis);
    emit(p, center + vec4(-0.5,  0.5,  0.5, 0), extent, color, axis);
    emit(p, center + vec4( 0.5,  0.5,  0.5, 0), extent, color, axis);
    emit(p, center + vec4(-0.5,  0.5, -0.5, 0), extent, color, axis);
    emit(p, center + vec4( 0.5,  0.5, -0.5, 0), extent, color, axis);
    EndPrimitive();
}

void main()
{
    vec4 p = gl_in[0].gl_Position;
    cube(p, vec4(0.475, 0.0, 0.0, 0.0), vec4(1.0, 0.05, 0.05, 0.0), vec3(1.0, 0.0, 0.0), 0);
    cube(p, vec4(0.0, 0.475, 0.0, 0.0), vec4(0.05, 1.0, 0.05, 0.0), vec3(0.0, 1.0, 0.0), 1);
    cube(p, vec4(0.0, 0.0, 0.475, 0.0), vec4(0.05, 0.05, 1.0, 0.0), vec3(0.0, 0.0, 1.0), 2);
}
"#;

const GIZMO_FRAG: &str = r#"
in vec3 gsVertColor;
flat in int gsSubIndex;

layout(location = 0) out vec4 frag_color;
layout(location = 1) out float id_map;

uniform uint uGizmoID;

void main()
{
    frag_color = vec4(gsVertColor, 1.0);
    id_map = uintBitsToFloat(uGizmoID | (uint(gsSubIndex) << 24));
}
"#;

fn build_program<B: ShaderBackend>(backend: &mut B, kind: GizmoType) -> Result<B::Program> {
    let stages = [
        (ShaderStage::Vertex, GIZMO_VERT),
        (ShaderStage::Geometry, kind.geometry_source()),
        (ShaderStage::Fragment, GIZMO_FRAG),
    ];
    let mut shaders = Vec::with_capacity(stages.len());
    for (stage, source) in stages {
        let shader = backend
            .compile_stage(stage, &[GLSL_VERSION, source])
            .map_err(|log| anyhow!("{kind:?} gizmo {stage} shader failed to compile:\n{log}"))?;
        shaders.push(shader);
    }
    let shaders: Vec<&B::Shader> = shaders.iter().collect();
    backend
        .link_program(&shaders)
        .map_err(|log| anyhow!("{kind:?} gizmo program failed to link:\n{log}"))
}

// ---------------------------------------------------------------------------
// Layer
// ---------------------------------------------------------------------------

pub struct GizmoLayer<B: ShaderBackend> {
    gizmos: Vec<GizmoDescriptor>,
    programs: [B::Program; GizmoType::COUNT],
    hover: PickPayload,
    selected: PickPayload,
    drag_sensitivity: f32,
}

impl<B: ShaderBackend> GizmoLayer<B> {
    /// Build the box and transform programs. Failure is fatal: the sources
    /// are fixed.
    pub fn new(backend: &mut B, drag_sensitivity: f32) -> Result<Self> {
        let programs = [
            build_program(backend, GizmoType::Box)?,
            build_program(backend, GizmoType::Transform)?,
        ];
        tracing::debug!("gizmo programs linked");
        Ok(Self {
            gizmos: Vec::new(),
            programs,
            hover: PickPayload::NONE,
            selected: PickPayload::NONE,
            drag_sensitivity,
        })
    }

    pub fn gizmos(&self) -> &[GizmoDescriptor] {
        &self.gizmos
    }

    /// Append a gizmo and return its payload.
    pub fn push(&mut self, gizmo: GizmoDescriptor) -> PickPayload {
        self.gizmos.push(gizmo);
        PickPayload::pack(self.gizmos.len() as u32, 0)
    }

    pub fn hover(&self) -> PickPayload {
        self.hover
    }

    pub fn selected(&self) -> PickPayload {
        self.selected
    }

    /// Positions for the kernel uniform array, at most [`MAX_GIZMOS`].
    pub fn positions(&self) -> Vec<[f32; 3]> {
        self.gizmos
            .iter()
            .take(MAX_GIZMOS)
            .map(|g| g.position.to_array())
            .collect()
    }

    /// The gizmo a payload refers to. `None` for the empty payload and for
    /// indices past the end of the list.
    pub fn get_gizmo(&self, payload: PickPayload) -> Option<&GizmoDescriptor> {
        let index = payload.gizmo_index() as usize;
        index.checked_sub(1).and_then(|i| self.gizmos.get(i))
    }

    fn get_gizmo_mut(&mut self, payload: PickPayload) -> Option<&mut GizmoDescriptor> {
        let index = payload.gizmo_index() as usize;
        index.checked_sub(1).and_then(|i| self.gizmos.get_mut(i))
    }

    /// Clear the ID attachment and, when `visible`, draw every gizmo into
    /// the bound pick target.
    pub fn render<P: PickTarget>(
        &self,
        backend: &mut B,
        target: &mut P,
        view_projection: &Mat4,
        visible: bool,
    ) {
        target.clear_ids();
        if !visible || self.gizmos.is_empty() {
            return;
        }

        backend.set_depth_test(true);
        backend.clear_depth();
        let matrix = view_projection.to_cols_array();
        for (i, gizmo) in self.gizmos.iter().enumerate() {
            let program = &self.programs[gizmo.kind.index()];
            backend.use_program(Some(program));
            let id = PickPayload::pack(i as u32 + 1, 0);
            let uniforms = [
                ("uProjectionMat", UniformValue::Mat4(&matrix)),
                ("uPosition", UniformValue::Vec3(gizmo.position.to_array())),
                ("uGizmoColor", UniformValue::Vec3(gizmo.color.to_array())),
                ("uGizmoID", UniformValue::UInt(id.bits())),
            ];
            for (name, value) in uniforms {
                if let Some(location) = backend.uniform_location(program, name) {
                    backend.set_uniform(location, value);
                }
            }
            backend.draw(Primitive::Points, 1);
        }
        backend.use_program(None);
        backend.set_depth_test(false);
    }

    /// Read the payload under pixel `(x, y)` of the pick target.
    pub fn pick<P: PickTarget>(&self, target: &mut P, x: i32, y: i32) -> PickPayload {
        PickPayload::from_f32(target.read_id(x, y))
    }

    /// Move the hover to `payload`. Returns the transition when the hovered
    /// target changed, `None` when it is the same as before.
    ///
    /// Payloads that name no live gizmo are treated as "nothing".
    pub fn update_hover(&mut self, payload: PickPayload) -> Option<HoverChange> {
        let payload = if self.get_gizmo(payload).is_some() {
            payload
        } else {
            PickPayload::NONE
        };
        if payload == self.hover {
            return None;
        }

        let left = self.hover;
        self.hover_out(left);
        self.hover = payload;
        self.hover_in(payload);
        Some(HoverChange {
            left,
            entered: payload,
        })
    }

    fn hover_out(&mut self, payload: PickPayload) {
        let Some(gizmo) = self.get_gizmo_mut(payload) else {
            return;
        };
        match gizmo.kind {
            GizmoType::Box => gizmo.color = COLOR_OFF,
            GizmoType::Transform => {
                tracing::debug!(gizmo = payload.gizmo_index(), axis = payload.sub_index(), "hover out")
            }
        }
    }

    fn hover_in(&mut self, payload: PickPayload) {
        let Some(gizmo) = self.get_gizmo_mut(payload) else {
            return;
        };
        match gizmo.kind {
            GizmoType::Box => gizmo.color = COLOR_ON,
            GizmoType::Transform => {
                tracing::debug!(gizmo = payload.gizmo_index(), axis = payload.sub_index(), "hover in")
            }
        }
    }

    /// Mouse pressed: select the hovered transform handle, if any.
    pub fn press(&mut self) -> bool {
        match self.get_gizmo(self.hover) {
            Some(gizmo) if gizmo.kind == GizmoType::Transform => {
                self.selected = self.hover;
                tracing::debug!(
                    gizmo = self.selected.gizmo_index(),
                    axis = self.selected.sub_index(),
                    "gizmo selected"
                );
                true
            }
            _ => false,
        }
    }

    /// Mouse released: drop hover and selection.
    pub fn release(&mut self) {
        let hover = self.hover;
        self.hover_out(hover);
        self.hover = PickPayload::NONE;
        self.selected = PickPayload::NONE;
    }

    /// Move the selected transform handle along its axis for a screen-space
    /// mouse motion of `delta` pixels.
    ///
    /// The gizmo position and a point one unit along the axis are projected
    /// to normalised device coordinates; the screen delta is dotted with
    /// that direction (Y scaled by `height_over_width`) and scaled by the
    /// drag sensitivity. Returns the new position.
    pub fn drag(
        &mut self,
        delta: Vec2,
        view_projection: &Mat4,
        height_over_width: f32,
    ) -> Option<Vec3> {
        let selected = self.selected;
        let axis = selected.sub_index() as usize;
        let sensitivity = self.drag_sensitivity;
        let gizmo = self.get_gizmo_mut(selected)?;
        if gizmo.kind != GizmoType::Transform || axis > 2 {
            return None;
        }

        let origin = gizmo.position;
        let tip = origin + Vec3::AXES[axis];
        let c0 = *view_projection * origin.extend(1.0);
        let c1 = *view_projection * tip.extend(1.0);
        if c0.w.abs() <= f32::EPSILON || c1.w.abs() <= f32::EPSILON {
            return None;
        }
        let n0 = c0.truncate().truncate() / c0.w;
        let n1 = c1.truncate().truncate() / c1.w;

        let mut direction = n1 - n0;
        direction.y *= height_over_width;
        let amount = (delta.x * direction.x + delta.y * direction.y) * sensitivity;

        gizmo.position[axis] += amount;
        Some(gizmo.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::perspective;
    use crate::test_support::{Call, FakeBackend, FakeTarget, Recorded};

    fn layer_with(kinds: &[GizmoType]) -> (FakeBackend, GizmoLayer<FakeBackend>) {
        let mut backend = FakeBackend::default();
        let mut layer = GizmoLayer::new(&mut backend, 0.01).unwrap();
        for (i, kind) in kinds.iter().enumerate() {
            layer.push(GizmoDescriptor::new(*kind, Vec3::new(i as f32, 0.0, -5.0)));
        }
        (backend, layer)
    }

    #[test]
    fn payload_round_trips() {
        for (gizmo, sub) in [(1, 0), (2, 1), (3, 2), (0x00ff_ffff, 0), (12345, 200)] {
            let payload = PickPayload::pack(gizmo, sub);
            assert_eq!(payload.gizmo_index(), gizmo);
            assert_eq!(payload.sub_index(), sub as u32);
            assert_eq!(unpack_gizmo_index(payload.bits()), gizmo);
            assert_eq!(unpack_sub_index(payload.bits()), sub as u32);
        }
    }

    #[test]
    fn payload_survives_the_float_channel() {
        for payload in [PickPayload::pack(1, 0), PickPayload::pack(2, 1), PickPayload::pack(16, 2)] {
            assert_eq!(PickPayload::from_f32(payload.to_f32()), payload);
        }
        assert!(PickPayload::from_f32(0.0).is_none());
    }

    #[test]
    fn get_gizmo_range_checks() {
        let (_, layer) = layer_with(&[GizmoType::Box, GizmoType::Box, GizmoType::Box]);
        assert!(layer.get_gizmo(PickPayload::NONE).is_none());
        assert!(layer.get_gizmo(PickPayload::pack(4, 0)).is_none());
        assert_eq!(layer.get_gizmo(PickPayload::pack(3, 0)), Some(&layer.gizmos()[2]));
    }

    #[test]
    fn picked_payload_resolves_to_the_second_gizmo() {
        let (_, mut layer) =
            layer_with(&[GizmoType::Transform, GizmoType::Transform, GizmoType::Box]);
        let mut target = FakeTarget::default();
        let payload = PickPayload::pack(2, 1);
        target.ids.insert((10, 20), payload.to_f32());

        let picked = layer.pick(&mut target, 10, 20);
        assert_eq!(picked, payload);
        assert_eq!(layer.get_gizmo(picked), Some(&layer.gizmos()[1]));

        let change = layer.update_hover(picked).unwrap();
        assert_eq!(change.entered, payload);
        assert_eq!(change.left, PickPayload::NONE);
        assert_eq!(layer.update_hover(picked), None);
        assert_eq!(layer.update_hover(picked), None);
    }

    #[test]
    fn box_hover_toggles_color() {
        let (_, mut layer) = layer_with(&[GizmoType::Box, GizmoType::Box]);
        let first = PickPayload::pack(1, 0);
        layer.update_hover(first);
        assert_eq!(layer.gizmos()[0].color, COLOR_ON);

        let change = layer.update_hover(PickPayload::pack(2, 0)).unwrap();
        assert_eq!(change.left, first);
        assert_eq!(layer.gizmos()[0].color, COLOR_OFF);
        assert_eq!(layer.gizmos()[1].color, COLOR_ON);
    }

    #[test]
    fn transform_hover_keeps_color() {
        let (_, mut layer) = layer_with(&[GizmoType::Transform]);
        layer.update_hover(PickPayload::pack(1, 0));
        assert_eq!(layer.gizmos()[0].color, COLOR_OFF);
    }

    #[test]
    fn stale_payload_counts_as_nothing() {
        let (_, mut layer) = layer_with(&[GizmoType::Box]);
        assert_eq!(layer.update_hover(PickPayload::pack(7, 0)), None);
        assert!(layer.hover().is_none());
    }

    #[test]
    fn only_transform_handles_can_be_selected() {
        let (_, mut layer) = layer_with(&[GizmoType::Box, GizmoType::Transform]);
        layer.update_hover(PickPayload::pack(1, 0));
        assert!(!layer.press());
        layer.update_hover(PickPayload::pack(2, 2));
        assert!(layer.press());
        assert_eq!(layer.selected(), PickPayload::pack(2, 2));

        layer.release();
        assert!(layer.selected().is_none());
        assert!(layer.hover().is_none());
    }

    #[test]
    fn release_resets_box_highlight() {
        let (_, mut layer) = layer_with(&[GizmoType::Box]);
        layer.update_hover(PickPayload::pack(1, 0));
        layer.release();
        assert_eq!(layer.gizmos()[0].color, COLOR_OFF);
    }

    #[test]
    fn drag_moves_along_the_selected_axis_only() {
        let mut backend = FakeBackend::default();
        let mut layer = GizmoLayer::new(&mut backend, 0.01).unwrap();
        layer.push(GizmoDescriptor::new(GizmoType::Transform, Vec3::new(0.0, 0.0, -5.0)));
        layer.update_hover(PickPayload::pack(1, 1));
        assert!(layer.press());

        // 800x600 viewport, camera at the origin looking down -Z.
        let height_over_width = 600.0 / 800.0;
        let projection = perspective(0.01, 1000.0, std::f32::consts::FRAC_PI_2, height_over_width);
        let moved = layer
            .drag(Vec2::new(0.0, 10.0), &projection, height_over_width)
            .unwrap();

        // NDC y of the unit tip is (4/3) / 5, scaled back by 3/4: 0.2.
        assert!((moved.y - 10.0 * 0.2 * 0.01).abs() < 1e-5);
        assert_eq!(moved.x, 0.0);
        assert_eq!(moved.z, -5.0);
    }

    #[test]
    fn drag_without_selection_is_ignored() {
        let (_, mut layer) = layer_with(&[GizmoType::Transform]);
        assert_eq!(layer.drag(Vec2::new(5.0, 5.0), &Mat4::IDENTITY, 1.0), None);
        assert_eq!(layer.gizmos()[0].position, Vec3::new(0.0, 0.0, -5.0));
    }

    #[test]
    fn render_writes_one_based_ids() {
        let (mut backend, layer) = layer_with(&[GizmoType::Box, GizmoType::Transform]);
        let mut target = FakeTarget::default();
        backend.calls.clear();
        layer.render(&mut backend, &mut target, &Mat4::IDENTITY, true);

        assert_eq!(target.clears, 1);
        assert_eq!(backend.draws(), 2);
        let ids: Vec<_> = backend
            .uniforms()
            .into_iter()
            .filter(|(name, _)| *name == "uGizmoID")
            .map(|(_, value)| value.clone())
            .collect();
        assert_eq!(ids, vec![Recorded::UInt(1), Recorded::UInt(2)]);
        assert_eq!(backend.calls.last(), Some(&Call::DepthTest(false)));
    }

    #[test]
    fn hidden_gizmos_still_clear_the_id_buffer() {
        let (mut backend, layer) = layer_with(&[GizmoType::Box]);
        let mut target = FakeTarget::default();
        backend.calls.clear();
        layer.render(&mut backend, &mut target, &Mat4::IDENTITY, false);
        assert_eq!(target.clears, 1);
        assert_eq!(backend.draws(), 0);
    }
}

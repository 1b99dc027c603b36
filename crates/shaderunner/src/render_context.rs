//! Render context: hot-reloaded kernel program and the full-screen pass.
//!
//! The context always owns a linked program. Kernel files are checked once
//! per reload period of accumulated frame time; a changed file is
//! recompiled and the program relinked from fresh and cached stages. The
//! installed program and the cache are only replaced after a successful
//! link, so a broken kernel never disturbs the last good frame.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Result};
use shaderunner_gl::{Primitive, ShaderBackend, ShaderStage, StageSet, UniformValue};

use crate::cache::ShaderCache;
use crate::compiler::{self, ErrorLogEntry};
use crate::kernel::{self, GIZMO_COUNT_UNIFORM, GIZMO_POSITIONS_UNIFORM, PROJECTION_UNIFORM};
use crate::kernel::{RESOLUTION_UNIFORM, TIME_UNIFORM};
use crate::overlay::KernelControls;
use crate::watcher::SourceWatcher;

const CLEAR_COLOR: [f32; 4] = [0.5, 0.5, 0.5, 1.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    Idle,
    /// A changed kernel is being compiled.
    Building,
    /// The last build produced the installed program.
    Linked,
    /// The last build failed; the previous program is still installed.
    LinkFailed,
}

/// Receives the outcome of every kernel build.
pub trait CompileListener {
    /// A kernel for `stage` was compiled. `log` is empty on success.
    fn on_compile_finished(
        &mut self,
        stage: ShaderStage,
        path: Option<&Path>,
        kernel: &str,
        log: &[ErrorLogEntry],
    );

    /// All stages compiled but the program did not link.
    fn on_link_failed(&mut self, log: &[ErrorLogEntry]);
}

/// Reports builds through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogListener;

impl CompileListener for LogListener {
    fn on_compile_finished(
        &mut self,
        stage: ShaderStage,
        path: Option<&Path>,
        _kernel: &str,
        log: &[ErrorLogEntry],
    ) {
        let path = path.map(Path::display);
        if log.is_empty() {
            tracing::debug!(%stage, path = ?path, "kernel compiled");
        }
        for entry in log {
            tracing::warn!(%stage, path = ?path, line = entry.line, "{}", entry.message);
        }
    }

    fn on_link_failed(&mut self, log: &[ErrorLogEntry]) {
        for entry in log {
            tracing::warn!("link: {}", entry.message);
        }
    }
}

/// A user-editable float uniform.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformBinding {
    pub name: String,
    pub value: f32,
}

impl UniformBinding {
    pub fn new(name: impl Into<String>, value: f32) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Per-frame scene data uploaded next to the standard uniforms.
#[derive(Debug, Default, Clone, Copy)]
pub struct SceneUniforms<'a> {
    pub projection: Option<&'a [f32; 16]>,
    pub gizmo_positions: &'a [[f32; 3]],
}

pub struct RenderContext<B: ShaderBackend> {
    stages: StageSet,
    cache: ShaderCache<B::Shader>,
    program: B::Program,
    state: RenderState,
    watchers: [Option<SourceWatcher>; ShaderStage::COUNT],
    /// Compiled stages not linked yet because another stage is broken.
    held: [Option<B::Shader>; ShaderStage::COUNT],
    broken: StageSet,
    listener: Box<dyn CompileListener>,
    uniforms: Vec<UniformBinding>,
    bindings_rejected: bool,
    resolution: [u32; 2],
    elapsed: f32,
    reload_timer: f32,
    reload_period: f32,
    update_pending: bool,
}

impl<B: ShaderBackend> RenderContext<B> {
    /// Compile the default kernel of every stage in `stages` and link them.
    ///
    /// `stages` must contain the vertex and fragment stages. The default
    /// kernels are fixed, so any failure here is returned as an error.
    pub fn new(
        backend: &mut B,
        stages: StageSet,
        listener: Box<dyn CompileListener>,
    ) -> Result<Self> {
        if !stages.contains(StageSet::graphics()) {
            bail!("active stages {stages:?} must include vertex and fragment");
        }

        let mut cache = ShaderCache::new();
        for stage in stages.stages() {
            let source = kernel::assemble(stage, kernel::default_kernel(stage));
            let result = compiler::compile(backend, &source);
            match result.shader {
                Some(shader) => {
                    cache.insert(stage, shader);
                }
                None => bail!(
                    "default {stage} kernel failed to compile:\n{}",
                    compiler::describe(&result.log)
                ),
            }
        }

        let program = compiler::link(backend, &cache.select(stages)?).map_err(|log| {
            anyhow!("default kernels failed to link:\n{}", compiler::describe(&log))
        })?;
        tracing::debug!(?stages, "default kernels linked");

        Ok(Self {
            stages,
            cache,
            program,
            state: RenderState::Linked,
            watchers: std::array::from_fn(|_| None),
            held: std::array::from_fn(|_| None),
            broken: StageSet::empty(),
            listener,
            uniforms: Vec::new(),
            bindings_rejected: false,
            resolution: [1, 1],
            elapsed: 0.0,
            reload_timer: 0.0,
            reload_period: 1.0,
            update_pending: false,
        })
    }

    pub fn state(&self) -> RenderState {
        self.state
    }

    /// The installed program.
    pub fn program(&self) -> &B::Program {
        &self.program
    }

    pub fn stages(&self) -> StageSet {
        self.stages
    }

    /// Seconds of frame time since creation.
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn resolution(&self) -> [u32; 2] {
        self.resolution
    }

    pub fn set_resolution(&mut self, width: u32, height: u32) {
        self.resolution = [width.max(1), height.max(1)];
    }

    pub fn set_reload_period(&mut self, seconds: f32) {
        self.reload_period = seconds.max(0.0);
    }

    pub fn uniforms(&self) -> &[UniformBinding] {
        &self.uniforms
    }

    pub fn set_uniforms(&mut self, uniforms: Vec<UniformBinding>) {
        self.uniforms = uniforms;
        self.bindings_rejected = false;
    }

    pub fn kernel_path(&self, stage: ShaderStage) -> Option<&Path> {
        self.watchers[stage.index()].as_ref().map(SourceWatcher::path)
    }

    /// Watch `path` as the kernel of `stage`. The file is checked on the
    /// next frame instead of waiting for the reload period.
    pub fn watch(&mut self, stage: ShaderStage, path: impl Into<PathBuf>) {
        let path = path.into();
        if !self.stages.has(stage) {
            tracing::warn!(%stage, path = %path.display(), "stage is not active, ignoring kernel");
            return;
        }
        tracing::info!(%stage, path = %path.display(), "watching kernel");
        self.watchers[stage.index()] = Some(SourceWatcher::new(path));
        self.held[stage.index()] = None;
        self.broken.remove(stage.flag());
        self.force_update();
    }

    /// Check kernel files on the next frame.
    pub fn force_update(&mut self) {
        self.update_pending = true;
    }

    /// Check every watched kernel and rebuild the program if any changed.
    ///
    /// Stages that compile while another stage is broken are held back and
    /// linked together with the fixed stage. Returns whether a new program
    /// was installed.
    pub fn update_kernels(&mut self, backend: &mut B) -> bool {
        self.update_pending = false;

        let mut changed = false;
        for stage in self.stages.stages() {
            let Some(watcher) = self.watchers[stage.index()].as_mut() else {
                continue;
            };
            if !watcher.exists() {
                tracing::warn!(%stage, path = %watcher.path().display(), "kernel file is missing or not a regular file");
                continue;
            }
            if !watcher.has_changed() {
                tracing::debug!(%stage, "kernel is up to date");
                continue;
            }
            let text = match watcher.read_all() {
                Ok(text) => text,
                Err(err) => {
                    tracing::warn!(%stage, "{err:#}");
                    continue;
                }
            };

            changed = true;
            self.state = RenderState::Building;
            let source = kernel::assemble(stage, &text);
            let result = compiler::compile(backend, &source);
            self.listener
                .on_compile_finished(stage, Some(watcher.path()), &text, &result.log);
            match result.shader {
                Some(shader) => {
                    self.held[stage.index()] = Some(shader);
                    self.broken.remove(stage.flag());
                }
                None => {
                    self.held[stage.index()] = None;
                    self.broken.insert(stage.flag());
                }
            }
        }

        if !changed {
            return false;
        }
        if !self.broken.is_empty() {
            tracing::warn!(broken = ?self.broken, "kernel failed to compile, keeping current program");
            self.state = RenderState::LinkFailed;
            return false;
        }

        let linked = match self.cache.select_with(self.stages, &self.held) {
            Ok(shaders) => compiler::link(backend, &shaders),
            Err(err) => {
                tracing::error!("{err:#}");
                self.state = RenderState::LinkFailed;
                return false;
            }
        };
        let held = std::mem::replace(&mut self.held, std::array::from_fn(|_| None));

        match linked {
            Ok(program) => {
                for (stage, shader) in ShaderStage::ALL.into_iter().zip(held) {
                    if let Some(shader) = shader {
                        self.cache.insert(stage, shader);
                    }
                }
                self.program = program;
                self.state = RenderState::Linked;
                tracing::info!("kernel program relinked");
                true
            }
            Err(log) => {
                self.listener.on_link_failed(&log);
                tracing::warn!(errors = log.len(), "kernel program failed to link, keeping current program");
                self.state = RenderState::LinkFailed;
                false
            }
        }
    }

    /// Advance time by `dt`, run the periodic kernel check, and draw the
    /// full-screen pass with the installed program.
    pub fn render_frame(
        &mut self,
        backend: &mut B,
        dt: f32,
        scene: &SceneUniforms<'_>,
    ) -> Result<()> {
        self.reload_timer += dt;
        if self.update_pending || self.reload_timer >= self.reload_period {
            self.reload_timer = 0.0;
            self.update_kernels(backend);
        }

        backend.set_viewport(self.resolution[0], self.resolution[1]);
        backend.clear_color(CLEAR_COLOR);
        backend.use_program(Some(&self.program));
        self.apply_uniforms(backend, scene);
        let scene_result = backend.check_error();
        self.apply_bindings(backend);
        backend.draw(Primitive::Triangles, 3);
        backend.use_program(None);

        self.elapsed += dt;
        scene_result.and_then(|()| backend.check_error())
    }

    fn apply_uniforms(&self, backend: &mut B, scene: &SceneUniforms<'_>) {
        let program = &self.program;
        upload(backend, program, TIME_UNIFORM, UniformValue::Float(self.elapsed));
        upload(
            backend,
            program,
            RESOLUTION_UNIFORM,
            UniformValue::Vec2([self.resolution[0] as f32, self.resolution[1] as f32]),
        );
        if let Some(projection) = scene.projection {
            upload(backend, program, PROJECTION_UNIFORM, UniformValue::Mat4(projection));
        }
        if !scene.gizmo_positions.is_empty() {
            let count = scene.gizmo_positions.len().min(kernel::MAX_GIZMOS);
            upload(
                backend,
                program,
                GIZMO_POSITIONS_UNIFORM,
                UniformValue::Vec3Array(&scene.gizmo_positions[..count]),
            );
            upload(backend, program, GIZMO_COUNT_UNIFORM, UniformValue::Int(count as i32));
        }
    }

    /// Upload the user bindings. A binding the kernel declares with another
    /// type is rejected by the backend; that error is reported once per
    /// binding set and does not fail the frame.
    fn apply_bindings(&mut self, backend: &mut B) {
        for binding in &self.uniforms {
            upload(backend, &self.program, &binding.name, UniformValue::Float(binding.value));
        }
        if let Err(err) = backend.check_error() {
            if !self.bindings_rejected {
                tracing::warn!("uniform bindings rejected by the kernel: {err:#}");
                self.bindings_rejected = true;
            }
        }
    }
}

/// Set `name` if the program has such a uniform. Unknown names are skipped.
fn upload<B: ShaderBackend>(
    backend: &mut B,
    program: &B::Program,
    name: &str,
    value: UniformValue<'_>,
) {
    if let Some(location) = backend.uniform_location(program, name) {
        backend.set_uniform(location, value);
    }
}

impl<B: ShaderBackend> KernelControls for RenderContext<B> {
    fn kernel_path(&self) -> Option<&Path> {
        RenderContext::kernel_path(self, ShaderStage::Fragment)
    }

    fn submit_kernel_path(&mut self, path: PathBuf) {
        self.watch(ShaderStage::Fragment, path);
    }

    fn uniform_bindings(&self) -> &[UniformBinding] {
        &self.uniforms
    }

    fn submit_uniform_bindings(&mut self, bindings: Vec<UniformBinding>) {
        self.set_uniforms(bindings);
    }
}

//! Recording backend and pick target for headless tests.
//!
//! The fake compiler rejects any line containing `= ;` with a Mesa-style
//! diagnostic, which is enough to drive every reload path without a GL
//! context. Uploading a value whose type differs from the uniform's
//! declaration raises an error for the next `check_error`, like
//! `GL_INVALID_OPERATION` does.

use std::collections::HashMap;

use anyhow::{bail, Result};
use shaderunner_gl::{PickTarget, Primitive, ShaderBackend, ShaderStage, UniformValue};

#[derive(Debug)]
pub struct FakeShader {
    pub id: u32,
    pub stage: ShaderStage,
    pub source: String,
}

#[derive(Debug)]
pub struct FakeProgram {
    pub id: u32,
    pub sources: Vec<(ShaderStage, String)>,
}

impl FakeProgram {
    pub fn source(&self, stage: ShaderStage) -> Option<&str> {
        self.sources
            .iter()
            .find(|(s, _)| *s == stage)
            .map(|(_, source)| source.as_str())
    }
}

/// An uploaded uniform value, owned.
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    Float(f32),
    Int(i32),
    UInt(u32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Mat4([f32; 16]),
    Vec3Array(Vec<[f32; 3]>),
}

impl From<UniformValue<'_>> for Recorded {
    fn from(value: UniformValue<'_>) -> Self {
        match value {
            UniformValue::Float(v) => Recorded::Float(v),
            UniformValue::Int(v) => Recorded::Int(v),
            UniformValue::UInt(v) => Recorded::UInt(v),
            UniformValue::Vec2(v) => Recorded::Vec2(v),
            UniformValue::Vec3(v) => Recorded::Vec3(v),
            UniformValue::Mat4(m) => Recorded::Mat4(*m),
            UniformValue::Vec3Array(v) => Recorded::Vec3Array(v.to_vec()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Use(Option<u32>),
    Uniform(String, Recorded),
    Draw(Primitive, i32),
    ClearColor,
    ClearDepth,
    DepthTest(bool),
    Viewport(u32, u32),
}

#[derive(Default)]
pub struct FakeBackend {
    next_id: u32,
    link_failure: Option<String>,
    bound: Option<u32>,
    programs: HashMap<u32, Vec<String>>,
    locations: Vec<String>,
    error: Option<String>,
    pub compiles: usize,
    pub calls: Vec<Call>,
}

impl FakeBackend {
    /// Make the next link fail with `log`.
    pub fn fail_next_link(&mut self, log: &str) {
        self.link_failure = Some(log.to_owned());
    }

    /// Uniform uploads in call order, by name.
    pub fn uniforms(&self) -> Vec<(&str, &Recorded)> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::Uniform(name, value) => Some((name.as_str(), value)),
                _ => None,
            })
            .collect()
    }

    pub fn draws(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, Call::Draw(..)))
            .count()
    }

    /// GLSL type the bound program declares for `name`.
    fn declared_type(&self, name: &str) -> Option<&str> {
        let sources = self.programs.get(&self.bound?)?;
        sources.iter().flat_map(|s| s.lines()).find_map(|line| {
            let mut words = line.trim_start().strip_prefix("uniform ")?.split_whitespace();
            let ty = words.next()?;
            let declared = words.next()?.trim_end_matches(';').split('[').next()?;
            (declared == name).then_some(ty)
        })
    }

    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

impl ShaderBackend for FakeBackend {
    type Shader = FakeShader;
    type Program = FakeProgram;

    fn compile_stage(
        &mut self,
        stage: ShaderStage,
        sources: &[&str],
    ) -> std::result::Result<FakeShader, String> {
        self.compiles += 1;
        let source = sources.concat();
        let errors: String = source
            .lines()
            .enumerate()
            .filter(|(_, line)| line.contains("= ;"))
            .map(|(i, _)| format!("0:{}(5): error: syntax error, unexpected ';'\n", i + 1))
            .collect();
        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(FakeShader {
            id: self.next_id(),
            stage,
            source,
        })
    }

    fn link_program(
        &mut self,
        shaders: &[&FakeShader],
    ) -> std::result::Result<FakeProgram, String> {
        if let Some(log) = self.link_failure.take() {
            return Err(log);
        }
        let id = self.next_id();
        self.programs
            .insert(id, shaders.iter().map(|s| s.source.clone()).collect());
        Ok(FakeProgram {
            id,
            sources: shaders.iter().map(|s| (s.stage, s.source.clone())).collect(),
        })
    }

    fn use_program(&mut self, program: Option<&FakeProgram>) {
        self.bound = program.map(|p| p.id);
        self.calls.push(Call::Use(self.bound));
    }

    fn uniform_location(&mut self, program: &FakeProgram, name: &str) -> Option<i32> {
        let declared = self.programs.get(&program.id)?.iter().any(|source| {
            source
                .lines()
                .any(|line| line.trim_start().starts_with("uniform") && line.contains(name))
        });
        if !declared {
            return None;
        }
        let index = match self.locations.iter().position(|n| n == name) {
            Some(index) => index,
            None => {
                self.locations.push(name.to_owned());
                self.locations.len() - 1
            }
        };
        Some(index as i32)
    }

    fn set_uniform(&mut self, location: i32, value: UniformValue<'_>) {
        let name = self.locations[location as usize].clone();
        let accepted = match self.declared_type(&name) {
            Some(ty) => matches!(
                (&value, ty),
                (UniformValue::Float(_), "float")
                    | (UniformValue::Int(_), "int")
                    | (UniformValue::UInt(_), "uint")
                    | (UniformValue::Vec2(_), "vec2")
                    | (UniformValue::Vec3(_), "vec3")
                    | (UniformValue::Vec3Array(_), "vec3")
                    | (UniformValue::Mat4(_), "mat4")
            ),
            None => true,
        };
        if !accepted {
            self.error = Some(format!("invalid operation: wrong type for {name}"));
        }
        self.calls.push(Call::Uniform(name, value.into()));
    }

    fn draw(&mut self, primitive: Primitive, count: i32) {
        self.calls.push(Call::Draw(primitive, count));
    }

    fn clear_color(&mut self, _rgba: [f32; 4]) {
        self.calls.push(Call::ClearColor);
    }

    fn clear_depth(&mut self) {
        self.calls.push(Call::ClearDepth);
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.calls.push(Call::DepthTest(enabled));
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.calls.push(Call::Viewport(width, height));
    }

    fn check_error(&mut self) -> Result<()> {
        match self.error.take() {
            Some(error) => bail!("OpenGL error: {error}"),
            None => Ok(()),
        }
    }
}

/// Pick target whose ID attachment is a sparse pixel map.
#[derive(Default)]
pub struct FakeTarget {
    pub ids: HashMap<(i32, i32), f32>,
    pub bound: bool,
    pub clears: usize,
    pub blits: usize,
    size: (u32, u32),
}

impl PickTarget for FakeTarget {
    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.size = (width, height);
        Ok(())
    }

    fn bind(&mut self) {
        self.bound = true;
    }

    fn unbind(&mut self) {
        self.bound = false;
    }

    fn clear_ids(&mut self) {
        self.clears += 1;
    }

    fn read_id(&mut self, x: i32, y: i32) -> f32 {
        self.ids.get(&(x, y)).copied().unwrap_or(0.0)
    }

    fn blit_to_screen(&mut self, _width: u32, _height: u32) {
        self.blits += 1;
    }

    fn dimensions(&self) -> (u32, u32) {
        self.size
    }
}

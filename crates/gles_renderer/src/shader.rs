//! Shader programs
//!
//! A [`ShaderProgram`] owns its source units, its declared uniforms and the
//! attribute locations it has resolved. Compilation and linking are lazy:
//! [`ensure_linked`] runs when the program is first bound or after any source
//! changed.
//!
//! Uniform and attribute locations are resolved the first time they are
//! needed and cached as a [`Location`]. A name the linked program does not
//! expose is cached as [`Location::Absent`] and never queried again. Every
//! relink throws all cached locations away, since the driver is free to
//! renumber them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::caps::CapabilitySet;
use crate::context::RenderContext;
use crate::driver::{gl, GlEnum, GraphicsDriver};
use crate::error::{RenderError, RenderResult};
use crate::format;
use crate::foundation::math::{ColorRgba, Mat3, Mat4, Quat, Vec2, Vec3, Vec4};
use crate::stats::Statistics;

/// Pipeline stage of a shader source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShaderStage {
    /// Vertex shader
    Vertex,
    /// Fragment shader
    Fragment,
}

impl ShaderStage {
    /// Every variant
    pub const ALL: [Self; 2] = [Self::Vertex, Self::Fragment];
}

const SHADER_STAGE_TABLE: &[(ShaderStage, GlEnum)] = &[
    (ShaderStage::Vertex, gl::VERTEX_SHADER),
    (ShaderStage::Fragment, gl::FRAGMENT_SHADER),
];

/// Driver shader type of a stage
pub fn stage_constant(stage: ShaderStage) -> RenderResult<GlEnum> {
    format::lookup(SHADER_STAGE_TABLE, stage, "shader stage")
}

/// Check that every stage has a driver shader type
pub fn validate_tables() -> RenderResult<()> {
    for stage in ShaderStage::ALL {
        stage_constant(stage)?;
    }
    Ok(())
}

/// Cached result of a location query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Location {
    /// Not queried since the last link
    #[default]
    Unresolved,
    /// The linked program has no such variable
    Absent,
    /// Driver location
    Resolved(i32),
}

/// Declared GLSL type of a uniform
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VarType {
    Float,
    Int,
    Boolean,
    Vector2,
    Vector3,
    Vector4,
    Matrix3,
    Matrix4,
    FloatArray,
    Vector2Array,
    Vector3Array,
    Vector4Array,
    Matrix4Array,
    Texture2D,
    TextureCubeMap,
}

/// Value of a uniform
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Boolean(bool),
    Vector2(Vec2),
    Vector3(Vec3),
    Vector4(Vec4),
    /// Uploaded as a `vec4`
    Color(ColorRgba),
    /// Uploaded as a `vec4` (x, y, z, w)
    Rotation(Quat),
    Matrix3(Mat3),
    Matrix4(Mat4),
    FloatArray(Vec<f32>),
    Vector2Array(Vec<Vec2>),
    Vector3Array(Vec<Vec3>),
    Vector4Array(Vec<Vec4>),
    Matrix4Array(Vec<Mat4>),
}

impl UniformValue {
    /// Type a uniform gets when declared implicitly by its first value
    pub fn natural_type(&self) -> VarType {
        match self {
            Self::Float(_) => VarType::Float,
            Self::Int(_) => VarType::Int,
            Self::Boolean(_) => VarType::Boolean,
            Self::Vector2(_) => VarType::Vector2,
            Self::Vector3(_) => VarType::Vector3,
            Self::Vector4(_) | Self::Color(_) | Self::Rotation(_) => VarType::Vector4,
            Self::Matrix3(_) => VarType::Matrix3,
            Self::Matrix4(_) => VarType::Matrix4,
            Self::FloatArray(_) => VarType::FloatArray,
            Self::Vector2Array(_) => VarType::Vector2Array,
            Self::Vector3Array(_) => VarType::Vector3Array,
            Self::Vector4Array(_) => VarType::Vector4Array,
            Self::Matrix4Array(_) => VarType::Matrix4Array,
        }
    }

    /// Whether this value can be uploaded to a uniform declared as `var_type`
    pub fn accepted_by(&self, var_type: VarType) -> bool {
        match (self, var_type) {
            (Self::Int(_), VarType::Texture2D | VarType::TextureCubeMap) => true,
            _ => self.natural_type() == var_type,
        }
    }
}

/// A uniform with its declared type, pending value and cached location
#[derive(Debug, Clone)]
pub struct Uniform {
    name: String,
    var_type: VarType,
    value: Option<UniformValue>,
    location: Location,
    update_needed: bool,
}

impl Uniform {
    /// Name in the shader source
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type
    pub fn var_type(&self) -> VarType {
        self.var_type
    }

    /// Current value
    pub fn value(&self) -> Option<&UniformValue> {
        self.value.as_ref()
    }

    /// Cached location
    pub fn location(&self) -> Location {
        self.location
    }

    /// Whether the value still has to reach the driver
    pub fn is_update_needed(&self) -> bool {
        self.update_needed
    }
}

/// One compilation unit of a program
#[derive(Debug, Clone)]
pub struct ShaderSource {
    stage: ShaderStage,
    name: String,
    language: String,
    source: String,
    defines: String,

    pub(crate) handle: Option<u32>,
    pub(crate) update_needed: bool,
}

impl ShaderSource {
    /// Stage
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    /// Name used in diagnostics
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Language tag, e.g. `GLSL100`
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Driver object, `None` until first compile
    pub fn handle(&self) -> Option<u32> {
        self.handle
    }

    /// Text sent to the compiler: defines followed by the source
    pub fn full_source(&self) -> String {
        if self.defines.is_empty() {
            self.source.clone()
        } else {
            format!("{}\n{}", self.defines.trim_end(), self.source)
        }
    }
}

/// Linked set of shader sources plus its uniform and attribute bindings
#[derive(Debug, Clone)]
pub struct ShaderProgram {
    name: String,
    sources: Vec<ShaderSource>,
    uniforms: Vec<Uniform>,
    attributes: HashMap<String, Location>,

    pub(crate) handle: Option<u32>,
    pub(crate) update_needed: bool,
    linked_once: bool,
}

impl ShaderProgram {
    /// Empty program
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sources: Vec::new(),
            uniforms: Vec::new(),
            attributes: HashMap::new(),
            handle: None,
            update_needed: true,
            linked_once: false,
        }
    }

    /// Add a source unit
    pub fn add_source(
        &mut self,
        stage: ShaderStage,
        name: impl Into<String>,
        language: impl Into<String>,
        source: impl Into<String>,
    ) {
        self.sources.push(ShaderSource {
            stage,
            name: name.into(),
            language: language.into(),
            source: source.into(),
            defines: String::new(),
            handle: None,
            update_needed: true,
        });
        self.update_needed = true;
    }

    fn source_mut(&mut self, stage: ShaderStage) -> RenderResult<&mut ShaderSource> {
        let name = &self.name;
        self.sources
            .iter_mut()
            .find(|s| s.stage == stage)
            .ok_or_else(|| RenderError::invalid_state(format!("program '{name}' has no {stage:?} source")))
    }

    /// Replace the text of the `stage` source; the program relinks on next use
    pub fn set_source(&mut self, stage: ShaderStage, source: impl Into<String>) -> RenderResult<()> {
        let unit = self.source_mut(stage)?;
        unit.source = source.into();
        unit.update_needed = true;
        self.update_needed = true;
        Ok(())
    }

    /// Replace the preprocessor defines of the `stage` source
    pub fn set_defines(&mut self, stage: ShaderStage, defines: impl Into<String>) -> RenderResult<()> {
        let unit = self.source_mut(stage)?;
        unit.defines = defines.into();
        unit.update_needed = true;
        self.update_needed = true;
        Ok(())
    }

    /// Declare a uniform with an explicit type
    pub fn declare_uniform(&mut self, name: impl Into<String>, var_type: VarType) {
        let name = name.into();
        match self.uniforms.iter_mut().find(|u| u.name == name) {
            Some(uniform) => uniform.var_type = var_type,
            None => self.uniforms.push(Uniform {
                name,
                var_type,
                value: None,
                location: Location::Unresolved,
                update_needed: true,
            }),
        }
    }

    /// Set a uniform value, declaring it with the value's type if needed
    pub fn set_uniform(&mut self, name: &str, value: UniformValue) {
        match self.uniforms.iter_mut().find(|u| u.name == name) {
            Some(uniform) => {
                if uniform.value.as_ref() != Some(&value) {
                    uniform.value = Some(value);
                    uniform.update_needed = true;
                }
            }
            None => self.uniforms.push(Uniform {
                name: name.to_string(),
                var_type: value.natural_type(),
                value: Some(value),
                location: Location::Unresolved,
                update_needed: true,
            }),
        }
    }

    /// Name used in diagnostics
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Source units
    pub fn sources(&self) -> &[ShaderSource] {
        &self.sources
    }

    /// Uniform by name
    pub fn uniform(&self, name: &str) -> Option<&Uniform> {
        self.uniforms.iter().find(|u| u.name == name)
    }

    /// Cached attribute location
    pub fn attribute_location(&self, name: &str) -> Location {
        self.attributes.get(name).copied().unwrap_or_default()
    }

    /// Driver object, `None` until first link
    pub fn handle(&self) -> Option<u32> {
        self.handle
    }

    /// Whether a source changed since the last successful link
    pub fn is_update_needed(&self) -> bool {
        self.update_needed
    }

    /// Forget every cached location and flag every uniform for upload
    fn reset_bindings(&mut self) {
        for uniform in &mut self.uniforms {
            uniform.location = Location::Unresolved;
            uniform.update_needed = true;
        }
        self.attributes.clear();
    }

    /// Return to unallocated without driver calls
    pub(crate) fn reset_object(&mut self) {
        self.handle = None;
        self.update_needed = true;
        self.linked_once = false;
        for source in &mut self.sources {
            source.handle = None;
            source.update_needed = true;
        }
        self.reset_bindings();
    }

    /// Detach and delete the sources, then the program
    pub(crate) fn delete<D: GraphicsDriver + ?Sized>(
        &mut self,
        driver: &mut D,
        ctx: &mut RenderContext,
        stats: &mut Statistics,
    ) {
        for source in &mut self.sources {
            if let Some(shader) = source.handle.take() {
                if let Some(program) = self.handle {
                    driver.detach_shader(program, shader);
                }
                driver.delete_shader(shader);
            }
        }
        if let Some(program) = self.handle {
            driver.delete_program(program);
            ctx.forget_program(program);
            stats.programs = stats.programs.saturating_sub(1);
            log::debug!("Deleted program '{}' ({})", self.name, program);
        }
        self.reset_object();
    }
}

/// Source text with line numbers, for compile diagnostics
pub fn format_source(source: &str) -> String {
    source
        .lines()
        .enumerate()
        .map(|(i, line)| format!("{:4}  {}\n", i + 1, line))
        .collect()
}

/// Compile stale sources and link `program` if anything changed
///
/// Returns the program object.
pub fn ensure_linked<D: GraphicsDriver + ?Sized>(
    driver: &mut D,
    caps: &CapabilitySet,
    validate: bool,
    stats: &mut Statistics,
    program: &mut ShaderProgram,
) -> RenderResult<u32> {
    let handle = match program.handle {
        Some(handle) => handle,
        None => {
            let handle = driver
                .create_program()
                .map_err(|e| RenderError::ResourceCreationFailed(format!("program '{}': {e}", program.name)))?;
            log::debug!("Created program '{}' ({})", program.name, handle);
            program.handle = Some(handle);
            stats.programs += 1;
            handle
        }
    };

    if !program.update_needed {
        return Ok(handle);
    }

    if program.sources.is_empty() {
        return Err(RenderError::invalid_state(format!("program '{}' has no sources", program.name)));
    }

    for source in program.sources.iter_mut().filter(|s| s.update_needed || s.handle.is_none()) {
        if !caps.supports_language(&source.language) {
            return Err(RenderError::CapabilityMissing(format!(
                "shader '{}' is written in {} which the driver does not support",
                source.name, source.language
            )));
        }

        let shader = match source.handle {
            Some(shader) => shader,
            None => {
                let shader = driver
                    .create_shader(stage_constant(source.stage)?)
                    .map_err(|e| RenderError::ResourceCreationFailed(format!("shader '{}': {e}", source.name)))?;
                driver.attach_shader(handle, shader);
                source.handle = Some(shader);
                shader
            }
        };

        let text = source.full_source();
        driver.shader_source(shader, &text);
        driver.compile_shader(shader);

        let compiled = driver.get_shader_compile_status(shader);
        if !compiled || validate {
            let info = driver.get_shader_info_log(shader);
            if !compiled {
                log::warn!("Bad compile of '{}':\n{}", source.name, format_source(&text));
                return Err(RenderError::CompileLinkFailure { name: source.name.clone(), log: info });
            }
            if !info.trim().is_empty() {
                log::info!("Compile log of '{}': {}", source.name, info);
            }
        }
        source.update_needed = false;
    }

    driver.link_program(handle);
    let linked = driver.get_program_link_status(handle);
    if !linked || validate {
        let info = driver.get_program_info_log(handle);
        if !linked {
            return Err(RenderError::CompileLinkFailure { name: program.name.clone(), log: info });
        }
        if !info.trim().is_empty() {
            log::info!("Link log of '{}': {}", program.name, info);
        }
    }

    if program.linked_once {
        log::debug!("Relinked program '{}', dropping cached locations", program.name);
        program.reset_bindings();
    }
    program.linked_once = true;
    program.update_needed = false;

    Ok(handle)
}

/// Make `program` current unless it already is
pub fn bind_program<D: GraphicsDriver + ?Sized>(
    driver: &mut D,
    ctx: &mut RenderContext,
    stats: &mut Statistics,
    program: u32,
) {
    if ctx.bound_program != Some(program) {
        driver.use_program(Some(program));
        ctx.bound_program = Some(program);
        stats.shader_switches += 1;
    }
}

fn flatten<const N: usize>(values: impl IntoIterator<Item = [f32; N]>) -> Vec<f32> {
    values.into_iter().flatten().collect()
}

fn upload_value<D: GraphicsDriver + ?Sized>(driver: &mut D, location: i32, value: &UniformValue) {
    match value {
        UniformValue::Float(x) => driver.uniform_1_f32(location, *x),
        UniformValue::Int(x) => driver.uniform_1_i32(location, *x),
        UniformValue::Boolean(x) => driver.uniform_1_i32(location, i32::from(*x)),
        UniformValue::Vector2(v) => driver.uniform_2_f32_slice(location, v.as_slice()),
        UniformValue::Vector3(v) => driver.uniform_3_f32_slice(location, v.as_slice()),
        UniformValue::Vector4(v) => driver.uniform_4_f32_slice(location, v.as_slice()),
        UniformValue::Color(c) => driver.uniform_4_f32_slice(location, &c.to_array()),
        UniformValue::Rotation(q) => driver.uniform_4_f32_slice(location, q.coords.as_slice()),
        UniformValue::Matrix3(m) => driver.uniform_matrix_3_f32_slice(location, m.as_slice()),
        UniformValue::Matrix4(m) => driver.uniform_matrix_4_f32_slice(location, m.as_slice()),
        UniformValue::FloatArray(values) => driver.uniform_1_f32_slice(location, values),
        UniformValue::Vector2Array(values) => {
            driver.uniform_2_f32_slice(location, &flatten(values.iter().map(|v| [v.x, v.y])));
        }
        UniformValue::Vector3Array(values) => {
            driver.uniform_3_f32_slice(location, &flatten(values.iter().map(|v| [v.x, v.y, v.z])));
        }
        UniformValue::Vector4Array(values) => {
            driver.uniform_4_f32_slice(location, &flatten(values.iter().map(|v| [v.x, v.y, v.z, v.w])));
        }
        UniformValue::Matrix4Array(values) => {
            let data: Vec<f32> = values.iter().flat_map(|m| m.as_slice().iter().copied()).collect();
            driver.uniform_matrix_4_f32_slice(location, &data);
        }
    }
}

/// Upload every uniform whose value changed since its last upload
///
/// `program` must be linked and current.
pub fn update_uniforms<D: GraphicsDriver + ?Sized>(
    driver: &mut D,
    stats: &mut Statistics,
    program: &mut ShaderProgram,
) -> RenderResult<()> {
    let handle = program
        .handle
        .ok_or_else(|| RenderError::invalid_state(format!("program '{}' is not linked", program.name)))?;

    for uniform in program.uniforms.iter_mut().filter(|u| u.update_needed) {
        if uniform.location == Location::Unresolved {
            uniform.location = match driver.get_uniform_location(handle, &uniform.name) {
                Some(location) => Location::Resolved(location),
                None => {
                    log::debug!("Uniform '{}' is not active in '{}'", uniform.name, program.name);
                    Location::Absent
                }
            };
        }

        let Location::Resolved(location) = uniform.location else {
            uniform.update_needed = false;
            continue;
        };

        let Some(value) = &uniform.value else {
            log::warn!("Uniform '{}' of '{}' has no value, skipping", uniform.name, program.name);
            uniform.update_needed = false;
            continue;
        };

        if !value.accepted_by(uniform.var_type) {
            return Err(RenderError::invalid_state(format!(
                "uniform '{}' is declared {:?} but holds a {:?}",
                uniform.name,
                uniform.var_type,
                value.natural_type()
            )));
        }

        upload_value(driver, location, value);
        uniform.update_needed = false;
        stats.uniforms_set += 1;
    }

    Ok(())
}

/// Location of attribute `name`, resolved lazily and cached
pub fn attribute_location<D: GraphicsDriver + ?Sized>(
    driver: &mut D,
    program: &mut ShaderProgram,
    name: &str,
) -> RenderResult<Option<u32>> {
    let handle = program
        .handle
        .ok_or_else(|| RenderError::invalid_state(format!("program '{}' is not linked", program.name)))?;

    let location = match program.attributes.get(name) {
        Some(location) => *location,
        None => {
            let location = match driver.get_attrib_location(handle, name) {
                Some(index) => Location::Resolved(index as i32),
                None => Location::Absent,
            };
            program.attributes.insert(name.to_string(), location);
            location
        }
    };

    Ok(match location {
        Location::Resolved(index) => Some(index as u32),
        Location::Absent | Location::Unresolved => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caps;
    use crate::config::RendererConfig;
    use crate::driver::{DriverCall, HeadlessDriver};
    use approx::assert_relative_eq;

    const VERTEX: &str = "attribute vec3 inPosition;\nuniform mat4 g_WorldViewProjectionMatrix;\nvoid main() {}";
    const FRAGMENT: &str = "uniform vec4 m_Color;\nvoid main() {}";

    fn setup() -> (HeadlessDriver, CapabilitySet, Statistics, ShaderProgram) {
        let mut driver = HeadlessDriver::new();
        let caps = caps::detect(&mut driver, &RendererConfig::default()).unwrap();
        let mut program = ShaderProgram::new("unshaded");
        program.add_source(ShaderStage::Vertex, "unshaded.vert", "GLSL100", VERTEX);
        program.add_source(ShaderStage::Fragment, "unshaded.frag", "GLSL100", FRAGMENT);
        (driver, caps, Statistics::default(), program)
    }

    #[test]
    fn test_link_compiles_and_attaches_once() {
        let (mut driver, caps, mut stats, mut program) = setup();
        let handle = ensure_linked(&mut driver, &caps, false, &mut stats, &mut program).unwrap();

        assert_eq!(driver.count_calls(|c| matches!(c, DriverCall::CompileShader(_))), 2);
        assert_eq!(driver.count_calls(|c| matches!(c, DriverCall::AttachShader(p, _) if *p == handle)), 2);
        assert!(!program.is_update_needed());

        // Hot reload recompiles only the changed unit and never re-attaches
        program.set_source(ShaderStage::Fragment, FRAGMENT).unwrap();
        driver.clear_calls();
        ensure_linked(&mut driver, &caps, false, &mut stats, &mut program).unwrap();
        assert_eq!(driver.count_calls(|c| matches!(c, DriverCall::CompileShader(_))), 1);
        assert_eq!(driver.count_calls(|c| matches!(c, DriverCall::AttachShader(..))), 0);
        assert_eq!(driver.count_calls(|c| matches!(c, DriverCall::LinkProgram(_))), 1);
    }

    #[test]
    fn test_compile_failure_reports_log() {
        let (mut driver, caps, mut stats, mut program) = setup();
        driver.fail_compile_on("m_Color");

        let result = ensure_linked(&mut driver, &caps, false, &mut stats, &mut program);
        match result {
            Err(RenderError::CompileLinkFailure { name, log }) => {
                assert_eq!(name, "unshaded.frag");
                assert!(log.contains("syntax error"));
            }
            other => panic!("expected compile failure, got {other:?}"),
        }
        assert!(program.is_update_needed());
    }

    #[test]
    fn test_link_failure() {
        let (mut driver, caps, mut stats, mut program) = setup();
        driver.fail_link(true);
        let result = ensure_linked(&mut driver, &caps, false, &mut stats, &mut program);
        assert!(matches!(result, Err(RenderError::CompileLinkFailure { name, .. }) if name == "unshaded"));
    }

    #[test]
    fn test_unsupported_language() {
        let (mut driver, caps, mut stats, _) = setup();
        let mut program = ShaderProgram::new("modern");
        program.add_source(ShaderStage::Vertex, "modern.vert", "GLSL330", VERTEX);
        let result = ensure_linked(&mut driver, &caps, false, &mut stats, &mut program);
        assert!(matches!(result, Err(RenderError::CapabilityMissing(_))));
    }

    #[test]
    fn test_defines_prepended() {
        let (_, _, _, mut program) = setup();
        program.set_defines(ShaderStage::Vertex, "#define HAS_COLOR 1\n").unwrap();
        let text = program.sources()[0].full_source();
        assert!(text.starts_with("#define HAS_COLOR 1\nattribute"));
    }

    #[test]
    fn test_absent_uniform_queried_once() {
        let (mut driver, caps, mut stats, mut program) = setup();
        ensure_linked(&mut driver, &caps, false, &mut stats, &mut program).unwrap();

        program.set_uniform("m_Unused", UniformValue::Float(1.0));
        update_uniforms(&mut driver, &mut stats, &mut program).unwrap();
        program.set_uniform("m_Unused", UniformValue::Float(2.0));
        update_uniforms(&mut driver, &mut stats, &mut program).unwrap();

        let queries = driver.count_calls(
            |c| matches!(c, DriverCall::GetUniformLocation(_, name) if name == "m_Unused"),
        );
        assert_eq!(queries, 1);
        assert_eq!(program.uniform("m_Unused").unwrap().location(), Location::Absent);
        assert_eq!(stats.uniforms_set, 0);
    }

    #[test]
    fn test_unchanged_uniform_not_reuploaded() {
        let (mut driver, caps, mut stats, mut program) = setup();
        ensure_linked(&mut driver, &caps, false, &mut stats, &mut program).unwrap();

        let color = UniformValue::Color(ColorRgba::new(1.0, 0.5, 0.25, 1.0));
        program.set_uniform("m_Color", color.clone());
        update_uniforms(&mut driver, &mut stats, &mut program).unwrap();
        program.set_uniform("m_Color", color);
        update_uniforms(&mut driver, &mut stats, &mut program).unwrap();

        let uploads: Vec<&DriverCall> = driver
            .calls()
            .iter()
            .filter(|c| matches!(c, DriverCall::UniformFloats { .. }))
            .collect();
        assert_eq!(uploads.len(), 1);
        if let DriverCall::UniformFloats { width, values, .. } = uploads[0] {
            assert_eq!(*width, 4);
            assert_relative_eq!(values[1], 0.5);
        }
    }

    #[test]
    fn test_relink_resets_locations() {
        let (mut driver, caps, mut stats, mut program) = setup();
        ensure_linked(&mut driver, &caps, false, &mut stats, &mut program).unwrap();
        program.set_uniform("m_Color", UniformValue::Vector4(Vec4::new(1.0, 1.0, 1.0, 1.0)));
        update_uniforms(&mut driver, &mut stats, &mut program).unwrap();
        assert!(matches!(program.uniform("m_Color").unwrap().location(), Location::Resolved(_)));

        program.set_source(ShaderStage::Fragment, FRAGMENT).unwrap();
        ensure_linked(&mut driver, &caps, false, &mut stats, &mut program).unwrap();
        let uniform = program.uniform("m_Color").unwrap();
        assert_eq!(uniform.location(), Location::Unresolved);
        assert!(uniform.is_update_needed());

        driver.clear_calls();
        update_uniforms(&mut driver, &mut stats, &mut program).unwrap();
        assert_eq!(driver.count_calls(|c| matches!(c, DriverCall::GetUniformLocation(..))), 1);
    }

    #[test]
    fn test_mismatched_value_rejected() {
        let (mut driver, caps, mut stats, mut program) = setup();
        ensure_linked(&mut driver, &caps, false, &mut stats, &mut program).unwrap();
        program.declare_uniform("m_Color", VarType::Vector4);
        program.set_uniform("m_Color", UniformValue::Float(1.0));

        let result = update_uniforms(&mut driver, &mut stats, &mut program);
        assert!(matches!(result, Err(RenderError::InvalidResourceState(_))));
    }

    #[test]
    fn test_rotation_accepted_as_vector4() {
        let rotation = UniformValue::Rotation(Quat::identity());
        assert!(rotation.accepted_by(VarType::Vector4));
        assert!(UniformValue::Int(2).accepted_by(VarType::Texture2D));
        assert!(!UniformValue::Float(2.0).accepted_by(VarType::Int));
    }

    #[test]
    fn test_matrix_array_flattened_column_major() {
        let mut driver = HeadlessDriver::new();
        let values = UniformValue::Matrix4Array(vec![Mat4::identity(), Mat4::new_scaling(2.0)]);
        upload_value(&mut driver, 3, &values);

        match &driver.calls()[0] {
            DriverCall::UniformFloats { location, width, values } => {
                assert_eq!((*location, *width, values.len()), (3, 16, 32));
                assert_relative_eq!(values[16], 2.0);
                assert_relative_eq!(values[31], 1.0);
            }
            other => panic!("unexpected call {other:?}"),
        }
    }

    #[test]
    fn test_attribute_location_cached() {
        let (mut driver, caps, mut stats, mut program) = setup();
        ensure_linked(&mut driver, &caps, false, &mut stats, &mut program).unwrap();

        assert_eq!(attribute_location(&mut driver, &mut program, "inPosition").unwrap(), Some(0));
        assert_eq!(attribute_location(&mut driver, &mut program, "inPosition").unwrap(), Some(0));
        assert_eq!(attribute_location(&mut driver, &mut program, "inNormal").unwrap(), None);
        assert_eq!(attribute_location(&mut driver, &mut program, "inNormal").unwrap(), None);
        assert_eq!(driver.count_calls(|c| matches!(c, DriverCall::GetAttribLocation(..))), 2);
    }

    #[test]
    fn test_format_source_numbers_lines() {
        assert_eq!(format_source("a\nb"), "   1  a\n   2  b\n");
    }
}

//! In-memory GLES 2.0 driver
//!
//! `HeadlessDriver` keeps just enough driver-side state to behave like a real
//! context towards the renderer: object names, compile and link results,
//! active uniform and attribute tables parsed from shader sources, buffer
//! sizes, queued error codes and a single-color framebuffer. Every command and
//! every location query is appended to a call log that tests inspect.

use std::collections::{HashMap, VecDeque};

use super::{gl, GlEnum, GraphicsDriver};

/// One recorded driver command or location query
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq)]
pub enum DriverCall {
    Enable(GlEnum),
    Disable(GlEnum),
    DepthFunc(GlEnum),
    DepthMask(bool),
    DepthRange(f32, f32),
    ColorMask(bool, bool, bool, bool),
    PolygonOffset(f32, f32),
    CullFace(GlEnum),
    BlendFunc(GlEnum, GlEnum),
    Viewport(i32, i32, i32, i32),
    Scissor(i32, i32, i32, i32),
    ClearColor(f32, f32, f32, f32),
    Clear(GlEnum),
    LineWidth(f32),
    PixelStore(GlEnum, i32),
    CreateTexture(u32),
    DeleteTexture(u32),
    ActiveTexture(GlEnum),
    BindTexture(GlEnum, Option<u32>),
    TexParameter(GlEnum, GlEnum, i32),
    TexImage2D {
        target: GlEnum,
        level: i32,
        internal_format: i32,
        width: i32,
        height: i32,
        format: GlEnum,
        ty: GlEnum,
        len: Option<usize>,
    },
    CompressedTexImage2D {
        target: GlEnum,
        level: i32,
        internal_format: GlEnum,
        width: i32,
        height: i32,
        len: usize,
    },
    GenerateMipmap(GlEnum),
    CreateBuffer(u32),
    DeleteBuffer(u32),
    BindBuffer(GlEnum, Option<u32>),
    BufferData { target: GlEnum, len: usize, usage: GlEnum },
    BufferSubData { target: GlEnum, offset: i32, len: usize },
    CreateShader(GlEnum, u32),
    ShaderSource(u32),
    CompileShader(u32),
    DeleteShader(u32),
    CreateProgram(u32),
    AttachShader(u32, u32),
    DetachShader(u32, u32),
    LinkProgram(u32),
    DeleteProgram(u32),
    UseProgram(Option<u32>),
    GetUniformLocation(u32, String),
    GetAttribLocation(u32, String),
    Uniform1f(i32, f32),
    Uniform1i(i32, i32),
    /// Float vector or matrix upload; `width` is 1..=4 for vectors, 9 or 16 for matrices
    UniformFloats { location: i32, width: u8, values: Vec<f32> },
    EnableVertexAttribArray(u32),
    DisableVertexAttribArray(u32),
    VertexAttribPointer {
        index: u32,
        size: i32,
        ty: GlEnum,
        normalized: bool,
        stride: i32,
        offset: i32,
    },
    DrawArrays { mode: GlEnum, first: i32, count: i32, instances: i32 },
    DrawElements { mode: GlEnum, count: i32, ty: GlEnum, offset: i32, instances: i32 },
    ReadPixels { x: i32, y: i32, width: i32, height: i32 },
}

#[derive(Debug)]
struct ShaderObject {
    stage: GlEnum,
    source: String,
    compiled: bool,
    log: String,
}

#[derive(Debug, Default)]
struct ProgramObject {
    attached: Vec<u32>,
    linked: bool,
    log: String,
    uniforms: HashMap<String, i32>,
    attribs: HashMap<String, u32>,
}

/// Simulated GLES 2.0 context recording every call
#[derive(Debug)]
pub struct HeadlessDriver {
    vendor: String,
    renderer: String,
    version: String,
    shading_language: Option<String>,
    extensions: Vec<String>,
    integers: HashMap<GlEnum, i32>,

    calls: Vec<DriverCall>,
    errors: VecDeque<GlEnum>,
    next_name: u32,

    textures: Vec<u32>,
    buffers: HashMap<u32, usize>,
    bound_buffers: HashMap<GlEnum, u32>,
    shaders: HashMap<u32, ShaderObject>,
    programs: HashMap<u32, ProgramObject>,

    compile_failure_marker: Option<String>,
    link_failure: bool,
    creation_failure: bool,

    clear_color: [f32; 4],
    framebuffer_color: [u8; 4],
}

impl Default for HeadlessDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessDriver {
    /// GLES 2.0 context with depth texture support and ES 2.0 minimum-ish limits
    pub fn new() -> Self {
        let integers = HashMap::from([
            (gl::SUBPIXEL_BITS, 4),
            (gl::MAX_TEXTURE_SIZE, 2048),
            (gl::MAX_CUBE_MAP_TEXTURE_SIZE, 1024),
            (gl::MAX_TEXTURE_IMAGE_UNITS, 8),
            (gl::MAX_VERTEX_TEXTURE_IMAGE_UNITS, 0),
            (gl::MAX_VERTEX_UNIFORM_VECTORS, 128),
            (gl::MAX_FRAGMENT_UNIFORM_VECTORS, 16),
            (gl::MAX_VARYING_VECTORS, 8),
            (gl::MAX_VERTEX_ATTRIBS, 8),
            (gl::NUM_COMPRESSED_TEXTURE_FORMATS, 0),
        ]);

        Self {
            vendor: "Headless".to_string(),
            renderer: "Headless GLES2".to_string(),
            version: "OpenGL ES 2.0 Headless".to_string(),
            shading_language: Some("OpenGL ES GLSL ES 1.00".to_string()),
            extensions: vec!["GL_OES_depth_texture".to_string(), "GL_OES_depth24".to_string()],
            integers,
            calls: Vec::new(),
            errors: VecDeque::new(),
            next_name: 1,
            textures: Vec::new(),
            buffers: HashMap::new(),
            bound_buffers: HashMap::new(),
            shaders: HashMap::new(),
            programs: HashMap::new(),
            compile_failure_marker: None,
            link_failure: false,
            creation_failure: false,
            clear_color: [0.0; 4],
            framebuffer_color: [0; 4],
        }
    }

    /// Advertise additional extensions
    pub fn with_extensions(mut self, extensions: &[&str]) -> Self {
        self.extensions.extend(extensions.iter().map(ToString::to_string));
        self
    }

    /// Replace the version strings
    pub fn with_version(mut self, version: &str, shading_language: Option<&str>) -> Self {
        self.version = version.to_string();
        self.shading_language = shading_language.map(ToString::to_string);
        self
    }

    /// Override an integer limit
    pub fn with_integer(mut self, name: GlEnum, value: i32) -> Self {
        self.integers.insert(name, value);
        self
    }

    /// Make an integer query unsupported
    pub fn without_integer(mut self, name: GlEnum) -> Self {
        self.integers.remove(&name);
        self
    }

    /// Queue an error code for the next `get_error`
    pub fn push_error(&mut self, code: GlEnum) {
        self.errors.push_back(code);
    }

    /// Fail compiles of sources containing `marker`
    pub fn fail_compile_on(&mut self, marker: &str) {
        self.compile_failure_marker = Some(marker.to_string());
    }

    /// Fail every following link
    pub fn fail_link(&mut self, fail: bool) {
        self.link_failure = fail;
    }

    /// Make every following create call return no object
    pub fn fail_object_creation(&mut self, fail: bool) {
        self.creation_failure = fail;
    }

    /// Recorded calls since creation or the last clear
    pub fn calls(&self) -> &[DriverCall] {
        &self.calls
    }

    /// Forget recorded calls
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Number of recorded calls matching `predicate`
    pub fn count_calls(&self, predicate: impl Fn(&DriverCall) -> bool) -> usize {
        self.calls.iter().filter(|call| predicate(call)).count()
    }

    /// Texture objects currently alive
    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    /// Buffer objects currently alive
    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    /// Program objects currently alive
    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    /// Shader objects currently alive
    pub fn live_shaders(&self) -> usize {
        self.shaders.len()
    }

    /// Allocated size of a buffer object
    pub fn buffer_size(&self, buffer: u32) -> Option<usize> {
        self.buffers.get(&buffer).copied()
    }

    fn record(&mut self, call: DriverCall) {
        self.calls.push(call);
    }

    fn allocate_name(&mut self, kind: &str) -> Result<u32, String> {
        if self.creation_failure {
            return Err(format!("headless driver refused to create {kind}"));
        }
        let name = self.next_name;
        self.next_name += 1;
        Ok(name)
    }

    fn link(&mut self, program: u32) {
        let Some(object) = self.programs.get(&program) else {
            self.errors.push_back(gl::INVALID_VALUE);
            return;
        };

        let mut uniforms = HashMap::new();
        let mut attribs = HashMap::new();
        let mut log = String::new();
        let mut ok = !self.link_failure;

        for shader in &object.attached {
            let Some(source) = self.shaders.get(shader) else { continue };
            if !source.compiled {
                ok = false;
                log.push_str(&format!("shader {shader} is not compiled\n"));
            }
            for (qualifier, name) in declarations(&source.source) {
                match qualifier {
                    "uniform" => {
                        let next = uniforms.len() as i32;
                        uniforms.entry(name).or_insert(next);
                    }
                    "attribute" | "in" if source.stage == gl::VERTEX_SHADER => {
                        let next = attribs.len() as u32;
                        attribs.entry(name).or_insert(next);
                    }
                    _ => {}
                }
            }
        }
        if self.link_failure {
            log.push_str("link failure requested\n");
        }

        if let Some(object) = self.programs.get_mut(&program) {
            object.linked = ok;
            object.log = log;
            if ok {
                object.uniforms = uniforms;
                object.attribs = attribs;
            } else {
                object.uniforms.clear();
                object.attribs.clear();
            }
        }
    }
}

/// Top-level `uniform` / `attribute` / `in` declarations as (qualifier, name)
fn declarations(source: &str) -> Vec<(&str, String)> {
    source
        .split(|c| c == ';' || c == '\n')
        .filter_map(|statement| {
            let tokens: Vec<&str> = statement.split_whitespace().collect();
            let qualifier = *tokens.first()?;
            if !matches!(qualifier, "uniform" | "attribute" | "in") || tokens.len() < 3 {
                return None;
            }
            let last = tokens.last()?;
            let name = last.split('[').next().unwrap_or(last);
            Some((qualifier, name.to_string()))
        })
        .collect()
}

impl GraphicsDriver for HeadlessDriver {
    fn get_string(&mut self, name: GlEnum) -> Option<String> {
        match name {
            gl::VENDOR => Some(self.vendor.clone()),
            gl::RENDERER => Some(self.renderer.clone()),
            gl::VERSION => Some(self.version.clone()),
            gl::SHADING_LANGUAGE_VERSION => self.shading_language.clone(),
            gl::EXTENSIONS => Some(self.extensions.join(" ")),
            _ => None,
        }
    }

    fn get_integer(&mut self, name: GlEnum) -> Option<i32> {
        self.integers.get(&name).copied()
    }

    fn get_error(&mut self) -> GlEnum {
        self.errors.pop_front().unwrap_or(gl::NO_ERROR)
    }

    fn enable(&mut self, cap: GlEnum) {
        self.record(DriverCall::Enable(cap));
    }

    fn disable(&mut self, cap: GlEnum) {
        self.record(DriverCall::Disable(cap));
    }

    fn depth_func(&mut self, func: GlEnum) {
        self.record(DriverCall::DepthFunc(func));
    }

    fn depth_mask(&mut self, write: bool) {
        self.record(DriverCall::DepthMask(write));
    }

    fn depth_range(&mut self, near: f32, far: f32) {
        self.record(DriverCall::DepthRange(near, far));
    }

    fn color_mask(&mut self, red: bool, green: bool, blue: bool, alpha: bool) {
        self.record(DriverCall::ColorMask(red, green, blue, alpha));
    }

    fn polygon_offset(&mut self, factor: f32, units: f32) {
        self.record(DriverCall::PolygonOffset(factor, units));
    }

    fn cull_face(&mut self, mode: GlEnum) {
        self.record(DriverCall::CullFace(mode));
    }

    fn blend_func(&mut self, src: GlEnum, dst: GlEnum) {
        self.record(DriverCall::BlendFunc(src, dst));
    }

    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.record(DriverCall::Viewport(x, y, width, height));
    }

    fn scissor(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.record(DriverCall::Scissor(x, y, width, height));
    }

    fn clear_color(&mut self, red: f32, green: f32, blue: f32, alpha: f32) {
        self.clear_color = [red, green, blue, alpha];
        self.record(DriverCall::ClearColor(red, green, blue, alpha));
    }

    fn clear(&mut self, mask: GlEnum) {
        if mask & gl::COLOR_BUFFER_BIT != 0 {
            let [r, g, b, a] = self.clear_color;
            self.framebuffer_color = crate::foundation::math::ColorRgba::new(r, g, b, a).to_rgba8();
        }
        self.record(DriverCall::Clear(mask));
    }

    fn line_width(&mut self, width: f32) {
        self.record(DriverCall::LineWidth(width));
    }

    fn pixel_store_i32(&mut self, pname: GlEnum, value: i32) {
        self.record(DriverCall::PixelStore(pname, value));
    }

    fn create_texture(&mut self) -> Result<u32, String> {
        let name = self.allocate_name("texture")?;
        self.textures.push(name);
        self.record(DriverCall::CreateTexture(name));
        Ok(name)
    }

    fn delete_texture(&mut self, texture: u32) {
        self.textures.retain(|&t| t != texture);
        self.record(DriverCall::DeleteTexture(texture));
    }

    fn active_texture(&mut self, unit: GlEnum) {
        self.record(DriverCall::ActiveTexture(unit));
    }

    fn bind_texture(&mut self, target: GlEnum, texture: Option<u32>) {
        self.record(DriverCall::BindTexture(target, texture));
    }

    fn tex_parameter_i32(&mut self, target: GlEnum, pname: GlEnum, value: i32) {
        self.record(DriverCall::TexParameter(target, pname, value));
    }

    fn tex_image_2d(
        &mut self,
        target: GlEnum,
        level: i32,
        internal_format: i32,
        width: i32,
        height: i32,
        format: GlEnum,
        ty: GlEnum,
        pixels: Option<&[u8]>,
    ) {
        self.record(DriverCall::TexImage2D {
            target,
            level,
            internal_format,
            width,
            height,
            format,
            ty,
            len: pixels.map(<[u8]>::len),
        });
    }

    fn compressed_tex_image_2d(
        &mut self,
        target: GlEnum,
        level: i32,
        internal_format: GlEnum,
        width: i32,
        height: i32,
        data: &[u8],
    ) {
        self.record(DriverCall::CompressedTexImage2D {
            target,
            level,
            internal_format,
            width,
            height,
            len: data.len(),
        });
    }

    fn generate_mipmap(&mut self, target: GlEnum) {
        self.record(DriverCall::GenerateMipmap(target));
    }

    fn create_buffer(&mut self) -> Result<u32, String> {
        let name = self.allocate_name("buffer")?;
        self.buffers.insert(name, 0);
        self.record(DriverCall::CreateBuffer(name));
        Ok(name)
    }

    fn delete_buffer(&mut self, buffer: u32) {
        self.buffers.remove(&buffer);
        self.bound_buffers.retain(|_, bound| *bound != buffer);
        self.record(DriverCall::DeleteBuffer(buffer));
    }

    fn bind_buffer(&mut self, target: GlEnum, buffer: Option<u32>) {
        match buffer {
            Some(buffer) => {
                self.bound_buffers.insert(target, buffer);
            }
            None => {
                self.bound_buffers.remove(&target);
            }
        }
        self.record(DriverCall::BindBuffer(target, buffer));
    }

    fn buffer_data(&mut self, target: GlEnum, data: &[u8], usage: GlEnum) {
        match self.bound_buffers.get(&target) {
            Some(buffer) => {
                self.buffers.insert(*buffer, data.len());
            }
            None => self.errors.push_back(gl::INVALID_OPERATION),
        }
        self.record(DriverCall::BufferData { target, len: data.len(), usage });
    }

    fn buffer_sub_data(&mut self, target: GlEnum, offset: i32, data: &[u8]) {
        let size = self
            .bound_buffers
            .get(&target)
            .and_then(|buffer| self.buffers.get(buffer))
            .copied();
        match size {
            Some(size) if offset as usize + data.len() <= size => {}
            Some(_) => self.errors.push_back(gl::INVALID_VALUE),
            None => self.errors.push_back(gl::INVALID_OPERATION),
        }
        self.record(DriverCall::BufferSubData { target, offset, len: data.len() });
    }

    fn create_shader(&mut self, stage: GlEnum) -> Result<u32, String> {
        let name = self.allocate_name("shader")?;
        self.shaders.insert(
            name,
            ShaderObject { stage, source: String::new(), compiled: false, log: String::new() },
        );
        self.record(DriverCall::CreateShader(stage, name));
        Ok(name)
    }

    fn shader_source(&mut self, shader: u32, source: &str) {
        if let Some(object) = self.shaders.get_mut(&shader) {
            object.source = source.to_string();
        }
        self.record(DriverCall::ShaderSource(shader));
    }

    fn compile_shader(&mut self, shader: u32) {
        let marker = self.compile_failure_marker.clone();
        if let Some(object) = self.shaders.get_mut(&shader) {
            let failed = marker.as_deref().is_some_and(|m| object.source.contains(m));
            object.compiled = !failed;
            object.log = if failed {
                "0:1: error: syntax error".to_string()
            } else {
                String::new()
            };
        }
        self.record(DriverCall::CompileShader(shader));
    }

    fn get_shader_compile_status(&mut self, shader: u32) -> bool {
        self.shaders.get(&shader).is_some_and(|s| s.compiled)
    }

    fn get_shader_info_log(&mut self, shader: u32) -> String {
        self.shaders.get(&shader).map(|s| s.log.clone()).unwrap_or_default()
    }

    fn delete_shader(&mut self, shader: u32) {
        self.shaders.remove(&shader);
        self.record(DriverCall::DeleteShader(shader));
    }

    fn create_program(&mut self) -> Result<u32, String> {
        let name = self.allocate_name("program")?;
        self.programs.insert(name, ProgramObject::default());
        self.record(DriverCall::CreateProgram(name));
        Ok(name)
    }

    fn attach_shader(&mut self, program: u32, shader: u32) {
        if let Some(object) = self.programs.get_mut(&program) {
            object.attached.push(shader);
        }
        self.record(DriverCall::AttachShader(program, shader));
    }

    fn detach_shader(&mut self, program: u32, shader: u32) {
        if let Some(object) = self.programs.get_mut(&program) {
            object.attached.retain(|&s| s != shader);
        }
        self.record(DriverCall::DetachShader(program, shader));
    }

    fn link_program(&mut self, program: u32) {
        self.link(program);
        self.record(DriverCall::LinkProgram(program));
    }

    fn get_program_link_status(&mut self, program: u32) -> bool {
        self.programs.get(&program).is_some_and(|p| p.linked)
    }

    fn get_program_info_log(&mut self, program: u32) -> String {
        self.programs.get(&program).map(|p| p.log.clone()).unwrap_or_default()
    }

    fn delete_program(&mut self, program: u32) {
        self.programs.remove(&program);
        self.record(DriverCall::DeleteProgram(program));
    }

    fn use_program(&mut self, program: Option<u32>) {
        self.record(DriverCall::UseProgram(program));
    }

    fn get_uniform_location(&mut self, program: u32, name: &str) -> Option<i32> {
        self.record(DriverCall::GetUniformLocation(program, name.to_string()));
        self.programs.get(&program)?.uniforms.get(name).copied()
    }

    fn get_attrib_location(&mut self, program: u32, name: &str) -> Option<u32> {
        self.record(DriverCall::GetAttribLocation(program, name.to_string()));
        self.programs.get(&program)?.attribs.get(name).copied()
    }

    fn uniform_1_f32(&mut self, location: i32, x: f32) {
        self.record(DriverCall::Uniform1f(location, x));
    }

    fn uniform_1_i32(&mut self, location: i32, x: i32) {
        self.record(DriverCall::Uniform1i(location, x));
    }

    fn uniform_1_f32_slice(&mut self, location: i32, values: &[f32]) {
        self.record(DriverCall::UniformFloats { location, width: 1, values: values.to_vec() });
    }

    fn uniform_2_f32_slice(&mut self, location: i32, values: &[f32]) {
        self.record(DriverCall::UniformFloats { location, width: 2, values: values.to_vec() });
    }

    fn uniform_3_f32_slice(&mut self, location: i32, values: &[f32]) {
        self.record(DriverCall::UniformFloats { location, width: 3, values: values.to_vec() });
    }

    fn uniform_4_f32_slice(&mut self, location: i32, values: &[f32]) {
        self.record(DriverCall::UniformFloats { location, width: 4, values: values.to_vec() });
    }

    fn uniform_matrix_3_f32_slice(&mut self, location: i32, values: &[f32]) {
        self.record(DriverCall::UniformFloats { location, width: 9, values: values.to_vec() });
    }

    fn uniform_matrix_4_f32_slice(&mut self, location: i32, values: &[f32]) {
        self.record(DriverCall::UniformFloats { location, width: 16, values: values.to_vec() });
    }

    fn enable_vertex_attrib_array(&mut self, index: u32) {
        self.record(DriverCall::EnableVertexAttribArray(index));
    }

    fn disable_vertex_attrib_array(&mut self, index: u32) {
        self.record(DriverCall::DisableVertexAttribArray(index));
    }

    fn vertex_attrib_pointer(
        &mut self,
        index: u32,
        size: i32,
        ty: GlEnum,
        normalized: bool,
        stride: i32,
        offset: i32,
    ) {
        self.record(DriverCall::VertexAttribPointer { index, size, ty, normalized, stride, offset });
    }

    fn draw_arrays(&mut self, mode: GlEnum, first: i32, count: i32) {
        self.record(DriverCall::DrawArrays { mode, first, count, instances: 1 });
    }

    fn draw_elements(&mut self, mode: GlEnum, count: i32, ty: GlEnum, offset: i32) {
        self.record(DriverCall::DrawElements { mode, count, ty, offset, instances: 1 });
    }

    fn draw_arrays_instanced(&mut self, mode: GlEnum, first: i32, count: i32, instances: i32) {
        self.record(DriverCall::DrawArrays { mode, first, count, instances });
    }

    fn draw_elements_instanced(
        &mut self,
        mode: GlEnum,
        count: i32,
        ty: GlEnum,
        offset: i32,
        instances: i32,
    ) {
        self.record(DriverCall::DrawElements { mode, count, ty, offset, instances });
    }

    fn read_pixels(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        _format: GlEnum,
        _ty: GlEnum,
        pixels: &mut [u8],
    ) {
        for pixel in pixels.chunks_exact_mut(4) {
            pixel.copy_from_slice(&self.framebuffer_color);
        }
        self.record(DriverCall::ReadPixels { x, y, width, height });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declarations_parsed_from_source() {
        let source = "precision mediump float;\nuniform mat4 g_Matrix;\nuniform vec4 m_Colors[4];\nattribute vec3 inPosition;\nvoid main() {}";
        let found = declarations(source);
        assert_eq!(
            found,
            vec![
                ("uniform", "g_Matrix".to_string()),
                ("uniform", "m_Colors".to_string()),
                ("attribute", "inPosition".to_string()),
            ]
        );
    }

    #[test]
    fn test_link_exposes_declared_uniforms() {
        let mut driver = HeadlessDriver::new();
        let vs = driver.create_shader(gl::VERTEX_SHADER).unwrap();
        driver.shader_source(vs, "attribute vec3 inPosition;\nuniform mat4 g_Matrix;");
        driver.compile_shader(vs);
        let program = driver.create_program().unwrap();
        driver.attach_shader(program, vs);
        driver.link_program(program);

        assert!(driver.get_program_link_status(program));
        assert_eq!(driver.get_uniform_location(program, "g_Matrix"), Some(0));
        assert_eq!(driver.get_uniform_location(program, "m_Missing"), None);
        assert_eq!(driver.get_attrib_location(program, "inPosition"), Some(0));
    }

    #[test]
    fn test_sub_data_past_end_raises_error() {
        let mut driver = HeadlessDriver::new();
        let buffer = driver.create_buffer().unwrap();
        driver.bind_buffer(gl::ARRAY_BUFFER, Some(buffer));
        driver.buffer_data(gl::ARRAY_BUFFER, &[0; 8], gl::DYNAMIC_DRAW);
        driver.buffer_sub_data(gl::ARRAY_BUFFER, 4, &[0; 8]);
        assert_eq!(driver.get_error(), gl::INVALID_VALUE);
        assert_eq!(driver.get_error(), gl::NO_ERROR);
    }
}

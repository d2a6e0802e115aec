//! `glow` backend
//!
//! Forwards every [`GraphicsDriver`] call to a live `glow::Context`. Object
//! names cross the boundary as raw `u32` values, which only holds for native
//! (non-web) contexts.

use std::num::NonZeroU32;

use glow::HasContext;

use super::{gl, GlEnum, GraphicsDriver};

/// Driver backed by a `glow` OpenGL / OpenGL ES context
pub struct GlowDriver {
    gl: glow::Context,
    vertex_array: Option<glow::VertexArray>,
}

impl GlowDriver {
    /// Wrap a context that is current on the calling thread
    ///
    /// Desktop core profiles cannot draw without a vertex array object, so one
    /// is created and left bound for the lifetime of the driver.
    pub fn new(gl: glow::Context) -> Self {
        let version = gl.version();
        let vertex_array = if !version.is_embedded && version.major >= 3 {
            match unsafe { gl.create_vertex_array() } {
                Ok(vao) => {
                    unsafe { gl.bind_vertex_array(Some(vao)) };
                    Some(vao)
                }
                Err(e) => {
                    log::warn!("Failed to create default vertex array: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Self { gl, vertex_array }
    }

    /// The wrapped context
    pub fn context(&self) -> &glow::Context {
        &self.gl
    }
}

impl Drop for GlowDriver {
    fn drop(&mut self) {
        if let Some(vao) = self.vertex_array.take() {
            unsafe { self.gl.delete_vertex_array(vao) };
        }
    }
}

fn texture(name: u32) -> Option<glow::Texture> {
    NonZeroU32::new(name).map(glow::NativeTexture)
}

fn buffer(name: u32) -> Option<glow::Buffer> {
    NonZeroU32::new(name).map(glow::NativeBuffer)
}

fn shader(name: u32) -> Option<glow::Shader> {
    NonZeroU32::new(name).map(glow::NativeShader)
}

fn program(name: u32) -> Option<glow::Program> {
    NonZeroU32::new(name).map(glow::NativeProgram)
}

fn location(location: i32) -> glow::UniformLocation {
    glow::NativeUniformLocation(location as u32)
}

impl GraphicsDriver for GlowDriver {
    fn get_string(&mut self, name: GlEnum) -> Option<String> {
        if name == gl::EXTENSIONS {
            let mut extensions: Vec<&str> =
                self.gl.supported_extensions().iter().map(String::as_str).collect();
            extensions.sort_unstable();
            return Some(extensions.join(" "));
        }
        let value = unsafe { self.gl.get_parameter_string(name) };
        (unsafe { self.gl.get_error() } == gl::NO_ERROR).then_some(value)
    }

    fn get_integer(&mut self, name: GlEnum) -> Option<i32> {
        let value = unsafe { self.gl.get_parameter_i32(name) };
        (unsafe { self.gl.get_error() } == gl::NO_ERROR).then_some(value)
    }

    fn get_error(&mut self) -> GlEnum {
        unsafe { self.gl.get_error() }
    }

    fn enable(&mut self, cap: GlEnum) {
        unsafe { self.gl.enable(cap) }
    }

    fn disable(&mut self, cap: GlEnum) {
        unsafe { self.gl.disable(cap) }
    }

    fn depth_func(&mut self, func: GlEnum) {
        unsafe { self.gl.depth_func(func) }
    }

    fn depth_mask(&mut self, write: bool) {
        unsafe { self.gl.depth_mask(write) }
    }

    fn depth_range(&mut self, near: f32, far: f32) {
        unsafe { self.gl.depth_range_f32(near, far) }
    }

    fn color_mask(&mut self, red: bool, green: bool, blue: bool, alpha: bool) {
        unsafe { self.gl.color_mask(red, green, blue, alpha) }
    }

    fn polygon_offset(&mut self, factor: f32, units: f32) {
        unsafe { self.gl.polygon_offset(factor, units) }
    }

    fn cull_face(&mut self, mode: GlEnum) {
        unsafe { self.gl.cull_face(mode) }
    }

    fn blend_func(&mut self, src: GlEnum, dst: GlEnum) {
        unsafe { self.gl.blend_func(src, dst) }
    }

    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { self.gl.viewport(x, y, width, height) }
    }

    fn scissor(&mut self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { self.gl.scissor(x, y, width, height) }
    }

    fn clear_color(&mut self, red: f32, green: f32, blue: f32, alpha: f32) {
        unsafe { self.gl.clear_color(red, green, blue, alpha) }
    }

    fn clear(&mut self, mask: GlEnum) {
        unsafe { self.gl.clear(mask) }
    }

    fn line_width(&mut self, width: f32) {
        unsafe { self.gl.line_width(width) }
    }

    fn pixel_store_i32(&mut self, pname: GlEnum, value: i32) {
        unsafe { self.gl.pixel_store_i32(pname, value) }
    }

    fn create_texture(&mut self) -> Result<u32, String> {
        unsafe { self.gl.create_texture() }.map(|t| t.0.get())
    }

    fn delete_texture(&mut self, name: u32) {
        if let Some(t) = texture(name) {
            unsafe { self.gl.delete_texture(t) }
        }
    }

    fn active_texture(&mut self, unit: GlEnum) {
        unsafe { self.gl.active_texture(unit) }
    }

    fn bind_texture(&mut self, target: GlEnum, name: Option<u32>) {
        unsafe { self.gl.bind_texture(target, name.and_then(texture)) }
    }

    fn tex_parameter_i32(&mut self, target: GlEnum, pname: GlEnum, value: i32) {
        unsafe { self.gl.tex_parameter_i32(target, pname, value) }
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
        unsafe {
            self.gl.tex_image_2d(
                target,
                level,
                internal_format,
                width,
                height,
                0,
                format,
                ty,
                glow::PixelUnpackData::Slice(pixels),
            );
        }
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
        unsafe {
            self.gl.compressed_tex_image_2d(
                target,
                level,
                internal_format as i32,
                width,
                height,
                0,
                data.len() as i32,
                data,
            );
        }
    }

    fn generate_mipmap(&mut self, target: GlEnum) {
        unsafe { self.gl.generate_mipmap(target) }
    }

    fn create_buffer(&mut self) -> Result<u32, String> {
        unsafe { self.gl.create_buffer() }.map(|b| b.0.get())
    }

    fn delete_buffer(&mut self, name: u32) {
        if let Some(b) = buffer(name) {
            unsafe { self.gl.delete_buffer(b) }
        }
    }

    fn bind_buffer(&mut self, target: GlEnum, name: Option<u32>) {
        unsafe { self.gl.bind_buffer(target, name.and_then(buffer)) }
    }

    fn buffer_data(&mut self, target: GlEnum, data: &[u8], usage: GlEnum) {
        unsafe { self.gl.buffer_data_u8_slice(target, data, usage) }
    }

    fn buffer_sub_data(&mut self, target: GlEnum, offset: i32, data: &[u8]) {
        unsafe { self.gl.buffer_sub_data_u8_slice(target, offset, data) }
    }

    fn create_shader(&mut self, stage: GlEnum) -> Result<u32, String> {
        unsafe { self.gl.create_shader(stage) }.map(|s| s.0.get())
    }

    fn shader_source(&mut self, name: u32, source: &str) {
        if let Some(s) = shader(name) {
            unsafe { self.gl.shader_source(s, source) }
        }
    }

    fn compile_shader(&mut self, name: u32) {
        if let Some(s) = shader(name) {
            unsafe { self.gl.compile_shader(s) }
        }
    }

    fn get_shader_compile_status(&mut self, name: u32) -> bool {
        shader(name).is_some_and(|s| unsafe { self.gl.get_shader_compile_status(s) })
    }

    fn get_shader_info_log(&mut self, name: u32) -> String {
        shader(name)
            .map(|s| unsafe { self.gl.get_shader_info_log(s) })
            .unwrap_or_default()
    }

    fn delete_shader(&mut self, name: u32) {
        if let Some(s) = shader(name) {
            unsafe { self.gl.delete_shader(s) }
        }
    }

    fn create_program(&mut self) -> Result<u32, String> {
        unsafe { self.gl.create_program() }.map(|p| p.0.get())
    }

    fn attach_shader(&mut self, prog: u32, name: u32) {
        if let (Some(p), Some(s)) = (program(prog), shader(name)) {
            unsafe { self.gl.attach_shader(p, s) }
        }
    }

    fn detach_shader(&mut self, prog: u32, name: u32) {
        if let (Some(p), Some(s)) = (program(prog), shader(name)) {
            unsafe { self.gl.detach_shader(p, s) }
        }
    }

    fn link_program(&mut self, prog: u32) {
        if let Some(p) = program(prog) {
            unsafe { self.gl.link_program(p) }
        }
    }

    fn get_program_link_status(&mut self, prog: u32) -> bool {
        program(prog).is_some_and(|p| unsafe { self.gl.get_program_link_status(p) })
    }

    fn get_program_info_log(&mut self, prog: u32) -> String {
        program(prog)
            .map(|p| unsafe { self.gl.get_program_info_log(p) })
            .unwrap_or_default()
    }

    fn delete_program(&mut self, prog: u32) {
        if let Some(p) = program(prog) {
            unsafe { self.gl.delete_program(p) }
        }
    }

    fn use_program(&mut self, prog: Option<u32>) {
        unsafe { self.gl.use_program(prog.and_then(program)) }
    }

    fn get_uniform_location(&mut self, prog: u32, name: &str) -> Option<i32> {
        let p = program(prog)?;
        unsafe { self.gl.get_uniform_location(p, name) }.map(|l| l.0 as i32)
    }

    fn get_attrib_location(&mut self, prog: u32, name: &str) -> Option<u32> {
        let p = program(prog)?;
        unsafe { self.gl.get_attrib_location(p, name) }
    }

    fn uniform_1_f32(&mut self, loc: i32, x: f32) {
        unsafe { self.gl.uniform_1_f32(Some(&location(loc)), x) }
    }

    fn uniform_1_i32(&mut self, loc: i32, x: i32) {
        unsafe { self.gl.uniform_1_i32(Some(&location(loc)), x) }
    }

    fn uniform_1_f32_slice(&mut self, loc: i32, values: &[f32]) {
        unsafe { self.gl.uniform_1_f32_slice(Some(&location(loc)), values) }
    }

    fn uniform_2_f32_slice(&mut self, loc: i32, values: &[f32]) {
        unsafe { self.gl.uniform_2_f32_slice(Some(&location(loc)), values) }
    }

    fn uniform_3_f32_slice(&mut self, loc: i32, values: &[f32]) {
        unsafe { self.gl.uniform_3_f32_slice(Some(&location(loc)), values) }
    }

    fn uniform_4_f32_slice(&mut self, loc: i32, values: &[f32]) {
        unsafe { self.gl.uniform_4_f32_slice(Some(&location(loc)), values) }
    }

    fn uniform_matrix_3_f32_slice(&mut self, loc: i32, values: &[f32]) {
        unsafe { self.gl.uniform_matrix_3_f32_slice(Some(&location(loc)), false, values) }
    }

    fn uniform_matrix_4_f32_slice(&mut self, loc: i32, values: &[f32]) {
        unsafe { self.gl.uniform_matrix_4_f32_slice(Some(&location(loc)), false, values) }
    }

    fn enable_vertex_attrib_array(&mut self, index: u32) {
        unsafe { self.gl.enable_vertex_attrib_array(index) }
    }

    fn disable_vertex_attrib_array(&mut self, index: u32) {
        unsafe { self.gl.disable_vertex_attrib_array(index) }
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
        unsafe { self.gl.vertex_attrib_pointer_f32(index, size, ty, normalized, stride, offset) }
    }

    fn draw_arrays(&mut self, mode: GlEnum, first: i32, count: i32) {
        unsafe { self.gl.draw_arrays(mode, first, count) }
    }

    fn draw_elements(&mut self, mode: GlEnum, count: i32, ty: GlEnum, offset: i32) {
        unsafe { self.gl.draw_elements(mode, count, ty, offset) }
    }

    fn draw_arrays_instanced(&mut self, mode: GlEnum, first: i32, count: i32, instances: i32) {
        unsafe { self.gl.draw_arrays_instanced(mode, first, count, instances) }
    }

    fn draw_elements_instanced(
        &mut self,
        mode: GlEnum,
        count: i32,
        ty: GlEnum,
        offset: i32,
        instances: i32,
    ) {
        unsafe { self.gl.draw_elements_instanced(mode, count, ty, offset, instances) }
    }

    fn read_pixels(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        format: GlEnum,
        ty: GlEnum,
        pixels: &mut [u8],
    ) {
        unsafe {
            self.gl.read_pixels(
                x,
                y,
                width,
                height,
                format,
                ty,
                glow::PixelPackData::Slice(Some(pixels)),
            );
        }
    }
}

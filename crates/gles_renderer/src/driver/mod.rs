//! Graphics driver abstraction
//!
//! [`GraphicsDriver`] is the thin, stateful, GL-shaped surface every renderer
//! component talks to. Object names are plain `u32` values and enums are raw
//! driver constants from [`gl`], so a backend only forwards calls.
//!
//! Two backends ship with the crate:
//!
//! - [`HeadlessDriver`]: simulates a GLES 2.0 context in memory and records
//!   every call. Used by the test suite and by tools that need the renderer
//!   without a window.
//! - `GlowDriver` (feature `glow`): forwards to a live `glow::Context`.

mod headless;

#[cfg(feature = "glow")]
mod glow_driver;

pub use headless::{DriverCall, HeadlessDriver};

#[cfg(feature = "glow")]
pub use glow_driver::GlowDriver;

/// Raw driver enum value
pub type GlEnum = u32;

/// Driver constants used by the renderer
///
/// Values match the Khronos GLES 2.0 headers plus the extensions the
/// capability detector knows about.
#[allow(missing_docs)]
pub mod gl {
    use super::GlEnum;

    // Errors
    pub const NO_ERROR: GlEnum = 0;
    pub const INVALID_ENUM: GlEnum = 0x0500;
    pub const INVALID_VALUE: GlEnum = 0x0501;
    pub const INVALID_OPERATION: GlEnum = 0x0502;
    pub const OUT_OF_MEMORY: GlEnum = 0x0505;
    pub const INVALID_FRAMEBUFFER_OPERATION: GlEnum = 0x0506;

    // Strings
    pub const VENDOR: GlEnum = 0x1F00;
    pub const RENDERER: GlEnum = 0x1F01;
    pub const VERSION: GlEnum = 0x1F02;
    pub const EXTENSIONS: GlEnum = 0x1F03;
    pub const SHADING_LANGUAGE_VERSION: GlEnum = 0x8B8C;

    // Limits
    pub const SUBPIXEL_BITS: GlEnum = 0x0D50;
    pub const MAX_TEXTURE_SIZE: GlEnum = 0x0D33;
    pub const MAX_CUBE_MAP_TEXTURE_SIZE: GlEnum = 0x851C;
    pub const MAX_TEXTURE_IMAGE_UNITS: GlEnum = 0x8872;
    pub const MAX_VERTEX_TEXTURE_IMAGE_UNITS: GlEnum = 0x8B4C;
    pub const MAX_VERTEX_UNIFORM_VECTORS: GlEnum = 0x8DFB;
    pub const MAX_FRAGMENT_UNIFORM_VECTORS: GlEnum = 0x8DFD;
    pub const MAX_VARYING_VECTORS: GlEnum = 0x8DFC;
    pub const MAX_VERTEX_ATTRIBS: GlEnum = 0x8869;
    pub const NUM_COMPRESSED_TEXTURE_FORMATS: GlEnum = 0x86A2;

    // Capabilities
    pub const CULL_FACE: GlEnum = 0x0B44;
    pub const DEPTH_TEST: GlEnum = 0x0B71;
    pub const DITHER: GlEnum = 0x0BD0;
    pub const BLEND: GlEnum = 0x0BE2;
    pub const SCISSOR_TEST: GlEnum = 0x0C11;
    pub const POLYGON_OFFSET_FILL: GlEnum = 0x8037;
    pub const SAMPLE_ALPHA_TO_COVERAGE: GlEnum = 0x809E;

    // Depth, culling, blending
    pub const LEQUAL: GlEnum = 0x0203;
    pub const FRONT: GlEnum = 0x0404;
    pub const BACK: GlEnum = 0x0405;
    pub const FRONT_AND_BACK: GlEnum = 0x0408;
    pub const ZERO: GlEnum = 0;
    pub const ONE: GlEnum = 1;
    pub const SRC_COLOR: GlEnum = 0x0300;
    pub const ONE_MINUS_SRC_COLOR: GlEnum = 0x0301;
    pub const SRC_ALPHA: GlEnum = 0x0302;
    pub const ONE_MINUS_SRC_ALPHA: GlEnum = 0x0303;
    pub const DST_COLOR: GlEnum = 0x0306;

    // Clear mask
    pub const DEPTH_BUFFER_BIT: GlEnum = 0x0100;
    pub const STENCIL_BUFFER_BIT: GlEnum = 0x0400;
    pub const COLOR_BUFFER_BIT: GlEnum = 0x4000;

    // Pixel store
    pub const UNPACK_ALIGNMENT: GlEnum = 0x0CF5;
    pub const PACK_ALIGNMENT: GlEnum = 0x0D05;

    // Textures
    pub const TEXTURE_2D: GlEnum = 0x0DE1;
    pub const TEXTURE_CUBE_MAP: GlEnum = 0x8513;
    pub const TEXTURE_CUBE_MAP_POSITIVE_X: GlEnum = 0x8515;
    pub const TEXTURE0: GlEnum = 0x84C0;
    pub const TEXTURE_MAG_FILTER: GlEnum = 0x2800;
    pub const TEXTURE_MIN_FILTER: GlEnum = 0x2801;
    pub const TEXTURE_WRAP_S: GlEnum = 0x2802;
    pub const TEXTURE_WRAP_T: GlEnum = 0x2803;
    pub const NEAREST: GlEnum = 0x2600;
    pub const LINEAR: GlEnum = 0x2601;
    pub const NEAREST_MIPMAP_NEAREST: GlEnum = 0x2700;
    pub const LINEAR_MIPMAP_NEAREST: GlEnum = 0x2701;
    pub const NEAREST_MIPMAP_LINEAR: GlEnum = 0x2702;
    pub const LINEAR_MIPMAP_LINEAR: GlEnum = 0x2703;
    pub const REPEAT: GlEnum = 0x2901;
    pub const CLAMP_TO_EDGE: GlEnum = 0x812F;
    pub const MIRRORED_REPEAT: GlEnum = 0x8370;

    // Pixel formats and types
    pub const DEPTH_COMPONENT: GlEnum = 0x1902;
    pub const ALPHA: GlEnum = 0x1906;
    pub const RGB: GlEnum = 0x1907;
    pub const RGBA: GlEnum = 0x1908;
    pub const LUMINANCE: GlEnum = 0x1909;
    pub const LUMINANCE_ALPHA: GlEnum = 0x190A;
    pub const UNSIGNED_SHORT_4_4_4_4: GlEnum = 0x8033;
    pub const UNSIGNED_SHORT_5_5_5_1: GlEnum = 0x8034;
    pub const UNSIGNED_SHORT_5_6_5: GlEnum = 0x8363;
    pub const COMPRESSED_RGB_S3TC_DXT1_EXT: GlEnum = 0x83F0;
    pub const COMPRESSED_RGBA_S3TC_DXT1_EXT: GlEnum = 0x83F1;
    pub const ETC1_RGB8_OES: GlEnum = 0x8D64;

    // Data types
    pub const BYTE: GlEnum = 0x1400;
    pub const UNSIGNED_BYTE: GlEnum = 0x1401;
    pub const SHORT: GlEnum = 0x1402;
    pub const UNSIGNED_SHORT: GlEnum = 0x1403;
    pub const INT: GlEnum = 0x1404;
    pub const UNSIGNED_INT: GlEnum = 0x1405;
    pub const FLOAT: GlEnum = 0x1406;
    pub const HALF_FLOAT_OES: GlEnum = 0x8D61;

    // Buffers
    pub const ARRAY_BUFFER: GlEnum = 0x8892;
    pub const ELEMENT_ARRAY_BUFFER: GlEnum = 0x8893;
    pub const STREAM_DRAW: GlEnum = 0x88E0;
    pub const STATIC_DRAW: GlEnum = 0x88E4;
    pub const DYNAMIC_DRAW: GlEnum = 0x88E8;

    // Shaders
    pub const FRAGMENT_SHADER: GlEnum = 0x8B30;
    pub const VERTEX_SHADER: GlEnum = 0x8B31;

    // Primitives
    pub const POINTS: GlEnum = 0x0000;
    pub const LINES: GlEnum = 0x0001;
    pub const LINE_LOOP: GlEnum = 0x0002;
    pub const LINE_STRIP: GlEnum = 0x0003;
    pub const TRIANGLES: GlEnum = 0x0004;
    pub const TRIANGLE_STRIP: GlEnum = 0x0005;
    pub const TRIANGLE_FAN: GlEnum = 0x0006;

    /// Symbolic name of a driver error code
    pub const fn error_name(code: GlEnum) -> &'static str {
        match code {
            NO_ERROR => "NO_ERROR",
            INVALID_ENUM => "INVALID_ENUM",
            INVALID_VALUE => "INVALID_VALUE",
            INVALID_OPERATION => "INVALID_OPERATION",
            OUT_OF_MEMORY => "OUT_OF_MEMORY",
            INVALID_FRAMEBUFFER_OPERATION => "INVALID_FRAMEBUFFER_OPERATION",
            _ => "UNKNOWN_ERROR",
        }
    }
}

/// Stateful GL-like driver
///
/// Every method maps onto one driver entry point. Methods take `&mut self`
/// because the driver owns hidden global state, and recording backends need
/// to log queries as well as commands.
///
/// Creation methods return `Err` with the driver's message when no object
/// name was produced. Queries the driver does not support return `None`.
pub trait GraphicsDriver {
    // --- queries ---

    /// Read a driver string such as [`gl::VERSION`]
    fn get_string(&mut self, name: GlEnum) -> Option<String>;

    /// Read an integer parameter such as [`gl::MAX_TEXTURE_SIZE`]
    fn get_integer(&mut self, name: GlEnum) -> Option<i32>;

    /// Pop the oldest unreported error, [`gl::NO_ERROR`] when there is none
    fn get_error(&mut self) -> GlEnum;

    // --- fixed-function state ---

    /// Enable a capability
    fn enable(&mut self, cap: GlEnum);
    /// Disable a capability
    fn disable(&mut self, cap: GlEnum);
    /// Set the depth comparison function
    fn depth_func(&mut self, func: GlEnum);
    /// Enable or disable depth writes
    fn depth_mask(&mut self, write: bool);
    /// Set the depth range mapping
    fn depth_range(&mut self, near: f32, far: f32);
    /// Enable or disable color writes per channel
    fn color_mask(&mut self, red: bool, green: bool, blue: bool, alpha: bool);
    /// Set polygon offset factor and units
    fn polygon_offset(&mut self, factor: f32, units: f32);
    /// Select the faces to cull
    fn cull_face(&mut self, mode: GlEnum);
    /// Set the blend factors
    fn blend_func(&mut self, src: GlEnum, dst: GlEnum);
    /// Set the viewport rectangle
    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32);
    /// Set the scissor rectangle
    fn scissor(&mut self, x: i32, y: i32, width: i32, height: i32);
    /// Set the color used by color clears
    fn clear_color(&mut self, red: f32, green: f32, blue: f32, alpha: f32);
    /// Clear the buffers named by `mask`
    fn clear(&mut self, mask: GlEnum);
    /// Set the rasterized line width
    fn line_width(&mut self, width: f32);
    /// Set a pixel store parameter
    fn pixel_store_i32(&mut self, pname: GlEnum, value: i32);

    // --- textures ---

    /// Create a texture object
    fn create_texture(&mut self) -> Result<u32, String>;
    /// Delete a texture object
    fn delete_texture(&mut self, texture: u32);
    /// Select the active texture unit (`gl::TEXTURE0 + unit`)
    fn active_texture(&mut self, unit: GlEnum);
    /// Bind a texture to a target of the active unit
    fn bind_texture(&mut self, target: GlEnum, texture: Option<u32>);
    /// Set an integer texture parameter on the bound texture
    fn tex_parameter_i32(&mut self, target: GlEnum, pname: GlEnum, value: i32);
    /// Upload or allocate one uncompressed image level
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
    );
    /// Upload one compressed image level
    fn compressed_tex_image_2d(
        &mut self,
        target: GlEnum,
        level: i32,
        internal_format: GlEnum,
        width: i32,
        height: i32,
        data: &[u8],
    );
    /// Generate the mip chain of the bound texture
    fn generate_mipmap(&mut self, target: GlEnum);

    // --- buffers ---

    /// Create a buffer object
    fn create_buffer(&mut self) -> Result<u32, String>;
    /// Delete a buffer object
    fn delete_buffer(&mut self, buffer: u32);
    /// Bind a buffer to a target
    fn bind_buffer(&mut self, target: GlEnum, buffer: Option<u32>);
    /// Allocate storage for the bound buffer and fill it
    fn buffer_data(&mut self, target: GlEnum, data: &[u8], usage: GlEnum);
    /// Overwrite part of the bound buffer
    fn buffer_sub_data(&mut self, target: GlEnum, offset: i32, data: &[u8]);

    // --- shaders and programs ---

    /// Create a shader object of the given stage
    fn create_shader(&mut self, stage: GlEnum) -> Result<u32, String>;
    /// Replace the source of a shader object
    fn shader_source(&mut self, shader: u32, source: &str);
    /// Compile a shader object
    fn compile_shader(&mut self, shader: u32);
    /// Whether the last compile of `shader` succeeded
    fn get_shader_compile_status(&mut self, shader: u32) -> bool;
    /// Info log of the last compile
    fn get_shader_info_log(&mut self, shader: u32) -> String;
    /// Delete a shader object
    fn delete_shader(&mut self, shader: u32);
    /// Create a program object
    fn create_program(&mut self) -> Result<u32, String>;
    /// Attach a shader to a program
    fn attach_shader(&mut self, program: u32, shader: u32);
    /// Detach a shader from a program
    fn detach_shader(&mut self, program: u32, shader: u32);
    /// Link a program
    fn link_program(&mut self, program: u32);
    /// Whether the last link of `program` succeeded
    fn get_program_link_status(&mut self, program: u32) -> bool;
    /// Info log of the last link
    fn get_program_info_log(&mut self, program: u32) -> String;
    /// Delete a program object
    fn delete_program(&mut self, program: u32);
    /// Make a program current
    fn use_program(&mut self, program: Option<u32>);
    /// Location of an active uniform, `None` when the program has none by that name
    fn get_uniform_location(&mut self, program: u32, name: &str) -> Option<i32>;
    /// Location of an active attribute, `None` when the program has none by that name
    fn get_attrib_location(&mut self, program: u32, name: &str) -> Option<u32>;

    // --- uniforms (on the current program) ---

    /// Set a float uniform
    fn uniform_1_f32(&mut self, location: i32, x: f32);
    /// Set an int or sampler uniform
    fn uniform_1_i32(&mut self, location: i32, x: i32);
    /// Set a float array uniform
    fn uniform_1_f32_slice(&mut self, location: i32, values: &[f32]);
    /// Set a vec2 (array) uniform
    fn uniform_2_f32_slice(&mut self, location: i32, values: &[f32]);
    /// Set a vec3 (array) uniform
    fn uniform_3_f32_slice(&mut self, location: i32, values: &[f32]);
    /// Set a vec4 (array) uniform
    fn uniform_4_f32_slice(&mut self, location: i32, values: &[f32]);
    /// Set a mat3 (array) uniform from column-major values
    fn uniform_matrix_3_f32_slice(&mut self, location: i32, values: &[f32]);
    /// Set a mat4 (array) uniform from column-major values
    fn uniform_matrix_4_f32_slice(&mut self, location: i32, values: &[f32]);

    // --- vertex attributes and draws ---

    /// Enable a vertex attribute slot
    fn enable_vertex_attrib_array(&mut self, index: u32);
    /// Disable a vertex attribute slot
    fn disable_vertex_attrib_array(&mut self, index: u32);
    /// Point a slot at the bound array buffer
    fn vertex_attrib_pointer(
        &mut self,
        index: u32,
        size: i32,
        ty: GlEnum,
        normalized: bool,
        stride: i32,
        offset: i32,
    );
    /// Draw non-indexed primitives
    fn draw_arrays(&mut self, mode: GlEnum, first: i32, count: i32);
    /// Draw indexed primitives from the bound element buffer
    fn draw_elements(&mut self, mode: GlEnum, count: i32, ty: GlEnum, offset: i32);
    /// Draw instanced non-indexed primitives
    fn draw_arrays_instanced(&mut self, mode: GlEnum, first: i32, count: i32, instances: i32);
    /// Draw instanced indexed primitives
    fn draw_elements_instanced(
        &mut self,
        mode: GlEnum,
        count: i32,
        ty: GlEnum,
        offset: i32,
        instances: i32,
    );

    // --- readback ---

    /// Read a rectangle of the default framebuffer
    fn read_pixels(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        format: GlEnum,
        ty: GlEnum,
        pixels: &mut [u8],
    );
}

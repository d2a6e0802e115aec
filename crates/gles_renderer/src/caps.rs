//! Capability detection
//!
//! Runs once at renderer initialization. Reads the driver's version and
//! extension strings plus its numeric limits, and folds them into an
//! immutable [`CapabilitySet`] that every other component consults before
//! taking an optional path.
//!
//! Missing limits never abort detection: the GLES 2.0 guaranteed minimum is
//! used and a warning is logged. The only fatal condition is a driver below
//! the GLSL ES 1.00 baseline.

use bitflags::bitflags;

use crate::config::RendererConfig;
use crate::driver::{gl, GlEnum, GraphicsDriver};
use crate::error::{RenderError, RenderResult};

bitflags! {
    /// Optional driver features
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Caps: u32 {
        /// GLSL ES 1.00 shaders (baseline)
        const GLSL100 = 1 << 0;
        /// Texture sampling from vertex shaders
        const VERTEX_TEXTURE_FETCH = 1 << 1;
        /// Instanced draw calls
        const MESH_INSTANCING = 1 << 2;
        /// Non-power-of-two texture dimensions
        const NON_POWER_OF_TWO = 1 << 3;
        /// S3TC DXT1 compressed textures
        const TEXTURE_COMPRESSION_DXT1 = 1 << 4;
        /// ETC1 compressed textures
        const TEXTURE_COMPRESSION_ETC1 = 1 << 5;
        /// Depth component textures
        const DEPTH_TEXTURE = 1 << 6;
        /// 24-bit depth
        const DEPTH24 = 1 << 7;
        /// Half-float vertex attributes
        const HALF_FLOAT_VERTEX = 1 << 8;
        /// 32-bit index buffers
        const ELEMENT_INDEX_UINT = 1 << 9;
        /// 32-bit integer vertex attributes
        const INT_VERTEX = 1 << 10;
    }
}

/// Numeric driver limits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Combined fragment texture units
    pub texture_units: u32,
    /// Vertex shader texture units
    pub vertex_texture_units: u32,
    /// Vertex uniform components
    pub vertex_uniforms: u32,
    /// Fragment uniform components
    pub fragment_uniforms: u32,
    /// Varying components
    pub varyings: u32,
    /// Vertex attribute slots
    pub vertex_attribs: u32,
    /// Sub-pixel precision bits
    pub subpixel_bits: u32,
    /// Largest 2D texture dimension
    pub max_texture_size: u32,
    /// Largest cube map face dimension
    pub max_cube_map_size: u32,
}

impl Limits {
    /// Values every GLES 2.0 implementation guarantees
    pub const GLES2_MINIMUM: Self = Self {
        texture_units: 8,
        vertex_texture_units: 0,
        vertex_uniforms: 128 * 4,
        fragment_uniforms: 16 * 4,
        varyings: 8 * 4,
        vertex_attribs: 8,
        subpixel_bits: 4,
        max_texture_size: 64,
        max_cube_map_size: 16,
    };
}

/// Everything the renderer learned about the driver
#[derive(Debug, Clone)]
pub struct CapabilitySet {
    /// Feature flags
    pub caps: Caps,
    /// Numeric limits
    pub limits: Limits,
    /// Driver version as major * 100 + minor
    pub version: u32,
    /// Shading language version as major * 100 + minor
    pub shading_language_version: u32,
    /// Whether the driver is OpenGL ES rather than desktop OpenGL
    pub embedded: bool,
    /// Vendor string
    pub vendor: String,
    /// Renderer string
    pub renderer: String,
    /// Advertised extensions
    pub extensions: Vec<String>,
}

impl CapabilitySet {
    /// Whether every flag in `caps` is present
    pub fn has(&self, caps: Caps) -> bool {
        self.caps.contains(caps)
    }

    /// Whether shaders tagged with `language` (e.g. `GLSL100`) can be compiled
    pub fn supports_language(&self, language: &str) -> bool {
        match language.strip_prefix("GLSL").and_then(|v| v.parse::<u32>().ok()) {
            Some(100) => self.has(Caps::GLSL100),
            Some(version) => version <= self.shading_language_version,
            None => false,
        }
    }

    /// Maximum dimension for a texture of the given kind
    pub fn max_dimension(&self, cube_map: bool) -> u32 {
        if cube_map {
            self.limits.max_cube_map_size
        } else {
            self.limits.max_texture_size
        }
    }
}

/// How textures get their mip chains
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadStrategy {
    /// Ask the driver to generate missing mip levels
    pub hardware_mipmaps: bool,
}

impl UploadStrategy {
    /// Derive the strategy from the detected feature level and configuration
    pub fn new(caps: &CapabilitySet, config: &RendererConfig) -> Self {
        let feature_level = if caps.embedded {
            caps.version >= 200
        } else {
            caps.version >= 300
        };
        Self { hardware_mipmaps: feature_level && config.hardware_mipmaps }
    }
}

/// Parse the first `major.minor` number in a driver version string
///
/// `"OpenGL ES 2.0 Mesa"` gives 200, `"OpenGL ES GLSL ES 1.00"` gives 100,
/// `"4.60 NVIDIA"` gives 460.
pub fn parse_version(text: &str) -> Option<u32> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let rest = &text[start..];
    let mut parts = rest.split(|c: char| !c.is_ascii_digit());
    let major: u32 = parts.next()?.parse().ok()?;
    if rest.as_bytes().get(rest.find(|c: char| !c.is_ascii_digit())?) != Some(&b'.') {
        return None;
    }
    let minor_digits = parts.next()?;
    let minor: u32 = match minor_digits.len() {
        0 => return None,
        1 => minor_digits.parse::<u32>().ok()? * 10,
        _ => minor_digits[..2].parse().ok()?,
    };
    Some(major * 100 + minor)
}

fn query_limit<D: GraphicsDriver + ?Sized>(driver: &mut D, name: GlEnum, label: &str, fallback: u32) -> u32 {
    match driver.get_integer(name) {
        Some(value) if value >= 0 => value as u32,
        _ => {
            log::warn!("Driver does not report {}, assuming {}", label, fallback);
            fallback
        }
    }
}

/// Query the driver and build its capability set
///
/// Fails with [`RenderError::CapabilityMissing`] when the shading language is
/// absent or older than GLSL ES 1.00.
pub fn detect<D: GraphicsDriver + ?Sized>(
    driver: &mut D,
    config: &RendererConfig,
) -> RenderResult<CapabilitySet> {
    let vendor = driver.get_string(gl::VENDOR).unwrap_or_default();
    let renderer = driver.get_string(gl::RENDERER).unwrap_or_default();
    let version_text = driver.get_string(gl::VERSION).unwrap_or_default();
    let glsl_text = driver.get_string(gl::SHADING_LANGUAGE_VERSION);

    log::info!("GL vendor: {}", vendor);
    log::info!("GL renderer: {}", renderer);
    log::info!("GL version: {}", version_text);
    log::info!("GLSL version: {}", glsl_text.as_deref().unwrap_or("<none>"));

    let embedded = version_text.contains("OpenGL ES");
    let version = parse_version(&version_text).unwrap_or(0);
    let shading_language_version = glsl_text.as_deref().and_then(parse_version).unwrap_or(0);
    if shading_language_version < 100 {
        return Err(RenderError::CapabilityMissing(format!(
            "GLSL100 (driver reports '{}')",
            glsl_text.unwrap_or_default()
        )));
    }

    let min = Limits::GLES2_MINIMUM;
    let mut limits = Limits {
        texture_units: query_limit(driver, gl::MAX_TEXTURE_IMAGE_UNITS, "texture units", min.texture_units),
        vertex_texture_units: query_limit(
            driver,
            gl::MAX_VERTEX_TEXTURE_IMAGE_UNITS,
            "vertex texture units",
            min.vertex_texture_units,
        ),
        vertex_uniforms: query_limit(driver, gl::MAX_VERTEX_UNIFORM_VECTORS, "vertex uniform vectors", 128)
            * 4,
        fragment_uniforms: query_limit(
            driver,
            gl::MAX_FRAGMENT_UNIFORM_VECTORS,
            "fragment uniform vectors",
            16,
        ) * 4,
        varyings: query_limit(driver, gl::MAX_VARYING_VECTORS, "varying vectors", 8) * 4,
        vertex_attribs: query_limit(driver, gl::MAX_VERTEX_ATTRIBS, "vertex attributes", min.vertex_attribs),
        subpixel_bits: query_limit(driver, gl::SUBPIXEL_BITS, "subpixel bits", min.subpixel_bits),
        max_texture_size: query_limit(driver, gl::MAX_TEXTURE_SIZE, "max texture size", min.max_texture_size),
        max_cube_map_size: query_limit(
            driver,
            gl::MAX_CUBE_MAP_TEXTURE_SIZE,
            "max cube map size",
            min.max_cube_map_size,
        ),
    };
    limits.texture_units = limits.texture_units.min(config.max_texture_units);
    limits.vertex_attribs = limits.vertex_attribs.min(config.max_vertex_attribs);

    let extensions: Vec<String> = driver
        .get_string(gl::EXTENSIONS)
        .unwrap_or_default()
        .split_whitespace()
        .map(ToString::to_string)
        .collect();
    let has_ext = |names: &[&str]| names.iter().any(|n| extensions.iter().any(|e| e == n));
    let es3 = embedded && version >= 300;

    let mut caps = Caps::GLSL100;
    caps.set(Caps::VERTEX_TEXTURE_FETCH, limits.vertex_texture_units > 0);
    caps.set(
        Caps::NON_POWER_OF_TWO,
        es3 || (!embedded && version >= 200)
            || has_ext(&[
                "GL_OES_texture_npot",
                "GL_NV_texture_npot_2D_mipmap",
                "GL_ARB_texture_non_power_of_two",
            ]),
    );
    caps.set(
        Caps::MESH_INSTANCING,
        es3 || (!embedded && version >= 310)
            || has_ext(&[
                "GL_EXT_draw_instanced",
                "GL_NV_draw_instanced",
                "GL_ANGLE_instanced_arrays",
                "GL_ARB_draw_instanced",
            ]),
    );
    caps.set(
        Caps::TEXTURE_COMPRESSION_DXT1,
        has_ext(&["GL_EXT_texture_compression_dxt1", "GL_EXT_texture_compression_s3tc"]),
    );
    caps.set(
        Caps::TEXTURE_COMPRESSION_ETC1,
        has_ext(&["GL_OES_compressed_ETC1_RGB8_texture"]),
    );
    caps.set(Caps::DEPTH_TEXTURE, es3 || !embedded || has_ext(&["GL_OES_depth_texture"]));
    caps.set(Caps::DEPTH24, es3 || !embedded || has_ext(&["GL_OES_depth24"]));
    caps.set(
        Caps::HALF_FLOAT_VERTEX,
        es3 || (!embedded && version >= 300) || has_ext(&["GL_OES_vertex_half_float"]),
    );
    caps.set(Caps::ELEMENT_INDEX_UINT, es3 || !embedded || has_ext(&["GL_OES_element_index_uint"]));
    caps.set(Caps::INT_VERTEX, es3 || !embedded);

    if !config.enable_compression {
        caps.remove(Caps::TEXTURE_COMPRESSION_DXT1 | Caps::TEXTURE_COMPRESSION_ETC1);
    }

    if let Some(count) = driver.get_integer(gl::NUM_COMPRESSED_TEXTURE_FORMATS) {
        log::info!("Driver reports {} compressed texture formats", count);
    }
    log::info!("Capabilities: {:?}", caps);
    log::debug!("Limits: {:?}", limits);

    Ok(CapabilitySet {
        caps,
        limits,
        version,
        shading_language_version,
        embedded,
        vendor,
        renderer,
        extensions,
    })
}

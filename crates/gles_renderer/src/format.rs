//! Portable formats and their driver encodings
//!
//! Every portable enum the renderer accepts (pixel formats, vertex element
//! formats, buffer usage hints, texture kinds, sampler filters and wrap modes)
//! is mapped to driver constants through a static table. Tables are checked
//! in full by [`validate_tables`] when the renderer initializes, so a missing
//! mapping surfaces once at startup instead of at an arbitrary draw.
//!
//! The second half of the module slices image data into mip levels and
//! uploads them.

use serde::{Deserialize, Serialize};

use crate::caps::{Caps, CapabilitySet};
use crate::context::RenderContext;
use crate::driver::{gl, GlEnum, GraphicsDriver};
use crate::error::{RenderError, RenderResult};
use crate::resources::Image;
use crate::state;

/// Portable pixel formats
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    Alpha8,
    Alpha16,
    Luminance8,
    Luminance16,
    Luminance8Alpha8,
    Luminance16Alpha16,
    RGB565,
    ARGB4444,
    RGB5A1,
    RGB8,
    BGR8,
    RGB10,
    RGB16,
    RGBA8,
    RGBA16,
    Depth,
    Depth16,
    Depth24,
    Depth32,
    Depth32F,
    DXT1,
    DXT1A,
    ETC1,
}

impl PixelFormat {
    /// Bits per pixel of the uploaded data
    pub const fn bits_per_pixel(self) -> u32 {
        match self {
            Self::DXT1 | Self::DXT1A | Self::ETC1 => 4,
            Self::Alpha8 | Self::Luminance8 => 8,
            Self::Alpha16
            | Self::Luminance16
            | Self::Luminance8Alpha8
            | Self::RGB565
            | Self::ARGB4444
            | Self::RGB5A1
            | Self::Depth
            | Self::Depth16 => 16,
            Self::RGB8 | Self::BGR8 => 24,
            Self::Luminance16Alpha16
            | Self::RGB10
            | Self::RGBA8
            | Self::Depth24
            | Self::Depth32
            | Self::Depth32F => 32,
            Self::RGB16 => 48,
            Self::RGBA16 => 64,
        }
    }

    /// Whether data is stored in compressed blocks
    pub const fn is_compressed(self) -> bool {
        matches!(self, Self::DXT1 | Self::DXT1A | Self::ETC1)
    }

    /// Byte size of one mip level
    pub fn level_size(self, width: u32, height: u32, level: u32) -> usize {
        let w = (width >> level).max(1) as usize;
        let h = (height >> level).max(1) as usize;
        if self.is_compressed() {
            // 4x4 blocks of 8 bytes
            w.div_ceil(4) * h.div_ceil(4) * 8
        } else {
            w * h * self.bits_per_pixel() as usize / 8
        }
    }
}

/// Driver encoding of a pixel format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureFormat {
    /// Internal format argument
    pub internal_format: GlEnum,
    /// Pixel data format, or the compressed format for compressed data
    pub format: GlEnum,
    /// Pixel data type, unused for compressed data
    pub data_type: GlEnum,
    /// Upload with the compressed entry point
    pub compressed: bool,
    /// Capabilities the format needs
    pub requires: Caps,
}

const fn plain(format: GlEnum, data_type: GlEnum, requires: Caps) -> TextureFormat {
    TextureFormat { internal_format: format, format, data_type, compressed: false, requires }
}

const fn compressed(format: GlEnum, requires: Caps) -> TextureFormat {
    TextureFormat { internal_format: format, format, data_type: gl::UNSIGNED_BYTE, compressed: true, requires }
}

const PIXEL_FORMAT_TABLE: &[(PixelFormat, TextureFormat)] = &[
    (PixelFormat::Alpha8, plain(gl::ALPHA, gl::UNSIGNED_BYTE, Caps::empty())),
    (PixelFormat::Luminance8, plain(gl::LUMINANCE, gl::UNSIGNED_BYTE, Caps::empty())),
    (PixelFormat::Luminance8Alpha8, plain(gl::LUMINANCE_ALPHA, gl::UNSIGNED_BYTE, Caps::empty())),
    (PixelFormat::RGB565, plain(gl::RGB, gl::UNSIGNED_SHORT_5_6_5, Caps::empty())),
    (PixelFormat::ARGB4444, plain(gl::RGBA, gl::UNSIGNED_SHORT_4_4_4_4, Caps::empty())),
    (PixelFormat::RGB5A1, plain(gl::RGBA, gl::UNSIGNED_SHORT_5_5_5_1, Caps::empty())),
    (PixelFormat::RGB8, plain(gl::RGB, gl::UNSIGNED_BYTE, Caps::empty())),
    (PixelFormat::RGBA8, plain(gl::RGBA, gl::UNSIGNED_BYTE, Caps::empty())),
    (PixelFormat::Depth, plain(gl::DEPTH_COMPONENT, gl::UNSIGNED_SHORT, Caps::DEPTH_TEXTURE)),
    (PixelFormat::Depth16, plain(gl::DEPTH_COMPONENT, gl::UNSIGNED_SHORT, Caps::DEPTH_TEXTURE)),
    (
        PixelFormat::Depth24,
        plain(gl::DEPTH_COMPONENT, gl::UNSIGNED_INT, Caps::DEPTH_TEXTURE.union(Caps::DEPTH24)),
    ),
    (PixelFormat::DXT1, compressed(gl::COMPRESSED_RGB_S3TC_DXT1_EXT, Caps::TEXTURE_COMPRESSION_DXT1)),
    (PixelFormat::DXT1A, compressed(gl::COMPRESSED_RGBA_S3TC_DXT1_EXT, Caps::TEXTURE_COMPRESSION_DXT1)),
    (PixelFormat::ETC1, compressed(gl::ETC1_RGB8_OES, Caps::TEXTURE_COMPRESSION_ETC1)),
];

/// Driver encoding of `format` on a driver with `caps`
///
/// Formats without a GLES 2.0 equivalent, and formats whose capability is
/// missing, are [`RenderError::UnsupportedFormat`].
pub fn translate(format: PixelFormat, caps: &CapabilitySet) -> RenderResult<TextureFormat> {
    let (_, encoding) = PIXEL_FORMAT_TABLE
        .iter()
        .find(|(f, _)| *f == format)
        .ok_or_else(|| RenderError::unsupported_format(format!("{format:?} has no GLES 2.0 equivalent")))?;

    if !caps.has(encoding.requires) {
        return Err(RenderError::unsupported_format(format!(
            "{format:?} requires {:?}",
            encoding.requires.difference(caps.caps)
        )));
    }
    Ok(*encoding)
}

/// Numeric type of vertex buffer elements
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementFormat {
    Byte,
    UnsignedByte,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    Half,
    Float,
    Double,
}

impl ElementFormat {
    /// Every variant
    pub const ALL: [Self; 9] = [
        Self::Byte,
        Self::UnsignedByte,
        Self::Short,
        Self::UnsignedShort,
        Self::Int,
        Self::UnsignedInt,
        Self::Half,
        Self::Float,
        Self::Double,
    ];

    /// Size of one component in bytes
    pub const fn size(self) -> usize {
        match self {
            Self::Byte | Self::UnsignedByte => 1,
            Self::Short | Self::UnsignedShort | Self::Half => 2,
            Self::Int | Self::UnsignedInt | Self::Float => 4,
            Self::Double => 8,
        }
    }
}

const ELEMENT_FORMAT_TABLE: &[(ElementFormat, GlEnum, Caps)] = &[
    (ElementFormat::Byte, gl::BYTE, Caps::empty()),
    (ElementFormat::UnsignedByte, gl::UNSIGNED_BYTE, Caps::empty()),
    (ElementFormat::Short, gl::SHORT, Caps::empty()),
    (ElementFormat::UnsignedShort, gl::UNSIGNED_SHORT, Caps::empty()),
    (ElementFormat::Int, gl::INT, Caps::INT_VERTEX),
    (ElementFormat::UnsignedInt, gl::UNSIGNED_INT, Caps::INT_VERTEX),
    (ElementFormat::Half, gl::HALF_FLOAT_OES, Caps::HALF_FLOAT_VERTEX),
    (ElementFormat::Float, gl::FLOAT, Caps::empty()),
];

/// Driver type of vertex elements
pub fn element_type(format: ElementFormat, caps: &CapabilitySet) -> RenderResult<GlEnum> {
    let (_, ty, requires) = ELEMENT_FORMAT_TABLE
        .iter()
        .find(|(f, _, _)| *f == format)
        .ok_or_else(|| RenderError::unsupported_format(format!("{format:?} vertex data is not supported")))?;
    if !caps.has(*requires) {
        return Err(RenderError::unsupported_format(format!("{format:?} vertex data requires {requires:?}")));
    }
    Ok(*ty)
}

const INDEX_FORMAT_TABLE: &[(ElementFormat, GlEnum, Caps)] = &[
    (ElementFormat::UnsignedByte, gl::UNSIGNED_BYTE, Caps::empty()),
    (ElementFormat::UnsignedShort, gl::UNSIGNED_SHORT, Caps::empty()),
    (ElementFormat::UnsignedInt, gl::UNSIGNED_INT, Caps::ELEMENT_INDEX_UINT),
];

/// Driver type of index buffer elements
///
/// Only unsigned types index vertices; 32-bit indices need
/// [`Caps::ELEMENT_INDEX_UINT`].
pub fn index_type(format: ElementFormat, caps: &CapabilitySet) -> RenderResult<GlEnum> {
    let (_, ty, requires) = INDEX_FORMAT_TABLE
        .iter()
        .find(|(f, _, _)| *f == format)
        .ok_or_else(|| RenderError::unsupported_format(format!("{format:?} indices are not supported")))?;
    if !caps.has(*requires) {
        return Err(RenderError::unsupported_format(format!("{format:?} indices require {requires:?}")));
    }
    Ok(*ty)
}

/// Buffer update frequency hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Usage {
    /// Uploaded once
    #[default]
    Static,
    /// Updated now and then
    Dynamic,
    /// Updated every frame
    Stream,
    /// Never uploaded
    CpuOnly,
}

impl Usage {
    /// Every variant
    pub const ALL: [Self; 4] = [Self::Static, Self::Dynamic, Self::Stream, Self::CpuOnly];
}

const USAGE_TABLE: &[(Usage, GlEnum)] = &[
    (Usage::Static, gl::STATIC_DRAW),
    (Usage::Dynamic, gl::DYNAMIC_DRAW),
    (Usage::Stream, gl::STREAM_DRAW),
];

/// Driver usage hint
pub fn usage_hint(usage: Usage) -> RenderResult<GlEnum> {
    lookup(USAGE_TABLE, usage, "buffer usage")
}

/// Texture binding kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TextureKind {
    /// Single 2D image
    #[default]
    TwoDimensional,
    /// Six square faces
    CubeMap,
}

impl TextureKind {
    /// Every variant
    pub const ALL: [Self; 2] = [Self::TwoDimensional, Self::CubeMap];
}

const TEXTURE_KIND_TABLE: &[(TextureKind, GlEnum)] = &[
    (TextureKind::TwoDimensional, gl::TEXTURE_2D),
    (TextureKind::CubeMap, gl::TEXTURE_CUBE_MAP),
];

/// Driver binding target
pub fn texture_target(kind: TextureKind) -> RenderResult<GlEnum> {
    lookup(TEXTURE_KIND_TABLE, kind, "texture kind")
}

/// Minification filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MinFilter {
    /// Nearest texel, base level only
    NearestNoMipMaps,
    /// Bilinear, base level only
    BilinearNoMipMaps,
    /// Nearest texel of the nearest level
    NearestNearestMipMap,
    /// Bilinear within the nearest level
    BilinearNearestMipMap,
    /// Nearest texel, blended between levels
    NearestLinearMipMap,
    /// Bilinear, blended between levels
    #[default]
    Trilinear,
}

impl MinFilter {
    /// Every variant
    pub const ALL: [Self; 6] = [
        Self::NearestNoMipMaps,
        Self::BilinearNoMipMaps,
        Self::NearestNearestMipMap,
        Self::BilinearNearestMipMap,
        Self::NearestLinearMipMap,
        Self::Trilinear,
    ];

    /// Whether sampling reads mip levels
    pub const fn uses_mipmaps(self) -> bool {
        !matches!(self, Self::NearestNoMipMaps | Self::BilinearNoMipMaps)
    }
}

/// Magnification filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MagFilter {
    /// Nearest texel
    Nearest,
    /// Bilinear
    #[default]
    Bilinear,
}

impl MagFilter {
    /// Every variant
    pub const ALL: [Self; 2] = [Self::Nearest, Self::Bilinear];
}

/// Texture coordinate wrapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WrapMode {
    /// Tile
    Repeat,
    /// Tile, mirroring every other repetition
    MirroredRepeat,
    /// Clamp to the edge texel
    #[default]
    EdgeClamp,
}

impl WrapMode {
    /// Every variant
    pub const ALL: [Self; 3] = [Self::Repeat, Self::MirroredRepeat, Self::EdgeClamp];
}

const MIN_FILTER_TABLE: &[(MinFilter, GlEnum)] = &[
    (MinFilter::NearestNoMipMaps, gl::NEAREST),
    (MinFilter::BilinearNoMipMaps, gl::LINEAR),
    (MinFilter::NearestNearestMipMap, gl::NEAREST_MIPMAP_NEAREST),
    (MinFilter::BilinearNearestMipMap, gl::LINEAR_MIPMAP_NEAREST),
    (MinFilter::NearestLinearMipMap, gl::NEAREST_MIPMAP_LINEAR),
    (MinFilter::Trilinear, gl::LINEAR_MIPMAP_LINEAR),
];

const MAG_FILTER_TABLE: &[(MagFilter, GlEnum)] = &[
    (MagFilter::Nearest, gl::NEAREST),
    (MagFilter::Bilinear, gl::LINEAR),
];

const WRAP_MODE_TABLE: &[(WrapMode, GlEnum)] = &[
    (WrapMode::Repeat, gl::REPEAT),
    (WrapMode::MirroredRepeat, gl::MIRRORED_REPEAT),
    (WrapMode::EdgeClamp, gl::CLAMP_TO_EDGE),
];

/// Driver minification filter
pub fn min_filter(filter: MinFilter) -> RenderResult<GlEnum> {
    lookup(MIN_FILTER_TABLE, filter, "min filter")
}

/// Driver magnification filter
pub fn mag_filter(filter: MagFilter) -> RenderResult<GlEnum> {
    lookup(MAG_FILTER_TABLE, filter, "mag filter")
}

/// Driver wrap mode
pub fn wrap_mode(mode: WrapMode) -> RenderResult<GlEnum> {
    lookup(WRAP_MODE_TABLE, mode, "wrap mode")
}

pub(crate) fn lookup<K: PartialEq + Copy + std::fmt::Debug, V: Copy>(
    table: &[(K, V)],
    key: K,
    what: &str,
) -> RenderResult<V> {
    table
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| *v)
        .ok_or_else(|| RenderError::invalid_state(format!("no driver constant for {what} {key:?}")))
}

/// Check that every portable enum reaching the driver has a mapping
///
/// `ElementFormat::Double`, `Usage::CpuOnly` and pixel formats are left out:
/// their absence is a supported answer, not a broken table.
pub fn validate_tables() -> RenderResult<()> {
    for format in ElementFormat::ALL {
        if format != ElementFormat::Double && !ELEMENT_FORMAT_TABLE.iter().any(|(f, _, _)| *f == format) {
            return Err(RenderError::invalid_state(format!("no driver type for element format {format:?}")));
        }
    }
    for usage in Usage::ALL {
        if usage != Usage::CpuOnly {
            usage_hint(usage)?;
        }
    }
    for kind in TextureKind::ALL {
        texture_target(kind)?;
    }
    for filter in MinFilter::ALL {
        min_filter(filter)?;
    }
    for filter in MagFilter::ALL {
        mag_filter(filter)?;
    }
    for mode in WrapMode::ALL {
        wrap_mode(mode)?;
    }
    Ok(())
}

/// Upload every mip level of one data unit of `image` to `target`
///
/// `unit` selects the data unit: always 0 for 2D images, the face index for
/// cube maps. An image without data units allocates storage only.
pub fn upload_image_unit<D: GraphicsDriver + ?Sized>(
    driver: &mut D,
    ctx: &mut RenderContext,
    caps: &CapabilitySet,
    image: &Image,
    target: GlEnum,
    unit: usize,
) -> RenderResult<()> {
    let encoding = translate(image.format(), caps)?;
    let data = image.data(unit);

    if data.is_some() {
        state::set_unpack_alignment(driver, ctx, 1);
    }

    let level_sizes: Vec<usize> = match image.mip_sizes() {
        Some(sizes) => sizes.to_vec(),
        None => vec![image.format().level_size(image.width(), image.height(), 0)],
    };

    let mut position = 0;
    for (level, size) in level_sizes.iter().enumerate() {
        let width = (image.width() >> level).max(1) as i32;
        let height = (image.height() >> level).max(1) as i32;

        let pixels = match data {
            Some(bytes) => {
                let end = position + size;
                let slice = bytes.get(position..end).ok_or_else(|| {
                    RenderError::invalid_state(format!(
                        "mip level {level} needs bytes {position}..{end} but the image holds {}",
                        bytes.len()
                    ))
                })?;
                Some(slice)
            }
            None => None,
        };

        if encoding.compressed {
            let pixels = pixels.ok_or_else(|| {
                RenderError::invalid_state(format!("compressed {:?} image has no data", image.format()))
            })?;
            driver.compressed_tex_image_2d(target, level as i32, encoding.format, width, height, pixels);
        } else {
            driver.tex_image_2d(
                target,
                level as i32,
                encoding.internal_format as i32,
                width,
                height,
                encoding.format,
                encoding.data_type,
                pixels,
            );
        }
        position += size;
    }

    Ok(())
}

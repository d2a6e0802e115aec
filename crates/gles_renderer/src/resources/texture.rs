//! Texture images and the samplers that reference them

use crate::caps::{Caps, CapabilitySet, UploadStrategy};
use crate::context::RenderContext;
use crate::driver::{gl, GlEnum, GraphicsDriver};
use crate::error::{RenderError, RenderResult};
use crate::format::{self, MagFilter, MinFilter, PixelFormat, TextureKind, WrapMode};
use crate::foundation::collections::ImageKey;
use crate::stats::Statistics;

/// Sampler parameters last applied to a texture object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerParams {
    /// Minification filter
    pub min_filter: MinFilter,
    /// Magnification filter
    pub mag_filter: MagFilter,
    /// Horizontal wrap
    pub wrap_s: WrapMode,
    /// Vertical wrap
    pub wrap_t: WrapMode,
}

/// Pixel data destined for one texture object
///
/// Holds one data unit for 2D images and six (+X, -X, +Y, -Y, +Z, -Z) for
/// cube maps. Each unit contains every mip level back to back; `mip_sizes`
/// gives the byte size of each level when the chain is precomputed.
#[derive(Debug, Clone)]
pub struct Image {
    format: PixelFormat,
    width: u32,
    height: u32,
    data: Vec<Vec<u8>>,
    mip_sizes: Option<Vec<usize>>,

    pub(crate) handle: Option<u32>,
    pub(crate) update_needed: bool,
    pub(crate) mipmaps_generated: bool,
    pub(crate) sampler: Option<SamplerParams>,
}

impl Image {
    fn with_units(
        format: PixelFormat,
        width: u32,
        height: u32,
        data: Vec<Vec<u8>>,
        mip_sizes: Option<Vec<usize>>,
    ) -> Self {
        Self {
            format,
            width,
            height,
            data,
            mip_sizes,
            handle: None,
            update_needed: true,
            mipmaps_generated: false,
            sampler: None,
        }
    }

    /// 2D image with a single level
    pub fn new(format: PixelFormat, width: u32, height: u32, data: Vec<u8>) -> Self {
        Self::with_units(format, width, height, vec![data], None)
    }

    /// 2D image with a precomputed mip chain
    pub fn with_mipmaps(
        format: PixelFormat,
        width: u32,
        height: u32,
        data: Vec<u8>,
        mip_sizes: Vec<usize>,
    ) -> Self {
        Self::with_units(format, width, height, vec![data], Some(mip_sizes))
    }

    /// Cube map from its faces
    pub fn cube_map(format: PixelFormat, size: u32, faces: Vec<Vec<u8>>) -> Self {
        Self::with_units(format, size, size, faces, None)
    }

    /// Storage without data, e.g. a render target
    pub fn storage(format: PixelFormat, width: u32, height: u32) -> Self {
        Self::with_units(format, width, height, Vec::new(), None)
    }

    /// RGBA8 image from a decoded `image` buffer
    ///
    /// Rows are flipped so the first row in memory is the bottom of the image.
    pub fn from_rgba8(source: &image::RgbaImage) -> Self {
        let flipped = image::imageops::flip_vertical(source);
        Self::new(PixelFormat::RGBA8, flipped.width(), flipped.height(), flipped.into_raw())
    }

    /// Replace the pixel data of a 2D image; the next use uploads it
    pub fn set_data(&mut self, data: Vec<u8>) {
        self.data = vec![data];
        self.mip_sizes = None;
        self.update_needed = true;
    }

    /// Replace the data units and mip layout; the next use uploads them
    pub fn set_units(&mut self, data: Vec<Vec<u8>>, mip_sizes: Option<Vec<usize>>) {
        self.data = data;
        self.mip_sizes = mip_sizes;
        self.update_needed = true;
    }

    /// Pixel format
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Width of level 0
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height of level 0
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes of data unit `unit`
    pub fn data(&self, unit: usize) -> Option<&[u8]> {
        self.data.get(unit).map(Vec::as_slice)
    }

    /// Number of data units
    pub fn unit_count(&self) -> usize {
        self.data.len()
    }

    /// Precomputed mip level sizes
    pub fn mip_sizes(&self) -> Option<&[usize]> {
        self.mip_sizes.as_deref()
    }

    /// Whether the data carries more than the base level
    pub fn has_mipmaps(&self) -> bool {
        self.mip_sizes.as_ref().is_some_and(|sizes| sizes.len() > 1)
    }

    /// Driver object, `None` until first upload
    pub fn handle(&self) -> Option<u32> {
        self.handle
    }

    /// Whether the data changed since the last upload
    pub fn is_update_needed(&self) -> bool {
        self.update_needed
    }
}

/// How a shader samples an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Texture {
    /// Sampled image
    pub image: ImageKey,
    /// Binding kind
    pub kind: TextureKind,
    /// Minification filter
    pub min_filter: MinFilter,
    /// Magnification filter
    pub mag_filter: MagFilter,
    /// Horizontal wrap
    pub wrap_s: WrapMode,
    /// Vertical wrap
    pub wrap_t: WrapMode,
}

impl Texture {
    /// 2D texture with trilinear filtering and edge clamping
    pub fn new(image: ImageKey) -> Self {
        Self {
            image,
            kind: TextureKind::TwoDimensional,
            min_filter: MinFilter::default(),
            mag_filter: MagFilter::default(),
            wrap_s: WrapMode::default(),
            wrap_t: WrapMode::default(),
        }
    }

    /// Cube map texture
    pub fn cube_map(image: ImageKey) -> Self {
        Self { kind: TextureKind::CubeMap, ..Self::new(image) }
    }

    /// Set both filters
    pub fn with_filters(mut self, min_filter: MinFilter, mag_filter: MagFilter) -> Self {
        self.min_filter = min_filter;
        self.mag_filter = mag_filter;
        self
    }

    /// Set both wrap modes
    pub fn with_wrap(mut self, wrap: WrapMode) -> Self {
        self.wrap_s = wrap;
        self.wrap_t = wrap;
        self
    }

    /// Sampler parameters of this texture
    pub fn sampler(&self) -> SamplerParams {
        SamplerParams {
            min_filter: self.min_filter,
            mag_filter: self.mag_filter,
            wrap_s: self.wrap_s,
            wrap_t: self.wrap_t,
        }
    }
}

/// Make `unit` active and bind `texture` on it unless the cache says so already
pub fn bind_texture<D: GraphicsDriver + ?Sized>(
    driver: &mut D,
    ctx: &mut RenderContext,
    stats: &mut Statistics,
    unit: u32,
    target: GlEnum,
    texture: u32,
) -> RenderResult<()> {
    if unit >= ctx.texture_unit_count() {
        return Err(RenderError::invalid_state(format!(
            "texture unit {unit} exceeds the {} available units",
            ctx.texture_unit_count()
        )));
    }
    if ctx.active_texture_unit != unit {
        driver.active_texture(gl::TEXTURE0 + unit);
        ctx.active_texture_unit = unit;
    }
    let bound = &mut ctx.bound_textures[unit as usize];
    if *bound != Some(texture) {
        driver.bind_texture(target, Some(texture));
        *bound = Some(texture);
        stats.texture_binds += 1;
    }
    Ok(())
}

fn check_dimensions(image: &Image, kind: TextureKind, caps: &CapabilitySet) -> RenderResult<()> {
    let cube = kind == TextureKind::CubeMap;
    let max = caps.max_dimension(cube);
    if image.width > max || image.height > max {
        return Err(RenderError::unsupported_format(format!(
            "{}x{} {} exceeds the maximum size {}",
            image.width,
            image.height,
            if cube { "cube map" } else { "texture" },
            max
        )));
    }
    if !caps.has(Caps::NON_POWER_OF_TWO) && !(image.width.is_power_of_two() && image.height.is_power_of_two()) {
        return Err(RenderError::unsupported_format(format!(
            "{}x{} is not a power of two and the driver lacks NON_POWER_OF_TWO",
            image.width, image.height
        )));
    }
    if cube && image.data.len() != 6 {
        return Err(RenderError::unsupported_format(format!(
            "cube map needs 6 faces, got {}",
            image.data.len()
        )));
    }
    Ok(())
}

/// Allocate, bind on `unit` and upload `image` as needed; returns its driver object
///
/// When `needs_mipmaps` is set and the image carries no mip chain, the driver
/// generates one once after the upload. Compressed images cannot be
/// regenerated and are sampled from the base level only.
pub fn ensure_image_current<D: GraphicsDriver + ?Sized>(
    driver: &mut D,
    ctx: &mut RenderContext,
    caps: &CapabilitySet,
    strategy: UploadStrategy,
    stats: &mut Statistics,
    image: &mut Image,
    kind: TextureKind,
    unit: u32,
    needs_mipmaps: bool,
) -> RenderResult<u32> {
    check_dimensions(image, kind, caps)?;
    let target = format::texture_target(kind)?;

    let (handle, created) = match image.handle {
        Some(handle) => (handle, false),
        None => {
            let handle = driver
                .create_texture()
                .map_err(|e| RenderError::ResourceCreationFailed(format!("texture: {e}")))?;
            log::debug!("Created {:?} texture {} ({}x{})", image.format, handle, image.width, image.height);
            image.handle = Some(handle);
            image.sampler = None;
            stats.textures += 1;
            (handle, true)
        }
    };

    bind_texture(driver, ctx, stats, unit, target, handle)?;

    if created || image.update_needed {
        if kind == TextureKind::CubeMap {
            for face in 0..6 {
                format::upload_image_unit(
                    driver,
                    ctx,
                    caps,
                    image,
                    gl::TEXTURE_CUBE_MAP_POSITIVE_X + face as u32,
                    face,
                )?;
            }
        } else {
            format::upload_image_unit(driver, ctx, caps, image, gl::TEXTURE_2D, 0)?;
        }
        image.update_needed = false;
        image.mipmaps_generated = false;
    }

    if needs_mipmaps && !image.has_mipmaps() && !image.mipmaps_generated {
        if image.format.is_compressed() {
            log::warn!(
                "Cannot generate mipmaps for compressed {:?} texture {}, sampling base level only",
                image.format,
                handle
            );
        } else if strategy.hardware_mipmaps {
            driver.generate_mipmap(target);
        } else {
            log::warn!("Hardware mipmap generation is disabled, texture {} has a single level", handle);
        }
        image.mipmaps_generated = true;
    }

    Ok(handle)
}

/// Send the sampler parameters of `texture` that differ from the last ones applied
///
/// The image's texture object must be bound on the active unit.
pub fn apply_sampler<D: GraphicsDriver + ?Sized>(
    driver: &mut D,
    image: &mut Image,
    texture: &Texture,
) -> RenderResult<()> {
    let target = format::texture_target(texture.kind)?;
    let wanted = texture.sampler();
    let previous = image.sampler;

    if previous.map(|p| p.min_filter) != Some(wanted.min_filter) {
        driver.tex_parameter_i32(target, gl::TEXTURE_MIN_FILTER, format::min_filter(wanted.min_filter)? as i32);
    }
    if previous.map(|p| p.mag_filter) != Some(wanted.mag_filter) {
        driver.tex_parameter_i32(target, gl::TEXTURE_MAG_FILTER, format::mag_filter(wanted.mag_filter)? as i32);
    }
    if previous.map(|p| p.wrap_s) != Some(wanted.wrap_s) {
        driver.tex_parameter_i32(target, gl::TEXTURE_WRAP_S, format::wrap_mode(wanted.wrap_s)? as i32);
    }
    if previous.map(|p| p.wrap_t) != Some(wanted.wrap_t) {
        driver.tex_parameter_i32(target, gl::TEXTURE_WRAP_T, format::wrap_mode(wanted.wrap_t)? as i32);
    }
    image.sampler = Some(wanted);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caps;
    use crate::config::RendererConfig;
    use crate::driver::{DriverCall, HeadlessDriver};
    use slotmap::KeyData;

    fn setup(extensions: &[&str]) -> (HeadlessDriver, RenderContext, CapabilitySet, UploadStrategy, Statistics) {
        let mut driver = HeadlessDriver::new().with_extensions(extensions);
        let config = RendererConfig::default();
        let caps = caps::detect(&mut driver, &config).unwrap();
        let strategy = UploadStrategy::new(&caps, &config);
        (driver, RenderContext::default(), caps, strategy, Statistics::default())
    }

    #[test]
    fn test_npot_rejected_without_capability() {
        let (mut driver, mut ctx, caps, strategy, mut stats) = setup(&[]);
        let mut image = Image::new(PixelFormat::RGBA8, 3, 4, vec![0; 48]);

        let result = ensure_image_current(
            &mut driver, &mut ctx, &caps, strategy, &mut stats, &mut image,
            TextureKind::TwoDimensional, 0, false,
        );
        assert!(matches!(result, Err(RenderError::UnsupportedFormat(_))));
        assert_eq!(image.handle(), None);
    }

    #[test]
    fn test_npot_accepted_with_capability() {
        let (mut driver, mut ctx, caps, strategy, mut stats) = setup(&["GL_OES_texture_npot"]);
        let mut image = Image::new(PixelFormat::RGBA8, 3, 4, vec![0; 48]);

        let handle = ensure_image_current(
            &mut driver, &mut ctx, &caps, strategy, &mut stats, &mut image,
            TextureKind::TwoDimensional, 0, false,
        )
        .unwrap();
        assert_eq!(image.handle(), Some(handle));
        assert!(!image.is_update_needed());
    }

    #[test]
    fn test_oversized_cube_map_rejected() {
        let (mut driver, mut ctx, caps, strategy, mut stats) = setup(&[]);
        let mut image = Image::cube_map(PixelFormat::RGBA8, 2048, vec![Vec::new(); 6]);

        let result = ensure_image_current(
            &mut driver, &mut ctx, &caps, strategy, &mut stats, &mut image,
            TextureKind::CubeMap, 0, false,
        );
        assert!(matches!(result, Err(RenderError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_mipmaps_generated_once() {
        let (mut driver, mut ctx, caps, strategy, mut stats) = setup(&[]);
        let mut image = Image::new(PixelFormat::RGBA8, 4, 4, vec![0; 64]);

        for _ in 0..2 {
            ensure_image_current(
                &mut driver, &mut ctx, &caps, strategy, &mut stats, &mut image,
                TextureKind::TwoDimensional, 0, true,
            )
            .unwrap();
        }
        assert_eq!(driver.count_calls(|c| matches!(c, DriverCall::GenerateMipmap(_))), 1);
        assert_eq!(driver.count_calls(|c| matches!(c, DriverCall::TexImage2D { .. })), 1);
    }

    #[test]
    fn test_precomputed_mip_chain_not_regenerated() {
        let (mut driver, mut ctx, caps, strategy, mut stats) = setup(&[]);
        let mut image = Image::with_mipmaps(PixelFormat::RGBA8, 4, 4, vec![0; 64 + 16 + 4], vec![64, 16, 4]);

        ensure_image_current(
            &mut driver, &mut ctx, &caps, strategy, &mut stats, &mut image,
            TextureKind::TwoDimensional, 0, MinFilter::Trilinear.uses_mipmaps(),
        )
        .unwrap();
        assert_eq!(driver.count_calls(|c| matches!(c, DriverCall::GenerateMipmap(_))), 0);
        assert_eq!(driver.count_calls(|c| matches!(c, DriverCall::TexImage2D { .. })), 3);
    }

    #[test]
    fn test_failed_creation_leaves_image_unbound() {
        let (mut driver, mut ctx, caps, strategy, mut stats) = setup(&[]);
        let mut image = Image::new(PixelFormat::RGBA8, 4, 4, vec![0; 64]);
        driver.fail_object_creation(true);

        let result = ensure_image_current(
            &mut driver, &mut ctx, &caps, strategy, &mut stats, &mut image,
            TextureKind::TwoDimensional, 0, false,
        );
        assert!(matches!(result, Err(RenderError::ResourceCreationFailed(_))));
        assert_eq!(image.handle(), None);
        assert!(image.is_update_needed());
        assert_eq!(stats.textures, 0);

        driver.fail_object_creation(false);
        ensure_image_current(
            &mut driver, &mut ctx, &caps, strategy, &mut stats, &mut image,
            TextureKind::TwoDimensional, 0, false,
        )
        .unwrap();
        assert!(image.handle().is_some());
    }

    #[test]
    fn test_compressed_mipmap_generation_skipped() {
        let (mut driver, mut ctx, caps, strategy, mut stats) = setup(&["GL_OES_compressed_ETC1_RGB8_texture"]);
        let mut image = Image::new(PixelFormat::ETC1, 4, 4, vec![0; 8]);

        ensure_image_current(
            &mut driver, &mut ctx, &caps, strategy, &mut stats, &mut image,
            TextureKind::TwoDimensional, 0, true,
        )
        .unwrap();
        assert_eq!(driver.count_calls(|c| matches!(c, DriverCall::GenerateMipmap(_))), 0);
        assert_eq!(driver.count_calls(|c| matches!(c, DriverCall::CompressedTexImage2D { .. })), 1);
    }

    #[test]
    fn test_sampler_params_applied_once() {
        let mut driver = HeadlessDriver::new();
        let mut image = Image::new(PixelFormat::RGBA8, 4, 4, vec![0; 64]);
        let texture = Texture::new(ImageKey::from(KeyData::from_ffi(1))).with_wrap(WrapMode::Repeat);

        apply_sampler(&mut driver, &mut image, &texture).unwrap();
        assert_eq!(driver.count_calls(|c| matches!(c, DriverCall::TexParameter(..))), 4);

        driver.clear_calls();
        apply_sampler(&mut driver, &mut image, &texture).unwrap();
        assert!(driver.calls().is_empty());

        let nearest = texture.with_filters(MinFilter::NearestNoMipMaps, MagFilter::Bilinear);
        apply_sampler(&mut driver, &mut image, &nearest).unwrap();
        assert_eq!(
            driver.calls(),
            &[DriverCall::TexParameter(gl::TEXTURE_2D, gl::TEXTURE_MIN_FILTER, gl::NEAREST as i32)]
        );
    }

    #[test]
    fn test_from_rgba8_flips_rows() {
        let mut source = image::RgbaImage::new(1, 2);
        source.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
        source.put_pixel(0, 1, image::Rgba([0, 0, 255, 255]));

        let image = Image::from_rgba8(&source);
        assert_eq!(image.data(0).unwrap(), &[0, 0, 255, 255, 255, 0, 0, 255]);
    }
}

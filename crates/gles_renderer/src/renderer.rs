//! Renderer facade
//!
//! [`Renderer`] owns the driver, the context cache, the resource arenas and
//! the detected capabilities. Every public call runs synchronously on the
//! thread that owns the driver context; there is no internal locking.

use bitflags::bitflags;

use crate::caps::{self, CapabilitySet, UploadStrategy};
use crate::config::{Config, RendererConfig};
use crate::context::{Rect, RenderContext};
use crate::draw::{self, Mesh};
use crate::driver::{gl, GlEnum, GraphicsDriver};
use crate::error::{RenderError, RenderResult};
use crate::format;
use crate::foundation::collections::{BufferKey, ImageKey, ProgramKey};
use crate::foundation::math::ColorRgba;
use crate::resources::{apply_sampler, ensure_image_current, Image, ResourceManager, Texture, VertexBuffer};
use crate::shader::{self, ShaderProgram};
use crate::state::{self, RenderState};
use crate::stats::Statistics;

bitflags! {
    /// Buffers cleared by [`Renderer::clear_buffers`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClearFlags: GlEnum {
        /// Color buffer
        const COLOR = gl::COLOR_BUFFER_BIT;
        /// Depth buffer
        const DEPTH = gl::DEPTH_BUFFER_BIT;
        /// Stencil buffer
        const STENCIL = gl::STENCIL_BUFFER_BIT;
    }
}

/// Off-screen render target descriptor
///
/// Only the default framebuffer is implemented; passing one of these where a
/// target is accepted fails with [`RenderError::UnsupportedOperation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameBuffer {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl FrameBuffer {
    /// Describe a target of the given size
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

fn not_initialized() -> RenderError {
    RenderError::invalid_state("renderer used before initialize()")
}

/// Rendering layer over a [`GraphicsDriver`]
pub struct Renderer<D: GraphicsDriver> {
    driver: D,
    config: RendererConfig,
    ctx: RenderContext,
    caps: Option<CapabilitySet>,
    strategy: UploadStrategy,
    resources: ResourceManager,
    stats: Statistics,
    bound_shader: Option<ProgramKey>,
}

impl<D: GraphicsDriver> Renderer<D> {
    /// Wrap `driver`; call [`Renderer::initialize`] before anything else
    pub fn new(driver: D, config: RendererConfig) -> Self {
        Self {
            driver,
            ctx: RenderContext::new(config.max_texture_units, config.max_vertex_attribs),
            config,
            caps: None,
            strategy: UploadStrategy { hardware_mipmaps: false },
            resources: ResourceManager::new(),
            stats: Statistics::default(),
            bound_shader: None,
        }
    }

    /// Wrap `driver` with configuration read from a `.toml` or `.ron` file
    pub fn from_config_file(driver: D, path: &str) -> RenderResult<Self> {
        let config = RendererConfig::load_from_file(path)?;
        Ok(Self::new(driver, config))
    }

    /// Detect capabilities and put the driver into the default state
    pub fn initialize(&mut self) -> RenderResult<()> {
        let caps = caps::detect(&mut self.driver, &self.config)?;

        state::validate_tables()?;
        format::validate_tables()?;
        shader::validate_tables()?;
        draw::validate_tables()?;

        self.strategy = UploadStrategy::new(&caps, &self.config);
        self.ctx = RenderContext::new(caps.limits.texture_units, caps.limits.vertex_attribs);
        log::info!(
            "Renderer initialized: {} texture units, {} vertex attributes, hardware mipmaps {}",
            caps.limits.texture_units,
            caps.limits.vertex_attribs,
            if self.strategy.hardware_mipmaps { "on" } else { "off" }
        );
        self.caps = Some(caps);

        self.driver.disable(gl::DITHER);
        state::apply_render_state(&mut self.driver, &mut self.ctx, &RenderState::DEFAULT)
    }

    /// Forget every driver object after the context was lost
    ///
    /// Issues no driver calls. Resources are re-created on next use.
    pub fn reset_objects(&mut self) {
        self.resources.reset_objects();
        self.ctx.reset();
        self.stats.clear_memory();
        self.bound_shader = None;
    }

    /// Delete every driver object the renderer created
    pub fn cleanup(&mut self) {
        log::info!("Deleting GPU objects");
        self.resources.delete_all(&mut self.driver, &mut self.ctx, &mut self.stats);
        self.ctx.reset();
        self.bound_shader = None;
    }

    /// Drop the context cache after the driver state was changed behind our back
    pub fn invalidate_state(&mut self) {
        self.ctx.reset();
        self.bound_shader = None;
    }

    /// Bring the fixed-function state in line with `state`
    pub fn apply_render_state(&mut self, state: &RenderState) -> RenderResult<()> {
        state::apply_render_state(&mut self.driver, &mut self.ctx, state)
    }

    /// Set the viewport
    pub fn set_viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        state::set_viewport(&mut self.driver, &mut self.ctx, Rect::new(x, y, width, height));
    }

    /// Restrict rendering to a rectangle
    pub fn set_clip_rect(&mut self, x: i32, y: i32, width: i32, height: i32) {
        state::set_clip_rect(&mut self.driver, &mut self.ctx, Rect::new(x, y, width, height));
    }

    /// Stop restricting rendering
    pub fn clear_clip_rect(&mut self) {
        state::clear_clip_rect(&mut self.driver, &mut self.ctx);
    }

    /// Clear the selected buffers
    ///
    /// Depth writes are re-enabled first when the depth buffer is cleared,
    /// since a disabled depth mask also masks the clear.
    pub fn clear_buffers(&mut self, color: bool, depth: bool, stencil: bool) {
        let mut flags = ClearFlags::empty();
        flags.set(ClearFlags::COLOR, color);
        flags.set(ClearFlags::DEPTH, depth);
        flags.set(ClearFlags::STENCIL, stencil);
        if flags.is_empty() {
            return;
        }
        if depth && !self.ctx.depth_write {
            self.driver.depth_mask(true);
            self.ctx.depth_write = true;
        }
        self.driver.clear(flags.bits());
    }

    /// Color used to clear the color buffer
    pub fn set_background_color(&mut self, color: ColorRgba) {
        if self.ctx.clear_color != color {
            self.driver.clear_color(color.r, color.g, color.b, color.a);
            self.ctx.clear_color = color;
        }
    }

    /// Map normalized depth to `[near, far]`
    pub fn set_depth_range(&mut self, near: f32, far: f32) {
        if self.ctx.depth_range != (near, far) {
            self.driver.depth_range(near, far);
            self.ctx.depth_range = (near, far);
        }
    }

    /// Toggle alpha-to-coverage
    pub fn set_alpha_to_coverage(&mut self, enabled: bool) {
        if self.ctx.alpha_to_coverage != enabled {
            if enabled {
                self.driver.enable(gl::SAMPLE_ALPHA_TO_COVERAGE);
            } else {
                self.driver.disable(gl::SAMPLE_ALPHA_TO_COVERAGE);
            }
            self.ctx.alpha_to_coverage = enabled;
        }
    }

    /// Link `program` if needed, make it current and upload changed uniforms
    pub fn set_shader(&mut self, program: ProgramKey) -> RenderResult<()> {
        let Self { driver, config, ctx, caps, resources, stats, bound_shader, .. } = self;
        let caps = caps.as_ref().ok_or_else(not_initialized)?;

        let linked = resources.program_mut(program)?;
        let handle = shader::ensure_linked(driver, caps, config.validate_shaders, stats, linked)?;
        shader::bind_program(driver, ctx, stats, handle);
        shader::update_uniforms(driver, stats, linked)?;
        *bound_shader = Some(program);
        Ok(())
    }

    /// Upload the image of `texture` if needed and bind it on `unit`
    pub fn set_texture(&mut self, unit: u32, texture: &Texture) -> RenderResult<()> {
        let Self { driver, ctx, caps, strategy, resources, stats, .. } = self;
        let caps = caps.as_ref().ok_or_else(not_initialized)?;

        let image = resources.image_mut(texture.image)?;
        ensure_image_current(
            driver,
            ctx,
            caps,
            *strategy,
            stats,
            image,
            texture.kind,
            unit,
            texture.min_filter.uses_mipmaps(),
        )?;
        apply_sampler(driver, image, texture)?;
        ctx.texture_units.move_to_new(unit);
        Ok(())
    }

    /// Draw `mesh` with the current shader
    pub fn render_mesh(&mut self, mesh: &Mesh, lod: usize, instances: u32) -> RenderResult<()> {
        let Self { driver, ctx, caps, resources, stats, bound_shader, .. } = self;
        let caps = caps.as_ref().ok_or_else(not_initialized)?;
        let program = bound_shader.ok_or_else(|| RenderError::invalid_state("render_mesh called without a shader"))?;
        draw::render_mesh(driver, ctx, caps, stats, resources, program, mesh, lod, instances)
    }

    /// Add an image; it is uploaded on first use
    pub fn create_image(&mut self, image: Image) -> ImageKey {
        self.resources.insert_image(image)
    }

    /// Look up an image
    pub fn image(&self, key: ImageKey) -> RenderResult<&Image> {
        self.resources.image(key)
    }

    /// Look up an image for modification
    pub fn image_mut(&mut self, key: ImageKey) -> RenderResult<&mut Image> {
        self.resources.image_mut(key)
    }

    /// Queue an image for deletion at the next [`Renderer::on_frame`]
    pub fn release_image(&mut self, key: ImageKey) -> RenderResult<()> {
        self.resources.release_image(key)
    }

    /// Add a vertex or index buffer; it is uploaded on first use
    pub fn create_buffer(&mut self, buffer: VertexBuffer) -> BufferKey {
        self.resources.insert_buffer(buffer)
    }

    /// Look up a buffer
    pub fn buffer(&self, key: BufferKey) -> RenderResult<&VertexBuffer> {
        self.resources.buffer(key)
    }

    /// Look up a buffer for modification
    pub fn buffer_mut(&mut self, key: BufferKey) -> RenderResult<&mut VertexBuffer> {
        self.resources.buffer_mut(key)
    }

    /// Queue a buffer for deletion at the next [`Renderer::on_frame`]
    pub fn release_buffer(&mut self, key: BufferKey) -> RenderResult<()> {
        self.resources.release_buffer(key)
    }

    /// Add a shader program; it is compiled and linked on first use
    pub fn create_program(&mut self, program: ShaderProgram) -> ProgramKey {
        self.resources.insert_program(program)
    }

    /// Look up a program
    pub fn program(&self, key: ProgramKey) -> RenderResult<&ShaderProgram> {
        self.resources.program(key)
    }

    /// Look up a program for modification
    pub fn program_mut(&mut self, key: ProgramKey) -> RenderResult<&mut ShaderProgram> {
        self.resources.program_mut(key)
    }

    /// Queue a program for deletion at the next [`Renderer::on_frame`]
    pub fn release_program(&mut self, key: ProgramKey) -> RenderResult<()> {
        self.resources.release_program(key)
    }

    /// Render into `frame_buffer`; only the default framebuffer is available
    pub fn set_frame_buffer(&mut self, frame_buffer: Option<&FrameBuffer>) -> RenderResult<()> {
        match frame_buffer {
            None => Ok(()),
            Some(fb) => Err(RenderError::UnsupportedOperation(format!(
                "{}x{} off-screen frame buffer",
                fb.width, fb.height
            ))),
        }
    }

    /// Blit between frame buffers
    pub fn copy_frame_buffer(
        &mut self,
        _source: Option<&FrameBuffer>,
        _destination: Option<&FrameBuffer>,
    ) -> RenderResult<()> {
        Err(RenderError::UnsupportedOperation("frame buffer copy".to_string()))
    }

    /// Read the viewport of the default framebuffer as RGBA8
    ///
    /// Rows are written bottom-up. `out` must hold at least
    /// `width * height * 4` bytes.
    pub fn read_frame_buffer(&mut self, frame_buffer: Option<&FrameBuffer>, out: &mut [u8]) -> RenderResult<()> {
        if let Some(fb) = frame_buffer {
            return Err(RenderError::UnsupportedOperation(format!(
                "reading a {}x{} off-screen frame buffer",
                fb.width, fb.height
            )));
        }
        let viewport = self.ctx.viewport;
        let needed = viewport.width.max(0) as usize * viewport.height.max(0) as usize * 4;
        if out.len() < needed {
            return Err(RenderError::invalid_state(format!(
                "readback needs {needed} bytes for a {}x{} viewport, buffer holds {}",
                viewport.width,
                viewport.height,
                out.len()
            )));
        }
        self.driver.read_pixels(
            viewport.x,
            viewport.y,
            viewport.width,
            viewport.height,
            gl::RGBA,
            gl::UNSIGNED_BYTE,
            &mut out[..needed],
        );
        Ok(())
    }

    /// Read the viewport of the default framebuffer as a top-down image
    pub fn read_frame_buffer_image(&mut self) -> RenderResult<image::RgbaImage> {
        let viewport = self.ctx.viewport;
        let (width, height) = (viewport.width.max(0) as u32, viewport.height.max(0) as u32);
        let mut pixels = vec![0; width as usize * height as usize * 4];
        self.read_frame_buffer(None, &mut pixels)?;
        let image = image::RgbaImage::from_raw(width, height, pixels)
            .ok_or_else(|| RenderError::invalid_state("readback size mismatch"))?;
        Ok(image::imageops::flip_vertical(&image))
    }

    /// Frame boundary: surface driver errors, then delete released resources
    pub fn on_frame(&mut self) -> RenderResult<()> {
        let code = self.driver.get_error();
        if code != gl::NO_ERROR {
            log::error!("Driver reported {} (0x{:04X})", gl::error_name(code), code);
            return Err(RenderError::DriverError { code, name: gl::error_name(code) });
        }

        self.resources.collect_unused(&mut self.driver, &mut self.ctx, &mut self.stats);
        if let Some(key) = self.bound_shader {
            if self.resources.program(key).is_err() {
                self.bound_shader = None;
            }
        }
        self.stats.end_frame();
        Ok(())
    }

    /// Counters
    pub fn statistics(&self) -> &Statistics {
        &self.stats
    }

    /// Detected capabilities, `None` before initialization
    pub fn capabilities(&self) -> Option<&CapabilitySet> {
        self.caps.as_ref()
    }

    /// Context cache
    pub fn context(&self) -> &RenderContext {
        &self.ctx
    }

    /// Active configuration
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Underlying driver
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Underlying driver for direct access
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }
}

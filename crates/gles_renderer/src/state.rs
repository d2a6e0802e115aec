//! Fixed-function render state and its diffing against the context cache

use serde::{Deserialize, Serialize};

use crate::context::{Rect, RenderContext};
use crate::driver::{gl, GlEnum, GraphicsDriver};
use crate::error::RenderResult;
use crate::format;

/// Which faces are culled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FaceCullMode {
    /// No culling
    Off,
    /// Cull front faces
    Front,
    /// Cull back faces
    #[default]
    Back,
    /// Cull everything
    FrontAndBack,
}

impl FaceCullMode {
    /// Every variant
    pub const ALL: [Self; 4] = [Self::Off, Self::Front, Self::Back, Self::FrontAndBack];
}

/// How fragments combine with the framebuffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BlendMode {
    /// Replace
    #[default]
    Off,
    /// `src + dst`
    Additive,
    /// `src * src.a + dst`
    AlphaAdditive,
    /// `src + dst * (1 - src)`
    Color,
    /// Classic alpha blending
    Alpha,
    /// Alpha blending with premultiplied source
    PremultAlpha,
    /// `src * dst`
    Modulate,
    /// `2 * src * dst`
    ModulateX2,
}

impl BlendMode {
    /// Every variant
    pub const ALL: [Self; 8] = [
        Self::Off,
        Self::Additive,
        Self::AlphaAdditive,
        Self::Color,
        Self::Alpha,
        Self::PremultAlpha,
        Self::Modulate,
        Self::ModulateX2,
    ];
}

const CULL_FACE_TABLE: &[(FaceCullMode, GlEnum)] = &[
    (FaceCullMode::Front, gl::FRONT),
    (FaceCullMode::Back, gl::BACK),
    (FaceCullMode::FrontAndBack, gl::FRONT_AND_BACK),
];

const BLEND_FUNC_TABLE: &[(BlendMode, (GlEnum, GlEnum))] = &[
    (BlendMode::Additive, (gl::ONE, gl::ONE)),
    (BlendMode::AlphaAdditive, (gl::SRC_ALPHA, gl::ONE)),
    (BlendMode::Color, (gl::ONE, gl::ONE_MINUS_SRC_COLOR)),
    (BlendMode::Alpha, (gl::SRC_ALPHA, gl::ONE_MINUS_SRC_ALPHA)),
    (BlendMode::PremultAlpha, (gl::ONE, gl::ONE_MINUS_SRC_ALPHA)),
    (BlendMode::Modulate, (gl::DST_COLOR, gl::ZERO)),
    (BlendMode::ModulateX2, (gl::DST_COLOR, gl::SRC_COLOR)),
];

fn cull_face_constant(mode: FaceCullMode) -> RenderResult<GlEnum> {
    format::lookup(CULL_FACE_TABLE, mode, "cull mode")
}

fn blend_factors(mode: BlendMode) -> RenderResult<(GlEnum, GlEnum)> {
    format::lookup(BLEND_FUNC_TABLE, mode, "blend mode")
}

/// Check that every cull and blend mode that reaches the driver has a mapping
pub fn validate_tables() -> RenderResult<()> {
    for mode in FaceCullMode::ALL {
        if mode != FaceCullMode::Off {
            cull_face_constant(mode)?;
        }
    }
    for mode in BlendMode::ALL {
        if mode != BlendMode::Off {
            blend_factors(mode)?;
        }
    }
    Ok(())
}

/// Requested fixed-function state for the following draws
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderState {
    /// Depth test enabled
    pub depth_test: bool,
    /// Depth writes enabled
    pub depth_write: bool,
    /// Color writes enabled
    pub color_write: bool,
    /// Face culling
    pub cull_mode: FaceCullMode,
    /// Blending
    pub blend_mode: BlendMode,
    /// Polygon offset enabled
    pub polygon_offset: bool,
    /// Polygon offset factor
    pub polygon_offset_factor: f32,
    /// Polygon offset units
    pub polygon_offset_units: f32,
}

impl RenderState {
    /// Opaque geometry: depth test and write on, back faces culled, no blending
    pub const DEFAULT: Self = Self {
        depth_test: true,
        depth_write: true,
        color_write: true,
        cull_mode: FaceCullMode::Back,
        blend_mode: BlendMode::Off,
        polygon_offset: false,
        polygon_offset_factor: 0.0,
        polygon_offset_units: 0.0,
    };

    /// Same state with a different blend mode
    pub const fn with_blend_mode(mut self, blend_mode: BlendMode) -> Self {
        self.blend_mode = blend_mode;
        self
    }

    /// Same state with a different cull mode
    pub const fn with_cull_mode(mut self, cull_mode: FaceCullMode) -> Self {
        self.cull_mode = cull_mode;
        self
    }

    /// Same state with polygon offset enabled
    pub const fn with_polygon_offset(mut self, factor: f32, units: f32) -> Self {
        self.polygon_offset = true;
        self.polygon_offset_factor = factor;
        self.polygon_offset_units = units;
        self
    }
}

impl Default for RenderState {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Send only the parts of `state` that differ from the cache
pub fn apply_render_state<D: GraphicsDriver + ?Sized>(
    driver: &mut D,
    ctx: &mut RenderContext,
    state: &RenderState,
) -> RenderResult<()> {
    if state.depth_test != ctx.depth_test {
        if state.depth_test {
            driver.enable(gl::DEPTH_TEST);
            driver.depth_func(gl::LEQUAL);
        } else {
            driver.disable(gl::DEPTH_TEST);
        }
        ctx.depth_test = state.depth_test;
    }

    if state.depth_write != ctx.depth_write {
        driver.depth_mask(state.depth_write);
        ctx.depth_write = state.depth_write;
    }

    if state.color_write != ctx.color_write {
        let w = state.color_write;
        driver.color_mask(w, w, w, w);
        ctx.color_write = w;
    }

    if state.polygon_offset {
        if !ctx.polygon_offset_enabled {
            driver.enable(gl::POLYGON_OFFSET_FILL);
            driver.polygon_offset(state.polygon_offset_factor, state.polygon_offset_units);
            ctx.polygon_offset_enabled = true;
        } else if state.polygon_offset_factor != ctx.polygon_offset_factor
            || state.polygon_offset_units != ctx.polygon_offset_units
        {
            driver.polygon_offset(state.polygon_offset_factor, state.polygon_offset_units);
        }
        ctx.polygon_offset_factor = state.polygon_offset_factor;
        ctx.polygon_offset_units = state.polygon_offset_units;
    } else if ctx.polygon_offset_enabled {
        driver.disable(gl::POLYGON_OFFSET_FILL);
        ctx.polygon_offset_enabled = false;
        ctx.polygon_offset_factor = 0.0;
        ctx.polygon_offset_units = 0.0;
    }

    if state.cull_mode != ctx.cull_mode {
        if state.cull_mode == FaceCullMode::Off {
            driver.disable(gl::CULL_FACE);
        } else {
            let face = cull_face_constant(state.cull_mode)?;
            if ctx.cull_mode == FaceCullMode::Off {
                driver.enable(gl::CULL_FACE);
            }
            driver.cull_face(face);
        }
        ctx.cull_mode = state.cull_mode;
    }

    if state.blend_mode != ctx.blend_mode {
        if state.blend_mode == BlendMode::Off {
            driver.disable(gl::BLEND);
        } else {
            let (src, dst) = blend_factors(state.blend_mode)?;
            if ctx.blend_mode == BlendMode::Off {
                driver.enable(gl::BLEND);
            }
            driver.blend_func(src, dst);
        }
        ctx.blend_mode = state.blend_mode;
    }

    Ok(())
}

/// Set the viewport if it changed
pub fn set_viewport<D: GraphicsDriver + ?Sized>(driver: &mut D, ctx: &mut RenderContext, rect: Rect) {
    if ctx.viewport != rect {
        driver.viewport(rect.x, rect.y, rect.width, rect.height);
        ctx.viewport = rect;
    }
}

/// Restrict rendering to `rect`, enabling the scissor test on first use
pub fn set_clip_rect<D: GraphicsDriver + ?Sized>(driver: &mut D, ctx: &mut RenderContext, rect: Rect) {
    if !ctx.clip_enabled {
        driver.enable(gl::SCISSOR_TEST);
        driver.scissor(rect.x, rect.y, rect.width, rect.height);
        ctx.clip_enabled = true;
        ctx.clip_rect = rect;
    } else if ctx.clip_rect != rect {
        driver.scissor(rect.x, rect.y, rect.width, rect.height);
        ctx.clip_rect = rect;
    }
}

/// Disable the scissor test
pub fn clear_clip_rect<D: GraphicsDriver + ?Sized>(driver: &mut D, ctx: &mut RenderContext) {
    if ctx.clip_enabled {
        driver.disable(gl::SCISSOR_TEST);
        ctx.clip_enabled = false;
        ctx.clip_rect = Rect::default();
    }
}

/// Set the rasterized line width if it changed
pub fn set_line_width<D: GraphicsDriver + ?Sized>(driver: &mut D, ctx: &mut RenderContext, width: f32) {
    if ctx.line_width != width {
        driver.line_width(width);
        ctx.line_width = width;
    }
}

/// Set the unpack row alignment if it changed
pub fn set_unpack_alignment<D: GraphicsDriver + ?Sized>(
    driver: &mut D,
    ctx: &mut RenderContext,
    alignment: i32,
) {
    if ctx.unpack_alignment != alignment {
        driver.pixel_store_i32(gl::UNPACK_ALIGNMENT, alignment);
        ctx.unpack_alignment = alignment;
    }
}

//! # GLES Renderer
//!
//! A rendering layer over a stateful OpenGL ES 2 class driver. It shadows the
//! driver state so redundant calls are never issued, manages the lifecycle of
//! textures, buffers and shader programs, translates portable formats into
//! driver constants and turns mesh descriptors into draw calls.
//!
//! ## Components
//!
//! - **Capability detection** ([`caps`]): one-time query of versions,
//!   extensions and limits
//! - **Context cache** ([`context`], [`state`]): last applied state, diffed
//!   against every request
//! - **Resources** ([`resources`]): slot-map arenas with deferred deletion
//! - **Shaders** ([`shader`]): lazy compile/link and cached locations
//! - **Formats** ([`format`]): pixel and vertex format tables, image upload
//! - **Draws** ([`draw`]): attribute binding, LOD and hybrid meshes
//!
//! ## Quick Start
//!
//! ```rust
//! use gles_renderer::prelude::*;
//!
//! fn main() -> Result<(), RenderError> {
//!     let mut renderer = Renderer::new(HeadlessDriver::new(), RendererConfig::default());
//!     renderer.initialize()?;
//!
//!     renderer.set_viewport(0, 0, 64, 64);
//!     renderer.set_background_color(ColorRgba::BLACK);
//!     renderer.clear_buffers(true, true, false);
//!     renderer.apply_render_state(&RenderState::DEFAULT.with_blend_mode(BlendMode::Alpha))?;
//!
//!     renderer.on_frame()
//! }
//! ```
//!
//! Enable the `glow` feature for [`driver::GlowDriver`], which drives a live
//! `glow::Context`.

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::too_many_arguments,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]

pub mod foundation;

pub mod caps;
pub mod config;
pub mod context;
pub mod draw;
pub mod driver;
pub mod error;
pub mod format;
pub mod resources;
pub mod shader;
pub mod state;
pub mod stats;

mod renderer;
mod renderer_tests;

pub use error::{RenderError, RenderResult};
pub use renderer::{ClearFlags, FrameBuffer, Renderer};

/// Common imports for renderer users
pub mod prelude {
    pub use crate::{
        caps::{Caps, CapabilitySet},
        config::{Config, RendererConfig},
        draw::{HybridLayout, Mesh, PrimitiveMode},
        driver::{GraphicsDriver, HeadlessDriver},
        error::{RenderError, RenderResult},
        format::{ElementFormat, MagFilter, MinFilter, PixelFormat, TextureKind, Usage, WrapMode},
        foundation::{
            collections::{BufferKey, ImageKey, ProgramKey},
            math::{ColorRgba, Mat3, Mat4, Quat, Vec2, Vec3, Vec4},
        },
        renderer::{ClearFlags, FrameBuffer, Renderer},
        resources::{BufferData, BufferRole, Image, Texture, VertexBuffer},
        shader::{ShaderProgram, ShaderStage, UniformValue, VarType},
        state::{BlendMode, FaceCullMode, RenderState},
        stats::Statistics,
    };
}

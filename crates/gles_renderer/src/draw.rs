//! Mesh descriptors and draw dispatch

use serde::{Deserialize, Serialize};

use crate::caps::{CapabilitySet, Caps};
use crate::context::{AttribPointer, RenderContext};
use crate::driver::{gl, GlEnum, GraphicsDriver};
use crate::error::{RenderError, RenderResult};
use crate::format::{self, Usage};
use crate::foundation::collections::{BufferKey, ProgramKey};
use crate::resources::{bind_buffer, ensure_buffer_current, BufferRole, ResourceManager};
use crate::shader;
use crate::state::set_line_width;
use crate::stats::Statistics;

/// Primitive topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PrimitiveMode {
    /// Points
    Points,
    /// Independent line segments
    Lines,
    /// Closed line strip
    LineLoop,
    /// Line strip
    LineStrip,
    /// Independent triangles
    #[default]
    Triangles,
    /// Triangle strip
    TriangleStrip,
    /// Triangle fan
    TriangleFan,
}

impl PrimitiveMode {
    /// Every variant
    pub const ALL: [Self; 7] = [
        Self::Points,
        Self::Lines,
        Self::LineLoop,
        Self::LineStrip,
        Self::Triangles,
        Self::TriangleStrip,
        Self::TriangleFan,
    ];
}

const PRIMITIVE_MODE_TABLE: &[(PrimitiveMode, GlEnum)] = &[
    (PrimitiveMode::Points, gl::POINTS),
    (PrimitiveMode::Lines, gl::LINES),
    (PrimitiveMode::LineLoop, gl::LINE_LOOP),
    (PrimitiveMode::LineStrip, gl::LINE_STRIP),
    (PrimitiveMode::Triangles, gl::TRIANGLES),
    (PrimitiveMode::TriangleStrip, gl::TRIANGLE_STRIP),
    (PrimitiveMode::TriangleFan, gl::TRIANGLE_FAN),
];

/// Driver constant of a primitive mode
pub fn mode_constant(mode: PrimitiveMode) -> RenderResult<GlEnum> {
    format::lookup(PRIMITIVE_MODE_TABLE, mode, "primitive mode")
}

/// Check that every primitive mode has a driver constant
pub fn validate_tables() -> RenderResult<()> {
    for mode in PrimitiveMode::ALL {
        mode_constant(mode)?;
    }
    Ok(())
}

/// Sub-ranges of an index buffer drawn with different topologies
///
/// Ranges before `strip_start` are triangle lists; the range at `strip_start`
/// switches to strips and the one at `fan_start` to fans.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HybridLayout {
    /// Index count of each sub-range, in buffer order
    pub element_lengths: Vec<u32>,
    /// First strip sub-range
    pub strip_start: Option<usize>,
    /// First fan sub-range
    pub fan_start: Option<usize>,
}

impl HybridLayout {
    /// Layout over `element_lengths`, all triangle lists
    pub fn new(element_lengths: Vec<u32>) -> Self {
        Self { element_lengths, strip_start: None, fan_start: None }
    }

    /// Set the first strip and fan sub-ranges
    pub fn with_starts(mut self, strip_start: Option<usize>, fan_start: Option<usize>) -> Self {
        self.strip_start = strip_start;
        self.fan_start = fan_start;
        self
    }

    /// Topology and byte offset of every sub-range
    pub fn ranges(&self, index_size: usize) -> Vec<(PrimitiveMode, u32, usize)> {
        let mut mode = PrimitiveMode::Triangles;
        let mut offset = 0;
        let mut ranges = Vec::with_capacity(self.element_lengths.len());
        for (i, &length) in self.element_lengths.iter().enumerate() {
            if Some(i) == self.strip_start {
                mode = PrimitiveMode::TriangleStrip;
            } else if Some(i) == self.fan_start {
                mode = PrimitiveMode::TriangleFan;
            }
            ranges.push((mode, length, offset));
            offset += length as usize * index_size;
        }
        ranges
    }
}

/// Drawable geometry: buffer keys plus how to assemble them
#[derive(Debug, Clone)]
pub struct Mesh {
    mode: PrimitiveMode,
    buffers: Vec<BufferKey>,
    lod_levels: Vec<BufferKey>,
    vertex_count: u32,
    hybrid: Option<HybridLayout>,
    line_width: f32,
}

impl Mesh {
    /// Empty mesh of the given topology
    pub fn new(mode: PrimitiveMode) -> Self {
        Self {
            mode,
            buffers: Vec::new(),
            lod_levels: Vec::new(),
            vertex_count: 0,
            hybrid: None,
            line_width: 1.0,
        }
    }

    /// Add a vertex, index or interleaved buffer
    pub fn with_buffer(mut self, buffer: BufferKey) -> Self {
        self.buffers.push(buffer);
        self
    }

    /// Index buffers per level of detail, most detailed first
    pub fn with_lod_levels(mut self, levels: Vec<BufferKey>) -> Self {
        self.lod_levels = levels;
        self
    }

    /// Vertex count for non-indexed draws
    ///
    /// When left at 0 the position buffer decides.
    pub fn with_vertex_count(mut self, count: u32) -> Self {
        self.vertex_count = count;
        self
    }

    /// Draw the index buffer as several sub-ranges
    pub fn with_hybrid(mut self, layout: HybridLayout) -> Self {
        self.hybrid = Some(layout);
        self
    }

    /// Line width for line topologies
    pub fn with_line_width(mut self, width: f32) -> Self {
        self.line_width = width;
        self
    }

    /// Topology
    pub fn mode(&self) -> PrimitiveMode {
        self.mode
    }

    /// Buffer keys
    pub fn buffers(&self) -> &[BufferKey] {
        &self.buffers
    }

    /// Levels of detail
    pub fn lod_levels(&self) -> &[BufferKey] {
        &self.lod_levels
    }

    /// Hybrid layout
    pub fn hybrid(&self) -> Option<&HybridLayout> {
        self.hybrid.as_ref()
    }

    /// Line width
    pub fn line_width(&self) -> f32 {
        self.line_width
    }
}

/// Find the first mesh buffer with `role`
fn find_role(resources: &ResourceManager, mesh: &Mesh, role: BufferRole) -> RenderResult<Option<BufferKey>> {
    for &key in &mesh.buffers {
        if resources.buffer(key)?.role() == role {
            return Ok(Some(key));
        }
    }
    Ok(None)
}

fn bind_attributes<D: GraphicsDriver + ?Sized>(
    driver: &mut D,
    ctx: &mut RenderContext,
    caps: &CapabilitySet,
    stats: &mut Statistics,
    resources: &mut ResourceManager,
    program: ProgramKey,
    mesh: &Mesh,
) -> RenderResult<()> {
    let interleaved = match find_role(resources, mesh, BufferRole::Interleaved)? {
        Some(key) => Some(ensure_buffer_current(driver, ctx, stats, resources.buffer_mut(key)?)?),
        None => None,
    };

    for &key in &mesh.buffers {
        let (role, usage, stride) = {
            let buffer = resources.buffer(key)?;
            (buffer.role(), buffer.usage(), buffer.stride())
        };
        let Some(name) = role.attribute_name() else { continue };
        if usage == Usage::CpuOnly {
            continue;
        }
        let Some(slot) = shader::attribute_location(driver, resources.program_mut(program)?, name)? else {
            log::trace!("Attribute {} unused by the current program", name);
            continue;
        };
        if slot >= ctx.attrib_slot_count() {
            return Err(RenderError::invalid_state(format!(
                "attribute {name} at slot {slot} exceeds the {} tracked slots",
                ctx.attrib_slot_count()
            )));
        }

        let handle = if stride == 0 {
            ensure_buffer_current(driver, ctx, stats, resources.buffer_mut(key)?)?
        } else {
            interleaved.ok_or_else(|| {
                RenderError::invalid_state(format!("{role:?} view has no interleaved buffer to read from"))
            })?
        };

        let buffer = resources.buffer(key)?;
        let pointer = AttribPointer {
            buffer: handle,
            size: buffer.components() as i32,
            ty: format::element_type(buffer.data().format(), caps)?,
            normalized: buffer.normalized(),
            stride: stride as i32,
            offset: buffer.offset() as i32,
        };

        if ctx.attrib_slots.move_to_new(slot) {
            driver.enable_vertex_attrib_array(slot);
        }
        let bound = &mut ctx.bound_attribs[slot as usize];
        if *bound != Some(pointer) {
            *bound = Some(pointer);
            bind_buffer(driver, ctx, gl::ARRAY_BUFFER, handle);
            driver.vertex_attrib_pointer(
                slot,
                pointer.size,
                pointer.ty,
                pointer.normalized,
                pointer.stride,
                pointer.offset,
            );
        }
    }
    Ok(())
}

/// Release the attribute slots and texture units this draw did not use
fn retire_slots<D: GraphicsDriver + ?Sized>(driver: &mut D, ctx: &mut RenderContext) {
    for slot in ctx.attrib_slots.retire() {
        driver.disable_vertex_attrib_array(slot);
        if let Some(bound) = ctx.bound_attribs.get_mut(slot as usize) {
            *bound = None;
        }
    }
    for unit in ctx.texture_units.retire() {
        if let Some(bound) = ctx.bound_textures.get_mut(unit as usize) {
            *bound = None;
        }
    }
}

/// Bind the attributes of `mesh` to `program` and issue its draw calls
///
/// `program` must be the current program. `instances` above 1 requires the
/// instancing capability.
#[allow(clippy::too_many_arguments)]
pub fn render_mesh<D: GraphicsDriver + ?Sized>(
    driver: &mut D,
    ctx: &mut RenderContext,
    caps: &CapabilitySet,
    stats: &mut Statistics,
    resources: &mut ResourceManager,
    program: ProgramKey,
    mesh: &Mesh,
    lod: usize,
    instances: u32,
) -> RenderResult<()> {
    if ctx.bound_program.is_none() {
        return Err(RenderError::invalid_state("render_mesh called without a bound program"));
    }
    if instances > 1 && !caps.has(Caps::MESH_INSTANCING) {
        return Err(RenderError::CapabilityMissing(format!(
            "{instances} instances requested but the driver has no instancing support"
        )));
    }

    let index_key = if mesh.lod_levels.is_empty() {
        find_role(resources, mesh, BufferRole::Index)?
    } else {
        Some(*mesh.lod_levels.get(lod).ok_or_else(|| {
            RenderError::invalid_state(format!("LOD {lod} requested, mesh has {}", mesh.lod_levels.len()))
        })?)
    };
    if mesh.hybrid.is_some() && index_key.is_none() {
        return Err(RenderError::invalid_state("hybrid mesh without an index buffer"));
    }

    if matches!(mesh.mode, PrimitiveMode::Lines | PrimitiveMode::LineLoop | PrimitiveMode::LineStrip) {
        set_line_width(driver, ctx, mesh.line_width);
    }

    bind_attributes(driver, ctx, caps, stats, resources, program, mesh)?;

    let vertex_count = if mesh.vertex_count > 0 {
        mesh.vertex_count as usize
    } else {
        match find_role(resources, mesh, BufferRole::Position)? {
            Some(key) => resources.buffer(key)?.vertex_count(),
            None => 0,
        }
    };

    let mut draws = 0;
    match index_key {
        Some(key) => {
            let handle = ensure_buffer_current(driver, ctx, stats, resources.buffer_mut(key)?)?;
            let indices = resources.buffer(key)?;
            let index_format = indices.data().format();
            let ty = format::index_type(index_format, caps)?;
            let index_count = indices.data().element_count();
            log::trace!("Drawing {} indices from buffer {}", index_count, handle);

            match &mesh.hybrid {
                Some(layout) => {
                    let needed: usize = layout.element_lengths.iter().map(|&n| n as usize).sum();
                    if needed > index_count {
                        return Err(RenderError::invalid_state(format!(
                            "hybrid layout covers {needed} indices, buffer {handle} holds {index_count}"
                        )));
                    }
                    for (mode, count, offset) in layout.ranges(index_format.size()) {
                        draw_elements(driver, mode_constant(mode)?, count as i32, ty, offset as i32, instances);
                        draws += 1;
                    }
                }
                None => {
                    draw_elements(driver, mode_constant(mesh.mode)?, index_count as i32, ty, 0, instances);
                    draws += 1;
                }
            }
        }
        None => {
            let mode = mode_constant(mesh.mode)?;
            if instances > 1 {
                driver.draw_arrays_instanced(mode, 0, vertex_count as i32, instances as i32);
            } else {
                driver.draw_arrays(mode, 0, vertex_count as i32);
            }
            draws += 1;
        }
    }

    retire_slots(driver, ctx);

    stats.draw_calls += draws;
    stats.meshes += 1;
    stats.vertices += vertex_count as u64 * u64::from(instances.max(1));
    Ok(())
}

fn draw_elements<D: GraphicsDriver + ?Sized>(
    driver: &mut D,
    mode: GlEnum,
    count: i32,
    ty: GlEnum,
    offset: i32,
    instances: u32,
) {
    if instances > 1 {
        driver.draw_elements_instanced(mode, count, ty, offset, instances as i32);
    } else {
        driver.draw_elements(mode, count, ty, offset);
    }
}

//! Shadow copy of the driver state
//!
//! [`RenderContext`] remembers what was last sent to the driver so that every
//! component can skip calls that would not change anything. It starts out
//! matching the documented driver defaults and is reset to them whenever the
//! real context is lost or its state becomes unknown.

use crate::foundation::math::ColorRgba;
use crate::state::{BlendMode, FaceCullMode};

/// Integer rectangle in window coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    /// Left edge
    pub x: i32,
    /// Bottom edge
    pub y: i32,
    /// Width in pixels
    pub width: i32,
    /// Height in pixels
    pub height: i32,
}

impl Rect {
    /// Create a rectangle
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }
}

/// Parameters of the last `vertex_attrib_pointer` issued for a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttribPointer {
    /// Buffer object the pointer reads from
    pub buffer: u32,
    /// Components per vertex
    pub size: i32,
    /// Driver data type
    pub ty: u32,
    /// Fixed-point normalization
    pub normalized: bool,
    /// Byte stride
    pub stride: i32,
    /// Byte offset
    pub offset: i32,
}

/// Slots used by the previous draw versus the current one
///
/// Texture units and vertex attribute slots are tracked this way so that after
/// a draw the renderer can release exactly the slots the draw did not touch.
#[derive(Debug, Clone, Default)]
pub struct IdList {
    old_list: Vec<u32>,
    new_list: Vec<u32>,
}

impl IdList {
    /// Mark `id` as used by the current draw
    ///
    /// Returns `true` when the slot was not in use by the previous draw and
    /// therefore needs enabling.
    pub fn move_to_new(&mut self, id: u32) -> bool {
        if self.new_list.contains(&id) {
            return false;
        }
        self.new_list.push(id);
        match self.old_list.iter().position(|&old| old == id) {
            Some(index) => {
                self.old_list.swap_remove(index);
                false
            }
            None => true,
        }
    }

    /// End the current draw
    ///
    /// Returns the slots used previously but not now; the current set becomes
    /// the previous one.
    pub fn retire(&mut self) -> Vec<u32> {
        let unused = std::mem::take(&mut self.old_list);
        self.old_list = std::mem::take(&mut self.new_list);
        unused
    }
}

/// Last state applied to the driver
#[derive(Debug, Clone)]
pub struct RenderContext {
    /// Depth test enabled
    pub depth_test: bool,
    /// Depth writes enabled
    pub depth_write: bool,
    /// Color writes enabled
    pub color_write: bool,
    /// Face culling mode
    pub cull_mode: FaceCullMode,
    /// Blending mode
    pub blend_mode: BlendMode,
    /// Polygon offset enabled
    pub polygon_offset_enabled: bool,
    /// Polygon offset factor
    pub polygon_offset_factor: f32,
    /// Polygon offset units
    pub polygon_offset_units: f32,

    /// Current program
    pub bound_program: Option<u32>,
    /// Buffer bound to the array target
    pub bound_array_buffer: Option<u32>,
    /// Buffer bound to the element array target
    pub bound_element_array_buffer: Option<u32>,
    /// Texture bound to each unit
    pub bound_textures: Vec<Option<u32>>,
    /// Active texture unit index
    pub active_texture_unit: u32,
    /// Texture units in use
    pub texture_units: IdList,

    /// Enabled vertex attribute slots
    pub attrib_slots: IdList,
    /// Pointer last set on each attribute slot
    pub bound_attribs: Vec<Option<AttribPointer>>,

    /// Viewport rectangle
    pub viewport: Rect,
    /// Scissor rectangle
    pub clip_rect: Rect,
    /// Scissor test enabled
    pub clip_enabled: bool,

    /// Color used by clears
    pub clear_color: ColorRgba,
    /// Rasterized line width
    pub line_width: f32,
    /// Unpack row alignment
    pub unpack_alignment: i32,
    /// Depth range mapping
    pub depth_range: (f32, f32),
    /// Alpha-to-coverage enabled
    pub alpha_to_coverage: bool,
}

impl RenderContext {
    /// Cache sized for the given number of texture units and attribute slots
    pub fn new(texture_units: u32, vertex_attribs: u32) -> Self {
        Self {
            depth_test: false,
            depth_write: true,
            color_write: true,
            cull_mode: FaceCullMode::Off,
            blend_mode: BlendMode::Off,
            polygon_offset_enabled: false,
            polygon_offset_factor: 0.0,
            polygon_offset_units: 0.0,
            bound_program: None,
            bound_array_buffer: None,
            bound_element_array_buffer: None,
            bound_textures: vec![None; texture_units as usize],
            active_texture_unit: 0,
            texture_units: IdList::default(),
            attrib_slots: IdList::default(),
            bound_attribs: vec![None; vertex_attribs as usize],
            viewport: Rect::default(),
            clip_rect: Rect::default(),
            clip_enabled: false,
            clear_color: ColorRgba::new(0.0, 0.0, 0.0, 0.0),
            line_width: 1.0,
            unpack_alignment: 4,
            depth_range: (0.0, 1.0),
            alpha_to_coverage: false,
        }
    }

    /// Return every cached value to the driver defaults
    pub fn reset(&mut self) {
        *self = Self::new(self.bound_textures.len() as u32, self.bound_attribs.len() as u32);
    }

    /// Number of tracked texture units
    pub fn texture_unit_count(&self) -> u32 {
        self.bound_textures.len() as u32
    }

    /// Number of tracked attribute slots
    pub fn attrib_slot_count(&self) -> u32 {
        self.bound_attribs.len() as u32
    }

    /// Drop every reference to a deleted texture
    pub fn forget_texture(&mut self, texture: u32) {
        for bound in &mut self.bound_textures {
            if *bound == Some(texture) {
                *bound = None;
            }
        }
    }

    /// Drop every reference to a deleted buffer
    pub fn forget_buffer(&mut self, buffer: u32) {
        if self.bound_array_buffer == Some(buffer) {
            self.bound_array_buffer = None;
        }
        if self.bound_element_array_buffer == Some(buffer) {
            self.bound_element_array_buffer = None;
        }
        for attrib in &mut self.bound_attribs {
            if attrib.is_some_and(|a| a.buffer == buffer) {
                *attrib = None;
            }
        }
    }

    /// Drop every reference to a deleted program
    pub fn forget_program(&mut self, program: u32) {
        if self.bound_program == Some(program) {
            self.bound_program = None;
        }
    }
}

impl Default for RenderContext {
    fn default() -> Self {
        Self::new(16, 16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_list_tracks_unused_slots() {
        let mut list = IdList::default();
        assert!(list.move_to_new(0));
        assert!(list.move_to_new(1));
        assert!(!list.move_to_new(1));
        assert!(list.retire().is_empty());

        // Next draw only uses slot 1
        assert!(!list.move_to_new(1));
        assert_eq!(list.retire(), vec![0]);

        // Slot 0 is free again and needs re-enabling
        assert!(list.move_to_new(0));
    }

    #[test]
    fn test_forget_buffer_clears_pointers() {
        let mut ctx = RenderContext::new(2, 2);
        ctx.bound_array_buffer = Some(7);
        ctx.bound_attribs[1] = Some(AttribPointer {
            buffer: 7,
            size: 3,
            ty: 0x1406,
            normalized: false,
            stride: 0,
            offset: 0,
        });

        ctx.forget_buffer(7);
        assert_eq!(ctx.bound_array_buffer, None);
        assert_eq!(ctx.bound_attribs[1], None);
    }

    #[test]
    fn test_reset_keeps_table_sizes() {
        let mut ctx = RenderContext::new(4, 6);
        ctx.bound_textures[3] = Some(9);
        ctx.depth_test = true;
        ctx.reset();
        assert_eq!(ctx.texture_unit_count(), 4);
        assert_eq!(ctx.attrib_slot_count(), 6);
        assert_eq!(ctx.bound_textures[3], None);
        assert!(!ctx.depth_test);
    }
}

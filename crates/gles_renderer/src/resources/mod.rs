//! GPU resource lifecycle
//!
//! All GPU-backed objects (texture images, vertex/index buffers, shader
//! programs) live in slot-map arenas owned by [`ResourceManager`] and are
//! addressed by key. Each one walks the same lifecycle:
//!
//! ```text
//! unallocated --first use--> allocated --upload--> current
//!                                                    |   ^
//!                                       data changed v   | re-upload
//!                                                  stale
//! released --collect_unused()--> deleted (driver object and arena slot)
//! ```
//!
//! Releasing a resource only queues it. The driver object is deleted, and
//! every cached binding that refers to it scrubbed, at the next sweep, which
//! the renderer runs once per frame boundary. A resource stays usable between
//! its release and the sweep.

mod buffer;
mod texture;

pub use buffer::{bind_buffer, ensure_buffer_current, BufferData, BufferRole, Element, VertexBuffer};
pub use texture::{apply_sampler, bind_texture, ensure_image_current, Image, SamplerParams, Texture};

use crate::context::RenderContext;
use crate::driver::GraphicsDriver;
use crate::error::{RenderError, RenderResult};
use crate::foundation::collections::{BufferKey, ImageKey, ProgramKey, SlotMap};
use crate::shader::ShaderProgram;
use crate::stats::Statistics;

/// A resource waiting for the deletion sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Image(ImageKey),
    Buffer(BufferKey),
    Program(ProgramKey),
}

/// Arenas for every GPU-backed resource
#[derive(Debug, Default)]
pub struct ResourceManager {
    images: SlotMap<ImageKey, Image>,
    buffers: SlotMap<BufferKey, VertexBuffer>,
    programs: SlotMap<ProgramKey, ShaderProgram>,
    pending: Vec<Pending>,
}

macro_rules! arena_access {
    ($field:ident, $key:ty, $value:ty, $insert:ident, $get:ident, $get_mut:ident, $release:ident, $variant:ident, $label:literal) => {
        #[doc = concat!("Add a ", $label, "; it is uploaded on first use")]
        pub fn $insert(&mut self, value: $value) -> $key {
            self.$field.insert(value)
        }

        #[doc = concat!("Look up a ", $label)]
        pub fn $get(&self, key: $key) -> RenderResult<&$value> {
            self.$field
                .get(key)
                .ok_or_else(|| RenderError::invalid_state(concat!("stale ", $label, " key")))
        }

        #[doc = concat!("Look up a ", $label, " for modification")]
        pub fn $get_mut(&mut self, key: $key) -> RenderResult<&mut $value> {
            self.$field
                .get_mut(key)
                .ok_or_else(|| RenderError::invalid_state(concat!("stale ", $label, " key")))
        }

        #[doc = concat!("Queue a ", $label, " for deletion at the next sweep")]
        pub fn $release(&mut self, key: $key) -> RenderResult<()> {
            if !self.$field.contains_key(key) {
                return Err(RenderError::invalid_state(concat!("stale ", $label, " key")));
            }
            let pending = Pending::$variant(key);
            if !self.pending.contains(&pending) {
                self.pending.push(pending);
            }
            Ok(())
        }
    };
}

impl ResourceManager {
    /// Empty arenas
    pub fn new() -> Self {
        Self::default()
    }

    arena_access!(images, ImageKey, Image, insert_image, image, image_mut, release_image, Image, "image");
    arena_access!(buffers, BufferKey, VertexBuffer, insert_buffer, buffer, buffer_mut, release_buffer, Buffer, "buffer");
    arena_access!(programs, ProgramKey, ShaderProgram, insert_program, program, program_mut, release_program, Program, "program");

    /// Resources waiting for the sweep
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Number of images in the arena
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Number of buffers in the arena
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Number of programs in the arena
    pub fn program_count(&self) -> usize {
        self.programs.len()
    }

    /// Delete every released resource; returns how many were removed
    pub fn collect_unused<D: GraphicsDriver + ?Sized>(
        &mut self,
        driver: &mut D,
        ctx: &mut RenderContext,
        stats: &mut Statistics,
    ) -> usize {
        let pending = std::mem::take(&mut self.pending);
        let mut removed = 0;

        for entry in pending {
            match entry {
                Pending::Image(key) => {
                    if let Some(mut image) = self.images.remove(key) {
                        if image.handle.is_none() {
                            log::warn!("Released image {:?} was never uploaded", key);
                        }
                        delete_image(driver, ctx, stats, &mut image);
                        removed += 1;
                    }
                }
                Pending::Buffer(key) => {
                    if let Some(mut buffer) = self.buffers.remove(key) {
                        if buffer.handle.is_none() {
                            log::warn!("Released buffer {:?} was never uploaded", key);
                        }
                        delete_buffer(driver, ctx, stats, &mut buffer);
                        removed += 1;
                    }
                }
                Pending::Program(key) => {
                    if let Some(mut program) = self.programs.remove(key) {
                        program.delete(driver, ctx, stats);
                        removed += 1;
                    }
                }
            }
        }

        if removed > 0 {
            log::debug!("Deleted {} unused GPU resources", removed);
        }
        removed
    }

    /// Forget every driver object after context loss
    ///
    /// Issues no driver calls: the objects died with the context. Every
    /// resource returns to unallocated and is re-uploaded on next use.
    pub fn reset_objects(&mut self) {
        for image in self.images.values_mut() {
            image.handle = None;
            image.update_needed = true;
            image.mipmaps_generated = false;
            image.sampler = None;
        }
        for buffer in self.buffers.values_mut() {
            buffer.handle = None;
            buffer.update_needed = true;
            buffer.uploaded_size = None;
        }
        for program in self.programs.values_mut() {
            program.reset_object();
        }
        log::info!(
            "Reset {} images, {} buffers, {} programs",
            self.images.len(),
            self.buffers.len(),
            self.programs.len()
        );
    }

    /// Delete the driver objects of every resource
    ///
    /// Released resources leave the arenas; the rest stay and are re-uploaded
    /// if used again.
    pub fn delete_all<D: GraphicsDriver + ?Sized>(
        &mut self,
        driver: &mut D,
        ctx: &mut RenderContext,
        stats: &mut Statistics,
    ) {
        self.collect_unused(driver, ctx, stats);
        for image in self.images.values_mut() {
            delete_image(driver, ctx, stats, image);
        }
        for buffer in self.buffers.values_mut() {
            delete_buffer(driver, ctx, stats, buffer);
        }
        for program in self.programs.values_mut() {
            program.delete(driver, ctx, stats);
        }
    }
}

fn delete_image<D: GraphicsDriver + ?Sized>(
    driver: &mut D,
    ctx: &mut RenderContext,
    stats: &mut Statistics,
    image: &mut Image,
) {
    if let Some(handle) = image.handle.take() {
        driver.delete_texture(handle);
        ctx.forget_texture(handle);
        stats.textures = stats.textures.saturating_sub(1);
        log::debug!("Deleted texture {}", handle);
    }
    image.update_needed = true;
    image.mipmaps_generated = false;
    image.sampler = None;
}

fn delete_buffer<D: GraphicsDriver + ?Sized>(
    driver: &mut D,
    ctx: &mut RenderContext,
    stats: &mut Statistics,
    buffer: &mut VertexBuffer,
) {
    if let Some(handle) = buffer.handle.take() {
        driver.delete_buffer(handle);
        ctx.forget_buffer(handle);
        stats.buffers = stats.buffers.saturating_sub(1);
        log::debug!("Deleted buffer {}", handle);
    }
    buffer.update_needed = true;
    buffer.uploaded_size = None;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{DriverCall, HeadlessDriver};
    use crate::format::Usage;

    fn uploaded_buffer(
        manager: &mut ResourceManager,
        driver: &mut HeadlessDriver,
        ctx: &mut RenderContext,
        stats: &mut Statistics,
    ) -> (BufferKey, u32) {
        let key = manager.insert_buffer(VertexBuffer::new(
            BufferRole::Position,
            Usage::Static,
            3,
            BufferData::from_slice(&[0.0f32; 3]),
        ));
        let handle = ensure_buffer_current(driver, ctx, stats, manager.buffer_mut(key).unwrap()).unwrap();
        (key, handle)
    }

    #[test]
    fn test_release_defers_deletion_to_sweep() {
        let mut manager = ResourceManager::new();
        let mut driver = HeadlessDriver::new();
        let mut ctx = RenderContext::default();
        let mut stats = Statistics::default();
        let (key, handle) = uploaded_buffer(&mut manager, &mut driver, &mut ctx, &mut stats);
        driver.clear_calls();

        manager.release_buffer(key).unwrap();
        manager.release_buffer(key).unwrap();
        assert!(driver.calls().is_empty());
        assert!(manager.buffer(key).is_ok());
        assert_eq!(manager.pending_count(), 1);

        assert_eq!(manager.collect_unused(&mut driver, &mut ctx, &mut stats), 1);
        assert_eq!(driver.calls(), &[DriverCall::DeleteBuffer(handle)]);
        assert_eq!(ctx.bound_array_buffer, None);
        assert_eq!(stats.buffers, 0);
        assert!(matches!(manager.buffer(key), Err(RenderError::InvalidResourceState(_))));
        assert!(manager.release_buffer(key).is_err());
    }

    #[test]
    fn test_reset_objects_issues_no_calls() {
        let mut manager = ResourceManager::new();
        let mut driver = HeadlessDriver::new();
        let mut ctx = RenderContext::default();
        let mut stats = Statistics::default();
        let (key, _) = uploaded_buffer(&mut manager, &mut driver, &mut ctx, &mut stats);
        driver.clear_calls();

        manager.reset_objects();
        assert!(driver.calls().is_empty());
        let buffer = manager.buffer(key).unwrap();
        assert_eq!(buffer.handle(), None);
        assert!(buffer.is_update_needed());
    }

    #[test]
    fn test_delete_all_keeps_live_resources() {
        let mut manager = ResourceManager::new();
        let mut driver = HeadlessDriver::new();
        let mut ctx = RenderContext::default();
        let mut stats = Statistics::default();
        let (kept, _) = uploaded_buffer(&mut manager, &mut driver, &mut ctx, &mut stats);
        let (released, _) = uploaded_buffer(&mut manager, &mut driver, &mut ctx, &mut stats);
        manager.release_buffer(released).unwrap();

        manager.delete_all(&mut driver, &mut ctx, &mut stats);
        assert_eq!(driver.live_buffers(), 0);
        assert_eq!(manager.buffer_count(), 1);
        assert_eq!(manager.buffer(kept).unwrap().handle(), None);
    }
}

//! Renderer statistics
//!
//! Frame counters are cleared at every frame boundary; object counters track
//! driver objects currently alive and survive until the context is reset.

/// Counters collected while rendering
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Statistics {
    /// Completed frames
    pub frames: u64,

    /// Program switches this frame
    pub shader_switches: u32,
    /// Uniform uploads this frame
    pub uniforms_set: u32,
    /// Texture binds this frame
    pub texture_binds: u32,
    /// Draw calls this frame
    pub draw_calls: u32,
    /// Meshes rendered this frame
    pub meshes: u32,
    /// Vertices submitted this frame (including instances)
    pub vertices: u64,

    /// Texture objects alive
    pub textures: u32,
    /// Buffer objects alive
    pub buffers: u32,
    /// Program objects alive
    pub programs: u32,
}

impl Statistics {
    /// Close the current frame
    pub fn end_frame(&mut self) {
        log::trace!(
            "Frame {}: {} draws, {} meshes, {} vertices, {} shader switches, {} texture binds",
            self.frames,
            self.draw_calls,
            self.meshes,
            self.vertices,
            self.shader_switches,
            self.texture_binds
        );
        self.frames += 1;
        self.shader_switches = 0;
        self.uniforms_set = 0;
        self.texture_binds = 0;
        self.draw_calls = 0;
        self.meshes = 0;
        self.vertices = 0;
    }

    /// Forget every object counter
    pub fn clear_memory(&mut self) {
        self.textures = 0;
        self.buffers = 0;
        self.programs = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_frame_keeps_object_counters() {
        let mut stats = Statistics { draw_calls: 5, textures: 2, ..Statistics::default() };
        stats.end_frame();
        assert_eq!(stats.frames, 1);
        assert_eq!(stats.draw_calls, 0);
        assert_eq!(stats.textures, 2);

        stats.clear_memory();
        assert_eq!(stats.textures, 0);
    }
}

//! Arena keys for GPU resources
//!
//! Every GPU-backed resource lives in a slot map owned by the renderer and is
//! referenced by one of these keys. A key outlives its resource only as a
//! stale value: lookups after the deletion sweep fail instead of aliasing a
//! reused slot.

pub use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Key of a texture image
    pub struct ImageKey;
    /// Key of a vertex or index buffer
    pub struct BufferKey;
    /// Key of a shader program
    pub struct ProgramKey;
}

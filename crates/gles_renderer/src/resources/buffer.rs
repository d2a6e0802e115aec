//! Vertex and index buffers

use serde::{Deserialize, Serialize};

use crate::context::RenderContext;
use crate::driver::{gl, GlEnum, GraphicsDriver};
use crate::error::{RenderError, RenderResult};
use crate::format::{self, ElementFormat, Usage};
use crate::stats::Statistics;

/// Rust element types that can back a vertex buffer
pub trait Element: bytemuck::Pod {
    /// Matching element format
    const FORMAT: ElementFormat;
}

macro_rules! impl_element {
    ($($ty:ty => $format:ident),* $(,)?) => {
        $(impl Element for $ty {
            const FORMAT: ElementFormat = ElementFormat::$format;
        })*
    };
}

impl_element! {
    i8 => Byte,
    u8 => UnsignedByte,
    i16 => Short,
    u16 => UnsignedShort,
    i32 => Int,
    u32 => UnsignedInt,
    f32 => Float,
    f64 => Double,
}

/// Typed vertex payload
///
/// Holds raw bytes plus the element format they encode, so one upload path
/// serves every numeric type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferData {
    format: ElementFormat,
    bytes: Vec<u8>,
}

impl BufferData {
    /// Copy a slice of elements
    pub fn from_slice<T: Element>(values: &[T]) -> Self {
        Self { format: T::FORMAT, bytes: bytemuck::cast_slice(values).to_vec() }
    }

    /// Wrap raw bytes already in `format` (e.g. half floats)
    pub fn from_bytes(format: ElementFormat, bytes: Vec<u8>) -> Self {
        Self { format, bytes }
    }

    /// Element format
    pub fn format(&self) -> ElementFormat {
        self.format
    }

    /// Raw bytes
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of elements
    pub fn element_count(&self) -> usize {
        self.bytes.len() / self.format.size()
    }
}

/// What a buffer feeds in a mesh
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BufferRole {
    Position,
    Normal,
    Tangent,
    Binormal,
    Color,
    TexCoord,
    TexCoord2,
    TexCoord3,
    TexCoord4,
    Size,
    BoneIndex,
    BoneWeight,
    InstanceData,
    /// Triangle indices
    Index,
    /// Packed vertex data that attribute views point into
    Interleaved,
}

impl BufferRole {
    /// Shader attribute name fed by this role, `None` for index and interleaved data
    pub const fn attribute_name(self) -> Option<&'static str> {
        Some(match self {
            Self::Position => "inPosition",
            Self::Normal => "inNormal",
            Self::Tangent => "inTangent",
            Self::Binormal => "inBinormal",
            Self::Color => "inColor",
            Self::TexCoord => "inTexCoord",
            Self::TexCoord2 => "inTexCoord2",
            Self::TexCoord3 => "inTexCoord3",
            Self::TexCoord4 => "inTexCoord4",
            Self::Size => "inSize",
            Self::BoneIndex => "inBoneIndex",
            Self::BoneWeight => "inBoneWeight",
            Self::InstanceData => "inInstanceData",
            Self::Index | Self::Interleaved => return None,
        })
    }
}

/// GPU-backed vertex or index buffer
///
/// A buffer with a non-zero stride is a view into the mesh's
/// [`BufferRole::Interleaved`] buffer; its own data is never uploaded.
#[derive(Debug, Clone)]
pub struct VertexBuffer {
    role: BufferRole,
    usage: Usage,
    components: u32,
    normalized: bool,
    stride: u32,
    offset: u32,
    data: BufferData,

    pub(crate) handle: Option<u32>,
    pub(crate) update_needed: bool,
    pub(crate) uploaded_size: Option<usize>,
}

impl VertexBuffer {
    /// Buffer with `components` elements per vertex
    pub fn new(role: BufferRole, usage: Usage, components: u32, data: BufferData) -> Self {
        Self {
            role,
            usage,
            components,
            normalized: false,
            stride: 0,
            offset: 0,
            data,
            handle: None,
            update_needed: true,
            uploaded_size: None,
        }
    }

    /// Index buffer
    pub fn indices<T: Element>(usage: Usage, indices: &[T]) -> Self {
        Self::new(BufferRole::Index, usage, 1, BufferData::from_slice(indices))
    }

    /// Describe this buffer as a view into the interleaved buffer
    pub fn with_layout(mut self, stride: u32, offset: u32) -> Self {
        self.stride = stride;
        self.offset = offset;
        self
    }

    /// Treat integer data as normalized fixed point
    pub fn with_normalized(mut self, normalized: bool) -> Self {
        self.normalized = normalized;
        self
    }

    /// Replace the contents; the next use uploads them
    pub fn update_data(&mut self, data: BufferData) {
        self.data = data;
        self.update_needed = true;
    }

    /// Role
    pub fn role(&self) -> BufferRole {
        self.role
    }

    /// Usage hint
    pub fn usage(&self) -> Usage {
        self.usage
    }

    /// Elements per vertex
    pub fn components(&self) -> u32 {
        self.components
    }

    /// Normalized flag
    pub fn normalized(&self) -> bool {
        self.normalized
    }

    /// Byte stride, 0 when tightly packed in its own buffer
    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// Byte offset into the interleaved buffer
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Payload
    pub fn data(&self) -> &BufferData {
        &self.data
    }

    /// Driver object, `None` until first upload
    pub fn handle(&self) -> Option<u32> {
        self.handle
    }

    /// Whether the contents changed since the last upload
    pub fn is_update_needed(&self) -> bool {
        self.update_needed
    }

    /// Vertices described by the payload
    pub fn vertex_count(&self) -> usize {
        if self.components == 0 {
            0
        } else {
            self.data.element_count() / self.components as usize
        }
    }

    pub(crate) fn target(&self) -> GlEnum {
        if self.role == BufferRole::Index {
            gl::ELEMENT_ARRAY_BUFFER
        } else {
            gl::ARRAY_BUFFER
        }
    }
}

/// Bind `buffer` to `target` unless the cache says it already is
pub fn bind_buffer<D: GraphicsDriver + ?Sized>(
    driver: &mut D,
    ctx: &mut RenderContext,
    target: GlEnum,
    buffer: u32,
) {
    let bound = if target == gl::ELEMENT_ARRAY_BUFFER {
        &mut ctx.bound_element_array_buffer
    } else {
        &mut ctx.bound_array_buffer
    };
    if *bound != Some(buffer) {
        driver.bind_buffer(target, Some(buffer));
        *bound = Some(buffer);
    }
}

/// Allocate, bind and upload `buffer` as needed; returns its driver object
///
/// A first upload or a change in byte size reallocates storage; a same-size
/// update overwrites it in place.
pub fn ensure_buffer_current<D: GraphicsDriver + ?Sized>(
    driver: &mut D,
    ctx: &mut RenderContext,
    stats: &mut Statistics,
    buffer: &mut VertexBuffer,
) -> RenderResult<u32> {
    if buffer.usage == Usage::CpuOnly {
        return Err(RenderError::invalid_state(format!(
            "{:?} buffer is CPU-only and cannot be uploaded",
            buffer.role
        )));
    }

    let target = buffer.target();
    let (handle, created) = match buffer.handle {
        Some(handle) => (handle, false),
        None => {
            let handle = driver
                .create_buffer()
                .map_err(|e| RenderError::ResourceCreationFailed(format!("buffer: {e}")))?;
            log::debug!("Created {:?} buffer {}", buffer.role, handle);
            buffer.handle = Some(handle);
            buffer.uploaded_size = None;
            stats.buffers += 1;
            (handle, true)
        }
    };

    bind_buffer(driver, ctx, target, handle);

    if !created && !buffer.update_needed {
        return Ok(handle);
    }

    let hint = format::usage_hint(buffer.usage)?;
    let bytes = buffer.data.bytes();
    if created || buffer.uploaded_size != Some(bytes.len()) {
        driver.buffer_data(target, bytes, hint);
    } else {
        driver.buffer_sub_data(target, 0, bytes);
    }
    buffer.uploaded_size = Some(bytes.len());
    buffer.update_needed = false;

    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{DriverCall, HeadlessDriver};

    #[test]
    fn test_buffer_data_from_typed_slices() {
        let floats = BufferData::from_slice(&[1.0f32, 2.0, 3.0]);
        assert_eq!(floats.format(), ElementFormat::Float);
        assert_eq!(floats.bytes().len(), 12);
        assert_eq!(floats.element_count(), 3);

        let shorts = BufferData::from_slice(&[1u16, 2, 3, 4]);
        assert_eq!(shorts.format(), ElementFormat::UnsignedShort);
        assert_eq!(shorts.bytes().len(), 8);
    }

    #[test]
    fn test_attribute_names() {
        assert_eq!(BufferRole::Position.attribute_name(), Some("inPosition"));
        assert_eq!(BufferRole::TexCoord2.attribute_name(), Some("inTexCoord2"));
        assert_eq!(BufferRole::Index.attribute_name(), None);
    }

    #[test]
    fn test_first_use_allocates_and_uploads() {
        let mut driver = HeadlessDriver::new();
        let mut ctx = RenderContext::default();
        let mut stats = Statistics::default();
        let mut buffer = VertexBuffer::new(
            BufferRole::Position,
            Usage::Static,
            3,
            BufferData::from_slice(&[0.0f32; 9]),
        );

        let handle = ensure_buffer_current(&mut driver, &mut ctx, &mut stats, &mut buffer).unwrap();
        assert_eq!(
            driver.calls(),
            &[
                DriverCall::CreateBuffer(handle),
                DriverCall::BindBuffer(gl::ARRAY_BUFFER, Some(handle)),
                DriverCall::BufferData { target: gl::ARRAY_BUFFER, len: 36, usage: gl::STATIC_DRAW },
            ]
        );
        assert!(!buffer.is_update_needed());
        assert_eq!(stats.buffers, 1);

        driver.clear_calls();
        ensure_buffer_current(&mut driver, &mut ctx, &mut stats, &mut buffer).unwrap();
        assert!(driver.calls().is_empty());
    }

    #[test]
    fn test_resize_reallocates_storage() {
        let mut driver = HeadlessDriver::new();
        let mut ctx = RenderContext::default();
        let mut stats = Statistics::default();
        let mut buffer = VertexBuffer::new(
            BufferRole::Position,
            Usage::Dynamic,
            3,
            BufferData::from_slice(&[0.0f32; 9]),
        );
        let handle = ensure_buffer_current(&mut driver, &mut ctx, &mut stats, &mut buffer).unwrap();
        assert_eq!(driver.buffer_size(handle), Some(36));

        buffer.update_data(BufferData::from_slice(&[0.0f32; 18]));
        ensure_buffer_current(&mut driver, &mut ctx, &mut stats, &mut buffer).unwrap();
        assert_eq!(driver.buffer_size(handle), Some(72));
    }

    #[test]
    fn test_failed_creation_leaves_buffer_unbound() {
        let mut driver = HeadlessDriver::new();
        let mut ctx = RenderContext::default();
        let mut stats = Statistics::default();
        let mut buffer = VertexBuffer::indices(Usage::Static, &[0u16, 1, 2]);
        driver.fail_object_creation(true);

        let result = ensure_buffer_current(&mut driver, &mut ctx, &mut stats, &mut buffer);
        assert!(matches!(result, Err(RenderError::ResourceCreationFailed(_))));
        assert_eq!(buffer.handle(), None);
        assert_eq!(ctx.bound_element_array_buffer, None);
        assert_eq!(stats.buffers, 0);
    }

    #[test]
    fn test_index_buffer_uses_element_target() {
        let mut driver = HeadlessDriver::new();
        let mut ctx = RenderContext::default();
        let mut stats = Statistics::default();
        let mut buffer = VertexBuffer::indices(Usage::Static, &[0u16, 1, 2]);

        let handle = ensure_buffer_current(&mut driver, &mut ctx, &mut stats, &mut buffer).unwrap();
        assert_eq!(ctx.bound_element_array_buffer, Some(handle));
        assert_eq!(ctx.bound_array_buffer, None);
    }

    #[test]
    fn test_cpu_only_buffer_rejected() {
        let mut driver = HeadlessDriver::new();
        let mut ctx = RenderContext::default();
        let mut stats = Statistics::default();
        let mut buffer = VertexBuffer::new(
            BufferRole::Position,
            Usage::CpuOnly,
            3,
            BufferData::from_slice(&[0.0f32; 3]),
        );

        let result = ensure_buffer_current(&mut driver, &mut ctx, &mut stats, &mut buffer);
        assert!(matches!(result, Err(RenderError::InvalidResourceState(_))));
        assert!(driver.calls().is_empty());
    }
}

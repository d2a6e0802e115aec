//! Renderer error types

use crate::config::ConfigError;

/// Result type for renderer operations
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors reported by the rendering layer
///
/// None of these are retried internally. Degraded conditions that still allow
/// rendering to continue are logged instead of returned.
#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    /// A required driver feature is absent
    ///
    /// Raised at initialization when the shading-language baseline is not met,
    /// and on use of an optional path (instancing, a shader language) that the
    /// detected capability set does not include.
    #[error("Capability missing: {0}")]
    CapabilityMissing(String),

    /// A pixel or vertex format cannot be expressed on this driver
    ///
    /// Also covers texture dimensions the driver cannot hold: non-power-of-two
    /// sizes without support, sizes above the maximum, and cube maps without
    /// exactly six faces.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A shader failed to compile or a program failed to link
    #[error("Shader '{name}' failed to compile or link: {log}")]
    CompileLinkFailure {
        /// Name of the failing shader source or program
        name: String,
        /// Driver info log
        log: String,
    },

    /// A resource or renderer call was used in a state that does not allow it
    #[error("Invalid resource state: {0}")]
    InvalidResourceState(String),

    /// The requested operation is not available on this backend
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// The driver returned no object name
    #[error("Resource creation failed: {0}")]
    ResourceCreationFailed(String),

    /// The driver reported an error code that no call handled
    #[error("Driver error 0x{code:04X} ({name})")]
    DriverError {
        /// Raw driver error code
        code: u32,
        /// Symbolic name of the code
        name: &'static str,
    },

    /// Renderer configuration could not be loaded or saved
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl RenderError {
    /// Shorthand for [`RenderError::InvalidResourceState`]
    pub(crate) fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidResourceState(message.into())
    }

    /// Shorthand for [`RenderError::UnsupportedFormat`]
    pub(crate) fn unsupported_format(message: impl Into<String>) -> Self {
        Self::UnsupportedFormat(message.into())
    }
}

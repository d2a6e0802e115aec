//! Renderer configuration
//!
//! Configuration structs implement [`Config`], which loads and saves them as
//! TOML or RON depending on the file extension.

pub use serde::{Deserialize, Serialize};

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

        if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Tunables applied when the renderer initializes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Allow compressed texture formats when the driver advertises them
    pub enable_compression: bool,
    /// Let the driver generate mip chains for textures that need them
    pub hardware_mipmaps: bool,
    /// Fetch and log shader info logs even when compile and link succeed
    pub validate_shaders: bool,
    /// Upper bound on texture units tracked by the state cache
    pub max_texture_units: u32,
    /// Upper bound on vertex attribute slots tracked by the state cache
    pub max_vertex_attribs: u32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            enable_compression: true,
            hardware_mipmaps: true,
            validate_shaders: false,
            max_texture_units: 16,
            max_vertex_attribs: 16,
        }
    }
}

impl Config for RendererConfig {}

use std::path::PathBuf;

use thiserror::Error;

/// Shader stage named in diagnostics.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Geometry,
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
            ShaderStage::Geometry => "geometry",
        };
        f.write_str(s)
    }
}

/// Failure to create a GPU resource.
///
/// These are recoverable: callers log them and continue with a null handle.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("failed to read {stage} shader '{}': {source}", path.display())]
    ShaderSource {
        stage: ShaderStage,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{stage} shader '{}' failed to compile:\n{message}", path.display())]
    ShaderCompile {
        stage: ShaderStage,
        path: PathBuf,
        message: String,
    },

    #[error("program '{label}' failed to link: {message}")]
    ProgramLink { label: String, message: String },

    #[error("{stage} stage is not supported by this device")]
    UnsupportedStage { stage: ShaderStage },

    #[error("failed to load texture '{}': {reason}", path.display())]
    TextureLoad { path: PathBuf, reason: String },

    #[error("texture '{}' has unsupported channel count {channels}", path.display())]
    UnsupportedChannels { path: PathBuf, channels: u8 },

    #[error("buffer '{label}' is invalid: {reason}")]
    InvalidBuffer { label: String, reason: String },

    #[error("write of {len} bytes at offset {offset} exceeds buffer size {size}")]
    InvalidRange { offset: u64, len: u64, size: u64 },
}

/// Failure to locate the asset tree. Fatal at startup.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("asset base directory does not exist: {}", path.display())]
    MissingBaseDir { path: PathBuf },

    #[error("asset not found: {}", path.display())]
    MissingAsset { path: PathBuf },
}

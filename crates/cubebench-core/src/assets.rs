//! Asset directory resolution and the resources every strategy loads from it.

use std::path::{Path, PathBuf};

use glam::Vec3;

use crate::device::TextureConfig;
use crate::error::AssetError;
use crate::positions::PositionParams;
use crate::shader::ShaderSource;

/// A verified asset base directory with `shaders/` and `textures/` below it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRoot {
    base: PathBuf,
}

impl AssetRoot {
    /// Fails if `base` is not an existing directory.
    pub fn locate(base: impl Into<PathBuf>) -> Result<Self, AssetError> {
        let base = base.into();
        if !base.is_dir() {
            return Err(AssetError::MissingBaseDir { path: base });
        }
        log::info!("asset root: {}", base.display());
        Ok(Self { base })
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn shader(&self, name: &str) -> PathBuf {
        self.base.join("shaders").join(name)
    }

    pub fn texture(&self, name: &str) -> PathBuf {
        self.base.join("textures").join(name)
    }

    /// Like joining `relative` onto the base, but fails when the file is absent.
    pub fn require(&self, relative: impl AsRef<Path>) -> Result<PathBuf, AssetError> {
        let path = self.base.join(relative);
        if path.exists() {
            Ok(path)
        } else {
            Err(AssetError::MissingAsset { path })
        }
    }
}

/// Shader, texture and placement inputs shared by all strategies.
///
/// Owned by the selector and lent to the active strategy on every hook call.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneAssets {
    pub cube_shader: ShaderSource,
    pub instanced_shader: ShaderSource,
    pub texture: PathBuf,
    pub texture_config: TextureConfig,
    pub tint: Vec3,
    pub alpha: f32,
    pub positions: PositionParams,
}

impl SceneAssets {
    pub fn new(root: &AssetRoot) -> Self {
        Self {
            cube_shader: ShaderSource::new(
                root.shader("cube.vert.wgsl"),
                root.shader("cube.frag.wgsl"),
            ),
            instanced_shader: ShaderSource::new(
                root.shader("cube_instanced.vert.wgsl"),
                root.shader("cube.frag.wgsl"),
            ),
            texture: root.texture("crate.png"),
            texture_config: TextureConfig::default(),
            tint: Vec3::ONE,
            alpha: 1.0,
            positions: PositionParams::default(),
        }
    }

    pub fn with_positions(mut self, positions: PositionParams) -> Self {
        self.positions = positions;
        self
    }
}

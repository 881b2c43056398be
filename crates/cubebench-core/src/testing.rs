//! Helpers shared by unit tests.

use std::path::{Path, PathBuf};

pub(crate) fn asset_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../assets")
}

pub(crate) fn shader_dir() -> PathBuf {
    asset_dir().join("shaders")
}

/// Decodes native-endian `f32`s without assuming the slice is aligned.
pub(crate) fn read_f32s(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

pub(crate) fn scene_assets(cap: usize) -> crate::assets::SceneAssets {
    let root = crate::assets::AssetRoot::locate(asset_dir()).expect("shipped assets directory");
    crate::assets::SceneAssets::new(&root).with_positions(crate::positions::PositionParams {
        cap,
        ..Default::default()
    })
}

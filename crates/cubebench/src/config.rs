use std::path::PathBuf;

use cubebench_core::{PositionParams, StrategyKind};
use cubebench_engine::window::RuntimeConfig;

/// Fewest objects the overlay allows.
pub const MIN_OBJECTS: usize = 1;

/// Most objects the overlay allows.
pub const MAX_OBJECTS: usize = 50_000;

pub const ENV_ASSETS: &str = "CUBEBENCH_ASSETS";
pub const ENV_STRATEGY: &str = "CUBEBENCH_STRATEGY";
pub const ENV_OBJECTS: &str = "CUBEBENCH_OBJECTS";
pub const ENV_VSYNC: &str = "CUBEBENCH_VSYNC";
pub const ENV_FONT: &str = "CUBEBENCH_FONT";

/// System fonts tried, in order, when no font file is configured.
const SYSTEM_FONTS: [&str; 5] = [
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
    "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
];

/// Startup settings for one benchmark run.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchConfig {
    pub title: String,
    pub width: f64,
    pub height: f64,

    pub strategy: StrategyKind,

    /// Objects drawn on the first frame; clamped to `[MIN_OBJECTS, max_objects()]`.
    pub objects: usize,
    pub vsync: bool,

    pub positions: PositionParams,
    pub asset_root: PathBuf,
    /// Panel font; `None` falls back to the system fonts.
    pub font: Option<PathBuf>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            title: "cubebench".to_string(),
            width: 1280.0,
            height: 720.0,
            strategy: StrategyKind::Naive,
            objects: 100,
            vsync: false,
            positions: PositionParams::default(),
            asset_root: default_asset_root(),
            font: None,
        }
    }
}

impl BenchConfig {
    /// Defaults overlaid with the `CUBEBENCH_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`BenchConfig::from_env`] with an injectable variable source.
    ///
    /// Unparseable values are logged and ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup(ENV_ASSETS).filter(|p| !p.trim().is_empty()) {
            config.asset_root = PathBuf::from(path);
        }

        if let Some(path) = lookup(ENV_FONT).filter(|p| !p.trim().is_empty()) {
            config.font = Some(PathBuf::from(path));
        }

        if let Some(name) = lookup(ENV_STRATEGY) {
            match StrategyKind::from_name(&name) {
                Some(kind) => config.strategy = kind,
                None => log::warn!("{ENV_STRATEGY}: unknown strategy '{name}'"),
            }
        }

        if let Some(raw) = lookup(ENV_OBJECTS) {
            match raw.trim().parse::<usize>() {
                Ok(n) => config.objects = n,
                Err(e) => log::warn!("{ENV_OBJECTS}: '{raw}': {e}"),
            }
        }

        if let Some(raw) = lookup(ENV_VSYNC) {
            match parse_flag(&raw) {
                Some(on) => config.vsync = on,
                None => log::warn!("{ENV_VSYNC}: expected on/off, got '{raw}'"),
            }
        }

        config.objects = config.objects.clamp(MIN_OBJECTS, config.max_objects());
        config
    }

    /// Upper object bound: the overlay limit or the generated position count,
    /// whichever is smaller.
    pub fn max_objects(&self) -> usize {
        MAX_OBJECTS.min(self.positions.cap).max(MIN_OBJECTS)
    }

    /// Bytes of the panel font: the configured file, else the first system font
    /// found. `None` when nothing is readable; the panel then draws without text.
    pub fn load_font(&self) -> Option<Vec<u8>> {
        if let Some(path) = &self.font {
            match std::fs::read(path) {
                Ok(bytes) => return Some(bytes),
                Err(e) => log::warn!("{ENV_FONT}: {}: {e}", path.display()),
            }
        }
        SYSTEM_FONTS.iter().find_map(|p| std::fs::read(p).ok())
    }

    pub fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            title: self.title.clone(),
            initial_size: (self.width, self.height).into(),
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

/// `./assets` when run from the workspace root, else the checkout's asset directory.
fn default_asset_root() -> PathBuf {
    let local = PathBuf::from("assets");
    if local.is_dir() {
        return local;
    }
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../assets")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_variables() {
        let config = BenchConfig::from_lookup(lookup(&[]));
        assert_eq!(config.objects, 100);
        assert!(!config.vsync);
        assert_eq!(config.strategy, StrategyKind::Naive);
        assert_eq!(config.max_objects(), MAX_OBJECTS);
        assert_eq!(config.font, None);
    }

    #[test]
    fn configured_font_file_is_read() {
        let dir = std::env::temp_dir().join(format!("cubebench-font-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("panel.ttf");
        std::fs::write(&path, b"not really a font").unwrap();

        let config = BenchConfig {
            font: Some(path),
            ..BenchConfig::default()
        };
        assert_eq!(config.load_font().as_deref(), Some(&b"not really a font"[..]));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn variables_override_defaults() {
        let config = BenchConfig::from_lookup(lookup(&[
            (ENV_ASSETS, "/opt/cubes"),
            (ENV_STRATEGY, "instanced"),
            (ENV_OBJECTS, "2500"),
            (ENV_VSYNC, "on"),
            (ENV_FONT, "/opt/fonts/mono.ttf"),
        ]));
        assert_eq!(config.asset_root, PathBuf::from("/opt/cubes"));
        assert_eq!(config.font, Some(PathBuf::from("/opt/fonts/mono.ttf")));
        assert_eq!(config.strategy, StrategyKind::Instanced);
        assert_eq!(config.objects, 2500);
        assert!(config.vsync);
    }

    #[test]
    fn bad_values_are_ignored() {
        let config = BenchConfig::from_lookup(lookup(&[
            (ENV_STRATEGY, "deferred"),
            (ENV_OBJECTS, "lots"),
            (ENV_VSYNC, "maybe"),
        ]));
        assert_eq!(config.strategy, StrategyKind::Naive);
        assert_eq!(config.objects, 100);
        assert!(!config.vsync);
    }

    #[test]
    fn object_count_is_clamped() {
        let config = BenchConfig::from_lookup(lookup(&[(ENV_OBJECTS, "0")]));
        assert_eq!(config.objects, MIN_OBJECTS);

        let config = BenchConfig::from_lookup(lookup(&[(ENV_OBJECTS, "999999")]));
        assert_eq!(config.objects, MAX_OBJECTS);
    }
}

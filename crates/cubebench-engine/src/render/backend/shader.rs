use cubebench_core::device::StageSource;
use cubebench_core::error::{ResourceError, ShaderStage};

pub(crate) const VERTEX_ENTRY: &str = "vs_main";
pub(crate) const FRAGMENT_ENTRY: &str = "fs_main";

/// Parses and validates one WGSL stage before any wgpu module exists.
///
/// Invalid source fails here with a `ResourceError`, never in wgpu's error sink.
pub(crate) fn validate_stage(
    stage: ShaderStage,
    source: &StageSource<'_>,
) -> Result<(), ResourceError> {
    let (naga_stage, entry) = match stage {
        ShaderStage::Vertex => (naga::ShaderStage::Vertex, VERTEX_ENTRY),
        ShaderStage::Fragment => (naga::ShaderStage::Fragment, FRAGMENT_ENTRY),
        ShaderStage::Geometry => return Err(ResourceError::UnsupportedStage { stage }),
    };
    let compile_error = |message: String| ResourceError::ShaderCompile {
        stage,
        path: source.path.to_path_buf(),
        message,
    };

    let module = naga::front::wgsl::parse_str(source.code)
        .map_err(|e| compile_error(e.emit_to_string(source.code)))?;

    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|e| compile_error(e.as_inner().to_string()))?;

    let has_entry = module
        .entry_points
        .iter()
        .any(|ep| ep.stage == naga_stage && ep.name == entry);
    if !has_entry {
        return Err(compile_error(format!(
            "no @{stage} entry point named `{entry}`"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};

    fn shader_path(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../assets/shaders")
            .join(name)
    }

    fn check(stage: ShaderStage, path: &Path, code: &str) -> Result<(), ResourceError> {
        validate_stage(stage, &StageSource { path, code })
    }

    #[test]
    fn shipped_shaders_validate() {
        for (name, stage) in [
            ("cube.vert.wgsl", ShaderStage::Vertex),
            ("cube_instanced.vert.wgsl", ShaderStage::Vertex),
            ("cube.frag.wgsl", ShaderStage::Fragment),
        ] {
            let path = shader_path(name);
            let code = std::fs::read_to_string(&path).unwrap();
            check(stage, &path, &code).unwrap_or_else(|e| panic!("{name}: {e}"));
        }
    }

    #[test]
    fn syntax_error_names_stage_and_path() {
        let path = Path::new("broken.vert.wgsl");
        let err = check(ShaderStage::Vertex, path, "fn vs_main( {").unwrap_err();
        match err {
            ResourceError::ShaderCompile { stage, path: p, .. } => {
                assert_eq!(stage, ShaderStage::Vertex);
                assert_eq!(p, path);
            }
            other => panic!("unexpected {other}"),
        }
    }

    #[test]
    fn wrong_stage_is_missing_its_entry_point() {
        let path = shader_path("cube.frag.wgsl");
        let code = std::fs::read_to_string(&path).unwrap();
        let err = check(ShaderStage::Vertex, &path, &code).unwrap_err();
        assert!(err.to_string().contains("vs_main"), "{err}");
    }

    #[test]
    fn geometry_stage_is_unsupported() {
        let err = check(ShaderStage::Geometry, Path::new("cube.geom"), "").unwrap_err();
        assert!(matches!(
            err,
            ResourceError::UnsupportedStage {
                stage: ShaderStage::Geometry
            }
        ));
    }
}

//! The `.autoforge/toolchain.toml` override layer: a small, read-only list
//! of preferred program names per toolset kind, consulted ahead of the
//! built-in candidate list during detection. Absence is not an error — this
//! mirrors the teacher's global/project config layering, narrowed to the
//! one thing this configurator actually needs to override.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::builder::detect::ToolchainOverrides;
use crate::core::toolchain::ToolKind;

/// On-disk shape of `.autoforge/toolchain.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    #[serde(rename = "as")]
    pub as_: Option<Vec<String>>,
    pub cc: Option<Vec<String>>,
    pub cxx: Option<Vec<String>>,
    pub mm: Option<Vec<String>>,
    pub mxx: Option<Vec<String>>,
    pub ld: Option<Vec<String>>,
    pub sh: Option<Vec<String>>,
    pub ar: Option<Vec<String>>,
}

impl ToolchainConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).with_context(|| format!("reading toolchain config {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("parsing toolchain config {}", path.display()))
    }

    pub fn into_overrides(self) -> ToolchainOverrides {
        let mut overrides = ToolchainOverrides::default();
        for (kind, list) in [
            (ToolKind::As, self.as_),
            (ToolKind::Cc, self.cc),
            (ToolKind::Cxx, self.cxx),
            (ToolKind::Mm, self.mm),
            (ToolKind::Mxx, self.mxx),
            (ToolKind::Ld, self.ld),
            (ToolKind::Sh, self.sh),
            (ToolKind::Ar, self.ar),
        ] {
            if let Some(programs) = list {
                overrides.programs.insert(kind, programs);
            }
        }
        overrides
    }
}

/// Load the override file if present under `project_root/.autoforge/toolchain.toml`;
/// its absence is expected and yields the empty override set, not an error.
pub fn load_toolchain_overrides(project_root: &Path) -> ToolchainOverrides {
    let path = project_root.join(".autoforge").join("toolchain.toml");
    if !path.exists() {
        return ToolchainOverrides::default();
    }
    match ToolchainConfig::load(&path) {
        Ok(config) => config.into_overrides(),
        Err(err) => {
            tracing::warn!(error = %err, path = %path.display(), "ignoring unreadable toolchain override file");
            ToolchainOverrides::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_override_file_yields_empty_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let overrides = load_toolchain_overrides(dir.path());
        assert!(overrides.programs.is_empty());
    }

    #[test]
    fn present_override_file_is_parsed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".autoforge")).unwrap();
        std::fs::write(dir.path().join(".autoforge/toolchain.toml"), "cc = [\"my-gcc\"]\n").unwrap();
        let overrides = load_toolchain_overrides(dir.path());
        assert_eq!(overrides.programs.get(&ToolKind::Cc), Some(&vec!["my-gcc".to_string()]));
    }
}

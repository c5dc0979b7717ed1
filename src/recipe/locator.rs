use crate::error::{BuildError, Result};
use std::path::{Path, PathBuf};

/// Recipe file names below the source root, highest priority first.
pub const CANDIDATES: [&str; 3] = ["lipkg/build.yml", "build.yml", ".travis.yml"];

/// A recipe file and the directory the build runs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedRecipe {
    pub recipe_path: PathBuf,
    pub root_dir: PathBuf,
}

/// Find the build recipe for the source tree at `dir`.
///
/// The root is canonicalized so the generated script can `cd` to it from
/// anywhere, including inside a chroot that bind-mounts the same path.
pub fn locate(dir: &Path) -> Result<LocatedRecipe> {
    let root_dir = std::fs::canonicalize(dir).map_err(|_| BuildError::ConfigurationNotFound {
        dir: dir.to_path_buf(),
    })?;

    for candidate in CANDIDATES {
        let path = root_dir.join(candidate);
        if path.is_file() {
            tracing::debug!(recipe = %path.display(), "Found build recipe");
            return Ok(LocatedRecipe {
                recipe_path: path,
                root_dir,
            });
        }
    }

    Err(BuildError::ConfigurationNotFound { dir: root_dir })
}

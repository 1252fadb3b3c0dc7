//! Repository root discovery.

use std::path::{Path, PathBuf};

/// Find the repository root by walking up from `start` until a directory
/// containing `.git` is found.
pub fn find_repository_root(start: &Path) -> anyhow::Result<PathBuf> {
    for dir in start.ancestors() {
        if dir.join(".git").exists() {
            return Ok(dir.to_path_buf());
        }
    }
    anyhow::bail!(
        "Could not find repository root: no .git directory above {}",
        start.display()
    );
}

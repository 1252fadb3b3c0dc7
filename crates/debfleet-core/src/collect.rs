//! Artifact collection.
//!
//! Walks the configured source folders in order and produces the list of
//! package files to distribute, either by building each folder or, in
//! skip-build mode, by scanning it for `.deb` files already on disk.

use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::build::PackageBuilder;
use crate::config::Configuration;

/// A single built package file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Absolute path to the `.deb` file.
    pub path: PathBuf,
    /// The file name component of `path`.
    pub file_name: String,
}

impl Artifact {
    pub fn new(path: PathBuf) -> anyhow::Result<Self> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                anyhow::anyhow!("Artifact path has no valid file name: {}", path.display())
            })?;
        Ok(Self { path, file_name })
    }

    /// Derive the Debian package name from the file name.
    ///
    /// Per the `<name>_<version>_<arch>.deb` convention this is the part
    /// before the first underscore; a file name without an underscore is
    /// returned whole.
    pub fn package_name(&self) -> &str {
        match self.file_name.split_once('_') {
            Some((name, _)) => name,
            None => &self.file_name,
        }
    }
}

/// Collect the artifacts for every configured folder, in configuration order.
///
/// A build failure aborts the whole collection; no partial result is
/// returned.
pub fn collect_artifacts(
    cfg: &Configuration,
    builder: &dyn PackageBuilder,
) -> anyhow::Result<Vec<Artifact>> {
    let mut artifacts = Vec::new();
    for folder in &cfg.folders {
        let dir = cfg.repository_root.join(folder);
        if cfg.skip_build {
            tracing::info!(folder = %folder, "scanning for prebuilt packages");
            artifacts.extend(scan_prebuilt(&dir)?);
        } else {
            tracing::info!(folder = %folder, "building packages");
            let output = builder.build(&dir)?;
            for file_name in output.package_files() {
                tracing::info!(package = %file_name, "successfully built package");
                artifacts.push(Artifact::new(dir.join(file_name))?);
            }
        }
    }
    Ok(artifacts)
}

/// List the `.deb` files directly under `dir`, sorted by file name so the
/// resulting install batch is reproducible across filesystems.
fn scan_prebuilt(dir: &Path) -> anyhow::Result<Vec<Artifact>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read package folder: {}", dir.display()))?;

    let mut found = Vec::new();
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "deb") {
            found.push(Artifact::new(path)?);
        }
    }
    found.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    Ok(found)
}

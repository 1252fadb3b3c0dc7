//! Containerized package builds.
//!
//! A build runs `dpkg-buildpackage` inside an ephemeral Docker container with
//! the source folder mounted at `/source`. The build script announces every
//! produced artifact on stdout as a `PKG_FILE=<filename>` line; that line
//! format is the only coupling between the container and the orchestrator.

use std::path::Path;
use std::process::Command;

use anyhow::Context;

/// Marker prefix for artifact announcements on build stdout.
const PKG_FILE_MARKER: &str = "PKG_FILE=";

/// Script run inside the build container.
///
/// The folder contents are copied to a private temporary directory before
/// building so the container user never writes build droppings into the
/// mounted folder; produced `.deb` files are copied back with the original
/// owner restored.
const BUILD_SCRIPT: &str = r#"
set -ex

tmpdir="$(mktemp -d)"

pkg_dir="$(pwd)"
orig_uid=$(stat -c %u "${pkg_dir}")
orig_gid=$(stat -c %g "${pkg_dir}")
echo "Copying package files to ${tmpdir}"
cp -av "${pkg_dir}"/* "${tmpdir}"

cd "${tmpdir}"

dpkg-buildpackage --build=binary

for pkg_file in "${tmpdir}"/../*.deb; do
    cp "${pkg_file}" "${pkg_dir}"
    pkg=$(basename "${pkg_file}")
    chown ${orig_uid}:${orig_gid} "${pkg_dir}/${pkg}"
    echo "PKG_FILE=${pkg}"
done
"#;

/// Captured output of one build invocation.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub stdout: String,
    pub stderr: String,
}

impl BuildOutput {
    /// Extract the artifact filenames announced on stdout.
    ///
    /// Every line starting with `PKG_FILE=` yields one filename, in print
    /// order. Other lines are ignored.
    pub fn package_files(&self) -> Vec<String> {
        self.stdout
            .lines()
            .filter_map(|line| line.strip_prefix(PKG_FILE_MARKER))
            .map(str::to_string)
            .collect()
    }
}

/// Builds packages for a source folder.
pub trait PackageBuilder {
    fn build(&self, folder: &Path) -> anyhow::Result<BuildOutput>;
}

/// Runs builds in an ephemeral Docker container.
#[derive(Debug)]
pub struct DockerBuilder {
    image: String,
}

impl DockerBuilder {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
        }
    }
}

impl PackageBuilder for DockerBuilder {
    fn build(&self, folder: &Path) -> anyhow::Result<BuildOutput> {
        let mut cmd = Command::new("docker");
        cmd.arg("run")
            .arg("--rm")
            .arg(format!("--volume={}:/source", folder.display()))
            .arg("--workdir=/source")
            .arg(&self.image)
            .arg("/bin/bash")
            .arg("-c")
            .arg(BUILD_SCRIPT);
        tracing::debug!(command = ?cmd, "running build container");

        let output = cmd
            .output()
            .with_context(|| format!("Failed to run docker build for {}", folder.display()))?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            tracing::error!(
                "Build in {} failed.\nstdout:\n{}\nstderr:\n{}",
                folder.display(),
                stdout,
                stderr
            );
            anyhow::bail!(
                "Package build in {} failed with {}",
                folder.display(),
                output.status
            );
        }

        tracing::debug!("Build output:\n{}", stdout);
        Ok(BuildOutput { stdout, stderr })
    }
}

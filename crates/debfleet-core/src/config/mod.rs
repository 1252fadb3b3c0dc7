//! Run configuration.
//!
//! All environment and filesystem dependent defaulting happens in
//! [`resolve`], which takes the parsed options, an environment lookup, the
//! machine-group table and the working directory as explicit inputs. The
//! resulting [`Configuration`] is immutable for the rest of the run.

pub mod groups;

use std::path::{Path, PathBuf};

use anyhow::Context;

pub use groups::MachineGroups;

use crate::repo;

/// Environment variable providing the default for `--machines`.
pub const MACHINES_ENV: &str = "UP_MACHINES";
/// Environment variable providing the default for `--docker-image`.
pub const DOCKER_IMAGE_ENV: &str = "UP_DOCKER_IMAGE";
/// Environment variable providing the default for `--ssh-config`.
pub const SSH_CONFIG_ENV: &str = "UP_SSH_CONFIG";

/// Parsed command-line options, before defaulting and resolution.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    pub folders: Vec<String>,
    pub machines: Option<String>,
    pub docker_image: Option<String>,
    pub ssh_config: Option<PathBuf>,
    pub prefix: String,
    pub repository_root: Option<PathBuf>,
    pub skip_build: bool,
    pub skip_install_check: bool,
}

/// The fully resolved description of one run.
#[derive(Debug, Clone)]
pub struct Configuration {
    /// Absolute path to the repository root.
    pub repository_root: PathBuf,
    /// Docker image used to build the packages.
    pub docker_image: String,
    /// Source folders, relative to `repository_root`, in distribution order.
    pub folders: Vec<String>,
    /// Target hostnames, group-resolved and prefixed.
    pub machines: Vec<String>,
    /// Alternate ssh configuration file, passed to ssh/scp via `-F`.
    pub ssh_config: Option<PathBuf>,
    /// Scan the folders for existing `.deb` files instead of building.
    pub skip_build: bool,
    /// Treat every package as installed, skipping the remote query.
    pub skip_install_check: bool,
}

/// Resolve the run configuration from parsed options, environment defaults,
/// the machine-group table and the working directory.
pub fn resolve(
    opts: ResolveOptions,
    env: impl Fn(&str) -> Option<String>,
    groups: &MachineGroups,
    cwd: &Path,
) -> anyhow::Result<Configuration> {
    let machines_arg = opts
        .machines
        .or_else(|| env(MACHINES_ENV))
        .with_context(|| {
            format!("No machines given. See the --machines option or set {MACHINES_ENV}.")
        })?;
    let docker_image = opts
        .docker_image
        .or_else(|| env(DOCKER_IMAGE_ENV))
        .with_context(|| {
            format!("No Docker image given. See the --docker-image option or set {DOCKER_IMAGE_ENV}.")
        })?;
    let ssh_config = opts
        .ssh_config
        .or_else(|| env(SSH_CONFIG_ENV).map(PathBuf::from));

    let machines = groups
        .resolve(&machines_arg)
        .into_iter()
        .map(|machine| format!("{}{}", opts.prefix, machine))
        .collect();

    let repository_root = match opts.repository_root {
        Some(root) => std::path::absolute(&root)
            .with_context(|| format!("Invalid repository root: {}", root.display()))?,
        None => repo::find_repository_root(cwd)?,
    };

    Ok(Configuration {
        repository_root,
        docker_image,
        folders: opts.folders,
        machines,
        ssh_config,
        skip_build: opts.skip_build,
        skip_install_check: opts.skip_install_check,
    })
}

//! Fleet update loop.
//!
//! Machines are processed strictly one at a time, in configuration order.
//! For each machine the qualifying artifacts are copied over individually
//! and then installed with a single batched `dpkg --install` command. A
//! package that is not already installed on the machine is skipped, unless
//! the install check is disabled. Any transport failure or unexpected query
//! status aborts the remaining machines.

use crate::collect::Artifact;
use crate::config::Configuration;
use crate::remote::RemoteExecutor;

/// What happened on one machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineReport {
    pub machine: String,
    /// File names copied over and installed, in collection order.
    pub installed: Vec<String>,
    /// Package names skipped because they were not installed on the machine.
    pub skipped: Vec<String>,
}

/// Distribute the artifacts to every configured machine.
pub fn update_fleet(
    cfg: &Configuration,
    artifacts: &[Artifact],
    remote: &dyn RemoteExecutor,
) -> anyhow::Result<Vec<MachineReport>> {
    let mut reports = Vec::with_capacity(cfg.machines.len());
    for machine in &cfg.machines {
        tracing::info!(machine = %machine, "updating packages");
        let mut to_install = Vec::new();
        let mut skipped = Vec::new();

        for artifact in artifacts {
            let name = artifact.package_name();
            if cfg.skip_install_check || is_package_installed(remote, machine, name)? {
                tracing::info!(machine = %machine, package = %name, "package is installed, updating");
                remote.copy_to(machine, &artifact.path)?;
                to_install.push(artifact.file_name.clone());
            } else {
                tracing::info!(machine = %machine, package = %name, "package is not installed, skipping");
                skipped.push(name.to_string());
            }
        }

        install_packages(remote, machine, &to_install)?;
        reports.push(MachineReport {
            machine: machine.clone(),
            installed: to_install,
            skipped,
        });
    }
    Ok(reports)
}

/// Issue the batched install command for `file_names`, or nothing when the
/// batch is empty.
fn install_packages(
    remote: &dyn RemoteExecutor,
    machine: &str,
    file_names: &[String],
) -> anyhow::Result<()> {
    if file_names.is_empty() {
        tracing::info!(machine = %machine, "no packages to install");
        return Ok(());
    }

    let command = format!("dpkg --install {}", file_names.join(" "));
    let status = remote.run_command(machine, &command)?;
    if status != 0 {
        anyhow::bail!("Installing packages on {machine} failed with exit status {status}");
    }
    Ok(())
}

/// Ask the machine's package database whether `package` is installed.
///
/// `dpkg-query --status` exits 0 for an installed package and 1 for an
/// unknown one; anything else is an unexpected failure.
fn is_package_installed(
    remote: &dyn RemoteExecutor,
    machine: &str,
    package: &str,
) -> anyhow::Result<bool> {
    let status = remote.run_command_quiet(machine, &format!("dpkg-query --status {package}"))?;
    match status {
        0 => Ok(true),
        1 => Ok(false),
        other => anyhow::bail!(
            "Unexpected exit status {other} while checking for {package} on {machine}"
        ),
    }
}

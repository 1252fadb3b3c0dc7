//! Remote command execution over ssh/scp.

use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use anyhow::Context;

/// Thin transport seam over the remote-shell and remote-copy tools.
///
/// Callers translate exit statuses per their own policy; only spawn failures
/// and signal-terminated remote processes are errors at this layer. The trait
/// exists so tests can substitute a recording fake.
pub trait RemoteExecutor {
    /// Copy a local file to the machine's default remote directory under its
    /// own file name. A non-zero exit status is an error.
    fn copy_to(&self, machine: &str, local: &Path) -> anyhow::Result<()>;

    /// Run a shell command on the machine, inheriting the operator's
    /// terminal, and return its exit status.
    fn run_command(&self, machine: &str, command: &str) -> anyhow::Result<i32>;

    /// As [`run_command`](Self::run_command) but with remote output
    /// suppressed; used for probes whose exit status is the answer.
    fn run_command_quiet(&self, machine: &str, command: &str) -> anyhow::Result<i32>;
}

/// [`RemoteExecutor`] backed by the `ssh` and `scp` binaries.
#[derive(Debug)]
pub struct SshExecutor {
    ssh_config: Option<PathBuf>,
}

impl SshExecutor {
    pub fn new(ssh_config: Option<PathBuf>) -> Self {
        Self { ssh_config }
    }

    fn command(&self, program: &str) -> Command {
        let mut cmd = Command::new(program);
        if let Some(config) = &self.ssh_config {
            cmd.arg("-F").arg(config);
        }
        cmd
    }

    fn run(&self, machine: &str, command: &str, quiet: bool) -> anyhow::Result<i32> {
        let mut cmd = self.command("ssh");
        cmd.arg(machine).arg(command);
        if quiet {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }
        tracing::debug!(machine = %machine, command = %command, "running remote command");
        let status = cmd
            .status()
            .with_context(|| format!("Failed to run ssh for {machine}"))?;
        exit_code(status)
    }
}

impl RemoteExecutor for SshExecutor {
    fn copy_to(&self, machine: &str, local: &Path) -> anyhow::Result<()> {
        let file_name = local
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                anyhow::anyhow!("Local path has no valid file name: {}", local.display())
            })?;

        let mut cmd = self.command("scp");
        cmd.arg(local).arg(format!("{machine}:{file_name}"));
        tracing::debug!(machine = %machine, file = %file_name, "copying file");
        let status = cmd
            .status()
            .with_context(|| format!("Failed to run scp for {machine}"))?;
        if !status.success() {
            anyhow::bail!(
                "Copying {} to {} failed with {}",
                local.display(),
                machine,
                status
            );
        }
        Ok(())
    }

    fn run_command(&self, machine: &str, command: &str) -> anyhow::Result<i32> {
        self.run(machine, command, false)
    }

    fn run_command_quiet(&self, machine: &str, command: &str) -> anyhow::Result<i32> {
        self.run(machine, command, true)
    }
}

fn exit_code(status: ExitStatus) -> anyhow::Result<i32> {
    status
        .code()
        .ok_or_else(|| anyhow::anyhow!("Remote command was terminated by a signal"))
}

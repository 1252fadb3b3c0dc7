//! debfleet - build and update Debian packages on a fleet of machines
//!
//! Usage:
//!   debfleet -m lab -i builder:latest pkg/foo pkg/bar
//!   debfleet -b -c -m h1,h2 pkg/foo       # distribute prebuilt .deb files

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{CommandFactory, FromArgMatches, Parser, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use debfleet_core::build::DockerBuilder;
use debfleet_core::collect::collect_artifacts;
use debfleet_core::config::{self, MachineGroups, ResolveOptions};
use debfleet_core::remote::SshExecutor;
use debfleet_core::update::update_fleet;

#[derive(Parser)]
#[command(name = "debfleet")]
#[command(version, about = "Build and update Debian packages on a fleet of machines")]
#[command(long_about = "Build and update Debian packages on a fleet of machines.\n\n\
    Builds the packages for each FOLDER via Docker, copies them over to the \
    configured machines and updates them there. Packages are only updated: a \
    package that is not installed on a target machine is skipped (disable the \
    check with -c). Run anywhere inside a git repository; FOLDER is relative \
    to the repository root.")]
struct Cli {
    /// Source folders to build (or, with -b, search) packages for, relative
    /// to the repository root. A folder can produce more than one package.
    #[arg(value_name = "FOLDER", required = true)]
    folders: Vec<String>,

    /// Machines to update: a configured group name or a comma-separated host
    /// list [env: UP_MACHINES]
    #[arg(short, long, value_name = "STR")]
    machines: Option<String>,

    /// Docker image used to build the packages [env: UP_DOCKER_IMAGE]
    #[arg(short = 'i', long, value_name = "IMG")]
    docker_image: Option<String>,

    /// Alternate ssh configuration file, passed to ssh and scp via -F
    /// [env: UP_SSH_CONFIG]
    #[arg(long, value_name = "PATH")]
    ssh_config: Option<PathBuf>,

    /// Prefix prepended to every resolved hostname
    #[arg(short, long, default_value = "")]
    prefix: String,

    /// Repository root; found by searching upwards for a .git directory when
    /// omitted
    #[arg(long, value_name = "PATH")]
    repository_root: Option<PathBuf>,

    /// Skip the package build and scan the folders for existing .deb files
    /// instead. Make sure to clean up previously built packages!
    #[arg(short = 'b', long)]
    skip_package_build: bool,

    /// Skip the check whether a package is installed on the machines
    #[arg(short = 'c', long)]
    skip_install_check: bool,

    /// Log level for diagnostic output
    #[arg(short = 'l', long, value_name = "LEVEL", default_value = "info")]
    log_level: LogLevel,
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

fn group_listing(groups: &MachineGroups) -> String {
    let mut lines = vec!["These are the configured machine groups:".to_string()];
    for (name, hosts) in groups.iter() {
        lines.push(format!("  {}: {}", name, hosts.join(",")));
    }
    lines.join("\n")
}

fn main() -> Result<()> {
    let groups = MachineGroups::load()?;
    let matches = Cli::command()
        .after_help(group_listing(&groups))
        .get_matches();
    let cli = Cli::from_arg_matches(&matches)?;

    // RUST_LOG, when set, overrides the --log-level default.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(cli.log_level.as_directive())
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let opts = ResolveOptions {
        folders: cli.folders,
        machines: cli.machines,
        docker_image: cli.docker_image,
        ssh_config: cli.ssh_config,
        prefix: cli.prefix,
        repository_root: cli.repository_root,
        skip_build: cli.skip_package_build,
        skip_install_check: cli.skip_install_check,
    };
    let cwd = std::env::current_dir().context("Failed to determine working directory")?;
    let cfg = config::resolve(opts, |name| std::env::var(name).ok(), &groups, &cwd)?;
    tracing::debug!(configuration = ?cfg, "resolved configuration");

    let builder = DockerBuilder::new(cfg.docker_image.clone());
    let artifacts = collect_artifacts(&cfg, &builder)?;

    let remote = SshExecutor::new(cfg.ssh_config.clone());
    let reports = update_fleet(&cfg, &artifacts, &remote)?;

    for report in &reports {
        if report.installed.is_empty() {
            println!("• {}: nothing to install", report.machine);
        } else {
            println!(
                "✓ {}: installed {}",
                report.machine,
                report.installed.join(", ")
            );
        }
        for name in &report.skipped {
            println!("  skipped {name} (not installed)");
        }
    }

    Ok(())
}

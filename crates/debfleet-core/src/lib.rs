//! debfleet core library
//!
//! Builds Debian packages from repository source folders inside a Docker
//! container and updates them on a fleet of machines over ssh/scp. Packages
//! are only updated, not freshly installed: a machine that does not already
//! carry a package is skipped unless the install check is disabled.

pub mod build;
pub mod collect;
pub mod config;
pub mod remote;
pub mod repo;
pub mod update;

//! Named machine groups.
//!
//! A machine group is an alias for a fixed list of target hostnames, so a
//! fleet can be addressed as `--machines lab` instead of spelling out every
//! host. Built-in groups can be extended or replaced through an optional
//! `debfleet.toml` in the platform configuration directory:
//!
//! ```toml
//! # ~/.config/debfleet/debfleet.toml
//! [groups]
//! lab = ["lab1", "lab2", "lab3"]
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
struct GroupsFile {
    #[serde(default)]
    groups: BTreeMap<String, Vec<String>>,
}

/// The table of named machine groups known to this run.
#[derive(Debug, Clone)]
pub struct MachineGroups {
    groups: BTreeMap<String, Vec<String>>,
}

impl MachineGroups {
    /// The groups compiled into the binary.
    pub fn builtin() -> Self {
        Self {
            groups: BTreeMap::from([("single".to_string(), vec!["bsbt1".to_string()])]),
        }
    }

    /// Load the built-in groups merged with the user configuration file in
    /// the platform configuration directory, if one exists.
    pub fn load() -> anyhow::Result<Self> {
        match dirs::config_dir() {
            Some(base) => Self::load_from(&base.join("debfleet").join("debfleet.toml")),
            None => Ok(Self::builtin()),
        }
    }

    /// Load the built-in groups merged with the `[groups]` table of the file
    /// at `path`. A missing file is not an error; a file entry reusing a
    /// built-in name replaces that entry.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let mut table = Self::builtin();
        if !path.exists() {
            return Ok(table);
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read machine group file: {}", path.display()))?;
        let file: GroupsFile = toml::from_str(&content)
            .with_context(|| format!("Failed to parse machine group file: {}", path.display()))?;
        for (name, hosts) in file.groups {
            table.groups.insert(name, hosts);
        }
        Ok(table)
    }

    /// Resolve a `--machines` value: a known group name yields the group's
    /// hosts, anything else is treated as a comma-separated host list.
    pub fn resolve(&self, value: &str) -> Vec<String> {
        match self.groups.get(value) {
            Some(hosts) => hosts.clone(),
            None => value.split(',').map(str::to_string).collect(),
        }
    }

    /// Iterate over the configured groups, sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.groups
            .iter()
            .map(|(name, hosts)| (name.as_str(), hosts.as_slice()))
    }
}

//! Tests for artifact collection in both build and skip-build modes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use debfleet_core::build::{BuildOutput, PackageBuilder};
use debfleet_core::collect::collect_artifacts;
use debfleet_core::config::Configuration;
use tempfile::TempDir;

struct FakeBuilder {
    outputs: HashMap<String, String>,
}

impl PackageBuilder for FakeBuilder {
    fn build(&self, folder: &Path) -> anyhow::Result<BuildOutput> {
        let name = folder.file_name().unwrap().to_str().unwrap();
        let stdout = self
            .outputs
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("unexpected build of {name}"))?;
        Ok(BuildOutput {
            stdout,
            stderr: String::new(),
        })
    }
}

struct FailingBuilder;

impl PackageBuilder for FailingBuilder {
    fn build(&self, _folder: &Path) -> anyhow::Result<BuildOutput> {
        anyhow::bail!("build exploded");
    }
}

fn config(root: &Path, folders: &[&str], skip_build: bool) -> Configuration {
    Configuration {
        repository_root: root.to_path_buf(),
        docker_image: "builder:latest".to_string(),
        folders: folders.iter().map(|f| f.to_string()).collect(),
        machines: vec!["h1".to_string()],
        ssh_config: None,
        skip_build,
        skip_install_check: false,
    }
}

fn touch(path: &Path) {
    std::fs::write(path, b"").unwrap();
}

#[test]
fn build_mode_joins_announced_files_onto_folder_paths() {
    let builder = FakeBuilder {
        outputs: HashMap::from([(
            "pkg".to_string(),
            "foo\nPKG_FILE=a_1_amd64.deb\nbar\nPKG_FILE=b_1_amd64.deb\n".to_string(),
        )]),
    };
    let cfg = config(Path::new("/repo"), &["pkg"], false);

    let artifacts = collect_artifacts(&cfg, &builder).unwrap();

    assert_eq!(
        artifacts.iter().map(|a| a.path.clone()).collect::<Vec<_>>(),
        vec![
            PathBuf::from("/repo/pkg/a_1_amd64.deb"),
            PathBuf::from("/repo/pkg/b_1_amd64.deb"),
        ]
    );
}

#[test]
fn build_mode_keeps_folder_order() {
    let builder = FakeBuilder {
        outputs: HashMap::from([
            ("second".to_string(), "PKG_FILE=s_1_amd64.deb\n".to_string()),
            ("first".to_string(), "PKG_FILE=f_1_amd64.deb\n".to_string()),
        ]),
    };
    let cfg = config(Path::new("/repo"), &["second", "first"], false);

    let artifacts = collect_artifacts(&cfg, &builder).unwrap();

    assert_eq!(
        artifacts
            .iter()
            .map(|a| a.file_name.clone())
            .collect::<Vec<_>>(),
        vec!["s_1_amd64.deb", "f_1_amd64.deb"]
    );
}

#[test]
fn build_failure_aborts_without_partial_results() {
    let cfg = config(Path::new("/repo"), &["pkg"], false);
    assert!(collect_artifacts(&cfg, &FailingBuilder).is_err());
}

#[test]
fn skip_build_scans_for_deb_files_sorted_by_name() {
    let temp = TempDir::new().unwrap();
    let folder = temp.path().join("pkg");
    std::fs::create_dir(&folder).unwrap();
    touch(&folder.join("zeta_1_amd64.deb"));
    touch(&folder.join("alpha_1_amd64.deb"));
    touch(&folder.join("README.md"));
    touch(&folder.join("notes.txt"));

    let cfg = config(temp.path(), &["pkg"], true);
    let artifacts = collect_artifacts(&cfg, &FailingBuilder).unwrap();

    assert_eq!(
        artifacts
            .iter()
            .map(|a| a.file_name.clone())
            .collect::<Vec<_>>(),
        vec!["alpha_1_amd64.deb", "zeta_1_amd64.deb"]
    );
}

#[test]
fn skip_build_ignores_deb_directories() {
    let temp = TempDir::new().unwrap();
    let folder = temp.path().join("pkg");
    std::fs::create_dir_all(folder.join("nested.deb")).unwrap();
    touch(&folder.join("real_1_amd64.deb"));

    let cfg = config(temp.path(), &["pkg"], true);
    let artifacts = collect_artifacts(&cfg, &FailingBuilder).unwrap();

    assert_eq!(artifacts.len(), 1);
    assert_eq!(artifacts[0].file_name, "real_1_amd64.deb");
}

#[test]
fn skip_build_errors_on_missing_folder() {
    let temp = TempDir::new().unwrap();
    let cfg = config(temp.path(), &["no-such-folder"], true);

    let err = collect_artifacts(&cfg, &FailingBuilder).unwrap_err();
    assert!(err.to_string().contains("Failed to read package folder"));
}

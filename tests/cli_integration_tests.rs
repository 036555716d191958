// CLI surface: usage errors, dry runs, status and configuration layering

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn srs_provision(workdir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("srs-provision").unwrap();
    cmd.current_dir(workdir.path()).env("RUST_LOG", "warn");
    cmd
}

fn write_config(workdir: &TempDir, source_dir: &std::path::Path) -> std::path::PathBuf {
    let path = workdir.path().join("provision.toml");
    fs::write(
        &path,
        format!(
            "[build]\nsource_dir = \"{}\"\njobs = 2\n",
            source_dir.display()
        ),
    )
    .unwrap();
    path
}

#[test]
fn test_deploy_without_revision_prints_usage() {
    let workdir = TempDir::new().unwrap();
    srs_provision(&workdir)
        .arg("deploy")
        .assert()
        .code(1)
        .stdout(predicate::str::diff("usage: srs-provision deploy <commit-hash>\n"));
}

#[test]
fn test_deploy_with_extra_arguments_prints_usage() {
    let workdir = TempDir::new().unwrap();
    srs_provision(&workdir)
        .args(["deploy", "abc123", "def456"])
        .assert()
        .code(1)
        .stdout(predicate::str::starts_with("usage: srs-provision deploy"));
}

#[test]
fn test_bootstrap_argument_count_is_enforced() {
    let workdir = TempDir::new().unwrap();
    for args in [
        vec!["bootstrap"],
        vec!["bootstrap", "token", "user"],
        vec!["bootstrap", "token", "user", "pass", "extra"],
    ] {
        srs_provision(&workdir)
            .args(&args)
            .assert()
            .code(1)
            .stdout(predicate::str::contains(
                "usage: srs-provision bootstrap <access-token> <registry-username> <registry-password>",
            ));
    }
}

#[test]
fn test_bootstrap_dry_run_hides_credentials() {
    let workdir = TempDir::new().unwrap();
    srs_provision(&workdir)
        .env("SUDO_USER", "alice")
        .args(["--dry-run", "bootstrap", "ghp_s3cr3t", "alice", "hunter2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("usermod -aG docker alice"))
        .stdout(predicate::str::contains("docker login -u alice --password-stdin"))
        .stdout(predicate::str::contains("[REDACTED]"))
        .stdout(predicate::str::contains("ghp_s3cr3t").not())
        .stdout(predicate::str::contains("hunter2").not());
}

#[test]
fn test_deploy_dry_run_lists_steps_and_touches_nothing() {
    let workdir = TempDir::new().unwrap();
    let source_dir = workdir.path().join("src");
    let config = write_config(&workdir, &source_dir);

    srs_provision(&workdir)
        .arg("--config")
        .arg(&config)
        .args(["deploy", "--dry-run", "release_22_04"])
        .assert()
        .success()
        .stdout(predicate::str::contains("clone source"))
        .stdout(predicate::str::contains("git checkout release_22_04"))
        .stdout(predicate::str::contains("make -j2"))
        .stdout(predicate::str::contains("write completion marker"));

    assert!(!source_dir.exists());
}

#[test]
fn test_deploy_with_marker_skips_everything() {
    let workdir = TempDir::new().unwrap();
    let source_dir = workdir.path().join("src");
    fs::create_dir_all(&source_dir).unwrap();
    fs::write(source_dir.join("srs-setup-complete"), "").unwrap();
    let config = write_config(&workdir, &source_dir);

    srs_provision(&workdir)
        .arg("--config")
        .arg(&config)
        .args(["deploy", "abc123"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already deployed; not running again"));

    assert!(!source_dir.join("srsran").exists());
}

#[test]
fn test_status_reports_marker_as_json() {
    let workdir = TempDir::new().unwrap();
    let source_dir = workdir.path().join("src");
    let config = write_config(&workdir, &source_dir);

    let output = srs_provision(&workdir)
        .arg("--config")
        .arg(&config)
        .args(["status", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["marker"], "NotDone");
    assert_eq!(report["checkout_present"], false);
    assert_eq!(
        report["marker_path"],
        source_dir.join("srs-setup-complete").display().to_string()
    );
}

#[test]
fn test_environment_overrides_config_file() {
    let workdir = TempDir::new().unwrap();
    let from_file = workdir.path().join("from-file");
    let from_env = workdir.path().join("from-env");
    let config = write_config(&workdir, &from_file);

    srs_provision(&workdir)
        .env("SRS_PROVISION_BUILD__SOURCE_DIR", &from_env)
        .arg("--config")
        .arg(&config)
        .args(["status", "--show-config"])
        .assert()
        .success()
        .stdout(predicate::str::contains(from_env.display().to_string()))
        .stdout(predicate::str::contains("[build]"));
}

#[test]
fn test_missing_config_file_is_an_error() {
    let workdir = TempDir::new().unwrap();
    srs_provision(&workdir)
        .args(["--config", "does-not-exist.toml", "status"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("configuration"));
}

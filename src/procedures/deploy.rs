//! Component build & install procedure.
//!
//! Clones srsRAN at a pinned revision, builds and installs it, installs its
//! service configuration, overlays local configuration files and finally
//! writes the completion marker. A present marker turns the whole run into a
//! no-op.

use std::path::PathBuf;
use tracing::info;

use super::{apt_install, apt_update, expect_args, UsageError};
use crate::config::ProvisionConfig;
use crate::external::Invocation;
use crate::marker::{self, MarkerStatus};
use crate::workflows::{Pipeline, ProvisionError, RunReport, Step, StepAction, StepContext};

pub const USAGE: &str = "srs-provision deploy <commit-hash>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployArgs {
    /// Commit hash, tag or branch to build
    pub revision: String,
}

impl DeployArgs {
    pub fn from_positional(args: &[String]) -> Result<Self, UsageError> {
        let [revision] = expect_args::<1>(args, USAGE)?;
        if revision.trim().is_empty() {
            return Err(UsageError { usage: USAGE });
        }
        Ok(Self {
            revision: revision.trim().to_string(),
        })
    }
}

#[derive(Debug)]
pub enum DeployOutcome {
    AlreadyDeployed { marker: PathBuf },
    Deployed { marker: PathBuf, report: RunReport },
}

pub fn plan(config: &ProvisionConfig, args: &DeployArgs) -> Pipeline {
    let build = &config.build;
    let sudo = config.use_sudo;
    let checkout_dir = build.checkout_dir();
    let build_dir = build.build_dir();

    let mut pipeline = Pipeline::new("deploy");

    if !build.build_packages.is_empty() {
        pipeline
            .push(Step::run("refresh package index", apt_update(sudo)))
            .push(Step::run(
                "install build dependencies",
                apt_install(&build.build_packages, sudo),
            ));
    }

    pipeline
        .push(Step::new(
            "create source directory",
            StepAction::CreateDir(build.source_dir.clone()),
        ))
        .push(Step::new(
            "clone source",
            StepAction::Clone {
                url: build.repo_url.clone(),
                dest: checkout_dir.clone(),
                token: None,
                on_existing: build.stale_checkout,
            },
        ))
        .push(Step::new(
            "checkout revision",
            StepAction::Checkout {
                repo_dir: checkout_dir,
                revision: args.revision.clone(),
            },
        ))
        .push(Step::new(
            "create build directory",
            StepAction::CreateDir(build_dir.clone()),
        ))
        .push(Step::run(
            "configure build",
            Invocation::new("cmake", [".."]).in_dir(&build_dir),
        ))
        .push(Step::run(
            "compile",
            Invocation::new("make", [format!("-j{}", config.compile_jobs())]).in_dir(&build_dir),
        ))
        .push(Step::run(
            "install artifacts",
            Invocation::new("make", ["install"])
                .in_dir(&build_dir)
                .privileged(sudo),
        ))
        .push(Step::run(
            "refresh linker cache",
            Invocation::new("ldconfig", Vec::<String>::new()).privileged(sudo),
        ))
        .push(Step::run(
            "install service configuration",
            Invocation::new(&build.config_installer, build.config_installer_args.clone())
                .privileged(sudo),
        ))
        .push(Step::new(
            "overlay local configuration",
            StepAction::CopyOverlay {
                from: build.overlay_dir.clone(),
                to: build.installed_config_dir.clone(),
            },
        ))
        .push(Step::new(
            "write completion marker",
            StepAction::WriteMarker {
                path: build.marker_path(),
                note: format!("srsRAN {}", args.revision),
            },
        ));

    pipeline
}

pub async fn run(
    config: &ProvisionConfig,
    args: &DeployArgs,
    ctx: &StepContext,
) -> Result<DeployOutcome, ProvisionError> {
    let marker_path = config.build.marker_path();

    if marker::check(ctx.fs.as_ref(), &marker_path) == MarkerStatus::AlreadyDone {
        println!("✅ srsRAN already deployed; not running again");
        println!("   Remove {} to force a rebuild", marker_path.display());
        info!(marker = %marker_path.display(), "Completion marker present; skipping deploy");
        return Ok(DeployOutcome::AlreadyDeployed {
            marker: marker_path,
        });
    }

    info!(revision = %args.revision, repo = %config.build.repo_url, "Deploying srsRAN");
    let report = plan(config, args).run(ctx).await?;

    Ok(DeployOutcome::Deployed {
        marker: marker_path,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> DeployArgs {
        DeployArgs {
            revision: "release_22_04".to_string(),
        }
    }

    #[test]
    fn test_positional_parsing() {
        let parsed = DeployArgs::from_positional(&["abc123".to_string()]).unwrap();
        assert_eq!(parsed.revision, "abc123");

        assert!(DeployArgs::from_positional(&[]).is_err());
        assert!(DeployArgs::from_positional(&["a".to_string(), "b".to_string()]).is_err());
        assert!(DeployArgs::from_positional(&["  ".to_string()]).is_err());
    }

    #[test]
    fn test_plan_order_ends_with_marker() {
        let pipeline = plan(&ProvisionConfig::default(), &args());
        let names: Vec<&str> = pipeline.steps.iter().map(|s| s.name.as_str()).collect();

        assert_eq!(
            names,
            vec![
                "refresh package index",
                "install build dependencies",
                "create source directory",
                "clone source",
                "checkout revision",
                "create build directory",
                "configure build",
                "compile",
                "install artifacts",
                "refresh linker cache",
                "install service configuration",
                "overlay local configuration",
                "write completion marker",
            ]
        );
    }

    #[test]
    fn test_plan_skips_dependencies_when_list_empty() {
        let mut config = ProvisionConfig::default();
        config.build.build_packages.clear();
        let pipeline = plan(&config, &args());
        assert_eq!(pipeline.steps[0].name, "create source directory");
    }

    #[test]
    fn test_compile_uses_configured_jobs() {
        let mut config = ProvisionConfig::default();
        config.build.jobs = Some(6);
        let pipeline = plan(&config, &args());
        let compile = pipeline.steps.iter().find(|s| s.name == "compile").unwrap();
        assert!(compile.describe().contains("make -j6"));
    }

    #[test]
    fn test_privileged_steps_use_sudo_when_configured() {
        let mut config = ProvisionConfig::default();
        config.use_sudo = true;
        let plan_lines = plan(&config, &args()).describe();

        assert!(plan_lines.iter().any(|l| l.contains("sudo make install")));
        assert!(plan_lines.iter().any(|l| l.contains("sudo ldconfig")));
        assert!(plan_lines
            .iter()
            .any(|l| l.contains("sudo srsran_install_configs.sh service")));
        // Compilation itself never runs as root
        assert!(plan_lines
            .iter()
            .any(|l| l.starts_with("compile: make -j")));
    }
}

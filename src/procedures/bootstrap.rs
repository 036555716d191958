//! Host bootstrap procedure.
//!
//! Installs the container runtime from its upstream package source, grants
//! the invoking user access to it, clones the auxiliary repositories with
//! the supplied token and logs in to the container registry.

use super::{apt_install, apt_update, expect_args, UsageError};
use crate::config::ProvisionConfig;
use crate::credentials::{AccessToken, RegistryCredentials};
use crate::external::Invocation;
use crate::workflows::{Pipeline, ProvisionError, RunReport, Step, StepAction, StepContext};
use tracing::info;

pub const USAGE: &str =
    "srs-provision bootstrap <access-token> <registry-username> <registry-password>";

#[derive(Debug, Clone)]
pub struct BootstrapArgs {
    pub token: AccessToken,
    pub registry: RegistryCredentials,
}

impl BootstrapArgs {
    pub fn from_positional(args: &[String]) -> Result<Self, UsageError> {
        let [token, username, password] = expect_args::<3>(args, USAGE)?;
        Ok(Self {
            token: AccessToken::new(token),
            registry: RegistryCredentials::new(username, password),
        })
    }
}

/// User to add to the runtime group: configured, else the sudo caller, else $USER
pub fn resolve_runtime_user(config: &ProvisionConfig) -> Result<String, ProvisionError> {
    config
        .bootstrap
        .runtime_user
        .clone()
        .or_else(|| std::env::var("SUDO_USER").ok())
        .or_else(|| std::env::var("USER").ok())
        .filter(|user| !user.is_empty())
        .ok_or_else(|| {
            ProvisionError::Config(
                "cannot determine which user to add to the runtime group; set bootstrap.runtime_user"
                    .to_string(),
            )
        })
}

pub fn plan(config: &ProvisionConfig, args: &BootstrapArgs, runtime_user: &str) -> Pipeline {
    let bootstrap = &config.bootstrap;
    let sudo = config.use_sudo;
    let keyring = bootstrap.keyring_path.display().to_string();

    let mut pipeline = Pipeline::new("bootstrap");
    pipeline
        .push(Step::run("refresh package index", apt_update(sudo)))
        .push(Step::run(
            "install prerequisites",
            apt_install(&bootstrap.prerequisite_packages, sudo),
        ));

    if let Some(keyring_dir) = bootstrap.keyring_path.parent() {
        pipeline.push(Step::run(
            "create keyring directory",
            Invocation::new(
                "install",
                ["-m".to_string(), "0755".to_string(), "-d".to_string(), keyring_dir.display().to_string()],
            )
            .privileged(sudo),
        ));
    }

    pipeline
        .push(Step::new(
            "import runtime signing key",
            StepAction::Pipe {
                from: Invocation::new("curl", ["-fsSL", bootstrap.runtime_key_url.as_str()]).captured(),
                into: Invocation::new("gpg", ["--batch", "--yes", "--dearmor", "-o", keyring.as_str()])
                    .captured()
                    .privileged(sudo),
            },
        ))
        .push(Step::new(
            "register runtime package source",
            StepAction::WriteTemplate {
                path: bootstrap.apt_source_path.clone(),
                template: bootstrap.apt_source_template.replace("{keyring}", &keyring),
                queries: vec![
                    (
                        "arch".to_string(),
                        Invocation::new("dpkg", ["--print-architecture"]).captured(),
                    ),
                    (
                        "codename".to_string(),
                        Invocation::new("lsb_release", ["-cs"]).captured(),
                    ),
                ],
            },
        ))
        .push(Step::run("refresh package index with runtime source", apt_update(sudo)))
        .push(Step::run(
            "install container runtime",
            apt_install(&bootstrap.runtime_packages, sudo),
        ))
        .push(Step::run(
            "grant runtime group membership",
            Invocation::new("usermod", ["-aG", bootstrap.runtime_group.as_str(), runtime_user])
                .privileged(sudo),
        ));

    for repository in &bootstrap.repositories {
        pipeline.push(Step::new(
            format!("clone {}/{}", repository.owner, repository.name),
            StepAction::Clone {
                url: format!(
                    "https://{}/{}/{}.git",
                    bootstrap.git_host, repository.owner, repository.name
                ),
                dest: bootstrap.clone_dir.join(&repository.name),
                token: Some(args.token.clone()),
                on_existing: bootstrap.existing_clone,
            },
        ));
    }

    let mut login_args = vec![
        "login".to_string(),
        "-u".to_string(),
        args.registry.username.clone(),
        "--password-stdin".to_string(),
    ];
    if let Some(registry) = &bootstrap.registry {
        login_args.push(registry.clone());
    }
    pipeline.push(Step::run(
        "registry login",
        Invocation::new("docker", login_args)
            .with_secret_stdin(args.registry.password())
            .captured()
            .privileged(sudo),
    ));

    pipeline
}

pub async fn run(
    config: &ProvisionConfig,
    args: &BootstrapArgs,
    ctx: &StepContext,
) -> Result<RunReport, ProvisionError> {
    let runtime_user = resolve_runtime_user(config)?;
    info!(user = %runtime_user, registry_user = %args.registry.username, "Bootstrapping host");

    let report = plan(config, args, &runtime_user).run(ctx).await?;

    println!(
        "ℹ️  {} was added to the '{}' group; log in again for it to take effect",
        runtime_user, config.bootstrap.runtime_group
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> BootstrapArgs {
        BootstrapArgs::from_positional(&[
            "ghp_token".to_string(),
            "alice".to_string(),
            "pa55word".to_string(),
        ])
        .unwrap()
    }

    #[test]
    fn test_requires_exactly_three_arguments() {
        let two = vec!["a".to_string(), "b".to_string()];
        let four = vec!["a".to_string(), "b".to_string(), "c".to_string(), "d".to_string()];
        assert_eq!(
            BootstrapArgs::from_positional(&two).unwrap_err().usage,
            USAGE
        );
        assert!(BootstrapArgs::from_positional(&four).is_err());
    }

    #[test]
    fn test_password_only_travels_on_stdin() {
        let pipeline = plan(&ProvisionConfig::default(), &args(), "alice");
        let login = pipeline
            .steps
            .iter()
            .find(|s| s.name == "registry login")
            .unwrap();

        let StepAction::Run(invocation) = &login.action else {
            panic!("registry login should be a plain command");
        };
        assert!(invocation.args.iter().all(|a| !a.contains("pa55word")));
        assert!(invocation.args.contains(&"--password-stdin".to_string()));
        assert!(invocation.stdin.is_some());
    }

    #[test]
    fn test_plan_never_renders_secrets() {
        let pipeline = plan(&ProvisionConfig::default(), &args(), "alice");
        for line in pipeline.describe() {
            assert!(!line.contains("ghp_token"), "token leaked: {line}");
            assert!(!line.contains("pa55word"), "password leaked: {line}");
        }
        assert!(!format!("{pipeline:?}").contains("ghp_token"));
    }

    #[test]
    fn test_clones_each_configured_repository() {
        let config = ProvisionConfig::default();
        let pipeline = plan(&config, &args(), "alice");
        let clones: Vec<&Step> = pipeline
            .steps
            .iter()
            .filter(|s| matches!(s.action, StepAction::Clone { .. }))
            .collect();

        assert_eq!(clones.len(), config.bootstrap.repositories.len());
        for step in clones {
            let StepAction::Clone { url, token, .. } = &step.action else {
                unreachable!()
            };
            assert!(url.starts_with("https://github.com/"));
            assert!(token.is_some());
        }
    }

    #[test]
    fn test_login_targets_configured_registry() {
        let mut config = ProvisionConfig::default();
        config.bootstrap.registry = Some("ghcr.io".to_string());
        let pipeline = plan(&config, &args(), "alice");
        let login = pipeline.steps.last().unwrap();
        assert!(login.describe().ends_with("docker login -u alice --password-stdin ghcr.io < [REDACTED]"));
    }
}

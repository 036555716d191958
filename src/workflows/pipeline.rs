//! Fail-fast step pipeline.
//!
//! A procedure is planned into a `Pipeline` of named steps, then run in
//! order. The first failing step stops the run and is named in the error;
//! nothing is rolled back.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use super::error::ProvisionError;
use crate::config::StaleCheckoutPolicy;
use crate::credentials::AccessToken;
use crate::external::{CommandExecutor, CommandOutput, Invocation};
use crate::fs::FileSystemOperations;
use crate::git::SourceControl;
use crate::marker;
use crate::observability::OperationTimer;

/// Collaborators a pipeline needs to touch the host
#[derive(Clone)]
pub struct StepContext {
    pub executor: Arc<dyn CommandExecutor>,
    pub fs: Arc<dyn FileSystemOperations>,
    pub git: Arc<dyn SourceControl>,
}

impl StepContext {
    pub fn new(
        executor: Arc<dyn CommandExecutor>,
        fs: Arc<dyn FileSystemOperations>,
        git: Arc<dyn SourceControl>,
    ) -> Self {
        Self { executor, fs, git }
    }
}

#[derive(Debug, Clone)]
pub enum StepAction {
    /// Run one command
    Run(Invocation),
    /// Run `run` only when `check` exits non-zero
    RunUnless { check: Invocation, run: Invocation },
    /// Feed the captured stdout of `from` to the stdin of `into`
    Pipe { from: Invocation, into: Invocation },
    /// Render `template` and write it to `path`. Each `{placeholder}` is
    /// replaced by the trimmed stdout of its query command.
    WriteTemplate {
        path: PathBuf,
        template: String,
        queries: Vec<(String, Invocation)>,
    },
    /// Clone a repository, applying `on_existing` if `dest` is already there
    Clone {
        url: String,
        dest: PathBuf,
        token: Option<AccessToken>,
        on_existing: StaleCheckoutPolicy,
    },
    /// Detach HEAD of `repo_dir` at `revision`
    Checkout { repo_dir: PathBuf, revision: String },
    CreateDir(PathBuf),
    /// Copy the files of `from` over those in `to`
    CopyOverlay { from: PathBuf, to: PathBuf },
    WriteMarker { path: PathBuf, note: String },
}

#[derive(Debug, Clone)]
pub struct Step {
    pub name: String,
    pub action: StepAction,
}

impl Step {
    pub fn new(name: impl Into<String>, action: StepAction) -> Self {
        Self {
            name: name.into(),
            action,
        }
    }

    pub fn run(name: impl Into<String>, invocation: Invocation) -> Self {
        Self::new(name, StepAction::Run(invocation))
    }

    /// One-line description for dry runs and logs
    pub fn describe(&self) -> String {
        let detail = match &self.action {
            StepAction::Run(invocation) => invocation.to_string(),
            StepAction::RunUnless { check, run } => format!("{run} (unless {check} succeeds)"),
            StepAction::Pipe { from, into } => format!("{from} | {into}"),
            StepAction::WriteTemplate { path, queries, .. } => {
                let sources: Vec<String> = queries.iter().map(|(_, q)| q.to_string()).collect();
                if sources.is_empty() {
                    format!("write {}", path.display())
                } else {
                    format!("write {} (using {})", path.display(), sources.join(", "))
                }
            }
            StepAction::Clone {
                url,
                dest,
                token,
                on_existing,
            } => format!(
                "git clone {}{} {} (existing: {:?})",
                url,
                if token.is_some() { " [token auth]" } else { "" },
                dest.display(),
                on_existing
            ),
            StepAction::Checkout { repo_dir, revision } => {
                format!("git checkout {revision} (in {})", repo_dir.display())
            }
            StepAction::CreateDir(path) => format!("mkdir -p {}", path.display()),
            StepAction::CopyOverlay { from, to } => {
                format!("copy {}/* -> {}", from.display(), to.display())
            }
            StepAction::WriteMarker { path, .. } => format!("touch {}", path.display()),
        };
        format!("{}: {}", self.name, detail)
    }
}

#[derive(Debug, Clone)]
pub struct StepRecord {
    pub name: String,
    pub duration: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub steps: Vec<StepRecord>,
}

impl RunReport {
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn total_duration(&self) -> Duration {
        self.steps.iter().map(|s| s.duration).sum()
    }
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    pub name: String,
    pub steps: Vec<Step>,
}

impl Pipeline {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    pub fn push(&mut self, step: Step) -> &mut Self {
        self.steps.push(step);
        self
    }

    pub fn describe(&self) -> Vec<String> {
        self.steps.iter().map(Step::describe).collect()
    }

    /// Run every step in order, stopping at the first failure
    pub async fn run(&self, ctx: &StepContext) -> Result<RunReport, ProvisionError> {
        let mut report = RunReport::default();
        let total = self.steps.len();

        for (index, step) in self.steps.iter().enumerate() {
            println!("▶️  [{}/{}] {}", index + 1, total, step.name);
            info!(pipeline = %self.name, step = %step.name, "{}", step.describe());

            let timer = OperationTimer::new(&step.name);
            if let Err(e) = execute_step(step, ctx).await {
                let elapsed = timer.elapsed();
                error!(
                    pipeline = %self.name,
                    step = %step.name,
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %e,
                    "Step failed; aborting"
                );
                return Err(e);
            }
            report.steps.push(StepRecord {
                name: step.name.clone(),
                duration: timer.finish(),
            });
        }

        Ok(report)
    }
}

fn check_status(step: &str, output: CommandOutput) -> Result<CommandOutput, ProvisionError> {
    if output.success() {
        Ok(output)
    } else {
        Err(ProvisionError::StepFailed {
            step: step.to_string(),
            status: output.status_code,
            detail: output.stderr_tail().map(str::to_string),
        })
    }
}

async fn run_invocation(
    step: &str,
    ctx: &StepContext,
    invocation: &Invocation,
) -> Result<CommandOutput, ProvisionError> {
    let output = ctx
        .executor
        .execute(invocation)
        .await
        .map_err(|source| ProvisionError::Spawn {
            step: step.to_string(),
            source,
        })?;
    check_status(step, output)
}

async fn execute_step(step: &Step, ctx: &StepContext) -> Result<(), ProvisionError> {
    let name = step.name.as_str();
    match &step.action {
        StepAction::Run(invocation) => {
            run_invocation(name, ctx, invocation).await?;
        }
        StepAction::RunUnless { check, run } => {
            let current = ctx
                .executor
                .execute(check)
                .await
                .map_err(|source| ProvisionError::Spawn {
                    step: name.to_string(),
                    source,
                })?;
            if current.success() {
                info!(step = name, check = %check, "Already in place; skipping");
            } else {
                run_invocation(name, ctx, run).await?;
            }
        }
        StepAction::Pipe { from, into } => {
            let produced = run_invocation(name, ctx, from).await?;
            let consumer = into.clone().with_piped_stdin(produced.stdout);
            run_invocation(name, ctx, &consumer).await?;
        }
        StepAction::WriteTemplate {
            path,
            template,
            queries,
        } => {
            let mut rendered = template.clone();
            for (placeholder, query) in queries {
                let output = run_invocation(name, ctx, query).await?;
                rendered = rendered.replace(&format!("{{{placeholder}}}"), output.stdout_text().trim());
            }
            if let Some(parent) = path.parent() {
                ctx.fs
                    .create_dir_all(parent)
                    .await
                    .map_err(|e| ProvisionError::step(name, e))?;
            }
            ctx.fs
                .write(path, rendered.as_bytes())
                .await
                .map_err(|e| ProvisionError::step(name, e))?;
        }
        StepAction::Clone {
            url,
            dest,
            token,
            on_existing,
        } => {
            clone_with_policy(name, ctx, url, dest, token.clone(), *on_existing).await?;
        }
        StepAction::Checkout { repo_dir, revision } => {
            let git = Arc::clone(&ctx.git);
            let (repo_dir, revision) = (repo_dir.clone(), revision.clone());
            let resolved = tokio::task::spawn_blocking(move || {
                git.checkout_revision(&repo_dir, &revision)
            })
            .await
            .map_err(|e| ProvisionError::step(name, e.into()))?
            .map_err(|e| ProvisionError::step(name, e))?;
            info!(step = name, commit = %resolved, "Checked out pinned revision");
        }
        StepAction::CreateDir(path) => {
            ctx.fs
                .create_dir_all(path)
                .await
                .map_err(|e| ProvisionError::step(name, e))?;
        }
        StepAction::CopyOverlay { from, to } => {
            let written = ctx
                .fs
                .copy_dir_contents(from, to)
                .await
                .map_err(|e| ProvisionError::step(name, e))?;
            info!(step = name, files = written.len(), "Copied configuration overlay");
        }
        StepAction::WriteMarker { path, note } => {
            marker::mark_complete(ctx.fs.as_ref(), path, note)
                .await
                .map_err(|e| ProvisionError::step(name, e))?;
        }
    }
    Ok(())
}

async fn clone_with_policy(
    name: &str,
    ctx: &StepContext,
    url: &str,
    dest: &std::path::Path,
    token: Option<AccessToken>,
    on_existing: StaleCheckoutPolicy,
) -> Result<(), ProvisionError> {
    let occupied = ctx
        .fs
        .is_non_empty_dir(dest)
        .await
        .map_err(|e| ProvisionError::step(name, e))?;

    let reuse = if occupied {
        match on_existing {
            StaleCheckoutPolicy::Fail => {
                return Err(ProvisionError::StaleCheckout {
                    step: name.to_string(),
                    dir: dest.to_path_buf(),
                });
            }
            StaleCheckoutPolicy::Remove => {
                warn!(dir = %dest.display(), "Removing checkout left by an earlier run");
                ctx.fs
                    .remove_dir_all(dest)
                    .await
                    .map_err(|e| ProvisionError::step(name, e))?;
                false
            }
            StaleCheckoutPolicy::Reuse => {
                if ctx.git.is_repository(dest) {
                    true
                } else {
                    return Err(ProvisionError::Step {
                        step: name.to_string(),
                        message: format!(
                            "{} exists but is not a git repository; cannot reuse it",
                            dest.display()
                        ),
                    });
                }
            }
        }
    } else {
        false
    };

    let git = Arc::clone(&ctx.git);
    let (url, dest) = (url.to_string(), dest.to_path_buf());
    tokio::task::spawn_blocking(move || {
        if reuse {
            info!(dir = %dest.display(), "Reusing existing checkout; fetching");
            git.fetch(&dest, token.as_ref())
        } else {
            git.clone_repo(&url, &dest, token.as_ref())
        }
    })
    .await
    .map_err(|e| ProvisionError::step(name, e.into()))?
    .map_err(|e| ProvisionError::step(name, e))
}

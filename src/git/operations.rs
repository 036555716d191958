use anyhow::{Context, Result};
use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{Cred, FetchOptions, RemoteCallbacks, Repository};
use std::path::Path;

use crate::credentials::AccessToken;

/// Trait defining the git operations the provisioning procedures need
pub trait SourceControl: Send + Sync {
    /// Clone `url` into `dest` (replaces `git clone`)
    fn clone_repo(&self, url: &str, dest: &Path, token: Option<&AccessToken>) -> Result<()>;

    /// Detach HEAD at `revision` and update the working tree (replaces `git checkout <rev>`)
    ///
    /// `revision` may be a full or abbreviated commit hash, a tag or a branch.
    fn checkout_revision(&self, repo_dir: &Path, revision: &str) -> Result<String>;

    /// Fetch all refs from `origin` (replaces `git fetch`)
    fn fetch(&self, repo_dir: &Path, token: Option<&AccessToken>) -> Result<()>;

    /// Whether `dir` holds a repository that can be opened
    fn is_repository(&self, dir: &Path) -> bool;
}

/// Implementation of SourceControl using git2
#[derive(Debug, Default)]
pub struct Git2Operations;

impl Git2Operations {
    pub fn new() -> Self {
        Self
    }

    fn callbacks(token: Option<&AccessToken>) -> RemoteCallbacks<'_> {
        let mut callbacks = RemoteCallbacks::new();
        if let Some(token) = token {
            // GitHub accepts a token as the password for any username
            callbacks.credentials(move |_url, _username_from_url, _allowed_types| {
                Cred::userpass_plaintext("x-access-token", token.expose())
            });
        }
        callbacks
    }

    fn fetch_options(token: Option<&AccessToken>) -> FetchOptions<'_> {
        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(Self::callbacks(token));
        fetch_options
    }
}

impl SourceControl for Git2Operations {
    fn clone_repo(&self, url: &str, dest: &Path, token: Option<&AccessToken>) -> Result<()> {
        RepoBuilder::new()
            .fetch_options(Self::fetch_options(token))
            .clone(url, dest)
            .with_context(|| format!("Failed to clone {url} into {}", dest.display()))?;
        Ok(())
    }

    fn checkout_revision(&self, repo_dir: &Path, revision: &str) -> Result<String> {
        let repo = Repository::open(repo_dir)
            .with_context(|| format!("Failed to open git repository at {}", repo_dir.display()))?;

        let object = repo
            .revparse_single(revision)
            .or_else(|_| repo.revparse_single(&format!("origin/{revision}")))
            .with_context(|| format!("Revision '{revision}' not found"))?;
        let commit = object
            .peel_to_commit()
            .with_context(|| format!("Revision '{revision}' does not name a commit"))?;

        let mut checkout = CheckoutBuilder::new();
        checkout.force();
        repo.checkout_tree(commit.as_object(), Some(&mut checkout))
            .with_context(|| format!("Failed to check out tree of {revision}"))?;
        repo.set_head_detached(commit.id())?;

        Ok(commit.id().to_string())
    }

    fn fetch(&self, repo_dir: &Path, token: Option<&AccessToken>) -> Result<()> {
        let repo = Repository::open(repo_dir)
            .with_context(|| format!("Failed to open git repository at {}", repo_dir.display()))?;
        let mut remote = repo
            .find_remote("origin")
            .context("Remote 'origin' not found")?;

        let mut fetch_options = Self::fetch_options(token);
        remote
            .fetch(
                &["+refs/heads/*:refs/remotes/origin/*", "+refs/tags/*:refs/tags/*"],
                Some(&mut fetch_options),
                None,
            )
            .context("Failed to fetch from origin")?;
        Ok(())
    }

    fn is_repository(&self, dir: &Path) -> bool {
        Repository::open(dir).is_ok()
    }
}

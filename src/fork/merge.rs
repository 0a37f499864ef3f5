//! Reconciliation of a [Fork]: merging remote A into the checkout and publishing it to remote B.

use super::Fork;
use crate::{
    constants::{FALLBACK_SIGNATURE_EMAIL, FALLBACK_SIGNATURE_NAME},
    errors::{KagamiError, KagamiResult},
    git::{self, RepositoryExt},
};
use git2::{build::CheckoutBuilder, Oid, RepositoryState};
use itertools::Itertools;
use std::{path::Path, process::Command};
use tracing::{debug, info, warn};

/// The result of merging remote A into the checkout.
#[derive(Default, Debug, Clone, Eq, PartialEq)]
pub struct MergeOutcome {
    /// Human-readable output of the merge, as a `git merge` invocation would print it.
    pub output: String,
    /// The commit HEAD moved to, if the merge moved it. [None] for dry runs and no-ops.
    pub commit: Option<Oid>,
    /// Whether HEAD was fast-forwarded rather than given a merge commit.
    pub fast_forward: bool,
    /// Whether the checkout already contained remote A's tip.
    pub up_to_date: bool,
}

/// A way of merging remote A's tracked branch into a fork's checkout.
///
/// A dry run merges with no-commit, no-fast-forward semantics: the result is staged in the index
/// and the working tree, HEAD does not move, and the in-progress merge is left for inspection.
/// Otherwise the merge fast-forwards when possible, and commits when it applies cleanly.
///
/// Either way, a merge that stops on conflicts fails with [KagamiError::Merge] and leaves the
/// conflict markers in the working tree. Nothing is rolled back.
pub trait MergeBackend {
    /// Merges `fork`'s remote A into its checkout.
    fn merge(&self, fork: &Fork, dry_run: bool) -> KagamiResult<MergeOutcome>;
}

/// Merges in-process, with `libgit2`.
#[derive(Default, Debug, Clone, Copy)]
pub struct NativeMerge;

/// Merges by running `git merge` in the fork's working directory.
#[derive(Debug, Clone)]
pub struct ExternalMerge {
    /// The `git` executable to run.
    program: String,
}

impl Default for ExternalMerge {
    fn default() -> Self {
        Self::new("git")
    }
}

impl ExternalMerge {
    /// Creates an [ExternalMerge] running `program` as `git`.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Builds the `git merge` invocation merging `upstream` in `workdir`.
    fn command(
        &self,
        workdir: &Path,
        upstream: &str,
        dry_run: bool,
        fallback_identity: bool,
    ) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.current_dir(workdir)
            // Never block on a credential prompt.
            .env("GIT_TERMINAL_PROMPT", "0");
        if fallback_identity {
            cmd.arg("-c")
                .arg(format!("user.name={}", FALLBACK_SIGNATURE_NAME))
                .arg("-c")
                .arg(format!("user.email={}", FALLBACK_SIGNATURE_EMAIL));
        }
        cmd.arg("merge");
        if dry_run {
            cmd.args(["--no-commit", "--no-ff"]);
        }
        cmd.arg(upstream);
        cmd
    }
}

impl Fork {
    /// Merges remote A's tracked branch into the checkout with the fork's [MergeBackend].
    ///
    /// ## Takes
    /// - `dry_run` - Stage the merge without committing it.
    ///
    /// ## Returns
    /// - `Ok(MergeOutcome)` - The merge succeeded (or was staged, for a dry run).
    /// - `Err(KagamiError::Merge)` - The merge failed or stopped on conflicts.
    pub fn merge(&self, dry_run: bool) -> KagamiResult<MergeOutcome> {
        info!(
            from = %self.remote_a,
            into = self.remote_b.branch(),
            dry_run,
            "Merging"
        );
        self.backend.merge(self, dry_run)
    }

    /// Pushes the tracking branch to remote B with remote B's credentials.
    ///
    /// On failure the local repository is left untouched.
    pub fn push(&self) -> KagamiResult<()> {
        self.repository.push_remote(&self.remote_b)
    }

    /// Abandons an in-progress merge, such as the one a dry run leaves behind, and resets the
    /// working tree to HEAD.
    pub fn abort_merge(&self) -> KagamiResult<()> {
        let merge_error = |e: git2::Error| KagamiError::Merge {
            remote: self.remote_a.to_string(),
            output: e.to_string(),
        };

        if self.repository.state() == RepositoryState::Clean {
            debug!("No merge in progress");
            return Ok(());
        }

        info!(path = %self.path.display(), "Aborting merge");
        self.repository
            .checkout_head(Some(CheckoutBuilder::new().force()))
            .map_err(merge_error)?;
        self.repository.cleanup_state().map_err(merge_error)
    }
}

impl MergeBackend for NativeMerge {
    fn merge(&self, fork: &Fork, dry_run: bool) -> KagamiResult<MergeOutcome> {
        let repository = fork.repository();
        let remote = fork.remote_a();
        let merge_error = |output: String| KagamiError::Merge {
            remote: remote.to_string(),
            output,
        };
        let git_error = |e: git2::Error| merge_error(e.to_string());

        if repository.state() != RepositoryState::Clean {
            return Err(merge_error(format!(
                "A merge is already in progress in `{}`. Abort it first.",
                fork.path().display()
            )));
        }

        let tip = repository.remote_tip(remote)?;
        let incoming = repository
            .find_annotated_commit(tip.id())
            .map_err(git_error)?;
        let (analysis, _) = repository
            .merge_analysis(&[&incoming])
            .map_err(git_error)?;

        if analysis.is_up_to_date() {
            return Ok(MergeOutcome {
                output: "Already up to date.".to_string(),
                up_to_date: true,
                ..Default::default()
            });
        }

        let head = repository.head().map_err(git_error)?;
        let head_commit = head.peel_to_commit().map_err(git_error)?;

        if analysis.is_fast_forward() && !dry_run {
            // Update the working tree relative to the old HEAD, then move the branch.
            repository
                .checkout_tree(tip.as_object(), Some(CheckoutBuilder::new().safe()))
                .map_err(git_error)?;
            let mut head = head;
            head.set_target(
                tip.id(),
                &format!("merge {}: Fast-forward", remote.upstream_name()),
            )
            .map_err(git_error)?;

            return Ok(MergeOutcome {
                output: format!(
                    "Updating {}..{}\nFast-forward",
                    short_id(head_commit.id()),
                    short_id(tip.id())
                ),
                commit: Some(tip.id()),
                fast_forward: true,
                up_to_date: false,
            });
        }

        repository
            .merge(&[&incoming], None, None)
            .map_err(git_error)?;

        let mut index = repository.index().map_err(git_error)?;
        if index.has_conflicts() {
            let conflicts = index
                .conflicts()
                .map_err(git_error)?
                .filter_map(Result::ok)
                .filter_map(|c| c.our.or(c.their).or(c.ancestor))
                .map(|entry| {
                    format!(
                        "CONFLICT (content): Merge conflict in {}",
                        String::from_utf8_lossy(&entry.path)
                    )
                })
                .join("\n");
            warn!(remote = %remote, "Merge stopped on conflicts");
            return Err(merge_error(format!(
                "{}\nAutomatic merge failed; fix conflicts and then commit the result.",
                conflicts
            )));
        }

        if dry_run {
            return Ok(MergeOutcome {
                output: "Automatic merge went well; stopped before committing as requested"
                    .to_string(),
                ..Default::default()
            });
        }

        let tree_oid = index.write_tree().map_err(git_error)?;
        let tree = repository.find_tree(tree_oid).map_err(git_error)?;
        let signature = git::committer_signature(repository).map_err(git_error)?;
        let message = format!(
            "Merge remote-tracking branch '{}' into {}",
            remote.upstream_name(),
            fork.remote_b().branch()
        );

        let oid = repository
            .commit(
                Some("HEAD"),
                &signature,
                &signature,
                &message,
                &tree,
                &[&head_commit, &tip],
            )
            .map_err(git_error)?;
        repository.cleanup_state().map_err(git_error)?;

        Ok(MergeOutcome {
            output: format!("{}\nMerge made by libgit2.", message),
            commit: Some(oid),
            ..Default::default()
        })
    }
}

impl MergeBackend for ExternalMerge {
    fn merge(&self, fork: &Fork, dry_run: bool) -> KagamiResult<MergeOutcome> {
        let remote = fork.remote_a();
        let merge_error = |output: String| KagamiError::Merge {
            remote: remote.to_string(),
            output,
        };
        let head_before = fork.repository().refname_to_id("HEAD").ok();

        // Without a configured identity `git` refuses to commit, so lend it the fallback one.
        let fallback_identity = fork.repository().signature().is_err();
        let mut cmd = self.command(
            fork.workdir(),
            &remote.upstream_name(),
            dry_run,
            fallback_identity,
        );

        debug!(?cmd, "Running external merge");
        let output = cmd
            .output()
            .map_err(|e| merge_error(format!("failed to run `{}`: {}", self.program, e)))?;

        let text = [output.stdout.as_slice(), output.stderr.as_slice()]
            .iter()
            .map(|s| String::from_utf8_lossy(s).trim().to_string())
            .filter(|s| !s.is_empty())
            .join("\n");

        if !output.status.success() {
            return Err(merge_error(text));
        }

        let head_after = fork.repository().refname_to_id("HEAD").ok();
        Ok(MergeOutcome {
            commit: head_after.filter(|_| head_after != head_before),
            fast_forward: text.contains("Fast-forward"),
            up_to_date: text.contains("Already up to date"),
            output: text,
        })
    }
}

/// Abbreviated form of an object id, as `git` prints it.
fn short_id(oid: Oid) -> String {
    oid.to_string().chars().take(7).collect()
}

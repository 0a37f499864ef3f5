//! The [Fork]: a local repository tracking two mirrored remotes.

use crate::{
    errors::{KagamiError, KagamiResult},
    git::{self, RepositoryExt},
    remote::Remote,
};
use git2::{
    build::CheckoutBuilder, Branch, BranchType, Commit, ErrorCode, Repository, RepositoryState,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

mod diff;
pub use diff::DiffDirection;

mod merge;
pub use merge::{ExternalMerge, MergeBackend, MergeOutcome, NativeMerge};

mod sync;
pub use sync::{SyncOptions, SyncReport};

/// A local repository that tracks remote A and remote B.
///
/// Remote A is the reference side: diffs are computed relative to it by default, and merges
/// bring A's branch into the tracking branch for remote B, which is then pushed back to B.
pub struct Fork {
    /// The local repository, exclusively owned by the fork.
    repository: Repository,
    /// Where the local repository lives on disk.
    path: PathBuf,
    /// The reference remote.
    remote_a: Remote,
    /// The remote that receives merges.
    remote_b: Remote,
    /// Performs merges of remote A into the checkout.
    backend: Box<dyn MergeBackend>,
}

impl Fork {
    /// Opens or creates the fork repository at `path`, fetches both remotes and sets up the
    /// tracking branch for `remote_b`.
    ///
    /// Bootstrapping is idempotent: running it again against the same path reuses the
    /// repository, the registered remotes and the tracking branch, refreshing both tips. A
    /// tracking branch behind remote B is fast-forwarded to it.
    ///
    /// ## Takes
    /// - `path` - The directory holding the fork repository.
    /// - `remote_a` - The reference remote.
    /// - `remote_b` - The remote that receives merges.
    ///
    /// ## Returns
    /// - `Ok(Fork)` - The fork, ready to diff and merge.
    /// - `Err(KagamiError::DuplicateRemote)` - If both remotes name the same remote and branch.
    /// - `Err(KagamiError::Storage)` - If the local repository cannot be opened or created.
    /// - `Err(KagamiError::Fetch)` - If either remote cannot be registered or fetched.
    /// - `Err(KagamiError::Branch)` - If the tracking branch cannot be set up, or a tracking
    ///   branch left by a prior run has diverged from remote B.
    pub fn bootstrap(
        path: impl Into<PathBuf>,
        remote_a: Remote,
        remote_b: Remote,
    ) -> KagamiResult<Self> {
        let path = path.into();
        ensure_distinct(&remote_a, &remote_b)?;

        info!(path = %path.display(), a = %remote_a, b = %remote_b, "Bootstrapping fork");
        let repository = git::open_or_init(&path)?;

        // Register and fetch both remotes. A remote registered by a prior run is reused.
        repository.fetch_remote(&remote_a)?;
        repository.fetch_remote(&remote_b)?;

        track_remote(&repository, &remote_b)?;

        Ok(Self {
            repository,
            path,
            remote_a,
            remote_b,
            backend: Box::new(NativeMerge),
        })
    }

    /// Reopens a fork bootstrapped by a prior run, without touching the network.
    ///
    /// The tracking references are whatever the last fetch left behind.
    pub fn open(
        path: impl Into<PathBuf>,
        remote_a: Remote,
        remote_b: Remote,
    ) -> KagamiResult<Self> {
        let path = path.into();
        ensure_distinct(&remote_a, &remote_b)?;

        let repository = Repository::open(&path).map_err(|source| KagamiError::Storage {
            path: path.clone(),
            source,
        })?;

        Ok(Self {
            repository,
            path,
            remote_a,
            remote_b,
            backend: Box::new(NativeMerge),
        })
    }

    /// Replaces the [MergeBackend] used by [Fork::merge].
    pub fn with_merge_backend(mut self, backend: Box<dyn MergeBackend>) -> Self {
        self.backend = backend;
        self
    }

    /// The local repository.
    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    /// The path the fork was opened at.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The working directory of the local repository.
    pub fn workdir(&self) -> &Path {
        self.repository.workdir().unwrap_or(self.path.as_path())
    }

    /// The reference remote.
    pub fn remote_a(&self) -> &Remote {
        &self.remote_a
    }

    /// The remote that receives merges.
    pub fn remote_b(&self) -> &Remote {
        &self.remote_b
    }
}

/// Both sides of a fork must differ in remote name or branch.
fn ensure_distinct(remote_a: &Remote, remote_b: &Remote) -> KagamiResult<()> {
    if remote_a.name() == remote_b.name() && remote_a.branch() == remote_b.branch() {
        return Err(KagamiError::DuplicateRemote(remote_a.to_string()));
    }
    Ok(())
}

/// Creates the local branch tracking `remote`, or verifies and fast-forwards the one left by a
/// prior run, and checks it out.
fn track_remote(repository: &Repository, remote: &Remote) -> KagamiResult<()> {
    let branch_error = |source| KagamiError::Branch {
        branch: remote.branch().to_string(),
        source,
    };
    let tip = repository.remote_tip(remote)?;

    let (mut branch, created) = match repository.find_branch(remote.branch(), BranchType::Local) {
        Ok(branch) => (branch, false),
        Err(e) if e.code() == ErrorCode::NotFound => {
            info!(branch = remote.branch(), upstream = %remote, "Creating tracking branch");
            let branch = repository
                .branch(remote.branch(), &tip, false)
                .map_err(branch_error)?;
            (branch, true)
        }
        Err(e) => return Err(branch_error(e)),
    };

    // Configure the upstream, or make sure a pre-existing one matches.
    match branch.upstream() {
        Ok(upstream) => {
            let upstream_name = upstream.get().name().unwrap_or_default().to_string();
            if upstream_name != remote.reference_name() {
                return Err(branch_error(git2::Error::from_str(&format!(
                    "branch already tracks `{}` instead of `{}`",
                    upstream_name,
                    remote.reference_name()
                ))));
            }
            debug!(branch = remote.branch(), "Tracking branch already configured");
        }
        Err(e) if e.code() == ErrorCode::NotFound => {
            branch
                .set_upstream(Some(&remote.upstream_name()))
                .map_err(branch_error)?;
        }
        Err(e) => return Err(branch_error(e)),
    }

    let on_branch =
        repository.head_target_name().as_deref() == Some(remote.merge_reference().as_str());
    if !created {
        fast_forward_branch(repository, remote, &mut branch, &tip, on_branch)?;
    }

    // Check out the tracking branch. A freshly created branch gets a forced checkout, as the
    // working tree of a new fork has nothing to preserve and HEAD may already name the branch.
    if created || !on_branch {
        let commit = repository
            .find_reference(&remote.merge_reference())
            .and_then(|r| r.peel_to_commit())
            .map_err(branch_error)?;
        let mut opts = CheckoutBuilder::new();
        if created {
            opts.force();
        } else {
            opts.safe();
        }
        repository
            .checkout_branch(remote.branch(), &commit, Some(&mut opts))
            .map_err(branch_error)?;
    }

    Ok(())
}

/// Moves a tracking branch left by a prior run up to the freshly fetched `tip` of `remote`.
///
/// A branch ahead of the tip holds a merge that has not been pushed yet and is kept as is. A
/// branch that has diverged from the tip cannot be reconciled and fails with
/// [KagamiError::Branch].
fn fast_forward_branch(
    repository: &Repository,
    remote: &Remote,
    branch: &mut Branch<'_>,
    tip: &Commit<'_>,
    on_branch: bool,
) -> KagamiResult<()> {
    let branch_error = |source| KagamiError::Branch {
        branch: remote.branch().to_string(),
        source,
    };
    let local = branch.get().peel_to_commit().map_err(branch_error)?;

    if local.id() == tip.id() {
        return Ok(());
    }
    if repository
        .graph_descendant_of(local.id(), tip.id())
        .map_err(branch_error)?
    {
        debug!(
            branch = remote.branch(),
            upstream = %remote,
            "Tracking branch has unpushed commits"
        );
        return Ok(());
    }
    if !repository
        .graph_descendant_of(tip.id(), local.id())
        .map_err(branch_error)?
    {
        return Err(branch_error(git2::Error::from_str(&format!(
            "branch has diverged from `{}`; reset it to `{}` to drop the unpushed commits",
            remote,
            remote.upstream_name()
        ))));
    }

    if on_branch {
        if repository.state() != RepositoryState::Clean {
            return Err(branch_error(git2::Error::from_str(
                "a merge is in progress in the fork; abort it first",
            )));
        }
        repository
            .checkout_tree(tip.as_object(), Some(CheckoutBuilder::new().safe()))
            .map_err(branch_error)?;
    }

    info!(
        branch = remote.branch(),
        from = %local.id(),
        to = %tip.id(),
        "Fast-forwarding tracking branch"
    );
    branch
        .get_mut()
        .set_target(tip.id(), &format!("kagami: fast-forward to {}", remote))
        .map_err(branch_error)?;

    Ok(())
}

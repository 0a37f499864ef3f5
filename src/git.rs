//! Utilities for interacting with the fork's `git` repository: storage, remote registration,
//! authenticated fetch and push, and tip resolution.

use crate::{
    constants::{FALLBACK_SIGNATURE_EMAIL, FALLBACK_SIGNATURE_NAME, HEADS_REF_PREFIX},
    errors::{KagamiError, KagamiResult},
    remote::Remote,
};
use git2::{
    build::CheckoutBuilder, Commit, ErrorCode, FetchOptions, PushOptions, Repository, Signature,
};
use std::{cell::RefCell, path::Path};
use tracing::{debug, info, warn};

/// Opens the repository at `path`, or initializes a fresh one if there is none yet.
///
/// ## Takes
/// - `path` - The directory holding the fork repository.
///
/// ## Returns
/// - `Ok(Repository)` - The reopened or freshly initialized repository.
/// - `Err(KagamiError::Storage)` - If the repository could neither be opened nor created.
pub fn open_or_init(path: &Path) -> KagamiResult<Repository> {
    let storage_error = |source: git2::Error| KagamiError::Storage {
        path: path.to_path_buf(),
        source,
    };

    if path.exists() {
        match Repository::open(path) {
            Ok(repository) => {
                debug!(path = %path.display(), "Reopened existing fork repository");
                return Ok(repository);
            }
            // An existing directory that is not a repository yet is initialized below.
            Err(e) if e.code() == ErrorCode::NotFound => {}
            Err(e) => return Err(storage_error(e)),
        }
    } else {
        std::fs::create_dir_all(path)
            .map_err(|e| storage_error(git2::Error::from_str(&e.to_string())))?;
    }

    info!(path = %path.display(), "Initializing fork repository");
    Repository::init(path).map_err(storage_error)
}

/// Returns the [Signature] used for commits made by `kagami` in the given repository.
///
/// Uses the repository's configured identity, falling back to a fixed `kagami` identity.
pub fn committer_signature(repository: &Repository) -> Result<Signature<'static>, git2::Error> {
    repository.signature().or_else(|_| {
        Signature::now(FALLBACK_SIGNATURE_NAME, FALLBACK_SIGNATURE_EMAIL)
    })
}

/// Extension trait for the [Repository] type to expose the operations `kagami` performs
/// against a fork's remotes.
pub trait RepositoryExt {
    /// Registers `remote` under its name, unless a remote of that name already exists.
    ///
    /// ## Takes
    /// - `remote` - The remote to register.
    ///
    /// ## Returns
    /// - `Ok(git2::Remote)` - The registered remote, new or pre-existing with an identical URL.
    /// - `Err(KagamiError::Fetch)` - If a remote of the same name is registered with a different
    ///   URL, or registration fails.
    fn register_remote(&self, remote: &Remote) -> KagamiResult<git2::Remote<'_>>;

    /// Registers `remote` if needed and fetches its branch into the remote's tracking reference,
    /// authenticating with the remote's credentials.
    ///
    /// ## Takes
    /// - `remote` - The remote to fetch.
    ///
    /// ## Returns
    /// - `Ok(())` - The tracking reference now points at the remote's branch tip.
    /// - `Err(KagamiError::Fetch)` - If registration, transport, authentication fails, or the
    ///   branch does not exist on the remote.
    fn fetch_remote(&self, remote: &Remote) -> KagamiResult<()>;

    /// Pushes the local branch named after `remote`'s branch to `remote`.
    ///
    /// ## Takes
    /// - `remote` - The remote to publish to.
    ///
    /// ## Returns
    /// - `Ok(())` - The remote accepted the update.
    /// - `Err(KagamiError::Push)` - If the transport failed or the remote rejected the update.
    fn push_remote(&self, remote: &Remote) -> KagamiResult<()>;

    /// Resolves the tip commit of `remote`'s tracking reference.
    ///
    /// ## Returns
    /// - `Ok(Commit)` - The commit the tracking reference points at.
    /// - `Err(KagamiError::Reference)` - If the tracking reference does not exist.
    /// - `Err(KagamiError::CommitResolution)` - If the reference does not point at a commit.
    fn remote_tip(&self, remote: &Remote) -> KagamiResult<Commit<'_>>;

    /// Returns the full name of the reference HEAD points at, even when that branch is unborn.
    /// [None] if HEAD is detached or missing.
    fn head_target_name(&self) -> Option<String>;

    /// Checks out `commit` and attaches HEAD to the local branch `branch_name`.
    ///
    /// ## Takes
    /// - `branch_name` - The short name of the local branch.
    /// - `commit` - The commit the branch points at.
    /// - `opts` - The checkout options to use.
    fn checkout_branch(
        &self,
        branch_name: &str,
        commit: &Commit<'_>,
        opts: Option<&mut CheckoutBuilder<'_>>,
    ) -> Result<(), git2::Error>;
}

impl RepositoryExt for Repository {
    fn register_remote(&self, remote: &Remote) -> KagamiResult<git2::Remote<'_>> {
        match self.find_remote(remote.name()) {
            Ok(existing) if existing.url() == Some(remote.url()) => {
                debug!(remote = %remote, "Remote already registered");
                Ok(existing)
            }
            Ok(existing) => Err(fetch_error(
                remote,
                git2::Error::from_str(&format!(
                    "remote `{}` is already registered with url `{}`, not `{}`",
                    remote.name(),
                    existing.url().unwrap_or("<invalid utf-8>"),
                    remote.url()
                )),
            )),
            Err(e) if e.code() == ErrorCode::NotFound => {
                info!(remote = %remote, url = remote.url(), "Registering remote");
                self.remote(remote.name(), remote.url())
                    .map_err(|e| fetch_error(remote, e))
            }
            Err(e) => Err(fetch_error(remote, e)),
        }
    }

    fn fetch_remote(&self, remote: &Remote) -> KagamiResult<()> {
        let mut git_remote = self.register_remote(remote)?;

        // Server-side progress messages, kept for diagnostics only.
        let output = RefCell::new(String::new());
        {
            let mut callbacks = remote.callbacks();
            callbacks.sideband_progress(|data| {
                output
                    .borrow_mut()
                    .push_str(&String::from_utf8_lossy(data));
                true
            });

            let mut fetch_opts = FetchOptions::new();
            fetch_opts.remote_callbacks(callbacks);

            info!(remote = %remote, "Fetching remote");
            git_remote
                .fetch(&[remote.fetch_refspec()], Some(&mut fetch_opts), None)
                .map_err(|e| fetch_error(remote, e))?;
        }

        let stats = git_remote.stats();
        debug!(
            remote = %remote,
            objects = stats.received_objects(),
            bytes = stats.received_bytes(),
            output = %output.borrow().trim(),
            "Fetch complete"
        );

        // A fetch of a branch the remote does not have succeeds without updating anything, and
        // a tracking reference left by an earlier fetch would outlive the branch.
        let advertised = git_remote
            .list()
            .map(|heads| {
                heads
                    .iter()
                    .any(|head| head.name() == remote.merge_reference())
            })
            .map_err(|e| fetch_error(remote, e))?;
        if !advertised || self.find_reference(&remote.reference_name()).is_err() {
            return Err(fetch_error(
                remote,
                git2::Error::from_str(&format!(
                    "branch `{}` not found on remote",
                    remote.branch()
                )),
            ));
        }

        Ok(())
    }

    fn push_remote(&self, remote: &Remote) -> KagamiResult<()> {
        let push_error = |source| KagamiError::Push {
            remote: remote.to_string(),
            source,
        };
        let mut git_remote = self.find_remote(remote.name()).map_err(push_error)?;

        // Per-reference rejections are reported through the callback rather than as an error.
        let rejection: RefCell<Option<String>> = RefCell::new(None);
        {
            let mut callbacks = remote.callbacks();
            callbacks.push_update_reference(|ref_name, status| {
                if let Some(msg) = status {
                    *rejection.borrow_mut() = Some(format!("{}: {}", ref_name, msg));
                }
                Ok(())
            });

            let mut push_opts = PushOptions::new();
            push_opts.remote_callbacks(callbacks);

            info!(remote = %remote, "Pushing to remote");
            git_remote
                .push(&[remote.push_refspec()], Some(&mut push_opts))
                .map_err(push_error)?;
        }

        if let Some(msg) = rejection.into_inner() {
            warn!(remote = %remote, %msg, "Push rejected");
            return Err(push_error(git2::Error::from_str(&format!(
                "remote rejected update of {}",
                msg
            ))));
        }

        Ok(())
    }

    fn remote_tip(&self, remote: &Remote) -> KagamiResult<Commit<'_>> {
        let reference = self
            .find_reference(&remote.reference_name())
            .and_then(|r| r.resolve())
            .map_err(|source| KagamiError::Reference {
                remote: remote.to_string(),
                source,
            })?;

        let commit_error = |source| KagamiError::CommitResolution {
            remote: remote.to_string(),
            source,
        };
        let oid = reference
            .target()
            .ok_or_else(|| commit_error(git2::Error::from_str("reference has no target")))?;
        self.find_commit(oid).map_err(commit_error)
    }

    fn head_target_name(&self) -> Option<String> {
        let head = self.find_reference("HEAD").ok()?;
        head.symbolic_target().map(ToOwned::to_owned)
    }

    fn checkout_branch(
        &self,
        branch_name: &str,
        commit: &Commit<'_>,
        opts: Option<&mut CheckoutBuilder<'_>>,
    ) -> Result<(), git2::Error> {
        // Check out the tree first, so files are created relative to the old HEAD.
        self.checkout_tree(commit.as_object(), opts)?;
        self.set_head(format!("{}/{}", HEADS_REF_PREFIX, branch_name).as_str())
    }
}

fn fetch_error(remote: &Remote, source: git2::Error) -> KagamiError {
    KagamiError::Fetch {
        remote: remote.to_string(),
        source,
    }
}

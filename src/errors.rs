//! Error types for the `kagami` fork-management core.

use nu_ansi_term::Color;
use std::path::PathBuf;
use thiserror::Error;

/// An error raised by the fork-management core.
///
/// Every variant names the remote, branch or path it concerns, so the outer layer can log it
/// without additional context.
#[derive(Error, Debug)]
pub enum KagamiError {
    /// The local fork repository could not be opened or created.
    #[error("Failed to open or create fork storage at `{}`: {source}", .path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: git2::Error,
    },
    /// Both remote descriptors name the same remote + branch pair.
    #[error("Remotes A and B both refer to `{}`; a fork needs two distinct remotes.", Color::Blue.paint(.0))]
    DuplicateRemote(String),
    /// Registering or fetching a remote failed.
    #[error("Failed to fetch remote `{}`: {source}", Color::Blue.paint(.remote))]
    Fetch {
        remote: String,
        #[source]
        source: git2::Error,
    },
    /// Setting up the tracking branch failed.
    #[error("Failed to create tracking branch `{}`: {source}", Color::Blue.paint(.branch))]
    Branch {
        branch: String,
        #[source]
        source: git2::Error,
    },
    /// A remote's tracking reference is missing.
    #[error("Failed to resolve branch `{}`: {source}", Color::Blue.paint(.remote))]
    Reference {
        remote: String,
        #[source]
        source: git2::Error,
    },
    /// A remote's tracking reference does not point at a loadable commit.
    #[error("Failed to resolve commit for `{}`: {source}", Color::Blue.paint(.remote))]
    CommitResolution {
        remote: String,
        #[source]
        source: git2::Error,
    },
    /// Computing the patch between the two tips failed.
    #[error("Failed to diff `{}` against `{}`: {source}", Color::Blue.paint(.base), Color::Blue.paint(.target))]
    Diff {
        base: String,
        target: String,
        #[source]
        source: git2::Error,
    },
    /// Merging a remote into the checkout failed or left conflicts.
    #[error("Failed to merge `{}`:\n{output}", Color::Blue.paint(.remote))]
    Merge { remote: String, output: String },
    /// Publishing the local state to a remote failed.
    #[error("Failed to push to `{}`: {source}", Color::Blue.paint(.remote))]
    Push {
        remote: String,
        #[source]
        source: git2::Error,
    },
}

impl KagamiError {
    /// Returns the remote display name (`<name>/<branch>`) the error concerns, if any.
    pub fn remote(&self) -> Option<&str> {
        match self {
            Self::Fetch { remote, .. }
            | Self::Reference { remote, .. }
            | Self::CommitResolution { remote, .. }
            | Self::Merge { remote, .. }
            | Self::Push { remote, .. } => Some(remote),
            Self::DuplicateRemote(remote) => Some(remote),
            Self::Storage { .. } | Self::Branch { .. } | Self::Diff { .. } => None,
        }
    }
}

pub type KagamiResult<T> = Result<T, KagamiError>;

//! Constants for the `kagami` application.

use nu_ansi_term::Color;

/// Default location of the fork repository, relative to the working directory.
pub const DEFAULT_FORK_PATH: &str = "./sandbox/fork";

/// Name of the configuration file, placed in the user's home directory.
pub const KAGAMI_CFG_FILE_NAME: &str = ".kagami.toml";

/// Prefix of remote-tracking references.
pub const REMOTES_REF_PREFIX: &str = "refs/remotes";

/// Prefix of local branch references.
pub const HEADS_REF_PREFIX: &str = "refs/heads";

/// Number of context lines around each hunk of a [Patch].
///
/// [Patch]: crate::patch::Patch
pub const DIFF_CONTEXT_LINES: u32 = 3;

/// Committer identity used for merge commits when the repository has no `user.name` /
/// `user.email` configured.
pub const FALLBACK_SIGNATURE_NAME: &str = "kagami";
pub const FALLBACK_SIGNATURE_EMAIL: &str = "kagami@localhost";

pub(crate) const ADDITION_COLOR: Color = Color::Green;
pub(crate) const DELETION_COLOR: Color = Color::Red;
pub(crate) const HUNK_HEADER_COLOR: Color = Color::Cyan;
pub(crate) const FILE_HEADER_COLOR: Color = Color::Yellow;

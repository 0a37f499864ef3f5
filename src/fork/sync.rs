//! The end-to-end reconciliation workflow of a [Fork].

use super::{DiffDirection, Fork, MergeOutcome};
use crate::{errors::KagamiResult, patch::Patch};
use tracing::{info, warn};

/// Which steps of the workflow to perform after computing the divergence.
#[derive(Default, Debug, Clone, Copy, Eq, PartialEq)]
pub struct SyncOptions {
    /// Direction of the reported [Patch].
    pub direction: DiffDirection,
    /// Merge remote A into the tracking branch of remote B.
    pub perform_merge: bool,
    /// Push the merged tracking branch to remote B. Only honored for committed merges.
    pub perform_push: bool,
    /// Stage the merge without committing it.
    pub dry_run: bool,
}

/// What the workflow did.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SyncReport {
    /// The divergence between both remotes, before any merge.
    pub patch: Patch,
    /// The outcome of the merge, if one was performed.
    pub merge: Option<MergeOutcome>,
    /// Whether remote B was updated.
    pub pushed: bool,
}

impl Fork {
    /// Reports the divergence between both remotes and, depending on `opts`, reconciles it.
    ///
    /// Stops at the first failing step; nothing is pushed unless the merge succeeded.
    pub fn sync(&self, opts: &SyncOptions) -> KagamiResult<SyncReport> {
        let patch = self.diff_remotes(opts.direction)?;
        info!(
            a = %self.remote_a,
            b = %self.remote_b,
            stat = %patch.stat(),
            "Computed divergence"
        );

        if !opts.perform_merge {
            return Ok(SyncReport {
                patch,
                merge: None,
                pushed: false,
            });
        }

        let merge = self.merge(opts.dry_run)?;

        let pushed = match (opts.perform_push, opts.dry_run) {
            (true, false) => {
                self.push()?;
                true
            }
            (true, true) => {
                warn!(remote = %self.remote_b, "Not pushing a dry-run merge");
                false
            }
            (false, _) => false,
        };

        Ok(SyncReport {
            patch,
            merge: Some(merge),
            pushed,
        })
    }
}

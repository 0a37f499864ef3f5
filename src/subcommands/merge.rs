//! `merge` subcommand.

use super::print_merge;
use crate::config::{KagamiConfig, MergeBackendKind};
use anyhow::Result;
use clap::Args;

/// CLI arguments for the `merge` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct MergeCmd {
    /// Stage the merge without committing.
    #[clap(long)]
    dry_run: bool,
    /// Override the configured merge backend.
    #[clap(long, value_enum)]
    backend: Option<MergeBackendKind>,
}

impl MergeCmd {
    /// Run the `merge` subcommand.
    pub fn run(self, cfg: KagamiConfig) -> Result<()> {
        let fork = cfg.bootstrap(self.backend)?;
        let outcome = fork.merge(self.dry_run)?;
        print_merge(&outcome, self.dry_run);
        Ok(())
    }
}

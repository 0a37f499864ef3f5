//! `diff` subcommand.

use super::print_patch;
use crate::config::KagamiConfig;
use anyhow::Result;
use clap::Args;
use kagami::DiffDirection;

/// CLI arguments for the `diff` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct DiffCmd {
    /// Show the patch from A to B instead of from B to A.
    #[clap(long)]
    reverse: bool,
    /// Only print the summary.
    #[clap(long)]
    stat: bool,
    /// Skip fetching and diff the tips from the last fetch.
    #[clap(long)]
    offline: bool,
}

impl DiffCmd {
    /// Run the `diff` subcommand.
    pub fn run(self, cfg: KagamiConfig) -> Result<()> {
        let fork = if self.offline {
            cfg.open()?
        } else {
            cfg.bootstrap(None)?
        };

        let direction = if self.reverse {
            DiffDirection::BToA.reversed()
        } else {
            DiffDirection::BToA
        };
        print_patch(&fork.diff_remotes(direction)?, self.stat)
    }
}

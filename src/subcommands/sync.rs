//! `sync` subcommand.

use super::{confirm_push, print_merge, print_patch};
use crate::config::{KagamiConfig, MergeBackendKind};
use anyhow::Result;
use clap::Args;
use kagami::{DiffDirection, SyncOptions};
use nu_ansi_term::Color;

/// CLI arguments for the `sync` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct SyncCmd {
    /// Merge remote A into the tracking branch of remote B.
    #[clap(long)]
    merge: bool,
    /// Push the merge to remote B.
    #[clap(long, requires = "merge")]
    push: bool,
    /// Stage the merge without committing. Never pushes.
    #[clap(long, requires = "merge")]
    dry_run: bool,
    /// Override the configured merge backend.
    #[clap(long, value_enum)]
    backend: Option<MergeBackendKind>,
    /// Show the patch from A to B instead of from B to A.
    #[clap(long)]
    reverse: bool,
    /// Only print the summary of the divergence.
    #[clap(long)]
    stat: bool,
    /// Push without asking for confirmation.
    #[clap(short, long)]
    yes: bool,
}

impl SyncCmd {
    /// Run the `sync` subcommand.
    pub fn run(self, cfg: KagamiConfig) -> Result<()> {
        let fork = cfg.bootstrap(self.backend)?;

        let direction = if self.reverse {
            DiffDirection::AToB
        } else {
            DiffDirection::BToA
        };

        // Without `--yes`, the push is confirmed once the merge result is known.
        let report = fork.sync(&SyncOptions {
            direction,
            perform_merge: self.merge,
            perform_push: self.push && self.yes,
            dry_run: self.dry_run,
        })?;

        print_patch(&report.patch, self.stat)?;
        let Some(merge) = report.merge else {
            return Ok(());
        };
        print_merge(&merge, self.dry_run);

        if !self.push {
            return Ok(());
        }
        if self.dry_run {
            println!("Dry run: not pushing to `{}`.", fork.remote_b());
            return Ok(());
        }

        let pushed = report.pushed || {
            let confirmed = confirm_push(fork.remote_b(), false)?;
            if confirmed {
                fork.push()?;
            }
            confirmed
        };
        if pushed {
            println!(
                "Pushed `{}` to `{}`.",
                Color::Green.paint(fork.remote_b().branch()),
                Color::Blue.paint(fork.remote_b().to_string())
            );
        }

        Ok(())
    }
}

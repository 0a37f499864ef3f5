//! The subcommands for the `kagami` application.

use crate::config::KagamiConfig;
use anyhow::Result;
use clap::Subcommand;
use kagami::{MergeOutcome, Patch};
use nu_ansi_term::Color;
use std::path::Path;

mod sync;
pub use sync::SyncCmd;

mod diff;
pub use diff::DiffCmd;

mod merge;
pub use merge::MergeCmd;

mod push;
pub use push::PushCmd;

mod abort;
pub use abort::AbortCmd;

mod config;
pub use config::ConfigCmd;

#[derive(Debug, Clone, Eq, PartialEq, Subcommand)]
pub enum Subcommands {
    /// Fetch both remotes, report their divergence and optionally merge A into B and push it.
    #[clap(alias = "s")]
    Sync(SyncCmd),
    /// Fetch both remotes and print the patch between their branches.
    #[clap(alias = "d")]
    Diff(DiffCmd),
    /// Fetch both remotes and merge remote A into the tracking branch of remote B.
    #[clap(alias = "m")]
    Merge(MergeCmd),
    /// Push the tracking branch to remote B.
    #[clap(alias = "p")]
    Push(PushCmd),
    /// Discard an in-progress merge in the fork.
    Abort(AbortCmd),
    /// Show the configuration, creating it first if needed.
    #[clap(alias = "cfg")]
    Config(ConfigCmd),
}

impl Subcommands {
    /// Run the subcommand with the loaded configuration.
    pub fn run(self, cfg: KagamiConfig, cfg_path: &Path, created: bool) -> Result<()> {
        match self {
            Self::Sync(args) => args.run(cfg),
            Self::Diff(args) => args.run(cfg),
            Self::Merge(args) => args.run(cfg),
            Self::Push(args) => args.run(cfg),
            Self::Abort(args) => args.run(cfg),
            Self::Config(args) => args.run(cfg, cfg_path, created),
        }
    }
}

/// Prints a patch to stdout, followed by its summary.
pub(crate) fn print_patch(patch: &Patch, stat_only: bool) -> Result<()> {
    if patch.is_empty() {
        println!("{}", Color::Green.paint("Both remotes are identical."));
        return Ok(());
    }

    if !stat_only {
        let mut out = String::new();
        patch.write_colored(&mut out)?;
        print!("{}", out);
    }
    println!(
        "{} ({})",
        Color::Blue.paint(patch.stat().to_string()),
        patch.paths()
    );
    Ok(())
}

/// Prints the outcome of a merge to stdout.
pub(crate) fn print_merge(outcome: &MergeOutcome, dry_run: bool) {
    if !outcome.output.is_empty() {
        println!("{}", outcome.output.trim_end());
    }

    if outcome.up_to_date {
        println!("{}", Color::Green.paint("Already up to date."));
    } else if dry_run {
        println!(
            "Merge staged without committing. Inspect the fork, then run `{}` to discard it.",
            Color::Blue.paint("kagami abort")
        );
    } else if let Some(commit) = outcome.commit {
        println!(
            "{} `{}`",
            if outcome.fast_forward {
                "Fast-forwarded to"
            } else {
                "Created merge commit"
            },
            Color::Yellow.paint(commit.to_string())
        );
    }
}

/// Asks the user whether to publish the tracking branch to `remote`.
pub(crate) fn confirm_push(remote: &kagami::Remote, yes: bool) -> Result<bool> {
    if yes {
        return Ok(true);
    }
    Ok(inquire::Confirm::new(
        format!("Push to `{}` ({})?", Color::Green.paint(remote.to_string()), remote.url()).as_str(),
    )
    .with_default(false)
    .prompt()?)
}

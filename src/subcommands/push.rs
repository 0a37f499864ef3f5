//! `push` subcommand.

use super::confirm_push;
use crate::config::KagamiConfig;
use anyhow::Result;
use clap::Args;
use nu_ansi_term::Color;

/// CLI arguments for the `push` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct PushCmd {
    /// Push without asking for confirmation.
    #[clap(short, long)]
    yes: bool,
}

impl PushCmd {
    /// Run the `push` subcommand.
    pub fn run(self, cfg: KagamiConfig) -> Result<()> {
        let fork = cfg.open()?;
        let remote = fork.remote_b();

        if !confirm_push(remote, self.yes)? {
            println!("Push cancelled.");
            return Ok(());
        }
        fork.push()?;

        println!(
            "Pushed `{}` to `{}`.",
            Color::Green.paint(remote.branch()),
            Color::Blue.paint(remote.to_string())
        );
        Ok(())
    }
}

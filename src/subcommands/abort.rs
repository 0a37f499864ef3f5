//! `abort` subcommand.

use crate::config::KagamiConfig;
use anyhow::Result;
use clap::Args;
use nu_ansi_term::Color;

/// CLI arguments for the `abort` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct AbortCmd;

impl AbortCmd {
    /// Run the `abort` subcommand.
    pub fn run(self, cfg: KagamiConfig) -> Result<()> {
        let fork = cfg.open()?;
        fork.abort_merge()?;
        println!(
            "Reset `{}` to HEAD.",
            Color::Blue.paint(fork.workdir().display().to_string())
        );
        Ok(())
    }
}

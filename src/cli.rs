//! The CLI for `kagami`.

use crate::{
    config::{KagamiConfig, DEFAULT_CFG_PATH},
    subcommands::Subcommands,
};
use anyhow::{anyhow, Result};
use clap::{
    builder::styling::{AnsiColor, Color, Style},
    ArgAction, Parser,
};
use std::path::PathBuf;
use tracing::{debug, Level};

const ABOUT: &str =
    "kagami keeps two mirrors of a git repository in sync through a local fork that tracks both.";

/// The CLI application for `kagami`.
#[derive(Parser, Debug, Clone, Eq, PartialEq)]
#[command(about = ABOUT, version, styles = cli_styles())]
pub struct Cli {
    /// Verbosity level (0-4)
    #[arg(short, action = ArgAction::Count)]
    pub v: u8,
    /// Path to the configuration file. Defaults to `$HOME/.kagami.toml`.
    #[arg(long, global = true, env = "KAGAMI_CONFIG")]
    pub config: Option<PathBuf>,
    /// The subcommand to run
    #[clap(subcommand)]
    pub subcommand: Subcommands,
}

impl Cli {
    /// Run the CLI application with the given arguments.
    pub async fn run(self) -> Result<()> {
        let Self {
            config, subcommand, ..
        } = self.init_tracing_subscriber()?;

        let cfg_path = config
            .or_else(|| DEFAULT_CFG_PATH.clone())
            .ok_or_else(|| anyhow!("Could not locate the configuration file. Pass `--config`."))?;
        debug!(path = %cfg_path.display(), "Loading configuration");

        // Subcommands drive blocking libgit2 operations and terminal prompts.
        tokio::task::spawn_blocking(move || {
            let (cfg, created) = KagamiConfig::load_or_initialize(&cfg_path)?;
            subcommand.run(cfg, &cfg_path, created)
        })
        .await?
    }

    /// Initializes the tracing subscriber
    ///
    /// # Returns
    /// - `Result<()>` - Ok if successful, Err otherwise.
    pub(crate) fn init_tracing_subscriber(self) -> Result<Self> {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(match self.v {
                0 => Level::ERROR,
                1 => Level::WARN,
                2 => Level::INFO,
                3 => Level::DEBUG,
                _ => Level::TRACE,
            })
            .with_writer(std::io::stderr)
            .finish();

        tracing::subscriber::set_global_default(subscriber).map_err(|e| anyhow!(e))?;

        Ok(self)
    }
}

/// Styles for the CLI application.
const fn cli_styles() -> clap::builder::Styles {
    let heading = Style::new()
        .bold()
        .underline()
        .fg_color(Some(Color::Ansi(AnsiColor::Magenta)));
    let failure = Style::new()
        .bold()
        .fg_color(Some(Color::Ansi(AnsiColor::Red)));

    clap::builder::Styles::styled()
        .usage(heading)
        .header(heading)
        .literal(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Cyan))))
        .invalid(failure)
        .error(failure)
        .valid(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Green))),
        )
        .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::White))))
}

#[cfg(test)]
mod test {
    use super::Cli;
    use crate::subcommands::Subcommands;
    use clap::{CommandFactory, Parser};

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn push_requires_merge() {
        assert!(Cli::try_parse_from(["kagami", "sync", "--push"]).is_err());
        assert!(Cli::try_parse_from(["kagami", "sync", "--dry-run"]).is_err());

        let cli = Cli::try_parse_from(["kagami", "-vv", "sync", "--merge", "--push"]).unwrap();
        assert_eq!(cli.v, 2);
        assert!(matches!(cli.subcommand, Subcommands::Sync(_)));
    }
}

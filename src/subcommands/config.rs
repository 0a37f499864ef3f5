//! `config` subcommand.

use crate::config::{KagamiConfig, RemoteConfig};
use anyhow::Result;
use clap::Args;
use nu_ansi_term::Color;
use std::path::Path;

/// CLI arguments for the `config` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct ConfigCmd;

impl ConfigCmd {
    /// Run the `config` subcommand.
    pub fn run(self, cfg: KagamiConfig, cfg_path: &Path, created: bool) -> Result<()> {
        if created {
            println!(
                "Configuration successfully initialized at: {}",
                Color::Blue.paint(cfg_path.display().to_string())
            );
        } else {
            println!(
                "Configuration at: {}",
                Color::Blue.paint(cfg_path.display().to_string())
            );
        }

        println!("fork:    {}", cfg.fork_path.display());
        println!("backend: {:?}", cfg.merge_backend);
        print_remote("A", &cfg.remote_a);
        print_remote("B", &cfg.remote_b);
        Ok(())
    }
}

fn print_remote(label: &str, remote: &RemoteConfig) {
    let credentials = match (&remote.password_env, &remote.password) {
        (Some(var), _) => format!("${}", var),
        (None, Some(_)) => "<inline password>".to_string(),
        (None, None) => "<none>".to_string(),
    };
    println!(
        "remote {}: {}/{} @ {} (user `{}`, password {})",
        label,
        Color::Green.paint(&remote.name),
        Color::Green.paint(&remote.branch),
        remote.url,
        remote.username,
        credentials
    );
}

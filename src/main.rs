#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

use anyhow::Result;
use clap::Parser;

// Used through the `kagami` library only.
use git2 as _;
use itertools as _;
use thiserror as _;

mod cli;
mod config;
mod subcommands;

#[tokio::main]
async fn main() -> Result<()> {
    cli::Cli::parse().run().await
}

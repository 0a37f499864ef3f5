#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

pub mod constants;
pub mod errors;
pub mod fork;
pub mod git;
pub mod patch;
pub mod remote;

#[cfg(test)]
mod test_utils;

pub use errors::{KagamiError, KagamiResult};
pub use fork::{DiffDirection, Fork, MergeBackend, MergeOutcome, SyncOptions, SyncReport};
pub use patch::Patch;
pub use remote::Remote;

//! Configuration for the `kagami` application.

use anyhow::{anyhow, bail, Context, Result};
use clap::ValueEnum;
use kagami::{
    constants::{DEFAULT_FORK_PATH, KAGAMI_CFG_FILE_NAME},
    fork::{ExternalMerge, MergeBackend, NativeMerge},
    Fork, Remote,
};
use nu_ansi_term::Color;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::{
    env,
    path::{Path, PathBuf},
};
use tracing::warn;

/// The default location of the configuration file, `$HOME/.kagami.toml`.
pub(crate) static DEFAULT_CFG_PATH: Lazy<Option<PathBuf>> =
    Lazy::new(|| env::var_os("HOME").map(|home| PathBuf::from(home).join(KAGAMI_CFG_FILE_NAME)));

/// The persistent configuration of the `kagami` application.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct KagamiConfig {
    /// Where the fork repository lives.
    #[serde(default = "default_fork_path")]
    pub fork_path: PathBuf,
    /// How merges are performed.
    #[serde(default)]
    pub merge_backend: MergeBackendKind,
    /// The reference remote.
    pub remote_a: RemoteConfig,
    /// The remote that receives merges.
    pub remote_b: RemoteConfig,
}

/// The configuration of one remote.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RemoteConfig {
    pub name: String,
    pub branch: String,
    pub url: String,
    #[serde(default)]
    pub username: String,
    /// A literal password. Prefer `password-env`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// The environment variable holding the password or access token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,
}

/// The available merge backends.
#[derive(Default, Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum MergeBackendKind {
    /// Merge in-process with libgit2.
    #[default]
    Native,
    /// Shell out to `git merge`.
    External,
}

impl MergeBackendKind {
    /// Instantiates the backend.
    pub fn backend(self) -> Box<dyn MergeBackend> {
        match self {
            Self::Native => Box::new(NativeMerge),
            Self::External => Box::new(ExternalMerge::default()),
        }
    }
}

fn default_fork_path() -> PathBuf {
    PathBuf::from(DEFAULT_FORK_PATH)
}

impl RemoteConfig {
    /// Resolves the configured credentials and builds the [Remote] descriptor.
    ///
    /// The password comes from the `password-env` variable if set, then from `password`. A
    /// remote without either authenticates with an empty password.
    pub fn resolve(&self) -> Remote {
        let password = self
            .password_env
            .as_ref()
            .and_then(|var| match env::var(var) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(remote = %self.name, var = %var, "Password variable is not set");
                    None
                }
            })
            .or_else(|| self.password.clone())
            .unwrap_or_else(|| {
                warn!(
                    remote = %self.name,
                    "No password configured, authenticating with an empty one"
                );
                String::new()
            });

        Remote::new(
            self.name.as_str(),
            self.branch.as_str(),
            self.url.as_str(),
            self.username.as_str(),
            password,
        )
    }

    /// Prompts the user for the configuration of the remote labelled `label`.
    fn prompt(label: &str) -> Result<Self> {
        let ask = |what: &str| {
            inquire::Text::new(format!("{} ({}):", what, Color::Blue.paint(label)).as_str())
                .prompt()
        };

        let name = ask("Remote name")?;
        let url = ask("Remote URL")?;
        let branch = inquire::Text::new(
            format!("Branch to track ({}):", Color::Blue.paint(label)).as_str(),
        )
        .with_default("master")
        .prompt()?;
        let username = ask("Username")?;
        let password_env = ask("Environment variable holding the password or token")?;

        Ok(Self {
            name,
            branch,
            url,
            username,
            password: None,
            password_env: (!password_env.is_empty()).then_some(password_env),
        })
    }
}

impl KagamiConfig {
    /// Parses a configuration from TOML.
    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        if config.remote_a.name == config.remote_b.name
            && config.remote_a.branch == config.remote_b.branch
        {
            bail!(
                "`remote-a` and `remote-b` both refer to `{}/{}`.",
                config.remote_a.name,
                config.remote_a.branch
            );
        }
        Ok(config)
    }

    /// Loads the configuration at `path`, or interactively creates it if it does not exist.
    ///
    /// ## Returns
    /// - `Ok((KagamiConfig, bool))` - The configuration, and whether it was just created.
    /// - `Err(_)` - If the file cannot be read, parsed or written, or a prompt fails.
    pub fn load_or_initialize(path: &Path) -> Result<(Self, bool)> {
        if path.exists() {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read `{}`", path.display()))?;
            let config = Self::from_toml(&raw)
                .with_context(|| format!("Invalid configuration in `{}`", path.display()))?;
            return Ok((config, false));
        }

        println!(
            "No configuration found at `{}`. Let's create one.",
            Color::Blue.paint(path.display().to_string())
        );
        let config = Self {
            fork_path: PathBuf::from(
                inquire::Text::new("Where should the fork repository live?")
                    .with_default(DEFAULT_FORK_PATH)
                    .prompt()?,
            ),
            merge_backend: MergeBackendKind::default(),
            remote_a: RemoteConfig::prompt("remote A")?,
            remote_b: RemoteConfig::prompt("remote B")?,
        };
        config.write(path)?;

        Ok((config, true))
    }

    /// Persists the configuration to `path`.
    pub fn write(&self, path: &Path) -> Result<()> {
        let raw = toml::to_string_pretty(self)?;
        std::fs::write(path, raw)
            .with_context(|| format!("Failed to write `{}`", path.display()))?;
        Ok(())
    }

    /// Builds both [Remote] descriptors.
    pub fn remotes(&self) -> (Remote, Remote) {
        (self.remote_a.resolve(), self.remote_b.resolve())
    }

    /// Bootstraps the fork, merging with `backend` or the configured backend.
    pub fn bootstrap(&self, backend: Option<MergeBackendKind>) -> Result<Fork> {
        let (remote_a, remote_b) = self.remotes();
        let fork = Fork::bootstrap(&self.fork_path, remote_a, remote_b)?;
        Ok(fork.with_merge_backend(backend.unwrap_or(self.merge_backend).backend()))
    }

    /// Reopens the fork without fetching.
    pub fn open(&self) -> Result<Fork> {
        let (remote_a, remote_b) = self.remotes();
        Fork::open(&self.fork_path, remote_a, remote_b).map_err(|e| {
            anyhow!(
                "{} Has the fork been bootstrapped? Run `kagami sync` first.",
                e
            )
        })
    }
}

#[cfg(test)]
mod test {
    use super::{KagamiConfig, MergeBackendKind, RemoteConfig};
    use kagami::Remote;
    use std::path::PathBuf;

    const SAMPLE: &str = r#"
merge-backend = "external"

[remote-a]
name = "github"
branch = "master"
url = "https://github.com/eriktate/kagami-test.git"
username = "eriktate"
password-env = "KAGAMI_TEST_GITHUB_TOKEN"

[remote-b]
name = "gitlab"
branch = "master"
url = "https://gitlab.com/eriktate/kagami-test.git"
username = "eriktate"
password = "literal"
"#;

    #[test]
    fn parses_config() {
        let config = KagamiConfig::from_toml(SAMPLE).unwrap();

        assert_eq!(config.fork_path, PathBuf::from("./sandbox/fork"));
        assert_eq!(config.merge_backend, MergeBackendKind::External);
        assert_eq!(config.remote_a.name, "github");
        assert_eq!(
            config.remote_a.password_env.as_deref(),
            Some("KAGAMI_TEST_GITHUB_TOKEN")
        );
        assert_eq!(config.remote_b.password.as_deref(), Some("literal"));
    }

    #[test]
    fn resolves_remotes() {
        std::env::set_var("KAGAMI_TEST_GITHUB_TOKEN", "token");
        let config = KagamiConfig::from_toml(SAMPLE).unwrap();

        let (a, b) = config.remotes();
        assert_eq!(
            a,
            Remote::new(
                "github",
                "master",
                "https://github.com/eriktate/kagami-test.git",
                "eriktate",
                "token"
            )
        );
        assert_eq!(b.reference_name(), "refs/remotes/gitlab/master");
        assert_eq!(b.url(), "https://gitlab.com/eriktate/kagami-test.git");
    }

    fn remote_config(password: Option<&str>, password_env: Option<&str>) -> RemoteConfig {
        RemoteConfig {
            name: "origin".to_string(),
            branch: "main".to_string(),
            url: "https://example.com/repo.git".to_string(),
            username: "user".to_string(),
            password: password.map(ToOwned::to_owned),
            password_env: password_env.map(ToOwned::to_owned),
        }
    }

    fn remote_with_password(password: &str) -> Remote {
        Remote::new(
            "origin",
            "main",
            "https://example.com/repo.git",
            "user",
            password,
        )
    }

    #[test]
    fn password_env_takes_precedence() {
        std::env::set_var("KAGAMI_TEST_PRECEDENCE_TOKEN", "from-env");
        let config = remote_config(Some("literal"), Some("KAGAMI_TEST_PRECEDENCE_TOKEN"));

        assert_eq!(config.resolve(), remote_with_password("from-env"));
    }

    #[test]
    fn unset_password_env_falls_back_to_literal() {
        std::env::remove_var("KAGAMI_TEST_UNSET_TOKEN");
        let config = remote_config(Some("literal"), Some("KAGAMI_TEST_UNSET_TOKEN"));

        assert_eq!(config.resolve(), remote_with_password("literal"));
    }

    #[test]
    fn missing_password_is_empty() {
        std::env::remove_var("KAGAMI_TEST_MISSING_TOKEN");

        assert_eq!(
            remote_config(None, Some("KAGAMI_TEST_MISSING_TOKEN")).resolve(),
            remote_with_password("")
        );
        assert_eq!(remote_config(None, None).resolve(), remote_with_password(""));
    }

    #[test]
    fn rejects_identical_remotes() {
        let raw = SAMPLE.replace("name = \"gitlab\"", "name = \"github\"");
        assert!(KagamiConfig::from_toml(&raw).is_err());
    }

    #[test]
    fn write_then_load() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(".kagami.toml");
        let config = KagamiConfig::from_toml(SAMPLE).unwrap();

        config.write(&path).unwrap();
        let (loaded, created) = KagamiConfig::load_or_initialize(&path).unwrap();

        assert!(!created);
        assert_eq!(loaded, config);
    }
}

//! The [Remote] descriptor: one side of a fork.

use crate::constants::{HEADS_REF_PREFIX, REMOTES_REF_PREFIX};
use git2::{Cred, CredentialType, RemoteCallbacks};
use std::fmt::{self, Debug, Display};
use tracing::{debug, trace};

/// An immutable description of a remote repository and the branch that `kagami` tracks on it.
#[derive(Clone, PartialEq, Eq)]
pub struct Remote {
    /// The name the remote is registered under in the fork repository.
    name: String,
    /// The branch tracked on the remote.
    branch: String,
    /// The URL of the remote.
    url: String,
    /// The username for basic authentication.
    username: String,
    /// The password, or access token, for basic authentication.
    password: String,
}

impl Remote {
    /// Creates a new [Remote].
    pub fn new(
        name: impl Into<String>,
        branch: impl Into<String>,
        url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            branch: branch.into(),
            url: url.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    /// The name the remote is registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The branch tracked on the remote.
    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// The URL of the remote.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The username used for basic authentication.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the fully qualified name of the local tracking reference for the remote's branch,
    /// i.e. `refs/remotes/<name>/<branch>`.
    pub fn reference_name(&self) -> String {
        format!("{}/{}/{}", REMOTES_REF_PREFIX, self.name, self.branch)
    }

    /// Returns the short upstream name of the remote's branch, as accepted by
    /// [git2::Branch::set_upstream].
    pub fn upstream_name(&self) -> String {
        format!("{}/{}", self.name, self.branch)
    }

    /// Returns the name of the branch on the remote side, i.e. `refs/heads/<branch>`.
    pub fn merge_reference(&self) -> String {
        format!("{}/{}", HEADS_REF_PREFIX, self.branch)
    }

    /// Returns the refspec that fetches the remote's branch into its tracking reference.
    pub fn fetch_refspec(&self) -> String {
        format!("+{}:{}", self.merge_reference(), self.reference_name())
    }

    /// Returns the refspec that publishes the local branch of the same name to the remote.
    pub fn push_refspec(&self) -> String {
        format!("{0}:{0}", self.merge_reference())
    }

    /// Builds the [RemoteCallbacks] used to authenticate against the remote.
    ///
    /// The credentials are offered once per operation. If the server challenges again, the
    /// credentials were rejected and the callback fails instead of retrying forever.
    pub fn callbacks(&self) -> RemoteCallbacks<'_> {
        let mut offered = false;
        let mut callbacks = RemoteCallbacks::new();

        callbacks.credentials(move |url, _username_from_url, allowed_types| {
            self.answer_challenge(&mut offered, url, allowed_types)
        });
        callbacks.transfer_progress(|progress| {
            trace!(
                received = progress.received_objects(),
                total = progress.total_objects(),
                bytes = progress.received_bytes(),
                "Transfer progress"
            );
            true
        });

        callbacks
    }

    /// Answers one credential challenge from `url`. `offered` records whether the credentials
    /// were already handed out during the current operation.
    fn answer_challenge(
        &self,
        offered: &mut bool,
        url: &str,
        allowed_types: CredentialType,
    ) -> Result<Cred, git2::Error> {
        if *offered {
            return Err(git2::Error::from_str(&format!(
                "credentials for `{}` were rejected by {}",
                self, url
            )));
        }
        if !allowed_types.contains(CredentialType::USER_PASS_PLAINTEXT) {
            return Err(git2::Error::from_str(&format!(
                "{} does not accept username/password authentication for `{}`",
                url, self
            )));
        }

        *offered = true;
        debug!(remote = %self, url, "Offering basic credentials");
        Cred::userpass_plaintext(&self.username, &self.password)
    }
}

impl Display for Remote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.branch)
    }
}

impl Debug for Remote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Remote")
            .field("name", &self.name)
            .field("branch", &self.branch)
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::Remote;
    use git2::CredentialType;

    fn github() -> Remote {
        Remote::new(
            "github",
            "master",
            "https://github.com/eriktate/kagami-test.git",
            "eriktate",
            "hunter2",
        )
    }

    #[test]
    fn reference_names() {
        let remote = github();

        assert_eq!(remote.reference_name(), "refs/remotes/github/master");
        assert_eq!(remote.upstream_name(), "github/master");
        assert_eq!(remote.merge_reference(), "refs/heads/master");
        assert_eq!(
            remote.fetch_refspec(),
            "+refs/heads/master:refs/remotes/github/master"
        );
        assert_eq!(remote.push_refspec(), "refs/heads/master:refs/heads/master");
    }

    #[test]
    fn reference_name_is_stable() {
        assert_eq!(github().reference_name(), github().reference_name());
    }

    #[test]
    fn display_names_remote_and_branch() {
        assert_eq!(github().to_string(), "github/master");

        let other_branch = Remote::new("github", "develop", "", "", "");
        assert_ne!(github().to_string(), other_branch.to_string());
    }

    #[test]
    fn debug_redacts_password() {
        let debug = format!("{:?}", github());
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn credentials_offered_once() {
        let remote = github();
        let mut offered = false;
        let url = "https://github.com/eriktate/kagami-test.git";

        assert!(remote
            .answer_challenge(&mut offered, url, CredentialType::USER_PASS_PLAINTEXT)
            .is_ok());
        assert!(offered);

        // A second challenge means the server rejected the credentials.
        let err = remote
            .answer_challenge(&mut offered, url, CredentialType::USER_PASS_PLAINTEXT)
            .err()
            .expect("second challenge should fail");
        assert!(err.message().contains("github/master"));
        assert!(err.message().contains("rejected"));
    }

    #[test]
    fn credentials_require_userpass() {
        let remote = github();
        let mut offered = false;

        let err = remote
            .answer_challenge(
                &mut offered,
                "ssh://git@github.com/eriktate/kagami-test.git",
                CredentialType::SSH_KEY,
            )
            .err()
            .expect("ssh-only challenge should fail");
        assert!(err.message().contains("github/master"));
        assert!(!offered);
    }
}

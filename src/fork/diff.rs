//! Divergence between the two remotes of a [Fork].

use super::Fork;
use crate::{
    constants::DIFF_CONTEXT_LINES,
    errors::{KagamiError, KagamiResult},
    git::RepositoryExt,
    patch::Patch,
};
use git2::DiffOptions;
use tracing::debug;

/// Which remote a [Patch] is computed relative to.
#[derive(Default, Debug, Clone, Copy, Eq, PartialEq)]
pub enum DiffDirection {
    /// Remote B is the base and remote A the target: the patch describes what A has that B does
    /// not have yet, i.e. what a merge of A into B would bring in.
    #[default]
    BToA,
    /// Remote A is the base and remote B the target. The exact inverse of [DiffDirection::BToA].
    AToB,
}

impl DiffDirection {
    /// Returns the opposite direction.
    pub fn reversed(self) -> Self {
        match self {
            Self::BToA => Self::AToB,
            Self::AToB => Self::BToA,
        }
    }
}

impl Fork {
    /// Computes the [Patch] between the current tips of both remotes.
    ///
    /// Tips are resolved from the tracking references on every call, so the result reflects the
    /// last fetch. The repository is not modified.
    ///
    /// ## Takes
    /// - `direction` - Which remote is the base of the patch.
    ///
    /// ## Returns
    /// - `Ok(Patch)` - The changes from the base tip to the target tip. Empty if both tips have
    ///   identical trees.
    /// - `Err(KagamiError::Reference | KagamiError::CommitResolution)` - If a tip cannot be
    ///   resolved.
    /// - `Err(KagamiError::Diff)` - If the trees cannot be compared.
    pub fn diff_remotes(&self, direction: DiffDirection) -> KagamiResult<Patch> {
        let tip_a = self.repository.remote_tip(&self.remote_a)?;
        let tip_b = self.repository.remote_tip(&self.remote_b)?;

        let ((base_remote, base), (target_remote, target)) = match direction {
            DiffDirection::BToA => ((&self.remote_b, tip_b), (&self.remote_a, tip_a)),
            DiffDirection::AToB => ((&self.remote_a, tip_a), (&self.remote_b, tip_b)),
        };
        debug!(
            base = %base_remote,
            base_tip = %base.id(),
            target = %target_remote,
            target_tip = %target.id(),
            "Diffing remotes"
        );

        let diff_error = |source| KagamiError::Diff {
            base: base_remote.to_string(),
            target: target_remote.to_string(),
            source,
        };

        let base_tree = base.tree().map_err(diff_error)?;
        let target_tree = target.tree().map_err(diff_error)?;

        let mut opts = DiffOptions::new();
        opts.context_lines(DIFF_CONTEXT_LINES);

        let diff = self
            .repository
            .diff_tree_to_tree(Some(&base_tree), Some(&target_tree), Some(&mut opts))
            .map_err(diff_error)?;

        Patch::from_diff(&diff).map_err(diff_error)
    }
}

#[cfg(test)]
mod test {
    use super::DiffDirection;
    use crate::{
        errors::KagamiError,
        patch::{FileStatus, LineOrigin},
        test_utils::TestFork,
    };

    #[test]
    fn identical_tips_yield_empty_patch() {
        let setup = TestFork::new();
        let fork = setup.bootstrap();

        let patch = fork.diff_remotes(DiffDirection::BToA).unwrap();
        assert!(patch.is_empty());
        assert_eq!(patch.to_string(), "");
    }

    #[test]
    fn extra_commit_on_a_adds_file() {
        let setup = TestFork::new();
        setup.a.commit("Add x", &[("x.txt", "hello\nworld\n")]);
        let fork = setup.bootstrap();

        let patch = fork.diff_remotes(DiffDirection::BToA).unwrap();
        assert_eq!(patch.files.len(), 1);

        let file = patch.file("x.txt").unwrap();
        assert_eq!(file.status, FileStatus::Added);
        assert_eq!(file.hunks.len(), 1);
        assert_eq!(file.additions, 2);
        assert_eq!(file.deletions, 0);
        assert!(file.hunks[0]
            .lines
            .iter()
            .all(|l| l.origin == LineOrigin::Addition));
        assert!(patch.to_string().contains("+++ b/x.txt"));
    }

    #[test]
    fn diff_is_deterministic() {
        let setup = TestFork::new();
        setup.a.commit("Edit", &[("README.md", "# Test Repo\n\nMore.\n"), ("y.txt", "y\n")]);
        let fork = setup.bootstrap();

        let first = fork.diff_remotes(DiffDirection::BToA).unwrap();
        let second = fork.diff_remotes(DiffDirection::BToA).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.to_string().as_bytes(), second.to_string().as_bytes());
    }

    #[test]
    fn directions_are_inverse() {
        let setup = TestFork::new();
        setup.a.commit("Edit on A", &[("README.md", "# Test Repo\nfrom a\n"), ("x.txt", "x\n")]);
        setup.b.commit("Edit on B", &[("z.txt", "z\n")]);
        let fork = setup.bootstrap();

        let forward = fork.diff_remotes(DiffDirection::BToA).unwrap();
        let backward = fork.diff_remotes(DiffDirection::BToA.reversed()).unwrap();

        assert_eq!(forward.files.len(), 3);
        assert_eq!(forward.files.len(), backward.files.len());
        for (f, b) in forward.files.iter().zip(backward.files.iter()) {
            assert_eq!(f.path, b.path);
            assert_eq!(f.additions, b.deletions);
            assert_eq!(f.deletions, b.additions);
            assert_eq!(f.hunks.len(), b.hunks.len());

            for (fh, bh) in f.hunks.iter().zip(b.hunks.iter()) {
                assert_eq!((fh.old_start, fh.old_lines), (bh.new_start, bh.new_lines));
                assert_eq!((fh.new_start, fh.new_lines), (bh.old_start, bh.old_lines));
            }
        }

        assert_eq!(forward.file("x.txt").unwrap().status, FileStatus::Added);
        assert_eq!(backward.file("x.txt").unwrap().status, FileStatus::Deleted);
        assert_eq!(forward.file("z.txt").unwrap().status, FileStatus::Deleted);
    }

    #[test]
    fn missing_tracking_reference() {
        let setup = TestFork::new();
        let fork = setup.bootstrap();

        fork.repository()
            .find_reference(&fork.remote_a().reference_name())
            .unwrap()
            .delete()
            .unwrap();

        let err = fork.diff_remotes(DiffDirection::default()).unwrap_err();
        assert!(matches!(err, KagamiError::Reference { ref remote, .. } if remote == "github/master"));
    }
}

//! Structured representation of the changes between two commits.
//!
//! A [Patch] is directional: it describes what changes when moving from a base tree to a target
//! tree. Files are listed in the order `libgit2` reports them (sorted by path), which makes both
//! the structure and its rendered text deterministic for a given pair of trees.

use git2::{Delta, Diff, DiffFormat};

mod fmt;
pub use fmt::DiffStat;

/// The set of file-level changes transforming a base tree into a target tree.
#[derive(Default, Debug, Clone, Eq, PartialEq)]
pub struct Patch {
    /// The changed files.
    pub files: Vec<FilePatch>,
}

/// The changes made to a single file.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FilePatch {
    /// Path of the file in the target tree, or in the base tree if it was deleted.
    pub path: String,
    /// Path of the file in the base tree, when it differs from `path`.
    pub old_path: Option<String>,
    /// What happened to the file.
    pub status: FileStatus,
    /// The `diff --git` header block, exactly as produced by `libgit2`.
    pub header: String,
    /// The hunks of the file. Empty for binary files and pure mode changes.
    pub hunks: Vec<Hunk>,
    /// Whether the file was detected as binary.
    pub binary: bool,
    /// Number of added lines.
    pub additions: usize,
    /// Number of deleted lines.
    pub deletions: usize,
}

/// A contiguous region of changes within a file.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Hunk {
    /// The `@@ -a,b +c,d @@` header line.
    pub header: String,
    pub old_start: u32,
    pub old_lines: u32,
    pub new_start: u32,
    pub new_lines: u32,
    /// The lines of the hunk, in order.
    pub lines: Vec<Line>,
}

/// A single line of a [Hunk].
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Line {
    pub origin: LineOrigin,
    /// The line content, including its trailing newline if it has one.
    pub content: String,
    pub old_lineno: Option<u32>,
    pub new_lineno: Option<u32>,
}

/// The role of a [Line] within its hunk.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum LineOrigin {
    Context,
    Addition,
    Deletion,
    /// "No newline at end of file" marker on a context line.
    ContextEofnl,
    /// "No newline at end of file" marker on an added line.
    AddEofnl,
    /// "No newline at end of file" marker on a deleted line.
    DelEofnl,
}

impl LineOrigin {
    /// Maps a `libgit2` line origin character. [None] for file headers, hunk headers and binary
    /// markers, which are not hunk lines.
    fn from_char(c: char) -> Option<Self> {
        match c {
            ' ' => Some(Self::Context),
            '+' => Some(Self::Addition),
            '-' => Some(Self::Deletion),
            '=' => Some(Self::ContextEofnl),
            '>' => Some(Self::AddEofnl),
            '<' => Some(Self::DelEofnl),
            _ => None,
        }
    }

    /// The prefix written before the line content in unified-diff text.
    pub fn prefix(&self) -> Option<char> {
        match self {
            Self::Context => Some(' '),
            Self::Addition => Some('+'),
            Self::Deletion => Some('-'),
            Self::ContextEofnl | Self::AddEofnl | Self::DelEofnl => None,
        }
    }
}

/// What happened to a file between the base and the target tree.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum FileStatus {
    Added,
    Deleted,
    Modified,
    Renamed,
    Copied,
    Typechange,
}

impl From<Delta> for FileStatus {
    fn from(delta: Delta) -> Self {
        match delta {
            Delta::Added | Delta::Untracked => Self::Added,
            Delta::Deleted => Self::Deleted,
            Delta::Renamed => Self::Renamed,
            Delta::Copied => Self::Copied,
            Delta::Typechange => Self::Typechange,
            _ => Self::Modified,
        }
    }
}

impl Patch {
    /// Builds a [Patch] from a `libgit2` [Diff].
    pub fn from_diff(diff: &Diff<'_>) -> Result<Self, git2::Error> {
        let mut files: Vec<FilePatch> = Vec::new();

        diff.print(DiffFormat::Patch, |delta, hunk, line| {
            match line.origin() {
                // A file header opens a new file entry.
                'F' => {
                    let old_path = delta
                        .old_file()
                        .path()
                        .map(|p| p.to_string_lossy().into_owned());
                    let path = delta
                        .new_file()
                        .path()
                        .map(|p| p.to_string_lossy().into_owned())
                        .or_else(|| old_path.clone())
                        .unwrap_or_default();

                    files.push(FilePatch {
                        old_path: old_path.filter(|old| *old != path),
                        path,
                        status: delta.status().into(),
                        header: String::from_utf8_lossy(line.content()).into_owned(),
                        hunks: Vec::new(),
                        binary: delta.flags().is_binary(),
                        additions: 0,
                        deletions: 0,
                    });
                }
                'B' => {
                    if let Some(file) = files.last_mut() {
                        file.binary = true;
                        file.header
                            .push_str(&String::from_utf8_lossy(line.content()));
                    }
                }
                'H' => {
                    if let (Some(file), Some(hunk)) = (files.last_mut(), hunk) {
                        file.hunks.push(Hunk {
                            header: String::from_utf8_lossy(hunk.header()).into_owned(),
                            old_start: hunk.old_start(),
                            old_lines: hunk.old_lines(),
                            new_start: hunk.new_start(),
                            new_lines: hunk.new_lines(),
                            lines: Vec::new(),
                        });
                    }
                }
                c => {
                    let (Some(origin), Some(file)) = (LineOrigin::from_char(c), files.last_mut())
                    else {
                        return true;
                    };

                    match origin {
                        LineOrigin::Addition => file.additions += 1,
                        LineOrigin::Deletion => file.deletions += 1,
                        _ => {}
                    }

                    if let Some(current) = file.hunks.last_mut() {
                        current.lines.push(Line {
                            origin,
                            content: String::from_utf8_lossy(line.content()).into_owned(),
                            old_lineno: line.old_lineno(),
                            new_lineno: line.new_lineno(),
                        });
                    }
                }
            }
            true
        })?;

        Ok(Self { files })
    }

    /// Returns `true` if the patch contains no changes.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Returns the [FilePatch] for the file at `path`, if it changed.
    pub fn file(&self, path: &str) -> Option<&FilePatch> {
        self.files.iter().find(|f| f.path == path)
    }

    /// Total number of added lines across all files.
    pub fn additions(&self) -> usize {
        self.files.iter().map(|f| f.additions).sum()
    }

    /// Total number of deleted lines across all files.
    pub fn deletions(&self) -> usize {
        self.files.iter().map(|f| f.deletions).sum()
    }

    /// Summarizes the patch.
    pub fn stat(&self) -> DiffStat {
        DiffStat {
            files_changed: self.files.len(),
            insertions: self.additions(),
            deletions: self.deletions(),
        }
    }
}

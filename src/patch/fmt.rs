//! Contains the formatting logic for the [Patch] struct.

use super::{FilePatch, Patch};
use crate::constants::{ADDITION_COLOR, DELETION_COLOR, FILE_HEADER_COLOR, HUNK_HEADER_COLOR};
use itertools::Itertools;
use nu_ansi_term::{Color, Style};
use std::fmt::{self, Display, Write};

impl Patch {
    /// Writes the patch to the passed [Write]r as unified-diff text, colored for the terminal.
    ///
    /// ## Takes
    /// - `w` - The writer to write the patch to.
    ///
    /// ## Returns
    /// - `Ok(_)` - Patch successfully written.
    /// - `Err(_)` - If an error occurs while writing the patch.
    pub fn write_colored<W: Write>(&self, w: &mut W) -> fmt::Result {
        self.files
            .iter()
            .try_for_each(|file| write_file(w, file, true))
    }

    /// Returns the paths of all changed files, comma separated.
    pub fn paths(&self) -> String {
        self.files.iter().map(|f| f.path.as_str()).join(", ")
    }
}

impl Display for Patch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.files
            .iter()
            .try_for_each(|file| write_file(f, file, false))
    }
}

/// Writes a single file's header, hunks and lines.
fn write_file<W: Write>(w: &mut W, file: &FilePatch, colored: bool) -> fmt::Result {
    let paint = |color: Color, text: &str| -> String {
        if colored {
            color.paint(text).to_string()
        } else {
            text.to_string()
        }
    };

    // The header block ends with a newline; paint each of its lines separately so the escape
    // codes never straddle a line break.
    for line in file.header.split_inclusive('\n') {
        let style = if colored { FILE_HEADER_COLOR.bold() } else { Style::new() };
        write_line(w, style, line)?;
    }

    for hunk in &file.hunks {
        write!(w, "{}", paint(HUNK_HEADER_COLOR, hunk.header.trim_end_matches('\n')))?;
        writeln!(w)?;

        for line in &hunk.lines {
            let Some(prefix) = line.origin.prefix() else {
                // End-of-file markers carry their own text.
                w.write_str(&line.content)?;
                continue;
            };

            let text = format!("{}{}", prefix, line.content);
            let style = match (colored, prefix) {
                (true, '+') => ADDITION_COLOR.normal(),
                (true, '-') => DELETION_COLOR.normal(),
                _ => Style::new(),
            };
            write_line(w, style, &text)?;
        }
    }

    Ok(())
}

/// Writes `text` in `style`, keeping a trailing newline outside of the styled region.
fn write_line<W: Write>(w: &mut W, style: Style, text: &str) -> fmt::Result {
    match text.strip_suffix('\n') {
        Some(body) => writeln!(w, "{}", style.paint(body)),
        None => write!(w, "{}", style.paint(text)),
    }
}

/// A `git diff --stat` style summary of a [Patch].
#[derive(Default, Debug, Clone, Copy, Eq, PartialEq)]
pub struct DiffStat {
    pub files_changed: usize,
    pub insertions: usize,
    pub deletions: usize,
}

impl Display for DiffStat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plural = |n: usize| if n == 1 { "" } else { "s" };
        write!(
            f,
            "{} file{} changed, {} insertion{}(+), {} deletion{}(-)",
            self.files_changed,
            plural(self.files_changed),
            self.insertions,
            plural(self.insertions),
            self.deletions,
            plural(self.deletions)
        )
    }
}

#[cfg(test)]
mod test {
    use super::DiffStat;
    use crate::patch::{FilePatch, FileStatus, Hunk, Line, LineOrigin, Patch};

    fn sample() -> Patch {
        Patch {
            files: vec![FilePatch {
                path: "x.txt".to_string(),
                old_path: None,
                status: FileStatus::Added,
                header: "diff --git a/x.txt b/x.txt\nnew file mode 100644\n--- /dev/null\n+++ b/x.txt\n"
                    .to_string(),
                hunks: vec![Hunk {
                    header: "@@ -0,0 +1 @@\n".to_string(),
                    old_start: 0,
                    old_lines: 0,
                    new_start: 1,
                    new_lines: 1,
                    lines: vec![Line {
                        origin: LineOrigin::Addition,
                        content: "hello\n".to_string(),
                        old_lineno: None,
                        new_lineno: Some(1),
                    }],
                }],
                binary: false,
                additions: 1,
                deletions: 0,
            }],
        }
    }

    #[test]
    fn renders_unified_diff() {
        let expected = "diff --git a/x.txt b/x.txt\nnew file mode 100644\n--- /dev/null\n+++ b/x.txt\n@@ -0,0 +1 @@\n+hello\n";
        assert_eq!(sample().to_string(), expected);
    }

    #[test]
    fn colored_rendering_keeps_content() {
        let mut buf = String::new();
        sample().write_colored(&mut buf).unwrap();

        assert!(buf.contains("hello"));
        assert!(buf.contains("\u{1b}["));
        assert_eq!(buf.lines().count(), sample().to_string().lines().count());
    }

    #[test]
    fn stat_summary() {
        assert_eq!(
            sample().stat().to_string(),
            "1 file changed, 1 insertion(+), 0 deletions(-)"
        );
        assert_eq!(DiffStat::default(), Patch::default().stat());
    }
}

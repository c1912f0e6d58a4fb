//! Repository signals used to classify a change set, collected with git2.

use std::fmt;
use std::path::Path;

use git2::{
    Delta, Diff, DiffDelta, DiffFile, DiffFindOptions, DiffFormat, DiffOptions, ErrorCode,
    FileMode, Patch, Repository, Tree,
};
use tracing::{debug, warn};

use crate::error::RepositoryError;

/// Width of the conflict markers git writes (`conflict-marker-size`).
const CONFLICT_MARKER_SIZE: usize = 7;

/// Which side of the working tree to diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffScope {
    /// HEAD tree against the index (`git diff --cached`).
    Staged,
    /// Index against tracked files in the working directory (`git diff`).
    Unstaged,
}

/// Status of a changed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    Added,
    Modified,
    Deleted,
    Renamed,
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileStatus::Added => write!(f, "Added"),
            FileStatus::Modified => write!(f, "Modified"),
            FileStatus::Deleted => write!(f, "Deleted"),
            FileStatus::Renamed => write!(f, "Renamed"),
        }
    }
}

/// A file that appears in the diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub path: String,
    pub status: FileStatus,
    /// Old path for renamed files (None for non-rename changes).
    pub old_path: Option<String>,
}

/// Everything the classifier looks at, gathered in one pass.
///
/// Fields are plain text so a bundle can also be built by hand (or from
/// `git` output) without a repository.
#[derive(Debug, Clone, Default)]
pub struct DiffSignals {
    /// Files present in the diff. Empty means nothing to commit.
    pub staged_files: Vec<StagedFile>,
    /// Full unified diff text, including file and hunk headers.
    pub diff_text: String,
    /// The same diff computed with whitespace ignored; empty when only
    /// whitespace changed.
    pub whitespace_insensitive_diff: String,
    /// Added or deleted files whose content is empty.
    pub empty_files: Vec<String>,
    /// Rename status lines: `R\t<old>\t<new>`.
    pub renames: Vec<String>,
    /// File mode change lines: `mode change <old> => <new> <path>`.
    pub mode_changes: Vec<String>,
    /// Numstat lines: `<adds>\t<dels>\t<path>`, `-\t-\t<path>` for binary files.
    pub numstat: Vec<String>,
    /// Conflict check output: `<path>: leftover conflict marker` and unmerged entries.
    pub conflicts: Vec<String>,
}

/// Open the repository containing `path`.
pub fn open_repository(path: &Path) -> Result<Repository, RepositoryError> {
    Repository::discover(path).map_err(|e| {
        if e.code() == ErrorCode::NotFound {
            RepositoryError::NotARepository(path.to_path_buf())
        } else {
            RepositoryError::Git(e)
        }
    })
}

/// Resolve the HEAD tree, distinguishing empty-repo errors from real failures.
///
/// Returns `Ok(None)` for repos with no commits (unborn branch / not found).
fn resolve_head_tree(repo: &Repository) -> Result<Option<Tree<'_>>, RepositoryError> {
    let head_ref = match repo.head() {
        Ok(r) => r,
        Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
            return Ok(None);
        }
        Err(e) => return Err(RepositoryError::Git(e)),
    };

    let tree = head_ref.peel_to_tree().map_err(RepositoryError::Git)?;
    Ok(Some(tree))
}

fn scoped_diff<'r>(
    repo: &'r Repository,
    head_tree: Option<&Tree<'r>>,
    scope: DiffScope,
    ignore_whitespace: bool,
) -> Result<Diff<'r>, RepositoryError> {
    let mut opts = DiffOptions::new();
    opts.ignore_whitespace(ignore_whitespace);

    let mut diff = match scope {
        DiffScope::Staged => repo.diff_tree_to_index(head_tree, None, Some(&mut opts)),
        DiffScope::Unstaged => repo.diff_index_to_workdir(None, Some(&mut opts)),
    }
    .map_err(RepositoryError::Git)?;

    let mut find = DiffFindOptions::new();
    find.renames(true);
    diff.find_similar(Some(&mut find))
        .map_err(RepositoryError::Git)?;

    Ok(diff)
}

/// Collect the classification signals for the given scope.
pub fn collect_signals(repo: &Repository, scope: DiffScope) -> Result<DiffSignals, RepositoryError> {
    let head_tree = resolve_head_tree(repo)?;
    let diff = scoped_diff(repo, head_tree.as_ref(), scope, false)?;
    let ws_diff = scoped_diff(repo, head_tree.as_ref(), scope, true)?;

    let mut signals = DiffSignals::default();

    for (idx, delta) in diff.deltas().enumerate() {
        let Some(file) = staged_file(&delta) else {
            continue;
        };

        match file.status {
            FileStatus::Added | FileStatus::Deleted => {
                let side = if file.status == FileStatus::Added {
                    delta.new_file()
                } else {
                    delta.old_file()
                };
                if content_len(repo, &side).is_some_and(|len| len == 0) {
                    signals.empty_files.push(file.path.clone());
                }
            }
            FileStatus::Renamed => {
                signals.renames.push(format!(
                    "R\t{}\t{}",
                    file.old_path.as_deref().unwrap_or_default(),
                    file.path
                ));
            }
            FileStatus::Modified => {}
        }

        let (old_mode, new_mode) = (delta.old_file().mode(), delta.new_file().mode());
        if delta.status() != Delta::Added
            && delta.status() != Delta::Deleted
            && old_mode != new_mode
        {
            signals.mode_changes.push(format!(
                "mode change {} => {} {}",
                mode_str(old_mode),
                mode_str(new_mode),
                file.path
            ));
        }

        signals.numstat.push(numstat_line(repo, &diff, idx, &delta, &file.path));
        signals.staged_files.push(file);
    }

    signals.diff_text = patch_text(&diff, &mut signals.conflicts);
    signals.whitespace_insensitive_diff = whitespace_insensitive_text(&ws_diff);

    if scope == DiffScope::Staged {
        collect_index_conflicts(repo, &mut signals.conflicts)?;
    }

    debug!(
        "Collected signals: {} files, {} diff bytes, {} renames, {} mode changes",
        signals.staged_files.len(),
        signals.diff_text.len(),
        signals.renames.len(),
        signals.mode_changes.len()
    );

    Ok(signals)
}

fn staged_file(delta: &DiffDelta<'_>) -> Option<StagedFile> {
    let status = match delta.status() {
        Delta::Added | Delta::Untracked | Delta::Copied => FileStatus::Added,
        Delta::Deleted => FileStatus::Deleted,
        Delta::Renamed => FileStatus::Renamed,
        Delta::Modified | Delta::Typechange | Delta::Conflicted => FileStatus::Modified,
        _ => return None,
    };

    let new_path = path_string(&delta.new_file());
    let old_path = path_string(&delta.old_file());

    let (path, old_path) = match status {
        FileStatus::Renamed => (new_path.clone().or_else(|| old_path.clone())?, old_path),
        _ => (new_path.or(old_path)?, None),
    };

    Some(StagedFile {
        path,
        status,
        old_path,
    })
}

fn path_string(file: &DiffFile<'_>) -> Option<String> {
    file.path().map(|p| p.to_string_lossy().to_string())
}

fn mode_str(mode: FileMode) -> &'static str {
    match mode {
        FileMode::Blob => "100644",
        FileMode::BlobGroupWritable => "100664",
        FileMode::BlobExecutable => "100755",
        FileMode::Link => "120000",
        FileMode::Commit => "160000",
        FileMode::Tree => "040000",
        _ => "000000",
    }
}

/// Size of one side of a delta, from the object database or the working tree.
fn content_len(repo: &Repository, file: &DiffFile<'_>) -> Option<u64> {
    if !file.id().is_zero() {
        return repo.find_blob(file.id()).ok().map(|b| b.size() as u64);
    }
    let workdir = repo.workdir()?;
    let path = file.path()?;
    std::fs::metadata(workdir.join(path)).ok().map(|m| m.len())
}

fn side_is_binary(repo: &Repository, file: &DiffFile<'_>) -> bool {
    if file.is_binary() {
        return true;
    }
    if !file.id().is_zero()
        && let Ok(blob) = repo.find_blob(file.id())
    {
        return blob.is_binary();
    }
    match (repo.workdir(), file.path()) {
        (Some(workdir), Some(path)) => std::fs::read(workdir.join(path))
            .map(|bytes| bytes.contains(&0))
            .unwrap_or(false),
        _ => false,
    }
}

fn numstat_line(
    repo: &Repository,
    diff: &Diff<'_>,
    idx: usize,
    delta: &DiffDelta<'_>,
    path: &str,
) -> String {
    let binary = delta.flags().is_binary()
        || side_is_binary(repo, &delta.old_file())
        || side_is_binary(repo, &delta.new_file());
    if binary {
        return format!("-\t-\t{path}");
    }

    match Patch::from_diff(diff, idx) {
        Ok(Some(patch)) => match patch.line_stats() {
            Ok((_, additions, deletions)) => format!("{additions}\t{deletions}\t{path}"),
            Err(e) => {
                warn!("Failed to compute line stats for {path}: {e}");
                format!("0\t0\t{path}")
            }
        },
        Ok(None) => format!("-\t-\t{path}"),
        Err(e) => {
            warn!("Failed to build patch for {path}: {e}");
            format!("0\t0\t{path}")
        }
    }
}

/// Render the diff as unified patch text, noting conflict markers on the way.
fn patch_text(diff: &Diff<'_>, conflicts: &mut Vec<String>) -> String {
    let mut text = String::new();

    if let Err(e) = diff.print(DiffFormat::Patch, |delta, _hunk, line| {
        let content = String::from_utf8_lossy(line.content());
        let origin = line.origin();

        if origin == '+' && is_conflict_marker(&content) {
            let path = delta
                .new_file()
                .path()
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or_default();
            let entry = format!("{path}: leftover conflict marker");
            if !conflicts.contains(&entry) {
                conflicts.push(entry);
            }
        }

        if origin == '+' || origin == '-' || origin == ' ' {
            text.push(origin);
        }
        text.push_str(&content);
        true
    }) {
        warn!("Failed to collect diff text: {e}");
    }

    text
}

/// Whether `line` is a merge conflict marker, following git's rule.
///
/// The marker is exactly seven characters. `=======` must end the line;
/// `<<<<<<<` and `>>>>>>>` must be followed by a space or the line end.
/// Setext heading underlines such as `==========` are not markers.
fn is_conflict_marker(line: &str) -> bool {
    let line = line.strip_suffix('\n').unwrap_or(line);
    let line = line.strip_suffix('\r').unwrap_or(line);
    let (Some(marker), Some(rest)) = (
        line.get(..CONFLICT_MARKER_SIZE),
        line.get(CONFLICT_MARKER_SIZE..),
    ) else {
        return false;
    };

    match marker {
        "=======" => rest.is_empty(),
        "<<<<<<<" | ">>>>>>>" => rest.is_empty() || rest.starts_with(' '),
        _ => false,
    }
}

/// Diff text as `git diff -w` shows it.
///
/// Added and removed lines, plus file headers for changes that are not plain
/// content edits (added, deleted, renamed, mode or binary changes). A
/// modification that only touched whitespace contributes nothing.
fn whitespace_insensitive_text(diff: &Diff<'_>) -> String {
    let mut text = String::new();

    if let Err(e) = diff.print(DiffFormat::Patch, |delta, _hunk, line| {
        let origin = line.origin();
        let content = String::from_utf8_lossy(line.content());
        match origin {
            '+' | '-' => {
                text.push(origin);
                text.push_str(&content);
            }
            'B' => text.push_str(&content),
            'F' if is_structural(&delta) => text.push_str(&content),
            _ => {}
        }
        true
    }) {
        warn!("Failed to collect whitespace-insensitive diff: {e}");
    }

    text
}

fn is_structural(delta: &DiffDelta<'_>) -> bool {
    !matches!(delta.status(), Delta::Modified | Delta::Unmodified)
        || delta.old_file().mode() != delta.new_file().mode()
        || delta.flags().is_binary()
}

fn collect_index_conflicts(
    repo: &Repository,
    conflicts: &mut Vec<String>,
) -> Result<(), RepositoryError> {
    let index = repo.index().map_err(RepositoryError::Git)?;
    if !index.has_conflicts() {
        return Ok(());
    }

    for conflict in index.conflicts().map_err(RepositoryError::Git)? {
        let conflict = conflict.map_err(RepositoryError::Git)?;
        let entry = conflict.our.or(conflict.their).or(conflict.ancestor);
        if let Some(entry) = entry {
            let path = String::from_utf8_lossy(&entry.path).to_string();
            conflicts.push(format!("{path}: unmerged"));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_status_display() {
        assert_eq!(FileStatus::Added.to_string(), "Added");
        assert_eq!(FileStatus::Modified.to_string(), "Modified");
        assert_eq!(FileStatus::Deleted.to_string(), "Deleted");
        assert_eq!(FileStatus::Renamed.to_string(), "Renamed");
    }

    #[test]
    fn test_is_conflict_marker() {
        assert!(is_conflict_marker("<<<<<<< HEAD\n"));
        assert!(is_conflict_marker("=======\n"));
        assert!(is_conflict_marker("=======\r\n"));
        assert!(is_conflict_marker(">>>>>>> feature\n"));
        assert!(is_conflict_marker(">>>>>>>"));

        assert!(!is_conflict_marker("==============\n"));
        assert!(!is_conflict_marker("======== \n"));
        assert!(!is_conflict_marker("======= trailing\n"));
        assert!(!is_conflict_marker("<<<<<<<<\n"));
        assert!(!is_conflict_marker(">>>>>>>>> quoted\n"));
        assert!(!is_conflict_marker("<<<<<<"));
        assert!(!is_conflict_marker("=====\n"));
    }

    #[test]
    fn test_mode_str() {
        assert_eq!(mode_str(FileMode::Blob), "100644");
        assert_eq!(mode_str(FileMode::BlobExecutable), "100755");
    }

    #[test]
    fn test_open_repository_outside_repo_is_not_a_repository() {
        let dir = tempfile::tempdir().unwrap();
        let result = open_repository(dir.path());
        assert!(matches!(result, Err(RepositoryError::NotARepository(_))));
    }

    #[test]
    fn test_collect_signals_on_empty_repo_has_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();

        let signals = collect_signals(&repo, DiffScope::Staged).unwrap();
        assert!(signals.staged_files.is_empty());
        assert!(signals.diff_text.is_empty());
    }

    #[test]
    fn test_collect_signals_staged_new_file_on_unborn_head() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        std::fs::write(dir.path().join("new.txt"), "hello\n").unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new("new.txt")).unwrap();
        index.write().unwrap();

        let signals = collect_signals(&repo, DiffScope::Staged).unwrap();
        assert_eq!(
            signals.staged_files,
            vec![StagedFile {
                path: "new.txt".to_string(),
                status: FileStatus::Added,
                old_path: None,
            }]
        );
        assert!(signals.diff_text.contains("+hello"));
        assert!(signals.diff_text.contains("+++ b/new.txt"));
        assert_eq!(signals.numstat, vec!["1\t0\tnew.txt".to_string()]);
    }

    #[test]
    fn test_unstaged_scope_ignores_untracked_files() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        std::fs::write(dir.path().join("untracked.txt"), "x\n").unwrap();

        let signals = collect_signals(&repo, DiffScope::Unstaged).unwrap();
        assert!(signals.staged_files.is_empty());
    }
}

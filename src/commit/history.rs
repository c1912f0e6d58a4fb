//! Recent commit history used as style context.

use git2::{ErrorCode, Repository, Sort};
use tracing::debug;

use crate::commit::prompt::RecentHistory;
use crate::error::RepositoryError;

/// Length of abbreviated commit hashes, as `git log --oneline` prints them.
const SHORT_HASH_LEN: usize = 7;

/// Collect up to `depth` commits reachable from HEAD as `<short-hash> <summary>`.
///
/// A repository without commits has an empty history.
pub fn recent_history(repo: &Repository, depth: usize) -> Result<RecentHistory, RepositoryError> {
    let mut revwalk = repo.revwalk().map_err(RepositoryError::Git)?;
    // Changing the sort mode resets the walk, so it goes before the push.
    revwalk
        .set_sorting(Sort::TOPOLOGICAL | Sort::TIME)
        .map_err(RepositoryError::Git)?;
    match revwalk.push_head() {
        Ok(()) => {}
        Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
            return Ok(RecentHistory::default());
        }
        Err(e) => return Err(RepositoryError::Git(e)),
    }

    let mut entries = Vec::with_capacity(depth);
    for oid in revwalk.take(depth) {
        let oid = oid.map_err(RepositoryError::Git)?;
        let commit = repo.find_commit(oid).map_err(RepositoryError::Git)?;
        let hash = oid.to_string();
        let short = &hash[..SHORT_HASH_LEN.min(hash.len())];
        entries.push(format!("{} {}", short, commit.summary().unwrap_or("")));
    }

    debug!("Collected {} recent commits for context", entries.len());
    Ok(RecentHistory::new(entries))
}

use std::{
    collections::{HashSet, VecDeque},
    path::{Path, PathBuf},
};

use gallerist_model::FilterSet;
use tracing::{debug, trace};

use super::{classify, is_hidden};

/// Breadth-first search for the first media file under `root` whose content
/// kind passes `filters`.
///
/// Entries of each directory are visited in name order. Symlinks are
/// followed; canonical directory paths are tracked so cycles terminate, and
/// directories deeper than `max_depth` below `root` are not entered.
/// Unreadable directories are skipped.
pub async fn locate_representative(
    root: &Path,
    filters: &FilterSet,
    max_depth: usize,
) -> Option<PathBuf> {
    let mut queue: VecDeque<(PathBuf, usize)> = VecDeque::new();
    let mut visited: HashSet<PathBuf> = HashSet::new();
    queue.push_back((root.to_path_buf(), 0));

    while let Some((dir, depth)) = queue.pop_front() {
        let canonical = match tokio::fs::canonicalize(&dir).await {
            Ok(path) => path,
            Err(err) => {
                debug!(path = %dir.display(), error = %err, "skipping unresolvable directory");
                continue;
            }
        };
        if !visited.insert(canonical) {
            trace!(path = %dir.display(), "directory already visited");
            continue;
        }

        let children = match read_children(&dir).await {
            Ok(children) => children,
            Err(err) => {
                debug!(path = %dir.display(), error = %err, "skipping unreadable directory");
                continue;
            }
        };

        for (path, is_dir) in children {
            if is_dir {
                if depth < max_depth {
                    queue.push_back((path, depth + 1));
                }
                continue;
            }
            if classify(&path).is_some_and(|kind| filters.accepts_content(kind)) {
                return Some(path);
            }
        }
    }

    None
}

/// Visible children of `dir`, sorted by name, with symlinks resolved.
async fn read_children(dir: &Path) -> std::io::Result<Vec<(PathBuf, bool)>> {
    let mut reader = tokio::fs::read_dir(dir).await?;
    let mut children = Vec::new();

    while let Some(entry) = reader.next_entry().await? {
        let path = entry.path();
        if is_hidden(&path) {
            continue;
        }
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_dir() => children.push((path, true)),
            Ok(meta) if meta.is_file() => children.push((path, false)),
            Ok(_) => {}
            Err(err) => {
                trace!(path = %path.display(), error = %err, "dangling entry");
            }
        }
    }

    children.sort_by(|a, b| a.0.file_name().cmp(&b.0.file_name()));
    Ok(children)
}

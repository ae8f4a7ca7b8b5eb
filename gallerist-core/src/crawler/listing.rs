use std::{cmp::Ordering, path::PathBuf, time::SystemTime};

use gallerist_model::{EntryKind, SortMode};
use rand::seq::SliceRandom;
use tracing::{debug, warn};

use super::CrawlQuery;
use crate::{
    error::CatalogError,
    probe::{classify, is_hidden},
};

/// A direct child of the crawl root that survived filtering.
#[derive(Debug, Clone)]
pub(crate) struct Candidate {
    pub path: PathBuf,
    pub kind: EntryKind,
    pub size: u64,
    pub modified: Option<SystemTime>,
    pub created: Option<SystemTime>,
}

/// List, filter and sort the immediate children of the query root.
///
/// Per-entry stat failures drop that entry; failing to open the root is an
/// error.
pub(crate) async fn list_candidates(
    query: &CrawlQuery,
) -> Result<Vec<Candidate>, CatalogError> {
    let enumeration = |source| CatalogError::Enumeration {
        path: query.root.clone(),
        source,
    };
    let mut reader =
        tokio::fs::read_dir(&query.root).await.map_err(enumeration)?;
    let mut candidates = Vec::new();

    loop {
        let entry = match reader.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(err) => {
                warn!(root = %query.root.display(), error = %err, "directory listing interrupted");
                break;
            }
        };
        let path = entry.path();
        if is_hidden(&path) {
            continue;
        }

        let meta = match tokio::fs::metadata(&path).await {
            Ok(meta) => meta,
            Err(err) => {
                debug!(path = %path.display(), error = %err, "skipping unreadable entry");
                continue;
            }
        };

        let kind = if meta.is_dir() {
            EntryKind::Directory
        } else if meta.is_file() {
            EntryKind::File
        } else {
            continue;
        };
        if !query.filters.accepts_entry(kind) {
            continue;
        }
        if kind == EntryKind::File
            && !classify(&path)
                .is_some_and(|content| query.filters.accepts_content(content))
        {
            continue;
        }

        candidates.push(Candidate {
            path,
            kind,
            size: meta.len(),
            modified: meta.modified().ok(),
            created: meta.created().ok(),
        });
    }

    sort_candidates(&mut candidates, query.sort);
    Ok(candidates)
}

pub(crate) fn sort_candidates(candidates: &mut [Candidate], sort: SortMode) {
    match sort {
        SortMode::None => {}
        SortMode::Name => candidates.sort_by(by_name),
        SortMode::Size => {
            candidates.sort_by(|a, b| a.size.cmp(&b.size).then_with(|| by_name(a, b)))
        }
        SortMode::Modified => candidates
            .sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| by_name(a, b))),
        SortMode::Created => candidates
            .sort_by(|a, b| a.created.cmp(&b.created).then_with(|| by_name(a, b))),
        SortMode::Random => candidates.shuffle(&mut rand::rng()),
    }
}

fn by_name(a: &Candidate, b: &Candidate) -> Ordering {
    a.path.file_name().cmp(&b.path.file_name())
}

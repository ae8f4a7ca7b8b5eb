//! One traversal of one directory, exposed as pages while it runs.
//!
//! The first [`DirectoryCrawler::page`] call starts a background scan: the
//! root's children are listed, filtered and sorted, then every survivor is
//! probed on the shared [`TaskPool`]. Page requests are queued and answered as
//! soon as enough entries have resolved, or when the scan is done.

mod listing;
mod state;

use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
    time::Instant,
};

use gallerist_model::{ContentKind, EntryKind, FilterSet, SortMode};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::{
    error::{CatalogError, ProbeError, Result},
    pool::TaskPool,
    probe::{DimensionProbe, locate_representative},
};
use listing::Candidate;
use state::CrawlerState;

/// What to crawl and how to present it. Immutable once a crawl starts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CrawlQuery {
    pub root: PathBuf,
    pub sort: SortMode,
    pub filters: FilterSet,
}

impl CrawlQuery {
    pub fn new(root: impl AsRef<Path>, sort: SortMode, filters: FilterSet) -> Self {
        // Normalises trailing separators and `.` components.
        let root: PathBuf = root.as_ref().components().collect();
        Self {
            root,
            sort,
            filters,
        }
    }

    /// Deterministic signature used as the catalog cache key.
    pub fn cache_key(&self) -> String {
        format!(
            "{}|sort={}|root={}",
            self.filters.signature(),
            self.sort,
            self.root.display()
        )
    }
}

/// A probed catalog entry. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEntry {
    pub source_path: PathBuf,
    pub representative_file: PathBuf,
    pub is_file: bool,
    pub kind: ContentKind,
    pub width: u32,
    pub height: u32,
}

/// A slice of resolved entries. `has_next` is exact: it is only reported
/// once an entry beyond the page exists or the crawl has finished.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub entries: Vec<ResolvedEntry>,
    pub has_next: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlPhase {
    NotStarted,
    Running,
    Done,
}

/// Order in which resolved entries are published to pages.
///
/// `Dispatch` keeps the requested sort by holding back results that finish
/// before earlier entries. `Completion` publishes as soon as a probe finishes,
/// so the sort is only best-effort when the pool runs more than one probe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultOrder {
    #[default]
    Dispatch,
    Completion,
}

impl FromStr for ResultOrder {
    type Err = String;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "dispatch" => Ok(ResultOrder::Dispatch),
            "completion" => Ok(ResultOrder::Completion),
            other => Err(format!(
                "unknown result order '{other}' (expected dispatch or completion)"
            )),
        }
    }
}

impl fmt::Display for ResultOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultOrder::Dispatch => f.write_str("dispatch"),
            ResultOrder::Completion => f.write_str("completion"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlStatus {
    pub phase: CrawlPhase,
    pub resolved: usize,
    pub dispatched: usize,
    pub failed: usize,
    pub pending_pages: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct CrawlSettings {
    pub order: ResultOrder,
    /// Depth cap for the representative-file search below a subdirectory.
    pub max_search_depth: usize,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            order: ResultOrder::Dispatch,
            max_search_depth: 16,
        }
    }
}

pub struct DirectoryCrawler {
    query: CrawlQuery,
    settings: CrawlSettings,
    probe: Arc<dyn DimensionProbe>,
    pool: TaskPool,
    state: Arc<Mutex<CrawlerState>>,
}

impl fmt::Debug for DirectoryCrawler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryCrawler")
            .field("query", &self.query)
            .field("settings", &self.settings)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl DirectoryCrawler {
    pub fn new(
        query: CrawlQuery,
        probe: Arc<dyn DimensionProbe>,
        pool: TaskPool,
        settings: CrawlSettings,
    ) -> Self {
        Self {
            query,
            settings,
            probe,
            pool,
            state: Arc::new(Mutex::new(CrawlerState::new(settings.order))),
        }
    }

    pub fn status(&self) -> CrawlStatus {
        self.state.lock().status()
    }

    pub fn entry_for(&self, representative: &Path) -> Option<ResolvedEntry> {
        self.state.lock().entry_for(representative).cloned()
    }

    /// Page `index` of the results. The first call fixes `page_size` for the
    /// lifetime of the crawler and starts the scan.
    pub async fn page(&self, index: usize, page_size: usize) -> Result<Page> {
        let (reply, start_scan) = {
            let mut state = self.state.lock();
            let page_size = state.page_size(page_size);
            let start = index.saturating_mul(page_size);
            let end = start.saturating_add(page_size);
            let (tx, rx) = oneshot::channel();
            state.request(start..end, tx);
            (rx, state.begin())
        };

        if start_scan {
            self.spawn_scan();
        }

        reply.await.map_err(|_| {
            CatalogError::Internal(format!(
                "crawl of {} ended without answering page {index}",
                self.query.root.display()
            ))
        })
    }

    fn spawn_scan(&self) {
        let scan = Scan {
            query: self.query.clone(),
            settings: self.settings,
            probe: Arc::clone(&self.probe),
            pool: self.pool.clone(),
            state: Arc::clone(&self.state),
        };
        tokio::spawn(scan.run());
    }
}

struct Scan {
    query: CrawlQuery,
    settings: CrawlSettings,
    probe: Arc<dyn DimensionProbe>,
    pool: TaskPool,
    state: Arc<Mutex<CrawlerState>>,
}

impl Scan {
    async fn run(self) {
        let started = Instant::now();
        let root = self.query.root.clone();

        let candidates = match listing::list_candidates(&self.query).await {
            Ok(candidates) => candidates,
            Err(err) => {
                warn!(root = %root.display(), error = %err, "crawl root could not be listed");
                self.state.lock().finish();
                return;
            }
        };

        info!(
            root = %root.display(),
            entries = candidates.len(),
            sort = %self.query.sort,
            "crawl dispatching entries"
        );
        self.state.lock().set_dispatched(candidates.len());

        let job = Arc::new(ProbeJob {
            probe: Arc::clone(&self.probe),
            filters: self.query.filters.clone(),
            max_search_depth: self.settings.max_search_depth,
        });
        let mut completions = self.pool.run(candidates, move |candidate| {
            let job = Arc::clone(&job);
            async move { job.resolve(candidate).await }
        });

        while let Some(done) = completions.recv().await {
            let entry = match done.outcome {
                Ok(Ok(entry)) => Some(entry),
                Ok(Err((path, err))) => {
                    warn!(path = %path.display(), error = %err, "dropping entry");
                    None
                }
                Err(_) => {
                    error!(slot = done.index, root = %root.display(), "probe job panicked");
                    None
                }
            };
            self.state.lock().record(done.index, entry);
        }

        let status = {
            let mut state = self.state.lock();
            state.finish();
            state.status()
        };
        info!(
            root = %root.display(),
            resolved = status.resolved,
            failed = status.failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "crawl finished"
        );
    }
}

struct ProbeJob {
    probe: Arc<dyn DimensionProbe>,
    filters: FilterSet,
    max_search_depth: usize,
}

impl ProbeJob {
    async fn resolve(
        &self,
        candidate: Candidate,
    ) -> std::result::Result<ResolvedEntry, (PathBuf, ProbeError)> {
        let Candidate { path, kind, .. } = candidate;

        let representative = match kind {
            EntryKind::File => path.clone(),
            EntryKind::Directory => {
                match locate_representative(&path, &self.filters, self.max_search_depth)
                    .await
                {
                    Some(found) => found,
                    None => {
                        return Err((path.clone(), ProbeError::NoRepresentative(path)));
                    }
                }
            }
        };

        let dims = match self.probe.probe(&representative).await {
            Ok(dims) => dims,
            Err(err) => return Err((representative, err)),
        };
        debug!(
            path = %path.display(),
            width = dims.width,
            height = dims.height,
            "entry resolved"
        );

        Ok(ResolvedEntry {
            is_file: kind == EntryKind::File,
            source_path: path,
            representative_file: representative,
            kind: dims.kind,
            width: dims.width,
            height: dims.height,
        })
    }
}

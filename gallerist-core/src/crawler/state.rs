use std::{
    collections::{BTreeMap, HashMap, VecDeque},
    ops::Range,
    path::PathBuf,
};

use tokio::sync::oneshot;
use tracing::trace;

use super::{CrawlPhase, CrawlStatus, Page, ResolvedEntry, ResultOrder};

#[derive(Debug)]
struct PendingPage {
    range: Range<usize>,
    reply: oneshot::Sender<Page>,
}

/// Mutable state of one crawl. Owned by exactly one crawler.
#[derive(Debug)]
pub(crate) struct CrawlerState {
    phase: CrawlPhase,
    order: ResultOrder,
    entries: Vec<ResolvedEntry>,
    by_representative: HashMap<PathBuf, usize>,
    page_size: Option<usize>,
    waiters: VecDeque<PendingPage>,
    /// Finished slots waiting for earlier dispatch slots (dispatch order only).
    reorder: BTreeMap<usize, Option<ResolvedEntry>>,
    next_slot: usize,
    dispatched: usize,
    failed: usize,
}

impl CrawlerState {
    pub fn new(order: ResultOrder) -> Self {
        Self {
            phase: CrawlPhase::NotStarted,
            order,
            entries: Vec::new(),
            by_representative: HashMap::new(),
            page_size: None,
            waiters: VecDeque::new(),
            reorder: BTreeMap::new(),
            next_slot: 0,
            dispatched: 0,
            failed: 0,
        }
    }

    /// Fix the page size on first use; later requests reuse it.
    pub fn page_size(&mut self, requested: usize) -> usize {
        *self.page_size.get_or_insert(requested.max(1))
    }

    /// Move to `Running` the first time; returns whether the caller must
    /// start the scan.
    pub fn begin(&mut self) -> bool {
        if self.phase == CrawlPhase::NotStarted {
            self.phase = CrawlPhase::Running;
            true
        } else {
            false
        }
    }

    pub fn set_dispatched(&mut self, dispatched: usize) {
        self.dispatched = dispatched;
    }

    /// Answer immediately when the range is already available, otherwise
    /// queue the request.
    pub fn request(&mut self, range: Range<usize>, reply: oneshot::Sender<Page>) {
        if self.is_satisfied(&range) {
            let _ = reply.send(self.slice(&range));
        } else {
            self.waiters.push_back(PendingPage { range, reply });
        }
    }

    /// Record the outcome of dispatch slot `slot`; `None` marks a dropped
    /// entry.
    pub fn record(&mut self, slot: usize, entry: Option<ResolvedEntry>) {
        if entry.is_none() {
            self.failed += 1;
        }
        match self.order {
            ResultOrder::Completion => {
                if let Some(entry) = entry {
                    self.publish(entry);
                }
            }
            ResultOrder::Dispatch => {
                self.reorder.insert(slot, entry);
                while let Some(ready) = self.reorder.remove(&self.next_slot) {
                    self.next_slot += 1;
                    if let Some(entry) = ready {
                        self.publish(entry);
                    }
                }
            }
        }
        self.flush_waiters();
    }

    /// Mark the crawl done and answer every outstanding request.
    pub fn finish(&mut self) {
        // Slots that never reported are skipped rather than waited on.
        let stranded = std::mem::take(&mut self.reorder);
        for entry in stranded.into_values().flatten() {
            self.publish(entry);
        }
        self.phase = CrawlPhase::Done;
        self.flush_waiters();
    }

    pub fn status(&self) -> CrawlStatus {
        CrawlStatus {
            phase: self.phase,
            resolved: self.entries.len(),
            dispatched: self.dispatched,
            failed: self.failed,
            pending_pages: self.waiters.len(),
        }
    }

    pub fn entry_for(&self, representative: &std::path::Path) -> Option<&ResolvedEntry> {
        self.by_representative
            .get(representative)
            .and_then(|index| self.entries.get(*index))
    }

    fn publish(&mut self, entry: ResolvedEntry) {
        self.by_representative
            .insert(entry.representative_file.clone(), self.entries.len());
        self.entries.push(entry);
    }

    /// A range is answerable once one entry past its end exists (so
    /// `has_next` is exact) or nothing more will arrive.
    fn is_satisfied(&self, range: &Range<usize>) -> bool {
        self.phase == CrawlPhase::Done || self.entries.len() > range.end
    }

    fn slice(&self, range: &Range<usize>) -> Page {
        let len = self.entries.len();
        let start = range.start.min(len);
        let end = range.end.min(len);
        Page {
            entries: self.entries[start..end].to_vec(),
            has_next: len > range.end,
        }
    }

    fn flush_waiters(&mut self) {
        let mut still_waiting = VecDeque::with_capacity(self.waiters.len());
        while let Some(pending) = self.waiters.pop_front() {
            if pending.reply.is_closed() {
                trace!(start = pending.range.start, "page requester went away");
                continue;
            }
            if self.is_satisfied(&pending.range) {
                let page = self.slice(&pending.range);
                let _ = pending.reply.send(page);
            } else {
                still_waiting.push_back(pending);
            }
        }
        self.waiters = still_waiting;
    }
}

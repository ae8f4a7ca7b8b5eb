//! Core library for Gallerist.
//!
//! Walks media directories, measures what it finds, and serves the results
//! as paged catalogs while the walk is still running.
//!
//! - [`crawler`]: one traversal of one directory, paged while it runs
//! - [`probe`]: media classification, dimension probing, representative search
//! - [`pool`]: bounded-concurrency job runner shared by every crawl
//! - [`cache`]: FIFO-bounded map of live crawlers
//! - [`service`]: catalog requests in, shaped gallery pages out
//! - [`thumbnail`]: resize with cover-fit and entropy crop
//! - [`net`]: free-port allocation with short-lived leases
#![allow(missing_docs)]

pub mod cache;
pub mod crawler;
pub mod error;
pub mod net;
pub mod pool;
pub mod probe;
pub mod service;
pub mod thumbnail;

pub use cache::{CacheKey, CatalogCache, DEFAULT_CACHE_CAPACITY};
pub use crawler::{
    CrawlPhase, CrawlQuery, CrawlSettings, CrawlStatus, DirectoryCrawler, Page,
    ResolvedEntry, ResultOrder,
};
pub use error::{CatalogError, PortError, ProbeError, Result};
pub use net::{PortAllocator, PortRequest};
pub use pool::TaskPool;
pub use probe::{DimensionProbe, Dimensions, FfprobeConfig, MediaProbe};
pub use service::{CatalogService, CatalogSettings, DEFAULT_PAGE_SIZE};
pub use thumbnail::{ResizeRequest, Resized};

use std::{
    net::{IpAddr, Ipv4Addr},
    path::PathBuf,
    time::Duration,
};

use anyhow::{Context, bail};
use clap::Args as ClapArgs;
use gallerist_core::{
    CatalogSettings, CrawlSettings, DEFAULT_CACHE_CAPACITY, DEFAULT_PAGE_SIZE,
    FfprobeConfig, PortRequest, ResultOrder,
};

/// Command-line / environment surface. Every flag has an env twin so the
/// server can be configured from `.env` alone.
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Interface to bind
    #[arg(long, env = "GALLERIST_HOST")]
    pub host: Option<IpAddr>,

    /// Preferred port; an ephemeral port is used when unset or taken
    #[arg(short, long, env = "GALLERIST_PORT")]
    pub port: Option<u16>,

    /// Fail instead of falling back when --port is unavailable
    #[arg(long, env = "GALLERIST_STRICT_PORT", default_value_t = false)]
    pub strict_port: bool,

    /// Gallery served when a request omits galleryId
    #[arg(long, env = "GALLERIST_MEDIA_ROOT")]
    pub media_root: Option<PathBuf>,

    /// Items per catalog page
    #[arg(long, env = "GALLERIST_PAGE_SIZE")]
    pub page_size: Option<usize>,

    /// Live crawlers kept before the oldest is evicted
    #[arg(long, env = "GALLERIST_CACHE_CAPACITY")]
    pub cache_capacity: Option<usize>,

    /// Concurrent probes across all crawls (defaults to the CPU count)
    #[arg(long, env = "GALLERIST_PROBE_CONCURRENCY")]
    pub probe_concurrency: Option<usize>,

    /// `dispatch` keeps sort order, `completion` publishes as probes finish
    #[arg(long, env = "GALLERIST_RESULT_ORDER")]
    pub result_order: Option<ResultOrder>,

    /// ffprobe binary used for video dimensions
    #[arg(long, env = "FFPROBE_PATH")]
    pub ffprobe_path: Option<PathBuf>,

    /// Per-file probe timeout, e.g. `30s` or `2m`
    #[arg(long, env = "GALLERIST_PROBE_TIMEOUT", value_parser = humantime::parse_duration)]
    pub probe_timeout: Option<Duration>,

    /// Depth searched below a folder for its cover file
    #[arg(long, env = "GALLERIST_MAX_SEARCH_DEPTH")]
    pub max_search_depth: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: Option<u16>,
    pub strict_port: bool,
    pub media_root: Option<PathBuf>,
    pub page_size: usize,
    pub cache_capacity: usize,
    pub probe_concurrency: usize,
    pub result_order: ResultOrder,
    pub ffprobe_path: PathBuf,
    pub probe_timeout: Duration,
    pub max_search_depth: usize,
    pub env_file_loaded: bool,
}

impl Default for Config {
    fn default() -> Self {
        let ffprobe = FfprobeConfig::default();
        let crawl = CrawlSettings::default();
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: None,
            strict_port: false,
            media_root: None,
            page_size: DEFAULT_PAGE_SIZE,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            probe_concurrency: num_cpus::get(),
            result_order: crawl.order,
            ffprobe_path: ffprobe.program,
            probe_timeout: ffprobe.timeout,
            max_search_depth: crawl.max_search_depth,
            env_file_loaded: false,
        }
    }
}

/// Load `.env` into the process environment so clap sees its values.
/// Returns whether a file was found.
pub fn load_env_file() -> bool {
    dotenvy::dotenv().is_ok()
}

impl Config {
    /// Merge CLI/env values over the defaults and validate the result.
    pub fn load(args: ServeArgs, env_file_loaded: bool) -> anyhow::Result<Self> {
        let mut config = Self::from_args(args);
        config.env_file_loaded = env_file_loaded;
        config.validate()?;
        Ok(config)
    }

    pub fn from_args(args: ServeArgs) -> Self {
        let defaults = Self::default();
        Self {
            host: args.host.unwrap_or(defaults.host),
            port: args.port,
            strict_port: args.strict_port,
            media_root: args.media_root,
            page_size: args.page_size.unwrap_or(defaults.page_size),
            cache_capacity: args.cache_capacity.unwrap_or(defaults.cache_capacity),
            probe_concurrency: args
                .probe_concurrency
                .unwrap_or(defaults.probe_concurrency),
            result_order: args.result_order.unwrap_or(defaults.result_order),
            ffprobe_path: args.ffprobe_path.unwrap_or(defaults.ffprobe_path),
            probe_timeout: args.probe_timeout.unwrap_or(defaults.probe_timeout),
            max_search_depth: args
                .max_search_depth
                .unwrap_or(defaults.max_search_depth),
            env_file_loaded: false,
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.page_size == 0 {
            bail!("page size must be at least 1");
        }
        if self.cache_capacity == 0 {
            bail!("cache capacity must be at least 1");
        }
        if self.probe_concurrency == 0 {
            bail!("probe concurrency must be at least 1");
        }
        if self.probe_timeout.is_zero() {
            bail!("probe timeout must be non-zero");
        }
        if self.strict_port && self.port.is_none() {
            bail!("--strict-port requires --port");
        }
        if let Some(root) = &self.media_root {
            let meta = std::fs::metadata(root).with_context(|| {
                format!("media root {} is not accessible", root.display())
            })?;
            if !meta.is_dir() {
                bail!("media root {} is not a directory", root.display());
            }
        }
        Ok(())
    }

    pub fn port_request(&self) -> PortRequest {
        match self.port {
            Some(port) if self.strict_port => PortRequest::strict(port),
            Some(port) => PortRequest::preferred(port),
            None => PortRequest::any(),
        }
    }

    pub fn ffprobe(&self) -> FfprobeConfig {
        FfprobeConfig {
            program: self.ffprobe_path.clone(),
            timeout: self.probe_timeout,
        }
    }

    pub fn catalog_settings(&self) -> CatalogSettings {
        CatalogSettings {
            page_size: self.page_size,
            crawl: CrawlSettings {
                order: self.result_order,
                max_search_depth: self.max_search_depth,
            },
        }
    }
}

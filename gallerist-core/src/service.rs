//! Catalog requests in, shaped gallery pages out.

use std::{path::Path, sync::Arc};

use gallerist_model::{
    ContentKind, FilterDescriptor, FilterSection, FilterSet, GalleryPage, Item,
    ItemUrl, SortMode,
};
use tracing::{debug, instrument};
use url::form_urlencoded;

use crate::{
    cache::{CacheKey, CatalogCache},
    crawler::{CrawlQuery, CrawlSettings, DirectoryCrawler, ResolvedEntry},
    error::{CatalogError, Result},
    pool::TaskPool,
    probe::DimensionProbe,
};

pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Linear scale of the thumbnail variant attached to image items.
const THUMBNAIL_DIVISOR: u32 = 4;

#[derive(Debug, Clone, Copy)]
pub struct CatalogSettings {
    pub page_size: usize,
    pub crawl: CrawlSettings,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            crawl: CrawlSettings::default(),
        }
    }
}

/// Builds the media URLs embedded in items.
#[derive(Debug, Clone)]
pub struct MediaUrls {
    image_path: String,
    video_path: String,
}

impl Default for MediaUrls {
    fn default() -> Self {
        Self {
            image_path: "/image".to_string(),
            video_path: "/video".to_string(),
        }
    }
}

impl MediaUrls {
    pub fn primary(&self, kind: ContentKind, file: &Path) -> String {
        let endpoint = match kind {
            ContentKind::Image => &self.image_path,
            ContentKind::Video => &self.video_path,
        };
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("uri", &file.to_string_lossy())
            .finish();
        format!("{endpoint}?{query}")
    }

    pub fn resized_image(&self, file: &Path, width: u32) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("uri", &file.to_string_lossy())
            .append_pair("width", &width.to_string())
            .finish();
        format!("{}?{query}", self.image_path)
    }
}

#[derive(Debug)]
pub struct CatalogService {
    cache: Arc<CatalogCache>,
    pool: TaskPool,
    probe: Arc<dyn DimensionProbe>,
    settings: CatalogSettings,
    urls: MediaUrls,
}

impl CatalogService {
    pub fn new(
        cache: Arc<CatalogCache>,
        pool: TaskPool,
        probe: Arc<dyn DimensionProbe>,
        settings: CatalogSettings,
    ) -> Self {
        Self {
            cache,
            pool,
            probe,
            settings,
            urls: MediaUrls::default(),
        }
    }

    pub fn cache(&self) -> &CatalogCache {
        &self.cache
    }

    /// Page `offset` of `root`'s catalog. Negative offsets read page 0; the
    /// returned `offset` is the next page index.
    #[instrument(skip(self, root, filters), fields(root = %root.display()))]
    pub async fn fetch_items(
        &self,
        root: &Path,
        offset: i64,
        sort: SortMode,
        filters: FilterSet,
    ) -> Result<GalleryPage> {
        let is_dir = tokio::fs::metadata(root)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false);
        if !is_dir {
            return Err(CatalogError::NotFound(format!(
                "gallery {} is not a directory",
                root.display()
            )));
        }

        let query = CrawlQuery::new(root, sort, filters);
        let (crawler, created) = self
            .cache
            .get_or_insert_with(CacheKey::from(&query), || self.build_crawler(query.clone()));
        if created {
            debug!(key = %query.cache_key(), "registered catalog crawler");
        }

        let index = usize::try_from(offset.max(0)).unwrap_or(usize::MAX);
        let page = crawler.page(index, self.settings.page_size).await?;

        Ok(GalleryPage {
            items: page.entries.iter().map(|entry| self.shape(entry)).collect(),
            has_next: page.has_next,
            offset: index as u64 + 1,
        })
    }

    /// Filters of `section`, or of every section when none is named.
    /// An unknown section yields no filters.
    pub fn fetch_filters(&self, section: Option<&str>) -> Vec<FilterDescriptor> {
        let sections: Vec<FilterSection> = match section {
            None => FilterSection::all().to_vec(),
            Some(raw) => FilterSection::from_api_name(raw).into_iter().collect(),
        };
        sections
            .iter()
            .flat_map(|section| section.filters())
            .map(|filter| filter.descriptor())
            .collect()
    }

    fn build_crawler(&self, query: CrawlQuery) -> DirectoryCrawler {
        DirectoryCrawler::new(
            query,
            Arc::clone(&self.probe),
            self.pool.clone(),
            self.settings.crawl,
        )
    }

    fn shape(&self, entry: &ResolvedEntry) -> Item {
        let file = &entry.representative_file;
        let mut urls = vec![ItemUrl {
            url: self.urls.primary(entry.kind, file),
            width: entry.width,
            height: entry.height,
        }];
        if entry.kind == ContentKind::Image {
            let width = (entry.width / THUMBNAIL_DIVISOR).max(1);
            let height = (entry.height / THUMBNAIL_DIVISOR).max(1);
            urls.push(ItemUrl {
                url: self.urls.resized_image(file, width),
                width,
                height,
            });
        }

        Item {
            id: entry.source_path.to_string_lossy().into_owned(),
            name: display_name(&entry.source_path),
            width: entry.width,
            height: entry.height,
            urls,
            is_video: entry.kind == ContentKind::Video,
            is_gallery: !entry.is_file,
            filters: Vec::new(),
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::MediaProbe;
    use gallerist_model::{CatalogFilter, EntryKind};
    use image::{ImageBuffer, Rgb};
    use std::fs;

    fn service(page_size: usize, capacity: usize) -> CatalogService {
        CatalogService::new(
            Arc::new(CatalogCache::new(capacity)),
            TaskPool::new(2),
            Arc::new(MediaProbe::default()),
            CatalogSettings {
                page_size,
                crawl: CrawlSettings::default(),
            },
        )
    }

    fn write_png(path: &Path, width: u32, height: u32) {
        ImageBuffer::from_pixel(width, height, Rgb([10u8, 20, 30]))
            .save(path)
            .unwrap();
    }

    #[tokio::test]
    async fn shapes_image_items_with_thumbnail_url() {
        let dir = tempfile::tempdir().unwrap();
        write_png(&dir.path().join("a.png"), 100, 60);

        let page = service(10, 4)
            .fetch_items(dir.path(), 0, SortMode::Name, FilterSet::new())
            .await
            .unwrap();

        assert_eq!(page.offset, 1);
        assert!(!page.has_next);
        let item = &page.items[0];
        assert_eq!(item.name, "a.png");
        assert_eq!((item.width, item.height), (100, 60));
        assert!(!item.is_gallery && !item.is_video);
        assert_eq!(item.urls.len(), 2);
        assert!(item.urls[0].url.starts_with("/image?uri="));
        assert_eq!((item.urls[1].width, item.urls[1].height), (25, 15));
        assert!(item.urls[1].url.ends_with("&width=25"));
    }

    #[tokio::test]
    async fn tiny_images_get_one_pixel_thumbnails() {
        let dir = tempfile::tempdir().unwrap();
        write_png(&dir.path().join("dot.png"), 2, 3);

        let page = service(10, 4)
            .fetch_items(dir.path(), 0, SortMode::None, FilterSet::new())
            .await
            .unwrap();
        let thumb = &page.items[0].urls[1];
        assert_eq!((thumb.width, thumb.height), (1, 1));
    }

    #[tokio::test]
    async fn negative_offset_reads_first_page() {
        let dir = tempfile::tempdir().unwrap();
        write_png(&dir.path().join("a.png"), 4, 4);
        write_png(&dir.path().join("b.png"), 4, 4);

        let svc = service(1, 4);
        let page = svc
            .fetch_items(dir.path(), -3, SortMode::Name, FilterSet::new())
            .await
            .unwrap();
        assert_eq!(page.offset, 1);
        assert!(page.has_next);
        assert_eq!(page.items[0].name, "a.png");
        assert_eq!(svc.cache().len(), 1);
    }

    #[tokio::test]
    async fn filtered_out_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        write_png(&dir.path().join("a.png"), 4, 4);

        let dirs: FilterSet =
            [CatalogFilter::FileType(EntryKind::Directory)].into_iter().collect();
        let page = service(10, 4)
            .fetch_items(dir.path(), 0, SortMode::None, dirs)
            .await
            .unwrap();
        assert_eq!(page, GalleryPage::empty(1));
    }

    #[tokio::test]
    async fn missing_root_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = service(10, 4)
            .fetch_items(&dir.path().join("nope"), 0, SortMode::None, FilterSet::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));
    }

    #[test]
    fn filters_by_section() {
        let svc = service(10, 4);
        assert_eq!(svc.fetch_filters(None).len(), 4);

        let content = svc.fetch_filters(Some("contentType"));
        let ids: Vec<_> = content.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, ["contentType|image", "contentType|video"]);

        assert!(svc.fetch_filters(Some("colour")).is_empty());
    }
}

use std::{collections::BTreeSet, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Whether a catalog entry is a plain file or a nested gallery.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

impl EntryKind {
    pub fn all() -> &'static [EntryKind] {
        &[EntryKind::File, EntryKind::Directory]
    }

    pub fn api_name(&self) -> &'static str {
        match self {
            EntryKind::File => "file",
            EntryKind::Directory => "directory",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EntryKind::File => "File",
            EntryKind::Directory => "Directory",
        }
    }
}

/// Media family of a file, decided from its extension.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Image,
    Video,
}

impl ContentKind {
    pub fn all() -> &'static [ContentKind] {
        &[ContentKind::Image, ContentKind::Video]
    }

    pub fn api_name(&self) -> &'static str {
        match self {
            ContentKind::Image => "image",
            ContentKind::Video => "video",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ContentKind::Image => "Image",
            ContentKind::Video => "Video",
        }
    }
}

/// The filter groups a client can pick values from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterSection {
    FileType,
    ContentType,
}

impl FilterSection {
    pub fn all() -> &'static [FilterSection] {
        &[FilterSection::FileType, FilterSection::ContentType]
    }

    pub fn api_name(&self) -> &'static str {
        match self {
            FilterSection::FileType => "fileType",
            FilterSection::ContentType => "contentType",
        }
    }

    /// Accepts the canonical section ids plus the legacy `type` alias.
    pub fn from_api_name(raw: &str) -> Option<Self> {
        match raw {
            "fileType" | "type" => Some(FilterSection::FileType),
            "contentType" => Some(FilterSection::ContentType),
            _ => None,
        }
    }

    pub fn filters(&self) -> Vec<CatalogFilter> {
        match self {
            FilterSection::FileType => EntryKind::all()
                .iter()
                .copied()
                .map(CatalogFilter::FileType)
                .collect(),
            FilterSection::ContentType => ContentKind::all()
                .iter()
                .copied()
                .map(CatalogFilter::ContentType)
                .collect(),
        }
    }
}

impl fmt::Display for FilterSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.api_name())
    }
}

/// A single filter value, decoded once from its `section|value` wire id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CatalogFilter {
    FileType(EntryKind),
    ContentType(ContentKind),
}

impl CatalogFilter {
    pub fn section(&self) -> FilterSection {
        match self {
            CatalogFilter::FileType(_) => FilterSection::FileType,
            CatalogFilter::ContentType(_) => FilterSection::ContentType,
        }
    }

    pub fn value(&self) -> &'static str {
        match self {
            CatalogFilter::FileType(kind) => kind.api_name(),
            CatalogFilter::ContentType(kind) => kind.api_name(),
        }
    }

    pub fn id(&self) -> String {
        format!("{}|{}", self.section().api_name(), self.value())
    }

    pub fn descriptor(&self) -> FilterDescriptor {
        let name = match self {
            CatalogFilter::FileType(kind) => kind.label(),
            CatalogFilter::ContentType(kind) => kind.label(),
        };
        FilterDescriptor {
            id: self.id(),
            filter_section_id: self.section().api_name().to_string(),
            name: name.to_string(),
        }
    }
}

impl fmt::Display for CatalogFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.section().api_name(), self.value())
    }
}

impl FromStr for CatalogFilter {
    type Err = ModelError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || ModelError::InvalidFilter(raw.to_string());
        let (section, value) = raw.split_once('|').ok_or_else(invalid)?;
        let section = FilterSection::from_api_name(section.trim())
            .ok_or_else(invalid)?;
        let value = value.trim();

        match section {
            FilterSection::FileType => EntryKind::all()
                .iter()
                .find(|kind| kind.api_name().eq_ignore_ascii_case(value))
                .map(|kind| CatalogFilter::FileType(*kind)),
            FilterSection::ContentType => ContentKind::all()
                .iter()
                .find(|kind| kind.api_name().eq_ignore_ascii_case(value))
                .map(|kind| CatalogFilter::ContentType(*kind)),
        }
        .ok_or_else(invalid)
    }
}

/// Wire description of one selectable filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterDescriptor {
    pub id: String,
    pub filter_section_id: String,
    pub name: String,
}

/// Normalised filter selection for one catalog query.
///
/// An empty group places no restriction on that dimension; selecting both
/// values of a group is equivalent to selecting none.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FilterSet {
    entry_kinds: BTreeSet<EntryKind>,
    content_kinds: BTreeSet<ContentKind>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, filter: CatalogFilter) {
        match filter {
            CatalogFilter::FileType(kind) => {
                self.entry_kinds.insert(kind);
            }
            CatalogFilter::ContentType(kind) => {
                self.content_kinds.insert(kind);
            }
        }
    }

    pub fn accepts_entry(&self, kind: EntryKind) -> bool {
        self.entry_kinds.is_empty() || self.entry_kinds.contains(&kind)
    }

    pub fn accepts_content(&self, kind: ContentKind) -> bool {
        self.content_kinds.is_empty() || self.content_kinds.contains(&kind)
    }

    /// Stable textual form, independent of the order filters were selected.
    pub fn signature(&self) -> String {
        let entries: Vec<&str> =
            self.entry_kinds.iter().map(|k| k.api_name()).collect();
        let contents: Vec<&str> =
            self.content_kinds.iter().map(|k| k.api_name()).collect();
        format!("type={};content={}", entries.join(","), contents.join(","))
    }
}

impl FromIterator<CatalogFilter> for FilterSet {
    fn from_iter<I: IntoIterator<Item = CatalogFilter>>(iter: I) -> Self {
        let mut set = FilterSet::new();
        for filter in iter {
            set.insert(filter);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_canonical_and_alias_ids() {
        assert_eq!(
            "fileType|directory".parse::<CatalogFilter>().unwrap(),
            CatalogFilter::FileType(EntryKind::Directory)
        );
        assert_eq!(
            "type|file".parse::<CatalogFilter>().unwrap(),
            CatalogFilter::FileType(EntryKind::File)
        );
        assert_eq!(
            "contentType|video".parse::<CatalogFilter>().unwrap(),
            CatalogFilter::ContentType(ContentKind::Video)
        );
    }

    #[test]
    fn rejects_malformed_ids() {
        for raw in ["", "image", "contentType|audio", "size|large"] {
            assert!(raw.parse::<CatalogFilter>().is_err(), "{raw}");
        }
    }

    #[test]
    fn id_round_trips_through_display() {
        for section in FilterSection::all() {
            for filter in section.filters() {
                assert_eq!(filter.id().parse::<CatalogFilter>(), Ok(filter));
            }
        }
    }

    #[test]
    fn signature_ignores_selection_order() {
        let a: FilterSet = [
            CatalogFilter::ContentType(ContentKind::Video),
            CatalogFilter::FileType(EntryKind::File),
            CatalogFilter::ContentType(ContentKind::Image),
        ]
        .into_iter()
        .collect();
        let b: FilterSet = [
            CatalogFilter::ContentType(ContentKind::Image),
            CatalogFilter::ContentType(ContentKind::Video),
            CatalogFilter::FileType(EntryKind::File),
        ]
        .into_iter()
        .collect();
        assert_eq!(a.signature(), b.signature());
        assert_eq!(a.signature(), "type=file;content=image,video");
    }

    #[test]
    fn empty_groups_accept_everything() {
        let set: FilterSet =
            [CatalogFilter::FileType(EntryKind::Directory)].into_iter().collect();
        assert!(set.accepts_entry(EntryKind::Directory));
        assert!(!set.accepts_entry(EntryKind::File));
        assert!(set.accepts_content(ContentKind::Video));
    }

    #[test]
    fn descriptor_uses_camel_case_keys() {
        let json = serde_json::to_value(
            CatalogFilter::ContentType(ContentKind::Image).descriptor(),
        )
        .unwrap();
        assert_eq!(json["id"], "contentType|image");
        assert_eq!(json["filterSectionId"], "contentType");
        assert_eq!(json["name"], "Image");
    }
}

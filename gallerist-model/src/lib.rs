//! Wire data model shared between the Gallerist catalog service and its
//! clients.
#![allow(missing_docs)]

pub mod catalog;
pub mod error;
pub mod filter_types;
pub mod sort;

pub use catalog::{GalleryPage, Item, ItemUrl};
pub use error::ModelError;
pub use filter_types::{
    CatalogFilter, ContentKind, EntryKind, FilterDescriptor, FilterSection,
    FilterSet,
};
pub use sort::SortMode;

use serde::{Deserialize, Serialize};

/// One renderable variant of an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemUrl {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

/// A catalog entry as returned by `GET /gallery`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// Primary URL first, then any thumbnails.
    pub urls: Vec<ItemUrl>,
    pub is_video: bool,
    pub is_gallery: bool,
    pub filters: Vec<String>,
}

/// One page of a gallery listing. `offset` is the page index to request next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryPage {
    pub items: Vec<Item>,
    pub has_next: bool,
    pub offset: u64,
}

impl GalleryPage {
    pub fn empty(next_offset: u64) -> Self {
        Self {
            items: Vec::new(),
            has_next: false,
            offset: next_offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_client_field_names() {
        let page = GalleryPage {
            items: vec![Item {
                id: "/media/a.png".into(),
                name: "a.png".into(),
                width: 100,
                height: 50,
                urls: vec![ItemUrl {
                    url: "http://127.0.0.1:1/image?uri=%2Fmedia%2Fa.png".into(),
                    width: 100,
                    height: 50,
                }],
                is_video: false,
                is_gallery: false,
                filters: vec![],
            }],
            has_next: true,
            offset: 1,
        };

        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["hasNext"], true);
        assert_eq!(json["offset"], 1);
        assert_eq!(json["items"][0]["isVideo"], false);
        assert_eq!(json["items"][0]["isGallery"], false);
        assert_eq!(json["items"][0]["urls"][0]["width"], 100);
    }
}

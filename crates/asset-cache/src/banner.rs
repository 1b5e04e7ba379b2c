//! Banner records and their metadata half

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// One generated ad creative as the UI sees it.
///
/// `image` is always serialized (as `null` when absent) so consumers can tell
/// a pending or failed banner from one whose image simply wasn't sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Banner {
    #[ts(type = "number")]
    pub id: i64,
    /// Data URL or base64 payload
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub archetype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub has_brand_assets: Option<bool>,
    /// Set when generation failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub error: Option<String>,
}

/// The part of a banner kept in the metadata store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BannerMetadata {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archetype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_brand_assets: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Banner {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// Separate the metadata from the image. Empty images count as absent.
    pub fn split(self) -> (BannerMetadata, Option<String>) {
        let image = self.image.filter(|image| !image.is_empty());
        let metadata = BannerMetadata {
            id: self.id,
            label: self.label,
            size: self.size,
            archetype: self.archetype,
            prompt: self.prompt,
            has_brand_assets: self.has_brand_assets,
            error: self.error,
        };
        (metadata, image)
    }
}

impl BannerMetadata {
    /// Rejoin metadata with its image
    pub fn with_image(self, image: Option<String>) -> Banner {
        Banner {
            id: self.id,
            image,
            label: self.label,
            size: self.size,
            archetype: self.archetype,
            prompt: self.prompt,
            has_brand_assets: self.has_brand_assets,
            error: self.error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_drops_empty_image() {
        let banner = Banner {
            image: Some(String::new()),
            label: Some("A".to_string()),
            ..Banner::new(1)
        };
        let (metadata, image) = banner.split();
        assert_eq!(metadata.id, 1);
        assert_eq!(metadata.label.as_deref(), Some("A"));
        assert!(image.is_none());
    }

    #[test]
    fn test_metadata_omits_image_and_uses_camel_case() {
        let banner = Banner {
            image: Some("data:image/png;base64,AAAA".to_string()),
            has_brand_assets: Some(true),
            ..Banner::new(4)
        };
        let (metadata, _) = banner.split();

        let json = serde_json::to_string(&metadata).unwrap();
        assert_eq!(json, r#"{"id":4,"hasBrandAssets":true}"#);
    }

    #[test]
    fn test_banner_serializes_null_image() {
        let banner = Banner {
            label: Some("B".to_string()),
            ..Banner::new(2)
        };
        let json = serde_json::to_value(&banner).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": 2, "image": null, "label": "B"})
        );
    }

    #[test]
    fn test_banner_deserializes_without_image() {
        let banner: Banner =
            serde_json::from_str(r#"{"id":3,"archetype":"hero","error":"timeout"}"#).unwrap();
        assert_eq!(banner.id, 3);
        assert!(banner.image.is_none());
        assert_eq!(banner.archetype.as_deref(), Some("hero"));
        assert_eq!(banner.error.as_deref(), Some("timeout"));
    }

    #[test]
    fn test_split_and_rejoin() {
        let banner = Banner {
            image: Some("img".to_string()),
            prompt: Some("summer sale".to_string()),
            size: Some("1080x1080".to_string()),
            ..Banner::new(9)
        };
        let (metadata, image) = banner.clone().split();
        assert_eq!(metadata.with_image(image), banner);
    }
}

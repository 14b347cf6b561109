//! Raw request input and kind inference.

use serde::{Deserialize, Serialize};
use url::Url;

/// Hosts whose URLs are treated as short-video links.
const VIDEO_HOSTS: &[&str] = &[
    "tiktok.com",
    "vm.tiktok.com",
    "instagram.com",
    "facebook.com",
    "fb.watch",
    "youtube.com",
    "youtu.be",
];

/// Max words for a text payload to count as a dish-name query.
const DISH_NAME_MAX_WORDS: usize = 6;

/// Max characters for a text payload to count as a dish-name query.
const DISH_NAME_MAX_CHARS: usize = 80;

/// What kind of payload a request carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    /// Recipe web page
    Url,
    /// Free-form recipe text or a short dish name
    Text,
    /// Short-video link (caption is the source)
    Video,
}

impl InputKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Url => "url",
            Self::Text => "text",
            Self::Video => "video",
        }
    }

    /// Parse a stored source-kind tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "url" => Some(Self::Url),
            "text" => Some(Self::Text),
            "video" => Some(Self::Video),
            _ => None,
        }
    }
}

/// A single parse request, created per call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawInput {
    pub kind: InputKind,
    pub payload: String,
    #[serde(default)]
    pub force_refresh: bool,
}

impl RawInput {
    /// Build an input, inferring its kind from the payload's shape.
    pub fn infer(payload: impl Into<String>) -> Self {
        let payload = payload.into();
        let kind = infer_kind(&payload);
        Self {
            kind,
            payload,
            force_refresh: false,
        }
    }

    /// Build an input with an explicit kind.
    pub fn new(kind: InputKind, payload: impl Into<String>) -> Self {
        Self {
            kind,
            payload: payload.into(),
            force_refresh: false,
        }
    }

    /// Bypass the cache read for this request.
    pub fn with_force_refresh(mut self, force: bool) -> Self {
        self.force_refresh = force;
        self
    }

    /// Whether this is a short dish-name query (semantic match path).
    pub fn is_dish_name_query(&self) -> bool {
        self.kind == InputKind::Text && is_dish_name(&self.payload)
    }
}

/// Infer the input kind from the raw payload.
pub fn infer_kind(payload: &str) -> InputKind {
    let trimmed = payload.trim();
    match Url::parse(trimmed) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() => {
            if is_video_url(&url) {
                InputKind::Video
            } else {
                InputKind::Url
            }
        }
        _ => InputKind::Text,
    }
}

/// Whether a URL points at a supported short-video platform.
pub fn is_video_url(url: &Url) -> bool {
    let host = match url.host_str() {
        Some(h) => h.trim_start_matches("www.").trim_start_matches("m.").to_lowercase(),
        None => return false,
    };

    if !VIDEO_HOSTS.iter().any(|v| host == *v || host.ends_with(&format!(".{}", v))) {
        return false;
    }

    let path = url.path();
    match host.as_str() {
        // YouTube is only a video source for shorts and short links
        "youtube.com" => path.starts_with("/shorts/"),
        "youtu.be" => true,
        "instagram.com" => path.starts_with("/reel") || path.starts_with("/p/"),
        "facebook.com" => path.starts_with("/reel") || path.contains("/videos/"),
        _ => true,
    }
}

/// Whether a text payload is short enough to be a dish name.
pub fn is_dish_name(text: &str) -> bool {
    let trimmed = text.trim();
    !trimmed.is_empty()
        && !trimmed.contains('\n')
        && trimmed.chars().count() <= DISH_NAME_MAX_CHARS
        && trimmed.split_whitespace().count() <= DISH_NAME_MAX_WORDS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_url() {
        assert_eq!(infer_kind("https://example.com/pasta"), InputKind::Url);
        assert_eq!(infer_kind("  https://example.com/pasta  "), InputKind::Url);
    }

    #[test]
    fn test_infer_video() {
        assert_eq!(
            infer_kind("https://www.tiktok.com/@chef/video/7234"),
            InputKind::Video
        );
        assert_eq!(
            infer_kind("https://www.instagram.com/reel/Cx12ab/"),
            InputKind::Video
        );
        assert_eq!(
            infer_kind("https://youtube.com/shorts/abc123"),
            InputKind::Video
        );
        // Long-form YouTube pages are plain URLs
        assert_eq!(
            infer_kind("https://www.youtube.com/watch?v=abc"),
            InputKind::Url
        );
    }

    #[test]
    fn test_infer_text() {
        assert_eq!(infer_kind("chicken"), InputKind::Text);
        assert_eq!(infer_kind("ftp://example.com/file"), InputKind::Text);
        assert_eq!(infer_kind("2 cups flour\n1 egg"), InputKind::Text);
    }

    #[test]
    fn test_dish_name_detection() {
        assert!(RawInput::infer("chicken").is_dish_name_query());
        assert!(RawInput::infer("  spaghetti carbonara ").is_dish_name_query());
        assert!(!RawInput::infer("2 cups flour\n1 egg\nmix and bake").is_dish_name_query());
        assert!(!RawInput::infer(
            "take two cups of flour and one egg then mix them together"
        )
        .is_dish_name_query());
        assert!(!RawInput::infer("https://example.com/chicken").is_dish_name_query());
    }
}

//! Video-sharing URL resolution.
//!
//! A YouTube reference is turned into text by a chain of tiers: native
//! caption tracks first, then a transcript of the downloaded audio, then the
//! video's title and description. The chain never fails; the worst case is
//! an empty string.

mod chain;
mod ytdlp;

pub use chain::YoutubeChain;
pub use ytdlp::YtDlpService;

use crate::error::Result;
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Video id matchers, tried in order.
static VIDEO_ID_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"[?&]v=([\w-]{6,})",
        r"youtu\.be/([\w-]{6,})",
        r"youtube\.com/shorts/([\w-]{6,})",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Invalid regex"))
    .collect()
});

/// Extract the video id from a URL. The first matching pattern wins.
pub fn extract_video_id(url: &str) -> Option<String> {
    VIDEO_ID_PATTERNS
        .iter()
        .find_map(|re| re.captures(url))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Canonical watch URL for a video id.
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

/// A caption track advertised for a video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionTrack {
    /// Language code, e.g. `en` or `en-US`.
    pub language: String,
    /// Display name, when the service provides one.
    pub name: Option<String>,
    /// Where the caption payload can be fetched.
    pub url: String,
    /// True for speech-recognized tracks.
    pub automatic: bool,
}

impl CaptionTrack {
    /// Whether this track is in `language` or one of its regional variants.
    pub fn matches_language(&self, language: &str) -> bool {
        self.language == language
            || self
                .language
                .strip_prefix(language)
                .is_some_and(|rest| rest.starts_with('-'))
    }
}

/// Title and description of a video.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub title: String,
    pub description: String,
}

impl VideoMetadata {
    /// Minimal context text used when nothing better is available.
    pub fn as_context(&self) -> String {
        format!("Title: {}\nDescription: {}", self.title, self.description)
    }
}

/// Remote video service boundary.
#[async_trait]
pub trait VideoService: Send + Sync {
    /// Caption tracks for a video, manual tracks before automatic ones.
    async fn list_tracks(&self, video_id: &str) -> Result<Vec<CaptionTrack>>;

    /// Fetch a track's caption segments in playback order.
    async fn fetch_track(&self, track: &CaptionTrack) -> Result<Vec<String>>;

    /// Download the audio stream into `dir`, returning the file path.
    async fn download_audio(&self, video_id: &str, dir: &Path) -> Result<PathBuf>;

    /// Title and description.
    async fn metadata(&self, video_id: &str) -> Result<VideoMetadata>;
}

/// Result of a single fallback tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TierOutcome {
    /// The tier produced usable text; stop here.
    Success(String),
    /// The tier ran but found nothing.
    Empty,
    /// The tier failed; treated like `Empty` after logging.
    Error(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_id_patterns() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?list=PL1&v=abc_DEF-123").as_deref(),
            Some("abc_DEF-123")
        );
        assert_eq!(
            extract_video_id("https://youtu.be/dQw4w9WgXcQ?t=42").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            extract_video_id("https://youtube.com/shorts/shortID9").as_deref(),
            Some("shortID9")
        );
    }

    #[test]
    fn test_video_id_requires_six_characters() {
        assert_eq!(extract_video_id("https://www.youtube.com/watch?v=abc"), None);
        assert_eq!(extract_video_id("https://www.youtube.com/feed/trending"), None);
    }

    #[test]
    fn test_first_pattern_wins() {
        // Both the query pattern and the short-link pattern match
        let url = "https://youtu.be/shortlinkid?v=queryparamid";
        assert_eq!(extract_video_id(url).as_deref(), Some("queryparamid"));
    }

    #[test]
    fn test_track_language_matching() {
        let track = CaptionTrack {
            language: "en-US".to_string(),
            name: None,
            url: String::new(),
            automatic: false,
        };
        assert!(track.matches_language("en"));
        assert!(track.matches_language("en-US"));
        assert!(!track.matches_language("e"));
        assert!(!track.matches_language("de"));
    }

    #[test]
    fn test_metadata_context_format() {
        let meta = VideoMetadata {
            title: "T".to_string(),
            description: "D".to_string(),
        };
        assert_eq!(meta.as_context(), "Title: T\nDescription: D");
    }
}

//! [`VideoService`] backed by the yt-dlp CLI.

use super::{watch_url, CaptionTrack, VideoMetadata, VideoService};
use crate::audio::download_audio;
use crate::config::ToolSettings;
use crate::error::{MedleyError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Caption payload format requested from the service.
const CAPTION_FORMAT: &str = "json3";

/// Video service that shells out to yt-dlp and fetches captions over HTTP.
pub struct YtDlpService {
    tools: ToolSettings,
    http: reqwest::Client,
    /// Last `--dump-json` result, keyed by video id.
    probe_cache: Mutex<Option<(String, Value)>>,
}

impl YtDlpService {
    pub fn new(tools: ToolSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            tools,
            http,
            probe_cache: Mutex::new(None),
        })
    }

    /// Fetch video info with yt-dlp, reusing the last result for the same id.
    async fn probe(&self, video_id: &str) -> Result<Value> {
        if let Ok(cache) = self.probe_cache.lock() {
            if let Some((id, json)) = cache.as_ref() {
                if id == video_id {
                    return Ok(json.clone());
                }
            }
        }

        let yt_dlp = self.tools.yt_dlp();
        let output = Command::new(&yt_dlp)
            .args([
                "--dump-json",
                "--skip-download",
                "--no-warnings",
                "--no-playlist",
            ])
            .arg(watch_url(video_id))
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    MedleyError::ToolNotFound(yt_dlp.clone())
                } else {
                    MedleyError::ToolFailed(format!("Failed to run yt-dlp: {}", e))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MedleyError::ToolFailed(format!(
                "Video {} unavailable: {}",
                video_id,
                stderr.trim()
            )));
        }

        let json: Value = serde_json::from_slice(&output.stdout)?;

        if let Ok(mut cache) = self.probe_cache.lock() {
            *cache = Some((video_id.to_string(), json.clone()));
        }

        Ok(json)
    }
}

/// Read caption tracks from yt-dlp info JSON, manual tracks first.
///
/// Machine-translated automatic tracks are skipped; only the recognized
/// original-language track is kept.
fn parse_tracks(info: &Value) -> Vec<CaptionTrack> {
    let mut tracks = Vec::new();

    for (field, automatic) in [("subtitles", false), ("automatic_captions", true)] {
        let Some(by_language) = info[field].as_object() else {
            continue;
        };

        for (language, formats) in by_language {
            if language == "live_chat" {
                continue;
            }

            let Some(entry) = formats.as_array().and_then(|list| {
                list.iter()
                    .find(|f| f["ext"].as_str() == Some(CAPTION_FORMAT))
            }) else {
                continue;
            };

            let Some(url) = entry["url"].as_str() else {
                continue;
            };

            if automatic && url.contains("tlang=") {
                continue;
            }

            tracks.push(CaptionTrack {
                language: language
                    .strip_suffix("-orig")
                    .unwrap_or(language)
                    .to_string(),
                name: entry["name"].as_str().map(|s| s.to_string()),
                url: url.to_string(),
                automatic,
            });
        }
    }

    tracks
}

/// Parse a json3 caption payload into one line per caption event.
fn parse_json3(payload: &Value) -> Vec<String> {
    let Some(events) = payload["events"].as_array() else {
        return Vec::new();
    };

    events
        .iter()
        .filter_map(|event| event["segs"].as_array())
        .map(|segs| {
            segs.iter()
                .filter_map(|seg| seg["utf8"].as_str())
                .collect::<String>()
        })
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

#[async_trait]
impl VideoService for YtDlpService {
    #[instrument(skip(self))]
    async fn list_tracks(&self, video_id: &str) -> Result<Vec<CaptionTrack>> {
        let info = self.probe(video_id).await?;
        let tracks = parse_tracks(&info);
        debug!(
            "Tracks: {}",
            tracks
                .iter()
                .map(|t| t.language.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(tracks)
    }

    #[instrument(skip(self, track), fields(language = %track.language))]
    async fn fetch_track(&self, track: &CaptionTrack) -> Result<Vec<String>> {
        let response = self.http.get(&track.url).send().await?;

        if !response.status().is_success() {
            return Err(MedleyError::ToolFailed(format!(
                "Caption fetch returned {}",
                response.status()
            )));
        }

        let payload: Value = response.json().await?;
        Ok(parse_json3(&payload))
    }

    async fn download_audio(&self, video_id: &str, dir: &Path) -> Result<PathBuf> {
        download_audio(&watch_url(video_id), video_id, dir, &self.tools).await
    }

    #[instrument(skip(self))]
    async fn metadata(&self, video_id: &str) -> Result<VideoMetadata> {
        let info = self.probe(video_id).await?;

        Ok(VideoMetadata {
            title: info["title"].as_str().unwrap_or_default().to_string(),
            description: info["description"].as_str().unwrap_or_default().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_tracks_orders_manual_first() {
        let info = json!({
            "subtitles": {
                "de": [{"ext": "vtt", "url": "u1"}, {"ext": "json3", "url": "de-json3", "name": "German"}],
                "live_chat": [{"ext": "json3", "url": "chat"}]
            },
            "automatic_captions": {
                "en-orig": [{"ext": "json3", "url": "en-asr"}],
                "fr": [{"ext": "json3", "url": "en-asr&tlang=fr"}]
            }
        });

        let tracks = parse_tracks(&info);
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].language, "de");
        assert_eq!(tracks[0].url, "de-json3");
        assert_eq!(tracks[0].name.as_deref(), Some("German"));
        assert!(!tracks[0].automatic);
        assert_eq!(tracks[1].language, "en");
        assert!(tracks[1].automatic);
    }

    #[test]
    fn test_parse_tracks_keeps_listed_order() {
        let raw = r#"{
            "subtitles": {
                "zh": [{"ext": "json3", "url": "zh-json3"}],
                "de": [{"ext": "json3", "url": "de-json3"}],
                "ar": [{"ext": "json3", "url": "ar-json3"}]
            }
        }"#;
        let info: Value = serde_json::from_str(raw).unwrap();

        let languages: Vec<_> = parse_tracks(&info).into_iter().map(|t| t.language).collect();
        assert_eq!(languages, vec!["zh", "de", "ar"]);
    }

    #[test]
    fn test_parse_tracks_without_captions() {
        assert!(parse_tracks(&json!({"title": "x"})).is_empty());
    }

    #[test]
    fn test_parse_json3_events() {
        let payload = json!({
            "events": [
                {"tStartMs": 0, "segs": [{"utf8": "hello "}, {"utf8": "there"}]},
                {"tStartMs": 900},
                {"tStartMs": 1000, "segs": [{"utf8": "\n"}]},
                {"tStartMs": 2000, "segs": [{"utf8": "general"}]}
            ]
        });

        assert_eq!(parse_json3(&payload), vec!["hello there", "general"]);
    }

    #[tokio::test]
    async fn test_missing_binary_is_tool_not_found() {
        let tools = ToolSettings {
            yt_dlp: Some("/nonexistent/yt-dlp".to_string()),
            ..Default::default()
        };
        let service = YtDlpService::new(tools).unwrap();

        let err = service.metadata("dQw4w9WgXcQ").await.unwrap_err();
        assert!(matches!(err, MedleyError::ToolNotFound(_)));
    }
}

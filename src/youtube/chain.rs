//! The tiered YouTube resolution chain.

use super::{extract_video_id, CaptionTrack, TierOutcome, VideoService};
use crate::extract::{AudioExtractor, Extractor};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Tiers in the order they are attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tier {
    PreferredCaptions,
    AnyCaptions,
    AudioTranscript,
    Metadata,
}

const TIERS: [Tier; 4] = [
    Tier::PreferredCaptions,
    Tier::AnyCaptions,
    Tier::AudioTranscript,
    Tier::Metadata,
];

/// Resolves a video URL to text, falling through tiers until one succeeds.
pub struct YoutubeChain {
    service: Arc<dyn VideoService>,
    audio: Arc<dyn Extractor>,
    preferred_language: String,
    temp_root: PathBuf,
}

impl YoutubeChain {
    pub fn new(
        service: Arc<dyn VideoService>,
        audio: Arc<dyn Extractor>,
        preferred_language: impl Into<String>,
        temp_root: PathBuf,
    ) -> Self {
        Self {
            service,
            audio,
            preferred_language: preferred_language.into(),
            temp_root,
        }
    }

    /// Resolve a URL to text. Never fails; returns `""` when every tier is empty.
    #[instrument(skip(self))]
    pub async fn resolve(&self, url: &str) -> String {
        let Some(video_id) = extract_video_id(url) else {
            warn!("No video id in {}", url);
            return String::new();
        };

        // Listed once and shared by both caption tiers
        let tracks = match self.service.list_tracks(&video_id).await {
            Ok(tracks) => {
                debug!("{} caption tracks listed", tracks.len());
                Ok(tracks)
            }
            Err(e) => Err(e.to_string()),
        };

        for tier in TIERS {
            match self.run_tier(tier, &video_id, &tracks).await {
                TierOutcome::Success(text) => {
                    info!("Resolved {} via {:?}", video_id, tier);
                    return text;
                }
                TierOutcome::Empty => debug!("{:?} produced nothing", tier),
                TierOutcome::Error(e) => warn!("{:?} failed: {}", tier, e),
            }
        }

        String::new()
    }

    async fn run_tier(
        &self,
        tier: Tier,
        video_id: &str,
        tracks: &std::result::Result<Vec<CaptionTrack>, String>,
    ) -> TierOutcome {
        match tier {
            Tier::PreferredCaptions => match tracks {
                Ok(tracks) => {
                    let preferred = tracks
                        .iter()
                        .find(|t| t.matches_language(&self.preferred_language));
                    match preferred {
                        Some(track) => self.fetch_captions(track).await,
                        None => TierOutcome::Empty,
                    }
                }
                Err(e) => TierOutcome::Error(e.clone()),
            },
            Tier::AnyCaptions => match tracks {
                Ok(tracks) => {
                    for track in tracks {
                        match self.fetch_captions(track).await {
                            TierOutcome::Success(text) => return TierOutcome::Success(text),
                            TierOutcome::Empty => continue,
                            TierOutcome::Error(e) => {
                                debug!("Track {} unusable: {}", track.language, e);
                            }
                        }
                    }
                    TierOutcome::Empty
                }
                Err(e) => TierOutcome::Error(e.clone()),
            },
            Tier::AudioTranscript => self.transcribe_audio(video_id).await,
            Tier::Metadata => match self.service.metadata(video_id).await {
                Ok(meta) => TierOutcome::Success(meta.as_context()),
                Err(e) => TierOutcome::Error(e.to_string()),
            },
        }
    }

    async fn fetch_captions(&self, track: &CaptionTrack) -> TierOutcome {
        match self.service.fetch_track(track).await {
            Ok(segments) if segments.is_empty() => TierOutcome::Empty,
            Ok(segments) => TierOutcome::Success(segments.join("\n")),
            Err(e) => TierOutcome::Error(e.to_string()),
        }
    }

    async fn transcribe_audio(&self, video_id: &str) -> TierOutcome {
        let scratch = match AudioExtractor::scratch_dir(&self.temp_root) {
            Ok(dir) => dir,
            Err(e) => return TierOutcome::Error(e.to_string()),
        };

        let audio_path = match self.service.download_audio(video_id, scratch.path()).await {
            Ok(path) => path,
            Err(e) => return TierOutcome::Error(e.to_string()),
        };

        match self.audio.extract(&audio_path).await {
            Ok(text) if text.trim().is_empty() => TierOutcome::Empty,
            Ok(text) => TierOutcome::Success(text),
            Err(e) => TierOutcome::Error(e.to_string()),
        }
    }
}

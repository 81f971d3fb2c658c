//! Audio download and conversion utilities.
//!
//! Wraps the external toolchain: ffmpeg for transcoding and yt-dlp for
//! fetching audio streams from video-sharing sites.

mod convert;
mod downloader;

pub use convert::{is_native_waveform, split_waveform, to_waveform, NATIVE_WAVEFORM_EXTENSIONS};
pub use downloader::download_audio;

//! Configuration module for Medley.
//!
//! Handles loading and managing application settings.

mod settings;

pub use settings::{
    GeneralSettings, IngestSettings, ModelSettings, Settings, StoreSettings, ToolSettings,
    TranscriptionSettings, YoutubeSettings,
};

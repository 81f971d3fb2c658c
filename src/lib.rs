//! Medley - Multimodal Ingestion and Question Answering
//!
//! A local-first CLI tool that turns documents, images, audio, video and
//! YouTube links into plain text, keeps it in a local store, and answers
//! questions about it with a language model.
//!
//! # Overview
//!
//! Medley allows you to:
//! - Extract text from pdf, docx, pptx and plain text files
//! - Recognize text in images and transcribe audio and video
//! - Pull captions (or a transcript, or metadata) for YouTube videos
//! - Search stored content and ask questions over the most recent items
//! - Ask questions about an image directly
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `dispatch` - Content kind classification
//! - `extract` - Per-kind text extractors
//! - `audio` - Audio conversion and download via external tools
//! - `transcription` - Speech-to-text transcription
//! - `youtube` - Caption and transcript fallback chain
//! - `store` - Append-only content store
//! - `llm` - Model resolution and question answering
//! - `orchestrator` - Pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use medley::config::Settings;
//! use medley::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let result = orchestrator.ingest("notes/meeting.pdf").await?;
//!     println!("Stored {} characters", result.chars);
//!
//!     let outcome = orchestrator.ask("What was decided?").await?;
//!     println!("{}", outcome.answer);
//!
//!     Ok(())
//! }
//! ```

pub mod audio;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod extract;
pub mod llm;
pub mod openai;
pub mod orchestrator;
pub mod store;
pub mod transcription;
pub mod youtube;

pub use error::{MedleyError, Result};

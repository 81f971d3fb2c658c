//! CLI module for Medley.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Medley - multimodal ingestion and question answering
///
/// Ingest documents, images, audio, video and YouTube links into a local text
/// store, then ask questions about them.
#[derive(Parser, Debug)]
#[command(name = "medley")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract text from files or YouTube URLs and store it
    Ingest {
        /// File paths (pdf, docx, pptx, txt, md, png, jpg, jpeg, mp3, wav, m4a, mp4) or YouTube URLs
        #[arg(required = true)]
        references: Vec<String>,
    },

    /// Ask a question about the ingested content
    Ask {
        /// The question to ask
        question: String,
    },

    /// Ask a question about an image
    AskImage {
        /// Path to a png or jpg image
        path: String,

        /// The question to ask
        question: String,

        /// Extra text passed along with the image (e.g. known captions)
        #[arg(long)]
        hint: Option<String>,

        /// Run OCR on the image and use the result as the hint
        #[arg(long, conflicts_with = "hint")]
        ocr: bool,
    },

    /// Find stored content containing a phrase (case-sensitive)
    Search {
        /// Text to look for
        query: String,
    },

    /// Show the most recently ingested content
    Recent {
        /// Maximum number of entries
        #[arg(short, long, default_value = "5")]
        limit: usize,
    },

    /// List ingested sources
    List,

    /// Interactive menu: ingest, ask, exit
    Shell,

    /// Start HTTP API server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },

    /// Check system requirements and configuration
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}

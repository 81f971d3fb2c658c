//! Pipeline orchestrator for Medley.
//!
//! Coordinates ingestion (classify, extract, store) and question answering
//! (retrieve, assemble context, generate).

use crate::config::Settings;
use crate::dispatch::{classify, ContentKind};
use crate::error::{MedleyError, Result};
use crate::extract::{Extractor, ExtractorSet};
use crate::llm::{
    truncate_chars, AnsweringService, ModelClient, ModelHandle, ModelResolver, OpenAiModelClient,
};
use crate::store::{ContentMatch, ContentStore, SourceRecord, SqliteContentStore, StoreCounts};
use crate::transcription::{Transcriber, WhisperTranscriber};
use crate::youtube::{VideoService, YoutubeChain, YtDlpService};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{info, instrument, warn};

/// Separator between retrieved contents in an assembled context.
pub const CONTEXT_SEPARATOR: &str = "\n----\n";

/// Characters of context shown in an answer preview.
const PREVIEW_CHARS: usize = 400;

/// Result of ingesting one reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResult {
    pub source_id: i64,
    pub content_id: i64,
    pub reference: String,
    pub kind: ContentKind,
    /// Characters of extracted text.
    pub chars: usize,
    /// Backend failure that was recorded as empty text.
    pub extraction_error: Option<String>,
}

/// Answer to a question plus what it was grounded on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskOutcome {
    pub answer: String,
    /// Reference of the first content used as context.
    pub source: Option<String>,
    /// Start of the context, with `...` when cut.
    pub context_preview: Option<String>,
}

/// Build a short preview of a context string.
pub fn context_preview(context: &str) -> String {
    let head = truncate_chars(context, PREVIEW_CHARS);
    if head.len() < context.len() {
        format!("{}...", head)
    } else {
        head.to_string()
    }
}

/// The main orchestrator for the Medley pipeline.
pub struct Orchestrator {
    settings: Settings,
    extractors: ExtractorSet,
    youtube: YoutubeChain,
    store: Arc<dyn ContentStore>,
    model_client: Arc<dyn ModelClient>,
    answering: OnceCell<AnsweringService>,
}

impl Orchestrator {
    /// Create an orchestrator with the default components.
    pub fn new(settings: Settings) -> Result<Self> {
        let transcriber: Arc<dyn Transcriber> = Arc::new(WhisperTranscriber::from_settings(&settings)?);
        let store: Arc<dyn ContentStore> = Arc::new(SqliteContentStore::new(&settings.sqlite_path())?);
        let video_service: Arc<dyn VideoService> = Arc::new(YtDlpService::new(settings.tools.clone())?);
        let model_client: Arc<dyn ModelClient> = Arc::new(OpenAiModelClient::from_settings(&settings)?);

        Self::with_components(settings, transcriber, store, video_service, model_client)
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        transcriber: Arc<dyn Transcriber>,
        store: Arc<dyn ContentStore>,
        video_service: Arc<dyn VideoService>,
        model_client: Arc<dyn ModelClient>,
    ) -> Result<Self> {
        let temp_dir = settings.temp_dir();
        std::fs::create_dir_all(&temp_dir)?;

        let extractors = ExtractorSet::new(&settings, transcriber);
        let youtube = YoutubeChain::new(
            video_service,
            extractors.audio(),
            settings.youtube.preferred_language.clone(),
            temp_dir,
        );

        Ok(Self {
            settings,
            extractors,
            youtube,
            store,
            model_client,
            answering: OnceCell::new(),
        })
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Get a handle to the content store.
    pub fn store(&self) -> Arc<dyn ContentStore> {
        self.store.clone()
    }

    /// The answering service, resolving the model on first use.
    ///
    /// Fails with `Config` when the model service has no credentials.
    pub async fn answering(&self) -> Result<&AnsweringService> {
        if !self.model_client.has_credentials() {
            return Err(MedleyError::Config(
                "No API key. Set OPENAI_API_KEY or model.api_key in the config file.".to_string(),
            ));
        }

        let service = self
            .answering
            .get_or_init(|| async {
                let resolver = ModelResolver::from_settings(&self.settings.model);
                let model = resolver.resolve(self.model_client.as_ref()).await;
                AnsweringService::new(
                    self.model_client.clone(),
                    model,
                    self.settings.model.max_context_chars,
                )
            })
            .await;
        Ok(service)
    }

    /// The resolved model.
    pub async fn model(&self) -> Result<ModelHandle> {
        Ok(self.answering().await?.model().clone())
    }

    /// Classify, extract and store one path or URL.
    #[instrument(skip(self))]
    pub async fn ingest(&self, reference: &str) -> Result<IngestResult> {
        let kind = classify(reference)?;

        if kind != ContentKind::Youtube && !Path::new(reference).exists() {
            return Err(MedleyError::InvalidInput(format!(
                "File not found: {}",
                reference
            )));
        }

        info!("Ingesting {} as {}", reference, kind);

        let (text, extraction_error) = match self.extract(reference, kind).await {
            Ok(text) => (text, None),
            Err(e) if kind.is_media() && self.settings.ingest.store_empty_on_failure => {
                warn!("{} extraction failed, storing empty text: {}", kind, e);
                (String::new(), Some(e.to_string()))
            }
            Err(e) => return Err(e),
        };

        let source_id = self.store.record_source(reference, kind).await?;
        let content_id = self.store.record_content(source_id, &text).await?;

        info!("Stored {} characters as source {}", text.chars().count(), source_id);

        Ok(IngestResult {
            source_id,
            content_id,
            reference: reference.to_string(),
            kind,
            chars: text.chars().count(),
            extraction_error,
        })
    }

    /// Run the backend for a classified reference.
    async fn extract(&self, reference: &str, kind: ContentKind) -> Result<String> {
        if kind == ContentKind::Youtube {
            return Ok(self.youtube.resolve(reference).await);
        }

        let backend = self.extractors.for_kind(kind).ok_or_else(|| {
            MedleyError::UnsupportedFormat(format!("No backend for {}", kind))
        })?;

        backend.extract(Path::new(reference)).await
    }

    /// OCR an image, for use as an answering hint.
    pub async fn ocr(&self, path: &Path) -> Result<String> {
        self.extractors.image().extract(path).await
    }

    /// Contents containing `query` (case-sensitive).
    pub async fn search(&self, query: &str) -> Result<Vec<ContentMatch>> {
        self.store.search(query).await
    }

    /// Newest contents first.
    pub async fn most_recent(&self, limit: usize) -> Result<Vec<ContentMatch>> {
        self.store.most_recent(limit).await
    }

    pub async fn list_sources(&self) -> Result<Vec<SourceRecord>> {
        self.store.list_sources().await
    }

    pub async fn counts(&self) -> Result<StoreCounts> {
        self.store.counts().await
    }

    /// Answer a question from stored content.
    ///
    /// Context is every content containing the question; failing that, the
    /// most recent content; failing that, none.
    #[instrument(skip(self))]
    pub async fn ask(&self, question: &str) -> Result<AskOutcome> {
        let hits = self.store.search(question).await?;

        let (context, source) = if let Some(first) = hits.first() {
            info!("{} contents match the question", hits.len());
            let joined = hits
                .iter()
                .map(|m| m.text.as_str())
                .collect::<Vec<_>>()
                .join(CONTEXT_SEPARATOR);
            (Some(joined), Some(first.reference.clone()))
        } else {
            match self.store.most_recent(1).await?.into_iter().next() {
                Some(recent) => {
                    info!("Using recent file as context: {}", recent.reference);
                    (Some(recent.text), Some(recent.reference))
                }
                None => (None, None),
            }
        };

        let answer = self
            .answering()
            .await?
            .answer(question, context.as_deref())
            .await;

        Ok(AskOutcome {
            answer,
            source,
            context_preview: context.as_deref().map(context_preview),
        })
    }

    /// Answer a question about an image, optionally with an OCR hint.
    #[instrument(skip(self, ocr_hint))]
    pub async fn ask_about_image(
        &self,
        path: &Path,
        question: &str,
        ocr_hint: Option<&str>,
    ) -> Result<String> {
        if !path.exists() {
            return Err(MedleyError::InvalidInput(format!(
                "File not found: {}",
                path.display()
            )));
        }

        Ok(self
            .answering()
            .await?
            .answer_about_image(path, question, ocr_hint)
            .await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolSettings;
    use crate::llm::ImageInput;
    use crate::store::MemoryContentStore;
    use crate::youtube::{CaptionTrack, VideoMetadata};
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::Mutex;

    struct FixedTranscriber;

    #[async_trait]
    impl Transcriber for FixedTranscriber {
        async fn transcribe(&self, _audio_path: &Path) -> Result<String> {
            Ok("spoken".to_string())
        }
    }

    struct OfflineVideo;

    #[async_trait]
    impl VideoService for OfflineVideo {
        async fn list_tracks(&self, _video_id: &str) -> Result<Vec<CaptionTrack>> {
            Err(MedleyError::ToolFailed("offline".to_string()))
        }

        async fn fetch_track(&self, _track: &CaptionTrack) -> Result<Vec<String>> {
            Err(MedleyError::ToolFailed("offline".to_string()))
        }

        async fn download_audio(&self, _video_id: &str, _dir: &Path) -> Result<PathBuf> {
            Err(MedleyError::ToolFailed("offline".to_string()))
        }

        async fn metadata(&self, _video_id: &str) -> Result<VideoMetadata> {
            Ok(VideoMetadata {
                title: "Offline".to_string(),
                description: "Cached".to_string(),
            })
        }
    }

    /// Accepts every model and echoes the prompt.
    #[derive(Default)]
    struct EchoModel {
        prompts: Mutex<Vec<String>>,
        keyless: bool,
    }

    #[async_trait]
    impl ModelClient for EchoModel {
        async fn list_models(&self) -> Result<Vec<String>> {
            Ok(Vec::new())
        }

        async fn generate(&self, _model: &str, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(prompt.to_string())
        }

        async fn generate_with_image(
            &self,
            _model: &str,
            _prompt: &str,
            _image: &ImageInput,
        ) -> Result<String> {
            Ok("image answer".to_string())
        }

        fn has_credentials(&self) -> bool {
            !self.keyless
        }
    }

    fn orchestrator(dir: &Path, model: Arc<EchoModel>) -> Orchestrator {
        let mut settings = Settings::default();
        settings.general.temp_dir = dir.join("tmp").to_string_lossy().to_string();
        settings.tools = ToolSettings {
            ffmpeg: Some("/nonexistent/ffmpeg".to_string()),
            tesseract: Some("/nonexistent/tesseract".to_string()),
            ..Default::default()
        };

        Orchestrator::with_components(
            settings,
            Arc::new(FixedTranscriber),
            Arc::new(MemoryContentStore::new()),
            Arc::new(OfflineVideo),
            model,
        )
        .unwrap()
    }

    fn write(dir: &Path, name: &str, contents: &[u8]) -> String {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path.to_string_lossy().to_string()
    }

    #[tokio::test]
    async fn test_ingest_text_and_search() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(dir.path(), Arc::new(EchoModel::default()));
        let path = write(dir.path(), "notes.md", b"Rust ownership rules");

        let result = orch.ingest(&path).await.unwrap();
        assert_eq!(result.kind, ContentKind::Text);
        assert_eq!(result.chars, 20);
        assert!(result.extraction_error.is_none());

        let hits = orch.search("ownership").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].reference, path);
    }

    #[tokio::test]
    async fn test_questions_need_credentials_but_ingest_does_not() {
        let dir = tempfile::tempdir().unwrap();
        let model = Arc::new(EchoModel {
            keyless: true,
            ..Default::default()
        });
        let orch = orchestrator(dir.path(), model.clone());
        let path = write(dir.path(), "notes.txt", b"kept locally");

        orch.ingest(&path).await.unwrap();

        let err = orch.ask("What is kept?").await.unwrap_err();
        assert!(matches!(err, MedleyError::Config(_)));

        let image = write(dir.path(), "shot.png", b"png");
        let err = orch
            .ask_about_image(Path::new(&image), "What is this?", None)
            .await
            .unwrap_err();
        assert!(matches!(err, MedleyError::Config(_)));

        assert!(model.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_format_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(dir.path(), Arc::new(EchoModel::default()));
        let path = write(dir.path(), "data.csv", b"a,b");

        let err = orch.ingest(&path).await.unwrap_err();
        assert!(matches!(err, MedleyError::UnsupportedFormat(_)));
        assert_eq!(orch.counts().await.unwrap(), StoreCounts::default());
    }

    #[tokio::test]
    async fn test_missing_file_is_invalid_input() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(dir.path(), Arc::new(EchoModel::default()));

        let err = orch
            .ingest(&dir.path().join("gone.pdf").to_string_lossy())
            .await
            .unwrap_err();
        assert!(matches!(err, MedleyError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_media_failure_stores_empty_text() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(dir.path(), Arc::new(EchoModel::default()));
        let path = write(dir.path(), "song.mp3", b"ID3");

        let result = orch.ingest(&path).await.unwrap();
        assert_eq!(result.kind, ContentKind::Audio);
        assert_eq!(result.chars, 0);
        assert!(result.extraction_error.is_some());
        assert_eq!(orch.most_recent(1).await.unwrap()[0].text, "");
    }

    #[tokio::test]
    async fn test_media_failure_propagates_when_configured() {
        let dir = tempfile::tempdir().unwrap();
        let mut orch = orchestrator(dir.path(), Arc::new(EchoModel::default()));
        orch.settings.ingest.store_empty_on_failure = false;
        let path = write(dir.path(), "scan.png", b"\x89PNG");

        let err = orch.ingest(&path).await.unwrap_err();
        assert!(matches!(err, MedleyError::RecognitionFailure(_)));
        assert_eq!(orch.counts().await.unwrap().sources, 0);
    }

    #[tokio::test]
    async fn test_document_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(dir.path(), Arc::new(EchoModel::default()));
        let path = write(dir.path(), "broken.docx", b"not a zip");

        let err = orch.ingest(&path).await.unwrap_err();
        assert!(matches!(err, MedleyError::DecodeFailure(_)));
    }

    #[tokio::test]
    async fn test_youtube_ingest_uses_chain() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(dir.path(), Arc::new(EchoModel::default()));

        let result = orch
            .ingest("https://www.youtube.com/watch?v=dQw4w9WgXcQ")
            .await
            .unwrap();
        assert_eq!(result.kind, ContentKind::Youtube);

        let recent = orch.most_recent(1).await.unwrap();
        assert_eq!(recent[0].text, "Title: Offline\nDescription: Cached");
    }

    #[tokio::test]
    async fn test_ask_joins_all_hits() {
        let dir = tempfile::tempdir().unwrap();
        let model = Arc::new(EchoModel::default());
        let orch = orchestrator(dir.path(), model.clone());

        let a = write(dir.path(), "a.txt", b"alpha: what is rust");
        let b = write(dir.path(), "b.txt", b"beta: what is rust");
        orch.ingest(&a).await.unwrap();
        orch.ingest(&b).await.unwrap();

        let outcome = orch.ask("what is rust").await.unwrap();
        assert_eq!(outcome.source.as_deref(), Some(a.as_str()));
        assert_eq!(
            outcome.answer,
            "Context:\nalpha: what is rust\n----\nbeta: what is rust\n\nQuestion: what is rust"
        );
    }

    #[tokio::test]
    async fn test_ask_falls_back_to_most_recent() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(dir.path(), Arc::new(EchoModel::default()));

        orch.ingest(&write(dir.path(), "old.txt", b"old")).await.unwrap();
        let newer = write(dir.path(), "new.txt", b"new");
        orch.ingest(&newer).await.unwrap();

        let outcome = orch.ask("unrelated question").await.unwrap();
        assert_eq!(outcome.source.as_deref(), Some(newer.as_str()));
        assert_eq!(outcome.context_preview.as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_ask_on_empty_store_sends_bare_question() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(dir.path(), Arc::new(EchoModel::default()));

        let outcome = orch.ask("hello?").await.unwrap();
        assert_eq!(outcome.answer, "hello?");
        assert!(outcome.source.is_none());
        assert!(outcome.context_preview.is_none());
    }

    #[tokio::test]
    async fn test_model_resolved_once() {
        let dir = tempfile::tempdir().unwrap();
        let model = Arc::new(EchoModel::default());
        let orch = orchestrator(dir.path(), model.clone());

        orch.ask("one").await.unwrap();
        orch.ask("two").await.unwrap();

        // One probe, then one call per question
        assert_eq!(*model.prompts.lock().unwrap(), vec!["ping", "one", "two"]);
        assert_eq!(orch.model().await.unwrap().as_str(), "gpt-4o-mini");
    }

    #[test]
    fn test_context_preview() {
        assert_eq!(context_preview("short"), "short");
        let long = "x".repeat(401);
        assert_eq!(context_preview(&long), format!("{}...", "x".repeat(400)));
    }
}

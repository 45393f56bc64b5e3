//! Application core for Svar.
//!
//! Applies user events to sessions: acquires contexts, transcribes spoken questions, runs the
//! question-answering model and synthesizes spoken answers. Capability failures never escape
//! as errors; they become notices on the session so the user can simply try again.

use crate::audio::{FfmpegExporter, WavExporter};
use crate::config::Settings;
use crate::context::{extract_text, TopicLookup, WikipediaClient};
use crate::error::{Result, SvarError};
use crate::qa::SharedModel;
use crate::session::{
    Event, NoticeLevel, Session, SessionHandle, SessionStore, Stage, View, QUESTION_PROMPT,
};
use crate::speech::{OpenAISpeech, Synthesizer};
use crate::transcription::{Recognition, Transcriber, WhisperTranscriber};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// The main application: capabilities plus live sessions.
pub struct App {
    settings: Settings,
    lookup: Arc<dyn TopicLookup>,
    model: Arc<SharedModel>,
    transcriber: Arc<dyn Transcriber>,
    synthesizer: Arc<dyn Synthesizer>,
    exporter: Arc<dyn WavExporter>,
    sessions: SessionStore,
}

impl App {
    /// Create the application with the default providers.
    pub fn new(settings: Settings) -> Result<Self> {
        let lookup = Arc::new(WikipediaClient::new(&settings.wikipedia)?);
        let model = Arc::new(SharedModel::from_settings(settings.qa.clone()));
        let transcriber = Arc::new(WhisperTranscriber::with_config(&settings.transcription)?);
        let synthesizer = Arc::new(OpenAISpeech::with_config(&settings.speech)?);

        Ok(Self::with_components(
            settings,
            lookup,
            model,
            transcriber,
            synthesizer,
            Arc::new(FfmpegExporter),
        ))
    }

    /// Create the application with custom components.
    pub fn with_components(
        settings: Settings,
        lookup: Arc<dyn TopicLookup>,
        model: Arc<SharedModel>,
        transcriber: Arc<dyn Transcriber>,
        synthesizer: Arc<dyn Synthesizer>,
        exporter: Arc<dyn WavExporter>,
    ) -> Self {
        let sessions = SessionStore::new(settings.temp_dir());
        Self {
            settings,
            lookup,
            model,
            transcriber,
            synthesizer,
            exporter,
            sessions,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Start a new session and render it.
    pub async fn create_session(&self) -> Result<View> {
        let handle = self.sessions.create()?;
        let session = handle.lock().await;
        Ok(session.view())
    }

    /// Render an existing session.
    pub async fn view(&self, id: &Uuid) -> Result<View> {
        let handle = self.sessions.get(id)?;
        let session = handle.lock().await;
        Ok(session.view())
    }

    /// End a session and discard its files.
    pub fn close_session(&self, id: &Uuid) -> Result<()> {
        self.sessions.remove(id)
    }

    /// Drop sessions idle for longer than `server.session_idle_minutes`.
    pub fn evict_idle_sessions(&self) -> usize {
        let max_idle = Duration::from_secs(self.settings.server.session_idle_minutes * 60);
        let evicted = self.sessions.evict_idle(max_idle);
        if evicted > 0 {
            info!("Evicted {} idle session(s), {} remaining", evicted, self.sessions.len());
        }
        evicted
    }

    /// Apply an event to a session and render the result.
    pub async fn apply(&self, id: &Uuid, event: Event) -> Result<View> {
        let handle: SessionHandle = self.sessions.get(id)?;
        let mut session = handle.lock().await;
        self.handle(&mut session, event).await?;
        Ok(session.view())
    }

    /// Read the exported voice recording of a session.
    pub async fn voice_audio(&self, id: &Uuid) -> Result<Vec<u8>> {
        let handle = self.sessions.get(id)?;
        let session = handle.lock().await;
        read_artifact(session.has_voice_input, session.workspace().voice_wav()).await
    }

    /// Read the synthesized answer of a session.
    pub async fn answer_audio(&self, id: &Uuid) -> Result<Vec<u8>> {
        let handle = self.sessions.get(id)?;
        let session = handle.lock().await;
        read_artifact(session.has_answer_audio, session.workspace().answer_audio()).await
    }

    /// MIME type of synthesized answers.
    pub fn answer_mime_type(&self) -> &'static str {
        self.synthesizer.mime_type()
    }

    /// Apply one event to a locked session.
    ///
    /// Only malformed input is returned as an error; everything else becomes a notice.
    #[instrument(skip_all, fields(session = %session.id))]
    pub async fn handle(&self, session: &mut Session, event: Event) -> Result<()> {
        // Rejected input leaves the session exactly as it was
        if let Event::UploadDocument { bytes, .. } | Event::RecordVoice { bytes, .. } = &event {
            self.check_upload_size(bytes.len())?;
        }

        session.begin_interaction();

        match event {
            Event::SearchTopic(topic) => self.search_topic(session, topic).await,
            Event::EnterText(text) => session.entered_text = text,
            Event::UploadDocument { filename, bytes } => {
                self.upload_document(session, &filename, &bytes);
            }
            Event::SelectSource(source) => session.source = source,
            Event::TypeQuestion(question) => session.question = question,
            Event::RecordVoice { filename, bytes } => {
                self.record_voice(session, &filename, &bytes).await;
            }
            Event::GetAnswer => self.get_answer(session).await,
        }

        session.settle();
        Ok(())
    }

    fn check_upload_size(&self, len: usize) -> Result<()> {
        let max = self.settings.server.max_upload_bytes;
        if len > max {
            return Err(SvarError::InvalidInput(format!(
                "Upload of {} bytes exceeds the limit of {} bytes",
                len, max
            )));
        }
        Ok(())
    }

    async fn search_topic(&self, session: &mut Session, topic: String) {
        session.topic = topic;
        session.wikipedia_text.clear();

        let topic = session.topic.trim().to_string();
        if topic.is_empty() {
            return;
        }

        match self.lookup.lookup(&topic).await {
            Ok(article) => {
                info!("Loaded article '{}' ({} chars)", article.title, article.content.len());
                session.wikipedia_text = article.content;
                session.notify(NoticeLevel::Success, "Wikipedia content loaded.");
            }
            Err(e) => {
                warn!("Wikipedia lookup for '{}' failed: {}", topic, e);
                session.notify(NoticeLevel::Error, format!("Wikipedia Error: {}", e));
            }
        }
    }

    fn upload_document(&self, session: &mut Session, filename: &str, bytes: &[u8]) {
        match extract_text(filename, bytes) {
            Ok(text) => {
                info!("Extracted {} chars from {}", text.len(), filename);
                session.uploaded_text = text;
                session.upload_name = Some(filename.to_string());
                session.notify(NoticeLevel::Success, "File content extracted.");
            }
            Err(e) => {
                warn!("Extraction of {} failed: {}", filename, e);
                session.uploaded_text.clear();
                session.upload_name = None;
                session.notify(NoticeLevel::Error, e.to_string());
            }
        }
    }

    async fn record_voice(&self, session: &mut Session, filename: &str, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }

        let workspace = session.workspace();
        let input = workspace.voice_input(filename);
        let wav = workspace.voice_wav();

        let exported = async {
            tokio::fs::write(&input, bytes).await?;
            self.exporter.export(&input, &wav).await?;
            Ok::<_, SvarError>(tokio::fs::read(&wav).await?)
        }
        .await;

        let wav_bytes = match exported {
            Ok(b) => b,
            Err(e) => {
                warn!("Voice export failed: {}", e);
                let message = match e {
                    SvarError::AudioExport(_) => e.to_string(),
                    other => format!("Audio export failed: {}", other),
                };
                session.notify(NoticeLevel::Error, message);
                return;
            }
        };
        session.has_voice_input = true;

        match self.transcriber.transcribe(&wav_bytes).await {
            Ok(Recognition::Recognized(text)) => {
                info!("Recognized question: {}", text);
                session.notify(NoticeLevel::Success, format!("Recognized: {}", text));
                session.question = text;
            }
            Ok(Recognition::Unintelligible) => {
                session.notify(NoticeLevel::Warning, "Couldn't understand audio.");
            }
            Err(e) => {
                warn!("Transcription failed: {}", e);
                session.notify(NoticeLevel::Error, "Speech service unavailable.");
            }
        }
    }

    async fn get_answer(&self, session: &mut Session) {
        if session.context().is_empty() {
            // The view carries the context prompt
            return;
        }

        if session.question.trim().is_empty() {
            session.notify(NoticeLevel::Warning, QUESTION_PROMPT);
            return;
        }

        session.stage = Stage::Inferring;
        let question = session.question.clone();

        let result = async {
            let model = self.model.get().await?;
            model.answer(&question, session.context()).await
        }
        .await;

        let answer = match result {
            Ok(answer) => answer,
            Err(e) => {
                error!("Inference failed: {}", e);
                session.stage = Stage::Failed;
                session.notify(NoticeLevel::Error, format!("Error: {}", e));
                return;
            }
        };

        info!("Answer '{}' (confidence {})", answer.text, answer.confidence());
        session.stage = Stage::Answered;
        session.notify(NoticeLevel::Success, format!("Answer: {}", answer.text));

        let spoken = self.speak(session, &answer.text).await;
        session.answer = Some(answer);
        match spoken {
            Ok(has_audio) => session.has_answer_audio = has_audio,
            Err(e) => {
                warn!("Speech synthesis failed: {}", e);
                let message = match e {
                    SvarError::Synthesis(_) => e.to_string(),
                    other => format!("Speech synthesis failed: {}", other),
                };
                session.notify(NoticeLevel::Error, message);
            }
        }
    }

    /// Synthesize the answer into the session workspace. Returns false for blank answers.
    async fn speak(&self, session: &Session, text: &str) -> Result<bool> {
        if text.trim().is_empty() {
            return Ok(false);
        }
        let audio = self.synthesizer.synthesize(text).await?;
        tokio::fs::write(session.workspace().answer_audio(), &audio).await?;
        Ok(true)
    }
}

async fn read_artifact(present: bool, path: std::path::PathBuf) -> Result<Vec<u8>> {
    if !present {
        return Err(SvarError::InvalidInput("No audio available".to_string()));
    }
    Ok(tokio::fs::read(path).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Article, ContextSource};
    use crate::qa::{Answer, AnswerModel};
    use crate::session::CONTEXT_PROMPT;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_test::assert_ok;

    struct FakeWiki;

    #[async_trait]
    impl TopicLookup for FakeWiki {
        async fn lookup(&self, topic: &str) -> Result<Article> {
            match topic {
                "Paris" => Ok(Article {
                    title: "Paris".to_string(),
                    content: "Paris is the capital of France.".to_string(),
                }),
                "Mercury" => Err(SvarError::TopicAmbiguous {
                    topic: "Mercury".to_string(),
                    options: vec!["Mercury (planet)".to_string(), "Mercury (element)".to_string()],
                }),
                "Offline" => Err(SvarError::Lookup("connection refused".to_string())),
                other => Err(SvarError::TopicNotFound(other.to_string())),
            }
        }
    }

    /// Picks the first capitalized word of the context that is not in the question.
    struct FakeModel {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl AnswerModel for FakeModel {
        async fn answer(&self, question: &str, context: &str) -> Result<Answer> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(SvarError::Inference("model exploded".to_string()));
            }
            let (start, word) = context
                .split_whitespace()
                .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
                .filter(|w| w.chars().next().is_some_and(char::is_uppercase))
                .filter(|w| !question.contains(*w))
                .map(|w| (context.find(w).unwrap_or(0), w))
                .next()
                .unwrap_or((0, ""));
            Ok(Answer {
                text: word.to_string(),
                score: 0.97,
                start,
                end: start + word.len(),
            })
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    enum TranscriberMode {
        Says(&'static str),
        Mumbles,
        Down,
    }

    struct FakeTranscriber(TranscriberMode);

    #[async_trait]
    impl Transcriber for FakeTranscriber {
        async fn transcribe(&self, _wav: &[u8]) -> Result<Recognition> {
            match self.0 {
                TranscriberMode::Says(text) => Ok(Recognition::Recognized(text.to_string())),
                TranscriberMode::Mumbles => Ok(Recognition::Unintelligible),
                TranscriberMode::Down => Err(SvarError::SpeechServiceUnavailable(
                    "503 Service Unavailable".to_string(),
                )),
            }
        }
    }

    struct FakeSpeech {
        fail: bool,
    }

    #[async_trait]
    impl Synthesizer for FakeSpeech {
        async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
            if self.fail {
                return Err(SvarError::Synthesis("quota exceeded".to_string()));
            }
            Ok(format!("MP3:{}", text).into_bytes())
        }
    }

    /// Copies the clip instead of running ffmpeg, or fails like a broken ffmpeg.
    struct FakeExporter {
        fail: bool,
    }

    #[async_trait]
    impl WavExporter for FakeExporter {
        async fn export(&self, source: &Path, dest: &Path) -> Result<()> {
            if self.fail {
                return Err(SvarError::AudioExport(
                    "ffmpeg conversion failed: Invalid data found when processing input"
                        .to_string(),
                ));
            }
            tokio::fs::copy(source, dest).await?;
            Ok(())
        }
    }

    struct Harness {
        app: App,
        calls: Arc<AtomicUsize>,
        _root: tempfile::TempDir,
    }

    struct Options {
        model_fails: bool,
        speech_fails: bool,
        export_fails: bool,
        transcriber: TranscriberMode,
    }

    impl Default for Options {
        fn default() -> Self {
            Self {
                model_fails: false,
                speech_fails: false,
                export_fails: false,
                transcriber: TranscriberMode::Says("What is the capital of France?"),
            }
        }
    }

    fn harness(options: Options) -> Harness {
        let root = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.general.temp_dir = root.path().to_string_lossy().to_string();
        settings.server.max_upload_bytes = 1024;

        let calls = Arc::new(AtomicUsize::new(0));
        let model_calls = calls.clone();
        let fail = options.model_fails;
        let model = Arc::new(SharedModel::new(move || {
            Ok(Arc::new(FakeModel {
                calls: model_calls.clone(),
                fail,
            }) as Arc<dyn AnswerModel>)
        }));

        let app = App::with_components(
            settings,
            Arc::new(FakeWiki),
            model,
            Arc::new(FakeTranscriber(options.transcriber)),
            Arc::new(FakeSpeech {
                fail: options.speech_fails,
            }),
            Arc::new(FakeExporter {
                fail: options.export_fails,
            }),
        );

        Harness {
            app,
            calls,
            _root: root,
        }
    }

    async fn session_with_text(app: &App, text: &str) -> Uuid {
        let id = app.create_session().await.unwrap().session_id;
        app.apply(&id, Event::EnterText(text.to_string())).await.unwrap();
        app.apply(&id, Event::SelectSource(ContextSource::EnteredText))
            .await
            .unwrap();
        id
    }

    #[tokio::test]
    async fn test_paris_scenario() {
        let h = harness(Options::default());
        let id = session_with_text(&h.app, "Paris is the capital of France.").await;

        h.app
            .apply(&id, Event::TypeQuestion("What is the capital of France?".to_string()))
            .await
            .unwrap();
        let view = h.app.apply(&id, Event::GetAnswer).await.unwrap();

        assert_eq!(view.stage, Stage::Answered);
        let answer = view.answer.as_ref().expect("answer");
        assert_eq!(answer.text, "Paris");
        assert!(answer.score > 0.5);
        assert_eq!(answer.confidence, "0.97");
        assert!(answer.has_audio);
        assert!(view.has_notice(NoticeLevel::Success, "Answer: Paris"));

        let audio = h.app.answer_audio(&id).await.unwrap();
        assert_eq!(audio, b"MP3:Paris");
    }

    #[tokio::test]
    async fn test_repeated_inference_is_stable() {
        let h = harness(Options::default());
        let id = session_with_text(&h.app, "Paris is the capital of France.").await;
        h.app
            .apply(&id, Event::TypeQuestion("What is the capital of France?".to_string()))
            .await
            .unwrap();

        let first = h.app.apply(&id, Event::GetAnswer).await.unwrap().answer.unwrap();
        let second = h.app.apply(&id, Event::GetAnswer).await.unwrap().answer.unwrap();
        assert_eq!(first.text, second.text);
        assert_eq!(first.score, second.score);
        assert_eq!(h.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_context_never_infers() {
        let h = harness(Options::default());
        let id = h.app.create_session().await.unwrap().session_id;
        h.app
            .apply(&id, Event::TypeQuestion("What is the capital of France?".to_string()))
            .await
            .unwrap();

        let view = h.app.apply(&id, Event::GetAnswer).await.unwrap();
        assert!(view.answer.is_none());
        assert!(view.has_notice(NoticeLevel::Info, CONTEXT_PROMPT));
        assert_eq!(view.stage, Stage::Idle);
        assert_eq!(h.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_blank_question_never_infers() {
        let h = harness(Options::default());
        let id = session_with_text(&h.app, "Paris is the capital of France.").await;

        for question in ["", "   ", "\n\t"] {
            h.app
                .apply(&id, Event::TypeQuestion(question.to_string()))
                .await
                .unwrap();
            let view = h.app.apply(&id, Event::GetAnswer).await.unwrap();
            assert!(view.has_notice(NoticeLevel::Warning, QUESTION_PROMPT));
            assert_eq!(view.stage, Stage::ContextSelected);
        }
        assert_eq!(h.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_selecting_empty_source_disables_inference() {
        let h = harness(Options::default());
        let id = session_with_text(&h.app, "Paris is the capital of France.").await;
        h.app
            .apply(&id, Event::TypeQuestion("What is the capital of France?".to_string()))
            .await
            .unwrap();

        let view = h
            .app
            .apply(&id, Event::SelectSource(ContextSource::UploadedFile))
            .await
            .unwrap();
        assert_eq!(view.stage, Stage::ContextAcquired);
        assert!(view.context_preview.is_none());

        h.app.apply(&id, Event::GetAnswer).await.unwrap();
        assert_eq!(h.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_topic_lookup_success() {
        let h = harness(Options::default());
        let id = h.app.create_session().await.unwrap().session_id;

        let view = h
            .app
            .apply(&id, Event::SearchTopic("Paris".to_string()))
            .await
            .unwrap();
        assert!(view.has_notice(NoticeLevel::Success, "Wikipedia content loaded."));
        assert_eq!(
            view.context_preview.as_deref(),
            Some("Paris is the capital of France.")
        );
        assert_eq!(view.stage, Stage::ContextSelected);
    }

    #[tokio::test]
    async fn test_topic_lookup_failures_leave_context_empty() {
        let h = harness(Options::default());
        let id = h.app.create_session().await.unwrap().session_id;
        h.app
            .apply(&id, Event::SearchTopic("Paris".to_string()))
            .await
            .unwrap();

        for topic in ["Mercury", "Xyzzyq", "Offline"] {
            let view = h
                .app
                .apply(&id, Event::SearchTopic(topic.to_string()))
                .await
                .unwrap();
            assert!(view.context_preview.is_none(), "{} left context behind", topic);
            let error = view
                .notices
                .iter()
                .find(|n| n.level == NoticeLevel::Error)
                .expect("error notice");
            assert!(error.message.starts_with("Wikipedia Error: "));
        }
    }

    #[tokio::test]
    async fn test_blank_topic_clears_without_lookup() {
        let h = harness(Options::default());
        let id = h.app.create_session().await.unwrap().session_id;
        h.app
            .apply(&id, Event::SearchTopic("Paris".to_string()))
            .await
            .unwrap();

        let view = h
            .app
            .apply(&id, Event::SearchTopic("  ".to_string()))
            .await
            .unwrap();
        assert!(view.context_preview.is_none());
        assert!(!view.notices.iter().any(|n| n.level == NoticeLevel::Error));
    }

    #[tokio::test]
    async fn test_text_upload_round_trip() {
        let h = harness(Options::default());
        let id = h.app.create_session().await.unwrap().session_id;

        let text = "Oslo is the capital of Norway.\n";
        let view = h
            .app
            .apply(
                &id,
                Event::UploadDocument {
                    filename: "notes.txt".to_string(),
                    bytes: text.as_bytes().to_vec(),
                },
            )
            .await
            .unwrap();
        assert!(view.has_notice(NoticeLevel::Success, "File content extracted."));
        assert_eq!(view.upload_name.as_deref(), Some("notes.txt"));

        let view = h
            .app
            .apply(&id, Event::SelectSource(ContextSource::UploadedFile))
            .await
            .unwrap();
        assert_eq!(view.context_preview.as_deref(), Some(text));
    }

    #[tokio::test]
    async fn test_unsupported_upload_is_rejected() {
        let h = harness(Options::default());
        let id = h.app.create_session().await.unwrap().session_id;

        let view = h
            .app
            .apply(
                &id,
                Event::UploadDocument {
                    filename: "slides.pptx".to_string(),
                    bytes: b"PK".to_vec(),
                },
            )
            .await
            .unwrap();
        assert!(view.upload_name.is_none());
        assert!(view
            .notices
            .iter()
            .any(|n| n.level == NoticeLevel::Error && n.message.contains("Unsupported")));
    }

    #[tokio::test]
    async fn test_oversized_upload_is_invalid_input() {
        let h = harness(Options::default());
        let id = h.app.create_session().await.unwrap().session_id;

        let result = h
            .app
            .apply(
                &id,
                Event::UploadDocument {
                    filename: "big.txt".to_string(),
                    bytes: vec![b'a'; 2048],
                },
            )
            .await;
        assert!(matches!(result, Err(SvarError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_rejected_upload_keeps_session_state() {
        let h = harness(Options::default());
        let id = session_with_text(&h.app, "Paris is the capital of France.").await;
        let before = h
            .app
            .apply(&id, Event::TypeQuestion("What is the capital of France?".to_string()))
            .await
            .unwrap();
        assert_eq!(before.stage, Stage::QuestionReady);

        for event in [
            Event::UploadDocument {
                filename: "big.txt".to_string(),
                bytes: vec![b'a'; 2048],
            },
            Event::RecordVoice {
                filename: "long.webm".to_string(),
                bytes: vec![0; 2048],
            },
        ] {
            let result = h.app.apply(&id, event).await;
            assert!(matches!(result, Err(SvarError::InvalidInput(_))));

            let after = h.app.view(&id).await.unwrap();
            assert_eq!(after.stage, Stage::QuestionReady);
            assert_eq!(after.question, before.question);
            assert_eq!(after.context_preview, before.context_preview);
            assert!(!after.has_voice_input);
        }
    }

    #[tokio::test]
    async fn test_voice_question_overwrites_typed() {
        let h = harness(Options::default());
        let id = session_with_text(&h.app, "Paris is the capital of France.").await;
        h.app
            .apply(&id, Event::TypeQuestion("typed question".to_string()))
            .await
            .unwrap();

        let view = h
            .app
            .apply(
                &id,
                Event::RecordVoice {
                    filename: "clip.webm".to_string(),
                    bytes: b"RIFF-fake".to_vec(),
                },
            )
            .await
            .unwrap();
        assert_eq!(view.question, "What is the capital of France?");
        assert!(view.has_notice(
            NoticeLevel::Success,
            "Recognized: What is the capital of France?"
        ));
        assert!(view.has_voice_input);
        // Recording never triggers inference on its own
        assert!(view.answer.is_none());
        assert_eq!(h.calls.load(Ordering::SeqCst), 0);

        assert_ok!(h.app.voice_audio(&id).await);
    }

    #[tokio::test]
    async fn test_unintelligible_voice_keeps_question() {
        let h = harness(Options {
            transcriber: TranscriberMode::Mumbles,
            ..Options::default()
        });
        let id = session_with_text(&h.app, "Paris is the capital of France.").await;
        h.app
            .apply(&id, Event::TypeQuestion("typed question".to_string()))
            .await
            .unwrap();

        let view = h
            .app
            .apply(
                &id,
                Event::RecordVoice {
                    filename: "clip.webm".to_string(),
                    bytes: b"noise".to_vec(),
                },
            )
            .await
            .unwrap();
        assert_eq!(view.question, "typed question");
        assert!(view.has_notice(NoticeLevel::Warning, "Couldn't understand audio."));
        assert!(view.answer.is_none());
        assert_eq!(h.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_audio_export_failure_keeps_question() {
        let h = harness(Options {
            export_fails: true,
            ..Options::default()
        });
        let id = session_with_text(&h.app, "Paris is the capital of France.").await;
        h.app
            .apply(&id, Event::TypeQuestion("typed question".to_string()))
            .await
            .unwrap();

        let view = h
            .app
            .apply(
                &id,
                Event::RecordVoice {
                    filename: "clip.webm".to_string(),
                    bytes: b"not audio".to_vec(),
                },
            )
            .await
            .unwrap();
        assert_eq!(view.question, "typed question");
        assert!(!view.has_voice_input);
        assert!(view.answer.is_none());

        let errors: Vec<_> = view
            .notices
            .iter()
            .filter(|n| n.level == NoticeLevel::Error)
            .collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].message,
            "Audio export failed: ffmpeg conversion failed: Invalid data found when processing input"
        );
        assert_eq!(h.calls.load(Ordering::SeqCst), 0);
        assert!(h.app.voice_audio(&id).await.is_err());
    }

    #[tokio::test]
    async fn test_speech_service_down_keeps_question() {
        let h = harness(Options {
            transcriber: TranscriberMode::Down,
            ..Options::default()
        });
        let id = h.app.create_session().await.unwrap().session_id;
        h.app
            .apply(&id, Event::TypeQuestion("typed question".to_string()))
            .await
            .unwrap();

        let view = h
            .app
            .apply(
                &id,
                Event::RecordVoice {
                    filename: "clip.webm".to_string(),
                    bytes: b"speech".to_vec(),
                },
            )
            .await
            .unwrap();
        assert_eq!(view.question, "typed question");
        assert!(view.has_notice(NoticeLevel::Error, "Speech service unavailable."));
    }

    #[tokio::test]
    async fn test_empty_recording_is_ignored() {
        let h = harness(Options::default());
        let id = h.app.create_session().await.unwrap().session_id;

        let view = h
            .app
            .apply(
                &id,
                Event::RecordVoice {
                    filename: "clip.webm".to_string(),
                    bytes: Vec::new(),
                },
            )
            .await
            .unwrap();
        assert!(!view.has_voice_input);
        assert!(view.question.is_empty());
    }

    #[tokio::test]
    async fn test_inference_failure_is_reported() {
        let h = harness(Options {
            model_fails: true,
            ..Options::default()
        });
        let id = session_with_text(&h.app, "Paris is the capital of France.").await;
        h.app
            .apply(&id, Event::TypeQuestion("What is the capital of France?".to_string()))
            .await
            .unwrap();

        let view = h.app.apply(&id, Event::GetAnswer).await.unwrap();
        assert_eq!(view.stage, Stage::Failed);
        assert!(view.answer.is_none());
        assert!(view.has_notice(
            NoticeLevel::Error,
            "Error: Inference failed: model exploded"
        ));

        // The next interaction resets the outcome
        let view = h
            .app
            .apply(&id, Event::TypeQuestion("Another?".to_string()))
            .await
            .unwrap();
        assert_eq!(view.stage, Stage::QuestionReady);
        assert!(view.notices.is_empty());
    }

    #[tokio::test]
    async fn test_synthesis_failure_keeps_text_answer() {
        let h = harness(Options {
            speech_fails: true,
            ..Options::default()
        });
        let id = session_with_text(&h.app, "Paris is the capital of France.").await;
        h.app
            .apply(&id, Event::TypeQuestion("What is the capital of France?".to_string()))
            .await
            .unwrap();

        let view = h.app.apply(&id, Event::GetAnswer).await.unwrap();
        assert_eq!(view.stage, Stage::Answered);
        let answer = view.answer.as_ref().expect("text answer survives");
        assert_eq!(answer.text, "Paris");
        assert!(!answer.has_audio);
        assert!(view.has_notice(
            NoticeLevel::Error,
            "Speech synthesis failed: quota exceeded"
        ));
        assert!(h.app.answer_audio(&id).await.is_err());
    }

    #[tokio::test]
    async fn test_idle_sessions_are_evicted() {
        let mut h = harness(Options::default());
        for _ in 0..3 {
            h.app.create_session().await.unwrap();
        }
        assert_eq!(h.app.evict_idle_sessions(), 0);
        assert_eq!(h.app.sessions().len(), 3);

        h.app.settings.server.session_idle_minutes = 0;
        assert_eq!(h.app.evict_idle_sessions(), 3);
        assert!(h.app.sessions().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let h = harness(Options::default());
        let result = h.app.apply(&Uuid::new_v4(), Event::GetAnswer).await;
        assert!(matches!(result, Err(SvarError::SessionNotFound(_))));
    }

    #[tokio::test]
    async fn test_sessions_do_not_share_audio() {
        let h = harness(Options::default());
        let a = session_with_text(&h.app, "Paris is the capital of France.").await;
        let b = session_with_text(&h.app, "Oslo is the capital of Norway.").await;

        for id in [&a, &b] {
            h.app
                .apply(id, Event::TypeQuestion("What is the capital?".to_string()))
                .await
                .unwrap();
            h.app.apply(id, Event::GetAnswer).await.unwrap();
        }

        assert_eq!(h.app.answer_audio(&a).await.unwrap(), b"MP3:Paris");
        assert_eq!(h.app.answer_audio(&b).await.unwrap(), b"MP3:Oslo");

        h.app.close_session(&a).unwrap();
        assert!(h.app.view(&a).await.is_err());
        assert!(h.app.view(&b).await.is_ok());
    }
}

//! Interactive session state.
//!
//! A session holds everything one user has entered so far: the three candidate contexts,
//! the selected source, and the question. Each user interaction is an [`Event`]; after it
//! is applied the session is rendered into a [`View`]. Answers and notices only live for
//! the interaction that produced them.

mod store;
mod workspace;

pub use store::{SessionHandle, SessionStore};
pub use workspace::{Workspace, ANSWER_AUDIO, VOICE_WAV};

use crate::context::ContextSource;
use crate::qa::Answer;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prompt shown while no usable context is selected.
pub const CONTEXT_PROMPT: &str = "Please select or enter a context before asking a question.";

/// Warning shown when "Get Answer" is pressed without a question.
pub const QUESTION_PROMPT: &str = "Please enter or record a question.";

/// Where a session is in the acquisition-to-answer flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// No source has any text.
    Idle,
    /// Some source has text, but the selected one is empty.
    ContextAcquired,
    /// The active context is non-empty; no question yet.
    ContextSelected,
    /// Context and question are both present.
    QuestionReady,
    /// The model call is outstanding.
    Inferring,
    Answered,
    Failed,
}

impl Stage {
    /// Whether this stage is the outcome of an answer request.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Answered | Stage::Failed)
    }
}

/// A user interaction.
#[derive(Debug, Clone)]
pub enum Event {
    /// The topic search box changed.
    SearchTopic(String),
    /// The free-text area changed.
    EnterText(String),
    /// A document was uploaded.
    UploadDocument { filename: String, bytes: Vec<u8> },
    /// The context source radio changed.
    SelectSource(ContextSource),
    /// The question box changed.
    TypeQuestion(String),
    /// A voice recording finished.
    RecordVoice { filename: String, bytes: Vec<u8> },
    /// "Get Answer" was pressed.
    GetAnswer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// A message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// One user's interactive state.
#[derive(Debug)]
pub struct Session {
    pub id: Uuid,
    pub topic: String,
    pub wikipedia_text: String,
    pub entered_text: String,
    pub upload_name: Option<String>,
    pub uploaded_text: String,
    pub source: ContextSource,
    pub question: String,
    pub stage: Stage,
    pub answer: Option<Answer>,
    pub has_answer_audio: bool,
    pub has_voice_input: bool,
    pub notices: Vec<Notice>,
    workspace: Workspace,
}

impl Session {
    /// Create an empty session owning `workspace`.
    pub fn new(workspace: Workspace) -> Self {
        Self {
            id: Uuid::new_v4(),
            topic: String::new(),
            wikipedia_text: String::new(),
            entered_text: String::new(),
            upload_name: None,
            uploaded_text: String::new(),
            source: ContextSource::default(),
            question: String::new(),
            stage: Stage::Idle,
            answer: None,
            has_answer_audio: false,
            has_voice_input: false,
            notices: Vec::new(),
            workspace,
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Text currently held by a source.
    pub fn context_for(&self, source: ContextSource) -> &str {
        match source {
            ContextSource::Wikipedia => &self.wikipedia_text,
            ContextSource::EnteredText => &self.entered_text,
            ContextSource::UploadedFile => &self.uploaded_text,
        }
    }

    /// The active context.
    pub fn context(&self) -> &str {
        self.context_for(self.source)
    }

    /// Clear per-interaction output before applying a new event.
    pub fn begin_interaction(&mut self) {
        self.notices.clear();
        self.answer = None;
        self.has_answer_audio = false;
        self.stage = Stage::Idle;
    }

    /// Recompute the stage from inputs, keeping an answer outcome if one was just reached.
    pub fn settle(&mut self) {
        if !self.stage.is_terminal() {
            self.stage = self.input_stage();
        }
    }

    /// Stage implied by the current inputs alone.
    pub fn input_stage(&self) -> Stage {
        let any_text = ContextSource::ALL
            .iter()
            .any(|s| !self.context_for(*s).is_empty());

        if !any_text {
            Stage::Idle
        } else if self.context().is_empty() {
            Stage::ContextAcquired
        } else if self.question.trim().is_empty() {
            Stage::ContextSelected
        } else {
            Stage::QuestionReady
        }
    }

    pub fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        self.notices.push(Notice::new(level, message));
    }

    /// Render the session.
    pub fn view(&self) -> View {
        let context = self.context();
        let mut notices = self.notices.clone();
        if context.is_empty() {
            notices.push(Notice::new(NoticeLevel::Info, CONTEXT_PROMPT));
        }

        View {
            session_id: self.id,
            stage: self.stage,
            source: self.source,
            topic: self.topic.clone(),
            entered_text: self.entered_text.clone(),
            upload_name: self.upload_name.clone(),
            question: self.question.clone(),
            context_preview: (!context.is_empty()).then(|| context.to_string()),
            notices,
            answer: self.answer.as_ref().map(|a| AnswerView {
                text: a.text.clone(),
                score: a.score,
                confidence: a.confidence(),
                has_audio: self.has_answer_audio,
            }),
            has_voice_input: self.has_voice_input,
        }
    }
}

/// Serializable render of a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct View {
    pub session_id: Uuid,
    pub stage: Stage,
    pub source: ContextSource,
    pub topic: String,
    pub entered_text: String,
    pub upload_name: Option<String>,
    pub question: String,
    pub context_preview: Option<String>,
    pub notices: Vec<Notice>,
    pub answer: Option<AnswerView>,
    pub has_voice_input: bool,
}

impl View {
    /// Whether a notice with this level and message is present.
    pub fn has_notice(&self, level: NoticeLevel, message: &str) -> bool {
        self.notices
            .iter()
            .any(|n| n.level == level && n.message == message)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerView {
    pub text: String,
    pub score: f64,
    /// Score rounded to two decimals.
    pub confidence: String,
    pub has_audio: bool,
}

//! Ask command implementation.

use crate::app::App;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::context::ContextSource;
use crate::session::{Event, View};
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Where the context comes from.
#[derive(Debug)]
pub enum ContextArg {
    Topic(String),
    Text(String),
    File(PathBuf),
}

/// Where the question comes from.
#[derive(Debug)]
pub enum QuestionArg {
    Typed(String),
    Voice(PathBuf),
}

/// Run the ask command.
pub async fn run_ask(
    context: ContextArg,
    question: QuestionArg,
    speak_to: Option<PathBuf>,
    settings: Settings,
) -> Result<()> {
    let mut operations = vec![Operation::Answer];
    if matches!(question, QuestionArg::Voice(_)) {
        operations.push(Operation::Voice);
    }
    if speak_to.is_some() {
        operations.push(Operation::Speak);
    }
    for operation in operations {
        if let Err(e) = preflight::check(operation) {
            Output::error(&format!("{}", e));
            Output::info("Run 'svar doctor' for detailed diagnostics.");
            return Err(e.into());
        }
    }

    let app = App::new(settings)?;
    let id = app.create_session().await?.session_id;

    let result = ask(&app, &id, context, question, speak_to.as_deref()).await;
    app.close_session(&id)?;
    result
}

async fn ask(
    app: &App,
    id: &Uuid,
    context: ContextArg,
    question: QuestionArg,
    speak_to: Option<&Path>,
) -> Result<()> {
    let (event, source) = match context {
        ContextArg::Topic(topic) => (Event::SearchTopic(topic), ContextSource::Wikipedia),
        ContextArg::Text(text) => (Event::EnterText(text), ContextSource::EnteredText),
        ContextArg::File(path) => (
            Event::UploadDocument {
                filename: file_name(&path),
                bytes: std::fs::read(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
            },
            ContextSource::UploadedFile,
        ),
    };

    let spinner = Output::spinner("Loading context...");
    let result = app.apply(id, event).await;
    spinner.finish_and_clear();
    print_notices(&result?);

    let view = app.apply(id, Event::SelectSource(source)).await?;
    let Some(preview) = view.context_preview.as_deref() else {
        print_notices(&view);
        bail!("No context available");
    };
    Output::kv("Context", source.label());
    Output::excerpt(preview, 160);

    let event = match question {
        QuestionArg::Typed(q) => Event::TypeQuestion(q),
        QuestionArg::Voice(path) => Event::RecordVoice {
            filename: file_name(&path),
            bytes: std::fs::read(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?,
        },
    };
    let voice = matches!(event, Event::RecordVoice { .. });
    let view = app.apply(id, event).await?;
    if voice {
        print_notices(&view);
    }

    let spinner = Output::spinner("Finding the answer...");
    let result = app.apply(id, Event::GetAnswer).await;
    spinner.finish_and_clear();
    let view = result?;

    let Some(answer) = view.answer.as_ref() else {
        print_notices(&view);
        bail!("No answer");
    };

    println!("\n{}\n", answer.text);
    Output::kv("Confidence", &answer.confidence);
    for notice in view.notices.iter().filter(|n| !n.message.starts_with("Answer: ")) {
        Output::notice(notice);
    }

    if let Some(path) = speak_to {
        if answer.has_audio {
            let audio = app.answer_audio(id).await?;
            std::fs::write(path, audio)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            Output::success(&format!("Spoken answer saved to {}", path.display()));
        } else {
            Output::warning("No spoken answer available.");
        }
    }

    Ok(())
}

fn print_notices(view: &View) {
    for notice in &view.notices {
        Output::notice(notice);
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

//! Svar CLI entry point.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use svar::audio::prepend_tool_dir;
use svar::cli::commands::{self, ContextArg, QuestionArg};
use svar::cli::{Cli, Commands};
use svar::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_path = cli.config.as_deref().map(PathBuf::from);
    let settings = Settings::load_from(config_path.as_ref())?;

    // Initialize logging
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("svar={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    std::fs::create_dir_all(settings.temp_dir())?;

    // PATH must be final before any runtime threads exist
    if let Some(dir) = settings.ffmpeg_dir() {
        prepend_tool_dir(&dir)?;
    }

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cli.command, config_path, settings))
}

async fn run(command: Commands, config_path: Option<PathBuf>, settings: Settings) -> Result<()> {
    match command {
        Commands::Serve { host, port } => {
            commands::run_serve(host, port, settings).await?;
        }

        Commands::Ask {
            topic,
            text,
            file,
            question,
            voice,
            speak_to,
        } => {
            let context = match (topic, text, file) {
                (Some(topic), _, _) => ContextArg::Topic(topic),
                (_, Some(text), _) => ContextArg::Text(text),
                (_, _, Some(file)) => ContextArg::File(file),
                _ => anyhow::bail!("One of --topic, --text or --file is required"),
            };
            let question = match (question, voice) {
                (Some(q), _) => QuestionArg::Typed(q),
                (_, Some(path)) => QuestionArg::Voice(path),
                _ => anyhow::bail!("One of --question or --voice is required"),
            };
            commands::run_ask(context, question, speak_to, settings).await?;
        }

        Commands::Doctor => {
            commands::run_doctor(&settings)?;
        }

        Commands::Config { action } => {
            commands::run_config(&action, config_path, settings)?;
        }
    }

    Ok(())
}

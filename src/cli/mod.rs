//! CLI module for Svar.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{ArgGroup, Parser, Subcommand};
use std::path::PathBuf;

/// Svar - Ask questions about any text
///
/// Pick a context (a Wikipedia article, your own text or a document), ask a question by
/// keyboard or by voice, and get the answer back as text and speech.
/// The name "Svar" is Norwegian for "answer."
#[derive(Parser, Debug)]
#[command(name = "svar")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
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
    /// Start the web app and HTTP API
    Serve {
        /// Host to bind to (defaults to server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Answer one question from the terminal
    #[command(group(ArgGroup::new("context").required(true).args(["topic", "text", "file"])))]
    #[command(group(ArgGroup::new("query").required(true).args(["question", "voice"])))]
    Ask {
        /// Wikipedia topic to use as context
        #[arg(short, long)]
        topic: Option<String>,

        /// Literal text to use as context
        #[arg(long)]
        text: Option<String>,

        /// Document (.txt or .pdf) to use as context
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// The question to ask
        #[arg(short, long)]
        question: Option<String>,

        /// Audio recording of the question
        #[arg(long)]
        voice: Option<PathBuf>,

        /// Write the spoken answer to this file
        #[arg(long)]
        speak_to: Option<PathBuf>,
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

//! PDFMonkey command-line tool.
//!
//! Edit PDFMonkey templates and snippets locally with your own editor:
//! `init` lays out a resource's files, `watch` pushes every local change and
//! keeps a live preview of templates up to date.

mod commands;
mod launch;
mod progress;
mod prompt;
mod signals;
mod style;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pdfmonkey_core::ResourceType;

use commands::{ApiArgs, PreviewArgs};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// PDFMonkey command-line tool.
#[derive(Parser, Debug)]
#[command(
    name = "pdfmonkey",
    version,
    about = "Edit your PDFMonkey templates and snippets locally with your own code editor"
)]
struct Cli {
    /// Show debug logs.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Interactively initialize one or more resources.
    Init {
        /// Open each initialized folder in $EDITOR.
        #[arg(short, long)]
        edit: bool,

        #[command(flatten)]
        api: ApiArgs,
    },

    /// Watch several resource folders at once.
    Watch {
        /// Resource folders (default: the current folder or the resources below it).
        paths: Vec<PathBuf>,

        #[command(flatten)]
        preview: PreviewArgs,

        #[command(flatten)]
        api: ApiArgs,
    },

    /// Manage PDFMonkey templates.
    #[command(visible_alias = "tpl")]
    Template {
        #[command(subcommand)]
        action: TemplateAction,
    },

    /// Manage PDFMonkey snippets.
    Snippet {
        #[command(subcommand)]
        action: SnippetAction,
    },
}

#[derive(Subcommand, Debug)]
enum TemplateAction {
    /// Initialize a template folder.
    Init {
        /// The ID of the template.
        id: Option<String>,

        /// The template folder.
        path: Option<PathBuf>,

        /// Open the folder in $EDITOR.
        #[arg(short, long)]
        edit: bool,

        #[command(flatten)]
        api: ApiArgs,
    },

    /// Watch a template folder and push every change.
    Watch {
        /// The template folder.
        #[arg(default_value = ".")]
        path: PathBuf,

        /// The ID of the template (default: metadata, then folder name).
        #[arg(short = 't', long = "template-id")]
        template_id: Option<String>,

        #[command(flatten)]
        preview: PreviewArgs,

        #[command(flatten)]
        api: ApiArgs,
    },
}

#[derive(Subcommand, Debug)]
enum SnippetAction {
    /// Initialize a snippet folder.
    Init {
        /// The ID of the snippet.
        id: Option<String>,

        /// The snippet folder.
        path: Option<PathBuf>,

        /// Open the folder in $EDITOR.
        #[arg(short, long)]
        edit: bool,

        #[command(flatten)]
        api: ApiArgs,
    },

    /// Watch a snippet folder and push every change.
    Watch {
        /// The snippet folder.
        #[arg(default_value = ".")]
        path: PathBuf,

        /// The ID of the snippet (default: metadata, then folder name).
        #[arg(short = 's', long = "snippet-id")]
        snippet_id: Option<String>,

        #[command(flatten)]
        api: ApiArgs,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", style::error(&format!("Error: {:#}", e)));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { edit, api } => commands::init::run_aggregate_init(&api, edit).await,
        Commands::Watch { paths, preview, api } => {
            commands::watch::run_aggregate_watch(&api, &preview, paths).await
        }
        Commands::Template { action } => match action {
            TemplateAction::Init { id, path, edit, api } => {
                commands::init::run_init(&api, ResourceType::Template, id, path, edit).await
            }
            TemplateAction::Watch {
                path,
                template_id,
                preview,
                api,
            } => {
                commands::watch::run_watch(
                    &api,
                    &preview,
                    ResourceType::Template,
                    &path,
                    template_id.as_deref(),
                )
                .await
            }
        },
        Commands::Snippet { action } => match action {
            SnippetAction::Init { id, path, edit, api } => {
                commands::init::run_init(&api, ResourceType::Snippet, id, path, edit).await
            }
            SnippetAction::Watch {
                path,
                snippet_id,
                api,
            } => {
                commands::watch::run_watch(
                    &api,
                    &PreviewArgs::default(),
                    ResourceType::Snippet,
                    &path,
                    snippet_id.as_deref(),
                )
                .await
            }
        },
    }
}

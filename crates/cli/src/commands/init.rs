//! `init`: fetch a resource and lay out its files locally.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use pdfmonkey_core::prompt::{Prompted, Prompter};
use pdfmonkey_core::session::{init_resource, InitOutcome};
use pdfmonkey_core::ResourceType;

use super::{cancelled, ApiArgs};
use crate::prompt::DialoguerPrompter;
use crate::{launch, style};

/// Initialize one resource. Missing id and path are asked for.
pub async fn run_init(
    api: &ApiArgs,
    resource_type: ResourceType,
    id: Option<String>,
    path: Option<PathBuf>,
    edit: bool,
) -> Result<()> {
    let prompter = DialoguerPrompter;
    let client = api.client()?;

    let id = match id {
        Some(id) => id,
        None => match ask_id(&prompter, resource_type)? {
            Some(id) => id,
            None => {
                cancelled();
                return Ok(());
            }
        },
    };
    let path = match path {
        Some(path) => path,
        None => {
            let cwd = std::env::current_dir().context("failed to read the current directory")?;
            match ask_path(&prompter, resource_type, &cwd, &id)? {
                Some(path) => path,
                None => {
                    cancelled();
                    return Ok(());
                }
            }
        }
    };

    println!(
        "{}",
        style::header(&format!("Initializing {} {}", resource_type, style::highlight(&id)))
    );

    let snapshot = match init_resource(client.as_ref(), &prompter, resource_type, &id, &path).await? {
        InitOutcome::Initialized(snapshot) => snapshot,
        InitOutcome::Cancelled => {
            cancelled();
            return Ok(());
        }
    };

    println!(
        "{}",
        style::success(&format!(
            "Your {} {} has been initialized in {}",
            resource_type,
            style::highlight(snapshot.label()),
            style::highlight(&path.display().to_string())
        ))
    );

    if edit {
        match launch::open_editor(&path) {
            Ok(editor) => println!(
                "{}",
                style::info(&format!("Opening {} in {}", path.display(), style::highlight(&editor)))
            ),
            Err(e) => println!("{}", style::error(&format!("{:#}", e))),
        }
    }

    let has_key = std::env::var_os("PDFMONKEY_API_KEY").is_some();
    println!(
        "{}",
        style::info(&format!(
            "Watch your {} using: {}",
            resource_type,
            watch_command(&path, has_key)
        ))
    );
    Ok(())
}

/// Interactive loop initializing several resources.
pub async fn run_aggregate_init(api: &ApiArgs, edit: bool) -> Result<()> {
    let prompter = DialoguerPrompter;
    println!("{}", style::header("PDFMonkey Resources Initialization"));

    loop {
        let choice = prompter
            .select(
                "What type of resource do you want to initialize?",
                &["Template", "Snippet", "Exit"],
            )
            .context("failed to read resource type")?;
        let resource_type = match choice {
            Prompted::Answer(0) => ResourceType::Template,
            Prompted::Answer(1) => ResourceType::Snippet,
            _ => break,
        };

        run_init(api, resource_type, None, None, edit).await?;

        let again = prompter
            .select(
                "Do you want to initialize another resource?",
                &["Yes, initialize another resource", "No, I'm done"],
            )
            .context("failed to read answer")?;
        if again != Prompted::Answer(0) {
            break;
        }
    }

    println!("{}", style::success("Initialization completed!"));
    Ok(())
}

fn ask_id(prompter: &dyn Prompter, resource_type: ResourceType) -> Result<Option<String>> {
    let message = format!("ID of the {} to initialize", resource_type);
    Ok(prompter
        .text(&message, None)
        .context("failed to read resource id")?
        .answer())
}

fn ask_path(
    prompter: &dyn Prompter,
    resource_type: ResourceType,
    cwd: &Path,
    id: &str,
) -> Result<Option<PathBuf>> {
    let default_path = cwd.join(id);
    let default_label = default_path.display().to_string();
    let cwd_label = cwd.display().to_string();
    let message = format!("Where should the {} files be saved?", resource_type);

    let choice = prompter
        .select(&message, &[&default_label, &cwd_label, "A custom path"])
        .context("failed to read path choice")?;
    match choice {
        Prompted::Answer(0) => Ok(Some(default_path)),
        Prompted::Answer(1) => Ok(Some(cwd.to_path_buf())),
        Prompted::Answer(_) => Ok(prompter
            .text("Enter the custom path", Some(&default_label))
            .context("failed to read custom path")?
            .answer()
            .map(PathBuf::from)),
        Prompted::Cancelled => Ok(None),
    }
}

/// The command that starts watching an initialized directory.
pub fn watch_command(path: &Path, has_key: bool) -> String {
    let raw = path.display().to_string();
    let shown = if raw
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "/._-~".contains(c))
    {
        raw
    } else {
        pdfmonkey_core::conflict::diff::shell_quote(&raw)
    };

    let mut command = format!("pdfmonkey watch {}", shown);
    if !has_key {
        command.push_str(" -k YOUR_API_KEY");
    }
    command
}

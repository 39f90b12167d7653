//! `watch`: keep local resource directories synced with PDFMonkey.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use pdfmonkey_core::metadata;
use pdfmonkey_core::prompt::Prompter;
use pdfmonkey_core::session::{MultiSession, PreviewLauncher, SessionContext, StartOutcome};
use pdfmonkey_core::{CompositionMode, ResourceType, ResourceWatch, WatchPlan};
use pdfmonkey_web::{PreviewConfig, PreviewServer};

use super::{cancelled, diff_viewer, ApiArgs, PreviewArgs};
use crate::progress::SpinnerReporter;
use crate::prompt::DialoguerPrompter;
use crate::{launch, signals, style};

fn launcher(preview: &PreviewArgs) -> PreviewServer {
    PreviewServer::new(PreviewConfig {
        port: preview.port,
        livereload_port: preview.livereload_port,
    })
}

fn open_preview(address: Option<String>) {
    if let Some(address) = address {
        if let Err(e) = launch::open_browser(&address) {
            println!("{}", style::warn(&format!("{:#}", e)));
        }
    }
}

fn report_shutdown(failures: usize) {
    if failures > 0 {
        println!(
            "{}",
            style::warn(&format!("{} component(s) failed to shut down cleanly", failures))
        );
    }
    println!("{}", style::dim("Shutting down"));
}

/// Watch a single template or snippet until interrupted.
pub async fn run_watch(
    api: &ApiArgs,
    preview: &PreviewArgs,
    resource_type: ResourceType,
    path: &Path,
    id: Option<&str>,
) -> Result<()> {
    let client = api.client()?;
    let prompter = DialoguerPrompter;
    let diff = diff_viewer();
    let server = launcher(preview);
    let ctx = SessionContext {
        api: client,
        prompter: &prompter,
        diff_viewer: diff.as_ref(),
        reporter: Arc::new(SpinnerReporter::new()),
        launcher: Some(&server as &dyn PreviewLauncher),
        debug_preview: preview.debug,
    };

    println!(
        "{}",
        style::header(&format!(
            "Starting {} sync for {}",
            resource_type,
            style::highlight(&path.display().to_string())
        ))
    );

    let watch = match ResourceWatch::start(&ctx, resource_type, path, id, CompositionMode::Standalone)
        .await
        .with_context(|| format!("failed to start watching {}", path.display()))?
    {
        StartOutcome::Started(watch) => watch,
        StartOutcome::Aborted { .. } => {
            cancelled();
            return Ok(());
        }
    };

    if let Some(address) = watch.preview_address() {
        println!("{}", style::info(&format!("Preview available at {}", style::link(&address))));
        if preview.open_browser {
            open_preview(Some(address));
        }
    }
    println!(
        "{}",
        style::success(&format!(
            "Watching {} {} (Ctrl+C to stop)",
            resource_type,
            style::highlight(&watch.id)
        ))
    );

    signals::wait_for_shutdown().await;
    report_shutdown(watch.shutdown());
    Ok(())
}

/// Watch several resource directories, sharing one template preview.
pub async fn run_aggregate_watch(api: &ApiArgs, preview: &PreviewArgs, paths: Vec<PathBuf>) -> Result<()> {
    let prompter = DialoguerPrompter;
    println!("{}", style::header("PDFMonkey Watcher"));

    let paths = if paths.is_empty() {
        collect_paths(&prompter)?
    } else {
        paths
    };

    let plan = WatchPlan::from_paths(&paths);
    for (path, reason) in &plan.rejected {
        println!(
            "{}",
            style::error(&format!("Skipping {}: {}", style::highlight(&path.display().to_string()), reason))
        );
    }
    if plan.is_empty() {
        println!("{}", style::warn("No folders to watch"));
        return Ok(());
    }
    println!("{}", style::info(&format!("Watching {} folder(s)...", plan.len())));

    let client = api.client()?;
    let diff = diff_viewer();
    let server = launcher(preview);
    let ctx = SessionContext {
        api: client,
        prompter: &prompter,
        diff_viewer: diff.as_ref(),
        reporter: Arc::new(SpinnerReporter::new()),
        launcher: Some(&server as &dyn PreviewLauncher),
        debug_preview: preview.debug,
    };

    let session = MultiSession::start(&ctx, &plan).await;
    for (path, err) in &session.failed {
        println!(
            "{}",
            style::error(&format!("{}: {}", style::highlight(&path.display().to_string()), err))
        );
    }
    for path in &session.aborted {
        println!(
            "{}",
            style::warn(&format!("Not watching {}", style::highlight(&path.display().to_string())))
        );
    }
    if session.started.is_empty() {
        session.shutdown();
        bail!("none of the {} folder(s) could be watched", plan.len());
    }

    for watch in &session.started {
        println!(
            "{}",
            style::success(&format!(
                "Watching {} {} in {}",
                watch.resource_type,
                style::highlight(&watch.id),
                watch.dir.display()
            ))
        );
        if let Some(address) = watch.preview_address() {
            println!("{}", style::info(&format!("Preview available at {}", style::link(&address))));
            if preview.open_browser {
                open_preview(Some(address));
            }
        }
    }
    println!("{}", style::dim("Press Ctrl+C to stop"));

    signals::wait_for_shutdown().await;
    report_shutdown(session.shutdown());
    println!("{}", style::success("All watchers have been stopped"));
    Ok(())
}

/// Resource directories to watch when none were given on the command line.
///
/// The current directory when it is a resource, else the resources found
/// below it, else whatever the user types in.
fn collect_paths(prompter: &dyn Prompter) -> Result<Vec<PathBuf>> {
    let cwd = std::env::current_dir().context("failed to read the current directory")?;
    if metadata::is_resource(&cwd) {
        return Ok(vec![cwd]);
    }

    let found = metadata::discover_resources(&cwd);
    if !found.is_empty() {
        return Ok(found);
    }

    let mut paths = Vec::new();
    loop {
        let Some(path) = prompter
            .text("Path of a folder to watch", None)
            .context("failed to read path")?
            .answer()
        else {
            break;
        };
        paths.push(PathBuf::from(path));

        let more = prompter
            .confirm("Do you want to add another folder to watch?", false)
            .context("failed to read answer")?
            .answer();
        if more != Some(true) {
            break;
        }
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launcher_uses_flag_ports() {
        let preview = PreviewArgs {
            port: 3000,
            livereload_port: 3001,
            ..PreviewArgs::default()
        };
        assert_eq!(
            launcher(&preview).config,
            PreviewConfig {
                port: 3000,
                livereload_port: 3001
            }
        );
    }
}

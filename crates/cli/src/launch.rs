//! Opening the preview in a browser and working directories in an editor.

use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{bail, Context, Result};
use tracing::debug;

/// Open `url` with the platform's default handler.
pub fn open_browser(url: &str) -> Result<()> {
    let mut command = if cfg!(target_os = "macos") {
        let mut c = Command::new("open");
        c.arg(url);
        c
    } else if cfg!(target_os = "windows") {
        let mut c = Command::new("cmd");
        c.args(["/C", "start", "", url]);
        c
    } else {
        let mut c = Command::new("xdg-open");
        c.arg(url);
        c
    };

    debug!(%url, "opening browser");
    command
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("failed to open {} in a browser", url))?;
    Ok(())
}

/// Open `path` in `$EDITOR` without waiting for it.
pub fn open_editor(path: &Path) -> Result<String> {
    let editor = match std::env::var("EDITOR") {
        Ok(editor) if !editor.trim().is_empty() => editor,
        _ => bail!("no editor found, set the EDITOR environment variable to use this feature"),
    };

    let script = format!(
        "{} {}",
        editor,
        pdfmonkey_core::conflict::diff::shell_quote(&path.to_string_lossy())
    );
    debug!(%script, "opening editor");
    Command::new("sh")
        .arg("-c")
        .arg(&script)
        .spawn()
        .with_context(|| format!("failed to run editor '{}'", editor))?;
    Ok(editor)
}

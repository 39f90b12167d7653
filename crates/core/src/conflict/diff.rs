//! Showing the difference between local and remote content of a file.

use std::io::Write;
use std::path::Path;
use std::process::Command;

use tracing::debug;

use crate::errors::LocalFileError;
use crate::local;

/// Displays a line-level difference between a local file and remote content.
pub trait DiffViewer: Send + Sync {
    fn show(&self, dir: &Path, filename: &str, remote: &str) -> Result<(), String>;
}

/// Prefix of the temporary file holding remote content while diffing.
pub const REMOTE_COPY_PREFIX: &str = ".remote-";

// ---------------------------------------------------------------------------
// External viewer
// ---------------------------------------------------------------------------

/// Runs `$DIFF <local> <remote> | $PAGER` through the shell.
#[derive(Debug, Clone)]
pub struct ExternalDiffViewer {
    pub diff_command: String,
    pub pager: String,
}

impl ExternalDiffViewer {
    pub fn new(diff_command: impl Into<String>, pager: impl Into<String>) -> Self {
        Self {
            diff_command: diff_command.into(),
            pager: pager.into(),
        }
    }

    /// Build from `DIFF` (default `diff -u`) and `PAGER` (default `less`).
    pub fn from_env() -> Self {
        Self::new(
            std::env::var("DIFF").unwrap_or_else(|_| "diff -u".into()),
            std::env::var("PAGER").unwrap_or_else(|_| "less".into()),
        )
    }

    fn run(&self, local_path: &Path, remote_path: &Path) -> Result<(), String> {
        let script = format!(
            "{} {} {} | {}",
            self.diff_command,
            shell_quote(&local_path.to_string_lossy()),
            shell_quote(&remote_path.to_string_lossy()),
            self.pager
        );
        debug!(%script, "running external diff");

        Command::new("sh")
            .arg("-c")
            .arg(&script)
            .status()
            .map(|_| ())
            .map_err(|e| format!("failed to run '{}': {}", script, e))
    }
}

impl DiffViewer for ExternalDiffViewer {
    fn show(&self, dir: &Path, filename: &str, remote: &str) -> Result<(), String> {
        let remote_name = format!("{}{}", REMOTE_COPY_PREFIX, filename);
        let remote_path = dir.join(&remote_name);
        let local_path = dir.join(filename);

        local::write_local(dir, &remote_name, Some(remote)).map_err(|e| e.to_string())?;
        let result = self.run(&local_path, &remote_path);

        if let Err(e) = std::fs::remove_file(&remote_path) {
            let err = LocalFileError::new("remove", &remote_path, e);
            return result.and(Err(err.to_string()));
        }

        result
    }
}

/// Quote a value for `sh`.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

// ---------------------------------------------------------------------------
// Inline viewer
// ---------------------------------------------------------------------------

/// Prints a unified diff computed in-process.
pub struct InlineDiffViewer<W: Write + Send> {
    out: std::sync::Mutex<W>,
}

impl<W: Write + Send> InlineDiffViewer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: std::sync::Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(w) => w,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Unified diff from local content to remote content.
pub fn render_diff(filename: &str, local: &str, remote: &str) -> String {
    let patch = diffy::create_patch(local, remote);
    // diffy labels both sides "original"/"modified"; name them after the file.
    patch
        .to_string()
        .replacen("--- original", &format!("--- {} (local)", filename), 1)
        .replacen("+++ modified", &format!("+++ {} (remote)", filename), 1)
}

impl<W: Write + Send> DiffViewer for InlineDiffViewer<W> {
    fn show(&self, dir: &Path, filename: &str, remote: &str) -> Result<(), String> {
        let local = local::read_local(dir, filename)
            .map_err(|e| e.to_string())?
            .unwrap_or_default();
        let rendered = render_diff(filename, &local, remote);

        let mut out = self.out.lock().map_err(|_| "diff output poisoned".to_string())?;
        out.write_all(rendered.as_bytes()).map_err(|e| e.to_string())?;
        out.flush().map_err(|e| e.to_string())
    }
}

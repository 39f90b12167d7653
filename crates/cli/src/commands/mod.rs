//! Subcommand implementations and the options they share.

pub mod init;
pub mod watch;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use pdfmonkey_core::api::DEFAULT_API_URL;
use pdfmonkey_core::conflict::{DiffViewer, ExternalDiffViewer, InlineDiffViewer};
use pdfmonkey_core::PdfMonkeyClient;
use pdfmonkey_web::{DEFAULT_LIVERELOAD_PORT, DEFAULT_PORT};

/// Credential and endpoint of the PDFMonkey API.
#[derive(Args, Debug, Clone)]
pub struct ApiArgs {
    /// The API key to use.
    #[arg(short = 'k', long = "api-key", env = "PDFMONKEY_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Base URL of the PDFMonkey API.
    #[arg(long = "api-url", env = "PDFMONKEY_API_URL", default_value = DEFAULT_API_URL, hide = true)]
    pub api_url: String,
}

impl ApiArgs {
    pub fn client(&self) -> Result<Arc<PdfMonkeyClient>> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .context("missing API key: pass --api-key or set PDFMONKEY_API_KEY")?;
        let client = PdfMonkeyClient::new(self.api_url.as_str(), api_key)
            .context("failed to create the PDFMonkey API client")?;
        Ok(Arc::new(client))
    }
}

/// Live preview options of template watches.
#[derive(Args, Debug, Clone)]
pub struct PreviewArgs {
    /// Display an HTML debug preview instead of the PDF preview.
    #[arg(short = 'D', long)]
    pub debug: bool,

    /// Open the preview in the default browser.
    #[arg(short = 'o', long = "open-browser")]
    pub open_browser: bool,

    /// The port to run the preview server on.
    #[arg(short = 'p', long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// The port to run the live-reload server on.
    #[arg(short = 'l', long = "livereload-port", env = "LIVE_RELOAD_PORT", default_value_t = DEFAULT_LIVERELOAD_PORT)]
    pub livereload_port: u16,
}

impl Default for PreviewArgs {
    fn default() -> Self {
        Self {
            debug: false,
            open_browser: false,
            port: DEFAULT_PORT,
            livereload_port: DEFAULT_LIVERELOAD_PORT,
        }
    }
}

/// External `$DIFF | $PAGER` when `DIFF` is set, otherwise an inline diff.
pub fn diff_viewer() -> Box<dyn DiffViewer> {
    if std::env::var_os("DIFF").is_some() {
        Box::new(ExternalDiffViewer::from_env())
    } else {
        Box::new(InlineDiffViewer::new(std::io::stdout()))
    }
}

pub fn cancelled() {
    println!("{}", crate::style::warn("Operation canceled"));
}

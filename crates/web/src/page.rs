//! The preview page.
//!
//! Every request renders a small HTML document titled with the resource id
//! that frames the current preview URL and loads the live-reload client.
//! Both values are read from the [`PreviewSource`] at request time.

use std::sync::Arc;

use axum::extract::State;
use axum::response::Html;
use axum::Router;

use pdfmonkey_core::sync::PreviewSource;

/// Shared state of the page server.
pub struct PageState {
    pub source: Arc<dyn PreviewSource>,
    pub livereload_port: u16,
}

/// Any path serves the page.
pub fn routes() -> Router<Arc<PageState>> {
    Router::new().fallback(page)
}

async fn page(State(state): State<Arc<PageState>>) -> Html<String> {
    Html(render_page(
        &state.source.title(),
        state.source.preview_url().as_deref(),
        state.livereload_port,
    ))
}

pub fn render_page(title: &str, preview_url: Option<&str>, livereload_port: u16) -> String {
    let content = match preview_url {
        Some(url) => format!(
            r#"<iframe src="{}" width="100%" height="100%" style="border: none;"></iframe>"#,
            escape_html(url)
        ),
        None => "<p style=\"font-family: sans-serif; padding: 1rem;\">No preview available yet.</p>".to_string(),
    };

    format!(
        r#"<!DOCTYPE html>
<html>
  <head>
    <meta charset="utf-8">
    <title>{title}</title>
    <script src="http://localhost:{livereload_port}/livereload.js"></script>
  </head>
  <body style="margin: 0; padding: 0; height: 100dvh; width: 100dvw;">
    {content}
  </body>
</html>
"#,
        title = escape_html(title),
    )
}

/// Escape text for use in HTML content and double-quoted attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

//! Shared styling utilities for terminal output.

use console::Style;

/// Create a success-styled string (green with checkmark).
pub fn success(msg: &str) -> String {
    let style = Style::new().green();
    format!("{} {}", style.apply_to("✓"), msg)
}

/// Create an error-styled string (red with cross).
pub fn error(msg: &str) -> String {
    let style = Style::new().red();
    format!("{} {}", style.apply_to("✗"), msg)
}

/// Create a warning-styled string (yellow).
pub fn warn(msg: &str) -> String {
    let style = Style::new().yellow();
    format!("{} {}", style.apply_to("⚠"), msg)
}

/// Create an info-styled string (blue dot).
pub fn info(msg: &str) -> String {
    let style = Style::new().blue();
    format!("{} {}", style.apply_to("●"), msg)
}

/// Create a header-styled string (bold, cyan).
pub fn header(msg: &str) -> String {
    let style = Style::new().cyan().bold();
    style.apply_to(msg).to_string()
}

/// Create a dim-styled string.
pub fn dim(msg: &str) -> String {
    let style = Style::new().dim();
    style.apply_to(msg).to_string()
}

/// Highlight a value such as a path or an id (yellow).
pub fn highlight(value: &str) -> String {
    let style = Style::new().yellow();
    style.apply_to(value).to_string()
}

/// Underlined link.
pub fn link(url: &str) -> String {
    let style = Style::new().underlined();
    style.apply_to(url).to_string()
}

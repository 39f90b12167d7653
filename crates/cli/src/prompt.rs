//! Terminal prompts backed by `dialoguer`.

use dialoguer::{Confirm, Input, Select};

use pdfmonkey_core::errors::PromptError;
use pdfmonkey_core::prompt::{Prompted, Prompter};

/// Interactive prompter. Escape cancels selects and confirmations.
#[derive(Debug, Default, Clone, Copy)]
pub struct DialoguerPrompter;

fn prompt_error(e: dialoguer::Error) -> PromptError {
    let dialoguer::Error::IO(e) = e;
    PromptError::Io(e)
}

fn prompted<T>(value: Option<T>) -> Prompted<T> {
    match value {
        Some(value) => Prompted::Answer(value),
        None => Prompted::Cancelled,
    }
}

impl Prompter for DialoguerPrompter {
    fn select(&self, message: &str, options: &[&str]) -> Result<Prompted<usize>, PromptError> {
        Select::new()
            .with_prompt(message)
            .items(options)
            .default(0)
            .interact_opt()
            .map(prompted)
            .map_err(prompt_error)
    }

    fn confirm(&self, message: &str, default: bool) -> Result<Prompted<bool>, PromptError> {
        Confirm::new()
            .with_prompt(message)
            .default(default)
            .interact_opt()
            .map(prompted)
            .map_err(prompt_error)
    }

    fn text(&self, message: &str, placeholder: Option<&str>) -> Result<Prompted<String>, PromptError> {
        let mut input = Input::<String>::new().with_prompt(message);
        if let Some(placeholder) = placeholder {
            input = input.default(placeholder.to_string());
        }
        let value = input.interact_text().map_err(prompt_error)?;
        let value = value.trim().to_string();
        if value.is_empty() {
            return Ok(Prompted::Cancelled);
        }
        Ok(Prompted::Answer(value))
    }
}

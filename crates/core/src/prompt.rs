//! The interactive prompt capability.
//!
//! Core logic never talks to a terminal directly. It asks a [`Prompter`],
//! which the binary backs with `dialoguer` and tests back with a script.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::errors::PromptError;

/// Answer to a prompt: either a value or a user cancellation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompted<T> {
    Answer(T),
    Cancelled,
}

impl<T> Prompted<T> {
    pub fn answer(self) -> Option<T> {
        match self {
            Self::Answer(value) => Some(value),
            Self::Cancelled => None,
        }
    }
}

/// Interactive select / confirm / text prompts.
pub trait Prompter: Send + Sync {
    /// Pick one of `options`, returning its index.
    fn select(&self, message: &str, options: &[&str]) -> Result<Prompted<usize>, PromptError>;

    /// Ask a yes/no question.
    fn confirm(&self, message: &str, default: bool) -> Result<Prompted<bool>, PromptError>;

    /// Ask for free text.
    fn text(&self, message: &str, placeholder: Option<&str>) -> Result<Prompted<String>, PromptError>;
}

/// One pre-recorded answer for a [`ScriptedPrompter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedAnswer {
    Select(usize),
    Confirm(bool),
    Text(String),
    Cancel,
}

/// A prompter that replays a fixed list of answers and records every question.
///
/// Used by tests and by non-interactive runs. Running out of answers is
/// treated as a cancellation.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<ScriptedAnswer>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new(answers: impl IntoIterator<Item = ScriptedAnswer>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    /// Messages of every prompt shown so far.
    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().map(|a| a.clone()).unwrap_or_default()
    }

    /// Number of answers not consumed yet.
    pub fn remaining(&self) -> usize {
        self.answers.lock().map(|a| a.len()).unwrap_or_default()
    }

    fn next(&self, message: &str) -> Result<Option<ScriptedAnswer>, PromptError> {
        self.asked
            .lock()
            .map_err(|_| PromptError::Other("prompt log poisoned".into()))?
            .push(message.to_string());
        Ok(self
            .answers
            .lock()
            .map_err(|_| PromptError::Other("prompt script poisoned".into()))?
            .pop_front())
    }

    fn mismatch(message: &str, answer: &ScriptedAnswer) -> PromptError {
        PromptError::Other(format!("unexpected scripted answer {:?} for '{}'", answer, message))
    }
}

impl Prompter for ScriptedPrompter {
    fn select(&self, message: &str, options: &[&str]) -> Result<Prompted<usize>, PromptError> {
        match self.next(message)? {
            Some(ScriptedAnswer::Select(i)) if i < options.len() => Ok(Prompted::Answer(i)),
            Some(ScriptedAnswer::Cancel) | None => Ok(Prompted::Cancelled),
            Some(other) => Err(Self::mismatch(message, &other)),
        }
    }

    fn confirm(&self, message: &str, _default: bool) -> Result<Prompted<bool>, PromptError> {
        match self.next(message)? {
            Some(ScriptedAnswer::Confirm(b)) => Ok(Prompted::Answer(b)),
            Some(ScriptedAnswer::Cancel) | None => Ok(Prompted::Cancelled),
            Some(other) => Err(Self::mismatch(message, &other)),
        }
    }

    fn text(&self, message: &str, _placeholder: Option<&str>) -> Result<Prompted<String>, PromptError> {
        match self.next(message)? {
            Some(ScriptedAnswer::Text(t)) => Ok(Prompted::Answer(t)),
            Some(ScriptedAnswer::Cancel) | None => Ok(Prompted::Cancelled),
            Some(other) => Err(Self::mismatch(message, &other)),
        }
    }
}

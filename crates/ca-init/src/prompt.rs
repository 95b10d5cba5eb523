//! Operator interaction.
//!
//! The bootstrap flow only talks to a [`Prompter`]. [`TerminalPrompter`]
//! renders prompts with dialoguer on the terminal; [`ScriptedPrompter`]
//! replays canned answers so the flow can run without one.

use std::collections::VecDeque;
use std::io::{self, Write};

use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Password, Select};
use tracing::warn;
use zeroize::Zeroizing;

use crate::error::InitError;
use crate::validators::Validator;

/// A free-text question.
#[derive(Debug, Clone, Copy)]
pub struct TextPrompt<'a> {
    /// Question shown above the input line.
    pub question: &'a str,
    /// Example shown on the input line.
    pub hint: &'a str,
    /// Value used when the operator just presses enter.
    pub default: Option<&'a str>,
}

/// Prompt provider used by the bootstrap flow.
///
/// Invalid answers never reach the caller: implementations ask again until
/// the validator accepts the answer or the operator aborts.
pub trait Prompter {
    /// Prints a complete line of progress or guidance.
    fn say(&mut self, line: &str) -> Result<(), InitError>;

    /// Prints text without ending the line.
    fn print(&mut self, text: &str) -> Result<(), InitError>;

    /// Asks for free text accepted by `validate`.
    fn ask_text(&mut self, prompt: &TextPrompt<'_>, validate: Validator) -> Result<String, InitError>;

    /// Asks a yes/no question.
    fn ask_yes_no(&mut self, question: &str) -> Result<bool, InitError>;

    /// Asks for one of `items` and returns its index.
    fn ask_select(&mut self, question: &str, items: &[&str]) -> Result<usize, InitError>;

    /// Asks for a password without echoing it. May return an empty string.
    fn ask_password(&mut self, hint: &str) -> Result<Zeroizing<String>, InitError>;
}

/// Uses a flag value when it is set and valid, otherwise asks.
///
/// An invalid flag value is offered as the default answer so the operator
/// can correct it.
///
/// # Errors
///
/// Returns an error if the prompt fails.
pub fn flag_or_ask(
    prompter: &mut dyn Prompter,
    question: &str,
    hint: &str,
    flag: Option<&str>,
    validate: Validator,
) -> Result<String, InitError> {
    let flag = flag.filter(|v| !v.is_empty());
    if let Some(value) = flag {
        match validate(value) {
            Ok(()) => return Ok(value.to_string()),
            Err(reason) => warn!("ignoring flag value: {}", reason),
        }
    }
    prompter.ask_text(
        &TextPrompt {
            question,
            hint,
            default: flag,
        },
        validate,
    )
}

fn prompt_error(err: &dialoguer::Error) -> InitError {
    InitError::Prompt(err.to_string())
}

fn terminal_error(err: &io::Error) -> InitError {
    InitError::Prompt(err.to_string())
}

/// Interactive prompter writing to the terminal's stderr.
///
/// Standard output stays free for the helm template.
pub struct TerminalPrompter {
    theme: ColorfulTheme,
}

impl TerminalPrompter {
    /// Creates a prompter with the colorful theme.
    #[must_use]
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

impl Default for TerminalPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TerminalPrompter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalPrompter").finish_non_exhaustive()
    }
}

impl Prompter for TerminalPrompter {
    fn say(&mut self, line: &str) -> Result<(), InitError> {
        writeln!(io::stderr(), "{line}").map_err(|e| terminal_error(&e))
    }

    fn print(&mut self, text: &str) -> Result<(), InitError> {
        let mut stderr = io::stderr();
        write!(stderr, "{text}")
            .and_then(|()| stderr.flush())
            .map_err(|e| terminal_error(&e))
    }

    fn ask_text(&mut self, prompt: &TextPrompt<'_>, validate: Validator) -> Result<String, InitError> {
        self.say(prompt.question)?;
        let mut input = Input::<String>::with_theme(&self.theme)
            .with_prompt(prompt.hint)
            .allow_empty(true)
            .validate_with(move |value: &String| validate(value));
        if let Some(default) = prompt.default {
            input = input.with_initial_text(default);
        }
        input
            .interact_text()
            .map(|value| value.trim().to_string())
            .map_err(|e| prompt_error(&e))
    }

    fn ask_yes_no(&mut self, question: &str) -> Result<bool, InitError> {
        Confirm::with_theme(&self.theme)
            .with_prompt(question)
            .interact()
            .map_err(|e| prompt_error(&e))
    }

    fn ask_select(&mut self, question: &str, items: &[&str]) -> Result<usize, InitError> {
        Select::with_theme(&self.theme)
            .with_prompt(question)
            .items(items)
            .default(0)
            .interact()
            .map_err(|e| prompt_error(&e))
    }

    fn ask_password(&mut self, hint: &str) -> Result<Zeroizing<String>, InitError> {
        Password::with_theme(&self.theme)
            .with_prompt(hint)
            .allow_empty_password(true)
            .interact()
            .map(Zeroizing::new)
            .map_err(|e| prompt_error(&e))
    }
}

/// A canned answer for [`ScriptedPrompter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    /// Free text; an empty answer takes the prompt's default.
    Text(String),
    /// Yes/no.
    YesNo(bool),
    /// Index into the offered items.
    Select(usize),
    /// Password, possibly empty.
    Password(String),
}

impl Answer {
    /// Shorthand for [`Answer::Text`].
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }
}

/// Non-interactive prompter replaying answers in order.
///
/// Text answers rejected by the validator are recorded and the next answer
/// is used, the same way an operator would be asked again.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<Answer>,
    output: String,
    questions: Vec<String>,
    rejected: Vec<(String, String)>,
}

impl ScriptedPrompter {
    /// Creates a prompter that replays `answers`.
    pub fn new(answers: impl IntoIterator<Item = Answer>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Everything printed with [`Prompter::say`] and [`Prompter::print`].
    #[must_use]
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Questions asked, in order.
    #[must_use]
    pub fn questions(&self) -> &[String] {
        &self.questions
    }

    /// Rejected answers with the validator's reason.
    #[must_use]
    pub fn rejected(&self) -> &[(String, String)] {
        &self.rejected
    }

    /// Answers that were never asked for.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.answers.len()
    }

    fn next(&mut self, question: &str) -> Result<Answer, InitError> {
        self.questions.push(question.to_string());
        self.answers
            .pop_front()
            .ok_or_else(|| InitError::Prompt(format!("no answer scripted for: {question}")))
    }
}

fn unexpected(question: &str, answer: &Answer) -> InitError {
    InitError::Prompt(format!("scripted answer {answer:?} does not fit: {question}"))
}

impl Prompter for ScriptedPrompter {
    fn say(&mut self, line: &str) -> Result<(), InitError> {
        self.output.push_str(line);
        self.output.push('\n');
        Ok(())
    }

    fn print(&mut self, text: &str) -> Result<(), InitError> {
        self.output.push_str(text);
        Ok(())
    }

    fn ask_text(&mut self, prompt: &TextPrompt<'_>, validate: Validator) -> Result<String, InitError> {
        loop {
            let answer = match self.next(prompt.question)? {
                Answer::Text(text) if text.is_empty() => prompt.default.unwrap_or_default().to_string(),
                Answer::Text(text) => text,
                other => return Err(unexpected(prompt.question, &other)),
            };
            match validate(&answer) {
                Ok(()) => return Ok(answer),
                Err(reason) => self.rejected.push((answer, reason)),
            }
        }
    }

    fn ask_yes_no(&mut self, question: &str) -> Result<bool, InitError> {
        match self.next(question)? {
            Answer::YesNo(yes) => Ok(yes),
            other => Err(unexpected(question, &other)),
        }
    }

    fn ask_select(&mut self, question: &str, items: &[&str]) -> Result<usize, InitError> {
        match self.next(question)? {
            Answer::Select(index) if index < items.len() => Ok(index),
            other => Err(unexpected(question, &other)),
        }
    }

    fn ask_password(&mut self, hint: &str) -> Result<Zeroizing<String>, InitError> {
        match self.next(hint)? {
            Answer::Password(password) => Ok(Zeroizing::new(password)),
            other => Err(unexpected(hint, &other)),
        }
    }
}

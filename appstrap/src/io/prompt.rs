//! Interactive answer sources for configuration resolution.

use dialoguer::{Confirm, Input, Password, Select};

use crate::core::config::{ConfigKey, ConfigValue};
use crate::error::ConfigError;

/// What kind of answer a question expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionKind {
    Choice(Vec<String>),
    Text,
    Secret,
    Confirm,
}

/// One interactive question for a configuration key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub key: ConfigKey,
    pub prompt: String,
    pub kind: QuestionKind,
    pub default: Option<ConfigValue>,
}

/// Source of answers for keys the configuration document did not set.
pub trait AnswerSource {
    /// Return `Ok(None)` to decline; the default value then stays in place.
    fn ask(&mut self, question: &Question) -> Result<Option<ConfigValue>, ConfigError>;
}

/// Declines every question (`--no-interaction`).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoInteraction;

impl AnswerSource for NoInteraction {
    fn ask(&mut self, _question: &Question) -> Result<Option<ConfigValue>, ConfigError> {
        Ok(None)
    }
}

/// Terminal prompts rendered by `dialoguer`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

impl AnswerSource for TerminalPrompter {
    fn ask(&mut self, question: &Question) -> Result<Option<ConfigValue>, ConfigError> {
        let prompt_err = |err: dialoguer::Error| ConfigError::Prompt {
            key: question.key.as_str().to_string(),
            message: err.to_string(),
        };
        let default_text = question.default.as_ref().map(text_of);

        let value = match &question.kind {
            QuestionKind::Choice(options) => {
                let default_index = default_text
                    .as_deref()
                    .and_then(|d| options.iter().position(|o| o == d))
                    .unwrap_or(0);
                let index = Select::new()
                    .with_prompt(&question.prompt)
                    .items(options.as_slice())
                    .default(default_index)
                    .interact()
                    .map_err(prompt_err)?;
                ConfigValue::Text(options[index].clone())
            }
            QuestionKind::Text => {
                let mut input = Input::<String>::new()
                    .with_prompt(&question.prompt)
                    .allow_empty(true);
                if let Some(default) = default_text {
                    input = input.default(default);
                }
                ConfigValue::Text(input.interact_text().map_err(prompt_err)?)
            }
            QuestionKind::Secret => ConfigValue::Text(
                Password::new()
                    .with_prompt(&question.prompt)
                    .allow_empty_password(true)
                    .interact()
                    .map_err(prompt_err)?,
            ),
            QuestionKind::Confirm => {
                let default = matches!(question.default, Some(ConfigValue::Bool(true)));
                ConfigValue::Bool(
                    Confirm::new()
                        .with_prompt(&question.prompt)
                        .default(default)
                        .interact()
                        .map_err(prompt_err)?,
                )
            }
        };
        Ok(Some(value))
    }
}

fn text_of(value: &ConfigValue) -> String {
    match value {
        ConfigValue::Bool(flag) => flag.to_string(),
        ConfigValue::Text(text) => text.clone(),
    }
}

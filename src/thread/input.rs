//! Turn input and its normalization into a prompt plus image paths.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One segment of user input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UserInput {
    /// Text appended to the prompt.
    Text { text: String },
    /// Image on the local filesystem, passed with `--image`.
    LocalImage { path: PathBuf },
}

impl UserInput {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    #[must_use]
    pub fn local_image(path: impl Into<PathBuf>) -> Self {
        Self::LocalImage { path: path.into() }
    }
}

/// Input for a single turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// A plain prompt.
    Text(String),
    /// Text and image segments, in order.
    Parts(Vec<UserInput>),
}

/// Prompt text and image paths derived from an [`Input`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedInput {
    pub prompt: String,
    pub images: Vec<PathBuf>,
}

impl Input {
    /// Split the input into the prompt written to stdin and the images passed
    /// as arguments. Text segments are joined with a blank line.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if an image segment has an empty path.
    pub fn normalize(&self) -> Result<NormalizedInput> {
        let parts = match self {
            Self::Text(prompt) => {
                return Ok(NormalizedInput {
                    prompt: prompt.clone(),
                    images: Vec::new(),
                })
            }
            Self::Parts(parts) => parts,
        };

        let mut texts = Vec::new();
        let mut images = Vec::new();
        for (idx, part) in parts.iter().enumerate() {
            match part {
                UserInput::Text { text } => texts.push(text.as_str()),
                UserInput::LocalImage { path } if path.as_os_str().is_empty() => {
                    return Err(Error::invalid_input(
                        "image path",
                        "",
                        format!("input part {idx}: local image path must be set"),
                    ));
                }
                UserInput::LocalImage { path } => images.push(path.clone()),
            }
        }

        Ok(NormalizedInput {
            prompt: texts.join("\n\n"),
            images,
        })
    }
}

impl From<&str> for Input {
    fn from(prompt: &str) -> Self {
        Self::Text(prompt.to_string())
    }
}

impl From<String> for Input {
    fn from(prompt: String) -> Self {
        Self::Text(prompt)
    }
}

impl From<Vec<UserInput>> for Input {
    fn from(parts: Vec<UserInput>) -> Self {
        Self::Parts(parts)
    }
}

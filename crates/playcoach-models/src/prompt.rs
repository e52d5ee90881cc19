//! Prompt parameters.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Parameters for one analysis prompt.
///
/// Construction validates the game name, so a `PromptSpec` always holds a
/// non-empty game. A blank focus area is treated as no focus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptSpec {
    game_name: String,
    focus_on: Option<String>,
}

impl PromptSpec {
    pub fn new(game_name: impl Into<String>, focus_on: Option<String>) -> ModelResult<Self> {
        let game_name = game_name.into().trim().to_string();
        if game_name.is_empty() {
            return Err(ModelError::invalid_prompt("game name must not be empty"));
        }

        let focus_on = focus_on
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty());

        Ok(Self { game_name, focus_on })
    }

    pub fn game_name(&self) -> &str {
        &self.game_name
    }

    pub fn focus_on(&self) -> Option<&str> {
        self.focus_on.as_deref()
    }
}

//! Flashcard set update builder.

use serde::{Deserialize, Serialize};

use super::double_option;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlashcardSetUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
}

pub struct FlashcardSetUpdateBuilder(FlashcardSetUpdate);

impl FlashcardSetUpdateBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self(FlashcardSetUpdate::default())
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.0.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: Option<String>) -> Self {
        self.0.description = Some(description);
        self
    }

    #[must_use]
    pub fn build(self) -> FlashcardSetUpdate {
        self.0
    }
}

impl Default for FlashcardSetUpdateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

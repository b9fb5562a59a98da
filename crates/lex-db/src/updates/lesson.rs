//! Lesson update builder.

use serde::{Deserialize, Serialize};

use super::double_option;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LessonUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub content: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub video_url: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
}

pub struct LessonUpdateBuilder(LessonUpdate);

impl LessonUpdateBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self(LessonUpdate::default())
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.0.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn content(mut self, content: Option<String>) -> Self {
        self.0.content = Some(content);
        self
    }

    #[must_use]
    pub fn video_url(mut self, url: Option<String>) -> Self {
        self.0.video_url = Some(url);
        self
    }

    #[must_use]
    pub const fn position(mut self, position: i64) -> Self {
        self.0.position = Some(position);
        self
    }

    #[must_use]
    pub fn build(self) -> LessonUpdate {
        self.0
    }
}

impl Default for LessonUpdateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

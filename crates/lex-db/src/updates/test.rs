//! Test metadata update builder. Questions are added, never edited in place.

use serde::{Deserialize, Serialize};

use super::double_option;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<i64>,
}

pub struct TestUpdateBuilder(TestUpdate);

impl TestUpdateBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self(TestUpdate::default())
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
    pub const fn duration_minutes(mut self, minutes: i64) -> Self {
        self.0.duration_minutes = Some(minutes);
        self
    }

    #[must_use]
    pub fn build(self) -> TestUpdate {
        self.0
    }
}

impl Default for TestUpdateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

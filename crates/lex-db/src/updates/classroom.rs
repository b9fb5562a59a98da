//! Classroom update builder.

use serde::{Deserialize, Serialize};

use super::double_option;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassroomUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub thumbnail_url: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<i64>,
}

pub struct ClassroomUpdateBuilder(ClassroomUpdate);

impl ClassroomUpdateBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self(ClassroomUpdate::default())
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.0.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: Option<String>) -> Self {
        self.0.description = Some(description);
        self
    }

    #[must_use]
    pub fn thumbnail_url(mut self, url: Option<String>) -> Self {
        self.0.thumbnail_url = Some(url);
        self
    }

    #[must_use]
    pub const fn price(mut self, price: i64) -> Self {
        self.0.price = Some(price);
        self
    }

    #[must_use]
    pub fn build(self) -> ClassroomUpdate {
        self.0
    }
}

impl Default for ClassroomUpdateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

//! Account profile update builder.

use serde::{Deserialize, Serialize};

use super::double_option;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub phone: Option<Option<String>>,
}

pub struct AccountUpdateBuilder(AccountUpdate);

impl AccountUpdateBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self(AccountUpdate::default())
    }

    #[must_use]
    pub fn full_name(mut self, full_name: impl Into<String>) -> Self {
        self.0.full_name = Some(full_name.into());
        self
    }

    #[must_use]
    pub fn phone(mut self, phone: Option<String>) -> Self {
        self.0.phone = Some(phone);
        self
    }

    #[must_use]
    pub fn build(self) -> AccountUpdate {
        self.0
    }
}

impl Default for AccountUpdateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A named batch of flashcards owned by one account.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct FlashcardSet {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Flashcard {
    pub id: String,
    pub set_id: String,
    pub front: String,
    pub back: String,
    pub example: Option<String>,
    pub position: i64,
}

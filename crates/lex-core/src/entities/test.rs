use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::TestKind;

/// A test (TOEIC mock, practice set, or classroom quiz).
///
/// `total_questions` always equals the number of questions stored for it.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Test {
    pub id: String,
    pub creator_id: String,
    pub title: String,
    pub description: Option<String>,
    pub kind: TestKind,
    pub duration_minutes: i64,
    pub total_questions: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Question {
    pub id: String,
    pub test_id: String,
    pub content: String,
    /// TOEIC part (1-7) when the test follows the TOEIC layout.
    pub part: Option<i64>,
    pub audio_url: Option<String>,
    pub image_url: Option<String>,
    pub explanation: Option<String>,
    pub position: i64,
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Choice {
    pub id: String,
    pub question_id: String,
    pub label: String,
    pub content: String,
    /// `None` when the choice is shown to a student taking the test.
    pub is_correct: Option<bool>,
}

//! Creation payloads accepted by repo methods.
//!
//! These deserialize straight from request bodies. Validation happens in the
//! repo method that consumes them.

use serde::Deserialize;

use lex_core::enums::{ReportTarget, TestKind};

#[derive(Debug, Clone, Deserialize)]
pub struct NewClassroom {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    /// VND; 0 means free.
    #[serde(default)]
    pub price: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewLesson {
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    /// Appended after the last lesson when omitted.
    #[serde(default)]
    pub position: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewChoice {
    pub label: String,
    pub content: String,
    #[serde(default)]
    pub is_correct: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewQuestion {
    pub content: String,
    #[serde(default)]
    pub part: Option<i64>,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub explanation: Option<String>,
    pub choices: Vec<NewChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub kind: TestKind,
    pub duration_minutes: i64,
    pub questions: Vec<NewQuestion>,
}

/// One answer in a submission. `choice_id: None` leaves the question blank.
#[derive(Debug, Clone, Deserialize)]
pub struct AnswerInput {
    pub question_id: String,
    #[serde(default)]
    pub choice_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewFlashcard {
    pub front: String,
    pub back: String,
    #[serde(default)]
    pub example: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewFlashcardSet {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cards: Vec<NewFlashcard>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewBankAccount {
    pub bank_name: String,
    pub account_number: String,
    pub holder_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewReport {
    pub target: ReportTarget,
    pub target_id: String,
    pub reason: String,
}

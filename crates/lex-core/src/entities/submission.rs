use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::SubmissionStatus;

/// One student's attempt at a test.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Submission {
    pub id: String,
    pub test_id: String,
    pub student_id: String,
    pub status: SubmissionStatus,
    pub correct_count: i64,
    pub total_questions: i64,
    /// Percentage of correct answers, two decimals. Zero until submitted.
    pub score: f64,
    pub started_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Answer {
    pub id: String,
    pub submission_id: String,
    pub question_id: String,
    pub choice_id: Option<String>,
    pub is_correct: bool,
}

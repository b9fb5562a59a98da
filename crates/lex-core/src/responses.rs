//! Response shapes returned as JSON by the HTTP API.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::entities::{
    Account, Answer, ChatSession, Flashcard, FlashcardSet, Message, Question, Submission, Test,
};

/// Access/refresh token pair returned by login, register, and refresh.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

/// Login/register response.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct AuthResponse {
    pub account: Account,
    pub tokens: TokenPair,
}

/// One page of a paginated listing.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
}

/// A test with its questions and choices.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct TestDetail {
    pub test: Test,
    pub questions: Vec<Question>,
}

/// A submission with its graded answers.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct SubmissionDetail {
    pub submission: Submission,
    pub answers: Vec<Answer>,
}

/// Best score per student for one test.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct LeaderboardEntry {
    pub student_id: String,
    pub full_name: String,
    pub best_score: f64,
    pub attempts: i64,
}

/// A flashcard set with its cards.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct FlashcardSetDetail {
    pub set: FlashcardSet,
    pub cards: Vec<Flashcard>,
}

/// Platform-wide numbers for admins.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct AdminOverview {
    pub admins: i64,
    pub teachers: i64,
    pub students: i64,
    pub classrooms: i64,
    pub tests: i64,
    pub submissions: i64,
    pub pending_reports: i64,
    /// Sum of successful payments.
    pub revenue: i64,
}

/// Numbers for one teacher's classrooms.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct TeacherOverview {
    pub classrooms: i64,
    pub students: i64,
    pub tests: i64,
    pub revenue: i64,
    pub average_rating: f64,
}

/// Numbers for one student's practice.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct StudentOverview {
    pub classrooms: i64,
    pub submissions: i64,
    pub average_score: f64,
    pub best_score: f64,
    pub flashcard_sets: i64,
}

/// A chat session with its messages.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ChatSessionDetail {
    pub session: ChatSession,
    pub messages: Vec<Message>,
}

/// Reply from the tutor.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ChatReply {
    pub user_message: Message,
    pub assistant_message: Message,
    /// Knowledge sources whose chunks were placed in the prompt.
    pub sources: Vec<String>,
}

/// One ingested knowledge document.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct KnowledgeSourceSummary {
    pub source: String,
    pub chunks: i64,
}

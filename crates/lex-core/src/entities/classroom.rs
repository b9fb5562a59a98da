use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A teacher-owned classroom.
///
/// `average_rating` and `rating_count` are derived from `classroom_ratings`
/// and rewritten on every rating change.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Classroom {
    pub id: String,
    pub teacher_id: String,
    pub name: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    /// Price in VND. Zero means free to join.
    pub price: i64,
    pub average_rating: f64,
    pub rating_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Classroom {
    #[must_use]
    pub const fn is_free(&self) -> bool {
        self.price == 0
    }
}

/// Membership of a student in a classroom.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ClassroomStudent {
    pub classroom_id: String,
    pub student_id: String,
    pub joined_at: DateTime<Utc>,
}

/// One student's rating of a classroom (at most one per pair).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ClassroomRating {
    pub id: String,
    pub classroom_id: String,
    pub student_id: String,
    pub rating: i64,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//! Classroom ratings and the aggregate kept on the classroom row.
//!
//! `classrooms.average_rating` and `classrooms.rating_count` are always
//! recomputed from `classroom_ratings` inside the same transaction as the
//! rating change.

use chrono::Utc;

use lex_core::entities::{Classroom, ClassroomRating};
use lex_core::ids::PREFIX_RATING;
use lex_core::responses::Page;

use crate::error::DatabaseError;
use crate::helpers::{collect_rows, format_datetime, get_opt_string, parse_datetime};
use crate::paging::Paging;
use crate::service::LexService;

const SELECT_COLS: &str =
    "id, classroom_id, student_id, rating, comment, created_at, updated_at";

fn row_to_rating(row: &libsql::Row) -> Result<ClassroomRating, DatabaseError> {
    Ok(ClassroomRating {
        id: row.get(0)?,
        classroom_id: row.get(1)?,
        student_id: row.get(2)?,
        rating: row.get(3)?,
        comment: get_opt_string(row, 4)?,
        created_at: parse_datetime(&row.get::<String>(5)?)?,
        updated_at: parse_datetime(&row.get::<String>(6)?)?,
    })
}

impl LexService {
    /// Create or replace `student_id`'s rating of a classroom and refresh the aggregate.
    ///
    /// The student must be enrolled. Returns the stored rating and the
    /// classroom with its new average.
    pub async fn rate_classroom(
        &self,
        student_id: &str,
        classroom_id: &str,
        rating: i64,
        comment: Option<&str>,
    ) -> Result<(ClassroomRating, Classroom), DatabaseError> {
        if !(1..=5).contains(&rating) {
            return Err(DatabaseError::validation("rating must be between 1 and 5"));
        }
        self.get_classroom(classroom_id).await?;
        if !self.is_enrolled(classroom_id, student_id).await? {
            return Err(DatabaseError::forbidden(
                "only enrolled students can rate a classroom",
            ));
        }

        let tx = self.begin_write().await?;
        let result = self
            .upsert_rating(student_id, classroom_id, rating, comment)
            .await;
        let stored = tx.finish(result).await?;

        let classroom = self.get_classroom(classroom_id).await?;
        tracing::info!(
            classroom_id,
            student_id,
            rating,
            average = classroom.average_rating,
            "classroom rated"
        );
        Ok((stored, classroom))
    }

    /// Remove the student's rating and refresh the aggregate.
    pub async fn delete_rating(
        &self,
        student_id: &str,
        classroom_id: &str,
    ) -> Result<Classroom, DatabaseError> {
        let tx = self.begin_write().await?;
        let result = async {
            let removed = self
                .conn()
                .execute(
                    "DELETE FROM classroom_ratings WHERE classroom_id = ?1 AND student_id = ?2",
                    [classroom_id, student_id],
                )
                .await?;
            if removed == 0 {
                return Err(DatabaseError::not_found("rating", classroom_id));
            }
            self.recompute_rating(classroom_id).await
        }
        .await;
        tx.finish(result).await?;
        self.get_classroom(classroom_id).await
    }

    pub async fn list_ratings(
        &self,
        classroom_id: &str,
        paging: Paging,
    ) -> Result<Page<ClassroomRating>, DatabaseError> {
        let total = self
            .query_count(
                "SELECT COUNT(*) FROM classroom_ratings WHERE classroom_id = ?1",
                [classroom_id],
            )
            .await?;
        let rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM classroom_ratings WHERE classroom_id = ?1
                     ORDER BY updated_at DESC LIMIT ?2 OFFSET ?3"
                ),
                libsql::params![classroom_id, paging.limit(), paging.offset()],
            )
            .await?;
        Ok(paging.page(collect_rows(rows, row_to_rating).await?, total))
    }

    async fn upsert_rating(
        &self,
        student_id: &str,
        classroom_id: &str,
        rating: i64,
        comment: Option<&str>,
    ) -> Result<ClassroomRating, DatabaseError> {
        let now = format_datetime(&Utc::now());
        let id = self.db().generate_id(PREFIX_RATING).await?;
        self.conn()
            .execute(
                "INSERT INTO classroom_ratings (id, classroom_id, student_id, rating, comment, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
                 ON CONFLICT(classroom_id, student_id)
                 DO UPDATE SET rating = excluded.rating, comment = excluded.comment,
                               updated_at = excluded.updated_at",
                libsql::params![id.as_str(), classroom_id, student_id, rating, comment, now],
            )
            .await?;
        self.recompute_rating(classroom_id).await?;

        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM classroom_ratings
                     WHERE classroom_id = ?1 AND student_id = ?2"
                ),
                [classroom_id, student_id],
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        row_to_rating(&row)
    }

    async fn recompute_rating(&self, classroom_id: &str) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "UPDATE classrooms SET
                    average_rating = COALESCE(
                        (SELECT AVG(rating) FROM classroom_ratings WHERE classroom_id = ?1), 0.0),
                    rating_count =
                        (SELECT COUNT(*) FROM classroom_ratings WHERE classroom_id = ?1),
                    updated_at = ?2
                 WHERE id = ?1",
                libsql::params![classroom_id, format_datetime(&Utc::now())],
            )
            .await?;
        Ok(())
    }
}

//! Lesson repository. Teachers manage lessons of their classrooms; members read them.

use chrono::Utc;

use lex_core::entities::Lesson;
use lex_core::identity::AuthIdentity;
use lex_core::ids::PREFIX_LESSON;

use crate::error::DatabaseError;
use crate::helpers::{
    collect_rows, format_datetime, get_opt_string, nullable, parse_datetime, require_text,
};
use crate::inputs::NewLesson;
use crate::service::LexService;
use crate::updates::SetClause;
use crate::updates::lesson::LessonUpdate;

const SELECT_COLS: &str =
    "id, classroom_id, title, content, video_url, position, created_at, updated_at";

fn row_to_lesson(row: &libsql::Row) -> Result<Lesson, DatabaseError> {
    Ok(Lesson {
        id: row.get(0)?,
        classroom_id: row.get(1)?,
        title: row.get(2)?,
        content: get_opt_string(row, 3)?,
        video_url: get_opt_string(row, 4)?,
        position: row.get(5)?,
        created_at: parse_datetime(&row.get::<String>(6)?)?,
        updated_at: parse_datetime(&row.get::<String>(7)?)?,
    })
}

impl LexService {
    pub async fn create_lesson(
        &self,
        identity: &AuthIdentity,
        classroom_id: &str,
        input: NewLesson,
    ) -> Result<Lesson, DatabaseError> {
        self.ensure_classroom_owner(identity, classroom_id).await?;
        let title = require_text("title", &input.title)?;
        let now = Utc::now();

        let _guard = self.write_lock().await;
        let position = match input.position {
            Some(p) => p,
            None => {
                self.query_count(
                    "SELECT COALESCE(MAX(position) + 1, 0) FROM lessons WHERE classroom_id = ?1",
                    [classroom_id],
                )
                .await?
            }
        };
        let id = self.db().generate_id(PREFIX_LESSON).await?;
        self.conn()
            .execute(
                "INSERT INTO lessons (id, classroom_id, title, content, video_url, position, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                libsql::params![
                    id.as_str(),
                    classroom_id,
                    title.as_str(),
                    input.content.as_deref(),
                    input.video_url.as_deref(),
                    position,
                    format_datetime(&now)
                ],
            )
            .await?;

        Ok(Lesson {
            id,
            classroom_id: classroom_id.to_string(),
            title,
            content: input.content,
            video_url: input.video_url,
            position,
            created_at: now,
            updated_at: now,
        })
    }

    async fn load_lesson(&self, id: &str) -> Result<Lesson, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {SELECT_COLS} FROM lessons WHERE id = ?1"),
                [id],
            )
            .await?;
        let row = rows
            .next()
            .await?
            .ok_or_else(|| DatabaseError::not_found("lesson", id))?;
        row_to_lesson(&row)
    }

    /// Read a lesson. Students must be enrolled in its classroom.
    pub async fn get_lesson(
        &self,
        identity: &AuthIdentity,
        id: &str,
    ) -> Result<Lesson, DatabaseError> {
        let lesson = self.load_lesson(id).await?;
        self.ensure_classroom_reader(identity, &lesson.classroom_id)
            .await?;
        Ok(lesson)
    }

    pub async fn list_lessons(
        &self,
        identity: &AuthIdentity,
        classroom_id: &str,
    ) -> Result<Vec<Lesson>, DatabaseError> {
        self.ensure_classroom_reader(identity, classroom_id).await?;
        let rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM lessons WHERE classroom_id = ?1
                     ORDER BY position, created_at"
                ),
                [classroom_id],
            )
            .await?;
        collect_rows(rows, row_to_lesson).await
    }

    pub async fn update_lesson(
        &self,
        identity: &AuthIdentity,
        id: &str,
        update: LessonUpdate,
    ) -> Result<Lesson, DatabaseError> {
        let lesson = self.load_lesson(id).await?;
        self.ensure_classroom_owner(identity, &lesson.classroom_id)
            .await?;

        let mut set = SetClause::default();
        if let Some(ref title) = update.title {
            set.push("title", require_text("title", title)?);
        }
        if let Some(ref content) = update.content {
            set.push("content", nullable(content.as_deref()));
        }
        if let Some(ref url) = update.video_url {
            set.push("video_url", nullable(url.as_deref()));
        }
        if let Some(position) = update.position {
            set.push("position", position);
        }
        if set.is_empty() {
            return Ok(lesson);
        }
        set.push("updated_at", format_datetime(&Utc::now()));

        let (sql, params) = set.into_update("lessons", id);
        {
            let _guard = self.write_lock().await;
            self.conn()
                .execute(&sql, libsql::params_from_iter(params))
                .await?;
        }
        self.load_lesson(id).await
    }

    pub async fn delete_lesson(
        &self,
        identity: &AuthIdentity,
        id: &str,
    ) -> Result<(), DatabaseError> {
        let lesson = self.load_lesson(id).await?;
        self.ensure_classroom_owner(identity, &lesson.classroom_id)
            .await?;
        let _guard = self.write_lock().await;
        self.conn()
            .execute("DELETE FROM lessons WHERE id = ?1", [id])
            .await?;
        Ok(())
    }
}

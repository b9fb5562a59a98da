//! Classroom repository: CRUD, search, and ownership checks.

use chrono::Utc;

use lex_core::entities::Classroom;
use lex_core::identity::AuthIdentity;
use lex_core::ids::PREFIX_CLASSROOM;
use lex_core::responses::Page;

use crate::error::DatabaseError;
use crate::helpers::{
    collect_rows, format_datetime, get_opt_string, nullable, parse_datetime, require_text,
};
use crate::inputs::NewClassroom;
use crate::paging::Paging;
use crate::service::LexService;
use crate::updates::SetClause;
use crate::updates::classroom::ClassroomUpdate;

pub(crate) const SELECT_COLS: &str = "c.id, c.teacher_id, c.name, c.description, c.thumbnail_url, \
     c.price, c.average_rating, c.rating_count, c.created_at, c.updated_at";

pub(crate) fn row_to_classroom(row: &libsql::Row) -> Result<Classroom, DatabaseError> {
    Ok(Classroom {
        id: row.get(0)?,
        teacher_id: row.get(1)?,
        name: row.get(2)?,
        description: get_opt_string(row, 3)?,
        thumbnail_url: get_opt_string(row, 4)?,
        price: row.get(5)?,
        average_rating: row.get(6)?,
        rating_count: row.get(7)?,
        created_at: parse_datetime(&row.get::<String>(8)?)?,
        updated_at: parse_datetime(&row.get::<String>(9)?)?,
    })
}

/// Filters for [`LexService::list_classrooms`].
#[derive(Debug, Clone, Default)]
pub struct ClassroomFilter {
    /// Case-insensitive substring of the name.
    pub search: Option<String>,
    pub teacher_id: Option<String>,
}

fn validate_price(price: i64) -> Result<(), DatabaseError> {
    if price < 0 {
        return Err(DatabaseError::validation("price must not be negative"));
    }
    Ok(())
}

impl LexService {
    pub async fn create_classroom(
        &self,
        teacher_id: &str,
        input: NewClassroom,
    ) -> Result<Classroom, DatabaseError> {
        let name = require_text("name", &input.name)?;
        validate_price(input.price)?;
        let now = Utc::now();
        let _guard = self.write_lock().await;
        let id = self.db().generate_id(PREFIX_CLASSROOM).await?;

        self.conn()
            .execute(
                "INSERT INTO classrooms (id, teacher_id, name, description, thumbnail_url, price,
                                         average_rating, rating_count, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, 0, ?7, ?7)",
                libsql::params![
                    id.as_str(),
                    teacher_id,
                    name.as_str(),
                    input.description.as_deref(),
                    input.thumbnail_url.as_deref(),
                    input.price,
                    format_datetime(&now)
                ],
            )
            .await?;

        tracing::info!(classroom_id = %id, teacher_id, "classroom created");
        Ok(Classroom {
            id,
            teacher_id: teacher_id.to_string(),
            name,
            description: input.description,
            thumbnail_url: input.thumbnail_url,
            price: input.price,
            average_rating: 0.0,
            rating_count: 0,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn get_classroom(&self, id: &str) -> Result<Classroom, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {SELECT_COLS} FROM classrooms c WHERE c.id = ?1"),
                [id],
            )
            .await?;
        let row = rows
            .next()
            .await?
            .ok_or_else(|| DatabaseError::not_found("classroom", id))?;
        row_to_classroom(&row)
    }

    pub async fn list_classrooms(
        &self,
        filter: ClassroomFilter,
        paging: Paging,
    ) -> Result<Page<Classroom>, DatabaseError> {
        let pattern = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s.to_lowercase()));
        let teacher = filter.teacher_id.as_deref();
        let where_clause = "WHERE (?1 IS NULL OR lower(c.name) LIKE ?1) AND (?2 IS NULL OR c.teacher_id = ?2)";

        let total = self
            .query_count(
                &format!("SELECT COUNT(*) FROM classrooms c {where_clause}"),
                libsql::params![pattern.as_deref(), teacher],
            )
            .await?;
        let rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM classrooms c {where_clause}
                     ORDER BY c.created_at DESC LIMIT ?3 OFFSET ?4"
                ),
                libsql::params![pattern.as_deref(), teacher, paging.limit(), paging.offset()],
            )
            .await?;
        Ok(paging.page(collect_rows(rows, row_to_classroom).await?, total))
    }

    /// Load a classroom and require `identity` to be its teacher or an admin.
    pub async fn ensure_classroom_owner(
        &self,
        identity: &AuthIdentity,
        classroom_id: &str,
    ) -> Result<Classroom, DatabaseError> {
        let classroom = self.get_classroom(classroom_id).await?;
        if !identity.owns_or_admin(&classroom.teacher_id) {
            return Err(DatabaseError::forbidden(
                "only the classroom teacher can manage this classroom",
            ));
        }
        Ok(classroom)
    }

    /// Load a classroom and require `identity` to own it, be an admin, or be enrolled.
    pub async fn ensure_classroom_reader(
        &self,
        identity: &AuthIdentity,
        classroom_id: &str,
    ) -> Result<Classroom, DatabaseError> {
        let classroom = self.get_classroom(classroom_id).await?;
        if identity.owns_or_admin(&classroom.teacher_id)
            || self.is_enrolled(classroom_id, &identity.account_id).await?
        {
            return Ok(classroom);
        }
        Err(DatabaseError::forbidden(
            "join the classroom to see its content",
        ))
    }

    pub async fn update_classroom(
        &self,
        identity: &AuthIdentity,
        id: &str,
        update: ClassroomUpdate,
    ) -> Result<Classroom, DatabaseError> {
        let current = self.ensure_classroom_owner(identity, id).await?;

        let mut set = SetClause::default();
        if let Some(ref name) = update.name {
            set.push("name", require_text("name", name)?);
        }
        if let Some(ref description) = update.description {
            set.push("description", nullable(description.as_deref()));
        }
        if let Some(ref url) = update.thumbnail_url {
            set.push("thumbnail_url", nullable(url.as_deref()));
        }
        if let Some(price) = update.price {
            validate_price(price)?;
            set.push("price", price);
        }
        if set.is_empty() {
            return Ok(current);
        }
        set.push("updated_at", format_datetime(&Utc::now()));

        let (sql, params) = set.into_update("classrooms", id);
        {
            let _guard = self.write_lock().await;
            self.conn()
                .execute(&sql, libsql::params_from_iter(params))
                .await?;
        }
        self.get_classroom(id).await
    }

    pub async fn delete_classroom(
        &self,
        identity: &AuthIdentity,
        id: &str,
    ) -> Result<(), DatabaseError> {
        self.ensure_classroom_owner(identity, id).await?;
        let _guard = self.write_lock().await;
        self.conn()
            .execute("DELETE FROM classrooms WHERE id = ?1", [id])
            .await?;
        tracing::info!(classroom_id = %id, by = %identity.account_id, "classroom deleted");
        Ok(())
    }
}

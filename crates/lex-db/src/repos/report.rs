//! Moderation reports.

use chrono::Utc;

use lex_core::entities::Report;
use lex_core::enums::ReportStatus;
use lex_core::errors::CoreError;
use lex_core::ids::PREFIX_REPORT;
use lex_core::responses::Page;

use crate::error::DatabaseError;
use crate::helpers::{
    collect_rows, format_datetime, get_opt_string, parse_datetime, parse_enum, require_text,
};
use crate::inputs::NewReport;
use crate::paging::Paging;
use crate::service::LexService;

const SELECT_COLS: &str = "id, reporter_id, target, target_id, reason, status, resolver_id, \
     resolution_note, created_at, updated_at";

fn row_to_report(row: &libsql::Row) -> Result<Report, DatabaseError> {
    Ok(Report {
        id: row.get(0)?,
        reporter_id: row.get(1)?,
        target: parse_enum(&row.get::<String>(2)?)?,
        target_id: row.get(3)?,
        reason: row.get(4)?,
        status: parse_enum(&row.get::<String>(5)?)?,
        resolver_id: get_opt_string(row, 6)?,
        resolution_note: get_opt_string(row, 7)?,
        created_at: parse_datetime(&row.get::<String>(8)?)?,
        updated_at: parse_datetime(&row.get::<String>(9)?)?,
    })
}

impl LexService {
    pub async fn create_report(
        &self,
        reporter_id: &str,
        input: NewReport,
    ) -> Result<Report, DatabaseError> {
        let target_id = require_text("target_id", &input.target_id)?;
        let reason = require_text("reason", &input.reason)?;

        let _guard = self.write_lock().await;
        let id = self.db().generate_id(PREFIX_REPORT).await?;
        let now = Utc::now();
        self.conn()
            .execute(
                "INSERT INTO reports (id, reporter_id, target, target_id, reason, status,
                                      created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6, ?6)",
                libsql::params![
                    id.as_str(),
                    reporter_id,
                    input.target.as_str(),
                    target_id.as_str(),
                    reason.as_str(),
                    format_datetime(&now)
                ],
            )
            .await?;
        tracing::info!(report_id = %id, target = %input.target, %target_id, "report filed");
        Ok(Report {
            id,
            reporter_id: reporter_id.to_string(),
            target: input.target,
            target_id,
            reason,
            status: ReportStatus::Pending,
            resolver_id: None,
            resolution_note: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn get_report(&self, id: &str) -> Result<Report, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {SELECT_COLS} FROM reports WHERE id = ?1"),
                [id],
            )
            .await?;
        let row = rows
            .next()
            .await?
            .ok_or_else(|| DatabaseError::not_found("report", id))?;
        row_to_report(&row)
    }

    /// Oldest first, so the moderation queue reads top to bottom.
    pub async fn list_reports(
        &self,
        status: Option<ReportStatus>,
        paging: Paging,
    ) -> Result<Page<Report>, DatabaseError> {
        let (total, rows) = match status {
            Some(status) => {
                let total = self
                    .query_count(
                        "SELECT COUNT(*) FROM reports WHERE status = ?1",
                        [status.as_str()],
                    )
                    .await?;
                let rows = self
                    .conn()
                    .query(
                        &format!(
                            "SELECT {SELECT_COLS} FROM reports WHERE status = ?1
                             ORDER BY created_at LIMIT ?2 OFFSET ?3"
                        ),
                        libsql::params![status.as_str(), paging.limit(), paging.offset()],
                    )
                    .await?;
                (total, rows)
            }
            None => {
                let total = self.query_count("SELECT COUNT(*) FROM reports", ()).await?;
                let rows = self
                    .conn()
                    .query(
                        &format!(
                            "SELECT {SELECT_COLS} FROM reports
                             ORDER BY created_at LIMIT ?1 OFFSET ?2"
                        ),
                        libsql::params![paging.limit(), paging.offset()],
                    )
                    .await?;
                (total, rows)
            }
        };
        Ok(paging.page(collect_rows(rows, row_to_report).await?, total))
    }

    /// Close a pending report as `resolved` or `rejected`.
    pub async fn resolve_report(
        &self,
        resolver_id: &str,
        id: &str,
        next: ReportStatus,
        note: Option<&str>,
    ) -> Result<Report, DatabaseError> {
        let current = self.get_report(id).await?;
        if !current.status.can_transition_to(next) {
            return Err(CoreError::InvalidTransition {
                entity_type: "report".into(),
                id: id.to_string(),
                from: current.status.to_string(),
                to: next.to_string(),
            }
            .into());
        }

        {
            let _guard = self.write_lock().await;
            let updated = self
                .conn()
                .execute(
                    "UPDATE reports SET status = ?2, resolver_id = ?3, resolution_note = ?4,
                                        updated_at = ?5
                     WHERE id = ?1 AND status = 'pending'",
                    libsql::params![
                        id,
                        next.as_str(),
                        resolver_id,
                        note,
                        format_datetime(&Utc::now())
                    ],
                )
                .await?;
            if updated == 0 {
                return Err(DatabaseError::conflict("report was already handled"));
            }
        }
        tracing::info!(report_id = id, status = %next, "report closed");
        self.get_report(id).await
    }
}

#[cfg(test)]
mod tests {
    use lex_core::enums::{ReportTarget, Role};
    use pretty_assertions::assert_eq;

    use crate::test_support::helpers::{seed_account, test_service};

    use super::*;

    fn report(reason: &str) -> NewReport {
        NewReport {
            target: ReportTarget::Lesson,
            target_id: "les-00000001".into(),
            reason: reason.into(),
        }
    }

    #[tokio::test]
    async fn pending_reports_are_resolved_once() {
        let svc = test_service().await;
        let student = seed_account(&svc, "s@example.com", Role::Student).await;
        let admin = seed_account(&svc, "a@example.com", Role::Admin).await;

        let filed = svc
            .create_report(&student.id, report("Broken video link"))
            .await
            .unwrap();
        let closed = svc
            .resolve_report(&admin.id, &filed.id, ReportStatus::Resolved, Some("fixed"))
            .await
            .unwrap();
        assert_eq!(closed.status, ReportStatus::Resolved);
        assert_eq!(closed.resolver_id.as_deref(), Some(admin.id.as_str()));
        assert_eq!(closed.resolution_note.as_deref(), Some("fixed"));

        let err = svc
            .resolve_report(&admin.id, &filed.id, ReportStatus::Rejected, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DatabaseError::Core(CoreError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let svc = test_service().await;
        let student = seed_account(&svc, "s@example.com", Role::Student).await;
        let admin = seed_account(&svc, "a@example.com", Role::Admin).await;
        let first = svc.create_report(&student.id, report("spam")).await.unwrap();
        svc.create_report(&student.id, report("offensive")).await.unwrap();
        svc.resolve_report(&admin.id, &first.id, ReportStatus::Rejected, None)
            .await
            .unwrap();

        let pending = svc
            .list_reports(Some(ReportStatus::Pending), Paging::default())
            .await
            .unwrap();
        assert_eq!(pending.total, 1);
        assert_eq!(pending.items[0].reason, "offensive");

        let all = svc.list_reports(None, Paging::default()).await.unwrap();
        assert_eq!(all.total, 2);
    }

    #[tokio::test]
    async fn empty_reason_is_rejected() {
        let svc = test_service().await;
        let student = seed_account(&svc, "s@example.com", Role::Student).await;
        assert!(svc.create_report(&student.id, report("  ")).await.is_err());
    }
}

//! Classroom membership.

use chrono::Utc;

use lex_core::entities::{Account, Classroom, ClassroomStudent};
use lex_core::enums::PaymentStatus;
use lex_core::responses::Page;

use crate::error::DatabaseError;
use crate::helpers::{collect_rows, format_datetime};
use crate::paging::Paging;
use crate::repos::account::{JOINED_COLS as ACCOUNT_COLS, row_to_account};
use crate::repos::classroom::{SELECT_COLS as CLASSROOM_COLS, row_to_classroom};
use crate::service::LexService;

impl LexService {
    pub async fn is_enrolled(
        &self,
        classroom_id: &str,
        student_id: &str,
    ) -> Result<bool, DatabaseError> {
        let count = self
            .query_count(
                "SELECT COUNT(*) FROM classroom_students WHERE classroom_id = ?1 AND student_id = ?2",
                [classroom_id, student_id],
            )
            .await?;
        Ok(count > 0)
    }

    /// Join a classroom as a student.
    ///
    /// Free classrooms are open. Paid classrooms require a successful payment
    /// by this student, which normally enrolls them already.
    pub async fn join_classroom(
        &self,
        student_id: &str,
        classroom_id: &str,
    ) -> Result<ClassroomStudent, DatabaseError> {
        let classroom = self.get_classroom(classroom_id).await?;
        if classroom.teacher_id == student_id {
            return Err(DatabaseError::validation(
                "a teacher cannot join their own classroom",
            ));
        }
        if self.is_enrolled(classroom_id, student_id).await? {
            return Err(DatabaseError::conflict("already a member of this classroom"));
        }
        if !classroom.is_free() && !self.has_paid_for(student_id, classroom_id).await? {
            return Err(DatabaseError::forbidden(
                "this classroom requires a completed payment",
            ));
        }

        let _guard = self.write_lock().await;
        let joined_at = self.insert_enrollment(classroom_id, student_id).await?;
        tracing::info!(classroom_id, student_id, "student joined classroom");
        Ok(ClassroomStudent {
            classroom_id: classroom_id.to_string(),
            student_id: student_id.to_string(),
            joined_at,
        })
    }

    /// Enroll without checks. Idempotent.
    pub async fn enroll_student(
        &self,
        classroom_id: &str,
        student_id: &str,
    ) -> Result<(), DatabaseError> {
        let _guard = self.write_lock().await;
        self.insert_enrollment(classroom_id, student_id).await?;
        Ok(())
    }

    /// Insert a membership row, ignoring an existing one. Caller holds the write lock.
    pub(crate) async fn insert_enrollment(
        &self,
        classroom_id: &str,
        student_id: &str,
    ) -> Result<chrono::DateTime<Utc>, DatabaseError> {
        let now = Utc::now();
        self.conn()
            .execute(
                "INSERT OR IGNORE INTO classroom_students (classroom_id, student_id, joined_at)
                 VALUES (?1, ?2, ?3)",
                libsql::params![classroom_id, student_id, format_datetime(&now)],
            )
            .await?;
        Ok(now)
    }

    pub async fn leave_classroom(
        &self,
        student_id: &str,
        classroom_id: &str,
    ) -> Result<(), DatabaseError> {
        let _guard = self.write_lock().await;
        let removed = self
            .conn()
            .execute(
                "DELETE FROM classroom_students WHERE classroom_id = ?1 AND student_id = ?2",
                [classroom_id, student_id],
            )
            .await?;
        if removed == 0 {
            return Err(DatabaseError::not_found("membership", classroom_id));
        }
        tracing::info!(classroom_id, student_id, "student left classroom");
        Ok(())
    }

    pub async fn list_classroom_students(
        &self,
        classroom_id: &str,
        paging: Paging,
    ) -> Result<Page<Account>, DatabaseError> {
        let total = self
            .query_count(
                "SELECT COUNT(*) FROM classroom_students WHERE classroom_id = ?1",
                [classroom_id],
            )
            .await?;
        let rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {ACCOUNT_COLS} FROM classroom_students cs
                     JOIN accounts a ON a.id = cs.student_id
                     WHERE cs.classroom_id = ?1
                     ORDER BY cs.joined_at LIMIT ?2 OFFSET ?3"
                ),
                libsql::params![classroom_id, paging.limit(), paging.offset()],
            )
            .await?;
        let students = collect_rows(rows, row_to_account).await?;
        Ok(paging.page(students, total))
    }

    pub async fn list_student_classrooms(
        &self,
        student_id: &str,
        paging: Paging,
    ) -> Result<Page<Classroom>, DatabaseError> {
        let total = self
            .query_count(
                "SELECT COUNT(*) FROM classroom_students WHERE student_id = ?1",
                [student_id],
            )
            .await?;
        let rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {CLASSROOM_COLS} FROM classroom_students cs
                     JOIN classrooms c ON c.id = cs.classroom_id
                     WHERE cs.student_id = ?1
                     ORDER BY cs.joined_at DESC LIMIT ?2 OFFSET ?3"
                ),
                libsql::params![student_id, paging.limit(), paging.offset()],
            )
            .await?;
        Ok(paging.page(collect_rows(rows, row_to_classroom).await?, total))
    }

    async fn has_paid_for(
        &self,
        student_id: &str,
        classroom_id: &str,
    ) -> Result<bool, DatabaseError> {
        let count = self
            .query_count(
                "SELECT COUNT(*) FROM payments
                 WHERE account_id = ?1 AND classroom_id = ?2 AND status = ?3",
                [student_id, classroom_id, PaymentStatus::Success.as_str()],
            )
            .await?;
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use lex_core::enums::Role;
    use lex_core::errors::CoreError;
    use pretty_assertions::assert_eq;

    use crate::test_support::helpers::{seed_account, seed_classroom, test_service};

    use super::*;

    #[tokio::test]
    async fn join_free_classroom_once() {
        let svc = test_service().await;
        let teacher = seed_account(&svc, "t@example.com", Role::Teacher).await;
        let student = seed_account(&svc, "s@example.com", Role::Student).await;
        let classroom = seed_classroom(&svc, &teacher, 0).await;

        svc.join_classroom(&student.id, &classroom.id).await.unwrap();
        assert!(svc.is_enrolled(&classroom.id, &student.id).await.unwrap());

        let err = svc
            .join_classroom(&student.id, &classroom.id)
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Core(CoreError::Conflict(_))));

        let students = svc
            .list_classroom_students(&classroom.id, Paging::default())
            .await
            .unwrap();
        assert_eq!(students.total, 1);
        assert_eq!(students.items[0].id, student.id);

        let mine = svc
            .list_student_classrooms(&student.id, Paging::default())
            .await
            .unwrap();
        assert_eq!(mine.items[0].id, classroom.id);
    }

    #[tokio::test]
    async fn paid_classroom_needs_payment() {
        let svc = test_service().await;
        let teacher = seed_account(&svc, "t@example.com", Role::Teacher).await;
        let student = seed_account(&svc, "s@example.com", Role::Student).await;
        let classroom = seed_classroom(&svc, &teacher, 99_000).await;

        let err = svc
            .join_classroom(&student.id, &classroom.id)
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Core(CoreError::Forbidden(_))));
    }

    #[tokio::test]
    async fn enroll_is_idempotent_and_leave_removes() {
        let svc = test_service().await;
        let teacher = seed_account(&svc, "t@example.com", Role::Teacher).await;
        let student = seed_account(&svc, "s@example.com", Role::Student).await;
        let classroom = seed_classroom(&svc, &teacher, 99_000).await;

        svc.enroll_student(&classroom.id, &student.id).await.unwrap();
        svc.enroll_student(&classroom.id, &student.id).await.unwrap();
        let students = svc
            .list_classroom_students(&classroom.id, Paging::default())
            .await
            .unwrap();
        assert_eq!(students.total, 1);

        svc.leave_classroom(&student.id, &classroom.id).await.unwrap();
        assert!(!svc.is_enrolled(&classroom.id, &student.id).await.unwrap());
        assert!(svc.leave_classroom(&student.id, &classroom.id).await.is_err());
    }
}

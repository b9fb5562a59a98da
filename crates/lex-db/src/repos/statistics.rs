//! Dashboard numbers. Each overview is a single query of scalar subqueries.

use lex_core::responses::{AdminOverview, StudentOverview, TeacherOverview};

use crate::error::DatabaseError;
use crate::service::LexService;

impl LexService {
    pub async fn admin_overview(&self) -> Result<AdminOverview, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT
                    (SELECT COUNT(*) FROM accounts WHERE role = 'admin'),
                    (SELECT COUNT(*) FROM accounts WHERE role = 'teacher'),
                    (SELECT COUNT(*) FROM accounts WHERE role = 'student'),
                    (SELECT COUNT(*) FROM classrooms),
                    (SELECT COUNT(*) FROM tests),
                    (SELECT COUNT(*) FROM submissions WHERE status = 'submitted'),
                    (SELECT COUNT(*) FROM reports WHERE status = 'pending'),
                    (SELECT COALESCE(SUM(amount), 0) FROM payments WHERE status = 'success')",
                (),
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        Ok(AdminOverview {
            admins: row.get(0)?,
            teachers: row.get(1)?,
            students: row.get(2)?,
            classrooms: row.get(3)?,
            tests: row.get(4)?,
            submissions: row.get(5)?,
            pending_reports: row.get(6)?,
            revenue: row.get(7)?,
        })
    }

    /// `average_rating` averages every individual rating across the teacher's classrooms.
    pub async fn teacher_overview(&self, teacher_id: &str) -> Result<TeacherOverview, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT
                    (SELECT COUNT(*) FROM classrooms WHERE teacher_id = ?1),
                    (SELECT COUNT(DISTINCT cs.student_id) FROM classroom_students cs
                        JOIN classrooms c ON c.id = cs.classroom_id WHERE c.teacher_id = ?1),
                    (SELECT COUNT(*) FROM tests WHERE creator_id = ?1),
                    (SELECT COALESCE(SUM(p.amount), 0) FROM payments p
                        JOIN classrooms c ON c.id = p.classroom_id
                        WHERE c.teacher_id = ?1 AND p.status = 'success'),
                    (SELECT COALESCE(AVG(r.rating), 0.0) FROM classroom_ratings r
                        JOIN classrooms c ON c.id = r.classroom_id WHERE c.teacher_id = ?1)",
                [teacher_id],
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        Ok(TeacherOverview {
            classrooms: row.get(0)?,
            students: row.get(1)?,
            tests: row.get(2)?,
            revenue: row.get(3)?,
            average_rating: row.get(4)?,
        })
    }

    /// Scores only count submitted attempts.
    pub async fn student_overview(&self, student_id: &str) -> Result<StudentOverview, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT
                    (SELECT COUNT(*) FROM classroom_students WHERE student_id = ?1),
                    (SELECT COUNT(*) FROM submissions WHERE student_id = ?1 AND status = 'submitted'),
                    (SELECT COALESCE(AVG(score), 0.0) FROM submissions
                        WHERE student_id = ?1 AND status = 'submitted'),
                    (SELECT COALESCE(MAX(score), 0.0) FROM submissions
                        WHERE student_id = ?1 AND status = 'submitted'),
                    (SELECT COUNT(*) FROM flashcard_sets WHERE owner_id = ?1)",
                [student_id],
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        let average: f64 = row.get(2)?;
        Ok(StudentOverview {
            classrooms: row.get(0)?,
            submissions: row.get(1)?,
            average_score: (average * 100.0).round() / 100.0,
            best_score: row.get(3)?,
            flashcard_sets: row.get(4)?,
        })
    }
}

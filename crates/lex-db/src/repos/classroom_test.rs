//! Tests assigned to classrooms.

use chrono::Utc;

use lex_core::entities::Test;
use lex_core::identity::AuthIdentity;

use crate::error::DatabaseError;
use crate::helpers::{collect_rows, format_datetime};
use crate::repos::test::{JOINED_COLS as TEST_COLS, row_to_test};
use crate::service::LexService;

impl LexService {
    /// Assign a test to a classroom. Only the classroom owner (or an admin) may.
    pub async fn attach_test(
        &self,
        identity: &AuthIdentity,
        classroom_id: &str,
        test_id: &str,
    ) -> Result<(), DatabaseError> {
        self.ensure_classroom_owner(identity, classroom_id).await?;
        self.get_test(test_id).await?;

        let _guard = self.write_lock().await;
        self.conn()
            .execute(
                "INSERT INTO classroom_tests (classroom_id, test_id, added_at) VALUES (?1, ?2, ?3)",
                libsql::params![classroom_id, test_id, format_datetime(&Utc::now())],
            )
            .await
            .map_err(|e| {
                DatabaseError::from(e).on_unique("test is already assigned to this classroom")
            })?;
        tracing::info!(classroom_id, test_id, "test attached to classroom");
        Ok(())
    }

    pub async fn detach_test(
        &self,
        identity: &AuthIdentity,
        classroom_id: &str,
        test_id: &str,
    ) -> Result<(), DatabaseError> {
        self.ensure_classroom_owner(identity, classroom_id).await?;
        let _guard = self.write_lock().await;
        let removed = self
            .conn()
            .execute(
                "DELETE FROM classroom_tests WHERE classroom_id = ?1 AND test_id = ?2",
                [classroom_id, test_id],
            )
            .await?;
        if removed == 0 {
            return Err(DatabaseError::not_found("classroom test", test_id));
        }
        Ok(())
    }

    pub async fn list_classroom_tests(
        &self,
        identity: &AuthIdentity,
        classroom_id: &str,
    ) -> Result<Vec<Test>, DatabaseError> {
        self.ensure_classroom_reader(identity, classroom_id).await?;
        let rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {TEST_COLS} FROM classroom_tests ct JOIN tests t ON t.id = ct.test_id
                     WHERE ct.classroom_id = ?1 ORDER BY ct.added_at"
                ),
                [classroom_id],
            )
            .await?;
        collect_rows(rows, row_to_test).await
    }
}

#[cfg(test)]
mod tests {
    use lex_core::enums::Role;
    use lex_core::errors::CoreError;

    use crate::test_support::helpers::{
        identity_of, seed_account, seed_classroom, seed_test, test_service,
    };

    use super::*;

    #[tokio::test]
    async fn attach_list_detach() {
        let svc = test_service().await;
        let teacher = seed_account(&svc, "t@example.com", Role::Teacher).await;
        let classroom = seed_classroom(&svc, &teacher, 0).await;
        let test = seed_test(&svc, &teacher, 2).await;
        let owner = identity_of(&teacher);

        svc.attach_test(&owner, &classroom.id, &test.id).await.unwrap();
        let err = svc
            .attach_test(&owner, &classroom.id, &test.id)
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Core(CoreError::Conflict(_))));

        let tests = svc.list_classroom_tests(&owner, &classroom.id).await.unwrap();
        assert_eq!(tests.len(), 1);
        assert_eq!(tests[0].id, test.id);

        svc.detach_test(&owner, &classroom.id, &test.id).await.unwrap();
        assert!(svc.list_classroom_tests(&owner, &classroom.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn other_teacher_cannot_attach() {
        let svc = test_service().await;
        let teacher = seed_account(&svc, "t@example.com", Role::Teacher).await;
        let other = seed_account(&svc, "o@example.com", Role::Teacher).await;
        let classroom = seed_classroom(&svc, &teacher, 0).await;
        let test = seed_test(&svc, &other, 1).await;

        let err = svc
            .attach_test(&identity_of(&other), &classroom.id, &test.id)
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Core(CoreError::Forbidden(_))));
    }
}

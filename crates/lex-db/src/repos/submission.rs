//! Test attempts: start, grade, abandon, and read back.
//!
//! Scoring: every question of the test counts, unanswered ones as wrong.
//! `score = round(correct * 100 / total, 2)`.

use std::collections::HashSet;

use chrono::Utc;

use lex_core::entities::{Answer, Submission};
use lex_core::enums::SubmissionStatus;
use lex_core::errors::CoreError;
use lex_core::identity::AuthIdentity;
use lex_core::ids::{PREFIX_ANSWER, PREFIX_SUBMISSION};
use lex_core::responses::{LeaderboardEntry, Page, SubmissionDetail};

use crate::error::DatabaseError;
use crate::helpers::{
    collect_rows, format_datetime, get_bool, get_opt_string, parse_datetime, parse_enum,
    parse_optional_datetime,
};
use crate::inputs::AnswerInput;
use crate::paging::Paging;
use crate::service::LexService;

const SELECT_COLS: &str = "id, test_id, student_id, status, correct_count, total_questions, \
     score, started_at, submitted_at";

fn row_to_submission(row: &libsql::Row) -> Result<Submission, DatabaseError> {
    Ok(Submission {
        id: row.get(0)?,
        test_id: row.get(1)?,
        student_id: row.get(2)?,
        status: parse_enum(&row.get::<String>(3)?)?,
        correct_count: row.get(4)?,
        total_questions: row.get(5)?,
        score: row.get(6)?,
        started_at: parse_datetime(&row.get::<String>(7)?)?,
        submitted_at: parse_optional_datetime(get_opt_string(row, 8)?.as_deref())?,
    })
}

fn row_to_answer(row: &libsql::Row) -> Result<Answer, DatabaseError> {
    Ok(Answer {
        id: row.get(0)?,
        submission_id: row.get(1)?,
        question_id: row.get(2)?,
        choice_id: get_opt_string(row, 3)?,
        is_correct: get_bool(row, 4)?,
    })
}

/// Percentage score rounded to two decimals. Zero questions score zero.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn compute_score(correct: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    let raw = correct as f64 * 100.0 / total as f64;
    (raw * 100.0).round() / 100.0
}

impl LexService {
    /// Start an attempt, or return the student's attempt already in progress.
    ///
    /// The flag is `true` when a new attempt was created.
    pub async fn start_submission(
        &self,
        identity: &AuthIdentity,
        test_id: &str,
    ) -> Result<(Submission, bool), DatabaseError> {
        let student_id = identity.account_id.as_str();
        let test = self.get_accessible_test(identity, test_id).await?;

        let _guard = self.write_lock().await;
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM submissions
                     WHERE test_id = ?1 AND student_id = ?2 AND status = ?3
                     ORDER BY started_at DESC LIMIT 1"
                ),
                [test_id, student_id, SubmissionStatus::InProgress.as_str()],
            )
            .await?;
        if let Some(row) = rows.next().await? {
            return Ok((row_to_submission(&row)?, false));
        }
        drop(rows);

        let now = Utc::now();
        let id = self.db().generate_id(PREFIX_SUBMISSION).await?;
        self.conn()
            .execute(
                "INSERT INTO submissions (id, test_id, student_id, status, correct_count,
                                          total_questions, score, started_at)
                 VALUES (?1, ?2, ?3, ?4, 0, ?5, 0, ?6)",
                libsql::params![
                    id.as_str(),
                    test_id,
                    student_id,
                    SubmissionStatus::InProgress.as_str(),
                    test.total_questions,
                    format_datetime(&now)
                ],
            )
            .await?;

        tracing::info!(submission_id = %id, test_id, student_id, "test started");
        Ok((
            Submission {
                id,
                test_id: test_id.to_string(),
                student_id: student_id.to_string(),
                status: SubmissionStatus::InProgress,
                correct_count: 0,
                total_questions: test.total_questions,
                score: 0.0,
                started_at: now,
                submitted_at: None,
            },
            true,
        ))
    }

    pub async fn get_submission(&self, id: &str) -> Result<Submission, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {SELECT_COLS} FROM submissions WHERE id = ?1"),
                [id],
            )
            .await?;
        let row = rows
            .next()
            .await?
            .ok_or_else(|| DatabaseError::not_found("submission", id))?;
        row_to_submission(&row)
    }

    /// Grade and close an attempt.
    ///
    /// Only the student who started it may submit, and only while it is in
    /// progress. Every answer must name a question of the test and, when
    /// given, a choice of that question. A question may be answered once.
    pub async fn submit_answers(
        &self,
        student_id: &str,
        submission_id: &str,
        answers: Vec<AnswerInput>,
    ) -> Result<SubmissionDetail, DatabaseError> {
        let submission = self.get_submission(submission_id).await?;
        if submission.student_id != student_id {
            return Err(DatabaseError::forbidden(
                "only the student who started this attempt can submit it",
            ));
        }
        if !submission
            .status
            .can_transition_to(SubmissionStatus::Submitted)
        {
            return Err(CoreError::InvalidTransition {
                entity_type: "submission".into(),
                id: submission_id.to_string(),
                from: submission.status.to_string(),
                to: SubmissionStatus::Submitted.to_string(),
            }
            .into());
        }

        let key = self.answer_key(&submission.test_id).await?;
        let mut seen = HashSet::new();
        for answer in &answers {
            let Some(question) = key.get(&answer.question_id) else {
                return Err(DatabaseError::validation(format!(
                    "question {} is not part of this test",
                    answer.question_id
                )));
            };
            if !seen.insert(answer.question_id.as_str()) {
                return Err(DatabaseError::validation(format!(
                    "question {} is answered more than once",
                    answer.question_id
                )));
            }
            if let Some(ref choice_id) = answer.choice_id {
                if !question.choices.contains(choice_id) {
                    return Err(DatabaseError::validation(format!(
                        "choice {choice_id} does not belong to question {}",
                        answer.question_id
                    )));
                }
            }
        }

        let mut graded: Vec<(String, Option<String>, bool)> = key
            .iter()
            .map(|(question_id, q)| {
                let choice = answers
                    .iter()
                    .find(|a| &a.question_id == question_id)
                    .and_then(|a| a.choice_id.clone());
                let correct = choice.is_some() && choice == q.correct;
                (question_id.clone(), choice, correct)
            })
            .collect();
        graded.sort_by(|a, b| a.0.cmp(&b.0));

        let total = i64::try_from(graded.len()).unwrap_or(i64::MAX);
        let correct = i64::try_from(graded.iter().filter(|g| g.2).count()).unwrap_or(0);
        let score = compute_score(correct, total);
        let now = Utc::now();

        let tx = self.begin_write().await?;
        let result = async {
            // Status guard inside the transaction so a concurrent sweep cannot
            // abandon an attempt that is being submitted.
            let changed = self
                .conn()
                .execute(
                    "UPDATE submissions SET status = ?2, correct_count = ?3, total_questions = ?4,
                            score = ?5, submitted_at = ?6
                     WHERE id = ?1 AND status = ?7",
                    libsql::params![
                        submission_id,
                        SubmissionStatus::Submitted.as_str(),
                        correct,
                        total,
                        score,
                        format_datetime(&now),
                        SubmissionStatus::InProgress.as_str()
                    ],
                )
                .await?;
            if changed == 0 {
                return Err(DatabaseError::Core(CoreError::InvalidTransition {
                    entity_type: "submission".into(),
                    id: submission_id.to_string(),
                    from: "closed".into(),
                    to: SubmissionStatus::Submitted.to_string(),
                }));
            }
            let mut stored = Vec::with_capacity(graded.len());
            for (question_id, choice_id, is_correct) in &graded {
                let id = self.db().generate_id(PREFIX_ANSWER).await?;
                self.conn()
                    .execute(
                        "INSERT INTO answers (id, submission_id, question_id, choice_id, is_correct)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                        libsql::params![
                            id.as_str(),
                            submission_id,
                            question_id.as_str(),
                            choice_id.as_deref(),
                            i64::from(*is_correct)
                        ],
                    )
                    .await?;
                stored.push(Answer {
                    id,
                    submission_id: submission_id.to_string(),
                    question_id: question_id.clone(),
                    choice_id: choice_id.clone(),
                    is_correct: *is_correct,
                });
            }
            Ok(stored)
        }
        .await;
        let stored = tx.finish(result).await?;

        tracing::info!(submission_id, correct, total, score, "test submitted");
        Ok(SubmissionDetail {
            submission: Submission {
                status: SubmissionStatus::Submitted,
                correct_count: correct,
                total_questions: total,
                score,
                submitted_at: Some(now),
                ..submission
            },
            answers: stored,
        })
    }

    /// Mark an attempt abandoned if it is still in progress. Returns whether it changed.
    pub async fn abandon_submission(&self, submission_id: &str) -> Result<bool, DatabaseError> {
        let _guard = self.write_lock().await;
        let changed = self
            .conn()
            .execute(
                "UPDATE submissions SET status = ?2 WHERE id = ?1 AND status = ?3",
                libsql::params![
                    submission_id,
                    SubmissionStatus::Abandoned.as_str(),
                    SubmissionStatus::InProgress.as_str()
                ],
            )
            .await?;
        if changed > 0 {
            tracing::info!(submission_id, "submission abandoned");
        }
        Ok(changed > 0)
    }

    /// Submission with answers. Visible to its student, the test creator, and admins.
    pub async fn get_submission_detail(
        &self,
        identity: &AuthIdentity,
        id: &str,
    ) -> Result<SubmissionDetail, DatabaseError> {
        let submission = self.get_submission(id).await?;
        if identity.account_id != submission.student_id && !identity.is_admin() {
            let test = self.get_test(&submission.test_id).await?;
            if test.creator_id != identity.account_id {
                return Err(DatabaseError::forbidden(
                    "not allowed to view this submission",
                ));
            }
        }
        let rows = self
            .conn()
            .query(
                "SELECT a.id, a.submission_id, a.question_id, a.choice_id, a.is_correct
                 FROM answers a JOIN questions q ON q.id = a.question_id
                 WHERE a.submission_id = ?1 ORDER BY q.position",
                [id],
            )
            .await?;
        let answers = collect_rows(rows, row_to_answer).await?;
        Ok(SubmissionDetail {
            submission,
            answers,
        })
    }

    pub async fn list_student_submissions(
        &self,
        student_id: &str,
        paging: Paging,
    ) -> Result<Page<Submission>, DatabaseError> {
        let total = self
            .query_count(
                "SELECT COUNT(*) FROM submissions WHERE student_id = ?1",
                [student_id],
            )
            .await?;
        let rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM submissions WHERE student_id = ?1
                     ORDER BY started_at DESC LIMIT ?2 OFFSET ?3"
                ),
                libsql::params![student_id, paging.limit(), paging.offset()],
            )
            .await?;
        Ok(paging.page(collect_rows(rows, row_to_submission).await?, total))
    }

    /// All attempts at a test. Creator or admin only.
    pub async fn list_test_submissions(
        &self,
        identity: &AuthIdentity,
        test_id: &str,
        paging: Paging,
    ) -> Result<Page<Submission>, DatabaseError> {
        self.ensure_test_owner(identity, test_id).await?;
        let total = self
            .query_count(
                "SELECT COUNT(*) FROM submissions WHERE test_id = ?1",
                [test_id],
            )
            .await?;
        let rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM submissions WHERE test_id = ?1
                     ORDER BY started_at DESC LIMIT ?2 OFFSET ?3"
                ),
                libsql::params![test_id, paging.limit(), paging.offset()],
            )
            .await?;
        Ok(paging.page(collect_rows(rows, row_to_submission).await?, total))
    }

    /// Best submitted score per student, highest first.
    pub async fn leaderboard(
        &self,
        test_id: &str,
        limit: u32,
    ) -> Result<Vec<LeaderboardEntry>, DatabaseError> {
        self.get_test(test_id).await?;
        let rows = self
            .conn()
            .query(
                "SELECT s.student_id, a.full_name, MAX(s.score) AS best, COUNT(*) AS attempts
                 FROM submissions s JOIN accounts a ON a.id = s.student_id
                 WHERE s.test_id = ?1 AND s.status = ?2
                 GROUP BY s.student_id, a.full_name
                 ORDER BY best DESC, MIN(s.submitted_at) ASC
                 LIMIT ?3",
                libsql::params![
                    test_id,
                    SubmissionStatus::Submitted.as_str(),
                    i64::from(limit)
                ],
            )
            .await?;
        collect_rows(rows, |row| {
            Ok(LeaderboardEntry {
                student_id: row.get(0)?,
                full_name: row.get(1)?,
                best_score: row.get(2)?,
                attempts: row.get(3)?,
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use lex_core::enums::Role;
    use lex_core::responses::TestDetail;
    use pretty_assertions::assert_eq;

    use crate::test_support::helpers::{identity_of, seed_account, seed_test, test_service};

    use super::*;

    fn answer(detail: &TestDetail, q: usize, label: &str) -> AnswerInput {
        let question = &detail.questions[q];
        AnswerInput {
            question_id: question.id.clone(),
            choice_id: question
                .choices
                .iter()
                .find(|c| c.label == label)
                .map(|c| c.id.clone()),
        }
    }

    #[test]
    fn score_rounds_to_two_decimals() {
        assert!((compute_score(1, 3) - 33.33).abs() < f64::EPSILON);
        assert!((compute_score(2, 3) - 66.67).abs() < f64::EPSILON);
        assert!((compute_score(3, 3) - 100.0).abs() < f64::EPSILON);
        assert!(compute_score(0, 0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn scoring_counts_unanswered_as_wrong() {
        let svc = test_service().await;
        let teacher = seed_account(&svc, "t@example.com", Role::Teacher).await;
        let student = seed_account(&svc, "s@example.com", Role::Student).await;
        let test = seed_test(&svc, &teacher, 3).await;
        let detail = svc
            .get_test_detail(&identity_of(&teacher), &test.id)
            .await
            .unwrap();

        let (submission, created) = svc
            .start_submission(&identity_of(&student), &test.id)
            .await
            .unwrap();
        assert!(created);

        // Q0 right, Q1 wrong, Q2 left blank.
        let result = svc
            .submit_answers(
                &student.id,
                &submission.id,
                vec![answer(&detail, 0, "A"), answer(&detail, 1, "B")],
            )
            .await
            .unwrap();
        assert_eq!(result.submission.status, SubmissionStatus::Submitted);
        assert_eq!(result.submission.correct_count, 1);
        assert_eq!(result.submission.total_questions, 3);
        assert!((result.submission.score - 33.33).abs() < f64::EPSILON);
        assert_eq!(result.answers.len(), 3);
        assert_eq!(result.answers.iter().filter(|a| a.choice_id.is_none()).count(), 1);

        let stored = svc
            .get_submission_detail(&identity_of(&student), &submission.id)
            .await
            .unwrap();
        assert_eq!(stored.submission.correct_count, 1);
        assert_eq!(stored.answers.len(), 3);
        assert!(stored.answers[0].is_correct);
    }

    #[tokio::test]
    async fn start_returns_existing_attempt() {
        let svc = test_service().await;
        let teacher = seed_account(&svc, "t@example.com", Role::Teacher).await;
        let student = seed_account(&svc, "s@example.com", Role::Student).await;
        let test = seed_test(&svc, &teacher, 1).await;

        let (first, created) = svc
            .start_submission(&identity_of(&student), &test.id)
            .await
            .unwrap();
        let (again, created_again) = svc
            .start_submission(&identity_of(&student), &test.id)
            .await
            .unwrap();
        assert!(created);
        assert!(!created_again);
        assert_eq!(first.id, again.id);
    }

    #[tokio::test]
    async fn cannot_submit_twice_or_for_someone_else() {
        let svc = test_service().await;
        let teacher = seed_account(&svc, "t@example.com", Role::Teacher).await;
        let student = seed_account(&svc, "s@example.com", Role::Student).await;
        let other = seed_account(&svc, "o@example.com", Role::Student).await;
        let test = seed_test(&svc, &teacher, 1).await;
        let (submission, _) = svc.start_submission(&identity_of(&student), &test.id).await.unwrap();

        let err = svc
            .submit_answers(&other.id, &submission.id, vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Core(CoreError::Forbidden(_))));

        svc.submit_answers(&student.id, &submission.id, vec![])
            .await
            .unwrap();
        let err = svc
            .submit_answers(&student.id, &submission.id, vec![])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DatabaseError::Core(CoreError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn foreign_and_duplicate_answers_are_rejected() {
        let svc = test_service().await;
        let teacher = seed_account(&svc, "t@example.com", Role::Teacher).await;
        let student = seed_account(&svc, "s@example.com", Role::Student).await;
        let test = seed_test(&svc, &teacher, 2).await;
        let other_test = seed_test(&svc, &teacher, 1).await;
        let detail = svc
            .get_test_detail(&identity_of(&teacher), &test.id)
            .await
            .unwrap();
        let other_detail = svc
            .get_test_detail(&identity_of(&teacher), &other_test.id)
            .await
            .unwrap();
        let (submission, _) = svc.start_submission(&identity_of(&student), &test.id).await.unwrap();

        let foreign_question = svc
            .submit_answers(&student.id, &submission.id, vec![answer(&other_detail, 0, "A")])
            .await;
        assert!(foreign_question.is_err());

        let mut wrong_choice = answer(&detail, 0, "A");
        wrong_choice.choice_id = answer(&detail, 1, "A").choice_id;
        assert!(
            svc.submit_answers(&student.id, &submission.id, vec![wrong_choice])
                .await
                .is_err()
        );

        let duplicate = svc
            .submit_answers(
                &student.id,
                &submission.id,
                vec![answer(&detail, 0, "A"), answer(&detail, 0, "B")],
            )
            .await;
        assert!(duplicate.is_err());

        // Still open after rejected attempts.
        let current = svc.get_submission(&submission.id).await.unwrap();
        assert_eq!(current.status, SubmissionStatus::InProgress);
    }

    #[tokio::test]
    async fn abandon_only_in_progress() {
        let svc = test_service().await;
        let teacher = seed_account(&svc, "t@example.com", Role::Teacher).await;
        let student = seed_account(&svc, "s@example.com", Role::Student).await;
        let test = seed_test(&svc, &teacher, 1).await;
        let (submission, _) = svc.start_submission(&identity_of(&student), &test.id).await.unwrap();

        assert!(svc.abandon_submission(&submission.id).await.unwrap());
        assert!(!svc.abandon_submission(&submission.id).await.unwrap());
        let err = svc
            .submit_answers(&student.id, &submission.id, vec![])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DatabaseError::Core(CoreError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn leaderboard_keeps_best_score() {
        let svc = test_service().await;
        let teacher = seed_account(&svc, "t@example.com", Role::Teacher).await;
        let alice = seed_account(&svc, "alice@example.com", Role::Student).await;
        let bob = seed_account(&svc, "bob@example.com", Role::Student).await;
        let test = seed_test(&svc, &teacher, 2).await;
        let detail = svc
            .get_test_detail(&identity_of(&teacher), &test.id)
            .await
            .unwrap();

        let (s, _) = svc.start_submission(&identity_of(&alice), &test.id).await.unwrap();
        svc.submit_answers(&alice.id, &s.id, vec![answer(&detail, 0, "A")])
            .await
            .unwrap();
        let (s, _) = svc.start_submission(&identity_of(&alice), &test.id).await.unwrap();
        svc.submit_answers(
            &alice.id,
            &s.id,
            vec![answer(&detail, 0, "A"), answer(&detail, 1, "A")],
        )
        .await
        .unwrap();
        let (s, _) = svc.start_submission(&identity_of(&bob), &test.id).await.unwrap();
        svc.submit_answers(&bob.id, &s.id, vec![]).await.unwrap();

        let board = svc.leaderboard(&test.id, 10).await.unwrap();
        assert_eq!(board.len(), 2);
        assert_eq!(board[0].student_id, alice.id);
        assert!((board[0].best_score - 100.0).abs() < f64::EPSILON);
        assert_eq!(board[0].attempts, 2);
        assert_eq!(board[1].student_id, bob.id);

        let listed = svc
            .list_test_submissions(&identity_of(&teacher), &test.id, Paging::default())
            .await
            .unwrap();
        assert_eq!(listed.total, 3);
        let err = svc
            .list_test_submissions(&identity_of(&bob), &test.id, Paging::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Core(CoreError::Forbidden(_))));
    }
}

//! Payments, their status machine, and the purchase ledger.
//!
//! A payment leaves `pending` exactly once. Reaching `success` writes a
//! purchase transaction and enrolls the buyer in the same database
//! transaction as the status change.

use chrono::Utc;

use lex_core::entities::{Payment, Transaction};
use lex_core::enums::{PaymentStatus, TransactionKind};
use lex_core::errors::CoreError;
use lex_core::identity::AuthIdentity;
use lex_core::ids::{PREFIX_PAYMENT, PREFIX_TRANSACTION};
use lex_core::responses::Page;

use crate::error::DatabaseError;
use crate::helpers::{
    collect_rows, format_datetime, get_opt_string, parse_datetime, parse_enum, require_text,
};
use crate::paging::Paging;
use crate::service::LexService;

const SELECT_COLS: &str = "id, account_id, classroom_id, order_code, amount, description, \
     status, checkout_url, created_at, updated_at";
const TXN_COLS: &str = "id, account_id, payment_id, amount, kind, created_at";

/// Attempts at drawing a fresh order code before giving up.
const ORDER_CODE_ATTEMPTS: usize = 3;

fn row_to_payment(row: &libsql::Row) -> Result<Payment, DatabaseError> {
    Ok(Payment {
        id: row.get(0)?,
        account_id: row.get(1)?,
        classroom_id: get_opt_string(row, 2)?,
        order_code: row.get(3)?,
        amount: row.get(4)?,
        description: row.get(5)?,
        status: parse_enum(&row.get::<String>(6)?)?,
        checkout_url: get_opt_string(row, 7)?,
        created_at: parse_datetime(&row.get::<String>(8)?)?,
        updated_at: parse_datetime(&row.get::<String>(9)?)?,
    })
}

fn row_to_transaction(row: &libsql::Row) -> Result<Transaction, DatabaseError> {
    Ok(Transaction {
        id: row.get(0)?,
        account_id: row.get(1)?,
        payment_id: get_opt_string(row, 2)?,
        amount: row.get(3)?,
        kind: parse_enum(&row.get::<String>(4)?)?,
        created_at: parse_datetime(&row.get::<String>(5)?)?,
    })
}

impl LexService {
    /// Create a pending payment with a fresh order code.
    pub async fn create_payment(
        &self,
        account_id: &str,
        classroom_id: Option<&str>,
        amount: i64,
        description: &str,
    ) -> Result<Payment, DatabaseError> {
        if amount <= 0 {
            return Err(DatabaseError::validation("amount must be positive"));
        }
        let description = require_text("description", description)?;

        let _guard = self.write_lock().await;
        let mut last_err = DatabaseError::NoResult;
        for _ in 0..ORDER_CODE_ATTEMPTS {
            let id = self.db().generate_id(PREFIX_PAYMENT).await?;
            let order_code = self.db().generate_order_code().await?;
            let now = Utc::now();
            let inserted = self
                .conn()
                .execute(
                    "INSERT INTO payments (id, account_id, classroom_id, order_code, amount,
                                           description, status, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'pending', ?7, ?7)",
                    libsql::params![
                        id.as_str(),
                        account_id,
                        classroom_id,
                        order_code,
                        amount,
                        description.as_str(),
                        format_datetime(&now)
                    ],
                )
                .await;
            match inserted {
                Ok(_) => {
                    tracing::info!(payment_id = %id, order_code, amount, "payment created");
                    return Ok(Payment {
                        id,
                        account_id: account_id.to_string(),
                        classroom_id: classroom_id.map(str::to_string),
                        order_code,
                        amount,
                        description,
                        status: PaymentStatus::Pending,
                        checkout_url: None,
                        created_at: now,
                        updated_at: now,
                    });
                }
                Err(e) => {
                    let err = DatabaseError::from(e).on_unique("order code collision");
                    if !matches!(err, DatabaseError::Core(CoreError::Conflict(_))) {
                        return Err(err);
                    }
                    tracing::debug!(order_code, "order code collided, drawing another");
                    last_err = err;
                }
            }
        }
        Err(last_err)
    }

    /// Create a pending payment for joining a paid classroom.
    pub async fn create_classroom_payment(
        &self,
        account_id: &str,
        classroom_id: &str,
    ) -> Result<Payment, DatabaseError> {
        let classroom = self.get_classroom(classroom_id).await?;
        if classroom.is_free() {
            return Err(DatabaseError::validation(
                "this classroom is free, join it directly",
            ));
        }
        if classroom.teacher_id == account_id {
            return Err(DatabaseError::validation(
                "a teacher cannot buy their own classroom",
            ));
        }
        if self.is_enrolled(classroom_id, account_id).await? {
            return Err(DatabaseError::conflict("already a member of this classroom"));
        }
        self.create_payment(
            account_id,
            Some(classroom_id),
            classroom.price,
            &format!("Join {}", classroom.name),
        )
        .await
    }

    pub async fn set_checkout_url(&self, id: &str, url: &str) -> Result<Payment, DatabaseError> {
        {
            let _guard = self.write_lock().await;
            let updated = self
                .conn()
                .execute(
                    "UPDATE payments SET checkout_url = ?2, updated_at = ?3 WHERE id = ?1",
                    libsql::params![id, url, format_datetime(&Utc::now())],
                )
                .await?;
            if updated == 0 {
                return Err(DatabaseError::not_found("payment", id));
            }
        }
        self.get_payment(id).await
    }

    pub async fn get_payment(&self, id: &str) -> Result<Payment, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {SELECT_COLS} FROM payments WHERE id = ?1"),
                [id],
            )
            .await?;
        let row = rows
            .next()
            .await?
            .ok_or_else(|| DatabaseError::not_found("payment", id))?;
        row_to_payment(&row)
    }

    pub async fn get_payment_by_order_code(
        &self,
        order_code: i64,
    ) -> Result<Payment, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {SELECT_COLS} FROM payments WHERE order_code = ?1"),
                [order_code],
            )
            .await?;
        let row = rows
            .next()
            .await?
            .ok_or_else(|| DatabaseError::not_found("payment", order_code.to_string()))?;
        row_to_payment(&row)
    }

    /// Get a payment visible to `identity` (the payer or an admin).
    pub async fn get_payment_for(
        &self,
        identity: &AuthIdentity,
        id: &str,
    ) -> Result<Payment, DatabaseError> {
        let payment = self.get_payment(id).await?;
        if !identity.owns_or_admin(&payment.account_id) {
            return Err(DatabaseError::forbidden("not your payment"));
        }
        Ok(payment)
    }

    /// List payments, newest first. `None` lists every account's payments.
    pub async fn list_payments(
        &self,
        account_id: Option<&str>,
        paging: Paging,
    ) -> Result<Page<Payment>, DatabaseError> {
        let (total, rows) = match account_id {
            Some(account_id) => {
                let total = self
                    .query_count(
                        "SELECT COUNT(*) FROM payments WHERE account_id = ?1",
                        [account_id],
                    )
                    .await?;
                let rows = self
                    .conn()
                    .query(
                        &format!(
                            "SELECT {SELECT_COLS} FROM payments WHERE account_id = ?1
                             ORDER BY created_at DESC LIMIT ?2 OFFSET ?3"
                        ),
                        libsql::params![account_id, paging.limit(), paging.offset()],
                    )
                    .await?;
                (total, rows)
            }
            None => {
                let total = self.query_count("SELECT COUNT(*) FROM payments", ()).await?;
                let rows = self
                    .conn()
                    .query(
                        &format!(
                            "SELECT {SELECT_COLS} FROM payments
                             ORDER BY created_at DESC LIMIT ?1 OFFSET ?2"
                        ),
                        libsql::params![paging.limit(), paging.offset()],
                    )
                    .await?;
                (total, rows)
            }
        };
        Ok(paging.page(collect_rows(rows, row_to_payment).await?, total))
    }

    /// Move a payment to `next`.
    ///
    /// Returns the payment and whether anything changed. Repeating the status
    /// a payment already reached is a no-op, so a re-delivered webhook is
    /// harmless. On `success` the purchase is recorded and the buyer enrolled
    /// atomically with the status change.
    pub async fn transition_payment(
        &self,
        order_code: i64,
        next: PaymentStatus,
    ) -> Result<(Payment, bool), DatabaseError> {
        let tx = self.begin_write().await?;
        let result = self.apply_transition(order_code, next).await;
        let (payment, changed) = tx.finish(result).await?;
        if changed {
            tracing::info!(
                payment_id = %payment.id,
                order_code,
                status = %payment.status,
                "payment status changed"
            );
        } else {
            tracing::debug!(order_code, status = %next, "payment already in requested status");
        }
        Ok((payment, changed))
    }

    async fn apply_transition(
        &self,
        order_code: i64,
        next: PaymentStatus,
    ) -> Result<(Payment, bool), DatabaseError> {
        let mut payment = self.get_payment_by_order_code(order_code).await?;
        if payment.status == next && next.is_terminal() {
            return Ok((payment, false));
        }
        if !payment.status.can_transition_to(next) {
            return Err(CoreError::InvalidTransition {
                entity_type: "payment".into(),
                id: payment.id,
                from: payment.status.to_string(),
                to: next.to_string(),
            }
            .into());
        }

        let now = Utc::now();
        let updated = self
            .conn()
            .execute(
                "UPDATE payments SET status = ?2, updated_at = ?3 WHERE id = ?1 AND status = 'pending'",
                libsql::params![payment.id.as_str(), next.as_str(), format_datetime(&now)],
            )
            .await?;
        if updated == 0 {
            return Err(DatabaseError::InvalidState(format!(
                "payment {} left pending concurrently",
                payment.id
            )));
        }

        if next == PaymentStatus::Success {
            let txn_id = self.db().generate_id(PREFIX_TRANSACTION).await?;
            self.conn()
                .execute(
                    "INSERT INTO transactions (id, account_id, payment_id, amount, kind, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    libsql::params![
                        txn_id.as_str(),
                        payment.account_id.as_str(),
                        payment.id.as_str(),
                        payment.amount,
                        TransactionKind::Purchase.as_str(),
                        format_datetime(&now)
                    ],
                )
                .await?;
            if let Some(ref classroom_id) = payment.classroom_id {
                self.insert_enrollment(classroom_id, &payment.account_id)
                    .await?;
            }
        }

        payment.status = next;
        payment.updated_at = now;
        Ok((payment, true))
    }

    /// Cancel a pending payment on behalf of its payer (or an admin).
    pub async fn cancel_payment(
        &self,
        identity: &AuthIdentity,
        id: &str,
    ) -> Result<Payment, DatabaseError> {
        let payment = self.get_payment_for(identity, id).await?;
        let (payment, _) = self
            .transition_payment(payment.order_code, PaymentStatus::Cancelled)
            .await?;
        Ok(payment)
    }

    /// List ledger entries, newest first. `None` lists every account's entries.
    pub async fn list_transactions(
        &self,
        account_id: Option<&str>,
        paging: Paging,
    ) -> Result<Page<Transaction>, DatabaseError> {
        let (total, rows) = match account_id {
            Some(account_id) => {
                let total = self
                    .query_count(
                        "SELECT COUNT(*) FROM transactions WHERE account_id = ?1",
                        [account_id],
                    )
                    .await?;
                let rows = self
                    .conn()
                    .query(
                        &format!(
                            "SELECT {TXN_COLS} FROM transactions WHERE account_id = ?1
                             ORDER BY created_at DESC LIMIT ?2 OFFSET ?3"
                        ),
                        libsql::params![account_id, paging.limit(), paging.offset()],
                    )
                    .await?;
                (total, rows)
            }
            None => {
                let total = self
                    .query_count("SELECT COUNT(*) FROM transactions", ())
                    .await?;
                let rows = self
                    .conn()
                    .query(
                        &format!(
                            "SELECT {TXN_COLS} FROM transactions
                             ORDER BY created_at DESC LIMIT ?1 OFFSET ?2"
                        ),
                        libsql::params![paging.limit(), paging.offset()],
                    )
                    .await?;
                (total, rows)
            }
        };
        Ok(paging.page(collect_rows(rows, row_to_transaction).await?, total))
    }
}

#[cfg(test)]
mod tests {
    use lex_core::enums::Role;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use crate::test_support::helpers::{identity_of, seed_account, seed_classroom, test_service};

    use super::*;

    #[tokio::test]
    async fn success_records_purchase_and_enrolls() {
        let svc = test_service().await;
        let teacher = seed_account(&svc, "t@example.com", Role::Teacher).await;
        let student = seed_account(&svc, "s@example.com", Role::Student).await;
        let classroom = seed_classroom(&svc, &teacher, 199_000).await;

        let payment = svc
            .create_classroom_payment(&student.id, &classroom.id)
            .await
            .unwrap();
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert_eq!(payment.amount, 199_000);
        assert!(!svc.is_enrolled(&classroom.id, &student.id).await.unwrap());

        let (paid, changed) = svc
            .transition_payment(payment.order_code, PaymentStatus::Success)
            .await
            .unwrap();
        assert!(changed);
        assert_eq!(paid.status, PaymentStatus::Success);
        assert!(svc.is_enrolled(&classroom.id, &student.id).await.unwrap());

        let ledger = svc
            .list_transactions(Some(&student.id), Paging::default())
            .await
            .unwrap();
        assert_eq!(ledger.total, 1);
        assert_eq!(ledger.items[0].kind, TransactionKind::Purchase);
        assert_eq!(ledger.items[0].amount, 199_000);
    }

    #[tokio::test]
    async fn repeated_webhook_is_a_noop() {
        let svc = test_service().await;
        let teacher = seed_account(&svc, "t@example.com", Role::Teacher).await;
        let student = seed_account(&svc, "s@example.com", Role::Student).await;
        let classroom = seed_classroom(&svc, &teacher, 50_000).await;
        let payment = svc
            .create_classroom_payment(&student.id, &classroom.id)
            .await
            .unwrap();

        svc.transition_payment(payment.order_code, PaymentStatus::Success)
            .await
            .unwrap();
        let (again, changed) = svc
            .transition_payment(payment.order_code, PaymentStatus::Success)
            .await
            .unwrap();
        assert!(!changed);
        assert_eq!(again.status, PaymentStatus::Success);

        let ledger = svc.list_transactions(None, Paging::default()).await.unwrap();
        assert_eq!(ledger.total, 1);
    }

    #[rstest]
    #[case(PaymentStatus::Success, PaymentStatus::Cancelled)]
    #[case(PaymentStatus::Cancelled, PaymentStatus::Success)]
    #[case(PaymentStatus::Failed, PaymentStatus::Pending)]
    #[tokio::test]
    async fn terminal_payments_do_not_move(
        #[case] first: PaymentStatus,
        #[case] then: PaymentStatus,
    ) {
        let svc = test_service().await;
        let student = seed_account(&svc, "s@example.com", Role::Student).await;
        let payment = svc
            .create_payment(&student.id, None, 10_000, "Top up")
            .await
            .unwrap();
        svc.transition_payment(payment.order_code, first)
            .await
            .unwrap();

        let err = svc
            .transition_payment(payment.order_code, then)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DatabaseError::Core(CoreError::InvalidTransition { .. })
        ));
        assert_eq!(
            svc.get_payment(&payment.id).await.unwrap().status,
            first
        );
    }

    #[tokio::test]
    async fn free_or_owned_classrooms_cannot_be_bought() {
        let svc = test_service().await;
        let teacher = seed_account(&svc, "t@example.com", Role::Teacher).await;
        let free = seed_classroom(&svc, &teacher, 0).await;
        let paid = seed_classroom(&svc, &teacher, 10_000).await;

        assert!(svc.create_classroom_payment(&teacher.id, &free.id).await.is_err());
        let err = svc
            .create_classroom_payment(&teacher.id, &paid.id)
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Core(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn payer_cancels_but_others_cannot() {
        let svc = test_service().await;
        let student = seed_account(&svc, "s@example.com", Role::Student).await;
        let other = seed_account(&svc, "o@example.com", Role::Student).await;
        let payment = svc
            .create_payment(&student.id, None, 10_000, "Top up")
            .await
            .unwrap();

        let err = svc
            .cancel_payment(&identity_of(&other), &payment.id)
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Core(CoreError::Forbidden(_))));

        let cancelled = svc
            .cancel_payment(&identity_of(&student), &payment.id)
            .await
            .unwrap();
        assert_eq!(cancelled.status, PaymentStatus::Cancelled);
    }

    #[tokio::test]
    async fn checkout_url_and_order_code_lookup() {
        let svc = test_service().await;
        let student = seed_account(&svc, "s@example.com", Role::Student).await;
        let payment = svc
            .create_payment(&student.id, None, 10_000, "Top up")
            .await
            .unwrap();
        svc.set_checkout_url(&payment.id, "https://pay.example/c/1")
            .await
            .unwrap();

        let found = svc
            .get_payment_by_order_code(payment.order_code)
            .await
            .unwrap();
        assert_eq!(found.checkout_url.as_deref(), Some("https://pay.example/c/1"));
        assert!(svc.get_payment_by_order_code(-1).await.is_err());
        assert!(svc.create_payment(&student.id, None, 0, "Nothing").await.is_err());
    }
}

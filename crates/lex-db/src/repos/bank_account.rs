//! Payout bank accounts. At most one default per owner, enforced by a
//! partial unique index.

use chrono::Utc;

use lex_core::entities::BankAccount;
use lex_core::identity::AuthIdentity;
use lex_core::ids::PREFIX_BANK_ACCOUNT;

use crate::error::DatabaseError;
use crate::helpers::{collect_rows, format_datetime, get_bool, parse_datetime, require_text};
use crate::inputs::NewBankAccount;
use crate::service::LexService;

const SELECT_COLS: &str =
    "id, owner_id, bank_name, account_number, holder_name, is_default, created_at";

fn row_to_bank_account(row: &libsql::Row) -> Result<BankAccount, DatabaseError> {
    Ok(BankAccount {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        bank_name: row.get(2)?,
        account_number: row.get(3)?,
        holder_name: row.get(4)?,
        is_default: get_bool(row, 5)?,
        created_at: parse_datetime(&row.get::<String>(6)?)?,
    })
}

impl LexService {
    /// Register a bank account. The owner's first account becomes the default.
    pub async fn create_bank_account(
        &self,
        owner_id: &str,
        input: NewBankAccount,
    ) -> Result<BankAccount, DatabaseError> {
        let bank_name = require_text("bank_name", &input.bank_name)?;
        let holder_name = require_text("holder_name", &input.holder_name)?;
        let account_number = require_text("account_number", &input.account_number)?;
        if !account_number.chars().all(|c| c.is_ascii_digit()) {
            return Err(DatabaseError::validation(
                "account_number must contain digits only",
            ));
        }

        let tx = self.begin_write().await?;
        let result = async {
            let existing = self
                .query_count(
                    "SELECT COUNT(*) FROM bank_accounts WHERE owner_id = ?1",
                    [owner_id],
                )
                .await?;
            let is_default = existing == 0;
            let id = self.db().generate_id(PREFIX_BANK_ACCOUNT).await?;
            let now = Utc::now();
            self.conn()
                .execute(
                    "INSERT INTO bank_accounts (id, owner_id, bank_name, account_number,
                                                holder_name, is_default, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    libsql::params![
                        id.as_str(),
                        owner_id,
                        bank_name.as_str(),
                        account_number.as_str(),
                        holder_name.as_str(),
                        i64::from(is_default),
                        format_datetime(&now)
                    ],
                )
                .await?;
            Ok(BankAccount {
                id,
                owner_id: owner_id.to_string(),
                bank_name: bank_name.clone(),
                account_number: account_number.clone(),
                holder_name: holder_name.clone(),
                is_default,
                created_at: now,
            })
        }
        .await;
        tx.finish(result).await
    }

    /// The owner's accounts, default first.
    pub async fn list_bank_accounts(
        &self,
        owner_id: &str,
    ) -> Result<Vec<BankAccount>, DatabaseError> {
        let rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM bank_accounts WHERE owner_id = ?1
                     ORDER BY is_default DESC, created_at"
                ),
                [owner_id],
            )
            .await?;
        collect_rows(rows, row_to_bank_account).await
    }

    async fn owned_bank_account(
        &self,
        identity: &AuthIdentity,
        id: &str,
    ) -> Result<BankAccount, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {SELECT_COLS} FROM bank_accounts WHERE id = ?1"),
                [id],
            )
            .await?;
        let row = rows
            .next()
            .await?
            .ok_or_else(|| DatabaseError::not_found("bank account", id))?;
        let account = row_to_bank_account(&row)?;
        if !identity.owns_or_admin(&account.owner_id) {
            return Err(DatabaseError::forbidden("not your bank account"));
        }
        Ok(account)
    }

    /// Make `id` the owner's default account.
    pub async fn set_default_bank_account(
        &self,
        identity: &AuthIdentity,
        id: &str,
    ) -> Result<BankAccount, DatabaseError> {
        let mut account = self.owned_bank_account(identity, id).await?;
        if account.is_default {
            return Ok(account);
        }

        let tx = self.begin_write().await?;
        let result = async {
            self.conn()
                .execute(
                    "UPDATE bank_accounts SET is_default = 0 WHERE owner_id = ?1 AND is_default = 1",
                    [account.owner_id.as_str()],
                )
                .await?;
            self.conn()
                .execute("UPDATE bank_accounts SET is_default = 1 WHERE id = ?1", [id])
                .await?;
            Ok(())
        }
        .await;
        tx.finish(result).await?;

        account.is_default = true;
        Ok(account)
    }

    /// Delete an account. When it was the default, the oldest remaining one
    /// takes over.
    pub async fn delete_bank_account(
        &self,
        identity: &AuthIdentity,
        id: &str,
    ) -> Result<(), DatabaseError> {
        let account = self.owned_bank_account(identity, id).await?;

        let tx = self.begin_write().await?;
        let result = async {
            self.conn()
                .execute("DELETE FROM bank_accounts WHERE id = ?1", [id])
                .await?;
            if account.is_default {
                self.conn()
                    .execute(
                        "UPDATE bank_accounts SET is_default = 1
                         WHERE id = (SELECT id FROM bank_accounts WHERE owner_id = ?1
                                     ORDER BY created_at LIMIT 1)",
                        [account.owner_id.as_str()],
                    )
                    .await?;
            }
            Ok(())
        }
        .await;
        tx.finish(result).await
    }
}

//! Account repository: registration, lookup, profile and admin changes.

use chrono::Utc;

use lex_core::entities::Account;
use lex_core::enums::Role;
use lex_core::ids::PREFIX_ACCOUNT;
use lex_core::responses::Page;

use crate::error::DatabaseError;
use crate::helpers::{
    collect_rows, format_datetime, get_bool, get_opt_string, nullable, parse_datetime, parse_enum,
    require_text,
};
use crate::paging::Paging;
use crate::service::LexService;
use crate::updates::SetClause;
use crate::updates::account::AccountUpdate;

const SELECT_COLS: &str =
    "id, email, full_name, role, avatar_url, phone, is_active, created_at, updated_at";

/// Same columns qualified with the `a` alias, for joins.
pub(crate) const JOINED_COLS: &str = "a.id, a.email, a.full_name, a.role, a.avatar_url, a.phone, \
     a.is_active, a.created_at, a.updated_at";

pub(crate) fn row_to_account(row: &libsql::Row) -> Result<Account, DatabaseError> {
    Ok(Account {
        id: row.get(0)?,
        email: row.get(1)?,
        full_name: row.get(2)?,
        role: parse_enum(&row.get::<String>(3)?)?,
        avatar_url: get_opt_string(row, 4)?,
        phone: get_opt_string(row, 5)?,
        is_active: get_bool(row, 6)?,
        created_at: parse_datetime(&row.get::<String>(7)?)?,
        updated_at: parse_datetime(&row.get::<String>(8)?)?,
    })
}

/// Normalize an email for storage and lookup.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl LexService {
    /// Insert a new account. The email is lowercased; a taken email is a `Conflict`.
    pub async fn create_account(
        &self,
        email: &str,
        password_hash: &str,
        full_name: &str,
        role: Role,
    ) -> Result<Account, DatabaseError> {
        let email = normalize_email(email);
        if !email.contains('@') {
            return Err(DatabaseError::validation("email is not valid"));
        }
        let full_name = require_text("full_name", full_name)?;
        let now = Utc::now();
        let _guard = self.write_lock().await;
        let id = self.db().generate_id(PREFIX_ACCOUNT).await?;

        self.conn()
            .execute(
                "INSERT INTO accounts (id, email, password_hash, full_name, role, is_active, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?6)",
                libsql::params![
                    id.as_str(),
                    email.as_str(),
                    password_hash,
                    full_name.as_str(),
                    role.as_str(),
                    format_datetime(&now)
                ],
            )
            .await
            .map_err(|e| DatabaseError::from(e).on_unique("email is already registered"))?;

        tracing::info!(account_id = %id, role = %role, "account created");
        Ok(Account {
            id,
            email,
            full_name,
            role,
            avatar_url: None,
            phone: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn get_account(&self, id: &str) -> Result<Account, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {SELECT_COLS} FROM accounts WHERE id = ?1"),
                [id],
            )
            .await?;
        let row = rows
            .next()
            .await?
            .ok_or_else(|| DatabaseError::not_found("account", id))?;
        row_to_account(&row)
    }

    pub async fn get_account_by_email(&self, email: &str) -> Result<Option<Account>, DatabaseError> {
        Ok(self
            .get_credentials_by_email(email)
            .await?
            .map(|(account, _)| account))
    }

    /// Account plus its password hash, for login.
    pub async fn get_credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Option<(Account, String)>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {SELECT_COLS}, password_hash FROM accounts WHERE email = ?1"),
                [normalize_email(email)],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some((row_to_account(&row)?, row.get::<String>(9)?))),
            None => Ok(None),
        }
    }

    pub async fn get_password_hash(&self, id: &str) -> Result<String, DatabaseError> {
        let mut rows = self
            .conn()
            .query("SELECT password_hash FROM accounts WHERE id = ?1", [id])
            .await?;
        let row = rows
            .next()
            .await?
            .ok_or_else(|| DatabaseError::not_found("account", id))?;
        Ok(row.get::<String>(0)?)
    }

    pub async fn list_accounts(
        &self,
        role: Option<Role>,
        paging: Paging,
    ) -> Result<Page<Account>, DatabaseError> {
        let role = role.map(Role::as_str);
        let total = self
            .query_count(
                "SELECT COUNT(*) FROM accounts WHERE (?1 IS NULL OR role = ?1)",
                libsql::params![role],
            )
            .await?;
        let rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM accounts WHERE (?1 IS NULL OR role = ?1)
                     ORDER BY created_at DESC LIMIT ?2 OFFSET ?3"
                ),
                libsql::params![role, paging.limit(), paging.offset()],
            )
            .await?;
        Ok(paging.page(collect_rows(rows, row_to_account).await?, total))
    }

    pub async fn update_account(
        &self,
        id: &str,
        update: AccountUpdate,
    ) -> Result<Account, DatabaseError> {
        let mut set = SetClause::default();
        if let Some(ref full_name) = update.full_name {
            set.push("full_name", require_text("full_name", full_name)?);
        }
        if let Some(ref phone) = update.phone {
            set.push("phone", nullable(phone.as_deref()));
        }
        if set.is_empty() {
            return self.get_account(id).await;
        }
        self.apply_account_update(id, set).await
    }

    pub async fn set_avatar(&self, id: &str, url: &str) -> Result<Account, DatabaseError> {
        let mut set = SetClause::default();
        set.push("avatar_url", url);
        self.apply_account_update(id, set).await
    }

    pub async fn set_password_hash(&self, id: &str, hash: &str) -> Result<(), DatabaseError> {
        let mut set = SetClause::default();
        set.push("password_hash", hash);
        self.apply_account_update(id, set).await?;
        tracing::info!(account_id = %id, "password changed");
        Ok(())
    }

    pub async fn set_role(&self, id: &str, role: Role) -> Result<Account, DatabaseError> {
        let mut set = SetClause::default();
        set.push("role", role.as_str());
        let account = self.apply_account_update(id, set).await?;
        tracing::info!(account_id = %id, role = %role, "role changed");
        Ok(account)
    }

    pub async fn set_active(&self, id: &str, active: bool) -> Result<Account, DatabaseError> {
        let mut set = SetClause::default();
        set.push("is_active", i64::from(active));
        let account = self.apply_account_update(id, set).await?;
        tracing::info!(account_id = %id, active, "account activation changed");
        Ok(account)
    }

    async fn apply_account_update(
        &self,
        id: &str,
        mut set: SetClause,
    ) -> Result<Account, DatabaseError> {
        set.push("updated_at", format_datetime(&Utc::now()));
        let (sql, params) = set.into_update("accounts", id);
        let changed = {
            let _guard = self.write_lock().await;
            self.conn()
                .execute(&sql, libsql::params_from_iter(params))
                .await?
        };
        if changed == 0 {
            return Err(DatabaseError::not_found("account", id));
        }
        self.get_account(id).await
    }
}

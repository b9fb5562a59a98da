//! Update builder types for entity mutations.
//!
//! Each builder produces an update struct with `Option` fields. Only `Some`
//! fields generate SET clauses in the dynamic UPDATE SQL. Nullable columns use
//! `Option<Option<T>>`: outer `None` leaves the column alone, `Some(None)`
//! clears it.

pub mod account;
pub mod classroom;
pub mod flashcard;
pub mod lesson;
pub mod test;

use serde::{Deserialize, Deserializer};

/// Deserialize a present field (including `null`) as `Some(..)`.
///
/// Paired with `#[serde(default)]` so a missing field stays `None`.
pub(crate) fn double_option<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

/// Accumulates `column = ?N` fragments and their bind values.
#[derive(Default)]
pub(crate) struct SetClause {
    sets: Vec<String>,
    params: Vec<libsql::Value>,
}

impl SetClause {
    pub(crate) fn push(&mut self, column: &str, value: impl Into<libsql::Value>) {
        self.params.push(value.into());
        self.sets.push(format!("{column} = ?{}", self.params.len()));
    }

    pub(crate) const fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Finish as `UPDATE {table} SET ... WHERE id = ?N`.
    pub(crate) fn into_update(mut self, table: &str, id: &str) -> (String, Vec<libsql::Value>) {
        self.params.push(id.to_string().into());
        let sql = format!(
            "UPDATE {table} SET {} WHERE id = ?{}",
            self.sets.join(", "),
            self.params.len()
        );
        (sql, self.params)
    }
}

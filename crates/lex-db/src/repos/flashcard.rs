//! Flashcard sets and their cards.

use chrono::Utc;

use lex_core::entities::{Flashcard, FlashcardSet};
use lex_core::identity::AuthIdentity;
use lex_core::ids::{PREFIX_FLASHCARD, PREFIX_FLASHCARD_SET};
use lex_core::responses::{FlashcardSetDetail, Page};

use crate::error::DatabaseError;
use crate::helpers::{
    collect_rows, format_datetime, get_opt_string, nullable, parse_datetime, require_text,
};
use crate::inputs::{NewFlashcard, NewFlashcardSet};
use crate::paging::Paging;
use crate::service::LexService;
use crate::updates::SetClause;
use crate::updates::flashcard::FlashcardSetUpdate;

const SET_COLS: &str = "id, owner_id, title, description, created_at, updated_at";
const CARD_COLS: &str = "id, set_id, front, back, example, position";

fn row_to_set(row: &libsql::Row) -> Result<FlashcardSet, DatabaseError> {
    Ok(FlashcardSet {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        title: row.get(2)?,
        description: get_opt_string(row, 3)?,
        created_at: parse_datetime(&row.get::<String>(4)?)?,
        updated_at: parse_datetime(&row.get::<String>(5)?)?,
    })
}

fn row_to_card(row: &libsql::Row) -> Result<Flashcard, DatabaseError> {
    Ok(Flashcard {
        id: row.get(0)?,
        set_id: row.get(1)?,
        front: row.get(2)?,
        back: row.get(3)?,
        example: get_opt_string(row, 4)?,
        position: row.get(5)?,
    })
}

fn validate_cards(cards: &[NewFlashcard]) -> Result<(), DatabaseError> {
    for (i, card) in cards.iter().enumerate() {
        if card.front.trim().is_empty() || card.back.trim().is_empty() {
            return Err(DatabaseError::validation(format!(
                "card {} needs both front and back",
                i + 1
            )));
        }
    }
    Ok(())
}

impl LexService {
    /// Create a set and its cards in one transaction.
    pub async fn create_flashcard_set(
        &self,
        owner_id: &str,
        input: NewFlashcardSet,
    ) -> Result<FlashcardSetDetail, DatabaseError> {
        let title = require_text("title", &input.title)?;
        validate_cards(&input.cards)?;
        let now = Utc::now();

        let tx = self.begin_write().await?;
        let result = async {
            let id = self.db().generate_id(PREFIX_FLASHCARD_SET).await?;
            self.conn()
                .execute(
                    "INSERT INTO flashcard_sets (id, owner_id, title, description, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                    libsql::params![
                        id.as_str(),
                        owner_id,
                        title.as_str(),
                        input.description.as_deref(),
                        format_datetime(&now)
                    ],
                )
                .await?;
            let cards = self.insert_cards(&id, 0, &input.cards).await?;
            Ok(FlashcardSetDetail {
                set: FlashcardSet {
                    id,
                    owner_id: owner_id.to_string(),
                    title: title.clone(),
                    description: input.description.clone(),
                    created_at: now,
                    updated_at: now,
                },
                cards,
            })
        }
        .await;
        tx.finish(result).await
    }

    async fn insert_cards(
        &self,
        set_id: &str,
        first_position: i64,
        cards: &[NewFlashcard],
    ) -> Result<Vec<Flashcard>, DatabaseError> {
        let mut out = Vec::with_capacity(cards.len());
        for (position, card) in (first_position..).zip(cards) {
            let id = self.db().generate_id(PREFIX_FLASHCARD).await?;
            self.conn()
                .execute(
                    "INSERT INTO flashcards (id, set_id, front, back, example, position)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    libsql::params![
                        id.as_str(),
                        set_id,
                        card.front.trim(),
                        card.back.trim(),
                        card.example.as_deref(),
                        position
                    ],
                )
                .await?;
            out.push(Flashcard {
                id,
                set_id: set_id.to_string(),
                front: card.front.trim().to_string(),
                back: card.back.trim().to_string(),
                example: card.example.clone(),
                position,
            });
        }
        Ok(out)
    }

    async fn load_flashcard_set(&self, id: &str) -> Result<FlashcardSet, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {SET_COLS} FROM flashcard_sets WHERE id = ?1"),
                [id],
            )
            .await?;
        let row = rows
            .next()
            .await?
            .ok_or_else(|| DatabaseError::not_found("flashcard set", id))?;
        row_to_set(&row)
    }

    async fn owned_flashcard_set(
        &self,
        identity: &AuthIdentity,
        id: &str,
    ) -> Result<FlashcardSet, DatabaseError> {
        let set = self.load_flashcard_set(id).await?;
        if !identity.owns_or_admin(&set.owner_id) {
            return Err(DatabaseError::forbidden("not your flashcard set"));
        }
        Ok(set)
    }

    pub async fn get_flashcard_set(
        &self,
        identity: &AuthIdentity,
        id: &str,
    ) -> Result<FlashcardSetDetail, DatabaseError> {
        let set = self.owned_flashcard_set(identity, id).await?;
        let rows = self
            .conn()
            .query(
                &format!("SELECT {CARD_COLS} FROM flashcards WHERE set_id = ?1 ORDER BY position"),
                [id],
            )
            .await?;
        let cards = collect_rows(rows, row_to_card).await?;
        Ok(FlashcardSetDetail { set, cards })
    }

    pub async fn list_flashcard_sets(
        &self,
        owner_id: &str,
        paging: Paging,
    ) -> Result<Page<FlashcardSet>, DatabaseError> {
        let total = self
            .query_count(
                "SELECT COUNT(*) FROM flashcard_sets WHERE owner_id = ?1",
                [owner_id],
            )
            .await?;
        let rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {SET_COLS} FROM flashcard_sets WHERE owner_id = ?1
                     ORDER BY updated_at DESC LIMIT ?2 OFFSET ?3"
                ),
                libsql::params![owner_id, paging.limit(), paging.offset()],
            )
            .await?;
        Ok(paging.page(collect_rows(rows, row_to_set).await?, total))
    }

    pub async fn update_flashcard_set(
        &self,
        identity: &AuthIdentity,
        id: &str,
        update: FlashcardSetUpdate,
    ) -> Result<FlashcardSet, DatabaseError> {
        let current = self.owned_flashcard_set(identity, id).await?;
        let mut set = SetClause::default();
        if let Some(ref title) = update.title {
            set.push("title", require_text("title", title)?);
        }
        if let Some(ref description) = update.description {
            set.push("description", nullable(description.as_deref()));
        }
        if set.is_empty() {
            return Ok(current);
        }
        set.push("updated_at", format_datetime(&Utc::now()));
        let (sql, params) = set.into_update("flashcard_sets", id);
        {
            let _guard = self.write_lock().await;
            self.conn()
                .execute(&sql, libsql::params_from_iter(params))
                .await?;
        }
        self.load_flashcard_set(id).await
    }

    pub async fn delete_flashcard_set(
        &self,
        identity: &AuthIdentity,
        id: &str,
    ) -> Result<(), DatabaseError> {
        self.owned_flashcard_set(identity, id).await?;
        let _guard = self.write_lock().await;
        self.conn()
            .execute("DELETE FROM flashcard_sets WHERE id = ?1", [id])
            .await?;
        Ok(())
    }

    /// Append cards to a set in one transaction.
    pub async fn add_flashcards(
        &self,
        identity: &AuthIdentity,
        set_id: &str,
        cards: Vec<NewFlashcard>,
    ) -> Result<Vec<Flashcard>, DatabaseError> {
        self.owned_flashcard_set(identity, set_id).await?;
        if cards.is_empty() {
            return Err(DatabaseError::validation("no cards given"));
        }
        validate_cards(&cards)?;

        let tx = self.begin_write().await?;
        let result = async {
            let next = self
                .query_count(
                    "SELECT COALESCE(MAX(position) + 1, 0) FROM flashcards WHERE set_id = ?1",
                    [set_id],
                )
                .await?;
            let inserted = self.insert_cards(set_id, next, &cards).await?;
            self.conn()
                .execute(
                    "UPDATE flashcard_sets SET updated_at = ?2 WHERE id = ?1",
                    libsql::params![set_id, format_datetime(&Utc::now())],
                )
                .await?;
            Ok(inserted)
        }
        .await;
        tx.finish(result).await
    }

    pub async fn delete_flashcard(
        &self,
        identity: &AuthIdentity,
        set_id: &str,
        card_id: &str,
    ) -> Result<(), DatabaseError> {
        self.owned_flashcard_set(identity, set_id).await?;
        let _guard = self.write_lock().await;
        let removed = self
            .conn()
            .execute(
                "DELETE FROM flashcards WHERE id = ?1 AND set_id = ?2",
                [card_id, set_id],
            )
            .await?;
        if removed == 0 {
            return Err(DatabaseError::not_found("flashcard", card_id));
        }
        Ok(())
    }
}

//! Repository modules implementing operations for all Lexora entities.
//!
//! Each module adds methods to `LexService` via `impl LexService` blocks.

pub mod account;
pub mod bank_account;
pub mod chat;
pub mod classroom;
pub mod classroom_test;
pub mod enrollment;
pub mod flashcard;
pub mod knowledge;
pub mod kv;
pub mod lesson;
pub mod payment;
pub mod rating;
pub mod report;
pub mod statistics;
pub mod submission;

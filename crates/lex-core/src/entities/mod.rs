//! Entity structs for all Lexora domain objects.
//!
//! Each entity maps to a table in the libSQL database (see
//! `lex-db/migrations/001_initial.sql`). All structs derive `Serialize`,
//! `Deserialize`, and `JsonSchema` for the JSON API.

mod account;
mod chat;
mod classroom;
mod flashcard;
mod knowledge;
mod lesson;
mod payment;
mod report;
mod submission;
mod test;

pub use account::Account;
pub use chat::{ChatSession, Message};
pub use classroom::{Classroom, ClassroomRating, ClassroomStudent};
pub use flashcard::{Flashcard, FlashcardSet};
pub use knowledge::KnowledgeChunk;
pub use lesson::Lesson;
pub use payment::{BankAccount, Payment, Transaction};
pub use report::Report;
pub use submission::{Answer, Submission};
pub use test::{Choice, Question, Test};

//! ID prefix constants.
//!
//! Every entity ID is `<prefix>-<8 hex chars>`, generated by the database
//! (see `LexDb::generate_id`).

pub const PREFIX_ACCOUNT: &str = "acc";
pub const PREFIX_CLASSROOM: &str = "cls";
pub const PREFIX_RATING: &str = "rat";
pub const PREFIX_LESSON: &str = "les";
pub const PREFIX_FLASHCARD_SET: &str = "fcs";
pub const PREFIX_FLASHCARD: &str = "fcd";
pub const PREFIX_TEST: &str = "tst";
pub const PREFIX_QUESTION: &str = "qst";
pub const PREFIX_CHOICE: &str = "chc";
pub const PREFIX_SUBMISSION: &str = "sub";
pub const PREFIX_ANSWER: &str = "ans";
pub const PREFIX_PAYMENT: &str = "pay";
pub const PREFIX_TRANSACTION: &str = "txn";
pub const PREFIX_BANK_ACCOUNT: &str = "bnk";
pub const PREFIX_REPORT: &str = "rpt";
pub const PREFIX_CHAT_SESSION: &str = "chs";
pub const PREFIX_MESSAGE: &str = "msg";
pub const PREFIX_KNOWLEDGE_CHUNK: &str = "kch";

pub const ALL_PREFIXES: &[&str] = &[
    PREFIX_ACCOUNT,
    PREFIX_CLASSROOM,
    PREFIX_RATING,
    PREFIX_LESSON,
    PREFIX_FLASHCARD_SET,
    PREFIX_FLASHCARD,
    PREFIX_TEST,
    PREFIX_QUESTION,
    PREFIX_CHOICE,
    PREFIX_SUBMISSION,
    PREFIX_ANSWER,
    PREFIX_PAYMENT,
    PREFIX_TRANSACTION,
    PREFIX_BANK_ACCOUNT,
    PREFIX_REPORT,
    PREFIX_CHAT_SESSION,
    PREFIX_MESSAGE,
    PREFIX_KNOWLEDGE_CHUNK,
];

/// KV key prefix for live test sessions tracked by the abandoned-test sweeper.
pub const KV_TEST_SESSION: &str = "test-session:";
/// KV key prefix marking that an abandoned session was already notified.
pub const KV_ABANDONED_NOTIFIED: &str = "abandoned-notified:";
/// KV key prefix for hashed password-reset OTPs, keyed by email.
pub const KV_OTP: &str = "otp:";
/// KV key prefix for password-reset tokens issued after OTP verification.
pub const KV_RESET_TOKEN: &str = "pwd-reset:";
/// KV key prefix for live refresh-token IDs (`jti`).
pub const KV_REFRESH: &str = "refresh:";

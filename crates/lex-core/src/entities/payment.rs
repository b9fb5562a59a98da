use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{PaymentStatus, TransactionKind};

/// A checkout through the payment gateway.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Payment {
    pub id: String,
    pub account_id: String,
    pub classroom_id: Option<String>,
    /// Gateway-facing numeric order code, unique per payment.
    pub order_code: i64,
    pub amount: i64,
    pub description: String,
    pub status: PaymentStatus,
    pub checkout_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Ledger row written when money moves.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Transaction {
    pub id: String,
    pub account_id: String,
    pub payment_id: Option<String>,
    pub amount: i64,
    pub kind: TransactionKind,
    pub created_at: DateTime<Utc>,
}

/// Payout destination registered by a teacher.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct BankAccount {
    pub id: String,
    pub owner_id: String,
    pub bank_name: String,
    pub account_number: String,
    pub holder_name: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

//! # lex-payments
//!
//! Creates hosted checkout links and verifies the gateway's webhooks.
//!
//! Payment state lives in `lex-db`; this crate only talks to the gateway.
//! Every request body and webhook `data` object is signed with
//! HMAC-SHA256 under the merchant's checksum key.

pub mod error;
pub mod gateway;
mod mock;
mod payos;
pub mod signature;

pub use error::PaymentError;
pub use gateway::{
    MAX_DESCRIPTION_CHARS, PaymentGateway, PaymentLink, PaymentLinkRequest, WebhookData,
    WebhookPayload, truncate_description,
};
pub use mock::MockGateway;
pub use payos::PayOsGateway;

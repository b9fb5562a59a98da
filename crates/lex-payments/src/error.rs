#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("payment gateway is not configured")]
    NotConfigured,

    #[error("invalid webhook signature")]
    InvalidSignature,

    #[error("malformed webhook: {0}")]
    MalformedWebhook(String),

    #[error("gateway rejected the request ({code}): {desc}")]
    Rejected { code: String, desc: String },

    #[error("could not sign payload: {0}")]
    Signing(String),

    #[error("gateway request failed: {0}")]
    Http(String),

    #[error("could not parse gateway response: {0}")]
    Parse(String),
}

impl PaymentError {
    /// Errors caused by the caller's input rather than the gateway.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidSignature | Self::MalformedWebhook(_))
    }
}

//! HMAC-SHA256 signatures in the gateway's `key=value&...` format.

use hmac::{Hmac, Mac};
use serde_json::{Map, Value};
use sha2::Sha256;

use crate::error::PaymentError;

type HmacSha256 = Hmac<Sha256>;

fn mac(key: &str) -> Result<HmacSha256, PaymentError> {
    HmacSha256::new_from_slice(key.as_bytes()).map_err(|e| PaymentError::Signing(e.to_string()))
}

/// Hex HMAC-SHA256 of `message`.
///
/// # Errors
///
/// Returns `PaymentError::Signing` if the key is rejected.
pub fn sign(key: &str, message: &str) -> Result<String, PaymentError> {
    let mut mac = mac(key)?;
    mac.update(message.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time check of a hex signature over `message`.
#[must_use]
pub fn verify(key: &str, message: &str, signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = mac(key) else {
        return false;
    };
    mac.update(message.as_bytes());
    mac.verify_slice(&expected).is_ok()
}

fn field_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(_) | Value::Number(_) => value.to_string(),
        Value::Array(_) | Value::Object(_) => {
            serde_json::to_string(value).unwrap_or_default()
        }
    }
}

/// `k1=v1&k2=v2...` with keys sorted. Nulls become empty strings.
#[must_use]
pub fn canonical_data(data: &Map<String, Value>) -> String {
    let mut keys: Vec<&String> = data.keys().collect();
    keys.sort();
    keys.iter()
        .map(|k| format!("{k}={}", field_value(&data[k.as_str()])))
        .collect::<Vec<_>>()
        .join("&")
}

/// # Errors
///
/// Returns `PaymentError::Signing` if the key is rejected.
pub fn sign_data(key: &str, data: &Map<String, Value>) -> Result<String, PaymentError> {
    sign(key, &canonical_data(data))
}

#[must_use]
pub fn verify_data(key: &str, data: &Map<String, Value>, signature: &str) -> bool {
    verify(key, &canonical_data(data), signature)
}

/// Signature for a create-link request. Fields are fixed and already in key order.
///
/// # Errors
///
/// Returns `PaymentError::Signing` if the key is rejected.
pub fn sign_payment_request(
    key: &str,
    amount: i64,
    cancel_url: &str,
    description: &str,
    order_code: i64,
    return_url: &str,
) -> Result<String, PaymentError> {
    sign(
        key,
        &format!(
            "amount={amount}&cancelUrl={cancel_url}&description={description}&orderCode={order_code}&returnUrl={return_url}"
        ),
    )
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn canonical_form_sorts_keys_and_blanks_nulls() {
        let data = json!({
            "orderCode": 123,
            "amount": 3000,
            "description": "VQRIO123",
            "reference": null,
            "success": true
        });
        let Value::Object(map) = data else { panic!() };
        assert_eq!(
            canonical_data(&map),
            "amount=3000&description=VQRIO123&orderCode=123&reference=&success=true"
        );
    }

    #[test]
    fn known_hmac_vector() {
        // RFC 4231 test case 2.
        assert_eq!(
            sign("Jefe", "what do ya want for nothing?").unwrap(),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn verify_rejects_tampering() {
        let sig = sign_payment_request("k", 2000, "https://c", "Join A", 42, "https://r").unwrap();
        let message = "amount=2000&cancelUrl=https://c&description=Join A&orderCode=42&returnUrl=https://r";
        assert!(verify("k", message, &sig));
        assert!(!verify("k", &message.replace("2000", "1"), &sig));
        assert!(!verify("other", message, &sig));
        assert!(!verify("k", message, "not-hex"));
    }
}

//! One-time codes and opaque random tokens.
//!
//! OTPs are mailed in clear and stored only as SHA-256 digests.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::AuthError;

/// What the server keeps for a pending password-reset code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpRecord {
    pub account_id: String,
    pub digest: String,
    pub attempts: u32,
}

impl OtpRecord {
    #[must_use]
    pub fn new(account_id: &str, code: &str) -> Self {
        Self {
            account_id: account_id.to_string(),
            digest: otp_digest(code),
            attempts: 0,
        }
    }

    /// Compare a submitted code against the stored digest.
    #[must_use]
    pub fn matches(&self, code: &str) -> bool {
        constant_time_eq(self.digest.as_bytes(), otp_digest(code.trim()).as_bytes())
    }
}

/// A numeric code of `len` digits. Leading zeros are kept.
///
/// # Errors
///
/// Returns `AuthError::Random` if the OS random source fails.
pub fn generate_otp(len: usize) -> Result<String, AuthError> {
    let mut bytes = vec![0u8; len];
    getrandom::fill(&mut bytes).map_err(|e| AuthError::Random(e.to_string()))?;
    // 250 is the largest multiple of 10 below 256; rejecting above it keeps digits uniform.
    let mut code = String::with_capacity(len);
    for b in bytes {
        let mut b = b;
        while b >= 250 {
            let mut retry = [0u8; 1];
            getrandom::fill(&mut retry).map_err(|e| AuthError::Random(e.to_string()))?;
            b = retry[0];
        }
        code.push(char::from(b'0' + b % 10));
    }
    Ok(code)
}

/// Hex SHA-256 of a code.
#[must_use]
pub fn otp_digest(code: &str) -> String {
    hex::encode(Sha256::digest(code.as_bytes()))
}

/// Hex string from `bytes` random bytes.
///
/// # Errors
///
/// Returns `AuthError::Random` if the OS random source fails.
pub fn generate_token(bytes: usize) -> Result<String, AuthError> {
    let mut buf = vec![0u8; bytes];
    getrandom::fill(&mut buf).map_err(|e| AuthError::Random(e.to_string()))?;
    Ok(hex::encode(buf))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(4)]
    #[case(6)]
    #[case(10)]
    fn otp_has_requested_digits(#[case] len: usize) {
        let code = generate_otp(len).unwrap();
        assert_eq!(code.len(), len);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn digest_is_stable_hex() {
        assert_eq!(
            otp_digest("123456"),
            "8d969eef6ecad3c29a3a629280e686cf0c3f5d5a86aff3ca12020c923adc6c92"
        );
    }

    #[test]
    fn record_matches_only_its_code() {
        let record = OtpRecord::new("acc-1", "042137");
        assert!(record.matches("042137"));
        assert!(record.matches(" 042137 "));
        assert!(!record.matches("042138"));
        assert_ne!(record.digest, "042137");
    }

    #[test]
    fn tokens_are_hex_of_requested_size() {
        let token = generate_token(32).unwrap();
        assert_eq!(token.len(), 64);
        assert_ne!(token, generate_token(32).unwrap());
    }
}

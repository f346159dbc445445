//! HMAC-SHA256 signatures over token signing input

use super::{base64url, TokenError};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Sign `message` with `secret` and return the base64url-encoded digest.
///
/// Deterministic: the verifier recomputes this value and compares.
pub fn sign(message: &str, secret: &str) -> Result<String, TokenError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| TokenError::InvalidKey)?;
    mac.update(message.as_bytes());
    Ok(base64url::encode(mac.finalize().into_bytes()))
}

/// Compare two encoded signatures without leaking the matching prefix length.
pub fn signatures_match(expected: &str, presented: &str) -> bool {
    expected.as_bytes().ct_eq(presented.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rfc4231_vector() {
        // RFC 4231, test case 2
        let signature = sign("what do ya want for nothing?", "Jefe").unwrap();
        assert_eq!(signature, "W9zBRr9gdU5qBCQmCJV1x1oAPwidJzmDnexYuWTsOEM");
    }

    #[test]
    fn test_sign_is_deterministic() {
        let a = sign("header.payload", "secret").unwrap();
        let b = sign("header.payload", "secret").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_sign_depends_on_key_and_message() {
        let base = sign("header.payload", "secret").unwrap();
        assert_ne!(base, sign("header.payload", "secret2").unwrap());
        assert_ne!(base, sign("header.payloaD", "secret").unwrap());
    }

    #[test]
    fn test_signatures_match() {
        assert!(signatures_match("abc", "abc"));
        assert!(!signatures_match("abc", "abd"));
        assert!(!signatures_match("abc", "abcd"));
        assert!(!signatures_match("abc", ""));
    }
}

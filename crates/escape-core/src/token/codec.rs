//! Three-segment token layout: `header.payload.signature`

use super::{base64url, signer, TokenError};
use serde::{de::DeserializeOwned, Serialize};

/// Borrowed view of a token split into its segments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenParts<'a> {
    pub header: &'a str,
    pub payload: &'a str,
    pub signature: &'a str,
    /// `header + "." + payload`, exactly as it appears in the token
    pub signing_input: &'a str,
}

/// Serialize, encode and sign a header/payload pair
pub fn build_token<H, P>(header: &H, payload: &P, secret: &str) -> Result<String, TokenError>
where
    H: Serialize,
    P: Serialize,
{
    let encoded_header = base64url::encode(serde_json::to_vec(header)?);
    let encoded_payload = base64url::encode(serde_json::to_vec(payload)?);
    let signing_input = format!("{encoded_header}.{encoded_payload}");
    let signature = signer::sign(&signing_input, secret)?;

    Ok(format!("{signing_input}.{signature}"))
}

/// Split a token into exactly three non-empty segments
pub fn parse_token(token: &str) -> Result<TokenParts<'_>, TokenError> {
    let mut segments = token.split('.');
    let (Some(header), Some(payload), Some(signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(TokenError::MalformedToken);
    };

    if header.is_empty() || payload.is_empty() || signature.is_empty() {
        return Err(TokenError::MalformedToken);
    }

    Ok(TokenParts {
        header,
        payload,
        signature,
        signing_input: &token[..header.len() + 1 + payload.len()],
    })
}

/// Decode one base64url JSON segment
pub fn decode_segment<T: DeserializeOwned>(segment: &str) -> Result<T, TokenError> {
    let bytes = base64url::decode(segment).map_err(|_| TokenError::MalformedToken)?;
    serde_json::from_slice(&bytes).map_err(|_| TokenError::MalformedToken)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenHeader;
    use serde_json::{json, Value};

    #[test]
    fn test_build_then_parse() {
        let token = build_token(&TokenHeader::default(), &json!({"n": 1}), "k").unwrap();
        let parts = parse_token(&token).unwrap();

        assert_eq!(parts.header, "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9");
        assert_eq!(
            parts.signature,
            signer::sign(parts.signing_input, "k").unwrap()
        );
        assert_eq!(
            parts.signing_input,
            format!("{}.{}", parts.header, parts.payload)
        );

        let payload: Value = decode_segment(parts.payload).unwrap();
        assert_eq!(payload, json!({"n": 1}));
    }

    #[test]
    fn test_parse_rejects_wrong_segment_count() {
        for token in ["", "a", "a.b", "a.b.c.d", "a.b.c."] {
            assert!(
                matches!(parse_token(token), Err(TokenError::MalformedToken)),
                "token: {token:?}"
            );
        }
    }

    #[test]
    fn test_parse_rejects_empty_segments() {
        for token in ["..", ".b.c", "a..c", "a.b."] {
            assert!(
                matches!(parse_token(token), Err(TokenError::MalformedToken)),
                "token: {token:?}"
            );
        }
    }

    #[test]
    fn test_decode_segment_errors_are_malformed() {
        assert!(matches!(
            decode_segment::<Value>("!!!"),
            Err(TokenError::MalformedToken)
        ));
        // "not json" encoded
        assert!(matches!(
            decode_segment::<Value>(&base64url::encode("not json")),
            Err(TokenError::MalformedToken)
        ));
    }
}

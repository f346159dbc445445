//! URL-safe base64 without padding, used for every token segment.

use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine,
};
use thiserror::Error;

// Emits no padding; accepts segments with or without trailing `=`.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Input was not valid base64url
#[derive(Debug, Error)]
#[error("invalid base64url input: {0}")]
pub struct DecodeError(#[from] base64::DecodeError);

pub fn encode(bytes: impl AsRef<[u8]>) -> String {
    URL_SAFE_LENIENT.encode(bytes)
}

pub fn decode(text: &str) -> Result<Vec<u8>, DecodeError> {
    Ok(URL_SAFE_LENIENT.decode(text)?)
}

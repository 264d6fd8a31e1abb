//! Utility functions for identifiers, tokens and normalisation

use super::error::ValidationError;
use bech32::Bech32m;
use rand_core::{OsRng, RngCore};

pub fn encode_bech32(hrp: &str, data: &[u8]) -> anyhow::Result<String> {
    let hrp = bech32::Hrp::parse(hrp)?;
    let encode = bech32::encode::<Bech32m>(hrp, data)?;
    Ok(encode)
}

// returns None when the string is malformed or carries a different prefix
pub fn decode_bech32(hrp: &str, encoded: &str) -> Option<Vec<u8>> {
    let expected = bech32::Hrp::parse(hrp).ok()?;
    let (found, data) = bech32::decode(encoded).ok()?;
    (found == expected).then_some(data)
}

/// Opaque bearer token: 256 bits from the OS rng, hex encoded.
pub fn new_session_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Lower-cases and trims an email, rejecting anything without a local part and a domain.
pub fn normalize_email(email: &str) -> Result<String, ValidationError> {
    let email = email.trim().to_lowercase();
    let well_formed = matches!(
        email.split_once('@'),
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@')
    );
    if !well_formed || email.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(ValidationError::InvalidEmail(email));
    }
    Ok(email)
}

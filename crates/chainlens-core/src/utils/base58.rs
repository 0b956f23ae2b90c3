//! Base-58 (Bitcoin alphabet) validation.

/// Returns `true` if `input` is canonical base-58: it decodes, and re-encoding the decoded
/// bytes reproduces `input` exactly.
#[must_use]
pub fn is_base58(input: &str) -> bool {
    if input.is_empty() {
        return false;
    }
    match bs58::decode(input).into_vec() {
        Ok(bytes) => bs58::encode(bytes).into_string() == input,
        Err(_) => false,
    }
}

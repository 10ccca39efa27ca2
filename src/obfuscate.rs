//! Reversible masking of small constant strings
//!
//! Base64 over a byte-wise XOR mask. This is a static-analysis deterrent
//! for configuration constants, not a security boundary. Anything that
//! fails to decode is passed through unchanged so a plaintext value in the
//! same configuration slot keeps working.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

const MASK: u8 = 0xAA;

/// Recover the plaintext of a [`conceal`]ed string.
///
/// Returns the input unchanged when it is not valid base64 or does not
/// decode to UTF-8.
pub fn reveal(input: &str) -> String {
    let Ok(mut bytes) = STANDARD.decode(input) else {
        return input.to_string();
    };
    for b in &mut bytes {
        *b ^= MASK;
    }
    String::from_utf8(bytes).unwrap_or_else(|_| input.to_string())
}

/// Mask a plaintext string so it does not appear literally in a binary or
/// config file.
pub fn conceal(input: &str) -> String {
    let masked: Vec<u8> = input.bytes().map(|b| b ^ MASK).collect();
    STANDARD.encode(masked)
}

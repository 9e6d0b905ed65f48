//! 64-bit resource tokens.
//!
//! A token packs a short lowercase name into base 38, least significant digit
//! first, over the alphabet `\0 0-9 a-z _`.

use std::fmt;

const ALPHABET: &[u8; 38] = b"\00123456789abcdefghijklmnopqrstuvwxyz_";
const BASE: u64 = 38;
pub const MAX_TOKEN_LEN: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token name '{0}' is longer than {MAX_TOKEN_LEN} characters")]
    TooLong(String),
    #[error("token name '{name}' contains invalid character {ch:?}")]
    InvalidChar { name: String, ch: char },
}

fn digit(ch: char) -> Option<u64> {
    match ch {
        '0'..='9' => Some(ch as u64 - '0' as u64 + 1),
        'a'..='z' => Some(ch as u64 - 'a' as u64 + 11),
        'A'..='Z' => Some(ch.to_ascii_lowercase() as u64 - 'a' as u64 + 11),
        '_' => Some(37),
        _ => None,
    }
}

/// Packs `name` into a token. Upper-case letters are folded to lower case.
pub fn to_token(name: &str) -> Result<u64, TokenError> {
    if name.chars().count() > MAX_TOKEN_LEN {
        return Err(TokenError::TooLong(name.to_string()));
    }
    let mut token = 0u64;
    let mut scale = 1u64;
    for ch in name.chars() {
        let d = digit(ch).ok_or_else(|| TokenError::InvalidChar { name: name.to_string(), ch })?;
        token += d * scale;
        scale = scale.wrapping_mul(BASE);
    }
    Ok(token)
}

/// Unpacks a token into its name. Digits outside the alphabet cannot occur.
pub fn token_name(mut token: u64) -> String {
    let mut out = String::new();
    while token != 0 {
        let d = (token % BASE) as usize;
        if d != 0 {
            out.push(ALPHABET[d] as char);
        }
        token /= BASE;
    }
    out
}

/// Formats a token as `name(0xHEX)` in log fields.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct TokenDisplay(pub u64);

impl fmt::Display for TokenDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'({:#X})", token_name(self.0), self.0)
    }
}

impl fmt::Debug for TokenDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { fmt::Display::fmt(self, f) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_tokens() {
        assert_eq!(to_token("").unwrap(), 0);
        assert_eq!(to_token("0").unwrap(), 1);
        assert_eq!(to_token("a").unwrap(), 11);
        assert_eq!(to_token("_").unwrap(), 37);
        assert_eq!(to_token("ab").unwrap(), 11 + 12 * 38);
    }

    #[test]
    fn names_survive_packing() {
        for name in ["hu_gas", "ferry", "berlin", "a1_2b", "zzzzzzzzzzzz"] {
            assert_eq!(token_name(to_token(name).unwrap()), name);
        }
        assert_eq!(to_token("Berlin").unwrap(), to_token("berlin").unwrap());
    }

    #[test]
    fn rejects_bad_names() {
        assert!(matches!(to_token("thirteen_char"), Err(TokenError::TooLong(_))));
        assert!(matches!(to_token("a-b"), Err(TokenError::InvalidChar { ch: '-', .. })));
    }

    #[test]
    fn display_includes_hex() {
        assert_eq!(TokenDisplay(11).to_string(), "'a'(0xB)");
    }
}

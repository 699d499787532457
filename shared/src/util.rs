//! Time, token and formatting helpers shared by the server and its clients

use base64::Engine;
use rand::Rng;

/// Current UTC timestamp in milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Length of an encoded token (32 bytes, URL-safe base64, no padding)
pub const TOKEN_LEN: usize = 43;

/// Alphabet for gift card serial numbers (no 0/O, 1/I/L)
const SERIAL_ALPHABET: &[u8] = b"23456789ABCDEFGHJKMNPQRSTUVWXYZ";
const SERIAL_GROUPS: usize = 3;
const SERIAL_GROUP_LEN: usize = 4;

/// Generate an opaque random token (invitation, gift card claim, pass authentication).
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Check that a token has the shape produced by [`generate_token`].
///
/// Used to reject garbage before touching the database.
pub fn is_well_formed_token(token: &str) -> bool {
    token.len() == TOKEN_LEN
        && token
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Generate a gift card serial number, e.g. `7KQF-M2XD-9RTA`.
pub fn generate_serial_number() -> String {
    let mut rng = rand::thread_rng();
    let groups: Vec<String> = (0..SERIAL_GROUPS)
        .map(|_| {
            (0..SERIAL_GROUP_LEN)
                .map(|_| SERIAL_ALPHABET[rng.gen_range(0..SERIAL_ALPHABET.len())] as char)
                .collect()
        })
        .collect();
    groups.join("-")
}

/// Normalize user-typed serial numbers: case, spaces and dashes are ignored.
///
/// Returns `None` when the input cannot be a serial number.
pub fn normalize_serial(input: &str) -> Option<String> {
    let chars: Vec<char> = input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .map(|c| c.to_ascii_uppercase())
        .collect();

    if chars.len() != SERIAL_GROUPS * SERIAL_GROUP_LEN
        || !chars
            .iter()
            .all(|c| c.is_ascii() && SERIAL_ALPHABET.contains(&(*c as u8)))
    {
        return None;
    }

    let groups: Vec<String> = chars
        .chunks(SERIAL_GROUP_LEN)
        .map(|chunk| chunk.iter().collect())
        .collect();
    Some(groups.join("-"))
}

/// Lower-case and trim an email address, rejecting obviously invalid input.
pub fn normalize_email(input: &str) -> Option<String> {
    let email = input.trim().to_lowercase();
    let (local, domain) = email.split_once('@')?;
    if local.is_empty()
        || domain.len() < 3
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
        || domain.contains('@')
        || email.chars().any(char::is_whitespace)
    {
        return None;
    }
    Some(email)
}

/// Format integer cents as dollars, e.g. `2550` → `$25.50`.
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}${}.{:02}", abs / 100, abs % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_token_is_well_formed() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), TOKEN_LEN);
        assert!(is_well_formed_token(&a));
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_tokens_rejected() {
        assert!(!is_well_formed_token(""));
        assert!(!is_well_formed_token("short"));
        assert!(!is_well_formed_token(&"a".repeat(44)));
        let with_padding = format!("{}=", "a".repeat(42));
        assert!(!is_well_formed_token(&with_padding));
        let with_slash = format!("{}/", "a".repeat(42));
        assert!(!is_well_formed_token(&with_slash));
    }

    #[test]
    fn test_serial_number_shape() {
        for _ in 0..50 {
            let serial = generate_serial_number();
            assert_eq!(serial.len(), 14);
            assert_eq!(normalize_serial(&serial).as_deref(), Some(serial.as_str()));
            assert!(!serial.contains(['0', 'O', '1', 'I', 'L']));
        }
    }

    #[test]
    fn test_normalize_serial() {
        assert_eq!(
            normalize_serial("7kqf m2xd 9rta").as_deref(),
            Some("7KQF-M2XD-9RTA")
        );
        assert_eq!(
            normalize_serial("7KQFM2XD9RTA").as_deref(),
            Some("7KQF-M2XD-9RTA")
        );
        assert_eq!(normalize_serial("7KQF-M2XD-9RT"), None);
        assert_eq!(normalize_serial("0KQF-M2XD-9RTA"), None);
        assert_eq!(normalize_serial("ÄKQF-M2XD-9RTA"), None);
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(
            normalize_email("  Barista@Example.COM ").as_deref(),
            Some("barista@example.com")
        );
        assert_eq!(normalize_email("no-at-sign"), None);
        assert_eq!(normalize_email("@example.com"), None);
        assert_eq!(normalize_email("a@b"), None);
        assert_eq!(normalize_email("a@.com"), None);
        assert_eq!(normalize_email("a b@example.com"), None);
    }

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(0), "$0.00");
        assert_eq!(format_cents(5), "$0.05");
        assert_eq!(format_cents(2550), "$25.50");
        assert_eq!(format_cents(-199), "-$1.99");
    }
}

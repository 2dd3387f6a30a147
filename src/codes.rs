use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;

static NON_ALPHANUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Z0-9]").unwrap());

/// Uppercase and strip everything that isn't A-Z or 0-9 so lookups are
/// consistent regardless of how a code was typed: " P-Qd5 tiv " -> "PQD5TIV".
pub fn normalize_code(raw: &str) -> String {
    NON_ALPHANUMERIC
        .replace_all(&raw.trim().to_uppercase(), "")
        .into_owned()
}

const CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Random alphanumeric code, optionally prefixed. A single-letter prefix gets
/// a hyphen for readability, like "P-XK42QD"; codes are normalized before
/// they are stored, so the hyphen is display-only.
pub fn generate_code(prefix: &str, length: usize) -> String {
    let mut rng = rand::rng();
    let core: String = (0..length)
        .map(|_| CODE_CHARSET[rng.random_range(0..CODE_CHARSET.len())] as char)
        .collect();

    if prefix.len() == 1 {
        format!("{}-{}", prefix, core)
    } else {
        format!("{}{}", prefix, core)
    }
}

use chrono::{NaiveDate, Utc};
use sha2::{Digest, Sha256};

/// Day-scoped pseudo-identity for a visitor: SHA-256 over the client
/// address, user-agent and the current UTC calendar date. The date
/// component makes the hash rotate daily, so the same visitor cannot be
/// followed across days while same-day dedup still works. Collisions
/// are accepted as negligible.
pub fn session_hash(ip: Option<&str>, user_agent: Option<&str>) -> String {
    session_hash_on(ip, user_agent, Utc::now().date_naive())
}

fn session_hash_on(ip: Option<&str>, user_agent: Option<&str>, date: NaiveDate) -> String {
    let input = format!(
        "{}-{}-{}",
        ip.unwrap_or(""),
        user_agent.unwrap_or(""),
        date.format("%Y-%m-%d"),
    );
    hex::encode(Sha256::digest(input.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_deterministic_within_day() {
        let d = date("2024-06-01");
        let h1 = session_hash_on(Some("203.0.113.9"), Some("Mozilla/5.0"), d);
        let h2 = session_hash_on(Some("203.0.113.9"), Some("Mozilla/5.0"), d);
        assert_eq!(h1, h2);
    }

    #[test]
    fn test_rotates_across_days() {
        let h1 = session_hash_on(Some("203.0.113.9"), Some("Mozilla/5.0"), date("2024-06-01"));
        let h2 = session_hash_on(Some("203.0.113.9"), Some("Mozilla/5.0"), date("2024-06-02"));
        assert_ne!(h1, h2, "same visitor must hash differently on a new day");
    }

    #[test]
    fn test_lowercase_hex_256_bit() {
        let h = session_hash(Some("203.0.113.9"), Some("curl/8.0"));
        assert_eq!(h.len(), 64);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_absent_parts_still_hash() {
        let d = date("2024-06-01");
        let h1 = session_hash_on(None, None, d);
        let h2 = session_hash_on(Some("203.0.113.9"), None, d);
        assert_eq!(h1.len(), 64);
        assert_ne!(h1, h2);
    }
}

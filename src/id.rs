//! ID generation for tickets.

use chrono::{DateTime, Utc};
use rand::Rng;

const BASE36: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Length of the random suffix.
const TOKEN_LEN: usize = 5;

/// Generate a ticket ID.
/// Format: "TOM-" + unix millis + "-" + 5 uppercase base36 chars
pub fn generate_id(created_at: DateTime<Utc>) -> String {
    let mut rng = rand::rng();
    let token: String = (0..TOKEN_LEN)
        .map(|_| char::from(BASE36[rng.random_range(0..BASE36.len())]))
        .collect();
    format!("TOM-{}-{}", created_at.timestamp_millis(), token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_id_format() {
        let now = Utc::now();
        let id = generate_id(now);
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "TOM");
        assert_eq!(parts[1], now.timestamp_millis().to_string());
        assert_eq!(parts[2].len(), 5);
        assert!(
            parts[2]
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
        );
    }

    #[test]
    fn test_generate_id_uniqueness() {
        let now = Utc::now();
        let ids: std::collections::HashSet<String> = (0..50).map(|_| generate_id(now)).collect();
        // 36^5 tokens; 50 draws colliding is vanishingly unlikely
        assert!(ids.len() > 45);
    }
}

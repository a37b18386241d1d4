//! Identifier generation for nodes, connections and flows

use rand::Rng;

const SUFFIX_LEN: usize = 9;
const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Generates `{prefix}{unix_millis}_{random}` identifiers
///
/// The 9-character base-36 suffix keeps IDs distinct when several are
/// produced within the same millisecond. Collisions are not detected.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdGenerator;

impl IdGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Generate a new identifier with the given prefix
    pub fn generate(&self, prefix: &str) -> String {
        let millis = chrono::Utc::now().timestamp_millis();
        let mut rng = rand::rng();
        let suffix: String = (0..SUFFIX_LEN)
            .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
            .collect();
        format!("{}{}_{}", prefix, millis, suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_id_format() {
        let id = IdGenerator::new().generate("node_");
        let rest = id.strip_prefix("node_").unwrap();
        let (millis, suffix) = rest.split_once('_').unwrap();

        assert!(millis.parse::<i64>().is_ok());
        assert_eq!(suffix.len(), SUFFIX_LEN);
        assert!(suffix.bytes().all(|b| ALPHABET.contains(&b)));
    }

    #[test]
    fn test_ten_thousand_ids_are_unique() {
        let ids = IdGenerator::new();
        let generated: HashSet<String> = (0..10_000).map(|_| ids.generate("conn_")).collect();
        assert_eq!(generated.len(), 10_000);
    }
}

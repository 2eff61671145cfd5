//! Truncated SHA-256 tamper-evidence suffix.
//!
//! Six hex characters carry only 24 bits. The suffix is there so that edits to
//! the holder, year, course or sequence are caught and so that nobody without
//! the pepper can mint a fresh identifier that verifies. It is not a secrecy
//! mechanism and stays six characters so it can be read off paper.

use super::pepper::Pepper;
use sha2::{Digest, Sha256};

pub fn compute(student_identity: &str, base: &str, pepper: &Pepper) -> String {
    let mut hasher = Sha256::new();
    hasher.update(student_identity.as_bytes());
    hasher.update(base.as_bytes());
    hasher.update(pepper.expose().as_bytes());
    let hash = hasher.finalize();

    // 3 bytes -> 6 hex characters
    hex::encode_upper(&hash[..3])
}

/// Compares an embedded digest with a freshly computed one without bailing
/// out at the first differing byte.
pub fn matches(expected: &str, presented: &str) -> bool {
    let (a, b) = (expected.as_bytes(), presented.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pepper(s: &str) -> Pepper {
        Pepper::new(s).unwrap()
    }

    #[test]
    fn matches_manual_sha256_prefix() {
        let full = format!("{:X}", Sha256::digest(b"STU-0012025-CS-0001pepper"));
        assert_eq!(
            compute("STU-001", "2025-CS-0001", &pepper("pepper")),
            full[..6]
        );
    }

    #[test]
    fn output_is_six_uppercase_hex_chars() {
        let d = compute("STU-001", "2025-CS-0001", &pepper("pepper"));
        assert_eq!(d.len(), 6);
        assert!(d.chars().all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
    }

    #[test]
    fn deterministic() {
        let p = pepper("pepper");
        assert_eq!(
            compute("STU-001", "2025-CS-0001", &p),
            compute("STU-001", "2025-CS-0001", &p)
        );
    }

    #[test]
    fn every_input_contributes() {
        let p = pepper("pepper");
        let reference = compute("STU-001", "2025-CS-0001", &p);
        assert_ne!(reference, compute("STU-002", "2025-CS-0001", &p));
        assert_ne!(reference, compute("STU-001", "2025-CS-0002", &p));
        assert_ne!(reference, compute("STU-001", "2026-CS-0001", &p));
        assert_ne!(reference, compute("STU-001", "2025-CS-0001", &pepper("other")));
    }

    #[test]
    fn comparison_is_exact() {
        assert!(matches("A1B2C3", "A1B2C3"));
        assert!(!matches("A1B2C3", "A1B2C4"));
        assert!(!matches("A1B2C3", "A1B2C"));
        assert!(!matches("A1B2C3", "a1b2c3"));
    }
}

//! Random multipart boundaries and message ids.

use rand::Rng;

/// Characters used in generated identifiers.
const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_";

/// Prefix of every generated boundary.
pub const BOUNDARY_PREFIX: &str = "Part_";

/// Number of random characters in a boundary.
pub const BOUNDARY_LENGTH: usize = 30;

/// Number of random characters in a message id, before the domain.
pub const MESSAGE_ID_LENGTH: usize = 40;

fn random_string<R: Rng + ?Sized>(rng: &mut R, length: usize) -> String {
    (0..length)
        .map(|_| char::from(ALPHABET[rng.gen_range(0..ALPHABET.len())]))
        .collect()
}

/// Generates a multipart boundary: [`BOUNDARY_PREFIX`] followed by `length`
/// random characters.
#[must_use]
pub fn generate_boundary<R: Rng + ?Sized>(rng: &mut R, length: usize) -> String {
    let mut boundary = String::with_capacity(BOUNDARY_PREFIX.len() + length);
    boundary.push_str(BOUNDARY_PREFIX);
    boundary.push_str(&random_string(rng, length));
    boundary
}

/// Generates a message id of the form `random@domain`, without angle
/// brackets.
#[must_use]
pub fn generate_message_id<R: Rng + ?Sized>(rng: &mut R, domain: &str, length: usize) -> String {
    format!("{}@{domain}", random_string(rng, length))
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn is_identifier_char(c: char) -> bool {
        c.is_ascii_alphanumeric() || c == '_'
    }

    #[test]
    fn test_boundary_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        let boundary = generate_boundary(&mut rng, BOUNDARY_LENGTH);

        assert_eq!(boundary.len(), 35);
        assert!(boundary.starts_with("Part_"));
        assert!(boundary.chars().all(is_identifier_char));
    }

    #[test]
    fn test_message_id_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        let id = generate_message_id(&mut rng, "example.com", MESSAGE_ID_LENGTH);

        let (local, domain) = id.split_once('@').unwrap();
        assert_eq!(local.len(), 40);
        assert!(local.chars().all(is_identifier_char));
        assert_eq!(domain, "example.com");
    }

    #[test]
    fn test_seeded_generation_is_deterministic() {
        let a = generate_boundary(&mut StdRng::seed_from_u64(42), 30);
        let b = generate_boundary(&mut StdRng::seed_from_u64(42), 30);
        let c = generate_boundary(&mut StdRng::seed_from_u64(43), 30);

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    proptest::proptest! {
        #[test]
        fn prop_identifiers_use_alphabet(seed in proptest::prelude::any::<u64>(), length in 0usize..100) {
            let mut rng = StdRng::seed_from_u64(seed);
            let boundary = generate_boundary(&mut rng, length);
            let id = generate_message_id(&mut rng, "mail.example.org", length);

            proptest::prop_assert_eq!(boundary.len(), BOUNDARY_PREFIX.len() + length);
            proptest::prop_assert!(boundary.chars().all(is_identifier_char));
            proptest::prop_assert_eq!(id.len(), length + "@mail.example.org".len());
            proptest::prop_assert!(id[..length].chars().all(is_identifier_char));
        }
    }

    #[test]
    fn test_zero_length() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(generate_boundary(&mut rng, 0), "Part_");
        assert_eq!(generate_message_id(&mut rng, "d", 0), "@d");
    }
}

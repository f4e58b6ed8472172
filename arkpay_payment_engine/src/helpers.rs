//! Small utility functions shared by the engine APIs.

use blake2::{Blake2b512, Digest};

/// Derives the identifier under which a checkout attempt can be resumed.
///
/// The identifier folds the storefront session, the storefront's own hash of the cart, and the serialized cart
/// contents into a single digest. Any change to the cart produces a new identifier, so a stale draft order can
/// never be resumed against different contents.
pub fn cart_identifier(session_id: &str, cart_contents_hash: &str, serialized_cart: &str) -> String {
    let mut hasher = Blake2b512::new();
    hasher.update(session_id.as_bytes());
    hasher.update(cart_contents_hash.as_bytes());
    hasher.update(serialized_cart.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generates a fresh order key for a store order materialized from a draft.
pub fn new_order_key() -> String {
    format!("apg_order_{:016x}", rand::random::<u64>())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn cart_identifier_is_deterministic() {
        let a = cart_identifier("sess-1", "abc123", r#"[{"product_id":1}]"#);
        let b = cart_identifier("sess-1", "abc123", r#"[{"product_id":1}]"#);
        assert_eq!(a, b);
        assert_eq!(a.len(), 128);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn cart_identifier_tracks_every_input() {
        let base = cart_identifier("sess-1", "abc123", "cart");
        assert_ne!(base, cart_identifier("sess-2", "abc123", "cart"));
        assert_ne!(base, cart_identifier("sess-1", "abc124", "cart"));
        assert_ne!(base, cart_identifier("sess-1", "abc123", "cart2"));
    }

    #[test]
    fn order_keys_carry_the_gateway_prefix() {
        let key = new_order_key();
        assert!(key.starts_with("apg_order_"));
        assert_eq!(key.len(), "apg_order_".len() + 16);
    }
}

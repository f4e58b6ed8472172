use apg_common::helpers::MERCHANT_ID_DELIMITER;

/// A fresh uniqid-style merchant reference for cart-initiated transactions (13 hex chars).
pub fn new_merchant_reference() -> String {
    format!("{:013x}", rand::random::<u64>() & 0xF_FFFF_FFFF_FFFF)
}

/// Qualify a merchant transaction id with a random `__<suffix>` tag after the processor rejected
/// it as a duplicate. The suffix is stripped again when the webhook comes back.
pub fn disambiguate_merchant_id(id: &str) -> String {
    format!("{id}{MERCHANT_ID_DELIMITER}{:06x}", rand::random::<u32>() & 0xFF_FFFF)
}

/// Strip everything that is not an ASCII digit, as the processor expects for card numbers.
pub fn digits_only(input: &str) -> String {
    input.chars().filter(char::is_ascii_digit).collect()
}

/// Delimiter between a merchant transaction id and the disambiguation suffix appended when the
/// processor rejects a duplicate merchant id.
pub const MERCHANT_ID_DELIMITER: &str = "__";

/// Strip a `__<suffix>` disambiguation tag from a merchant transaction id, returning the id as
/// the store knows it. Ids without a tag are returned unchanged.
pub fn strip_merchant_suffix(id: &str) -> &str {
    match id.split_once(MERCHANT_ID_DELIMITER) {
        Some((base, _)) => base,
        None => id,
    }
}

/// Parse a boolean flag from a string value, or return the given default value otherwise.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    let value = match value {
        Some(v) => v,
        None => return default,
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn suffix_stripping() {
        assert_eq!(strip_merchant_suffix("wc_order_abc"), "wc_order_abc");
        assert_eq!(strip_merchant_suffix("wc_order_abc__x7f3"), "wc_order_abc");
        // Only the first delimiter counts.
        assert_eq!(strip_merchant_suffix("wc_order_abc__x__y"), "wc_order_abc");
        assert_eq!(strip_merchant_suffix("__orphan"), "");
    }

    #[test]
    fn boolean_flags() {
        assert!(parse_boolean_flag(Some("yes".into()), false));
        assert!(parse_boolean_flag(Some(" TRUE ".into()), false));
        assert!(!parse_boolean_flag(Some("off".into()), true));
        assert!(parse_boolean_flag(None, true));
        assert!(!parse_boolean_flag(Some("banana".into()), false));
    }
}

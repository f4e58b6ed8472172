//! HMAC-SHA256 request signatures for the ArkPay merchant API.
//!
//! Both sides of the integration use the same canonical string,
//! `"{method} {uri}\n{body}"`: inbound webhook deliveries carry a `Signature` header computed
//! over the public webhook URL, and outbound merchant API calls are signed over the API URI.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Sign a request with the merchant secret key. Returns the signature as lowercase hex.
pub fn sign_request(method: &str, uri: &str, body: &[u8], secret_key: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret_key.as_bytes()).expect("HMAC can take key of any size");
    mac.update(method.as_bytes());
    mac.update(b" ");
    mac.update(uri.as_bytes());
    mac.update(b"\n");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Check a provided signature against the one the secret key produces for this request.
/// The comparison does not short-circuit on the first mismatching byte.
pub fn verify_signature(method: &str, uri: &str, body: &[u8], secret_key: &str, provided: &str) -> bool {
    let expected = sign_request(method, uri, body, secret_key);
    constant_time_compare(&expected, provided)
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod test {
    use super::*;

    const SECRET: &str = "merchant-secret-key";
    const URI: &str = "/api/v1/merchant/api/transactions";
    const BODY: &[u8] = br#"{"merchantTransactionId":"wc_order_abc","amount":10.5}"#;

    #[test]
    fn signature_is_lowercase_hex_of_sha256_width() {
        let sig = sign_request("POST", URI, BODY, SECRET);
        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn round_trip_verifies() {
        let sig = sign_request("POST", URI, BODY, SECRET);
        assert!(verify_signature("POST", URI, BODY, SECRET, &sig));
    }

    #[test]
    fn any_mutation_is_rejected() {
        let sig = sign_request("POST", URI, BODY, SECRET);
        assert!(!verify_signature("GET", URI, BODY, SECRET, &sig));
        assert!(!verify_signature("POST", "/api/v1/merchant/api/transaction", BODY, SECRET, &sig));
        assert!(!verify_signature("POST", URI, b"{}", SECRET, &sig));
        assert!(!verify_signature("POST", URI, BODY, "other-secret", &sig));
        // Flip a single hex digit of the signature itself.
        let mut tampered = sig.clone().into_bytes();
        tampered[0] = if tampered[0] == b'0' { b'1' } else { b'0' };
        let tampered = String::from_utf8(tampered).unwrap();
        assert!(!verify_signature("POST", URI, BODY, SECRET, &tampered));
    }

    #[test]
    fn truncated_signatures_are_rejected() {
        let sig = sign_request("POST", URI, BODY, SECRET);
        assert!(!verify_signature("POST", URI, BODY, SECRET, &sig[..63]));
        assert!(!verify_signature("POST", URI, BODY, SECRET, ""));
    }
}

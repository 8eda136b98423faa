//! Expiry inspection for the service's signed access tokens.
//!
//! The payload segment is read without verifying the signature; the issuer
//! is the same service we hand the token back to.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use serde_json::Value;

/// Renew this many seconds before the embedded expiry.
pub const DEFAULT_REFRESH_BUFFER_SECS: i64 = 300;

const LENIENT: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);

/// Expiry (`exp`, seconds since epoch) embedded in the token's payload.
pub fn expiry(token: &str) -> Option<i64> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_LENIENT
        .decode(payload)
        .or_else(|_| STANDARD_LENIENT.decode(payload))
        .ok()?;
    let claims: Value = serde_json::from_slice(&bytes).ok()?;

    match claims.get("exp")? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        _ => None,
    }
}

/// `true` when `now >= exp - buffer`, or when the expiry cannot be read.
pub fn is_expiring_soon(token: &str, now_unix: i64, buffer_secs: i64) -> bool {
    match expiry(token) {
        Some(exp) => now_unix >= exp.saturating_sub(buffer_secs),
        None => true,
    }
}

#[cfg(test)]
pub(crate) fn token_with_exp(exp: i64) -> String {
    let payload = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .encode(serde_json::json!({ "sub": "user", "exp": exp }).to_string());
    format!("eyJhbGciOiJIUzI1NiJ9.{payload}.signature")
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_760_000_000;

    #[test]
    fn reads_exp_from_payload() {
        assert_eq!(expiry(&token_with_exp(NOW)), Some(NOW));
    }

    #[test]
    fn accepts_padded_standard_alphabet() {
        let payload = base64::engine::general_purpose::STANDARD
            .encode(format!("{{\"exp\":{NOW},\"n\":\"??>\"}}"));
        assert_eq!(expiry(&format!("h.{payload}.s")), Some(NOW));
    }

    #[test]
    fn refresh_window_boundaries() {
        let token = token_with_exp(NOW + DEFAULT_REFRESH_BUFFER_SECS);
        assert!(is_expiring_soon(&token, NOW, DEFAULT_REFRESH_BUFFER_SECS));
        assert!(!is_expiring_soon(&token, NOW - 1, DEFAULT_REFRESH_BUFFER_SECS));

        let far = token_with_exp(NOW + 3600);
        assert!(!is_expiring_soon(&far, NOW, DEFAULT_REFRESH_BUFFER_SECS));

        let expired = token_with_exp(NOW - 10);
        assert!(is_expiring_soon(&expired, NOW, DEFAULT_REFRESH_BUFFER_SECS));
    }

    #[test]
    fn extreme_exp_does_not_overflow() {
        let payload = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(r#"{"exp":-1e300}"#);
        let token = format!("h.{payload}.s");
        assert_eq!(expiry(&token), Some(i64::MIN));
        assert!(is_expiring_soon(&token, NOW, DEFAULT_REFRESH_BUFFER_SECS));
    }

    #[test]
    fn undecodable_tokens_are_treated_as_expiring() {
        for token in ["", "opaque", "a.!!!.c", "a.bm90IGpzb24.c", "a.e30.c"] {
            assert!(
                is_expiring_soon(token, NOW, DEFAULT_REFRESH_BUFFER_SECS),
                "{token:?} should be refreshed"
            );
        }
    }
}

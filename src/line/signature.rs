use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::errors::AppError;

type HmacSha256 = Hmac<Sha256>;

fn mac(secret: &str, body: &[u8]) -> Result<HmacSha256, AppError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::ConfigError(format!("Invalid channel secret: {e}")))?;
    mac.update(body);
    Ok(mac)
}

/// Base64 HMAC-SHA256 of `body` keyed with the channel secret.
pub fn sign(secret: &str, body: &[u8]) -> Result<String, AppError> {
    Ok(STANDARD.encode(mac(secret, body)?.finalize().into_bytes()))
}

/// Check an `x-line-signature` value against the raw body in constant time.
pub fn verify(secret: &str, body: &[u8], signature: &str) -> Result<(), AppError> {
    let expected = STANDARD
        .decode(signature.trim())
        .map_err(|_| AppError::InvalidSignature)?;

    mac(secret, body)?
        .verify_slice(&expected)
        .map_err(|_| AppError::InvalidSignature)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &[u8] = br#"{"events":[]}"#;

    #[test]
    fn matching_signature_verifies() {
        let sig = sign("secret", BODY).unwrap();
        assert!(verify("secret", BODY, &sig).is_ok());
    }

    #[test]
    fn known_vector() {
        // RFC 4231 test case 2.
        let sig = sign("Jefe", b"what do ya want for nothing?").unwrap();
        let expected = STANDARD.encode(
            [
                0x5b, 0xdc, 0xc1, 0x46, 0xbf, 0x60, 0x75, 0x4e, 0x6a, 0x04, 0x24, 0x26, 0x08, 0x95,
                0x75, 0xc7, 0x5a, 0x00, 0x3f, 0x08, 0x9d, 0x27, 0x39, 0x83, 0x9d, 0xec, 0x58, 0xb9,
                0x64, 0xec, 0x38, 0x43,
            ],
        );
        assert_eq!(sig, expected);
    }

    #[test]
    fn wrong_secret_or_tampered_body_is_rejected() {
        let sig = sign("secret", BODY).unwrap();
        assert!(matches!(verify("other", BODY, &sig), Err(AppError::InvalidSignature)));
        assert!(matches!(
            verify("secret", br#"{"events":[{}]}"#, &sig),
            Err(AppError::InvalidSignature)
        ));
    }

    #[test]
    fn malformed_signature_is_rejected() {
        assert!(matches!(verify("secret", BODY, "not base64!"), Err(AppError::InvalidSignature)));
        assert!(matches!(verify("secret", BODY, ""), Err(AppError::InvalidSignature)));
    }
}

//! Creem webhook signature verification.
//!
//! Creem signs the raw request body with HMAC-SHA256 and sends the digest as
//! a hex string in the `creem-signature` header. Unlike Stripe there is no
//! timestamp component; the signature covers the body bytes exactly as sent.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

/// Prefix the Creem dashboard prepends to signing secrets.
const SECRET_PREFIX: &str = "whsec_";

/// Algorithm prefixes some provider configurations prepend to the signature.
const SIGNATURE_PREFIXES: [&str; 2] = ["sha256=", "sha256:"];

/// Verifier for Creem webhook signatures.
///
/// Holds the signing secret for the lifetime of the process. The secret is
/// injected at construction; the verifier never reads ambient state, which
/// keeps it testable without environment mutation.
#[derive(Debug, Clone)]
pub struct CreemWebhookVerifier {
    secret: String,
}

impl CreemWebhookVerifier {
    /// Creates a new verifier with the given webhook secret.
    ///
    /// The secret may carry the dashboard's `whsec_` prefix; it is stripped
    /// before use as the HMAC key.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Verifies a signature against the exact raw request body.
    ///
    /// Returns `false` on any failure (bad hex, length mismatch, digest
    /// mismatch); it never panics and never leaks timing information
    /// correlated with the position of the first differing byte.
    pub fn verify(&self, payload: &[u8], signature: &str) -> bool {
        let secret = self
            .secret
            .strip_prefix(SECRET_PREFIX)
            .unwrap_or(&self.secret);

        let signature = SIGNATURE_PREFIXES
            .iter()
            .find_map(|p| signature.strip_prefix(p))
            .unwrap_or(signature);

        let provided = match hex::decode(signature.trim()) {
            Ok(bytes) => bytes,
            Err(_) => return false,
        };

        // HMAC-SHA256 accepts keys of any length, but stay panic-free anyway.
        let mut mac = match Hmac::<Sha256>::new_from_slice(secret.as_bytes()) {
            Ok(mac) => mac,
            Err(_) => return false,
        };
        mac.update(payload);
        let expected = mac.finalize().into_bytes();

        constant_time_compare(expected.as_slice(), &provided)
    }
}

/// Constant-time comparison of two byte slices.
///
/// Length mismatch may short-circuit; the per-byte comparison must not.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Computes the hex signature Creem would send, for use in test fixtures.
#[cfg(test)]
pub fn compute_test_signature(secret: &str, payload: &[u8]) -> String {
    let secret = secret.strip_prefix(SECRET_PREFIX).unwrap_or(secret);
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const TEST_SECRET: &str = "whsec_test_secret_12345";

    // ══════════════════════════════════════════════════════════════
    // Verification Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn verify_valid_signature() {
        let verifier = CreemWebhookVerifier::new(TEST_SECRET);
        let payload = br#"{"id":"evt_1","eventType":"checkout.completed"}"#;
        let signature = compute_test_signature(TEST_SECRET, payload);

        assert!(verifier.verify(payload, &signature));
    }

    #[test]
    fn verify_accepts_bare_secret() {
        // Secret configured without the dashboard's whsec_ prefix
        let verifier = CreemWebhookVerifier::new("test_secret_12345");
        let payload = b"payload bytes";
        let signature = compute_test_signature(TEST_SECRET, payload);

        assert!(verifier.verify(payload, &signature));
    }

    #[test]
    fn verify_strips_sha256_equals_prefix() {
        let verifier = CreemWebhookVerifier::new(TEST_SECRET);
        let payload = b"some payload";
        let signature = format!("sha256={}", compute_test_signature(TEST_SECRET, payload));

        assert!(verifier.verify(payload, &signature));
    }

    #[test]
    fn verify_strips_sha256_colon_prefix() {
        let verifier = CreemWebhookVerifier::new(TEST_SECRET);
        let payload = b"some payload";
        let signature = format!("sha256:{}", compute_test_signature(TEST_SECRET, payload));

        assert!(verifier.verify(payload, &signature));
    }

    #[test]
    fn verify_tampered_payload_fails() {
        let verifier = CreemWebhookVerifier::new(TEST_SECRET);
        let signature = compute_test_signature(TEST_SECRET, br#"{"id":"evt_1"}"#);

        assert!(!verifier.verify(br#"{"id":"evt_2"}"#, &signature));
    }

    #[test]
    fn verify_wrong_secret_fails() {
        let verifier = CreemWebhookVerifier::new("whsec_other_secret");
        let payload = b"payload";
        let signature = compute_test_signature(TEST_SECRET, payload);

        assert!(!verifier.verify(payload, &signature));
    }

    #[test]
    fn verify_invalid_hex_returns_false() {
        let verifier = CreemWebhookVerifier::new(TEST_SECRET);

        assert!(!verifier.verify(b"payload", "not-valid-hex!"));
    }

    #[test]
    fn verify_truncated_signature_returns_false() {
        let verifier = CreemWebhookVerifier::new(TEST_SECRET);
        let payload = b"payload";
        let signature = compute_test_signature(TEST_SECRET, payload);

        assert!(!verifier.verify(payload, &signature[..32]));
    }

    #[test]
    fn verify_empty_signature_returns_false() {
        let verifier = CreemWebhookVerifier::new(TEST_SECRET);

        assert!(!verifier.verify(b"payload", ""));
    }

    #[test]
    fn verify_empty_payload_with_matching_signature() {
        let verifier = CreemWebhookVerifier::new(TEST_SECRET);
        let signature = compute_test_signature(TEST_SECRET, b"");

        assert!(verifier.verify(b"", &signature));
    }

    // ══════════════════════════════════════════════════════════════
    // Constant-Time Comparison Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn constant_time_compare_equal_values() {
        assert!(constant_time_compare(&[1, 2, 3], &[1, 2, 3]));
    }

    #[test]
    fn constant_time_compare_different_values() {
        assert!(!constant_time_compare(&[1, 2, 3], &[1, 2, 4]));
    }

    #[test]
    fn constant_time_compare_different_lengths() {
        assert!(!constant_time_compare(&[1, 2, 3], &[1, 2, 3, 4]));
    }

    #[test]
    fn constant_time_compare_empty_slices() {
        assert!(constant_time_compare(&[], &[]));
    }

    // ══════════════════════════════════════════════════════════════
    // Property Tests
    // ══════════════════════════════════════════════════════════════

    proptest! {
        #[test]
        fn signed_payloads_always_verify(
            payload in proptest::collection::vec(any::<u8>(), 0..512),
            secret in "[A-Za-z0-9_]{8,40}",
        ) {
            let verifier = CreemWebhookVerifier::new(secret.clone());
            let signature = compute_test_signature(&secret, &payload);
            prop_assert!(verifier.verify(&payload, &signature));
        }

        #[test]
        fn single_bit_flips_never_verify(
            payload in proptest::collection::vec(any::<u8>(), 1..512),
            secret in "[a-z0-9]{8,32}",
            index in any::<prop::sample::Index>(),
            bit in 0u8..8,
        ) {
            let verifier = CreemWebhookVerifier::new(secret.clone());
            let signature = compute_test_signature(&secret, &payload);

            let mut mutated = payload.clone();
            let i = index.index(mutated.len());
            mutated[i] ^= 1 << bit;

            prop_assert!(!verifier.verify(&mutated, &signature));
        }
    }
}

//! PKCE verification.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};

/// Verify a code verifier against the challenge stored with the
/// authorization code.
///
/// `S256` compares the base64url-unpadded SHA-256 of the verifier; `plain`
/// (and any unrecognized method) compares verbatim.
/// An absent stored challenge disables PKCE.
pub fn verify_pkce(challenge: &str, method: &str, verifier: &str) -> bool {
    if challenge.is_empty() {
        return true;
    }
    let computed = if method == "S256" {
        URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
    } else {
        verifier.to_string()
    };
    computed == challenge
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s256(verifier: &str) -> String {
        URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
    }

    #[test]
    fn test_s256_roundtrip() {
        // verify(S256, b64url(sha256(v)), v) holds for
        // RFC 7636-length verifiers.
        for verifier in [
            "a".repeat(43),
            "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk".to_string(),
            "x".repeat(128),
        ] {
            assert!(verify_pkce(&s256(&verifier), "S256", &verifier));
        }
    }

    #[test]
    fn test_s256_wrong_verifier() {
        let verifier = "a".repeat(43);
        let other = "b".repeat(43);
        assert!(!verify_pkce(&s256(&verifier), "S256", &other));
    }

    #[test]
    fn test_plain_comparison() {
        assert!(verify_pkce("verbatim-value", "plain", "verbatim-value"));
        assert!(!verify_pkce("verbatim-value", "plain", "different"));
    }

    #[test]
    fn test_absent_challenge_disables_pkce() {
        assert!(verify_pkce("", "S256", "anything"));
        assert!(verify_pkce("", "", ""));
    }

    #[test]
    fn test_rfc7636_appendix_b_vector() {
        assert!(verify_pkce(
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM",
            "S256",
            "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"
        ));
    }
}

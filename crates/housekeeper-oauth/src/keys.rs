//! Per-process RS256 signing key.

use crate::error::OauthError;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{DecodingKey, EncodingKey};
use rsa::pkcs1::{EncodeRsaPrivateKey, EncodeRsaPublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde_json::{json, Value};

/// RSA key pair generated once at startup. Immutable afterwards; readers
/// never synchronize.
pub struct SigningKey {
    kid: String,
    encoding: EncodingKey,
    decoding: DecodingKey,
    n_b64: String,
    e_b64: String,
}

impl SigningKey {
    /// Generate a fresh 2048-bit key pair. The key identifier is a
    /// 16-character prefix of the base64url-encoded modulus.
    pub fn generate() -> Result<Self, OauthError> {
        let mut rng = rand::thread_rng();
        let private = RsaPrivateKey::new(&mut rng, 2048)
            .map_err(|e| OauthError::KeyGeneration(e.to_string()))?;
        Self::from_private(private)
    }

    fn from_private(private: RsaPrivateKey) -> Result<Self, OauthError> {
        let public: RsaPublicKey = private.to_public_key();

        let n_bytes = public.n().to_bytes_be();
        let e_bytes = public.e().to_bytes_be();
        let n_b64 = URL_SAFE_NO_PAD.encode(&n_bytes);
        let e_b64 = URL_SAFE_NO_PAD.encode(&e_bytes);
        let kid = n_b64.chars().take(16).collect();

        let private_der = private
            .to_pkcs1_der()
            .map_err(|e| OauthError::KeyGeneration(e.to_string()))?;
        let public_der = public
            .to_pkcs1_der()
            .map_err(|e| OauthError::KeyGeneration(e.to_string()))?;

        Ok(Self {
            kid,
            encoding: EncodingKey::from_rsa_der(private_der.as_bytes()),
            decoding: DecodingKey::from_rsa_der(public_der.as_bytes()),
            n_b64,
            e_b64,
        })
    }

    /// The key identifier carried in every token header and the JWKS.
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Key for signing access tokens.
    pub fn encoding(&self) -> &EncodingKey {
        &self.encoding
    }

    /// Key for verifying access tokens.
    pub fn decoding(&self) -> &DecodingKey {
        &self.decoding
    }

    /// The public key as an RSA JWK.
    pub fn jwk(&self) -> Value {
        json!({
            "kty": "RSA",
            "kid": self.kid,
            "use": "sig",
            "alg": "RS256",
            "n": self.n_b64,
            "e": self.e_b64,
        })
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey").field("kid", &self.kid).finish()
    }
}

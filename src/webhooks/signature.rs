use hmac::{Hmac, Mac};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// A single way of authenticating a callback against the raw body bytes.
/// Strategies are tried in order; one success authenticates the request.
pub trait SignatureStrategy: Send + Sync {
    fn verify(&self, signature: &str, body: &[u8]) -> bool;
}

#[derive(Debug, Deserialize)]
struct TokenClaims {
    body: String,
}

/// Compact HS256 token whose `body` claim carries the base64 SHA-256 digest
/// of the request body. Verified under the current signing key, then the
/// next key when one is configured.
pub struct SignedTokenStrategy {
    current_key: String,
    next_key: Option<String>,
}

impl SignedTokenStrategy {
    pub fn new(current_key: String, next_key: Option<String>) -> Self {
        Self {
            current_key,
            next_key,
        }
    }

    fn decode_with(&self, signature: &str, key: &str) -> Option<TokenClaims> {
        decode::<TokenClaims>(
            signature,
            &DecodingKey::from_secret(key.as_ref()),
            &Validation::new(Algorithm::HS256),
        )
        .ok()
        .map(|data| data.claims)
    }
}

impl SignatureStrategy for SignedTokenStrategy {
    fn verify(&self, signature: &str, body: &[u8]) -> bool {
        let claims = match self.decode_with(signature, &self.current_key) {
            Some(claims) => Some(claims),
            None => self
                .next_key
                .as_deref()
                .and_then(|key| self.decode_with(signature, key)),
        };

        let Some(claims) = claims
        else {
            return false;
        };

        // a valid token is not enough: the digest must match the bytes
        // actually received
        claims.body == base64::encode(Sha256::digest(body))
    }
}

/// Comma-separated `version=value` header entries; every `v1=` entry is a
/// base64 HMAC-SHA256 over the raw body. Comparison is constant-time.
pub struct HmacStrategy {
    current_key: String,
    next_key: Option<String>,
}

impl HmacStrategy {
    pub fn new(current_key: String, next_key: Option<String>) -> Self {
        Self {
            current_key,
            next_key,
        }
    }

    fn matches_with(&self, provided: &[u8], body: &[u8], key: &str) -> bool {
        let Ok(mut mac) = HmacSha256::new_from_slice(key.as_bytes())
        else {
            return false;
        };

        mac.update(body);
        mac.verify_slice(provided).is_ok()
    }
}

impl SignatureStrategy for HmacStrategy {
    fn verify(&self, signature: &str, body: &[u8]) -> bool {
        for part in signature.split(',') {
            let Some(value) = part.trim().strip_prefix("v1=")
            else {
                continue;
            };

            let Ok(provided) = base64::decode(value)
            else {
                continue;
            };

            if self.matches_with(&provided, body, &self.current_key) {
                return true;
            }

            if let Some(next_key) = &self.next_key {
                if self.matches_with(&provided, body, next_key) {
                    return true;
                }
            }
        }

        false
    }
}

pub struct SignatureVerifier {
    strategies: Vec<Box<dyn SignatureStrategy>>,
}

impl SignatureVerifier {
    pub fn new(current_key: &str, next_key: Option<&str>) -> Self {
        Self {
            strategies: vec![
                Box::new(SignedTokenStrategy::new(
                    current_key.to_string(),
                    next_key.map(str::to_string),
                )),
                Box::new(HmacStrategy::new(
                    current_key.to_string(),
                    next_key.map(str::to_string),
                )),
            ],
        }
    }

    /// Must be called with the raw, unmodified body bytes, before any
    /// deserialization.
    pub fn verify(&self, signature: &str, body: &[u8]) -> bool {
        self.strategies
            .iter()
            .any(|strategy| strategy.verify(signature, body))
    }
}

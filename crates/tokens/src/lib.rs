//! Ed25519 capability tokens: compact signed envelopes carrying a role,
//! optional account scoping, a capability set, and an expiry. Signing is
//! delegated to a [`KeySource`] collaborator (the external key-management
//! service of the spec's §6); verification is pure given a public key.

mod body;
mod error;
mod key_source;

pub use body::{TokenBody, ValidToken};
pub use error::TokenError;
pub use key_source::{InMemoryKeySource, KeySource};

use base64::Engine;
use std::collections::HashMap;

const B64: base64::engine::GeneralPurpose = base64::engine::general_purpose::URL_SAFE_NO_PAD;

/// TokenAuthority issues and verifies tokens on behalf of the control plane.
/// It never holds private key material itself -- that lives behind the
/// `KeySource` -- and verification takes an explicit public key so callers
/// can verify tokens without depending on a live KeySource at all.
pub struct TokenAuthority<K: KeySource> {
    key_source: K,
    key_path: String,
}

impl<K: KeySource> TokenAuthority<K> {
    pub fn new(key_source: K, key_path: impl Into<String>) -> Self {
        Self {
            key_source,
            key_path: key_path.into(),
        }
    }

    /// Fetches (or lazily provisions) the public key this authority signs
    /// under, for publishing to verifiers and hubs.
    pub fn public_key(&self) -> Result<[u8; 32], TokenError> {
        self.key_source.public_key(&self.key_path)
    }

    /// Signs `body` under `key_id` (a named key version at the KeySource),
    /// producing the compact token string `base64(body).base64(sig).key_id`.
    pub fn issue(&self, body: &TokenBody, key_id: &str) -> Result<String, TokenError> {
        let body_json =
            serde_json::to_vec(body).map_err(|e| TokenError::Encode(e.to_string()))?;
        let sig = self.key_source.sign(key_id, &body_json)?;

        Ok(format!(
            "{}.{}.{}",
            B64.encode(&body_json),
            B64.encode(sig),
            key_id
        ))
    }
}

/// Verifies `token` against `public_key`, returning the validated body and
/// the key id it was signed under. This is a free function (rather than a
/// TokenAuthority method) because verification needs no KeySource: any
/// holder of the public key can check a token, which is the whole point of
/// asymmetric signing here.
pub fn verify(token: &str, public_key: &[u8; 32]) -> Result<ValidToken, TokenError> {
    let mut parts = token.splitn(3, '.');
    let (body_part, sig_part, key_id) = match (parts.next(), parts.next(), parts.next()) {
        (Some(b), Some(s), Some(k)) => (b, s, k),
        _ => return Err(TokenError::Malformed),
    };

    let body_json = B64
        .decode(body_part)
        .map_err(|_| TokenError::Malformed)?;
    let sig = B64.decode(sig_part).map_err(|_| TokenError::Malformed)?;

    let unparsed = ring::signature::UnparsedPublicKey::new(&ring::signature::ED25519, public_key);
    unparsed
        .verify(&body_json, &sig)
        .map_err(|_| TokenError::BadSignature)?;

    let body: TokenBody =
        serde_json::from_slice(&body_json).map_err(|e| TokenError::Encode(e.to_string()))?;

    if let Some(expires_at) = body.expires_at {
        if expires_at <= chrono::Utc::now() {
            return Err(TokenError::Expired);
        }
    }

    Ok(ValidToken {
        body,
        key_id: key_id.to_string(),
    })
}

/// Builds the capability map for a `HashMap<String, String>`-shaped request,
/// matching the RPC layer's representation of `{capability, argument}` pairs.
pub fn capabilities_from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> HashMap<String, String> {
    pairs.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::Role;

    fn authority() -> TokenAuthority<InMemoryKeySource> {
        TokenAuthority::new(InMemoryKeySource::new(), "/control/keys")
    }

    #[test]
    fn round_trip_preserves_body() {
        let auth = authority();
        let pubkey = auth.public_key().unwrap();

        let mut body = TokenBody::new(Role::Manage);
        body.account_namespace = Some("/acme".to_string());
        body.capabilities
            .insert("access".to_string(), "/acme".to_string());

        let token = auth.issue(&body, "k1").unwrap();
        let valid = verify(&token, &pubkey).unwrap();

        assert_eq!(valid.body, body);
        assert_eq!(valid.key_id, "k1");
    }

    #[test]
    fn tampered_body_fails_verification() {
        let auth = authority();
        let pubkey = auth.public_key().unwrap();
        let body = TokenBody::new(Role::Hub);
        let token = auth.issue(&body, "k1").unwrap();

        let mut parts: Vec<&str> = token.splitn(3, '.').collect();
        let tampered_body = B64.encode(b"{\"role\":\"Manage\"}");
        parts[0] = &tampered_body;
        let tampered = parts.join(".");

        assert!(verify(&tampered, &pubkey).is_err());
    }

    #[test]
    fn wrong_public_key_fails_verification() {
        let auth = authority();
        let other = InMemoryKeySource::new();
        let other_pubkey = other.public_key("/other/keys").unwrap();

        let body = TokenBody::new(Role::Hub);
        let token = auth.issue(&body, "k1").unwrap();

        assert!(verify(&token, &other_pubkey).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let auth = authority();
        let pubkey = auth.public_key().unwrap();

        let mut body = TokenBody::new(Role::Hub);
        body.expires_at = Some(chrono::Utc::now() - chrono::Duration::seconds(1));
        let token = auth.issue(&body, "k1").unwrap();

        assert!(matches!(verify(&token, &pubkey), Err(TokenError::Expired)));
    }
}

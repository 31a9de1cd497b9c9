use crate::TokenError;
use ring::signature::KeyPair;
use std::collections::HashMap;
use std::sync::Mutex;

/// KeySource is the external key-management collaborator of the spec's §6:
/// it generates ed25519 keypairs under a path and signs byte strings with a
/// named key version. Private material never leaves the implementation.
pub trait KeySource {
    /// Returns the public key for `path`, generating a keypair under that
    /// path on first use.
    fn public_key(&self, path: &str) -> Result<[u8; 32], TokenError>;

    /// Signs `message` with the key version named `key_id`, generating it
    /// under the implicit default path on first use if absent.
    fn sign(&self, key_id: &str, message: &[u8]) -> Result<Vec<u8>, TokenError>;
}

/// InMemoryKeySource is a process-local stand-in for the production KMS
/// collaborator (e.g. Vault transit or a cloud KMS), used in tests and for
/// local development. Keys are generated lazily and held for the process
/// lifetime; they are never persisted.
pub struct InMemoryKeySource {
    keys: Mutex<HashMap<String, ring::signature::Ed25519KeyPair>>,
}

impl InMemoryKeySource {
    pub fn new() -> Self {
        Self {
            keys: Mutex::new(HashMap::new()),
        }
    }

    fn get_or_create<'a>(
        keys: &'a mut HashMap<String, ring::signature::Ed25519KeyPair>,
        name: &str,
    ) -> Result<&'a ring::signature::Ed25519KeyPair, TokenError> {
        if !keys.contains_key(name) {
            let rng = ring::rand::SystemRandom::new();
            let pkcs8 = ring::signature::Ed25519KeyPair::generate_pkcs8(&rng)
                .map_err(|e| TokenError::KeySource(e.to_string()))?;
            let pair = ring::signature::Ed25519KeyPair::from_pkcs8(pkcs8.as_ref())
                .map_err(|e| TokenError::KeySource(e.to_string()))?;
            keys.insert(name.to_string(), pair);
        }
        Ok(keys.get(name).expect("just inserted"))
    }
}

impl Default for InMemoryKeySource {
    fn default() -> Self {
        Self::new()
    }
}

impl KeySource for InMemoryKeySource {
    fn public_key(&self, path: &str) -> Result<[u8; 32], TokenError> {
        let mut keys = self.keys.lock().expect("key source mutex poisoned");
        let pair = Self::get_or_create(&mut keys, path)?;
        let mut out = [0u8; 32];
        out.copy_from_slice(pair.public_key().as_ref());
        Ok(out)
    }

    fn sign(&self, key_id: &str, message: &[u8]) -> Result<Vec<u8>, TokenError> {
        let mut keys = self.keys.lock().expect("key source mutex poisoned");
        let pair = Self::get_or_create(&mut keys, key_id)?;
        Ok(pair.sign(message).as_ref().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signing_with_same_key_id_is_verifiable_against_its_own_public_key() {
        let ks = InMemoryKeySource::new();
        let pubkey = ks.public_key("k1").unwrap();
        let sig = ks.sign("k1", b"hello").unwrap();

        let unparsed = ring::signature::UnparsedPublicKey::new(&ring::signature::ED25519, &pubkey);
        assert!(unparsed.verify(b"hello", &sig).is_ok());
    }
}

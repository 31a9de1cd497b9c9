use models::Role;
use std::collections::HashMap;

/// TokenBody is the signed payload of a capability token. Capabilities are
/// kept as a plain string map rather than the `Capability` enum so that
/// forward-compatible capability names round-trip even if this binary
/// doesn't know about them yet.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TokenBody {
    pub role: Role,
    pub account_id: Option<models::Id>,
    pub account_namespace: Option<String>,
    pub capabilities: HashMap<String, String>,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl TokenBody {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            account_id: None,
            account_namespace: None,
            capabilities: HashMap::new(),
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, valid_for: chrono::Duration) -> Self {
        self.expires_at = Some(chrono::Utc::now() + valid_for);
        self
    }
}

/// ValidToken is the result of a successful [`crate::verify`] call: the
/// verified body, plus the id of the key it was signed under (so callers can
/// track key rotation without re-parsing the raw token).
#[derive(Clone, Debug, PartialEq)]
pub struct ValidToken {
    pub body: TokenBody,
    pub key_id: String,
}

impl ValidToken {
    /// Returns the capability's argument, if present.
    pub fn has_capability(&self, name: &str) -> Option<&str> {
        self.body.capabilities.get(name).map(String::as_str)
    }

    /// True iff this token's namespace permits operating on `requested`.
    pub fn allows_namespace(&self, requested: &str) -> bool {
        match &self.body.account_namespace {
            Some(granted) => models::namespace_allows(granted, requested),
            None => false,
        }
    }
}

/// The role carried by a capability token's signed body.
#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Role {
    Hub,
    Manage,
    Access,
}

/// A capability name a token's body may carry, each with a string argument
/// (e.g. `Access` carries the namespace it grants read access to).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Capability {
    Connect,
    Serve,
    Access,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Connect => "connect",
            Capability::Serve => "serve",
            Capability::Access => "access",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

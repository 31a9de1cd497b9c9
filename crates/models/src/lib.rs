//! Shared value types for the control-fabric crates: account/hub/service
//! identifiers, the canonical label encoding, and namespace scoping rules.
//! Modeled on `agent-sql`'s `Id` newtype: a fixed-width identifier with a
//! custom textual `Display` and, behind the `sqlx-support` feature, a custom
//! `sqlx::Type` impl so callers can bind it directly in queries.

mod id;
mod label;
mod namespace;
mod role;

pub use id::Id;
pub use label::{explode_labels, flatten_labels, Label};
pub use namespace::namespace_allows;
pub use role::{Capability, Role};

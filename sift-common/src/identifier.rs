//! Deterministic identifier derivation
//!
//! Identifiers are name-based (version 5) UUIDs: the same input under the
//! same namespace always yields the same `objectID`, which is what lets the
//! policies test whether an existing record was derived from its title or
//! slug.

use uuid::Uuid;

/// Namespace used when none is configured
pub const DEFAULT_NAMESPACE: Uuid = Uuid::NAMESPACE_URL;

/// Derives `objectID` values from arbitrary strings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdDeriver {
    namespace: Uuid,
}

impl IdDeriver {
    pub fn new(namespace: Uuid) -> Self {
        Self { namespace }
    }

    pub fn namespace(&self) -> Uuid {
        self.namespace
    }

    /// Derive the identifier for `input`
    pub fn derive(&self, input: &str) -> String {
        Uuid::new_v5(&self.namespace, input.as_bytes()).to_string()
    }

    /// Derive from several parts joined with `;`
    pub fn derive_parts(&self, parts: &[&str]) -> String {
        self.derive(&parts.join(";"))
    }

    /// True when `object_id` is exactly the identifier derived from `input`
    pub fn matches(&self, object_id: &str, input: &str) -> bool {
        self.derive(input) == object_id
    }
}

impl Default for IdDeriver {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

/// Parse a namespace UUID from configuration text
pub fn parse_namespace(s: &str) -> Result<Uuid, uuid::Error> {
    Uuid::parse_str(s.trim())
}

//! Scope derivation between agent ids and remote store identities.

/// Default prefix for derived scope identities.
pub const DEFAULT_SCOPE_PREFIX: &str = "engram_agent";
/// Agent id reported when a scope carries no usable remainder.
pub(crate) const FALLBACK_AGENT_ID: &str = "default";

/// Maps agent ids to remote scope identities and back.
///
/// Injected into the adapter so tests can substitute deterministic scopes.
pub trait ScopeResolver: Send + Sync {
    /// Remote scope identity for an agent.
    fn scope_id(&self, agent_id: &str) -> String;
    /// Agent id reconstructed from a remote scope identity.
    fn agent_id(&self, scope_id: &str) -> String;
}

/// Derives scopes as `"<prefix>_<agent_id>"`.
#[derive(Debug, Clone)]
pub struct PrefixScopeResolver {
    prefix: String,
}

impl PrefixScopeResolver {
    /// Resolver using the given prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for PrefixScopeResolver {
    fn default() -> Self {
        Self::new(DEFAULT_SCOPE_PREFIX)
    }
}

impl ScopeResolver for PrefixScopeResolver {
    fn scope_id(&self, agent_id: &str) -> String {
        format!("{}_{agent_id}", self.prefix)
    }

    fn agent_id(&self, scope_id: &str) -> String {
        let remainder = scope_id
            .strip_prefix(self.prefix.as_str())
            .and_then(|rest| rest.strip_prefix('_'))
            .unwrap_or(scope_id);
        if remainder.is_empty() {
            FALLBACK_AGENT_ID.to_string()
        } else {
            remainder.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PrefixScopeResolver, ScopeResolver};
    use pretty_assertions::assert_eq;

    #[test]
    fn scope_round_trips_agent_id() {
        let scopes = PrefixScopeResolver::default();
        let scope = scopes.scope_id("agent-7");
        assert_eq!(scope, "engram_agent_agent-7");
        assert_eq!(scopes.agent_id(&scope), "agent-7");
    }

    #[test]
    fn unprefixed_scope_is_kept_as_is() {
        let scopes = PrefixScopeResolver::default();
        assert_eq!(scopes.agent_id("other_tenant_x"), "other_tenant_x");
    }

    #[test]
    fn empty_remainder_falls_back_to_default() {
        let scopes = PrefixScopeResolver::default();
        assert_eq!(scopes.agent_id("engram_agent_"), "default");
    }
}

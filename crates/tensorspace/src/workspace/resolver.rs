//! Single-hop alias table from logical tensor names to storage keys.

use std::collections::HashMap;

/// Rewrites a logical name to its storage name, one indirection at most.
///
/// Resolution is deliberately not transitive: chaining `a -> b` and
/// `b -> c` still resolves `a` to `b`. Every public workspace operation
/// resolves exactly once at its entry point; internal paths only ever see
/// already-resolved names.
#[derive(Debug, Default)]
pub(crate) struct NameResolver {
    aliases: HashMap<String, String>,
}

impl NameResolver {
    /// Returns the alias target for `name`, or `name` itself when no alias
    /// is defined.
    pub(crate) fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        self.aliases.get(name).map(String::as_str).unwrap_or(name)
    }

    /// Redirects future lookups of `old` to `new`, overwriting any prior
    /// mapping for `old`.
    pub(crate) fn define_alias(&mut self, old: impl Into<String>, new: impl Into<String>) {
        self.aliases.insert(old.into(), new.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unaliased_names_resolve_to_themselves() {
        let resolver = NameResolver::default();
        assert_eq!(resolver.resolve("w"), "w");
    }

    #[test]
    fn resolution_is_a_single_hop() {
        let mut resolver = NameResolver::default();
        resolver.define_alias("old", "mid");
        resolver.define_alias("mid", "final");
        assert_eq!(resolver.resolve("old"), "mid");
        assert_eq!(resolver.resolve("mid"), "final");
    }

    #[test]
    fn redefinition_overwrites() {
        let mut resolver = NameResolver::default();
        resolver.define_alias("w", "a");
        resolver.define_alias("w", "b");
        assert_eq!(resolver.resolve("w"), "b");
    }
}

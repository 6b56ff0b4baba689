use std::collections::HashMap;

/// Exact-host index over domain-only rules.
///
/// Maps each blocked host to the position of its rule in the rule set.
#[derive(Debug, Clone, Default)]
pub struct DomainIndex {
    hosts: HashMap<String, usize>,
}

impl DomainIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a host; the first position inserted for a host wins.
    pub fn insert(&mut self, host: impl Into<String>, position: usize) {
        self.hosts.entry(host.into()).or_insert(position);
    }

    /// Position of the rule blocking exactly this host.
    pub fn get(&self, host: &str) -> Option<usize> {
        if host.is_empty() {
            return None;
        }
        self.hosts.get(host).copied()
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

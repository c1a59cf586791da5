//! Lexical resource counting for generated policies.
//!
//! The count is approximate: a tag marker that appears inside a comment or a string value is
//! counted just like a real resource node.

use std::collections::BTreeMap;

/////////////////////////////////////////// ResourceKind ///////////////////////////////////////////

/// The resource tags recognized throughout the pipeline.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum ResourceKind {
    /// `!policy`
    Policy,
    /// `!user`
    User,
    /// `!host`
    Host,
    /// `!group`
    Group,
    /// `!variable`
    Variable,
    /// `!grant`
    Grant,
    /// `!permit`
    Permit,
    /// `!webservice`
    Webservice,
}

impl ResourceKind {
    /// Every resource kind, in the order they are reported.
    pub const ALL: [ResourceKind; 8] = [
        ResourceKind::Policy,
        ResourceKind::User,
        ResourceKind::Host,
        ResourceKind::Group,
        ResourceKind::Variable,
        ResourceKind::Grant,
        ResourceKind::Permit,
        ResourceKind::Webservice,
    ];

    /// The bare tag name, e.g. "policy".
    pub fn name(self) -> &'static str {
        match self {
            ResourceKind::Policy => "policy",
            ResourceKind::User => "user",
            ResourceKind::Host => "host",
            ResourceKind::Group => "group",
            ResourceKind::Variable => "variable",
            ResourceKind::Grant => "grant",
            ResourceKind::Permit => "permit",
            ResourceKind::Webservice => "webservice",
        }
    }

    /// The tag marker as it appears in policy text, e.g. "!policy".
    pub fn marker(self) -> &'static str {
        match self {
            ResourceKind::Policy => "!policy",
            ResourceKind::User => "!user",
            ResourceKind::Host => "!host",
            ResourceKind::Group => "!group",
            ResourceKind::Variable => "!variable",
            ResourceKind::Grant => "!grant",
            ResourceKind::Permit => "!permit",
            ResourceKind::Webservice => "!webservice",
        }
    }

    /// Look up a kind by its bare tag name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

////////////////////////////////////////// ResourceCounts //////////////////////////////////////////

/// Occurrence counts for every [`ResourceKind`].
///
/// Every kind is always present, zero counts included.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResourceCounts {
    counts: BTreeMap<ResourceKind, usize>,
}

impl ResourceCounts {
    /// All kinds at zero.
    pub fn new() -> Self {
        Self {
            counts: ResourceKind::ALL.into_iter().map(|kind| (kind, 0)).collect(),
        }
    }

    /// The count for one kind.
    pub fn get(&self, kind: ResourceKind) -> usize {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    /// Sum of all counts.
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// Iterate `(kind, count)` in reporting order.
    pub fn iter(&self) -> impl Iterator<Item = (ResourceKind, usize)> + '_ {
        self.counts.iter().map(|(kind, count)| (*kind, *count))
    }

    pub(crate) fn record(&mut self, kind: ResourceKind) {
        *self.counts.entry(kind).or_insert(0) += 1;
    }
}

impl Default for ResourceCounts {
    fn default() -> Self {
        Self::new()
    }
}

impl serde::Serialize for ResourceCounts {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.counts.len()))?;
        for (kind, count) in self.iter() {
            map.serialize_entry(kind.name(), &count)?;
        }
        map.end()
    }
}

/// Count resource tag markers line by line.
///
/// A line holding markers of two different kinds increments both kinds.  A kind is counted at
/// most once per line.
pub fn analyze_resources(policy: &str) -> ResourceCounts {
    let mut counts = ResourceCounts::new();
    for line in policy.lines() {
        let line = line.trim();
        for kind in ResourceKind::ALL {
            if line.contains(kind.marker()) {
                counts.record(kind);
            }
        }
    }
    counts
}

/////////////////////////////////////////////// tests //////////////////////////////////////////////

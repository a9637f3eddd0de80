//! Network code -> Wikimedia Commons image-name template.
//!
//! Templates contain a `{ref}` placeholder for the route number, e.g.
//! `"I-{ref}.svg"` for the US Interstate network.

use std::collections::BTreeMap;

/// Placeholder replaced by the route number.
pub const REF_PLACEHOLDER: &str = "{ref}";

/// Built-in templates, keyed by OSM-style network code.
const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    ("US:I", "I-{ref}.svg"),
    ("US:US", "US {ref}.svg"),
    ("US:AZ", "Arizona {ref}.svg"),
    ("US:CA", "California {ref}.svg"),
    ("US:CO", "Colorado {ref}.svg"),
    ("US:FL", "Florida {ref}.svg"),
    ("US:GA", "Georgia {ref}.svg"),
    ("US:IL", "Illinois {ref}.svg"),
    ("US:MI", "M-{ref}.svg"),
    ("US:MN", "MN-{ref}.svg"),
    ("US:NY", "NY-{ref}.svg"),
    ("US:OR", "Oregon {ref}.svg"),
    ("US:TX", "Texas {ref}.svg"),
    ("US:UT", "Utah {ref}.svg"),
    ("US:WA", "WA-{ref}.svg"),
];

/// Read-only mapping built once at startup.
#[derive(Debug, Clone, Default)]
pub struct ShieldLookupTable {
    templates: BTreeMap<String, String>,
}

impl ShieldLookupTable {
    /// The built-in table.
    pub fn builtin() -> Self {
        Self::from_entries(
            BUILTIN_TEMPLATES
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string())),
        )
    }

    /// Built-in table plus `overrides` (which win on conflict).
    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Self {
        let mut table = Self::builtin();
        for (network, template) in overrides {
            table.insert(network, template);
        }
        table
    }

    /// Table containing only the given entries. Entries without a `{ref}`
    /// placeholder are skipped.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut table = Self::default();
        for (network, template) in entries {
            table.insert(&network, &template);
        }
        table
    }

    fn insert(&mut self, network: &str, template: &str) {
        let network = network.trim();
        if network.is_empty() || !template.contains(REF_PLACEHOLDER) {
            tracing::warn!(network, template, "ignoring shield template without {{ref}}");
            return;
        }
        self.templates
            .insert(network.to_string(), template.to_string());
    }

    pub fn template(&self, network: &str) -> Option<&str> {
        self.templates.get(network).map(String::as_str)
    }

    /// Canonical Commons file name for a route, or `None` for unsupported networks.
    ///
    /// `{ref}` is replaced by `route_number`, then spaces become underscores:
    /// `("US:US", "2")` -> `"US_2.svg"`.
    pub fn image_name(&self, network: &str, route_number: &str) -> Option<String> {
        let template = self.template(network)?;
        Some(
            template
                .replace(REF_PLACEHOLDER, route_number.trim())
                .replace(' ', "_"),
        )
    }

    /// All entries, sorted by network code.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.templates
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

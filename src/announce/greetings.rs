use std::collections::HashMap;

/// Placeholder replaced with the identity label in every template
pub const NAME_PLACEHOLDER: &str = "{name}";

/// Label the backend assigns to faces it could not match
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Static mapping from identity label to greeting template
#[derive(Debug, Clone)]
pub struct GreetingTable {
    entries: HashMap<String, String>,
    generic: String,
}

impl GreetingTable {
    pub fn new(generic: impl Into<String>) -> Self {
        Self {
            entries: HashMap::new(),
            generic: generic.into(),
        }
    }

    /// Add or replace the template for `label`
    pub fn insert(&mut self, label: impl Into<String>, template: impl Into<String>) {
        self.entries.insert(label.into(), template.into());
    }

    /// Replace the template used for unmapped labels
    pub fn set_generic(&mut self, template: impl Into<String>) {
        self.generic = template.into();
    }

    pub fn with_entries<I, K, V>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (label, template) in entries {
            self.insert(label, template);
        }
        self
    }

    /// Build the message for `label`; exact match, generic template otherwise
    pub fn render(&self, label: &str) -> String {
        let template = self.entries.get(label).unwrap_or(&self.generic);
        template.replace(NAME_PLACEHOLDER, label)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.entries.contains_key(label)
    }
}

impl Default for GreetingTable {
    fn default() -> Self {
        Self::new("Hello {name}, welcome!")
            .with_entries([(UNKNOWN_LABEL, "Hello there, I don't believe we've met.")])
    }
}

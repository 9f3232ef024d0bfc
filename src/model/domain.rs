//! Coded-value domains
//!
//! A domain maps numeric codes to display text for one (layer, field) pair.
//! Domains registered under the wildcard layer token serve as the fallback
//! for every layer that has no domain of its own for that field.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Build the normalized domain key for a (layer, field) pair
pub fn domain_key(layer_code: &str, field_code: &str) -> String {
    format!("{}.{}", layer_code.trim(), field_code.trim()).to_uppercase()
}

/// Normalize a caller-supplied domain key (trimmed, uppercased)
pub fn normalize_key(key: &str) -> String {
    key.trim().to_uppercase()
}

/// One coded entry of a domain. Versioned: updates need a strictly newer version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainValue {
    pub id: Uuid,
    pub layer_code: String,
    pub field_code: String,
    pub code: i64,
    pub value: String,
    pub activation: bool,
    pub version: i64,
}

impl DomainValue {
    pub fn new(
        layer_code: impl Into<String>,
        field_code: impl Into<String>,
        code: i64,
        value: impl Into<String>,
        version: i64,
    ) -> Self {
        Self {
            id: Uuid::nil(),
            layer_code: layer_code.into(),
            field_code: field_code.into(),
            code,
            value: value.into(),
            activation: true,
            version,
        }
    }

    pub fn domain_key(&self) -> String {
        domain_key(&self.layer_code, &self.field_code)
    }

    /// First-sight state: version 0, blank text, active
    fn placeholder(input: &DomainValue) -> Self {
        let id = if input.id.is_nil() {
            Uuid::new_v4()
        } else {
            input.id
        };
        Self {
            id,
            layer_code: input.layer_code.clone(),
            field_code: input.field_code.clone(),
            code: input.code,
            value: String::new(),
            activation: true,
            version: 0,
        }
    }
}

/// All coded values of one domain key, in first-seen order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Domain {
    key: String,
    values: IndexMap<i64, DomainValue>,
}

impl Domain {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            values: IndexMap::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn get_value(&self, code: i64) -> Option<&DomainValue> {
        self.values.get(&code)
    }

    /// Entry for `input.code`, creating the first-sight placeholder if missing.
    /// The flag tells whether the entry was just created.
    pub(crate) fn value_or_insert(&mut self, input: &DomainValue) -> (&mut DomainValue, bool) {
        let created = !self.values.contains_key(&input.code);
        let value = self
            .values
            .entry(input.code)
            .or_insert_with(|| DomainValue::placeholder(input));
        (value, created)
    }

    pub fn values(&self) -> impl Iterator<Item = &DomainValue> {
        self.values.values()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Display text for a code
    pub fn text_of(&self, code: i64) -> Option<&str> {
        self.values.get(&code).map(|v| v.value.as_str())
    }

    /// Code whose display text matches `text` (case-insensitive, trimmed)
    pub fn code_of(&self, text: &str) -> Option<i64> {
        let text = text.trim();
        self.values
            .values()
            .find(|v| v.value.trim().eq_ignore_ascii_case(text))
            .map(|v| v.code)
    }
}

/// Borrowed lookup over the domain table with wildcard fallback
#[derive(Clone, Copy)]
pub struct DomainView<'a> {
    domains: &'a IndexMap<String, Domain>,
    wildcard: &'a str,
}

impl<'a> DomainView<'a> {
    pub fn new(domains: &'a IndexMap<String, Domain>, wildcard: &'a str) -> Self {
        Self { domains, wildcard }
    }

    /// Resolve by an already-built key; the key is normalized first
    pub fn by_key(&self, key: &str) -> Option<&'a Domain> {
        self.domains.get(&normalize_key(key))
    }

    /// Resolve the domain of (layer, field), falling back to the wildcard layer
    pub fn domain(&self, layer_code: &str, field_code: &str) -> Option<&'a Domain> {
        self.domains
            .get(&domain_key(layer_code, field_code))
            .or_else(|| self.domains.get(&domain_key(self.wildcard, field_code)))
    }
}

//! Response header map.

use alloc::string::String;
use alloc::vec::Vec;

/// Response headers, keyed by lower-cased name.
///
/// Repeated `set-cookie` headers are joined with `", "`; any other repeated
/// header replaces the earlier value.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a header, ignoring the case of `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Returns true if the header is present.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(name, value)` pairs; names are lower case.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub(crate) fn insert(&mut self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) if name == "set-cookie" => {
                existing.push_str(", ");
                existing.push_str(value);
            }
            Some((_, existing)) => {
                existing.clear();
                existing.push_str(value);
            }
            None => self.entries.push((name, String::from(value))),
        }
    }
}

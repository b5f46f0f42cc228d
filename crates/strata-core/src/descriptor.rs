//! Descriptors: the ordered field schema of one structured value.

use crate::codec::CodecRef;
use crate::error::Result;
use crate::registry::{CodecId, Registry};

/// Ordered mapping from field name to type name.
///
/// Field order defines both header order and data region order. Declaring
/// a field name twice replaces its type but keeps its original position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Descriptor {
    fields: Vec<(String, String)>,
}

impl Descriptor {
    /// Creates an empty descriptor
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field, builder style
    pub fn field(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.insert(name, type_name);
        self
    }

    /// Adds a field or replaces the type of an existing one
    pub fn insert(&mut self, name: impl Into<String>, type_name: impl Into<String>) {
        let name = name.into();
        let type_name = type_name.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = type_name,
            None => self.fields.push((name, type_name)),
        }
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the descriptor has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields as `(name, type name)` pairs in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.fields.iter().map(|(n, t)| (n.as_str(), t.as_str()))
    }

    /// Position of the named field
    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|(n, _)| n == name)
    }

    /// Declared type name of the named field
    pub fn type_of(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t.as_str())
    }

    /// Resolves every field against `registry`.
    ///
    /// Fails on the first unregistered type name; nothing is returned for the
    /// fields resolved before it.
    pub(crate) fn resolve(&self, registry: &Registry) -> Result<Vec<(CodecId, CodecRef)>> {
        self.fields
            .iter()
            .map(|(_, type_name)| {
                let id = registry.id_of(type_name)?;
                let codec = registry.resolve(type_name)?.clone();
                Ok((id, codec))
            })
            .collect()
    }
}

impl<N: Into<String>, T: Into<String>> FromIterator<(N, T)> for Descriptor {
    fn from_iter<I: IntoIterator<Item = (N, T)>>(iter: I) -> Self {
        let mut descriptor = Self::new();
        for (name, type_name) in iter {
            descriptor.insert(name, type_name);
        }
        descriptor
    }
}

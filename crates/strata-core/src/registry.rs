//! Type registry: codec lookup by name and by integer type ID.
//!
//! IDs are positions in registration order. A name keeps the ID it received
//! on first registration even when its codec is later replaced, and names are
//! never removed, so an ID never moves once assigned. Two processes agree on
//! IDs exactly when they registered the same names in the same order; compare
//! [`Registry::fingerprint`] values to check that before wrapping a buffer
//! produced elsewhere.

use crate::codec::{self, Codec, CodecRef};
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// Integer type ID as stored in buffer headers
pub type CodecId = i32;

/// Insertion-ordered mapping from type name to codec
#[derive(Debug, Clone, Default)]
pub struct Registry {
    codecs: Vec<CodecRef>,
    ids: HashMap<String, usize>,
}

impl Registry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in codec library.
    ///
    /// See [`codec::builtins`] for the registration order.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for codec in codec::builtins() {
            registry.register_shared(codec);
        }
        registry
    }

    /// Registers `codec` under its name, replacing any codec already there.
    ///
    /// Returns the codec's ID.
    pub fn register<C: Codec>(&mut self, codec: C) -> CodecId {
        self.register_shared(Arc::new(codec))
    }

    /// Registers an already shared codec. See [`Registry::register`].
    pub fn register_shared(&mut self, codec: CodecRef) -> CodecId {
        let name = codec.name().to_string();
        let index = match self.ids.get(&name) {
            Some(&index) => {
                debug!("Replacing codec '{}' (id {})", name, index);
                self.codecs[index] = codec;
                index
            }
            None => {
                let index = self.codecs.len();
                trace!("Registering codec '{}' as id {}", name, index);
                self.codecs.push(codec);
                self.ids.insert(name, index);
                index
            }
        };
        index as CodecId
    }

    /// Looks up a codec by name
    pub fn resolve(&self, name: &str) -> Result<&CodecRef> {
        self.ids
            .get(name)
            .map(|&index| &self.codecs[index])
            .ok_or_else(|| Error::unknown_type(name))
    }

    /// Returns the ID of the codec registered under `name`
    pub fn id_of(&self, name: &str) -> Result<CodecId> {
        self.ids
            .get(name)
            .map(|&index| index as CodecId)
            .ok_or_else(|| Error::unknown_type(name))
    }

    /// Looks up a codec by ID
    pub fn codec_at_id(&self, id: CodecId) -> Result<&CodecRef> {
        usize::try_from(id)
            .ok()
            .and_then(|index| self.codecs.get(index))
            .ok_or(Error::UnknownTypeId {
                id,
                registered: self.codecs.len(),
            })
    }

    /// Number of registered codecs
    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    /// Returns true if no codec is registered
    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }

    /// Registered names in ID order
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.codecs.iter().map(|c| c.name())
    }

    /// BLAKE3 digest of the `(id, name)` sequence.
    ///
    /// Registries with equal fingerprints assign the same ID to every name.
    /// Replacing a codec under an existing name does not change it. Use
    /// [`blake3::Hash::to_hex`] for a printable form.
    pub fn fingerprint(&self) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new();
        for (id, name) in self.names().enumerate() {
            hasher.update(&(id as u32).to_le_bytes());
            hasher.update(&(name.len() as u32).to_le_bytes());
            hasher.update(name.as_bytes());
        }
        hasher.finalize()
    }
}

//! Buffer construction.

use super::{FieldAccessor, SchemaBuffer, Wrapper, WrapperConfig};
use crate::codec::Codec;
use crate::descriptor::Descriptor;
use crate::error::{Error, Result};
use crate::layout;
use crate::registry::{CodecId, Registry};
use bytes::{BufMut, BytesMut};
use std::any::Any;
use tracing::debug;

/// Data region size used when none is configured
pub const DEFAULT_CAPACITY: usize = 1024;

/// Configuration for [`BufferBuilder`]
#[derive(Debug, Clone)]
pub struct BuilderConfig {
    /// Size of the data region in bytes, fixed for the builder's lifetime
    pub capacity: usize,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl BuilderConfig {
    /// Creates a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the data region size
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
}

/// Lays structured values out into a preallocated buffer.
///
/// The builder owns a [`Registry`] and one backing buffer. The data region
/// is allocated once at construction and never grows; writes that do not
/// fit fail with [`Error::CapacityExceeded`].
#[derive(Debug)]
pub struct BufferBuilder {
    registry: Registry,
    config: BuilderConfig,
    /// Zeroed data region, copied behind each new header
    blank: Vec<u8>,
    storage: BytesMut,
}

impl BufferBuilder {
    /// Creates a builder with the default capacity
    pub fn new(registry: Registry) -> Self {
        Self::with_config(registry, BuilderConfig::default())
    }

    /// Creates a builder with custom configuration
    pub fn with_config(registry: Registry, config: BuilderConfig) -> Self {
        Self {
            registry,
            blank: vec![0; config.capacity],
            storage: BytesMut::with_capacity(config.capacity),
            config,
        }
    }

    /// The builder's registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Registers a codec with the builder's registry
    pub fn register<C: Codec>(&mut self, codec: C) -> CodecId {
        self.registry.register(codec)
    }

    /// Size of the data region
    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Lays out an empty buffer for `descriptor` in the builder's storage.
    ///
    /// Fails with [`Error::UnknownType`] before touching the storage if any
    /// field type is not registered. The returned buffer borrows the builder,
    /// so a new call starts over from a fresh, zeroed data region.
    pub fn create_buffer(&mut self, descriptor: &Descriptor) -> Result<SchemaBuffer<&mut [u8]>> {
        let (fields, header) = plan(&self.registry, descriptor)?;

        self.storage.clear();
        self.storage.put_slice(&header);
        self.storage.put_slice(&self.blank);

        debug!(
            "Created buffer: {} fields, {} header bytes, {} data bytes",
            fields.len(),
            header.len(),
            self.blank.len()
        );

        let slots = vec![None; fields.len()];
        Ok(SchemaBuffer::from_parts(&mut self.storage[..], fields, slots))
    }

    /// Resolves `descriptor` once and returns a reusable [`Build`].
    pub fn create_build(&self, descriptor: &Descriptor) -> Result<Build> {
        let (fields, header) = plan(&self.registry, descriptor)?;
        Ok(Build {
            fields,
            header,
            blank: self.blank.clone(),
        })
    }

    /// Creates a [`Wrapper`] for `descriptor` sharing this builder's registry
    pub fn create_wrapper(&self, descriptor: &Descriptor) -> Result<Wrapper> {
        self.create_wrapper_with_config(descriptor, WrapperConfig::default())
    }

    /// Like [`BufferBuilder::create_wrapper`] with custom configuration
    pub fn create_wrapper_with_config(
        &self,
        descriptor: &Descriptor,
        config: WrapperConfig,
    ) -> Result<Wrapper> {
        // Surface unknown type names at setup time, as buffer creation does
        descriptor.resolve(&self.registry)?;
        Ok(Wrapper::with_config(
            self.registry.clone(),
            descriptor.clone(),
            config,
        ))
    }
}

/// Resolve field types and encode the header
fn plan(registry: &Registry, descriptor: &Descriptor) -> Result<(Vec<FieldAccessor>, BytesMut)> {
    let resolved = descriptor.resolve(registry)?;
    let ids: Vec<CodecId> = resolved.iter().map(|(id, _)| *id).collect();
    let fields = descriptor
        .iter()
        .zip(resolved)
        .map(|((name, _), (id, codec))| FieldAccessor::new(name, id, codec))
        .collect();
    Ok((fields, layout::encode_header(&ids)))
}

/// A descriptor resolved against a registry, ready to build buffers from values
#[derive(Debug, Clone)]
pub struct Build {
    fields: Vec<FieldAccessor>,
    header: BytesMut,
    blank: Vec<u8>,
}

impl Build {
    /// Builds a new buffer holding `values`.
    ///
    /// Fields are written in descriptor order. Every descriptor field needs a
    /// value; values for names outside the descriptor are ignored.
    pub fn build(&self, values: &Values) -> Result<SchemaBuffer<BytesMut>> {
        let storage = layout::concat(&self.header, &self.blank);
        let slots = vec![None; self.fields.len()];
        let mut buffer = SchemaBuffer::from_parts(storage, self.fields.clone(), slots);

        for (index, field) in self.fields.iter().enumerate() {
            let (value, found) = values
                .get(field.name())
                .ok_or_else(|| Error::missing_value(field.name()))?;
            buffer.store(index, value, found)?;
        }

        debug!(
            "Built buffer: {} fields, {} data bytes used",
            self.fields.len(),
            buffer.cursor().position()
        );
        Ok(buffer)
    }

    /// Field accessors in descriptor order
    pub fn accessors(&self) -> &[FieldAccessor] {
        &self.fields
    }
}

/// Name-keyed field values for [`Build::build`]
#[derive(Debug, Default)]
pub struct Values {
    entries: Vec<(String, Box<dyn Any>, &'static str)>,
}

impl Values {
    /// Creates an empty value set
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value, builder style
    pub fn with<T: Any>(mut self, name: impl Into<String>, value: T) -> Self {
        self.insert(name, value);
        self
    }

    /// Adds a value or replaces the value already stored under `name`
    pub fn insert<T: Any>(&mut self, name: impl Into<String>, value: T) {
        self.insert_boxed(name, Box::new(value), std::any::type_name::<T>());
    }

    /// Adds an already boxed value; `type_name` is reported on type mismatch
    pub fn insert_boxed(
        &mut self,
        name: impl Into<String>,
        value: Box<dyn Any>,
        type_name: &'static str,
    ) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _, _)| *n == name) {
            Some(entry) => {
                entry.1 = value;
                entry.2 = type_name;
            }
            None => self.entries.push((name, value, type_name)),
        }
    }

    /// Value stored under `name` with its type name
    pub fn get(&self, name: &str) -> Option<(&dyn Any, &'static str)> {
        self.entries
            .iter()
            .find(|(n, _, _)| n == name)
            .map(|(_, value, type_name)| (&**value, *type_name))
    }

    /// Number of values
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no value is stored
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Int8Codec, StringCodec, Uint8Codec};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_header_ids_are_registry_positions() {
        let mut registry = Registry::new();
        registry.register(Uint8Codec); // A
        registry.register(Int8Codec); // B
        registry.register(StringCodec); // C

        let mut builder = BufferBuilder::new(registry);
        let descriptor = Descriptor::new().field("x", "int8").field("y", "uint8");
        let buffer = builder.create_buffer(&descriptor).unwrap();

        assert_eq!(buffer.header(), &[1, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(buffer.data().len(), DEFAULT_CAPACITY);
        assert_eq!(buffer.as_bytes().len(), 8 + DEFAULT_CAPACITY);
    }

    #[test]
    fn test_unknown_type_rejected() {
        let mut builder = BufferBuilder::new(Registry::with_builtins());
        let descriptor = Descriptor::new().field("a", "int8").field("b", "decimal");

        assert!(matches!(
            builder.create_buffer(&descriptor),
            Err(Error::UnknownType { .. })
        ));
        assert!(matches!(
            builder.create_build(&descriptor),
            Err(Error::UnknownType { .. })
        ));
        assert!(matches!(
            builder.create_wrapper(&descriptor),
            Err(Error::UnknownType { .. })
        ));
    }

    #[test]
    fn test_name_age_scenario() {
        let mut registry = Registry::new();
        registry.register(Int8Codec);
        registry.register(StringCodec);
        let mut builder = BufferBuilder::new(registry);

        let descriptor = Descriptor::new().field("age", "int8").field("name", "string");
        let mut buffer = builder.create_buffer(&descriptor).unwrap();
        buffer.set("age", &25i8).unwrap();
        buffer.set("name", &"John Doe".to_string()).unwrap();

        assert_eq!(buffer.get::<i8>("age").unwrap(), 25);
        assert_eq!(buffer.get::<String>("name").unwrap(), "John Doe");
    }

    #[test]
    fn test_new_buffer_starts_clean() {
        let mut builder = BufferBuilder::new(Registry::with_builtins());
        let descriptor = Descriptor::new().field("n", "uint32");

        let mut first = builder.create_buffer(&descriptor).unwrap();
        first.set("n", &7u32).unwrap();
        let copied = first.copy();

        let second = builder.create_buffer(&descriptor).unwrap();
        assert!(!second.is_set("n"));
        assert!(second.data().iter().all(|&b| b == 0));
        assert_eq!(&copied[4..12], &[4, 0, 0, 0, 7, 0, 0, 0]);
    }

    #[test]
    fn test_copy_isolation() {
        let mut builder = BufferBuilder::new(Registry::with_builtins());
        let descriptor = Descriptor::new().field("a", "uint8").field("b", "uint8");
        let mut buffer = builder.create_buffer(&descriptor).unwrap();
        buffer.set("a", &1u8).unwrap();

        let copy = buffer.copy();
        buffer.set("a", &2u8).unwrap();
        buffer.set("b", &3u8).unwrap();
        assert_eq!(copy[8 + 4], 1);
        assert_eq!(&copy[8 + 5..8 + 10], &[0u8; 5]);

        let mut detached = copy.to_vec();
        detached[8 + 4] = 99;
        assert_eq!(buffer.get::<u8>("a").unwrap(), 2);
        assert_eq!(copy[8 + 4], 1);
        assert_ne!(detached[8 + 4], copy[8 + 4]);
    }

    #[test]
    fn test_build_from_values() {
        let builder = BufferBuilder::new(Registry::with_builtins());
        let descriptor = Descriptor::new()
            .field("id", "uint32")
            .field("label", "string")
            .field("flags", "array<boolean>");
        let build = builder.create_build(&descriptor).unwrap();

        // Insertion order of values does not matter
        let values = Values::new()
            .with("flags", vec![true, false])
            .with("label", "sensor".to_string())
            .with("id", 9u32);
        let buffer = build.build(&values).unwrap();

        assert_eq!(buffer.get::<u32>("id").unwrap(), 9);
        assert_eq!(buffer.get::<String>("label").unwrap(), "sensor");
        assert_eq!(buffer.get::<Vec<bool>>("flags").unwrap(), vec![true, false]);
        assert_eq!(&buffer.data()[..8], &[4, 0, 0, 0, 9, 0, 0, 0]);

        // Each build owns its own storage
        let other = build.build(&values.with("id", 10u32)).unwrap();
        assert_eq!(other.get::<u32>("id").unwrap(), 10);
        assert_eq!(buffer.get::<u32>("id").unwrap(), 9);
    }

    #[test]
    fn test_build_missing_and_mistyped_values() {
        let builder = BufferBuilder::new(Registry::with_builtins());
        let descriptor = Descriptor::new().field("a", "int8").field("b", "string");
        let build = builder.create_build(&descriptor).unwrap();

        match build.build(&Values::new().with("a", 1i8)) {
            Err(Error::MissingValue { field }) => assert_eq!(field, "b"),
            other => panic!("unexpected: {:?}", other.map(|b| b.copy())),
        }
        assert!(matches!(
            build.build(&Values::new().with("a", 1i8).with("b", "str slice")),
            Err(Error::TypeMismatch { found: "&str", .. })
        ));
    }

    #[test]
    fn test_values_replace() {
        let mut values = Values::new();
        values.insert("a", 1u8);
        values.insert("a", 2u8);
        assert_eq!(values.len(), 1);
        let (value, type_name) = values.get("a").unwrap();
        assert_eq!(value.downcast_ref::<u8>(), Some(&2));
        assert_eq!(type_name, "u8");
    }
}

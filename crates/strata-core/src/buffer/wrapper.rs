//! Rehydrating buffers produced elsewhere.

use super::{FieldAccessor, SchemaBuffer};
use crate::descriptor::Descriptor;
use crate::error::{Error, Result};
use crate::layout;
use crate::registry::Registry;
use tracing::{debug, warn};

/// Configuration for [`Wrapper`]
#[derive(Debug, Clone, Default)]
pub struct WrapperConfig {
    /// Fail with [`Error::HeaderMismatch`] when the header's type for a field
    /// differs from the descriptor's. When false the header wins and the
    /// disagreement is logged.
    pub strict: bool,
}

impl WrapperConfig {
    /// Creates a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets strict header checking
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

/// Binds accessors to an existing buffer.
///
/// The descriptor supplies field count and names. Field types come from the
/// buffer's header, resolved through the wrapper's registry by ID, so the
/// registry must assign IDs the way the producing registry did.
#[derive(Debug, Clone)]
pub struct Wrapper {
    registry: Registry,
    descriptor: Descriptor,
    config: WrapperConfig,
}

impl Wrapper {
    /// Creates a wrapper with default configuration
    pub fn new(registry: Registry, descriptor: Descriptor) -> Self {
        Self::with_config(registry, descriptor, WrapperConfig::default())
    }

    /// Creates a wrapper with custom configuration
    pub fn with_config(registry: Registry, descriptor: Descriptor, config: WrapperConfig) -> Self {
        Self {
            registry,
            descriptor,
            config,
        }
    }

    /// The descriptor this wrapper was created with
    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    /// Wraps `buffer` in place, without copying it.
    ///
    /// Reads one header entry per descriptor field and resolves each through
    /// [`Registry::codec_at_id`]. Fields already present in the data region
    /// are located by walking the frame length prefixes, and the cursor is
    /// placed after the last one so further writes continue from there.
    pub fn wrap<S: AsRef<[u8]> + AsMut<[u8]>>(&self, buffer: S) -> Result<SchemaBuffer<S>> {
        let count = self.descriptor.len();
        let ids = layout::decode_header(buffer.as_ref(), count)?;

        let mut fields = Vec::with_capacity(count);
        for ((name, declared), id) in self.descriptor.iter().zip(ids) {
            let codec = self.registry.codec_at_id(id)?;
            if codec.name() != declared {
                if self.config.strict {
                    return Err(Error::HeaderMismatch {
                        field: name.to_string(),
                        header: codec.name().to_string(),
                        declared: declared.to_string(),
                    });
                }
                warn!(
                    "Header declares '{}' as '{}' (id {}), descriptor says '{}'; using header type",
                    name,
                    codec.name(),
                    id,
                    declared
                );
            }
            fields.push(FieldAccessor::new(name, id, codec.clone()));
        }

        let header_len = layout::header_len(count);
        let frames = layout::scan_frames(&buffer.as_ref()[header_len..], count)?;
        debug!(
            "Wrapped buffer: {} fields, {} written, {} bytes",
            count,
            frames.len(),
            buffer.as_ref().len()
        );

        let mut slots: Vec<_> = frames.into_iter().map(Some).collect();
        slots.resize(count, None);
        Ok(SchemaBuffer::from_parts(buffer, fields, slots))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{BufferBuilder, Values};
    use crate::codec::{Codec, Int8Codec, StringCodec, Uint8Codec};
    use bytes::BytesMut;
    use pretty_assertions::assert_eq;

    /// Encodes `()` as nothing at all
    struct UnitCodec;

    impl Codec for UnitCodec {
        type Value = ();

        fn name(&self) -> &str {
            "unit"
        }

        fn nominal_len(&self) -> usize {
            0
        }

        fn serialize(&self, _value: &(), _out: &mut BytesMut) -> Result<()> {
            Ok(())
        }

        fn deserialize(&self, _data: &[u8]) -> Result<((), usize)> {
            Ok(((), 0))
        }
    }

    fn scenario() -> (Registry, Descriptor) {
        let mut registry = Registry::new();
        registry.register(Int8Codec);
        registry.register(StringCodec);
        let descriptor = Descriptor::new().field("age", "int8").field("name", "string");
        (registry, descriptor)
    }

    #[test]
    fn test_wrap_copy_of_built_buffer() {
        let (registry, descriptor) = scenario();
        let mut builder = BufferBuilder::new(registry.clone());
        let mut buffer = builder.create_buffer(&descriptor).unwrap();
        buffer.set("age", &25i8).unwrap();
        buffer.set("name", &"John Doe".to_string()).unwrap();
        let mut received = buffer.copy().to_vec();

        let wrapper = Wrapper::new(registry, descriptor);
        let wrapped = wrapper.wrap(&mut received[..]).unwrap();
        assert_eq!(wrapped.get::<i8>("age").unwrap(), 25);
        assert_eq!(wrapped.get::<String>("name").unwrap(), "John Doe");
        assert_eq!(wrapped.cursor().position(), 5 + 14);
    }

    #[test]
    fn test_wrap_writes_through_to_original() {
        let (registry, descriptor) = scenario();
        let builder = BufferBuilder::new(registry);
        let build = builder.create_build(&descriptor).unwrap();
        let built = build
            .build(&Values::new().with("age", 1i8).with("name", "a".to_string()))
            .unwrap();
        let mut bytes = built.into_inner().to_vec();

        let wrapper = builder.create_wrapper(&descriptor).unwrap();
        {
            let mut wrapped = wrapper.wrap(&mut bytes[..]).unwrap();
            wrapped.set("name", &"bcd".to_string()).unwrap();
        }

        let again = wrapper.wrap(bytes.as_mut_slice()).unwrap();
        assert_eq!(again.get::<String>("name").unwrap(), "bcd");
        assert_eq!(again.get::<i8>("age").unwrap(), 1);
    }

    #[test]
    fn test_wrap_partially_written() {
        let (registry, descriptor) = scenario();
        let mut builder = BufferBuilder::new(registry.clone());
        let mut buffer = builder.create_buffer(&descriptor).unwrap();
        buffer.set("age", &7i8).unwrap();
        let copy = buffer.copy().to_vec();

        let mut wrapped = Wrapper::new(registry, descriptor).wrap(copy).unwrap();
        assert!(wrapped.is_set("age"));
        assert!(!wrapped.is_set("name"));
        assert_eq!(wrapped.cursor().position(), 5);

        wrapped.set("name", &"later".to_string()).unwrap();
        assert_eq!(wrapped.get::<String>("name").unwrap(), "later");
    }

    #[test]
    fn test_unknown_type_id() {
        let (registry, descriptor) = scenario();
        let mut bytes = layout::concat(&layout::encode_header(&[0, 5]), &[0; 16]).to_vec();

        match Wrapper::new(registry, descriptor).wrap(&mut bytes[..]) {
            Err(Error::UnknownTypeId { id, registered }) => {
                assert_eq!(id, 5);
                assert_eq!(registered, 2);
            }
            other => panic!("unexpected: {:?}", other.map(|b| b.copy())),
        }
    }

    #[test]
    fn test_truncated_header() {
        let (registry, descriptor) = scenario();
        let mut bytes = vec![0u8; 6];
        assert!(matches!(
            Wrapper::new(registry, descriptor).wrap(&mut bytes[..]),
            Err(Error::Truncated { needed: 8, .. })
        ));
    }

    #[test]
    fn test_header_wins_over_descriptor() {
        let mut registry = Registry::new();
        registry.register(Uint8Codec);
        registry.register(Int8Codec);
        let mut builder = BufferBuilder::new(registry.clone());

        let produced = Descriptor::new().field("level", "uint8");
        let mut buffer = builder.create_buffer(&produced).unwrap();
        buffer.set("level", &200u8).unwrap();
        let mut bytes = buffer.copy().to_vec();

        let declared = Descriptor::new().field("level", "int8");
        let wrapped = Wrapper::new(registry.clone(), declared.clone())
            .wrap(&mut bytes[..])
            .unwrap();
        assert_eq!(wrapped.descriptor(), produced);
        assert_eq!(wrapped.get::<u8>("level").unwrap(), 200);
        assert!(matches!(
            wrapped.get::<i8>("level"),
            Err(Error::TypeMismatch { .. })
        ));

        let strict = Wrapper::with_config(registry, declared, WrapperConfig::new().strict(true));
        match strict.wrap(&mut bytes[..]) {
            Err(Error::HeaderMismatch {
                field,
                header,
                declared,
            }) => {
                assert_eq!(field, "level");
                assert_eq!(header, "uint8");
                assert_eq!(declared, "int8");
            }
            other => panic!("unexpected: {:?}", other.map(|b| b.copy())),
        }
    }

    #[test]
    fn test_differently_ordered_registry_misreads() {
        let (registry, descriptor) = scenario();
        let mut builder = BufferBuilder::new(registry.clone());
        let mut buffer = builder.create_buffer(&descriptor).unwrap();
        buffer.set("age", &25i8).unwrap();
        buffer.set("name", &"x".to_string()).unwrap();
        let mut bytes = buffer.copy().to_vec();

        let mut reordered = Registry::new();
        reordered.register(StringCodec);
        reordered.register(Int8Codec);
        assert_ne!(registry.fingerprint(), reordered.fingerprint());

        // Header id 0 now resolves to 'string' for the 'age' field
        let wrapped = Wrapper::new(reordered, descriptor).wrap(&mut bytes[..]).unwrap();
        assert_eq!(wrapped.accessors()[0].type_name(), "string");
        assert!(wrapped.get::<String>("age").is_err());
    }

    #[test]
    fn test_corrupt_frame_length() {
        let (registry, descriptor) = scenario();
        let mut bytes = layout::concat(&layout::encode_header(&[0, 1]), &[0xFF, 0, 0, 0, 1]).to_vec();
        assert!(matches!(
            Wrapper::new(registry, descriptor).wrap(&mut bytes[..]),
            Err(Error::InvalidData { .. })
        ));
    }

    #[test]
    fn test_empty_payload_rejected_so_wrap_sees_every_frame() {
        let mut registry = Registry::new();
        registry.register(UnitCodec);
        registry.register(Int8Codec);
        let descriptor = Descriptor::new().field("marker", "unit").field("age", "int8");

        let mut builder = BufferBuilder::new(registry.clone());
        let mut buffer = builder.create_buffer(&descriptor).unwrap();
        match buffer.set("marker", &()) {
            Err(Error::EmptyPayload { field, codec }) => {
                assert_eq!(field, "marker");
                assert_eq!(codec, "unit");
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert!(!buffer.is_set("marker"));
        assert_eq!(buffer.cursor().position(), 0);

        // Nothing written means nothing for the wrapper to misread
        let mut bytes = buffer.copy().to_vec();
        let wrapped = Wrapper::new(registry, descriptor).wrap(&mut bytes[..]).unwrap();
        assert!(!wrapped.is_set("marker"));
        assert!(!wrapped.is_set("age"));
        assert_eq!(wrapped.cursor().position(), 0);
    }

    #[test]
    fn test_wrap_round_trips_every_builtin_field() {
        let registry = Registry::with_builtins();
        let descriptor = Descriptor::new()
            .field("flag", "boolean")
            .field("empty", "string")
            .field("items", "array<uint8>")
            .field("count", "uint16");
        let builder = BufferBuilder::new(registry.clone());
        let built = builder
            .create_build(&descriptor)
            .unwrap()
            .build(
                &Values::new()
                    .with("flag", false)
                    .with("empty", String::new())
                    .with("items", Vec::<u8>::new())
                    .with("count", 0u16),
            )
            .unwrap();
        let mut bytes = built.copy().to_vec();

        let wrapped = Wrapper::new(registry, descriptor).wrap(&mut bytes[..]).unwrap();
        assert_eq!(wrapped.get::<bool>("flag").unwrap(), false);
        assert_eq!(wrapped.get::<String>("empty").unwrap(), "");
        assert_eq!(wrapped.get::<Vec<u8>>("items").unwrap(), Vec::<u8>::new());
        assert_eq!(wrapped.get::<u16>("count").unwrap(), 0);
        assert_eq!(wrapped.cursor(), built.cursor());
    }
}

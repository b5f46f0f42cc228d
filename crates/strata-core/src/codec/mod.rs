//! Type codecs.
//!
//! A [`Codec`] turns one Rust value type into bytes and back. Codecs are
//! statically typed through their associated [`Codec::Value`]; the registry
//! stores them behind the object-safe [`ErasedCodec`] trait so heterogeneous
//! codecs can live in one table while call sites stay typed.
//!
//! ## Contract
//!
//! - `serialize` appends the payload to the output buffer.
//! - `deserialize` reads a value from the front of the slice and reports how
//!   many bytes it consumed. Combinators such as [`ArrayCodec`] rely on that
//!   count rather than on [`Codec::nominal_len`], which is only authoritative
//!   for fixed-width codecs.
//!
//! ## Extensibility
//!
//! ```
//! use bytes::{BufMut, BytesMut};
//! use strata_core::codec::Codec;
//! use strata_core::{Error, Result};
//!
//! /// Unix timestamp stored as 4 little-endian bytes
//! struct EpochSeconds;
//!
//! impl Codec for EpochSeconds {
//!     type Value = u32;
//!
//!     fn name(&self) -> &str {
//!         "epoch32"
//!     }
//!
//!     fn nominal_len(&self) -> usize {
//!         4
//!     }
//!
//!     fn serialize(&self, value: &u32, out: &mut BytesMut) -> Result<()> {
//!         out.put_u32_le(*value);
//!         Ok(())
//!     }
//!
//!     fn deserialize(&self, data: &[u8]) -> Result<(u32, usize)> {
//!         let bytes: [u8; 4] = data
//!             .get(..4)
//!             .and_then(|b| b.try_into().ok())
//!             .ok_or_else(|| Error::truncated(4, data.len()))?;
//!         Ok((u32::from_le_bytes(bytes), 4))
//!     }
//! }
//! ```

mod array;
mod builtin;

use crate::error::{Error, Result};
use bytes::BytesMut;
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

pub use array::ArrayCodec;
pub use builtin::{
    BoolCodec, Float32Codec, Float64Codec, Int16Codec, Int32Codec, Int8Codec, StringCodec,
    Uint16Codec, Uint32Codec, Uint8Codec,
};

/// A named serializer/deserializer pair for one value type
pub trait Codec: Send + Sync + 'static {
    /// The Rust type this codec encodes
    type Value: Any + fmt::Debug;

    /// Registry name of the codec, unique within a registry
    fn name(&self) -> &str;

    /// Encoded width for fixed-width codecs, or the width of the length
    /// prefix for variable-width codecs
    fn nominal_len(&self) -> usize;

    /// Append the encoding of `value` to `out`
    ///
    /// The encoding must be at least one byte long: a zero-length frame
    /// marks the end of the written fields in a data region, so buffers
    /// reject empty payloads with [`Error::EmptyPayload`].
    fn serialize(&self, value: &Self::Value, out: &mut BytesMut) -> Result<()>;

    /// Decode a value from the front of `data`
    ///
    /// Returns the value and the number of bytes consumed.
    fn deserialize(&self, data: &[u8]) -> Result<(Self::Value, usize)>;
}

/// Object-safe view of a [`Codec`] used for registry storage.
///
/// Every `Codec` implements this through a blanket impl; there is no reason
/// to implement it by hand.
pub trait ErasedCodec: Send + Sync {
    /// Registry name of the codec
    fn name(&self) -> &str;

    /// See [`Codec::nominal_len`]
    fn nominal_len(&self) -> usize;

    /// `TypeId` of the codec's value type
    fn value_type(&self) -> TypeId;

    /// Readable name of the codec's value type
    fn value_type_name(&self) -> &'static str;

    /// Serialize a type-erased value.
    ///
    /// Fails with [`Error::TypeMismatch`] (with an empty field name) when the
    /// value is not the codec's value type.
    fn serialize_any(&self, value: &dyn Any, out: &mut BytesMut) -> Result<()>;

    /// Deserialize into a boxed value of the codec's value type
    fn deserialize_any(&self, data: &[u8]) -> Result<(Box<dyn Any>, usize)>;

    /// Deserialize and format the value with its `Debug` representation
    fn render(&self, data: &[u8]) -> Result<(String, usize)>;
}

impl<C: Codec> ErasedCodec for C {
    fn name(&self) -> &str {
        Codec::name(self)
    }

    fn nominal_len(&self) -> usize {
        Codec::nominal_len(self)
    }

    fn value_type(&self) -> TypeId {
        TypeId::of::<C::Value>()
    }

    fn value_type_name(&self) -> &'static str {
        std::any::type_name::<C::Value>()
    }

    fn serialize_any(&self, value: &dyn Any, out: &mut BytesMut) -> Result<()> {
        let value = value
            .downcast_ref::<C::Value>()
            .ok_or_else(|| Error::TypeMismatch {
                field: String::new(),
                codec: Codec::name(self).to_string(),
                expected: std::any::type_name::<C::Value>(),
                found: "<erased>",
            })?;
        self.serialize(value, out)
    }

    fn deserialize_any(&self, data: &[u8]) -> Result<(Box<dyn Any>, usize)> {
        let (value, used) = self.deserialize(data)?;
        Ok((Box::new(value), used))
    }

    fn render(&self, data: &[u8]) -> Result<(String, usize)> {
        let (value, used) = self.deserialize(data)?;
        Ok((format!("{:?}", value), used))
    }
}

impl fmt::Debug for dyn ErasedCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Codec")
            .field("name", &self.name())
            .field("value", &self.value_type_name())
            .finish()
    }
}

/// Shared handle to a registered codec
pub type CodecRef = Arc<dyn ErasedCodec>;

/// The built-in codec library in registry order.
///
/// Scalars and `string` come first, followed by `array<T>` for each of them
/// in the same order. [`crate::Registry::with_builtins`] registers exactly
/// this sequence, so IDs are identical across processes that use it.
pub fn builtins() -> Vec<CodecRef> {
    vec![
        Arc::new(Uint8Codec),
        Arc::new(Int8Codec),
        Arc::new(Uint16Codec),
        Arc::new(Int16Codec),
        Arc::new(Uint32Codec),
        Arc::new(Int32Codec),
        Arc::new(Float32Codec),
        Arc::new(Float64Codec),
        Arc::new(BoolCodec),
        Arc::new(StringCodec),
        Arc::new(ArrayCodec::new(Uint8Codec)),
        Arc::new(ArrayCodec::new(Int8Codec)),
        Arc::new(ArrayCodec::new(Uint16Codec)),
        Arc::new(ArrayCodec::new(Int16Codec)),
        Arc::new(ArrayCodec::new(Uint32Codec)),
        Arc::new(ArrayCodec::new(Int32Codec)),
        Arc::new(ArrayCodec::new(Float32Codec)),
        Arc::new(ArrayCodec::new(Float64Codec)),
        Arc::new(ArrayCodec::new(BoolCodec)),
        Arc::new(ArrayCodec::new(StringCodec)),
    ]
}

/// Split `len` bytes off the front of `data`
pub(crate) fn take(data: &[u8], len: usize) -> Result<&[u8]> {
    data.get(..len)
        .ok_or_else(|| Error::truncated(len, data.len()))
}

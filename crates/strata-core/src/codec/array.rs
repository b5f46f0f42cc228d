//! Array combinator codec.

use super::{take, Codec};
use crate::error::{Error, Result};
use bytes::{Buf, BufMut, BytesMut};

/// Width of the element count prefix
const COUNT_PREFIX: usize = 4;

/// `array<T>`: 4-byte element count followed by each element's encoding.
///
/// Decoding advances by the length each element actually consumed, so
/// variable-width inner codecs (strings, nested arrays) work.
#[derive(Debug, Clone)]
pub struct ArrayCodec<C> {
    inner: C,
    name: String,
}

impl<C: Codec> ArrayCodec<C> {
    /// Wraps `inner`; the codec is named `array<inner>`
    pub fn new(inner: C) -> Self {
        let name = format!("array<{}>", inner.name());
        Self { inner, name }
    }

    /// The element codec
    pub fn inner(&self) -> &C {
        &self.inner
    }
}

impl<C: Codec> Codec for ArrayCodec<C> {
    type Value = Vec<C::Value>;

    fn name(&self) -> &str {
        &self.name
    }

    fn nominal_len(&self) -> usize {
        COUNT_PREFIX
    }

    fn serialize(&self, value: &Vec<C::Value>, out: &mut BytesMut) -> Result<()> {
        let count = u32::try_from(value.len()).map_err(|_| Error::ValueTooLarge {
            what: "array",
            len: value.len(),
            max: u32::MAX as usize,
        })?;
        out.put_u32_le(count);
        for element in value {
            self.inner.serialize(element, out)?;
        }
        Ok(())
    }

    fn deserialize(&self, data: &[u8]) -> Result<(Vec<C::Value>, usize)> {
        let count = take(data, COUNT_PREFIX)?.get_u32_le() as usize;
        // Every element consumes at least one byte for the built-in codecs,
        // so the remaining input bounds a sane preallocation.
        let mut values = Vec::with_capacity(count.min(data.len() - COUNT_PREFIX));
        let mut position = COUNT_PREFIX;

        for index in 0..count {
            // Offsets from the element codec are relative to the element start
            let (value, used) = self.inner.deserialize(&data[position..]).map_err(|e| match e {
                Error::Truncated { needed, .. } => Error::truncated(position + needed, data.len()),
                Error::InvalidData { offset, details } => Error::invalid_data(
                    position + offset,
                    format!("element {} of {}: {}", index, self.name, details),
                ),
                other => other,
            })?;
            values.push(value);
            position += used;
        }

        Ok((values, position))
    }
}

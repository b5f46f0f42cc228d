//! Scalar and string codecs.
//!
//! All multi-byte values are little-endian regardless of host platform.

use super::{take, Codec};
use crate::error::{Error, Result};
use bytes::{Buf, BufMut, BytesMut};

macro_rules! fixed_codec {
    ($(#[$doc:meta])* $codec:ident, $ty:ty, $name:literal, $width:literal, $put:ident, $get:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        pub struct $codec;

        impl Codec for $codec {
            type Value = $ty;

            fn name(&self) -> &str {
                $name
            }

            fn nominal_len(&self) -> usize {
                $width
            }

            fn serialize(&self, value: &$ty, out: &mut BytesMut) -> Result<()> {
                out.$put(*value);
                Ok(())
            }

            fn deserialize(&self, data: &[u8]) -> Result<($ty, usize)> {
                let mut buf = take(data, $width)?;
                Ok((buf.$get(), $width))
            }
        }
    };
}

fixed_codec!(
    /// `uint8`: one byte
    Uint8Codec, u8, "uint8", 1, put_u8, get_u8
);
fixed_codec!(
    /// `int8`: one byte, two's complement
    Int8Codec, i8, "int8", 1, put_i8, get_i8
);
fixed_codec!(
    /// `uint16`: two bytes
    Uint16Codec, u16, "uint16", 2, put_u16_le, get_u16_le
);
fixed_codec!(
    /// `int16`: two bytes
    Int16Codec, i16, "int16", 2, put_i16_le, get_i16_le
);
fixed_codec!(
    /// `uint32`: four bytes
    Uint32Codec, u32, "uint32", 4, put_u32_le, get_u32_le
);
fixed_codec!(
    /// `int32`: four bytes
    Int32Codec, i32, "int32", 4, put_i32_le, get_i32_le
);
fixed_codec!(
    /// `float32`: IEEE-754 single precision
    Float32Codec, f32, "float32", 4, put_f32_le, get_f32_le
);
fixed_codec!(
    /// `float64`: IEEE-754 double precision
    Float64Codec, f64, "float64", 8, put_f64_le, get_f64_le
);

/// `boolean`: one byte, `0x00` or `0x01`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoolCodec;

impl Codec for BoolCodec {
    type Value = bool;

    fn name(&self) -> &str {
        "boolean"
    }

    fn nominal_len(&self) -> usize {
        1
    }

    fn serialize(&self, value: &bool, out: &mut BytesMut) -> Result<()> {
        out.put_u8(u8::from(*value));
        Ok(())
    }

    fn deserialize(&self, data: &[u8]) -> Result<(bool, usize)> {
        match take(data, 1)?[0] {
            0x00 => Ok((false, 1)),
            0x01 => Ok((true, 1)),
            other => Err(Error::invalid_data(
                0,
                format!("boolean byte must be 0x00 or 0x01, found {:#04x}", other),
            )),
        }
    }
}

/// Width of the string length prefix
const STRING_PREFIX: usize = 2;

/// `string`: 2-byte length prefix followed by UTF-8 bytes.
///
/// The prefix counts encoded bytes, not characters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StringCodec;

impl Codec for StringCodec {
    type Value = String;

    fn name(&self) -> &str {
        "string"
    }

    fn nominal_len(&self) -> usize {
        STRING_PREFIX
    }

    fn serialize(&self, value: &String, out: &mut BytesMut) -> Result<()> {
        let len = u16::try_from(value.len()).map_err(|_| Error::ValueTooLarge {
            what: "string",
            len: value.len(),
            max: u16::MAX as usize,
        })?;
        out.reserve(STRING_PREFIX + value.len());
        out.put_u16_le(len);
        out.put_slice(value.as_bytes());
        Ok(())
    }

    fn deserialize(&self, data: &[u8]) -> Result<(String, usize)> {
        let len = take(data, STRING_PREFIX)?.get_u16_le() as usize;
        let bytes = take(&data[STRING_PREFIX..], len)
            .map_err(|_| Error::truncated(STRING_PREFIX + len, data.len()))?;
        let value = String::from_utf8(bytes.to_vec())?;
        Ok((value, STRING_PREFIX + len))
    }
}

//! Schema buffers and their field accessors.
//!
//! A [`SchemaBuffer`] is what [`BufferBuilder`] and [`Wrapper`] hand back: the
//! header plus data region, one [`FieldAccessor`] per descriptor field, and
//! the [`Cursor`] all accessors share.
//!
//! ## Write Order
//!
//! Writes append frames at the shared cursor, so the data region holds
//! frames in the order they were written. To keep that equal to descriptor
//! order (which is what [`Wrapper`] expects when it rehydrates a buffer) a
//! field can only be written for the first time once every field before it
//! has been written. After that:
//!
//! - a field may be rewritten in place with a value of the same encoded length
//! - the most recently written field may be rewritten with any length
//! - anything else fails with [`Error::SlotResize`]
//!
//! Each write records the field's slot, so reads are random-access and do
//! not move the cursor.

mod builder;
mod wrapper;

use crate::codec::CodecRef;
use crate::descriptor::Descriptor;
use crate::error::{Error, Result};
use crate::layout::{self, LENGTH_PREFIX};
use crate::registry::CodecId;
use bytes::{Bytes, BytesMut};
use std::any::{Any, TypeId};
use std::ops::Range;
use tracing::trace;

pub use builder::{Build, BufferBuilder, BuilderConfig, Values, DEFAULT_CAPACITY};
pub use wrapper::{Wrapper, WrapperConfig};

/// Write position within a data region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    position: usize,
    capacity: usize,
}

impl Cursor {
    /// Creates a cursor at `position` in a region of `capacity` bytes
    pub fn new(position: usize, capacity: usize) -> Self {
        Self { position, capacity }
    }

    /// Offset of the next write, relative to the data region
    pub fn position(&self) -> usize {
        self.position
    }

    /// Size of the data region
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes left after the cursor
    pub fn remaining(&self) -> usize {
        self.capacity - self.position
    }

    fn seek(&mut self, position: usize) {
        debug_assert!(position <= self.capacity);
        self.position = position;
    }
}

/// One descriptor field bound to its codec
#[derive(Debug, Clone)]
pub struct FieldAccessor {
    name: String,
    id: CodecId,
    codec: CodecRef,
}

impl FieldAccessor {
    pub(crate) fn new(name: impl Into<String>, id: CodecId, codec: CodecRef) -> Self {
        Self {
            name: name.into(),
            id,
            codec,
        }
    }

    /// Field name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type ID written in the header for this field
    pub fn id(&self) -> CodecId {
        self.id
    }

    /// Name of the field's codec
    pub fn type_name(&self) -> &str {
        self.codec.name()
    }

    /// The field's codec
    pub fn codec(&self) -> &CodecRef {
        &self.codec
    }

    fn type_mismatch(&self, found: &'static str) -> Error {
        Error::TypeMismatch {
            field: self.name.clone(),
            codec: self.codec.name().to_string(),
            expected: self.codec.value_type_name(),
            found,
        }
    }
}

/// A header, a data region and the accessors bound to them.
///
/// `S` is the backing storage: a borrowed slice for buffers built in place or
/// wrapped without copying, or an owned buffer.
#[derive(Debug)]
pub struct SchemaBuffer<S> {
    storage: S,
    header_len: usize,
    fields: Vec<FieldAccessor>,
    slots: Vec<Option<Range<usize>>>,
    cursor: Cursor,
    scratch: BytesMut,
}

impl<S: AsRef<[u8]> + AsMut<[u8]>> SchemaBuffer<S> {
    /// `slots` holds the frame range of each field already present in the
    /// data region; the cursor starts after the last one.
    pub(crate) fn from_parts(
        storage: S,
        fields: Vec<FieldAccessor>,
        slots: Vec<Option<Range<usize>>>,
    ) -> Self {
        debug_assert_eq!(fields.len(), slots.len());
        let header_len = layout::header_len(fields.len());
        let capacity = storage.as_ref().len() - header_len;
        let position = slots
            .iter()
            .flatten()
            .map(|frame| frame.end)
            .max()
            .unwrap_or(0);

        Self {
            storage,
            header_len,
            fields,
            slots,
            cursor: Cursor::new(position, capacity),
            scratch: BytesMut::new(),
        }
    }

    /// The whole buffer, header included
    pub fn as_bytes(&self) -> &[u8] {
        self.storage.as_ref()
    }

    /// Header bytes
    pub fn header(&self) -> &[u8] {
        &self.as_bytes()[..self.header_len]
    }

    /// Data region bytes, including unwritten capacity
    pub fn data(&self) -> &[u8] {
        &self.as_bytes()[self.header_len..]
    }

    /// Independent copy of the whole buffer.
    ///
    /// Later writes through this buffer never show up in the copy.
    pub fn copy(&self) -> Bytes {
        Bytes::copy_from_slice(self.as_bytes())
    }

    /// Releases the backing storage
    pub fn into_inner(self) -> S {
        self.storage
    }

    /// Field accessors in descriptor order
    pub fn accessors(&self) -> &[FieldAccessor] {
        &self.fields
    }

    /// The shared write cursor
    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Descriptor built from the types actually bound to each field.
    ///
    /// For wrapped buffers these are the header's types.
    pub fn descriptor(&self) -> Descriptor {
        self.fields
            .iter()
            .map(|f| (f.name.as_str(), f.type_name()))
            .collect()
    }

    /// Returns true if the named field has been written
    pub fn is_set(&self, name: &str) -> bool {
        self.index_of(name)
            .map(|index| self.slots[index].is_some())
            .unwrap_or(false)
    }

    /// Accessor for the named field
    pub fn field(&mut self, name: &str) -> Result<Accessor<'_, S>> {
        let index = self.index_of(name)?;
        Ok(Accessor {
            buffer: self,
            index,
        })
    }

    /// Writes `value` into the named field
    pub fn set<T: Any>(&mut self, name: &str, value: &T) -> Result<()> {
        let index = self.index_of(name)?;
        self.store(index, value, std::any::type_name::<T>())
    }

    /// Reads the named field
    pub fn get<T: Any>(&self, name: &str) -> Result<T> {
        let index = self.index_of(name)?;
        self.load(index)
    }

    /// Reads the named field and formats it with `Debug`
    pub fn render(&self, name: &str) -> Result<String> {
        let index = self.index_of(name)?;
        let payload = self.payload(index)?;
        let (text, used) = self.fields[index].codec.render(payload)?;
        self.check_consumed(index, used)?;
        Ok(text)
    }

    fn index_of(&self, name: &str) -> Result<usize> {
        self.fields
            .iter()
            .position(|f| f.name == name)
            .ok_or_else(|| Error::unknown_field(name))
    }

    pub(crate) fn store(&mut self, index: usize, value: &dyn Any, found: &'static str) -> Result<()> {
        let field = &self.fields[index];
        if value.type_id() != field.codec.value_type() {
            return Err(field.type_mismatch(found));
        }

        self.scratch.clear();
        field.codec.serialize_any(value, &mut self.scratch)?;
        if self.scratch.is_empty() {
            return Err(Error::EmptyPayload {
                field: field.name.clone(),
                codec: field.codec.name().to_string(),
            });
        }
        let needed = layout::frame_len(self.scratch.len());

        let previous = self.slots[index].clone();
        let start = match &previous {
            Some(frame) if frame.len() == needed => frame.start,
            Some(frame) if frame.end == self.cursor.position() => frame.start,
            Some(frame) => {
                return Err(Error::SlotResize {
                    field: field.name.clone(),
                    current: frame.len() - LENGTH_PREFIX,
                    requested: self.scratch.len(),
                })
            }
            None => {
                let next = self.slots.iter().position(Option::is_none).unwrap_or(index);
                if next != index {
                    return Err(Error::FieldOrder {
                        field: field.name.clone(),
                        next: self.fields[next].name.clone(),
                    });
                }
                self.cursor.position()
            }
        };

        let remaining = self.cursor.capacity() - start;
        if needed > remaining {
            return Err(Error::CapacityExceeded {
                field: field.name.clone(),
                needed,
                remaining,
            });
        }

        let header_len = self.header_len;
        let data = &mut self.storage.as_mut()[header_len..];
        let frame = layout::write_frame(data, start, &self.scratch);

        let trailing = previous
            .as_ref()
            .map_or(true, |old| old.end == self.cursor.position());
        if trailing {
            // A shorter rewrite of the last frame leaves stale bytes behind
            let stale_end = self.cursor.position().max(frame.end);
            data[frame.end..stale_end].fill(0);
            self.cursor.seek(frame.end);
        }

        trace!(
            "Wrote '{}' at {}..{} (cursor {})",
            self.fields[index].name,
            frame.start,
            frame.end,
            self.cursor.position()
        );
        self.slots[index] = Some(frame);
        Ok(())
    }

    fn payload(&self, index: usize) -> Result<&[u8]> {
        let frame = self.slots[index]
            .as_ref()
            .ok_or_else(|| Error::field_not_set(&self.fields[index].name))?;
        Ok(&self.data()[frame.start + LENGTH_PREFIX..frame.end])
    }

    fn check_consumed(&self, index: usize, used: usize) -> Result<()> {
        let payload = self.payload(index)?;
        if used != payload.len() {
            let offset = self.slots[index].as_ref().map_or(0, |f| f.start);
            return Err(Error::invalid_data(
                self.header_len + offset,
                format!(
                    "codec '{}' consumed {} of {} payload bytes",
                    self.fields[index].type_name(),
                    used,
                    payload.len()
                ),
            ));
        }
        Ok(())
    }

    fn load<T: Any>(&self, index: usize) -> Result<T> {
        let field = &self.fields[index];
        if TypeId::of::<T>() != field.codec.value_type() {
            return Err(field.type_mismatch(std::any::type_name::<T>()));
        }

        let (value, used) = field.codec.deserialize_any(self.payload(index)?)?;
        self.check_consumed(index, used)?;
        trace!("Read '{}' ({} bytes)", field.name, used);

        value
            .downcast::<T>()
            .map(|value| *value)
            .map_err(|_| field.type_mismatch(std::any::type_name::<T>()))
    }
}

/// A `get`/`set` pair bound to one field of a [`SchemaBuffer`]
#[derive(Debug)]
pub struct Accessor<'a, S> {
    buffer: &'a mut SchemaBuffer<S>,
    index: usize,
}

impl<S: AsRef<[u8]> + AsMut<[u8]>> Accessor<'_, S> {
    /// Field name
    pub fn name(&self) -> &str {
        &self.buffer.fields[self.index].name
    }

    /// Writes the field
    pub fn set<T: Any>(&mut self, value: &T) -> Result<()> {
        self.buffer
            .store(self.index, value, std::any::type_name::<T>())
    }

    /// Reads the field
    pub fn get<T: Any>(&self) -> Result<T> {
        self.buffer.load(self.index)
    }

    /// Returns true if the field has been written
    pub fn is_set(&self) -> bool {
        self.buffer.slots[self.index].is_some()
    }
}

//! # strata-core
//!
//! A schema-driven binary layout engine.
//!
//! Given a [`Descriptor`] (an ordered list of field names and type names)
//! and a [`Registry`] of codecs, this crate lays a structured value out into
//! one contiguous, fixed-capacity byte buffer, and recovers typed field
//! accessors either from the buffer it just built or from raw bytes received
//! from elsewhere.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`codec`]: the [`Codec`] contract and the built-in codec library
//! - [`registry`]: name and ID lookup of codecs
//! - [`descriptor`]: field schemas
//! - [`layout`]: header and frame encoding
//! - [`buffer`]: [`BufferBuilder`], [`Wrapper`] and the accessors they produce
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```
//! use strata_core::{BufferBuilder, Descriptor, Registry, Wrapper};
//!
//! let mut builder = BufferBuilder::new(Registry::with_builtins());
//! let descriptor = Descriptor::new()
//!     .field("age", "int8")
//!     .field("name", "string");
//!
//! let mut buffer = builder.create_buffer(&descriptor)?;
//! buffer.set("age", &25i8)?;
//! buffer.set("name", &"John Doe".to_string())?;
//! assert_eq!(buffer.get::<i8>("age")?, 25);
//!
//! // Ship a copy somewhere else and read it back
//! let mut received = buffer.copy().to_vec();
//! let wrapper = Wrapper::new(Registry::with_builtins(), descriptor);
//! let wrapped = wrapper.wrap(&mut received[..])?;
//! assert_eq!(wrapped.get::<String>("name")?, "John Doe");
//! # Ok::<(), strata_core::Error>(())
//! ```
//!
//! ## Byte Order
//!
//! Every multi-byte integer the crate writes is little-endian, independent of
//! the host platform.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod buffer;
pub mod codec;
pub mod descriptor;
pub mod error;
pub mod layout;
pub mod registry;

// Re-export primary types for convenience
pub use buffer::{
    Accessor, Build, BufferBuilder, BuilderConfig, Cursor, FieldAccessor, SchemaBuffer, Values,
    Wrapper, WrapperConfig, DEFAULT_CAPACITY,
};
pub use codec::{ArrayCodec, Codec, CodecRef, ErasedCodec};
pub use descriptor::Descriptor;
pub use error::{Error, Result};
pub use registry::{CodecId, Registry};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

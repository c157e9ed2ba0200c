//! # Bytefield Core
//!
//! Declarative, in-place views over byte buffers with transparently
//! resizing dynamic fields.
//!
//! A [`Schema`] lists named fields with a kind and an offset rule. A
//! [`Record`] owns a buffer laid out by a schema; fields are read and
//! written directly in the buffer, and when a variable-length field changes
//! size the buffer is spliced so that every later field keeps its bytes and
//! its offset follows.
//!
//! ## Modules
//!
//! - `constants`: Widths, defaults and limits
//! - `types`: Endianness, text encodings and decoded values
//! - `schema`: Field kinds, offset rules and schema declaration
//! - `decl`: Serde form of a schema
//! - `codec`: Integer, float and text encodings
//! - `array`: Row-major index arithmetic
//! - `field`: Per-field encode/decode and the standalone `pack`/`unpack`
//! - `record`: Record containers and views
//! - `proxy`: Write-through byte-range and array views
//!
//! ```
//! use bytefield_core::{Endianness, FieldKind, Record, Schema};
//!
//! let schema = Schema::builder("Header")
//!     .field("magic", FieldKind::u32(Endianness::Big))
//!     .field("name", FieldKind::string(None))
//!     .field("tail", FieldKind::u16(Endianness::Little))
//!     .build()
//!     .unwrap();
//!
//! let mut record = Record::new(schema);
//! assert_eq!(record.size(), 6);
//! record.set("name", "hi").unwrap();
//! assert_eq!(record.size(), 8);
//! assert_eq!(record.field_offset("tail").unwrap(), 6);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

extern crate alloc;

pub mod array;
pub mod codec;
pub mod constants;
pub mod decl;
pub mod error;
pub mod field;
mod layout;
pub mod proxy;
pub mod record;
mod resize;
pub mod schema;
pub mod types;

// Re-export commonly used types
pub use decl::{FieldDecl, KindDecl, OffsetDecl, SchemaDecl};
pub use error::LayoutError;
pub use field::{pack, unpack, Extent, ResizeMode};
pub use proxy::{ArrayMut, ArrayRef, ByteRange, ByteRangeMut};
pub use record::{Record, RecordHandle, RecordMut, RecordRef};
pub use schema::{FieldDef, FieldId, FieldKind, OffsetRule, Schema, SchemaBuilder};
pub use types::{Endianness, NdArray, TextEncoding, Value};

/// Result type alias for Bytefield operations
pub type Result<T> = core::result::Result<T, LayoutError>;

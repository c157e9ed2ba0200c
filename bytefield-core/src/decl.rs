//! Schemas declared as data
//!
//! A [`SchemaDecl`] is the serde form of a schema, used to load layouts from
//! JSON or any other serde format. [`SchemaDecl::into_schema`] runs the same
//! validation as [`SchemaBuilder::build`](crate::schema::SchemaBuilder::build).
//!
//! ```json
//! {
//!   "name": "Packet",
//!   "fields": [
//!     { "name": "magic", "kind": { "type": "int", "width": 4, "signed": false, "endian": "big" } },
//!     { "name": "body",  "kind": { "type": "bytes" } },
//!     { "name": "crc",   "kind": { "type": "int", "width": 2 }, "offset": { "after": { "field": "body" } } }
//!   ]
//! }
//! ```

use crate::constants::{DEFAULT_BOOL_WIDTH, DEFAULT_INT_WIDTH};
use crate::error::LayoutError;
use crate::schema::{FieldKind, Schema, SchemaBuilder};
use crate::types::{Endianness, TextEncoding};
use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use serde::{Deserialize, Serialize};

fn default_int_width() -> u8 {
    DEFAULT_INT_WIDTH
}

fn default_bool_width() -> u8 {
    DEFAULT_BOOL_WIDTH
}

fn default_signed() -> bool {
    true
}

/// Declarative form of a schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDecl {
    /// Schema name
    pub name: String,
    /// Fields in declaration order
    pub fields: Vec<FieldDecl>,
}

/// Declarative form of one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    /// Field name, unique within the schema
    pub name: String,
    /// Field kind
    pub kind: KindDecl,
    /// Offset rule, sequential when omitted
    #[serde(default)]
    pub offset: OffsetDecl,
}

/// Declarative offset rule
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffsetDecl {
    /// End of the previous field
    #[default]
    Sequential,
    /// Fixed offset from the record start
    Absolute(usize),
    /// End of a named earlier field plus a delta
    After {
        /// Anchor field name
        field: String,
        /// Bytes after the anchor's end
        #[serde(default)]
        delta: isize,
    },
}

/// Declarative field kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KindDecl {
    /// Integer
    Int {
        /// Width in bytes
        #[serde(default = "default_int_width")]
        width: u8,
        /// Two's complement
        #[serde(default = "default_signed")]
        signed: bool,
        /// Byte order
        #[serde(default)]
        endian: Endianness,
    },
    /// Single precision float
    Float {
        /// Byte order
        #[serde(default)]
        endian: Endianness,
    },
    /// Double precision float
    Double {
        /// Byte order
        #[serde(default)]
        endian: Endianness,
    },
    /// Boolean
    Bool {
        /// Width in bytes
        #[serde(default = "default_bool_width")]
        width: u8,
        /// Byte order
        #[serde(default)]
        endian: Endianness,
    },
    /// Text
    String {
        /// Fixed length, variable when omitted
        #[serde(default)]
        length: Option<usize>,
        /// Text encoding
        #[serde(default)]
        encoding: TextEncoding,
    },
    /// Raw bytes
    Bytes {
        /// Fixed length, variable when omitted
        #[serde(default)]
        length: Option<usize>,
    },
    /// Embedded record
    Record {
        /// Inline schema of the embedded record
        schema: SchemaDecl,
    },
    /// Array of fixed-size elements
    Array {
        /// Fixed shape, dynamic when omitted
        #[serde(default)]
        shape: Option<Vec<usize>>,
        /// Element kind
        element: Box<KindDecl>,
    },
    /// Runtime-typed slot
    Slot,
}

impl KindDecl {
    /// Convert into a field kind; embedded schemas are built and validated
    pub fn into_kind(self) -> Result<FieldKind, LayoutError> {
        let kind = match self {
            KindDecl::Int {
                width,
                signed,
                endian,
            } => FieldKind::int(width, signed, endian),
            KindDecl::Float { endian } => FieldKind::float(endian),
            KindDecl::Double { endian } => FieldKind::double(endian),
            KindDecl::Bool { width, endian } => FieldKind::boolean_with(width, endian),
            KindDecl::String { length, encoding } => FieldKind::string_with(length, encoding),
            KindDecl::Bytes { length } => FieldKind::bytes(length),
            KindDecl::Record { schema } => FieldKind::record(schema.into_schema()?),
            KindDecl::Array {
                shape: Some(shape),
                element,
            } => FieldKind::array(shape, element.into_kind()?),
            KindDecl::Array {
                shape: None,
                element,
            } => FieldKind::dynamic_array(element.into_kind()?),
            KindDecl::Slot => FieldKind::slot(),
        };
        Ok(kind)
    }
}

impl SchemaDecl {
    /// Build and validate the declared schema
    pub fn into_schema(self) -> Result<Arc<Schema>, LayoutError> {
        let mut builder = SchemaBuilder::new(self.name);
        for field in self.fields {
            let kind = field.kind.into_kind()?;
            builder = match field.offset {
                OffsetDecl::Sequential => builder.field(field.name, kind),
                OffsetDecl::Absolute(at) => builder.field_at(field.name, kind, at),
                OffsetDecl::After { field: anchor, delta } => {
                    builder.field_after(field.name, kind, anchor, delta)
                }
            };
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldId, OffsetRule};
    use alloc::vec;

    fn packet() -> SchemaDecl {
        SchemaDecl {
            name: "Packet".into(),
            fields: vec![
                FieldDecl {
                    name: "magic".into(),
                    kind: KindDecl::Int {
                        width: 4,
                        signed: false,
                        endian: Endianness::Big,
                    },
                    offset: OffsetDecl::Sequential,
                },
                FieldDecl {
                    name: "body".into(),
                    kind: KindDecl::Bytes { length: None },
                    offset: OffsetDecl::Sequential,
                },
                FieldDecl {
                    name: "crc".into(),
                    kind: KindDecl::Int {
                        width: 2,
                        signed: false,
                        endian: Endianness::Little,
                    },
                    offset: OffsetDecl::After {
                        field: "body".into(),
                        delta: 0,
                    },
                },
            ],
        }
    }

    #[test]
    fn test_decl_builds_schema() {
        let schema = packet().into_schema().unwrap();
        assert_eq!(schema.name(), "Packet");
        assert_eq!(schema.min_size(), 6);
        assert_eq!(
            schema.field(FieldId(2)).unwrap().offset(),
            OffsetRule::Anchored {
                field: FieldId(1),
                delta: 0
            }
        );
    }

    #[test]
    fn test_decl_rejects_forward_anchor() {
        let mut decl = packet();
        decl.fields[1].offset = OffsetDecl::After {
            field: "crc".into(),
            delta: 0,
        };
        assert!(matches!(
            decl.into_schema(),
            Err(LayoutError::InvalidSchema(_))
        ));
    }

    #[test]
    fn test_nested_array_element_rejected() {
        let kind = KindDecl::Array {
            shape: Some(vec![2]),
            element: Box::new(KindDecl::String {
                length: None,
                encoding: TextEncoding::Utf8,
            }),
        };
        let decl = SchemaDecl {
            name: "Grid".into(),
            fields: vec![FieldDecl {
                name: "cells".into(),
                kind,
                offset: OffsetDecl::default(),
            }],
        };
        assert!(matches!(
            decl.into_schema(),
            Err(LayoutError::InvalidSchema(_))
        ));
    }
}

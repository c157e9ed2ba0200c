//! Schema declaration: field kinds, offset rules and the record schema

use crate::array::element_count;
use crate::constants::{
    is_int_width, DEFAULT_BOOL_WIDTH, DEFAULT_INT_WIDTH, DOUBLE_SIZE, FLOAT_SIZE, MAX_ARRAY_RANK,
    MAX_LAYOUT_SIZE,
};
use crate::error::LayoutError;
use crate::types::{Endianness, TextEncoding};
use alloc::boxed::Box;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;
use hashbrown::HashMap;

/// Index of a field within its schema, in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(pub usize);

/// How a field's start offset is derived
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetRule {
    /// Immediately after the previous declared field (or at the record start)
    Sequential,
    /// Fixed offset from the record start
    Absolute(usize),
    /// End of an earlier field plus a delta
    Anchored {
        /// The field whose end is the anchor
        field: FieldId,
        /// Additional bytes after the anchor's end (may be negative)
        delta: isize,
    },
}

/// The kind of a field: its codec and sizing behaviour
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// Integer of 1, 2, 4 or 8 bytes
    Int {
        /// Width in bytes
        width: u8,
        /// Two's complement if true
        signed: bool,
        /// Byte order
        endian: Endianness,
    },
    /// IEEE-754 single precision float
    Float {
        /// Byte order
        endian: Endianness,
    },
    /// IEEE-754 double precision float
    Double {
        /// Byte order
        endian: Endianness,
    },
    /// Boolean stored as an unsigned integer
    Bool {
        /// Width in bytes
        width: u8,
        /// Byte order
        endian: Endianness,
    },
    /// Text, fixed length or variable (`None`)
    Str {
        /// Length in bytes, `None` for a variable-length string
        length: Option<usize>,
        /// Text encoding
        encoding: TextEncoding,
    },
    /// Raw byte range, fixed length or variable (`None`)
    Bytes {
        /// Length in bytes, `None` for a variable-length range
        length: Option<usize>,
    },
    /// Embedded record sharing the parent's buffer
    Record(Arc<Schema>),
    /// Array of fixed-size elements, fixed or dynamic (`None`) shape
    Array {
        /// Dimension extents, `None` for a dynamic array
        shape: Option<Vec<usize>>,
        /// Element kind, must be fixed-size
        element: Box<FieldKind>,
    },
    /// Runtime-typed slot, bound to a kind at runtime
    Slot,
}

impl FieldKind {
    /// Integer field
    pub fn int(width: u8, signed: bool, endian: Endianness) -> Self {
        FieldKind::Int {
            width,
            signed,
            endian,
        }
    }

    /// Signed 8-bit integer
    pub fn i8() -> Self {
        Self::int(1, true, Endianness::Native)
    }

    /// Unsigned 8-bit integer
    pub fn u8() -> Self {
        Self::int(1, false, Endianness::Native)
    }

    /// Signed 16-bit integer
    pub fn i16(endian: Endianness) -> Self {
        Self::int(2, true, endian)
    }

    /// Unsigned 16-bit integer
    pub fn u16(endian: Endianness) -> Self {
        Self::int(2, false, endian)
    }

    /// Signed 32-bit integer
    pub fn i32(endian: Endianness) -> Self {
        Self::int(DEFAULT_INT_WIDTH, true, endian)
    }

    /// Unsigned 32-bit integer
    pub fn u32(endian: Endianness) -> Self {
        Self::int(4, false, endian)
    }

    /// Signed 64-bit integer
    pub fn i64(endian: Endianness) -> Self {
        Self::int(8, true, endian)
    }

    /// Unsigned 64-bit integer
    pub fn u64(endian: Endianness) -> Self {
        Self::int(8, false, endian)
    }

    /// Single precision float
    pub fn float(endian: Endianness) -> Self {
        FieldKind::Float { endian }
    }

    /// Double precision float
    pub fn double(endian: Endianness) -> Self {
        FieldKind::Double { endian }
    }

    /// Boolean with the default width
    pub fn boolean() -> Self {
        Self::boolean_with(DEFAULT_BOOL_WIDTH, Endianness::Native)
    }

    /// Boolean with an explicit width and byte order
    pub fn boolean_with(width: u8, endian: Endianness) -> Self {
        FieldKind::Bool { width, endian }
    }

    /// UTF-8 string; `None` makes it variable-length
    pub fn string(length: Option<usize>) -> Self {
        Self::string_with(length, TextEncoding::Utf8)
    }

    /// String with an explicit encoding
    pub fn string_with(length: Option<usize>, encoding: TextEncoding) -> Self {
        FieldKind::Str { length, encoding }
    }

    /// Byte range; `None` makes it variable-length
    pub fn bytes(length: Option<usize>) -> Self {
        FieldKind::Bytes { length }
    }

    /// Embedded record
    pub fn record(schema: Arc<Schema>) -> Self {
        FieldKind::Record(schema)
    }

    /// Array with a fixed shape
    pub fn array(shape: impl Into<Vec<usize>>, element: FieldKind) -> Self {
        FieldKind::Array {
            shape: Some(shape.into()),
            element: Box::new(element),
        }
    }

    /// Array whose shape is set per instance
    pub fn dynamic_array(element: FieldKind) -> Self {
        FieldKind::Array {
            shape: None,
            element: Box::new(element),
        }
    }

    /// Runtime-typed slot
    pub fn slot() -> Self {
        FieldKind::Slot
    }

    /// Short name of the kind
    pub fn kind_name(&self) -> &'static str {
        match self {
            FieldKind::Int { .. } => "int",
            FieldKind::Float { .. } => "float",
            FieldKind::Double { .. } => "double",
            FieldKind::Bool { .. } => "bool",
            FieldKind::Str { .. } => "string",
            FieldKind::Bytes { .. } => "bytes",
            FieldKind::Record(_) => "record",
            FieldKind::Array { .. } => "array",
            FieldKind::Slot => "slot",
        }
    }

    /// Size in bytes if it is the same for every instance
    pub fn fixed_size(&self) -> Option<usize> {
        match self {
            FieldKind::Int { width, .. } | FieldKind::Bool { width, .. } => Some(*width as usize),
            FieldKind::Float { .. } => Some(FLOAT_SIZE),
            FieldKind::Double { .. } => Some(DOUBLE_SIZE),
            FieldKind::Str { length, .. } | FieldKind::Bytes { length } => *length,
            FieldKind::Record(schema) => schema.is_fixed().then(|| schema.min_size()),
            FieldKind::Array {
                shape: Some(shape),
                element,
            } => element.fixed_size().map(|size| size * element_count(shape)),
            FieldKind::Array { shape: None, .. } | FieldKind::Slot => None,
        }
    }

    /// Size in bytes with every instance-sized part at its minimum
    pub fn min_size(&self) -> usize {
        match self {
            FieldKind::Record(schema) => schema.min_size(),
            other => other.fixed_size().unwrap_or(0),
        }
    }

    /// True if the size of this field can differ between instances
    pub fn is_instance(&self) -> bool {
        matches!(
            self,
            FieldKind::Str { length: None, .. }
                | FieldKind::Bytes { length: None }
                | FieldKind::Array { shape: None, .. }
                | FieldKind::Record(_)
                | FieldKind::Slot
        )
    }

    /// Check the kind is well-formed
    pub fn validate(&self, field: &str) -> Result<(), LayoutError> {
        match self {
            FieldKind::Int { width, .. } | FieldKind::Bool { width, .. } => {
                if !is_int_width(*width) {
                    return Err(LayoutError::InvalidSchema(format!(
                        "field '{}': integer width has to be 1, 2, 4 or 8, got {}",
                        field, width
                    )));
                }
            }
            FieldKind::Array { shape, element } => {
                if let Some(shape) = shape {
                    validate_shape(field, shape)?;
                }
                element.validate(field)?;
                match **element {
                    FieldKind::Array { .. } | FieldKind::Slot => {
                        return Err(LayoutError::InvalidSchema(format!(
                            "field '{}': {} elements are not supported in arrays, use a multi-dimensional shape",
                            field,
                            element.kind_name()
                        )));
                    }
                    FieldKind::Record(ref schema) if !schema.is_fixed() => {
                        return Err(LayoutError::InvalidSchema(format!(
                            "field '{}': record '{}' has dynamically sized fields and cannot be an array element",
                            field,
                            schema.name()
                        )));
                    }
                    _ if element.fixed_size().is_none() => {
                        return Err(LayoutError::InvalidSchema(format!(
                            "field '{}': array elements must have a constant size",
                            field
                        )));
                    }
                    _ => {}
                }
            }
            _ => {}
        }
        match self.fixed_size() {
            Some(size) if size > MAX_LAYOUT_SIZE => Err(too_large(field, size)),
            _ => Ok(()),
        }
    }
}

pub(crate) fn too_large(field: &str, size: usize) -> LayoutError {
    LayoutError::InvalidSchema(format!(
        "field '{}': {} bytes exceeds the layout limit of {} bytes",
        field, size, MAX_LAYOUT_SIZE
    ))
}

/// Check a shape is usable for an array
pub(crate) fn validate_shape(field: &str, shape: &[usize]) -> Result<(), LayoutError> {
    if shape.is_empty() || shape.len() > MAX_ARRAY_RANK {
        return Err(LayoutError::InvalidSchema(format!(
            "field '{}': array shape must have between 1 and {} dimensions, got {}",
            field,
            MAX_ARRAY_RANK,
            shape.len()
        )));
    }
    let count = shape
        .iter()
        .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
        .filter(|&count| count <= MAX_LAYOUT_SIZE);
    if count.is_none() {
        return Err(LayoutError::InvalidSchema(format!(
            "field '{}': array shape {:?} exceeds the layout limit of {} elements",
            field, shape, MAX_LAYOUT_SIZE
        )));
    }
    Ok(())
}

/// A named field descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    name: String,
    kind: FieldKind,
    offset: OffsetRule,
}

impl FieldDef {
    /// Name of the field
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kind of the field
    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// Offset rule of the field
    pub fn offset(&self) -> OffsetRule {
        self.offset
    }
}

/// A record schema: an ordered list of field descriptors
///
/// Schemas are shared by every record of the type and are immutable once
/// built; per-instance sizes live in the record, not here.
#[derive(Debug, Clone)]
pub struct Schema {
    name: String,
    fields: Vec<FieldDef>,
    index: HashMap<String, FieldId>,
    min_offsets: Vec<usize>,
    min_size: usize,
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.fields == other.fields
    }
}

impl Schema {
    /// Start declaring a schema
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(name)
    }

    /// Name of the schema
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field descriptors in declaration order
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Number of declared fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the schema declares no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Look up a field by name
    pub fn field_id(&self, name: &str) -> Result<FieldId, LayoutError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| LayoutError::UnknownField(name.to_string()))
    }

    /// Field descriptor by id, `None` if the id is not from this schema
    pub fn field(&self, id: FieldId) -> Option<&FieldDef> {
        self.fields.get(id.0)
    }

    /// Field descriptor for an id handed out by this schema
    pub(crate) fn def(&self, id: FieldId) -> &FieldDef {
        &self.fields[id.0]
    }

    /// Record size with every instance-sized field at its minimum
    pub fn min_size(&self) -> usize {
        self.min_size
    }

    /// Offset of a field with every instance-sized field at its minimum
    pub fn min_offset(&self, id: FieldId) -> Option<usize> {
        self.min_offsets.get(id.0).copied()
    }

    /// True if no field of this schema is instance-sized, except embedded
    /// records that are themselves fixed
    pub fn is_fixed(&self) -> bool {
        self.fields.iter().all(|f| f.kind.fixed_size().is_some())
    }
}

/// Builder for declaring schemas
#[derive(Debug)]
pub struct SchemaBuilder {
    name: String,
    fields: Vec<(String, FieldKind, Placement)>,
}

#[derive(Debug)]
enum Placement {
    Sequential,
    Absolute(usize),
    After(String, isize),
}

impl SchemaBuilder {
    /// Create a new schema builder
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Declare a field directly after the previous one
    pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push((name.into(), kind, Placement::Sequential));
        self
    }

    /// Declare a field at a fixed offset from the record start
    pub fn field_at(mut self, name: impl Into<String>, kind: FieldKind, offset: usize) -> Self {
        self.fields
            .push((name.into(), kind, Placement::Absolute(offset)));
        self
    }

    /// Declare a field at the end of an earlier field plus `delta`
    pub fn field_after(
        mut self,
        name: impl Into<String>,
        kind: FieldKind,
        anchor: impl Into<String>,
        delta: isize,
    ) -> Self {
        self.fields
            .push((name.into(), kind, Placement::After(anchor.into(), delta)));
        self
    }

    /// Validate and build the schema
    pub fn build(self) -> Result<Arc<Schema>, LayoutError> {
        let mut fields = Vec::with_capacity(self.fields.len());
        let mut index = HashMap::with_capacity(self.fields.len());
        let mut min_offsets: Vec<usize> = Vec::with_capacity(self.fields.len());
        let mut min_size = 0usize;

        for (i, (name, kind, placement)) in self.fields.into_iter().enumerate() {
            if name.is_empty() {
                return Err(LayoutError::InvalidSchema(format!(
                    "schema '{}': field {} has an empty name",
                    self.name, i
                )));
            }
            if index.contains_key(&name) {
                return Err(LayoutError::InvalidSchema(format!(
                    "schema '{}': duplicate field '{}'",
                    self.name, name
                )));
            }
            kind.validate(&name)?;

            let end_of = |id: usize, fields: &Vec<FieldDef>| -> usize {
                let f: &FieldDef = &fields[id];
                min_offsets[id] + f.kind.min_size()
            };

            let (offset, min_offset) = match placement {
                Placement::Sequential => (OffsetRule::Sequential, min_size),
                Placement::Absolute(at) => (OffsetRule::Absolute(at), at),
                Placement::After(anchor, delta) => {
                    let anchor_id = *index.get(&anchor).ok_or_else(|| {
                        LayoutError::InvalidSchema(format!(
                            "field '{}': anchor '{}' must be declared before it",
                            name, anchor
                        ))
                    })?;
                    let FieldId(a) = anchor_id;
                    // Offsets only grow with instance sizes, so a placement that
                    // is non-negative at minimum layout stays non-negative.
                    let start = end_of(a, &fields).checked_add_signed(delta).ok_or_else(|| {
                        LayoutError::InvalidSchema(format!(
                            "field '{}': anchored placement resolves before the record start",
                            name
                        ))
                    })?;
                    (
                        OffsetRule::Anchored {
                            field: anchor_id,
                            delta,
                        },
                        start,
                    )
                }
            };

            if min_offset
                .checked_add(kind.min_size())
                .map_or(true, |end| end > MAX_LAYOUT_SIZE)
            {
                return Err(too_large(&name, min_offset.saturating_add(kind.min_size())));
            }
            min_size = min_size
                .checked_add(kind.min_size())
                .filter(|&size| size <= MAX_LAYOUT_SIZE)
                .ok_or_else(|| too_large(&name, min_size.saturating_add(kind.min_size())))?;
            min_offsets.push(min_offset);
            index.insert(name.clone(), FieldId(i));
            fields.push(FieldDef { name, kind, offset });
        }

        Ok(Arc::new(Schema {
            name: self.name,
            fields,
            index,
            min_offsets,
            min_size,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_oversized_layouts_rejected() {
        let huge = Schema::builder("Huge")
            .field("grid", FieldKind::array(vec![usize::MAX, 2], FieldKind::u8()))
            .build();
        assert!(matches!(huge, Err(LayoutError::InvalidSchema(_))));

        let far = Schema::builder("Far")
            .field_at("x", FieldKind::u64(Endianness::Big), usize::MAX - 2)
            .build();
        assert!(matches!(far, Err(LayoutError::InvalidSchema(_))));

        let long = Schema::builder("Long")
            .field("s", FieldKind::string(Some(MAX_LAYOUT_SIZE + 1)))
            .build();
        assert!(matches!(long, Err(LayoutError::InvalidSchema(_))));
    }

    fn header() -> Arc<Schema> {
        Schema::builder("Header")
            .field("magic", FieldKind::u32(Endianness::Big))
            .field("name", FieldKind::string(None))
            .field("tail", FieldKind::u16(Endianness::Little))
            .build()
            .unwrap()
    }

    #[test]
    fn test_min_size_and_offsets() {
        let schema = header();
        assert_eq!(schema.min_size(), 6);
        assert_eq!(schema.min_offset(FieldId(0)), Some(0));
        assert_eq!(schema.min_offset(FieldId(1)), Some(4));
        assert_eq!(schema.min_offset(FieldId(2)), Some(4));
        assert!(!schema.is_fixed());
    }

    #[test]
    fn test_foreign_field_id_is_none() {
        let schema = header();
        assert_eq!(schema.field(FieldId(3)), None);
        assert_eq!(schema.min_offset(FieldId(usize::MAX)), None);
        assert_eq!(schema.field(FieldId(1)).map(FieldDef::name), Some("name"));
    }

    #[test]
    fn test_anchored_and_absolute() {
        let schema = Schema::builder("Union")
            .field("a", FieldKind::u32(Endianness::Little))
            .field_after("b", FieldKind::u8(), "a", -4)
            .field_at("c", FieldKind::u64(Endianness::Little), 2)
            .field("d", FieldKind::u16(Endianness::Little))
            .build()
            .unwrap();
        assert_eq!(schema.min_offset(schema.field_id("b").unwrap()), Some(0));
        assert_eq!(schema.min_offset(schema.field_id("c").unwrap()), Some(2));
        // d follows the sizes of a, b and c, overlapping or not
        assert_eq!(schema.min_offset(schema.field_id("d").unwrap()), Some(13));
        assert_eq!(schema.min_size(), 15);
        assert!(schema.is_fixed());
    }

    #[test]
    fn test_rejects_bad_declarations() {
        let dup = Schema::builder("Dup")
            .field("a", FieldKind::u8())
            .field("a", FieldKind::u8())
            .build();
        assert!(matches!(dup, Err(LayoutError::InvalidSchema(_))));

        let width = Schema::builder("W")
            .field("a", FieldKind::int(3, true, Endianness::Native))
            .build();
        assert!(matches!(width, Err(LayoutError::InvalidSchema(_))));

        let forward = Schema::builder("F")
            .field_after("a", FieldKind::u8(), "b", 0)
            .field("b", FieldKind::u8())
            .build();
        assert!(matches!(forward, Err(LayoutError::InvalidSchema(_))));

        let negative = Schema::builder("N")
            .field("a", FieldKind::u8())
            .field_after("b", FieldKind::u8(), "a", -2)
            .build();
        assert!(matches!(negative, Err(LayoutError::InvalidSchema(_))));
    }

    #[test]
    fn test_array_element_rules() {
        let var = Schema::builder("A")
            .field("a", FieldKind::array(vec![2], FieldKind::string(None)))
            .build();
        assert!(matches!(var, Err(LayoutError::InvalidSchema(_))));

        let dynamic_inner = header();
        let rec = Schema::builder("B")
            .field("a", FieldKind::dynamic_array(FieldKind::record(dynamic_inner)))
            .build();
        assert!(matches!(rec, Err(LayoutError::InvalidSchema(_))));

        let point = Schema::builder("Point")
            .field("x", FieldKind::i32(Endianness::Little))
            .field("y", FieldKind::i32(Endianness::Little))
            .build()
            .unwrap();
        let ok = Schema::builder("C")
            .field("pts", FieldKind::array(vec![2, 3], FieldKind::record(point)))
            .build()
            .unwrap();
        assert_eq!(ok.min_size(), 6 * 8);
    }

    #[test]
    fn test_unknown_field() {
        let schema = header();
        assert_eq!(
            schema.field_id("nope"),
            Err(LayoutError::UnknownField("nope".to_string()))
        );
    }
}

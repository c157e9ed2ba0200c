//! Error types for Bytefield layout operations

use alloc::string::String;
use alloc::vec::Vec;

/// Errors that can occur while declaring schemas or accessing records
#[cfg_attr(feature = "std", derive(thiserror::Error))]
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutError {
    /// The resolved byte range of a field exceeds the buffer
    #[cfg_attr(
        feature = "std",
        error("Field '{field}' at offset {offset} with size {size} is out of bounds for buffer of {len} bytes")
    )]
    OutOfBounds {
        /// Name of the field being accessed.
        field: String,
        /// Absolute offset of the field.
        offset: usize,
        /// Size of the field in bytes.
        size: usize,
        /// Length of the backing buffer.
        len: usize,
    },

    /// Assigned value length disagrees with a fixed-length field
    #[cfg_attr(feature = "std", error("Length mismatch for '{field}': expected {expected} bytes, got {actual}"))]
    LengthMismatch {
        /// Name of the field being assigned.
        field: String,
        /// The declared length.
        expected: usize,
        /// The length of the assigned value.
        actual: usize,
    },

    /// Assigned array shape disagrees with a fixed-shape array field
    #[cfg_attr(feature = "std", error("Shape mismatch for '{field}': expected {expected:?}, got {actual:?}"))]
    ShapeMismatch {
        /// Name of the field being assigned.
        field: String,
        /// The declared shape.
        expected: Vec<usize>,
        /// The shape of the assigned value.
        actual: Vec<usize>,
    },

    /// A runtime-typed slot was accessed before being bound
    #[cfg_attr(feature = "std", error("Slot '{0}' is not bound to a field kind"))]
    UnboundSlot(String),

    /// A schema or field kind was rejected at declaration time
    #[cfg_attr(feature = "std", error("Invalid schema: {0}"))]
    InvalidSchema(String),

    /// No field with this name exists in the schema
    #[cfg_attr(feature = "std", error("Unknown field: {0}"))]
    UnknownField(String),

    /// A value of the wrong variant was assigned to a field
    #[cfg_attr(feature = "std", error("Type mismatch for '{field}': expected {expected}, got {found}"))]
    TypeMismatch {
        /// Name of the field being assigned.
        field: String,
        /// Kind of value the field accepts.
        expected: &'static str,
        /// Kind of value that was supplied.
        found: &'static str,
    },

    /// A numeric value does not fit the width of the field
    #[cfg_attr(feature = "std", error("Value {value} does not fit into '{field}'"))]
    ValueOutOfRange {
        /// Name of the field being assigned.
        field: String,
        /// Rendering of the rejected value.
        value: String,
    },

    /// An array index lies outside the array shape
    #[cfg_attr(feature = "std", error("Index {index:?} is out of range for shape {shape:?}"))]
    IndexOutOfRange {
        /// The requested index.
        index: Vec<usize>,
        /// The current shape of the array.
        shape: Vec<usize>,
    },

    /// The field has a fixed size or the extent does not match its kind
    #[cfg_attr(feature = "std", error("Field '{0}' cannot be resized this way"))]
    NotResizable(String),

    /// Text could not be encoded or decoded
    #[cfg_attr(feature = "std", error("Encoding error: {0}"))]
    Encoding(String),

    /// A retained record handle outlived a layout change
    #[cfg_attr(feature = "std", error("Stale record handle: taken at generation {taken}, layout is at {current}"))]
    StaleHandle {
        /// Generation at which the handle was created.
        taken: u64,
        /// Current generation of the record.
        current: u64,
    },

    /// An embedded record of a different schema was assigned
    #[cfg_attr(feature = "std", error("Schema mismatch for '{field}': expected {expected}, got {actual}"))]
    SchemaMismatch {
        /// Name of the field being assigned.
        field: String,
        /// Name of the declared schema.
        expected: String,
        /// Name of the schema of the assigned record.
        actual: String,
    },
}

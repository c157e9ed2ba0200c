//! Constants and limits for Bytefield layouts

/// Integer widths (in bytes) accepted by integer and boolean fields
pub const INT_WIDTHS: [u8; 4] = [1, 2, 4, 8];

/// Width of an integer field when none is given
pub const DEFAULT_INT_WIDTH: u8 = 4;

/// Width of a boolean field when none is given (stored as an unsigned integer)
pub const DEFAULT_BOOL_WIDTH: u8 = 4;

/// Size of an IEEE-754 single precision float in bytes
pub const FLOAT_SIZE: usize = 4;

/// Size of an IEEE-754 double precision float in bytes
pub const DOUBLE_SIZE: usize = 8;

/// Maximum number of dimensions an array field may declare
pub const MAX_ARRAY_RANK: usize = 8;

/// Largest size in bytes a schema may declare for one field or its minimum layout
pub const MAX_LAYOUT_SIZE: usize = 1 << 30;

/// Shape of a dynamic array before it has been sized
pub const EMPTY_SHAPE: [usize; 1] = [0];

/// Returns true if `width` is a supported integer width
pub const fn is_int_width(width: u8) -> bool {
    matches!(width, 1 | 2 | 4 | 8)
}

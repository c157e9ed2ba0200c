//! Buffer splicing for instance-sized fields
//!
//! When a field at absolute offset `start` changes from `old_size` to
//! `new_size` bytes, the buffer is spliced at the field's old end:
//!
//! - growing inserts `new_size - old_size` zero bytes at `start + old_size`
//! - shrinking removes the field's last `old_size - new_size` bytes
//!
//! Bytes before the splice point are untouched and every byte after it
//! shifts by the delta. The buffer is the single buffer shared by a record
//! and all of its embedded records, so an enclosing record observes the
//! shift without further bookkeeping: its size for the embedding field is
//! derived from the embedded layout, which the caller updates after the
//! splice.

use crate::error::LayoutError;
use alloc::format;
use alloc::string::ToString;
use bytes::BytesMut;

#[cfg(feature = "logging")]
use tracing::trace;

/// Grow or shrink the field at `start` from `old_size` to `new_size` bytes
///
/// Validates that the field's old range lies inside the buffer before any
/// byte is moved, so a failed call leaves the buffer unchanged.
pub(crate) fn splice(
    buf: &mut BytesMut,
    field: &str,
    start: usize,
    old_size: usize,
    new_size: usize,
) -> Result<(), LayoutError> {
    let len = buf.len();
    let out_of_bounds = || LayoutError::OutOfBounds {
        field: field.to_string(),
        offset: start,
        size: old_size,
        len,
    };
    let old_end = start.checked_add(old_size).ok_or_else(out_of_bounds)?;
    if old_end > len {
        return Err(out_of_bounds());
    }

    if new_size > old_size {
        let delta = new_size - old_size;
        let grown = len
            .checked_add(delta)
            .filter(|&grown| grown <= isize::MAX as usize)
            .ok_or_else(|| {
                LayoutError::InvalidSchema(format!(
                    "field '{}': growing by {} bytes overflows a {} byte buffer",
                    field, delta, len
                ))
            })?;
        buf.resize(grown, 0);
        buf.copy_within(old_end..len, old_end + delta);
        buf[old_end..old_end + delta].fill(0);
    } else if new_size < old_size {
        let delta = old_size - new_size;
        buf.copy_within(old_end..len, old_end - delta);
        buf.truncate(len - delta);
    } else {
        return Ok(());
    }

    #[cfg(feature = "logging")]
    trace!(
        "Spliced buffer for '{}' at {}: {} -> {} bytes (buffer now {} bytes)",
        field,
        old_end,
        old_size,
        new_size,
        buf.len()
    );

    Ok(())
}

//! Per-instance layout state and lazy offset resolution
//!
//! A [`Layout`] records the current extent of every instance-sized field of
//! one record. Absolute offsets are never stored: they are derived from the
//! schema's offset rules and these extents on every access, so a resize of
//! an earlier field is visible to every later field immediately.
//!
//! A sequential field starts at the sum of the current sizes of every field
//! declared before it, whatever their own placement. The record size is the
//! same sum taken over all fields.

use crate::array::element_count;
use crate::constants::EMPTY_SHAPE;
use crate::error::LayoutError;
use crate::schema::{FieldId, FieldKind, OffsetRule, Schema};
use alloc::boxed::Box;
use alloc::string::ToString;
use alloc::vec::Vec;

/// Runtime state of a single field
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FieldState {
    /// Size is the schema-level constant
    Fixed,
    /// Current length of a variable string or byte range
    Len(usize),
    /// Current shape of a dynamic array
    Shape(Vec<usize>),
    /// Layout of an embedded record
    Record(Layout),
    /// Kind and state a slot is bound to, if any
    Slot(Option<Box<Bound>>),
}

/// A runtime-typed slot bound to a concrete kind
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Bound {
    pub(crate) kind: FieldKind,
    pub(crate) state: FieldState,
}

impl FieldState {
    /// State of a field of `kind` before any instance sizing
    pub(crate) fn initial(kind: &FieldKind) -> Self {
        match kind {
            FieldKind::Str { length: None, .. } | FieldKind::Bytes { length: None } => {
                FieldState::Len(0)
            }
            FieldKind::Array { shape: None, .. } => FieldState::Shape(EMPTY_SHAPE.to_vec()),
            FieldKind::Record(schema) => FieldState::Record(Layout::minimal(schema)),
            FieldKind::Slot => FieldState::Slot(None),
            _ => FieldState::Fixed,
        }
    }
}

/// Current size in bytes of a field of `kind` in `state`
pub(crate) fn state_size(kind: &FieldKind, state: &FieldState) -> usize {
    match (kind, state) {
        (_, FieldState::Len(len)) => *len,
        (FieldKind::Array { element, .. }, FieldState::Shape(shape)) => {
            element.min_size() * element_count(shape)
        }
        (FieldKind::Record(schema), FieldState::Record(layout)) => layout.extent(schema),
        (_, FieldState::Slot(Some(bound))) => state_size(&bound.kind, &bound.state),
        (_, FieldState::Slot(None)) => 0,
        (kind, _) => kind.min_size(),
    }
}

/// Current shape of an array field
pub(crate) fn state_shape<'a>(kind: &'a FieldKind, state: &'a FieldState) -> Option<&'a [usize]> {
    match (kind, state) {
        (FieldKind::Array { shape: Some(shape), .. }, _) => Some(shape),
        (FieldKind::Array { shape: None, .. }, FieldState::Shape(shape)) => Some(shape),
        (_, FieldState::Slot(Some(bound))) => state_shape(&bound.kind, &bound.state),
        _ => None,
    }
}

/// Resolve a bound slot to the kind and state it is bound to
pub(crate) fn effective<'s>(
    field: &str,
    kind: &'s FieldKind,
    state: &'s FieldState,
) -> Result<(&'s FieldKind, &'s FieldState), LayoutError> {
    match (kind, state) {
        (FieldKind::Slot, FieldState::Slot(Some(bound))) => Ok((&bound.kind, &bound.state)),
        (FieldKind::Slot, _) => Err(LayoutError::UnboundSlot(field.to_string())),
        _ => Ok((kind, state)),
    }
}

/// Mutable counterpart of [`effective`]
pub(crate) fn effective_mut<'s>(
    field: &str,
    kind: &'s FieldKind,
    state: &'s mut FieldState,
) -> Result<(&'s FieldKind, &'s mut FieldState), LayoutError> {
    match (kind, state) {
        (FieldKind::Slot, FieldState::Slot(Some(bound))) => {
            let Bound { kind, state } = &mut **bound;
            Ok((&*kind, state))
        }
        (FieldKind::Slot, _) => Err(LayoutError::UnboundSlot(field.to_string())),
        (kind, state) => Ok((kind, state)),
    }
}

/// Extents of every instance-sized field of one record
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct Layout {
    states: Vec<FieldState>,
}

impl Layout {
    /// Layout with every instance-sized field at its minimum
    pub(crate) fn minimal(schema: &Schema) -> Self {
        Self {
            states: schema
                .fields()
                .iter()
                .map(|f| FieldState::initial(f.kind()))
                .collect(),
        }
    }

    pub(crate) fn state(&self, id: FieldId) -> &FieldState {
        &self.states[id.0]
    }

    pub(crate) fn state_mut(&mut self, id: FieldId) -> &mut FieldState {
        &mut self.states[id.0]
    }

    /// Current size of a field
    pub(crate) fn field_size(&self, schema: &Schema, id: FieldId) -> usize {
        state_size(schema.def(id).kind(), self.state(id))
    }

    /// Offset of a field relative to the record start
    pub(crate) fn field_offset(&self, schema: &Schema, id: FieldId) -> usize {
        match schema.def(id).offset() {
            OffsetRule::Absolute(at) => at,
            OffsetRule::Anchored { field, delta } => {
                let end = self.field_offset(schema, field) + self.field_size(schema, field);
                // Schemas reject placements that resolve below zero at minimum layout.
                end.saturating_add_signed(delta)
            }
            OffsetRule::Sequential => (0..id.0)
                .map(|i| self.field_size(schema, FieldId(i)))
                .sum(),
        }
    }

    /// Current record size: the sequential end of the last field, which is
    /// the sum of every field's current size
    ///
    /// Anchored and absolute fields count towards the size like any other
    /// field, so every splice changes the size by exactly its delta.
    pub(crate) fn extent(&self, schema: &Schema) -> usize {
        (0..schema.len())
            .map(|i| self.field_size(schema, FieldId(i)))
            .sum()
    }
}

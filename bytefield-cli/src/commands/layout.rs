use crate::input::{apply_extents, load_schema, read_input, ExtentArg};
use anyhow::{Context, Result};
use bytefield_core::{FieldKind, LayoutError, Record, RecordRef};
use colored::*;
use serde::Serialize;
use tracing::info;

/// Bytes of a field shown before eliding the rest
const HEX_PREVIEW: usize = 16;

/// Placement of one field, including fields of embedded records
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldRow {
    /// Dotted path of the field
    pub path: String,
    /// Kind name, `unbound` for an unbound slot
    pub kind: &'static str,
    /// Absolute offset in the buffer
    pub offset: usize,
    /// Current size in bytes
    pub size: usize,
    /// Hex of the field's bytes, `None` if they lie outside the buffer
    pub bytes: Option<String>,
}

/// List every field of the record, embedded records depth-first
pub fn describe(view: RecordRef<'_>) -> Result<Vec<FieldRow>> {
    let mut rows = Vec::new();
    collect(view, "", &mut rows)?;
    Ok(rows)
}

fn collect(view: RecordRef<'_>, prefix: &str, rows: &mut Vec<FieldRow>) -> Result<()> {
    for field in view.schema().fields() {
        let name = field.name();
        let path = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", prefix, name)
        };
        let kind = match view.field_kind(name) {
            Ok(kind) => Some(kind),
            Err(LayoutError::UnboundSlot(_)) => None,
            Err(e) => return Err(e.into()),
        };

        rows.push(FieldRow {
            path: path.clone(),
            kind: kind.map_or("unbound", FieldKind::kind_name),
            offset: view.field_offset(name)?,
            size: view.field_size(name)?,
            bytes: view.field_bytes(name).ok().map(hex::encode),
        });

        if let Some(FieldKind::Record(_)) = kind {
            collect(view.record(name)?, &path, rows)?;
        }
    }
    Ok(())
}

pub fn execute(
    schema: &str,
    input: Option<&str>,
    extents: &[ExtentArg],
    json: bool,
) -> Result<()> {
    let schema = load_schema(schema)?;
    let mut record = match input {
        Some(input) => {
            info!("Laying out {} with schema {}", input, schema.name());
            Record::from_bytes_mut(schema.clone(), read_input(input)?)
                .context("Input is shorter than the schema's minimum size")?
        }
        None => Record::new(schema.clone()),
    };
    apply_extents(&mut record, extents)?;

    let rows = describe(record.view())?;

    if json {
        let out = serde_json::to_string_pretty(&rows).context("Failed to serialize layout")?;
        println!("{}", out);
        return Ok(());
    }

    println!(
        "\n=== Layout of {} ({} bytes, buffer {} bytes) ===",
        schema.name(),
        record.size(),
        record.as_bytes().len()
    );
    println!(
        "{:<28} {:<8} {:>8} {:>8}  {}",
        "FIELD", "KIND", "OFFSET", "SIZE", "BYTES"
    );
    for row in &rows {
        let bytes = match &row.bytes {
            Some(hex) if hex.len() > HEX_PREVIEW * 2 => format!("{}..", &hex[..HEX_PREVIEW * 2]),
            Some(hex) => hex.clone(),
            None => "<out of bounds>".red().to_string(),
        };
        println!(
            "{:<28} {:<8} {:>8} {:>8}  {}",
            row.path, row.kind, row.offset, row.size, bytes
        );
    }

    Ok(())
}

use crate::convert::json_to_value;
use crate::input::{apply_extents, load_schema, read_input, ExtentArg, FieldPath};
use anyhow::{bail, Context, Result};
use bytefield_core::Record;
use colored::*;
use serde_json::Value as Json;
use std::fs;
use tracing::info;

/// Assign the field at `path`, resizing the record as needed
pub fn assign(record: &mut Record, path: &FieldPath, json: &Json) -> Result<()> {
    let mut view = path.open(record)?;
    let kind = view.field_kind(path.field())?.clone();
    let value =
        json_to_value(json, &kind).with_context(|| format!("Invalid value for '{}'", path))?;
    view.set(path.field(), value)
        .with_context(|| format!("Failed to assign '{}'", path))?;
    Ok(())
}

pub fn execute(
    schema: &str,
    input: &str,
    field: &str,
    value: &str,
    extents: &[ExtentArg],
    output: Option<&str>,
) -> Result<()> {
    let output = match output {
        Some(path) => path,
        None if input == "-" => bail!("--output is required when reading from stdin"),
        None => input,
    };
    let path: FieldPath = field.parse().map_err(anyhow::Error::msg)?;
    let json: Json = serde_json::from_str(value)
        .with_context(|| format!("Value is not valid JSON: {}", value))?;

    info!("Setting '{}' in {}", path, input);

    let schema = load_schema(schema)?;
    let data = read_input(input)?;
    let mut record = Record::from_bytes_mut(schema, data)
        .context("Input is shorter than the schema's minimum size")?;
    apply_extents(&mut record, extents)?;

    let before = record.as_bytes().len();
    assign(&mut record, &path, &json)?;
    let after = record.as_bytes().len();

    fs::write(output, record.as_bytes())
        .with_context(|| format!("Failed to write output file: {}", output))?;

    println!(
        "{} Set '{}' ({} -> {} bytes), wrote {}",
        "✓".green(),
        path,
        before,
        after,
        output
    );

    Ok(())
}

use crate::convert::record_to_json;
use crate::input::{apply_extents, load_schema, read_input, ExtentArg};
use anyhow::{Context, Result};
use bytefield_core::{Record, Schema};
use bytes::BytesMut;
use serde_json::Value as Json;
use std::sync::Arc;
use tracing::info;

/// Decode every field of `data` as a JSON object
pub fn inspect(schema: Arc<Schema>, data: BytesMut, extents: &[ExtentArg]) -> Result<Json> {
    let mut record = Record::from_bytes_mut(schema, data)
        .context("Input is shorter than the schema's minimum size")?;
    apply_extents(&mut record, extents)?;

    let trailing = record.as_bytes().len().saturating_sub(record.size());
    if trailing > 0 {
        info!("{} trailing bytes after the record", trailing);
    }

    Ok(record_to_json(record.view()))
}

pub fn execute(schema: &str, input: &str, extents: &[ExtentArg]) -> Result<()> {
    info!("Inspecting {} with schema {}", input, schema);

    let schema = load_schema(schema)?;
    let data = read_input(input)?;

    info!("Input size: {} bytes", data.len());

    let json = inspect(schema, data, extents)?;
    let text = serde_json::to_string_pretty(&json).context("Failed to serialize fields")?;
    println!("{}", text);

    Ok(())
}

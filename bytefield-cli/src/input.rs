//! Schema files, input buffers and command-line field addressing

use anyhow::{bail, Context, Result};
use bytefield_core::{Extent, FieldKind, Record, RecordMut, ResizeMode, Schema, SchemaDecl};
use bytes::BytesMut;
use std::fmt;
use std::fs;
use std::io::{self, Read};
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Load and validate a JSON schema declaration
pub fn load_schema(path: &str) -> Result<Arc<Schema>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read schema file: {}", path))?;
    parse_schema(&text).with_context(|| format!("Failed to load schema from {}", path))
}

/// Parse and validate a JSON schema declaration
pub fn parse_schema(text: &str) -> Result<Arc<Schema>> {
    let decl: SchemaDecl =
        serde_json::from_str(text).context("Failed to parse schema declaration")?;
    let name = decl.name.clone();
    let schema = decl
        .into_schema()
        .with_context(|| format!("Invalid schema '{}'", name))?;

    debug!(
        "Loaded schema '{}': {} fields, minimum size {} bytes",
        schema.name(),
        schema.len(),
        schema.min_size()
    );

    Ok(schema)
}

/// Read a whole input file, or stdin for "-"
pub fn read_input(path: &str) -> Result<BytesMut> {
    let data = if path == "-" {
        let mut buf = Vec::new();
        io::stdin().read_to_end(&mut buf)?;
        buf
    } else {
        fs::read(path).with_context(|| format!("Failed to read input file: {}", path))?
    };
    Ok(BytesMut::from(&data[..]))
}

/// A dotted path to a field through embedded records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    parents: Vec<String>,
    field: String,
}

impl FieldPath {
    /// Embedded record fields leading to the target
    pub fn parents(&self) -> &[String] {
        &self.parents
    }

    /// Name of the target field in its record
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Mutable view of the record holding the target field
    pub fn open<'r>(&self, record: &'r mut Record) -> Result<RecordMut<'r>> {
        let mut view = record.view_mut();
        for parent in &self.parents {
            view = view
                .into_record(parent)
                .with_context(|| format!("Cannot open embedded record '{}'", parent))?;
        }
        Ok(view)
    }
}

impl FromStr for FieldPath {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut segments: Vec<String> = s.split('.').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(format!("invalid field path '{}'", s));
        }
        let field = segments.pop().ok_or_else(|| format!("invalid field path '{}'", s))?;
        Ok(Self {
            parents: segments,
            field,
        })
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for parent in &self.parents {
            write!(f, "{}.", parent)?;
        }
        write!(f, "{}", self.field)
    }
}

/// `NAME=LEN` or `NAME=AxB..` extent of a dynamic field already in the input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtentArg {
    /// Field the extent applies to
    pub path: FieldPath,
    /// One length, or the dimensions of an array shape
    pub dims: Vec<usize>,
}

impl FromStr for ExtentArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, extent) = s
            .split_once('=')
            .ok_or_else(|| format!("expected NAME=LEN or NAME=AxB, got '{}'", s))?;
        let dims = extent
            .split('x')
            .map(|d| {
                d.trim()
                    .parse::<usize>()
                    .map_err(|e| format!("invalid extent '{}': {}", extent, e))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            path: name.parse()?,
            dims,
        })
    }
}

/// Declare the extents of dynamic fields whose bytes are already present
pub fn apply_extents(record: &mut Record, extents: &[ExtentArg]) -> Result<()> {
    for arg in extents {
        let field = arg.path.field();
        let mut view = arg.path.open(record)?;
        let extent = match view.field_kind(field)? {
            FieldKind::Array { .. } => Extent::Shape(arg.dims.clone()),
            _ if arg.dims.len() == 1 => Extent::Len(arg.dims[0]),
            other => bail!(
                "'{}' is a {} field and takes a single length",
                arg.path,
                other.kind_name()
            ),
        };

        debug!("Declaring extent of '{}' as {:?}", arg.path, extent);

        view.resize_with(field, extent, ResizeMode::Reinterpret)
            .with_context(|| format!("Cannot apply extent to '{}'", arg.path))?;
    }
    Ok(())
}

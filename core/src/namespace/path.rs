//! Delimited grain paths and read-only traversal.
//!
//! A key like `pkg:apache` addresses `{"pkg": {"apache": ...}}`. Lists are
//! walked either by integer index (`ipv4:0`) or, for non-numeric segments,
//! by searching the mappings embedded in the list (`disks:sda` finds the
//! first element that is a mapping containing `sda`).

use serde_json::Value;

use crate::types::value::GrainMap;


/// A parsed grain key: an ordered list of segments.
///
/// Empty segments are legal and address the empty-string key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrainPath {
    segments: Vec<String>,
}

impl GrainPath {
    /// Split `key` on `delimiter`. An empty delimiter never splits.
    pub fn parse(key: &str, delimiter: &str) -> GrainPath {
        let segments = if delimiter.is_empty() {
            vec![key.to_string()]
        } else {
            key.split(delimiter).map(str::to_string).collect()
        };
        GrainPath { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The top-level key.
    pub fn head(&self) -> &str {
        // `split` always yields at least one segment.
        self.segments.first().map(String::as_str).unwrap_or("")
    }

    /// Segments below the top-level key.
    pub fn rest(&self) -> &[String] {
        if self.segments.is_empty() {
            &[]
        } else {
            &self.segments[1..]
        }
    }

    /// True if the key addresses something below the top level.
    pub fn is_nested(&self) -> bool {
        self.segments.len() > 1
    }
}


/// Walk `root` along `path`. Returns `None` as soon as a segment is
/// missing or a scalar is reached with segments left over.
pub fn traverse<'a>(root: &'a GrainMap, path: &GrainPath) -> Option<&'a Value> {
    let mut node = root.get(path.head())?;
    for seg in path.rest() {
        node = step(node, seg)?;
    }
    Some(node)
}


/// `traverse` with a caller default, parsing `key` with `delimiter`.
pub fn get(root: &GrainMap, key: &str, default: Value, delimiter: &str) -> Value {
    let path = GrainPath::parse(key, delimiter);
    match traverse(root, &path) {
        Some(v) => v.clone(),
        None => default,
    }
}


// ---------------------------------------------------------------------------
// Internal: one traversal step
// ---------------------------------------------------------------------------

fn step<'a>(node: &'a Value, seg: &str) -> Option<&'a Value> {
    match node {
        Value::Object(map) => map.get(seg),
        Value::Array(items) => match seg.trim().parse::<i64>() {
            Ok(idx) => index(items, idx),
            // Non-numeric segment: first embedded mapping holding the key.
            Err(_) => items
                .iter()
                .filter_map(Value::as_object)
                .find_map(|m| m.get(seg)),
        },
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => None,
    }
}

fn index(items: &[Value], idx: i64) -> Option<&Value> {
    let len = items.len() as i64;
    let pos = if idx < 0 { len + idx } else { idx };
    if pos < 0 || pos >= len {
        None
    } else {
        items.get(pos as usize)
    }
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

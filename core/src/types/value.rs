//! Grain values and the small set of structural helpers built on them.
//!
//! Grains are plain `serde_json::Value`s: scalars, lists, and string-keyed
//! mappings. The helpers here are the structural operations the store
//! needs on them, plus conversion from parsed YAML documents.

use serde_json::{Map, Value};

/// Alias for stored values; `serde_json::Value` covers every grain shape.
pub type GrainValue = Value;

/// A string-keyed grain mapping.
pub type GrainMap = Map<String, Value>;


/// Truthiness used by `has_value`: null, `false`, zero, and empty
/// strings/lists/mappings are all false.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i != 0
            } else if let Some(u) = n.as_u64() {
                u != 0
            } else {
                n.as_f64().map_or(false, |f| f != 0.0)
            }
        }
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}


/// Recursively merge `update` into `dest`.
///
/// Mapping values in `update` merge into the matching mapping in `dest`;
/// anything else replaces the destination entry wholesale. A non-mapping
/// destination entry under a mapping update is replaced by the update.
pub fn deep_merge(dest: &mut GrainMap, update: &GrainMap) {
    for (key, val) in update {
        match (dest.get_mut(key), val) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                deep_merge(existing, incoming);
            }
            _ => {
                dest.insert(key.clone(), val.clone());
            }
        }
    }
}


/// Merge `update` into an arbitrary value.
///
/// A mapping `dest` is merged in place; any other `dest` is replaced by a
/// copy of `update`.
pub fn merge_into(dest: &mut Value, update: &GrainMap) {
    match dest {
        Value::Object(map) => deep_merge(map, update),
        other => *other = Value::Object(update.clone()),
    }
}


/// Build exactly the nested mapping a path describes, with `leaf` at the
/// end: `["a", "b"]` + `v` becomes `{"a": {"b": v}}`. An empty path yields
/// the leaf itself.
pub fn dict_from_path<S: AsRef<str>>(segments: &[S], leaf: Value) -> Value {
    segments.iter().rev().fold(leaf, |inner, seg| {
        let mut map = GrainMap::new();
        map.insert(seg.as_ref().to_string(), inner);
        Value::Object(map)
    })
}


/// Write `leaf` at `segments` below `node`, creating mappings on the way.
///
/// Lists are entered the same way reads enter them: by integer index, or
/// through the first embedded mapping holding the segment. Null stands in
/// for an empty mapping. Returns false, leaving the existing value in
/// place, when a scalar or a list with no matching element blocks the path.
pub fn set_at_path<S: AsRef<str>>(node: &mut Value, segments: &[S], leaf: Value) -> bool {
    let Some((first, rest)) = segments.split_first() else {
        *node = leaf;
        return true;
    };
    let seg = first.as_ref();

    if node.is_null() {
        *node = Value::Object(GrainMap::new());
    }
    match node {
        Value::Object(map) => {
            let child = map.entry(seg.to_string()).or_insert(Value::Null);
            set_at_path(child, rest, leaf)
        }
        Value::Array(items) => match list_child_mut(items, seg) {
            Some(child) => set_at_path(child, rest, leaf),
            None => false,
        },
        _ => false,
    }
}


/// Remove the value at `segments` below `node`, returning it. A path that
/// does not resolve removes nothing.
pub fn remove_at_path<S: AsRef<str>>(node: &mut Value, segments: &[S]) -> Option<Value> {
    let (last, parents) = segments.split_last()?;
    let mut parent = node;
    for seg in parents {
        parent = child_mut(parent, seg.as_ref())?;
    }
    let last = last.as_ref();
    match parent {
        Value::Object(map) => map.remove(last),
        Value::Array(items) => match last.trim().parse::<i64>() {
            Ok(idx) => list_position(items.len(), idx).map(|pos| items.remove(pos)),
            Err(_) => items
                .iter_mut()
                .filter_map(Value::as_object_mut)
                .find(|m| m.contains_key(last))
                .and_then(|m| m.remove(last)),
        },
        _ => None,
    }
}

fn child_mut<'a>(node: &'a mut Value, seg: &str) -> Option<&'a mut Value> {
    match node {
        Value::Object(map) => map.get_mut(seg),
        Value::Array(items) => list_child_mut(items, seg),
        _ => None,
    }
}

fn list_child_mut<'a>(items: &'a mut [Value], seg: &str) -> Option<&'a mut Value> {
    match seg.trim().parse::<i64>() {
        Ok(idx) => list_position(items.len(), idx).and_then(move |pos| items.get_mut(pos)),
        Err(_) => items
            .iter_mut()
            .filter_map(Value::as_object_mut)
            .find_map(|m| m.get_mut(seg)),
    }
}

/// Resolve a possibly negative index against a list of `len` items.
fn list_position(len: usize, idx: i64) -> Option<usize> {
    let len = len as i64;
    let pos = if idx < 0 { len + idx } else { idx };
    if pos < 0 || pos >= len {
        None
    } else {
        Some(pos as usize)
    }
}


/// Convert a parsed YAML document into a grain value.
///
/// Mapping keys that YAML reads as numbers or booleans (`8080: web`) become
/// their string form; tags are dropped. Sequence or mapping keys are an
/// error.
pub fn from_yaml(value: serde_yaml::Value) -> Result<Value, String> {
    let normalized = normalize_keys(value)?;
    serde_json::to_value(normalized).map_err(|e| e.to_string())
}

fn normalize_keys(value: serde_yaml::Value) -> Result<serde_yaml::Value, String> {
    use serde_yaml::Value as Yaml;
    Ok(match value {
        Yaml::Mapping(map) => {
            let mut out = serde_yaml::Mapping::new();
            for (k, v) in map {
                out.insert(Yaml::String(key_string(k)?), normalize_keys(v)?);
            }
            Yaml::Mapping(out)
        }
        Yaml::Sequence(items) => Yaml::Sequence(
            items
                .into_iter()
                .map(normalize_keys)
                .collect::<Result<Vec<_>, String>>()?,
        ),
        Yaml::Tagged(tagged) => normalize_keys((*tagged).value)?,
        other => other,
    })
}

fn key_string(key: serde_yaml::Value) -> Result<String, String> {
    use serde_yaml::Value as Yaml;
    match key {
        Yaml::String(s) => Ok(s),
        Yaml::Number(n) => Ok(n.to_string()),
        Yaml::Bool(b) => Ok(b.to_string()),
        Yaml::Tagged(tagged) => key_string((*tagged).value),
        other => Err(format!("unsupported mapping key {:?}", other)),
    }
}


/// Human-readable form of a value: strings bare, everything else as JSON.
pub fn display_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

//! Display-only redaction of identifying grains.
//!
//! Lookup is by exact top-level grain name. The output is meant for
//! display; it is never written back into the store or the override file.

use serde_json::Value;

use crate::types::value::display_string;

/// Mask character for proportional masking.
pub const MASK_CHAR: char = 'X';

type Redactor = fn(&Value) -> Value;

/// Grain name → redaction function.
const SANITIZERS: &[(&str, Redactor)] = &[
    ("serialnumber", serial_sanitizer),
    ("domain", domainname_sanitizer),
    ("fqdn", fqdn_sanitizer),
    ("id", fqdn_sanitizer),
    ("host", hostname_sanitizer),
    ("localhost", hostname_sanitizer),
    ("nodename", hostname_sanitizer),
];


/// Redact `value` if `name` has a sanitizer, otherwise return it as-is.
pub fn sanitize(name: &str, value: &Value) -> Value {
    match redactor_for(name) {
        Some(f) => f(value),
        None => value.clone(),
    }
}

fn redactor_for(name: &str) -> Option<Redactor> {
    SANITIZERS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, f)| *f)
}


/// Keep the leading three quarters (rounded down) and mask the rest.
pub fn mask_tail(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let keep = chars.len() * 3 / 4;
    let mut out: String = chars[..keep].iter().collect();
    out.extend(std::iter::repeat(MASK_CHAR).take(chars.len() - keep));
    out
}

fn serial_sanitizer(value: &Value) -> Value {
    Value::String(mask_tail(&display_string(value)))
}

fn fqdn_sanitizer(_: &Value) -> Value {
    Value::String("MINION.DOMAINNAME".into())
}

fn hostname_sanitizer(_: &Value) -> Value {
    Value::String("MINION".into())
}

fn domainname_sanitizer(_: &Value) -> Value {
    Value::String("DOMAINNAME".into())
}

use serde_json::Value;

use crate::command::Command;
use crate::types::config::Outputter;
use crate::types::value::from_yaml;


/// Parse CLI arguments into a typed Command enum.
///
/// The first argument is the subcommand (e.g. "get", "setval"). Grain values
/// on the command line are read as YAML, so `[web, db]` is a list and
/// `{pkg: httpd}` a mapping; anything that does not parse stays a string.
/// Optional arguments are given as `name=value`, and `--out <yaml|json>`
/// may appear anywhere.
///
/// Arguments are expected WITHOUT the program name (i.e., `args` should
/// be `["ls"]`, not `["grains", "ls"]`).
pub fn parse_args(args: &[&str]) -> Result<Command, String> {
    let (args, out) = take_out_flag(args)?;
    if args.is_empty() {
        return Err("No command specified. Run 'grains help' for usage.".into());
    }

    match args[0] {
        "get" => parse_get(&args, out),
        "has_value" => parse_has_value(&args),
        "items" => parse_items(&args, out),
        "item" => parse_item(&args, out),
        "ls" => parse_ls(&args, out),
        "setvals" => parse_setvals(&args, out),
        "setval" => parse_setval(&args, out),
        "delval" => parse_delval(&args, out),
        "append" => parse_append(&args, out),
        "remove" => parse_remove(&args, out),
        "filter_by" => parse_filter_by(&args, out),
        "get_or_set_hash" => parse_get_or_set_hash(&args, out),
        "help" => parse_help(&args),
        _ => Err(format!("Unknown command: '{}'", args[0])),
    }
}


// ---------------------------------------------------------------------------
// Sub-parsers
// ---------------------------------------------------------------------------

/// `grains get <key> [default] [default=<v>] [delimiter=<d>]`
fn parse_get(args: &[&str], out: Option<Outputter>) -> Result<Command, String> {
    const USAGE: &str = "Usage: grains get <key> [default=<value>] [delimiter=<d>]";
    let split = split_args(&args[1..], &["default", "delimiter"], USAGE)?;
    if split.positional.is_empty() || split.positional.len() > 2 {
        return Err(USAGE.into());
    }
    let default = match (split.keyword("default"), split.positional.get(1).copied()) {
        (Some(v), _) | (None, Some(v)) => Some(parse_value(v)),
        (None, None) => None,
    };
    Ok(Command::Get {
        key: split.positional[0].into(),
        default,
        delimiter: split.keyword("delimiter").map(String::from),
        out,
    })
}

/// `grains has_value <key>`
fn parse_has_value(args: &[&str]) -> Result<Command, String> {
    if args.len() != 2 {
        return Err("Usage: grains has_value <key>".into());
    }
    Ok(Command::HasValue {
        key: args[1].into(),
    })
}

/// `grains items [sanitize=<bool>]`
fn parse_items(args: &[&str], out: Option<Outputter>) -> Result<Command, String> {
    const USAGE: &str = "Usage: grains items [sanitize=true]";
    let split = split_args(&args[1..], &["sanitize"], USAGE)?;
    if !split.positional.is_empty() {
        return Err(USAGE.into());
    }
    Ok(Command::Items {
        sanitize: split.flag("sanitize")?,
        out,
    })
}

/// `grains item <key>... [sanitize=<bool>]`
fn parse_item(args: &[&str], out: Option<Outputter>) -> Result<Command, String> {
    const USAGE: &str = "Usage: grains item <key> [<key>...] [sanitize=true]";
    let split = split_args(&args[1..], &["sanitize"], USAGE)?;
    if split.positional.is_empty() {
        return Err(USAGE.into());
    }
    Ok(Command::Item {
        keys: split.positional.iter().map(|k| k.to_string()).collect(),
        sanitize: split.flag("sanitize")?,
        out,
    })
}

/// `grains ls`
fn parse_ls(args: &[&str], out: Option<Outputter>) -> Result<Command, String> {
    if args.len() != 1 {
        return Err("Usage: grains ls".into());
    }
    Ok(Command::Ls { out })
}

/// `grains setvals <mapping> [destructive=<bool>]`
fn parse_setvals(args: &[&str], out: Option<Outputter>) -> Result<Command, String> {
    const USAGE: &str = "Usage: grains setvals <mapping> [destructive=true]";
    let split = split_args(&args[1..], &["destructive"], USAGE)?;
    if split.positional.len() != 1 {
        return Err(USAGE.into());
    }
    Ok(Command::Setvals {
        grains: parse_value(split.positional[0]),
        destructive: split.flag("destructive")?,
        out,
    })
}

/// `grains setval <key> <value> [destructive=<bool>]`
fn parse_setval(args: &[&str], out: Option<Outputter>) -> Result<Command, String> {
    const USAGE: &str = "Usage: grains setval <key> <value> [destructive=true]";
    let split = split_args(&args[1..], &["destructive"], USAGE)?;
    if split.positional.len() != 2 {
        return Err(USAGE.into());
    }
    Ok(Command::Setval {
        key: split.positional[0].into(),
        val: parse_value(split.positional[1]),
        destructive: split.flag("destructive")?,
        out,
    })
}

/// `grains delval <key> [destructive=<bool>]`
fn parse_delval(args: &[&str], out: Option<Outputter>) -> Result<Command, String> {
    const USAGE: &str = "Usage: grains delval <key> [destructive=true]";
    let split = split_args(&args[1..], &["destructive"], USAGE)?;
    if split.positional.len() != 1 {
        return Err(USAGE.into());
    }
    Ok(Command::Delval {
        key: split.positional[0].into(),
        destructive: split.flag("destructive")?,
        out,
    })
}

/// `grains append <key> <value> [convert=<bool>]`
fn parse_append(args: &[&str], out: Option<Outputter>) -> Result<Command, String> {
    const USAGE: &str = "Usage: grains append <key> <value> [convert=true]";
    let split = split_args(&args[1..], &["convert"], USAGE)?;
    if split.positional.len() != 2 {
        return Err(USAGE.into());
    }
    Ok(Command::Append {
        key: split.positional[0].into(),
        val: parse_value(split.positional[1]),
        convert: split.flag("convert")?,
        out,
    })
}

/// `grains remove <key> <value>`
fn parse_remove(args: &[&str], out: Option<Outputter>) -> Result<Command, String> {
    if args.len() != 3 {
        return Err("Usage: grains remove <key> <value>".into());
    }
    Ok(Command::Remove {
        key: args[1].into(),
        val: parse_value(args[2]),
        out,
    })
}

/// `grains filter_by <lookup_dict> [grain] [merge] [default]`, each optional
/// argument also accepted as `name=value`.
fn parse_filter_by(args: &[&str], out: Option<Outputter>) -> Result<Command, String> {
    const USAGE: &str =
        "Usage: grains filter_by <lookup_dict> [grain=<key>] [merge=<mapping>] [default=<branch>]";
    let split = split_args(&args[1..], &["grain", "merge", "default"], USAGE)?;
    if split.positional.is_empty() || split.positional.len() > 4 {
        return Err(USAGE.into());
    }
    let nth = |name: &str, idx: usize| -> Option<&str> {
        split.keyword(name).or_else(|| split.positional.get(idx).copied())
    };
    Ok(Command::FilterBy {
        lookup_dict: parse_value(split.positional[0]),
        grain: nth("grain", 1).map(String::from),
        merge: nth("merge", 2).map(parse_value),
        default: nth("default", 3).map(String::from),
        out,
    })
}

/// `grains get_or_set_hash <name> [length=<n>] [chars=<s>]`
fn parse_get_or_set_hash(args: &[&str], out: Option<Outputter>) -> Result<Command, String> {
    const USAGE: &str = "Usage: grains get_or_set_hash <name> [length=<n>] [chars=<chars>]";
    let split = split_args(&args[1..], &["length", "chars"], USAGE)?;
    if split.positional.len() != 1 {
        return Err(USAGE.into());
    }
    let length = match split.keyword("length") {
        Some(raw) => Some(
            raw.parse::<usize>()
                .map_err(|_| format!("Invalid length: '{}'", raw))?,
        ),
        None => None,
    };
    Ok(Command::GetOrSetHash {
        name: split.positional[0].into(),
        length,
        chars: split.keyword("chars").map(String::from),
        out,
    })
}

/// `grains help [topic]`
fn parse_help(args: &[&str]) -> Result<Command, String> {
    let topic = if args.len() > 1 {
        Some(args[1..].join(" "))
    } else {
        None
    };
    Ok(Command::Help { topic })
}


// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Positional arguments plus the recognised `name=value` pairs.
struct SplitArgs<'a> {
    positional: Vec<&'a str>,
    keywords: Vec<(&'a str, &'a str)>,
}

impl<'a> SplitArgs<'a> {
    fn keyword(&self, name: &str) -> Option<&'a str> {
        self.keywords
            .iter()
            .rev()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| *v)
    }

    fn flag(&self, name: &str) -> Result<bool, String> {
        match self.keyword(name) {
            Some(raw) => parse_bool(name, raw),
            None => Ok(false),
        }
    }
}

/// Split `args` into positionals and `name=value` pairs. Only names listed
/// in `allowed` are treated as keywords, so values containing `=` still
/// pass through as positionals. A bare `--flag` is rejected.
fn split_args<'a>(args: &[&'a str], allowed: &[&str], usage: &str) -> Result<SplitArgs<'a>, String> {
    let mut split = SplitArgs { positional: Vec::new(), keywords: Vec::new() };
    for &arg in args {
        if arg.starts_with("--") {
            return Err(format!("Unknown flag: '{}'. {}", arg, usage));
        }
        match arg.split_once('=') {
            Some((name, value)) if allowed.contains(&name) => split.keywords.push((name, value)),
            _ => split.positional.push(arg),
        }
    }
    Ok(split)
}

/// Pull `--out <fmt>` / `--out=<fmt>` out of the argument list.
fn take_out_flag<'a>(args: &[&'a str]) -> Result<(Vec<&'a str>, Option<Outputter>), String> {
    let mut rest = Vec::with_capacity(args.len());
    let mut out = None;
    let mut i = 0;
    while i < args.len() {
        let raw = if args[i] == "--out" {
            i += 1;
            Some(take_arg(args, i, "--out")?)
        } else {
            args[i].strip_prefix("--out=").map(String::from)
        };
        match raw {
            Some(fmt) => {
                out = Some(
                    Outputter::parse(&fmt)
                        .ok_or_else(|| format!("Unknown outputter: '{}' (expected yaml or json)", fmt))?,
                );
            }
            None => rest.push(args[i]),
        }
        i += 1;
    }
    Ok((rest, out))
}

/// Read a command-line value as YAML, falling back to the literal string.
pub fn parse_value(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return Value::String(raw.to_string());
    }
    serde_yaml::from_str::<serde_yaml::Value>(raw)
        .ok()
        .and_then(|doc| from_yaml(doc).ok())
        .unwrap_or_else(|| Value::String(raw.to_string()))
}

/// Parse a boolean flag value.
pub fn parse_bool(name: &str, raw: &str) -> Result<bool, String> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        _ => Err(format!("Invalid value for {}: '{}' (expected true or false)", name, raw)),
    }
}

/// Get the argument at `index`, or return an error mentioning `flag`.
fn take_arg(args: &[&str], index: usize, flag: &str) -> Result<String, String> {
    args.get(index)
        .map(|s| s.to_string())
        .ok_or_else(|| format!("{} requires a value", flag))
}

//! Help system: usage text for every grains command.
//!
//! Two levels of detail:
//!
//! 1. **Overview** (`grains help`): every command with a one-line summary
//! 2. **Command help** (`grains help setval`): detailed usage for one command


/// Generate help text for a given topic.
///
/// - `None` → overview of all commands
/// - `Some("append")` → detailed help for append
pub fn help_text(topic: Option<&str>) -> String {
    match topic {
        None => overview(),
        Some(t) => command_help(t.trim()).unwrap_or_else(|| {
            format!("Unknown help topic: '{}'. Run 'grains help' for a list of commands.", t)
        }),
    }
}


/// Top-level overview of all commands.
fn overview() -> String {
    "\
grains - node-local attribute store

Usage: grains [--out yaml|json] <command> [args...]

Read commands:
  get <key> [default]             Read a value by delimited path (e.g. pkg:apache)
  has_value <key>                 Test whether a path holds a truthy value
  items [sanitize=true]           Show every grain
  item <key>... [sanitize=true]   Show only the named grains
  ls                              List grain names

Write commands:
  setvals <mapping>               Set several grains at once
  setval <key> <value>            Set one grain
  delval <key>                    Null a grain (destructive=true removes it)

List commands:
  append <key> <value>            Append to a list grain
  remove <key> <value>            Remove a value from a list grain

Lookup commands:
  filter_by <lookup_dict>         Pick the table branch matching a grain

Provisioning commands:
  get_or_set_hash <name>          Generate a random value once and keep it

  help [command]                  Show help (this message, or help on a command)

Values are read as YAML: [a, b] is a list, {k: v} a mapping, 80 a number.
Environment: GRAINS_CONFIG_DIR (config directory), GRAINS_LOG (log filter)."
        .to_string()
}


/// Detailed help for a single command.
fn command_help(command: &str) -> Option<String> {
    let text = match command {
        "get" => "\
grains get <key> [default] [default=<value>] [delimiter=<d>]

Walk the grains along <key>, split on the delimiter (':' unless configured
otherwise). Mappings are entered by key, lists by integer index (negative
counts from the end) or by the first embedded mapping holding the segment.
Anything that does not resolve returns <default>, which is '' if omitted.

Examples:
  grains get pkg:apache
  grains get ip_interfaces:eth0:0
  grains get pkg.apache delimiter=.",

        "has_value" => "\
grains has_value <key>

Print true when <key> resolves to a value that is not null, false, zero,
or empty.",

        "items" => "\
grains items [sanitize=true]

Print every grain. With sanitize, identifying grains (host, fqdn, domain,
serialnumber and friends) are masked in the output only.",

        "item" => "\
grains item <key> [<key>...] [sanitize=true]

Print only the named top-level grains. Names that do not exist are skipped.",

        "ls" => "\
grains ls

Print the top-level grain names, sorted.",

        "setvals" => "\
grains setvals <mapping> [destructive=true]

Merge each key of <mapping> into the live grains and the override file.
A null value with destructive=true removes the key from both.

Example:
  grains setvals \"{cheese: [cheddar, brie], roles: [web]}\"",

        "setval" => "\
grains setval <key> <value> [destructive=true]

Set one grain and persist it to the override file. A delimited key is
written inside its top-level grain; a scalar in the way is an error.

Examples:
  grains setval owner ops
  grains setval roles \"[web, db]\"
  grains setval pkg:apache httpd",

        "delval" => "\
grains delval <key> [destructive=true]

Set <key> to null. With destructive=true the key is removed entirely.
Delimited keys work as for setval.",

        "append" => "\
grains append <key> <value> [convert=true]

Append <value> to the list at <key>, creating the list if the grain does
not exist. Fails if <value> is already present. With convert=true a scalar
grain is first turned into a one-element list. Nested keys are written
back under their top-level grain.",

        "remove" => "\
grains remove <key> <value>

Remove the first occurrence of <value> from the list at <key>. Fails if
the grain is not a list or does not contain <value>.",

        "filter_by" => "\
grains filter_by <lookup_dict> [grain=<key>] [merge=<mapping>] [default=<branch>]

Return the branch of <lookup_dict> named by the value of <grain>
(os_family by default). If the grain is missing, or its value has no
branch, the <default> branch ('default') is used. <merge> is deep-merged
over the result. Nothing is written.

Example:
  grains filter_by \"{Debian: {pkg: apache2}, RedHat: {pkg: httpd}}\"",

        "get_or_set_hash" => "\
grains get_or_set_hash <name> [length=<n>] [chars=<chars>]

Return the value at <name>. If it is missing, generate a random string of
<length> characters (8) drawn from <chars> and persist it, so later calls
return the same value. Nested names merge into their top-level grain.

Example:
  grains get_or_set_hash django:SECRET_KEY length=50",

        "help" => "\
grains help [command]

Show the command overview, or detailed help for one command.",

        _ => return None,
    };
    Some(text.to_string())
}

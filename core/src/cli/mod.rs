//! Command-line argument parsing.

mod parse;

pub use parse::{parse_args, parse_bool, parse_value};

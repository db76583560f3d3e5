//! CLI argument parsing using clap

use std::path::PathBuf;

use clap::Parser;

/// Declarative XML build-script interpreter
#[derive(Parser, Debug)]
#[command(name = "anvil")]
#[command(author, version, about, long_about = None)]
#[command(after_help = r#"EXAMPLES:
    # Run the default target of ./build.xml
    anvil

    # Run specific targets from a named build file
    anvil -f ci.xml clean dist

    # Pass properties referenced as ${user} in the build file
    anvil -D user=world greet

    # Show what the build file defines
    anvil --list
    anvil --list -o json
"#)]
pub struct Args {
    /// Targets to run (defaults to the project's default target)
    #[arg()]
    pub targets: Vec<String>,

    /// Build file to interpret
    #[arg(short = 'f', long = "file", default_value = "build.xml")]
    pub build_file: PathBuf,

    /// Define a property as key=value (repeatable)
    #[arg(short = 'D', long = "define", value_name = "KEY=VALUE")]
    pub define: Vec<String>,

    /// List targets instead of running anything
    #[arg(short = 'l', long = "list")]
    pub list: bool,

    /// Output format for --list: text or json
    #[arg(short = 'o', long = "output", default_value = "text")]
    pub output: String,

    /// Fail on undefined ${...} property references
    #[arg(long = "strict-properties")]
    pub strict_properties: bool,

    /// Show verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Split a `key=value` define into its parts.
pub fn parse_define(define: &str) -> Option<(&str, &str)> {
    let (key, value) = define.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defines_split_on_first_equals() {
        assert_eq!(parse_define("user=world"), Some(("user", "world")));
        assert_eq!(parse_define("expr=a=b"), Some(("expr", "a=b")));
        assert_eq!(parse_define("novalue"), None);
        assert_eq!(parse_define("=x"), None);
    }
}

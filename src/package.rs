//! Command-alias config files (`.intcnf`) and packages (`.intpkf`).
//!
//! A config file is a list of `[name]` headers, each followed by the shell
//! lines of its body; blank lines and `#` comments are ignored. A package
//! is the same set of commands behind a small header:
//!
//! ```text
//! INTPKF
//! 1.0
//! <count>
//! [name]
//! <body>
//! [/]
//! ```

use indexmap::IndexMap;
use thiserror::Error;

pub const PACKAGE_MAGIC: &str = "INTPKF";
pub const PACKAGE_VERSION: &str = "1.0";
pub const CONFIG_EXTENSION: &str = ".intcnf";
pub const PACKAGE_EXTENSION: &str = ".intpkf";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PackageError {
    #[error("Invalid package format")]
    InvalidFormat,
}

/// Parses an alias config into `name -> body`, in file order. Commands with
/// an empty body are dropped.
pub fn parse_config(content: &str) -> IndexMap<String, String> {
    let mut commands = IndexMap::new();
    let mut current: Option<String> = None;
    let mut body = String::new();

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if trimmed.starts_with('[') && trimmed.ends_with(']') && trimmed.len() >= 2 {
            flush(&mut commands, current.take(), &mut body);
            current = Some(trimmed[1..trimmed.len() - 1].to_string());
        } else if current.is_some() {
            body.push_str(line);
            body.push('\n');
        }
    }
    flush(&mut commands, current, &mut body);
    commands
}

fn flush(commands: &mut IndexMap<String, String>, name: Option<String>, body: &mut String) {
    let text = body.trim().to_string();
    body.clear();
    if let Some(name) = name {
        if !name.is_empty() && !text.is_empty() {
            commands.insert(name, text);
        }
    }
}

pub fn encode_package(commands: &IndexMap<String, String>) -> String {
    let mut out = format!("{PACKAGE_MAGIC}\n{PACKAGE_VERSION}\n{}\n", commands.len());
    for (name, body) in commands {
        out.push_str(&format!("[{name}]\n{body}\n[/]\n"));
    }
    out
}

/// Reads the commands back out of a package, in order.
pub fn decode_package(content: &str) -> Result<Vec<(String, String)>, PackageError> {
    let lines: Vec<&str> = content.lines().collect();
    if lines.first() != Some(&PACKAGE_MAGIC) {
        return Err(PackageError::InvalidFormat);
    }

    let mut commands = Vec::new();
    let mut current: Option<String> = None;
    let mut body = String::new();
    for line in lines.iter().skip(3) {
        if *line == "[/]" {
            if let Some(name) = current.take() {
                let text = body.trim();
                if !name.is_empty() && !text.is_empty() {
                    commands.push((name, text.to_string()));
                }
            }
            body.clear();
        } else if line.starts_with('[') && line.ends_with(']') && line.len() >= 2 {
            current = Some(line[1..line.len() - 1].to_string());
            body.clear();
        } else if current.is_some() {
            body.push_str(line);
            body.push('\n');
        }
    }
    Ok(commands)
}

/// `tools.intcnf` packs to `tools.intpkf`; any other name gets the package
/// extension appended so the config is never the output.
pub fn package_path_for(config_path: &str) -> String {
    match config_path.strip_suffix(CONFIG_EXTENSION) {
        Some(stem) => format!("{stem}{PACKAGE_EXTENSION}"),
        None => format!("{config_path}{PACKAGE_EXTENSION}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = "# project commands\n[build]\ncargo build\ncargo test\n\n[empty]\n[clean]\n  rm -rf target\n";

    #[test]
    fn parses_config_sections() {
        let commands = parse_config(CONFIG);
        assert_eq!(commands.len(), 2);
        assert_eq!(commands["build"], "cargo build\ncargo test");
        assert_eq!(commands["clean"], "rm -rf target");
        assert!(!commands.contains_key("empty"));
    }

    #[test]
    fn lines_before_first_header_are_ignored() {
        let commands = parse_config("echo orphan\n[a]\necho a\n");
        assert_eq!(commands.len(), 1);
        assert_eq!(commands["a"], "echo a");
    }

    #[test]
    fn package_layout() {
        let commands = parse_config(CONFIG);
        let package = encode_package(&commands);
        assert!(package.starts_with("INTPKF\n1.0\n2\n[build]\n"));
        assert!(package.ends_with("[clean]\nrm -rf target\n[/]\n"));
        assert_eq!(
            decode_package(&package).unwrap(),
            vec![
                ("build".to_string(), "cargo build\ncargo test".to_string()),
                ("clean".to_string(), "rm -rf target".to_string()),
            ]
        );
    }

    #[test]
    fn rejects_missing_magic() {
        assert_eq!(decode_package("[a]\necho\n[/]\n"), Err(PackageError::InvalidFormat));
        assert_eq!(decode_package(""), Err(PackageError::InvalidFormat));
    }

    #[test]
    fn package_path_swaps_extension() {
        assert_eq!(package_path_for("tools.intcnf"), "tools.intpkf");
        assert_eq!(package_path_for("dir/a.intcnf"), "dir/a.intpkf");
    }

    #[test]
    fn package_path_never_matches_config() {
        assert_eq!(package_path_for("tools.txt"), "tools.txt.intpkf");
        assert_eq!(package_path_for("a.intcnf.bak"), "a.intcnf.bak.intpkf");
        assert_eq!(package_path_for(""), ".intpkf");
    }
}

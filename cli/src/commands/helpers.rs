use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Read and deserialize a JSON document from disk.
pub(crate) fn read_json_file<T: DeserializeOwned>(file: &Path) -> Result<T> {
    let input = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read file: {}", file.display()))?;
    serde_json::from_str(&input).with_context(|| format!("Invalid JSON in {}", file.display()))
}

pub(crate) fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

/// Report a "nothing here" condition and exit with status 2.
pub(crate) fn exit_not_found(message: &str, json: bool) -> ! {
    if json {
        println!("{}", json_error(message));
    } else {
        eprintln!("{message}");
    }
    std::process::exit(2);
}

pub(crate) fn check_mark(on: bool) -> &'static str {
    if on { "[x]" } else { "[ ]" }
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world this is long", 10), "hello w...");
    }

    #[test]
    fn test_truncate_utf8() {
        assert_eq!(truncate("Crème fraîche", 10), "Crème f...");
        assert_eq!(truncate("Pâté", 10), "Pâté");
    }

    #[test]
    fn test_json_error() {
        assert_eq!(json_error("No recipes found"), r#"{"error":"No recipes found"}"#);
        assert_eq!(json_error("say \"hi\""), r#"{"error":"say \"hi\""}"#);
    }

    #[test]
    fn test_read_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("order.json");
        std::fs::write(&path, "[3, 1, 2]").unwrap();
        let order: Vec<i64> = read_json_file(&path).unwrap();
        assert_eq!(order, vec![3, 1, 2]);

        std::fs::write(&path, "{oops").unwrap();
        let err = read_json_file::<Vec<i64>>(&path).unwrap_err();
        assert!(err.to_string().starts_with("Invalid JSON in"));
        assert!(read_json_file::<Vec<i64>>(&dir.path().join("missing.json")).is_err());
    }
}

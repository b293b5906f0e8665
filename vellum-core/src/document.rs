//! Document metadata and frontmatter parsing.

use crate::error::{Result, VellumError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Metadata of the document being compiled, filled from frontmatter and
/// mutable through metadata functions (e.g. `.docname`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub locale: Option<String>,
}

static FRONTMATTER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^---\s*\n(.*?)\n---\s*\n?(.*)$").unwrap());

/// Splits a leading YAML frontmatter block off the source.
///
/// Returns the parsed metadata (default when no frontmatter is present) and
/// the remaining document body.
pub fn parse_frontmatter(source: &str) -> Result<(DocumentInfo, &str)> {
    match FRONTMATTER_REGEX.captures(source) {
        Some(captures) => {
            let yaml = captures.get(1).unwrap().as_str();
            let body = captures.get(2).unwrap().as_str();
            let info: DocumentInfo =
                serde_yaml::from_str(yaml).map_err(|e| VellumError::Frontmatter {
                    message: e.to_string(),
                })?;
            Ok((info, body))
        }
        None => Ok((DocumentInfo::default(), source)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frontmatter_split() {
        let source = "---\nname: Notes\nauthors:\n  - R. Author\n---\n# Hello\n";
        let (info, body) = parse_frontmatter(source).unwrap();
        assert_eq!(info.name.as_deref(), Some("Notes"));
        assert_eq!(info.authors, vec!["R. Author".to_string()]);
        assert!(body.starts_with("# Hello"));
    }

    #[test]
    fn test_missing_frontmatter_is_default() {
        let (info, body) = parse_frontmatter("# Just a doc\n").unwrap();
        assert_eq!(info, DocumentInfo::default());
        assert_eq!(body, "# Just a doc\n");
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        let source = "---\nname: [unclosed\n---\nbody";
        assert!(parse_frontmatter(source).is_err());
    }
}

//! Cross-cutting metadata gathered by tree walks.
//!
//! Attributes are populated in two passes: once right after parsing
//! (numbering, labels, presence flags, media, reference resolution) and once
//! after function expansion (table of contents), since expansion can produce
//! new headings.

use serde::Serialize;
use std::fmt;

/// A `[label]: url "title"` definition collected during parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkDefinition {
    pub label: String,
    pub url: String,
    pub title: Option<String>,
}

/// Hierarchical position of a heading, e.g. `1.2.1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionLocation {
    pub levels: Vec<u32>,
}

impl fmt::Display for SectionLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for level in &self.levels {
            if !first {
                write!(f, ".")?;
            }
            write!(f, "{}", level)?;
            first = false;
        }
        Ok(())
    }
}

/// What a positional label counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LabelKind {
    Figure,
    Table,
}

/// A sequential label for a figure or table, scoped to its section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionalLabel {
    pub kind: LabelKind,
    pub label: String,
}

/// An entry of the assembled table of contents.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TocEntry {
    pub text: String,
    pub depth: u8,
    pub anchor: Option<String>,
}

/// Presence flags for content that needs extra renderer support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PresenceFlags {
    pub code: bool,
    pub math: bool,
    pub diagram: bool,
}

/// A referenced media resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaReference {
    pub url: String,
    pub remote: bool,
}

impl MediaReference {
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        let remote = url.starts_with("http://") || url.starts_with("https://");
        Self { url, remote }
    }
}

/// Attributes of the node tree, filled during compilation and handed to the
/// renderer alongside the expanded tree.
#[derive(Debug, Clone, Default)]
pub struct AstAttributes {
    pub link_definitions: Vec<LinkDefinition>,
    pub sections: Vec<SectionLocation>,
    pub labels: Vec<PositionalLabel>,
    pub toc: Vec<TocEntry>,
    pub presence: PresenceFlags,
    pub media: Vec<MediaReference>,
}

impl AstAttributes {
    pub fn link_definition(&self, label: &str) -> Option<&LinkDefinition> {
        self.link_definitions.iter().find(|def| def.label == label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_location_display() {
        let loc = SectionLocation {
            levels: vec![1, 2, 1],
        };
        assert_eq!(loc.to_string(), "1.2.1");
    }

    #[test]
    fn test_media_remote_detection() {
        assert!(MediaReference::new("https://example.com/a.png").remote);
        assert!(!MediaReference::new("img/a.png").remote);
    }
}

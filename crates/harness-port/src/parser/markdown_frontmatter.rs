//! Parser for Markdown command/agent files with optional YAML frontmatter.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_yaml::Value as YamlValue;

use crate::error::{PortError, Result};
use crate::model::{Metadata, SourceDocument};

use super::DocumentParser;

const DELIMITER: &str = "---";

/// Parser for `.md` files.
pub struct MarkdownFrontmatterParser;

#[derive(Debug, Deserialize)]
struct Frontmatter {
    #[serde(default)]
    description: Option<ScalarField>,
    #[serde(default)]
    persona: Option<ScalarField>,
    #[serde(flatten)]
    extra: BTreeMap<String, YamlValue>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ScalarField {
    Text(String),
    Integer(i64),
    Float(f64),
    Flag(bool),
}

impl ScalarField {
    fn into_text(self) -> String {
        match self {
            ScalarField::Text(s) => s,
            ScalarField::Integer(i) => i.to_string(),
            ScalarField::Float(f) => f.to_string(),
            ScalarField::Flag(b) => b.to_string(),
        }
    }
}

fn is_delimiter(line: &str) -> bool {
    line.trim() == DELIMITER
}

impl DocumentParser for MarkdownFrontmatterParser {
    fn supports(path: &Path) -> bool {
        path.extension()
            .and_then(|s| s.to_str())
            .map(|ext| ext == "md")
            .unwrap_or(false)
    }

    fn parse(identity: &str, content: &str) -> Result<SourceDocument> {
        let text = content.strip_prefix('\u{feff}').unwrap_or(content);

        // Byte offsets of each line so the body keeps its original line endings.
        let mut lines = text.split_inclusive('\n');
        let opens_block = lines.next().map(is_delimiter).unwrap_or(false);
        if !opens_block {
            return Ok(SourceDocument {
                identity: identity.to_string(),
                metadata: Metadata::default(),
                body: content.to_string(),
            });
        }

        let mut yaml_buf = String::new();
        let mut offset = text.find('\n').map(|i| i + 1).unwrap_or(text.len());
        let mut body_start = None;
        for line in lines {
            offset += line.len();
            if is_delimiter(line) {
                body_start = Some(offset);
                break;
            }
            yaml_buf.push_str(line);
        }
        let Some(body_start) = body_start else {
            return Err(PortError::parse(
                identity,
                "unterminated metadata block (expected closing '---')",
            ));
        };

        let metadata = parse_metadata(identity, &yaml_buf)?;
        let body = text[body_start..].trim().to_string();

        Ok(SourceDocument {
            identity: identity.to_string(),
            metadata,
            body,
        })
    }
}

fn parse_metadata(identity: &str, yaml: &str) -> Result<Metadata> {
    if yaml.trim().is_empty() {
        return Ok(Metadata::default());
    }
    let fm: Frontmatter = serde_yaml::from_str(yaml)
        .map_err(|e| PortError::parse(identity, format!("invalid YAML frontmatter: {e}")))?;
    Ok(Metadata {
        description: fm.description.map(ScalarField::into_text),
        persona: fm.persona.map(ScalarField::into_text),
        extra: fm.extra,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parse_description_and_body() {
        let content = r#"---
description: Create a comprehensive implementation plan
argument-hint: <feature>
---

# Create Plan

Research $ARGUMENTS
"#;
        let doc = MarkdownFrontmatterParser::parse("create-plan.md", content).expect("parse ok");
        assert_eq!(doc.identity, "create-plan.md");
        assert_eq!(
            doc.metadata.description.as_deref(),
            Some("Create a comprehensive implementation plan")
        );
        assert_eq!(
            doc.metadata.extra.get("argument-hint"),
            Some(&YamlValue::String("<feature>".into()))
        );
        assert_eq!(doc.body, "# Create Plan\n\nResearch $ARGUMENTS");
    }

    #[test]
    fn persona_and_scalar_coercion() {
        let content = "---\npersona: 42\ndescription: true\n---\nbody\n";
        let doc = MarkdownFrontmatterParser::parse("a.md", content).expect("parse ok");
        assert_eq!(doc.metadata.persona.as_deref(), Some("42"));
        assert_eq!(doc.metadata.description.as_deref(), Some("true"));
    }

    #[test]
    fn null_description_is_absent() {
        let content = "---\ndescription:\n---\nbody";
        let doc = MarkdownFrontmatterParser::parse("a.md", content).expect("parse ok");
        assert!(doc.metadata.description.is_none());
        assert_eq!(doc.metadata.description_or_default(), "No description provided.");
    }

    #[test]
    fn empty_block_yields_empty_metadata() {
        let doc = MarkdownFrontmatterParser::parse("a.md", "---\n---\nhello").expect("parse ok");
        assert!(doc.metadata.is_empty());
        assert_eq!(doc.body, "hello");
    }

    #[test]
    fn crlf_line_endings() {
        let content = "---\r\ndescription: Win\r\n---\r\nline one\r\nline two\r\n";
        let doc = MarkdownFrontmatterParser::parse("w.md", content).expect("parse ok");
        assert_eq!(doc.metadata.description.as_deref(), Some("Win"));
        assert_eq!(doc.body, "line one\r\nline two");
    }

    #[test]
    fn unterminated_block_is_parse_error() {
        let err = MarkdownFrontmatterParser::parse("bad.md", "---\ndescription: x\nbody\n")
            .expect_err("must fail");
        assert!(matches!(err, PortError::Parse { ref identity, .. } if identity == "bad.md"));
    }

    #[test]
    fn non_mapping_block_is_parse_error() {
        let err = MarkdownFrontmatterParser::parse("bad.md", "---\n- a\n- b\n---\nbody")
            .expect_err("must fail");
        assert!(matches!(err, PortError::Parse { .. }));
    }

    #[test]
    fn list_description_is_parse_error() {
        let err = MarkdownFrontmatterParser::parse("bad.md", "---\ndescription: [a, b]\n---\n")
            .expect_err("must fail");
        assert!(matches!(err, PortError::Parse { .. }));
    }

    #[test]
    fn delimiter_later_in_file_is_not_a_block() {
        let content = "intro\n---\ndescription: x\n---\n";
        let doc = MarkdownFrontmatterParser::parse("a.md", content).expect("parse ok");
        assert!(doc.metadata.is_empty());
        assert_eq!(doc.body, content);
    }

    #[test]
    fn supports_markdown_only() {
        assert!(MarkdownFrontmatterParser::supports(Path::new("/x/create-plan.md")));
        assert!(!MarkdownFrontmatterParser::supports(Path::new("/x/README.MD")));
        assert!(!MarkdownFrontmatterParser::supports(Path::new("/x/notes.Md")));
        assert!(!MarkdownFrontmatterParser::supports(Path::new("/x/plan.toml")));
        assert!(!MarkdownFrontmatterParser::supports(Path::new("/x/Makefile")));
    }

    proptest! {
        #[test]
        fn documents_without_block_are_unchanged(body in "[A-Za-z#][\\PC\n]{0,200}") {
            let doc = MarkdownFrontmatterParser::parse("p.md", &body).unwrap();
            prop_assert!(doc.metadata.is_empty());
            prop_assert_eq!(doc.body, body);
        }
    }
}

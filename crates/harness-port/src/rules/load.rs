use std::path::Path;

use anyhow::Context as _;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::default::default_raw_rules;
use super::types::{Placement, RuleAction, RuleScope, RuleSet};
use crate::error::{PortError, Result};

/// Rule file layout:
///
/// ```toml
/// include_defaults = true
///
/// [[rules]]
/// kind = "literal"
/// document = "create-plan.md"   # omit for a global rule
/// from = "/execute-plan"
/// to = "/archon:execute-plan"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawRuleFile {
    /// Prepend the built-in rules before the file's own rules.
    #[serde(default)]
    pub include_defaults: bool,
    #[serde(default)]
    pub rules: Vec<RawRule>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RawRule {
    Literal {
        #[serde(default)]
        document: Option<String>,
        from: String,
        to: String,
    },
    Pattern {
        #[serde(default)]
        document: Option<String>,
        pattern: String,
        replace: String,
    },
    Insert {
        #[serde(default)]
        document: Option<String>,
        anchor: String,
        text: String,
        #[serde(default)]
        placement: Placement,
    },
}

pub fn build_rule_set(raw: Vec<RawRule>) -> Result<RuleSet> {
    let mut entries = Vec::with_capacity(raw.len());
    for (index, rule) in raw.into_iter().enumerate() {
        entries.push(build_rule(index, rule)?);
    }
    Ok(RuleSet::new(entries))
}

fn scope_of(document: Option<String>) -> RuleScope {
    match document {
        Some(d) if !d.trim().is_empty() => RuleScope::Document(d.trim().to_string()),
        _ => RuleScope::Global,
    }
}

fn build_rule(index: usize, rule: RawRule) -> Result<(RuleScope, RuleAction)> {
    let invalid = |reason: String| PortError::InvalidRule { index, reason };
    match rule {
        RawRule::Literal { document, from, to } => {
            if from.is_empty() {
                return Err(invalid("literal 'from' must not be empty".to_string()));
            }
            Ok((scope_of(document), RuleAction::Literal { from, to }))
        }
        RawRule::Pattern {
            document,
            pattern,
            replace,
        } => {
            let re = Regex::new(&pattern).map_err(|e| invalid(format!("bad pattern: {e}")))?;
            if re.is_match("") {
                return Err(invalid(format!(
                    "pattern '{pattern}' must not match the empty string"
                )));
            }
            Ok((
                scope_of(document),
                RuleAction::PatternCapture {
                    pattern: re,
                    template: replace,
                },
            ))
        }
        RawRule::Insert {
            document,
            anchor,
            text,
            placement,
        } => {
            if anchor.is_empty() {
                return Err(invalid("insert 'anchor' must not be empty".to_string()));
            }
            Ok((
                scope_of(document),
                RuleAction::ConditionalInsertion {
                    anchor,
                    text,
                    placement,
                },
            ))
        }
    }
}

pub fn from_toml_str(s: &str, context_file: &str) -> anyhow::Result<RuleSet> {
    let raw: RawRuleFile = toml::from_str(s).context("invalid rule file")?;
    let mut all = if raw.include_defaults {
        default_raw_rules(context_file)
    } else {
        Vec::new()
    };
    all.extend(raw.rules);
    Ok(build_rule_set(all)?)
}

pub fn load_from_file(path: &Path, context_file: &str) -> anyhow::Result<RuleSet> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("read rule file {}", path.display()))?;
    from_toml_str(&content, context_file).with_context(|| format!("rules from {}", path.display()))
}

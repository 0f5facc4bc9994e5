//! Rule data: scope, action variants, and the ordered rule set.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Which documents a rule applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleScope {
    Global,
    /// Applies only when the document identity equals this value.
    Document(String),
}

impl RuleScope {
    pub fn matches(&self, identity: &str) -> bool {
        match self {
            RuleScope::Global => true,
            RuleScope::Document(doc) => doc == identity,
        }
    }
}

/// Where conditional insertion places its text relative to the anchor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    Before,
    #[default]
    After,
}

/// A single text transformation.
#[derive(Debug, Clone)]
pub enum RuleAction {
    /// Replace every occurrence of `from` with `to`.
    Literal { from: String, to: String },
    /// Replace every match; `template` may reference captures as `${1}`.
    PatternCapture { pattern: Regex, template: String },
    /// Insert `text` next to the first occurrence of `anchor`, if any.
    ConditionalInsertion {
        anchor: String,
        text: String,
        placement: Placement,
    },
}

impl RuleAction {
    pub fn kind(&self) -> &'static str {
        match self {
            RuleAction::Literal { .. } => "literal",
            RuleAction::PatternCapture { .. } => "pattern",
            RuleAction::ConditionalInsertion { .. } => "insert",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub scope: RuleScope,
    /// Declaration index within the rule set.
    pub order: usize,
    pub action: RuleAction,
}

/// Ordered, read-only rule list built once per run.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Build from actions in declaration order; `order` is assigned here.
    pub fn new(entries: Vec<(RuleScope, RuleAction)>) -> Self {
        let rules = entries
            .into_iter()
            .enumerate()
            .map(|(order, (scope, action))| Rule {
                scope,
                order,
                action,
            })
            .collect();
        Self { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Rules that run for `identity`: matching scoped rules, then globals,
    /// each group in declared order.
    pub fn plan_for<'a>(&'a self, identity: &'a str) -> impl Iterator<Item = &'a Rule> + 'a {
        let scoped = self
            .rules
            .iter()
            .filter(move |r| {
                matches!(&r.scope, RuleScope::Document(_)) && r.scope.matches(identity)
            });
        let global = self
            .rules
            .iter()
            .filter(|r| matches!(r.scope, RuleScope::Global));
        scoped.chain(global)
    }
}

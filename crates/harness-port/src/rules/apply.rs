use super::types::{Placement, Rule, RuleAction, RuleSet};

/// Apply one action to `text`. Non-matching rules return the input unchanged.
pub fn apply_action(action: &RuleAction, text: &str) -> String {
    match action {
        RuleAction::Literal { from, to } => {
            if from.is_empty() {
                return text.to_string();
            }
            text.replace(from.as_str(), to)
        }
        RuleAction::PatternCapture { pattern, template } => {
            pattern.replace_all(text, template.as_str()).into_owned()
        }
        RuleAction::ConditionalInsertion {
            anchor,
            text: insert,
            placement,
        } => {
            if anchor.is_empty() {
                return text.to_string();
            }
            let Some(at) = text.find(anchor.as_str()) else {
                return text.to_string();
            };
            let split = match placement {
                Placement::Before => at,
                Placement::After => at + anchor.len(),
            };
            let mut out = String::with_capacity(text.len() + insert.len());
            out.push_str(&text[..split]);
            out.push_str(insert);
            out.push_str(&text[split..]);
            out
        }
    }
}

impl RuleSet {
    /// Rewrite `body` for the document named `identity`.
    ///
    /// Each rule consumes the previous rule's output, so later rules can
    /// match text introduced by earlier ones.
    pub fn apply(&self, identity: &str, body: &str) -> String {
        self.plan_for(identity)
            .fold(body.to_string(), |text, rule| apply_rule(rule, identity, text))
    }
}

fn apply_rule(rule: &Rule, identity: &str, text: String) -> String {
    let out = apply_action(&rule.action, &text);
    if out != text {
        tracing::trace!(
            "rule #{} ({}) rewrote {}",
            rule.order,
            rule.action.kind(),
            identity
        );
    }
    out
}

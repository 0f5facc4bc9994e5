use super::load::{RawRule, build_rule_set};
use super::types::{Placement, RuleSet};
use crate::error::Result;

/// Namespaced MCP tool references, e.g. `mcp__archon__rag_search`.
pub const MCP_TOOL_PATTERN: &str = r"mcp__([A-Za-z0-9-]+)__(\w+)";
/// Subagent delegation phrasing, e.g. `Use the validator agent`.
pub const AGENT_PATTERN: &str = r"Use the (\w+) agent";

/// Built-in Claude Code → Gemini CLI rules for the Archon command set.
///
/// `context_file` is the aggregated persona document the rewritten prompts
/// point at (normally `GEMINI.md`).
pub fn default_raw_rules(context_file: &str) -> Vec<RawRule> {
    let create_plan = Some("create-plan.md".to_string());
    let execute_plan = Some("execute-plan.md".to_string());

    vec![
        // create-plan: steer research toward the RAG tools and namespace the follow-up command.
        RawRule::Insert {
            document: create_plan.clone(),
            anchor: "- Focus on implementation patterns, best practices, and similar features"
                .to_string(),
            text: "- Use the full suite of Archon's RAG tools including \
                   `rag_get_available_sources`, `rag_list_pages_for_source`, \
                   and `rag_read_full_page` for deep, targeted research\n"
                .to_string(),
            placement: Placement::Before,
        },
        RawRule::Literal {
            document: create_plan,
            from: "/execute-plan".to_string(),
            to: "/archon:execute-plan".to_string(),
        },
        // execute-plan: hand test generation to the validator persona.
        RawRule::Insert {
            document: execute_plan,
            anchor: "After ALL tasks are in \"review\" status:".to_string(),
            text: "\n\n**IMPORTANT: Use the `validator` persona to generate unit tests \
                   for the implemented code.**"
                .to_string(),
            placement: Placement::After,
        },
        RawRule::Literal {
            document: None,
            from: "$ARGUMENTS".to_string(),
            to: "{{args}}".to_string(),
        },
        RawRule::Pattern {
            document: None,
            pattern: MCP_TOOL_PATTERN.to_string(),
            replace: "tools.${1}.${2}".to_string(),
        },
        RawRule::Pattern {
            document: None,
            pattern: AGENT_PATTERN.to_string(),
            replace: format!("Adopt the '${{1}}' persona as defined in {context_file}"),
        },
    ]
}

pub fn default_rules(context_file: &str) -> Result<RuleSet> {
    build_rule_set(default_raw_rules(context_file))
}

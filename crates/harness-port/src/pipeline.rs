//! Conversion pipeline: Loader → Rule Engine → Writer, one document at a time.
//!
//! Responsibilities:
//! - Hold the explicit run configuration (`Settings`).
//! - Enumerate source documents in a stable order.
//! - Convert each document and collect per-document outcomes into a report.
//! - Sequence the collaborators (repository sync, context aggregation) ahead
//!   of the command batch.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Serialize;

use crate::context::{file_identity, write_context};
use crate::error::{PortError, Result};
use crate::model::Artifact;
use crate::parser::{DocumentParser, MarkdownFrontmatterParser};
use crate::rules::{RuleSet, default_rules, load_from_file};
use crate::sync::sync_repository;
use crate::writer::write_artifact;

pub const DEFAULT_REPO_URL: &str = "https://github.com/coleam00/Archon.git";
pub const DEFAULT_REPO_DIR: &str = "archon_source";
pub const DEFAULT_SOURCE_SUBDIR: &str = "archon-example-workflow";
pub const DEFAULT_OUTPUT_DIR: &str = "commands/archon";
pub const DEFAULT_CONTEXT_FILE: &str = "GEMINI.md";
pub const DEFAULT_OUTPUT_EXT: &str = "toml";

/// Run configuration passed into every component.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base directory; relative paths below are resolved against it.
    pub workspace_dir: PathBuf,
    /// Clone-or-pull the source repository before converting.
    pub sync: bool,
    pub repo_url: String,
    pub repo_dir: PathBuf,
    /// Project root inside the checkout (holds `CLAUDE.md` and `.claude/`).
    pub source_dir: PathBuf,
    pub agents_dir: PathBuf,
    pub commands_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Aggregated context file name; also referenced by the persona rule.
    pub context_file: String,
    /// Skip writing the aggregated context file.
    pub skip_context: bool,
    pub output_extension: String,
    /// External rule file; built-in rules are used when unset.
    pub rules_file: Option<PathBuf>,
    /// Abort the batch on the first failing document.
    pub fail_fast: bool,
}

impl Settings {
    /// Default layout rooted at `workspace_dir`.
    pub fn new(workspace_dir: PathBuf) -> Self {
        Self::with_layout(
            workspace_dir,
            Path::new(DEFAULT_REPO_DIR),
            Path::new(DEFAULT_SOURCE_SUBDIR),
        )
    }

    /// Layout for a checkout at `repo_dir` whose project lives in `source_subdir`.
    pub fn with_layout(workspace_dir: PathBuf, repo_dir: &Path, source_subdir: &Path) -> Self {
        let repo_dir = workspace_dir.join(repo_dir);
        let source_dir = repo_dir.join(source_subdir);
        let claude_dir = source_dir.join(".claude");
        Self {
            sync: true,
            repo_url: DEFAULT_REPO_URL.to_string(),
            agents_dir: claude_dir.join("agents"),
            commands_dir: claude_dir.join("commands"),
            output_dir: workspace_dir.join(DEFAULT_OUTPUT_DIR),
            context_file: DEFAULT_CONTEXT_FILE.to_string(),
            skip_context: false,
            output_extension: DEFAULT_OUTPUT_EXT.to_string(),
            rules_file: None,
            fail_fast: false,
            repo_dir,
            source_dir,
            workspace_dir,
        }
    }

    pub fn context_path(&self) -> PathBuf {
        self.workspace_dir.join(&self.context_file)
    }

    /// Bare file name of the context document, as prompts refer to it.
    pub fn context_file_name(&self) -> String {
        Path::new(&self.context_file)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.context_file.clone())
    }
}

/// A document that failed to convert.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentFailure {
    pub path: PathBuf,
    pub message: String,
}

/// Outcome of one command batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub written: Vec<PathBuf>,
    pub failures: Vec<DocumentFailure>,
    /// True when the input directory was missing and nothing ran.
    pub skipped: bool,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Source documents in `dir`, sorted by file name.
pub fn list_documents(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(PortError::MissingDirectory(dir.to_path_buf()));
    }
    let mut out = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| PortError::io(dir, e))? {
        let path = entry.map_err(|e| PortError::io(dir, e))?.path();
        if path.is_file() && MarkdownFrontmatterParser::supports(&path) {
            out.push(path);
        }
    }
    out.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(out)
}

/// Convert one source file and write its artifact. Returns the artifact path.
pub fn convert_document(
    path: &Path,
    rules: &RuleSet,
    out_dir: &Path,
    extension: &str,
) -> Result<PathBuf> {
    let identity = file_identity(path);
    let content = fs::read_to_string(path).map_err(|e| PortError::io(path, e))?;
    let doc = MarkdownFrontmatterParser::parse(&identity, &content)?;
    let prompt = rules.apply(&doc.identity, &doc.body);
    let artifact = Artifact::from_document(&doc, prompt);
    write_artifact(out_dir, &doc.identity, extension, &artifact)
}

/// Convert every command document under `settings.commands_dir`.
pub fn run_batch(settings: &Settings, rules: &RuleSet) -> anyhow::Result<BatchReport> {
    let mut report = BatchReport::default();
    tracing::info!(
        "generating command files in '{}'",
        settings.output_dir.display()
    );

    let paths = match list_documents(&settings.commands_dir) {
        Ok(p) => p,
        Err(e) if e.is_recoverable() => {
            tracing::warn!("commands directory skipped: {}", e);
            report.skipped = true;
            return Ok(report);
        }
        Err(e) => return Err(e.into()),
    };

    for path in paths {
        match convert_document(
            &path,
            rules,
            &settings.output_dir,
            &settings.output_extension,
        ) {
            Ok(dest) => {
                tracing::info!("{} → {}", path.display(), dest.display());
                report.written.push(dest);
            }
            Err(e) if settings.fail_fast => {
                return Err(e).with_context(|| format!("converting {}", path.display()));
            }
            Err(e) => {
                tracing::error!("skipping {}: {}", path.display(), e);
                report.failures.push(DocumentFailure {
                    path,
                    message: e.to_string(),
                });
            }
        }
    }

    tracing::info!(
        "command batch finished: written={}, failed={}",
        report.written.len(),
        report.failures.len()
    );
    Ok(report)
}

/// Rule set for this run: the configured file, else the built-in defaults.
pub fn load_rules(settings: &Settings) -> anyhow::Result<RuleSet> {
    let context_name = settings.context_file_name();
    let rules = match settings.rules_file.as_ref() {
        Some(path) => load_from_file(path, &context_name)?,
        None => default_rules(&context_name)?,
    };
    tracing::info!(
        "loaded {} rule(s) from {}",
        rules.len(),
        settings
            .rules_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "built-in defaults".to_string())
    );
    Ok(rules)
}

/// Full run: sync, aggregate context, convert commands.
pub fn run(settings: &Settings) -> anyhow::Result<BatchReport> {
    // Validate rules before touching the network or the output tree.
    let rules = load_rules(settings)?;

    if settings.sync {
        sync_repository(&settings.repo_url, &settings.repo_dir)?;
    } else {
        tracing::debug!("repository sync disabled");
    }

    if settings.skip_context {
        tracing::debug!("context aggregation disabled");
    } else {
        write_context(settings)?;
    }

    run_batch(settings, &rules)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workspace() -> (tempfile::TempDir, Settings) {
        let root = tempfile::tempdir().unwrap();
        let mut settings = Settings::new(root.path().to_path_buf());
        settings.sync = false;
        fs::create_dir_all(&settings.commands_dir).unwrap();
        fs::create_dir_all(&settings.agents_dir).unwrap();
        (root, settings)
    }

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn default_layout_paths() {
        let s = Settings::new(PathBuf::from("/w"));
        assert_eq!(s.repo_dir, PathBuf::from("/w/archon_source"));
        assert_eq!(
            s.commands_dir,
            PathBuf::from("/w/archon_source/archon-example-workflow/.claude/commands")
        );
        assert_eq!(
            s.agents_dir,
            PathBuf::from("/w/archon_source/archon-example-workflow/.claude/agents")
        );
        assert_eq!(s.output_dir, PathBuf::from("/w/commands/archon"));
        assert_eq!(s.context_path(), PathBuf::from("/w/GEMINI.md"));
    }

    #[test]
    fn context_file_name_strips_directories() {
        let mut s = Settings::new(PathBuf::from("/w"));
        s.context_file = "docs/CONTEXT.md".into();
        assert_eq!(s.context_file_name(), "CONTEXT.md");
    }

    #[test]
    fn list_documents_sorted_markdown_only() {
        let (_root, settings) = workspace();
        let dir = &settings.commands_dir;
        write(dir, "b.md", "b");
        write(dir, "a.md", "a");
        write(dir, "c.txt", "c");
        write(dir, "README.MD", "r");
        fs::create_dir_all(dir.join("nested.md")).unwrap();
        let names: Vec<String> = list_documents(dir)
            .unwrap()
            .iter()
            .map(|p| file_identity(p))
            .collect();
        assert_eq!(names, vec!["a.md", "b.md"]);
    }

    #[test]
    fn missing_commands_dir_skips_batch() {
        let root = tempfile::tempdir().unwrap();
        let settings = Settings::new(root.path().to_path_buf());
        let rules = default_rules("GEMINI.md").unwrap();
        let report = run_batch(&settings, &rules).unwrap();
        assert!(report.skipped);
        assert!(report.written.is_empty());
        assert!(report.is_success());
    }

    #[test]
    fn batch_isolates_failures_by_default() {
        let (_root, settings) = workspace();
        let dir = &settings.commands_dir;
        write(dir, "a-good.md", "---\ndescription: Good\n---\nRun $ARGUMENTS");
        write(dir, "b-bad.md", "---\ndescription: never closed\n");
        write(dir, "c-plain.md", "Use the validator agent");

        let rules = default_rules("GEMINI.md").unwrap();
        let report = run_batch(&settings, &rules).unwrap();
        assert_eq!(report.written.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].path.ends_with("b-bad.md"));
        assert!(!report.is_success());

        let good = fs::read_to_string(settings.output_dir.join("a-good.toml")).unwrap();
        assert_eq!(
            good,
            "description = \"\"\"Good\"\"\"\n\nprompt = \"\"\"\nRun {{args}}\n\"\"\"\n"
        );
        let plain = fs::read_to_string(settings.output_dir.join("c-plain.toml")).unwrap();
        assert!(plain.starts_with("description = \"\"\"No description provided.\"\"\""));
        assert!(plain.contains("Adopt the 'validator' persona as defined in GEMINI.md"));
        assert!(!settings.output_dir.join("b-bad.toml").exists());
    }

    #[test]
    fn fail_fast_aborts_on_first_error() {
        let (_root, mut settings) = workspace();
        settings.fail_fast = true;
        let dir = &settings.commands_dir;
        write(dir, "a-bad.md", "---\nunterminated\n");
        write(dir, "b-good.md", "fine");

        let rules = default_rules("GEMINI.md").unwrap();
        let err = run_batch(&settings, &rules).unwrap_err();
        assert!(format!("{err:#}").contains("a-bad.md"));
        assert!(!settings.output_dir.join("b-good.toml").exists());
    }

    #[test]
    fn scoped_rules_follow_document_identity() {
        let (_root, settings) = workspace();
        let dir = &settings.commands_dir;
        let body = "After ALL tasks are in \"review\" status:\nDone.";
        write(dir, "execute-plan.md", body);
        write(dir, "other.md", body);

        let rules = default_rules("GEMINI.md").unwrap();
        run_batch(&settings, &rules).unwrap();
        let scoped = fs::read_to_string(settings.output_dir.join("execute-plan.toml")).unwrap();
        let other = fs::read_to_string(settings.output_dir.join("other.toml")).unwrap();
        assert!(scoped.contains("Use the `validator` persona to generate unit tests"));
        assert!(!other.contains("validator"));
    }

    #[test]
    fn run_without_sync_writes_context_and_commands() {
        let (root, settings) = workspace();
        write(&settings.source_dir, "CLAUDE.md", "Project guide");
        write(
            &settings.agents_dir,
            "validator.md",
            "---\ndescription: QA\n---\nYou validate.",
        );
        write(
            &settings.commands_dir,
            "create-plan.md",
            "---\ndescription: Plan\n---\n- Focus on implementation patterns, best practices, and similar features\nNext: /execute-plan with mcp__archon__rag_search",
        );

        let report = run(&settings).unwrap();
        assert_eq!(report.written.len(), 1);

        let ctx = fs::read_to_string(root.path().join("GEMINI.md")).unwrap();
        assert!(ctx.contains("# Persona: validator"));
        assert!(ctx.contains("Project guide"));

        let plan = fs::read_to_string(settings.output_dir.join("create-plan.toml")).unwrap();
        assert!(plan.contains("- Use the full suite of Archon's RAG tools"));
        assert!(plan.contains("/archon:execute-plan"));
        assert!(plan.contains("tools.archon.rag_search"));
    }

    #[test]
    fn run_rejects_bad_rule_file_before_writing() {
        let (root, mut settings) = workspace();
        let rules_path = root.path().join("rules.toml");
        fs::write(
            &rules_path,
            "[[rules]]\nkind = \"pattern\"\npattern = \"(\"\nreplace = \"x\"\n",
        )
        .unwrap();
        settings.rules_file = Some(rules_path);
        write(&settings.commands_dir, "a.md", "x");

        assert!(run(&settings).is_err());
        assert!(!settings.context_path().exists());
        assert!(!settings.output_dir.exists());
    }
}

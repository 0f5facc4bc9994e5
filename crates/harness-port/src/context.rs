//! Aggregated persona context (`GEMINI.md`).
//!
//! Concatenates the source project's `CLAUDE.md` and every agent definition
//! into a single document that rewritten command prompts refer to by name.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::error::PortError;
use crate::model::identity_stem;
use crate::parser::{DocumentParser, MarkdownFrontmatterParser};
use crate::pipeline::{Settings, list_documents};
use crate::writer::atomic_write;

const PROJECT_CONTEXT_FILE: &str = "CLAUDE.md";

fn display_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

fn push_block(out: &mut String, origin: &str, heading: Option<&str>, body: &str) {
    // Infallible for String.
    let _ = writeln!(out, "--- Context from: {origin} ---");
    if let Some(h) = heading {
        let _ = write!(out, "{h}\n\n");
    }
    out.push_str(body);
    out.push_str("\n--- End of Context ---\n\n");
}

/// Build the aggregated context document text.
pub fn render_context(
    source_dir: &Path,
    agents_dir: &Path,
    display_root: &Path,
) -> anyhow::Result<String> {
    let mut out = String::new();

    let project_ctx = source_dir.join(PROJECT_CONTEXT_FILE);
    if project_ctx.is_file() {
        let content = std::fs::read_to_string(&project_ctx)
            .with_context(|| format!("read {}", project_ctx.display()))?;
        push_block(&mut out, &display_path(&project_ctx, display_root), None, &content);
    } else {
        tracing::warn!("'{}' not found", project_ctx.display());
    }

    match list_documents(agents_dir) {
        Ok(paths) => {
            for path in paths {
                let identity = file_identity(&path);
                let content = std::fs::read_to_string(&path)
                    .with_context(|| format!("read {}", path.display()))?;
                let doc = MarkdownFrontmatterParser::parse(&identity, &content)?;
                let persona = doc
                    .metadata
                    .persona
                    .as_deref()
                    .filter(|p| !p.trim().is_empty())
                    .unwrap_or_else(|| identity_stem(&identity));
                let heading = format!("# Persona: {persona}");
                push_block(
                    &mut out,
                    &display_path(&path, display_root),
                    Some(&heading),
                    &doc.body,
                );
                tracing::debug!("added persona '{}' from {}", persona, path.display());
            }
        }
        Err(PortError::MissingDirectory(dir)) => {
            tracing::warn!("agent directory '{}' not found", dir.display());
        }
        Err(e) => return Err(e.into()),
    }

    Ok(out)
}

/// Render and write the context file named in `settings`.
pub fn write_context(settings: &Settings) -> anyhow::Result<PathBuf> {
    let dest = settings.context_path();
    tracing::info!("generating '{}'", dest.display());
    let text = render_context(
        &settings.source_dir,
        &settings.agents_dir,
        &settings.workspace_dir,
    )?;
    atomic_write(&dest, text.as_bytes())?;
    tracing::info!("'{}' generated", dest.display());
    Ok(dest)
}

pub(crate) fn file_identity(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

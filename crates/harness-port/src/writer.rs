//! Artifact rendering and persistence.
//!
//! Values are wrapped in TOML multi-line basic strings (`"""`). Body text is
//! written verbatim: a prompt that itself contains `"""` or backslash escapes
//! produces a file the target harness may reject. This mirrors the source
//! tool and is not corrected here.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use crate::error::{PortError, Result};
use crate::model::{Artifact, artifact_file_name};

/// Render an artifact in the target command format.
pub fn render_artifact(artifact: &Artifact) -> String {
    format!(
        "description = \"\"\"{}\"\"\"\n\nprompt = \"\"\"\n{}\n\"\"\"\n",
        artifact.description, artifact.prompt
    )
}

/// True when `text` would terminate the surrounding block quote early.
pub fn has_delimiter_collision(text: &str) -> bool {
    text.contains("\"\"\"")
}

/// Write `artifact` for the document `identity` into `out_dir`, replacing any
/// existing file of the same name. Returns the written path.
pub fn write_artifact(
    out_dir: &Path,
    identity: &str,
    extension: &str,
    artifact: &Artifact,
) -> Result<PathBuf> {
    let dest = out_dir.join(artifact_file_name(identity, extension));
    if has_delimiter_collision(&artifact.prompt) || has_delimiter_collision(&artifact.description)
    {
        tracing::warn!(
            "{} contains '\"\"\"'; {} will not round-trip as TOML",
            identity,
            dest.display()
        );
    }
    atomic_write(&dest, render_artifact(artifact).as_bytes())?;
    tracing::debug!("wrote {}", dest.display());
    Ok(dest)
}

/// Write via a temp file in the destination directory, then rename over `path`.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent).map_err(|e| PortError::io(&parent, e))?;

    let mut tmp = tempfile::NamedTempFile::new_in(&parent).map_err(|e| PortError::io(&parent, e))?;
    tmp.write_all(content).map_err(|e| PortError::io(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| PortError::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| PortError::io(path, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct CommandFile {
        description: String,
        prompt: String,
    }

    fn artifact(description: &str, prompt: &str) -> Artifact {
        Artifact {
            description: description.into(),
            prompt: prompt.into(),
        }
    }

    #[test]
    fn render_exact_layout() {
        let out = render_artifact(&artifact("No description provided.", "line 1\nline 2"));
        assert_eq!(
            out,
            "description = \"\"\"No description provided.\"\"\"\n\nprompt = \"\"\"\nline 1\nline 2\n\"\"\"\n"
        );
    }

    #[test]
    fn rendered_file_is_valid_toml() {
        let rendered = render_artifact(&artifact(
            "Plan \"carefully\" first",
            "Say \"hi\" to {{args}}\nthen use tools.archon.rag_search",
        ));
        let parsed: CommandFile = toml::from_str(&rendered).expect("valid toml");
        assert_eq!(parsed.description, "Plan \"carefully\" first");
        // Newline right after the opening delimiter is trimmed by TOML.
        assert_eq!(
            parsed.prompt,
            "Say \"hi\" to {{args}}\nthen use tools.archon.rag_search\n"
        );
    }

    #[test]
    fn delimiter_collision_is_detected_not_escaped() {
        let a = artifact("d", "before \"\"\" after");
        assert!(has_delimiter_collision(&a.prompt));
        assert!(render_artifact(&a).contains("before \"\"\" after"));
    }

    #[test]
    fn write_creates_dir_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("commands").join("archon");

        let first = write_artifact(&out_dir, "primer.md", "toml", &artifact("one", "a")).unwrap();
        assert_eq!(first, out_dir.join("primer.toml"));
        let second = write_artifact(&out_dir, "primer.md", "toml", &artifact("two", "b")).unwrap();
        assert_eq!(first, second);

        let content = std::fs::read_to_string(&second).unwrap();
        assert!(content.starts_with("description = \"\"\"two\"\"\""));
        let entries = std::fs::read_dir(&out_dir).unwrap().count();
        assert_eq!(entries, 1, "temp files must not be left behind");
    }
}

use std::collections::BTreeMap;

use serde::Serialize;
use serde_yaml::Value as YamlValue;

/// Placeholder used when a document carries no usable `description`.
pub const DEFAULT_DESCRIPTION: &str = "No description provided.";

/// Typed view of a document's metadata block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    /// Short summary shown by the target harness.
    pub description: Option<String>,
    /// Persona display name; only read by context aggregation.
    pub persona: Option<String>,
    /// Remaining keys, kept verbatim.
    pub extra: BTreeMap<String, YamlValue>,
}

impl Metadata {
    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.persona.is_none() && self.extra.is_empty()
    }

    /// Description to emit, never empty.
    pub fn description_or_default(&self) -> &str {
        self.description
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or(DEFAULT_DESCRIPTION)
    }
}

/// One parsed input file.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDocument {
    /// File name, e.g. `create-plan.md`. Scoped rules match on this.
    pub identity: String,
    pub metadata: Metadata,
    pub body: String,
}

/// Output record for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub description: String,
    pub prompt: String,
}

impl Artifact {
    pub fn from_document(doc: &SourceDocument, prompt: String) -> Self {
        Self {
            description: doc.metadata.description_or_default().to_string(),
            prompt,
        }
    }
}

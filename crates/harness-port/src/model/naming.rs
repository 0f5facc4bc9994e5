//! Identity and output-name helpers.

use std::path::Path;

/// File stem of a document identity (`create-plan.md` -> `create-plan`).
pub fn identity_stem(identity: &str) -> &str {
    Path::new(identity)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(identity)
}

/// Output file name: same base name, target extension.
pub fn artifact_file_name(identity: &str, extension: &str) -> String {
    let ext = extension.trim_start_matches('.');
    format!("{}.{}", identity_stem(identity), ext)
}

use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
pub struct UserConfig {
    pub logging: Option<LoggingCfg>,
    pub source: Option<SourceCfg>,
    pub output: Option<OutputCfg>,
    pub rules: Option<RulesCfg>,
    pub batch: Option<BatchCfg>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoggingCfg {
    pub to_file: Option<bool>,
    pub dir: Option<String>,
    pub json: Option<bool>,
    pub compact: Option<bool>,
    pub pretty: Option<bool>,
    pub level: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SourceCfg {
    pub sync: Option<bool>,
    pub repo_url: Option<String>,
    pub repo_dir: Option<String>,
    pub subdir: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OutputCfg {
    pub dir: Option<String>,
    pub context_file: Option<String>,
    pub skip_context: Option<bool>,
    pub extension: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RulesCfg {
    pub file: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BatchCfg {
    pub fail_fast: Option<bool>,
    pub report_json: Option<bool>,
}

pub fn load_user_config(port_home: &Path) -> anyhow::Result<Option<UserConfig>> {
    let path = port_home.join("config.toml");
    if !path.exists() {
        return Ok(None);
    }
    let s = std::fs::read_to_string(&path)?;
    let cfg: UserConfig = toml::from_str(&s)?;
    Ok(Some(cfg))
}

pub fn expand_home(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/")
        && let Ok(home) = std::env::var("HOME")
    {
        return PathBuf::from(home).join(stripped);
    }
    PathBuf::from(path)
}

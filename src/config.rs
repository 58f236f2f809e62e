use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::engine::MergeOptions;

pub const CONFIG_FILE: &str = ".nessus-merge.toml";

/// nessus-merge configuration (loaded from .nessus-merge.toml)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MergeConfig {
    #[serde(default)]
    pub input: InputConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// File extensions to merge
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// File names to leave out
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl Default for InputConfig {
    fn default() -> Self {
        InputConfig {
            extensions: default_extensions(),
            exclude: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Spaces per indentation level
    #[serde(default = "default_indent")]
    pub indent: usize,

    /// fsync after every append
    #[serde(default)]
    pub sync: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            indent: default_indent(),
            sync: false,
        }
    }
}

fn default_extensions() -> Vec<String> {
    vec!["nessus".to_string(), "xml".to_string()]
}

fn default_indent() -> usize {
    2
}

impl MergeConfig {
    /// Try to load .nessus-merge.toml from the given directory or its parents
    pub fn load(dir: &Path) -> Option<Self> {
        let config_path = find_config_file(dir)?;
        debug!("Found config: {}", config_path.display());

        match std::fs::read_to_string(&config_path) {
            Ok(content) => match toml::from_str::<MergeConfig>(&content) {
                Ok(config) => {
                    info!("Loaded config from {}", config_path.display());
                    Some(config)
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}", config_path.display(), e);
                    None
                }
            },
            Err(e) => {
                debug!("Could not read {}: {}", config_path.display(), e);
                None
            }
        }
    }

    /// Fold the config into run options
    pub fn apply(&self, options: &mut MergeOptions) {
        if !self.input.extensions.is_empty() {
            options.extensions = self.input.extensions.clone();
        }
        options.exclude.extend(self.input.exclude.iter().cloned());
        options.indent = self.output.indent;
        options.sync = self.output.sync;
    }
}

/// Walk up from the input directory to find .nessus-merge.toml
fn find_config_file(start: &Path) -> Option<std::path::PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let config = current.join(CONFIG_FILE);
        if config.exists() {
            return Some(config);
        }
        if !current.pop() {
            return None;
        }
    }
}

const DEFAULT_CONFIG: &str = r#"# nessus-merge configuration

[input]
# Extensions of the reports to merge
extensions = ["nessus", "xml"]

# File names to leave out of the merge
# exclude = ["old-scan.nessus"]

[output]
# Spaces per indentation level in copied blocks (0 = no indentation)
indent = 2

# fsync the output after every appended block
# sync = false
"#;

/// Create a default .nessus-merge.toml in `dir`. Returns false if one exists.
pub fn init_config(dir: &Path) -> Result<bool> {
    let config_path = dir.join(CONFIG_FILE);

    if config_path.exists() {
        return Ok(false);
    }

    std::fs::write(&config_path, DEFAULT_CONFIG)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_parses_to_defaults() {
        let config: MergeConfig = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.input.extensions, vec!["nessus", "xml"]);
        assert!(config.input.exclude.is_empty());
        assert_eq!(config.output.indent, 2);
        assert!(!config.output.sync);
    }

    #[test]
    fn config_is_found_in_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "[input]\nexclude = [\"skip.nessus\"]\n[output]\nindent = 4\n",
        )
        .unwrap();
        let scans = dir.path().join("scans");
        std::fs::create_dir(&scans).unwrap();

        let config = MergeConfig::load(&scans).unwrap();
        let mut options = MergeOptions::default();
        config.apply(&mut options);
        assert_eq!(options.exclude, vec!["skip.nessus"]);
        assert_eq!(options.indent, 4);
        assert_eq!(options.extensions, vec!["nessus", "xml"]);
    }

    #[test]
    fn broken_config_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[input\n").unwrap();
        assert!(MergeConfig::load(dir.path()).is_none());
    }

    #[test]
    fn init_does_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        assert!(init_config(dir.path()).unwrap());
        std::fs::write(dir.path().join(CONFIG_FILE), "# mine\n").unwrap();
        assert!(!init_config(dir.path()).unwrap());
        assert_eq!(std::fs::read_to_string(dir.path().join(CONFIG_FILE)).unwrap(), "# mine\n");
    }
}

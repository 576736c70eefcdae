//! Sectioned `key = value` settings files.
//!
//! Settings files group string values under bracketed section headers:
//!
//! ```text
//! # Delaney solubility, trained with molecular attributes
//! [IO]
//! model_fpath = models/delaney/model
//! use_existing_weights = true
//!
//! [ARCHITECTURE]
//! embedding_size = 512
//! depth: 5
//!
//! [TRAINING]
//! batch_size = 1
//!
//! [DATA]
//! data_fpath = data/delaney.json
//! molecular_attributes = true
//! ```
//!
//! Parsing is delegated to `configparser`, which follows Python's
//! `configparser` rules:
//! - section names are case-sensitive, keys are lower-cased here
//! - `key = value` or `key: value`; `#` and `;` start comment lines
//! - indented lines continue the previous value
//! - `[DEFAULT]` values are visible from every other section
//!
//! Values stay strings here; typed conversion lives in [`crate::settings`].

use crate::errors::{QsarError, Result};
use configparser::ini::Ini;
use std::collections::BTreeMap;
use std::path::Path;

/// Name of the fallback section.
pub const DEFAULT_SECTION: &str = "DEFAULT";

/// Parsed settings file: section name → (key → raw string value).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    sections: BTreeMap<String, BTreeMap<String, String>>,
    defaults: BTreeMap<String, String>,
}

impl ConfigFile {
    /// Looks up `key` in `section`, falling back to `[DEFAULT]`.
    ///
    /// Returns `None` when the section does not exist, even if the key is
    /// present under `[DEFAULT]`.
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        let values = self.sections.get(section)?;
        let key = key.to_ascii_lowercase();
        values
            .get(&key)
            .or_else(|| self.defaults.get(&key))
            .map(String::as_str)
    }

    /// Keys visible from `section` (own keys plus defaults), sorted.
    pub fn keys(&self, section: &str) -> Vec<&str> {
        let Some(values) = self.sections.get(section) else {
            return Vec::new();
        };
        let mut keys: Vec<&str> = values
            .keys()
            .chain(self.defaults.keys())
            .map(String::as_str)
            .collect();
        keys.sort_unstable();
        keys.dedup();
        keys
    }
}

/// Reads and parses a settings file.
///
/// ## Errors
/// - `QsarError::ConfigRead`: file missing/unreadable or malformed
pub fn read_config<P: AsRef<Path>>(path: P) -> Result<ConfigFile> {
    let path_ref = path.as_ref();
    let content = std::fs::read_to_string(path_ref)
        .map_err(|e| QsarError::config_read(path_ref, e.to_string()))?;

    let config = parse_config_str(&content).map_err(|message| QsarError::config_read(path_ref, message))?;

    log::debug!(
        "Parsed {} config sections from {}",
        config.sections.len(),
        path_ref.display()
    );
    Ok(config)
}

/// Parses settings text.
///
/// Keys without a value, empty keys, and keys that collide once
/// lower-cased are rejected.
pub fn parse_config_str(content: &str) -> std::result::Result<ConfigFile, String> {
    let mut ini = Ini::new_cs();
    ini.set_default_section(DEFAULT_SECTION);
    ini.set_multiline(true);
    let parsed = ini.read(content.to_string())?;

    let mut config = ConfigFile::default();
    for (section, entries) in parsed {
        let mut values = BTreeMap::new();
        for (key, value) in entries {
            let folded = key.trim().to_ascii_lowercase();
            if folded.is_empty() {
                return Err(format!("section '{}': missing key before delimiter", section));
            }
            let value = value.ok_or_else(|| {
                format!("section '{}': expected 'key = value', got '{}'", section, key)
            })?;
            if values.insert(folded.clone(), value).is_some() {
                return Err(format!(
                    "option '{}' in section '{}' already exists",
                    folded, section
                ));
            }
        }

        if section == DEFAULT_SECTION {
            config.defaults = values;
        } else {
            config.sections.insert(section, values);
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_cfg(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    #[test]
    fn test_parse_sections_and_delimiters() {
        let content = "\
# comment
[IO]
model_fpath = models/delaney
Use_Existing_Weights: true

[ARCHITECTURE]
depth = 3
";
        let config = parse_config_str(content).unwrap();

        assert_eq!(config.get("IO", "model_fpath"), Some("models/delaney"));
        assert_eq!(config.get("IO", "use_existing_weights"), Some("true"));
        assert_eq!(config.get("IO", "USE_EXISTING_WEIGHTS"), Some("true"));
        assert_eq!(config.get("ARCHITECTURE", "depth"), Some("3"));
        assert_eq!(config.get("TRAINING", "batch_size"), None);
        assert_eq!(config.get("io", "model_fpath"), None);
    }

    #[test]
    fn test_default_section_fallback() {
        let content = "\
[DEFAULT]
batch_size = 4

[TRAINING]
nb_epoch = 10

[DATA]
batch_size = 8
";
        let config = parse_config_str(content).unwrap();

        assert_eq!(config.get("TRAINING", "batch_size"), Some("4"));
        assert_eq!(config.get("DATA", "batch_size"), Some("8"));
        assert_eq!(config.get("IO", "batch_size"), None);
        assert_eq!(config.keys("TRAINING"), vec!["batch_size", "nb_epoch"]);
        assert!(config.keys("IO").is_empty());
    }

    #[test]
    fn test_continuation_lines() {
        let content = "[DATA]\nnote = first\n  second\nnext = 1\n";
        let config = parse_config_str(content).unwrap();
        let note = config.get("DATA", "note").unwrap();
        assert!(note.starts_with("first"), "{}", note);
        assert!(note.contains("second"), "{}", note);
        assert_eq!(config.get("DATA", "next"), Some("1"));
    }

    #[test]
    fn test_rejects_malformed_input() {
        assert!(parse_config_str("[IO]\njust words\n").is_err());

        let err = parse_config_str("[IO]\na = 1\nA = 2\n").unwrap_err();
        assert!(err.contains("already exists"), "{}", err);
    }

    #[test]
    fn test_read_config_file() {
        let file = create_temp_cfg("[IO]\nmodel_fpath = out/model\n");
        let config = read_config(file.path()).unwrap();
        assert_eq!(config.get("IO", "model_fpath"), Some("out/model"));
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_config("/nonexistent/settings.cfg").unwrap_err();
        assert!(matches!(err, QsarError::ConfigRead { .. }));
        assert!(err.to_string().contains("settings.cfg"));
    }
}

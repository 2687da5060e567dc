use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use toml_edit::DocumentMut;

use crate::model::CascadeConfig;

pub const CONFIG_FILE: &str = "cascade.toml";
pub const CONFIG_ENV: &str = "CASCADE_CONFIG";

/// Error type for config file operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config document: {0}")]
    Document(#[from] toml_edit::TomlError),
    #[error("unknown config key: {0}")]
    UnknownKey(String),
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
    #[error("{} already exists (use --force to overwrite)", .0.display())]
    AlreadyExists(PathBuf),
    #[error("no config directory on this platform; pass --config")]
    NoConfigDir,
}

/// Where the config lives: `--config`, then `$CASCADE_CONFIG`, then the
/// platform config directory.
pub fn resolve_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Ok(path) = std::env::var(CONFIG_ENV)
        && !path.trim().is_empty()
    {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|dir| dir.join("cascade").join(CONFIG_FILE))
}

/// Load the config. A missing file means defaults.
pub fn load(explicit: Option<&Path>) -> Result<CascadeConfig, ConfigError> {
    match resolve_path(explicit) {
        Some(path) if path.exists() => load_from(&path),
        Some(path) if explicit.is_some() => Err(ConfigError::Read {
            source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
            path,
        }),
        _ => Ok(CascadeConfig::default()),
    }
}

pub fn load_from(path: &Path) -> Result<CascadeConfig, ConfigError> {
    let text = fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    let config: CascadeConfig = toml::from_str(&text)?;
    validate(&config)?;
    Ok(config)
}

/// Checks serde cannot express. A zero history cap would silently disable undo.
fn validate(config: &CascadeConfig) -> Result<(), ConfigError> {
    if config.history.cap == 0 {
        return Err(ConfigError::InvalidValue {
            key: "history.cap".to_string(),
            message: "must be at least 1".to_string(),
        });
    }
    Ok(())
}

/// Read the config along with its toml_edit document for in-place editing.
pub fn read_document(path: &Path) -> Result<(CascadeConfig, DocumentMut), ConfigError> {
    let text = fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    let config: CascadeConfig = toml::from_str(&text)?;
    validate(&config)?;
    let doc: DocumentMut = text.parse()?;
    Ok((config, doc))
}

/// Write the document back, preserving formatting and comments.
pub fn write_document(path: &Path, doc: &DocumentMut) -> Result<(), ConfigError> {
    atomic_write(path, doc.to_string().as_bytes()).map_err(|e| ConfigError::Write {
        path: path.to_path_buf(),
        source: e,
    })
}

fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// A commented config with every default spelled out.
pub fn default_document() -> String {
    let d = CascadeConfig::default();
    format!(
        r##"# cascade configuration

[service]
# Base URL of the scheduling service API
base_url = "{base_url}"
timeout_secs = {timeout}

[history]
# Undoable operations kept per session; oldest are dropped first
cap = {cap}

[view]
poll_interval_ms = {poll}
column_spacing = {col:?}
row_spacing = {row:?}

# [view.colors]
# critical = "#FF4444"

[logging]
# EnvFilter directive; RUST_LOG wins when set
level = "{level}"
file = {file}
# directory = "/tmp/cascade"
"##,
        base_url = d.service.base_url,
        timeout = d.service.timeout_secs,
        cap = d.history.cap,
        poll = d.view.poll_interval_ms,
        col = d.view.column_spacing,
        row = d.view.row_spacing,
        level = d.logging.level,
        file = d.logging.file,
    )
}

/// Write the default config to `path`.
pub fn init(path: &Path, force: bool) -> Result<(), ConfigError> {
    if path.exists() && !force {
        return Err(ConfigError::AlreadyExists(path.to_path_buf()));
    }
    atomic_write(path, default_document().as_bytes()).map_err(|e| ConfigError::Write {
        path: path.to_path_buf(),
        source: e,
    })
}

#[derive(Debug, Clone, Copy)]
enum ValueKind {
    Str,
    Int,
    Float,
    Bool,
}

const KEYS: &[(&str, ValueKind)] = &[
    ("service.base_url", ValueKind::Str),
    ("service.timeout_secs", ValueKind::Int),
    ("history.cap", ValueKind::Int),
    ("view.poll_interval_ms", ValueKind::Int),
    ("view.column_spacing", ValueKind::Float),
    ("view.row_spacing", ValueKind::Float),
    ("logging.level", ValueKind::Str),
    ("logging.file", ValueKind::Bool),
    ("logging.directory", ValueKind::Str),
];

/// Every settable dotted key
pub fn known_keys() -> impl Iterator<Item = &'static str> {
    KEYS.iter().map(|(k, _)| *k)
}

/// Set `section.field` to `raw` in the document, typed by the key.
pub fn set_value(doc: &mut DocumentMut, key: &str, raw: &str) -> Result<(), ConfigError> {
    let kind = KEYS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, kind)| *kind)
        .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
    let Some((section, field)) = key.split_once('.') else {
        return Err(ConfigError::UnknownKey(key.to_string()));
    };
    let invalid = |message: String| ConfigError::InvalidValue {
        key: key.to_string(),
        message,
    };

    let value = match kind {
        ValueKind::Str => toml_edit::value(raw),
        ValueKind::Int => {
            let n: i64 = raw.parse().map_err(|e| invalid(format!("{}", e)))?;
            if n < 0 {
                return Err(invalid("must not be negative".into()));
            }
            toml_edit::value(n)
        }
        ValueKind::Float => toml_edit::value(
            raw.parse::<f64>()
                .map_err(|e| invalid(format!("{}", e)))?,
        ),
        ValueKind::Bool => toml_edit::value(
            raw.parse::<bool>()
                .map_err(|e| invalid(format!("{}", e)))?,
        ),
    };

    if !doc.contains_key(section) {
        doc[section] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    doc[section][field] = value;

    // The edited document must still deserialize
    let config: CascadeConfig = toml::from_str(&doc.to_string())?;
    validate(&config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn sample() -> &'static str {
        r#"# local service
[service]
base_url = "http://sched.internal:9000" # staging

[history]
cap = 20
"#
    }

    #[test]
    fn missing_sections_use_defaults() {
        let config: CascadeConfig = toml::from_str(sample()).unwrap();
        assert_eq!(config.service.base_url, "http://sched.internal:9000");
        assert_eq!(config.service.timeout_secs, 10);
        assert_eq!(config.history.cap, 20);
        assert_eq!(config.view.poll_interval_ms, 5000);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn empty_file_is_all_defaults() {
        let config: CascadeConfig = toml::from_str("").unwrap();
        assert_eq!(config, CascadeConfig::default());
    }

    #[test]
    fn default_document_parses_to_defaults() {
        let doc = default_document();
        let config: CascadeConfig = toml::from_str(&doc).unwrap();
        assert_eq!(config, CascadeConfig::default());
        assert!(doc.contains("# critical = \"#FF4444\""));
    }

    #[test]
    fn zero_history_cap_is_rejected() {
        let mut doc: DocumentMut = default_document().parse().unwrap();
        assert!(matches!(
            set_value(&mut doc, "history.cap", "0"),
            Err(ConfigError::InvalidValue { .. })
        ));

        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        fs::write(&path, "[history]\ncap = 0\n").unwrap();
        assert!(matches!(
            load(Some(&path)),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn round_trip_preserves_comments() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        fs::write(&path, sample()).unwrap();

        let (_config, doc) = read_document(&path).unwrap();
        write_document(&path, &doc).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), sample());
    }

    #[test]
    fn set_value_edits_in_place() {
        let mut doc: DocumentMut = sample().parse().unwrap();
        set_value(&mut doc, "history.cap", "75").unwrap();
        set_value(&mut doc, "view.row_spacing", "120.5").unwrap();
        let text = doc.to_string();
        assert!(text.contains("# staging"));
        let config: CascadeConfig = toml::from_str(&text).unwrap();
        assert_eq!(config.history.cap, 75);
        assert_eq!(config.view.row_spacing, 120.5);
    }

    #[test]
    fn set_value_rejects_unknown_and_badly_typed() {
        let mut doc: DocumentMut = sample().parse().unwrap();
        assert!(matches!(
            set_value(&mut doc, "history.depth", "3"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(
            set_value(&mut doc, "history.cap", "lots"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            set_value(&mut doc, "history.cap", "-1"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            set_value(&mut doc, "logging.file", "maybe"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn init_refuses_to_overwrite() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join(CONFIG_FILE);
        init(&path, false).unwrap();
        assert!(matches!(
            init(&path, false),
            Err(ConfigError::AlreadyExists(_))
        ));
        init(&path, true).unwrap();
        assert_eq!(load_from(&path).unwrap(), CascadeConfig::default());
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("absent.toml");
        assert!(matches!(load(Some(&path)), Err(ConfigError::Read { .. })));
    }

    #[test]
    fn explicit_path_wins() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        fs::write(&path, "[history]\ncap = 3\n").unwrap();
        assert_eq!(resolve_path(Some(&path)), Some(path.clone()));
        assert_eq!(load(Some(&path)).unwrap().history.cap, 3);
    }
}

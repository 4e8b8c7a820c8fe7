//! Lookup tables loaded from JSON assets.
//!
//! Tables are plain immutable values handed to adapters and exporters at
//! construction; nothing here is global.

use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;

/// A table, config value or format name that cannot be used.
#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Json { path: PathBuf, source: serde_json::Error },
    UnknownFormat(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "cannot read {}: {source}", path.display()),
            Self::Json { path, source } => write!(f, "invalid table {}: {source}", path.display()),
            Self::UnknownFormat(name) => write!(f, "unknown format: {name}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            Self::UnknownFormat(_) => None,
        }
    }
}

/// Read a whole JSON file into `T`
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let bytes = std::fs::read(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Name → list of names, e.g. Genios database → package names or subject →
/// classification facets.
pub type StringListMap = FxHashMap<String, Vec<String>>;

pub fn load_string_list_map(path: &Path) -> Result<StringListMap, ConfigError> {
    let map: StringListMap = load_json(path)?;
    log::debug!("loaded {} entries from {}", map.len(), path.display());
    Ok(map)
}

/// Crossref member id → primary member name
#[derive(Debug, Clone, Default)]
pub struct MemberNames(FxHashMap<u64, String>);

impl MemberNames {
    /// JSON object keyed by the numeric member id as a string
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw: FxHashMap<String, String> = load_json(path)?;
        let mut names = FxHashMap::default();
        for (id, name) in raw {
            match id.trim().parse::<u64>() {
                Ok(id) => {
                    names.insert(id, name);
                }
                Err(_) => log::warn!("{}: ignoring non-numeric member id {id:?}", path.display()),
            }
        }
        Ok(Self(names))
    }

    pub fn get(&self, id: u64) -> Option<&str> {
        self.0.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(u64, String)> for MemberNames {
    fn from_iter<I: IntoIterator<Item = (u64, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn string_list_map() {
        let file = write_temp(r#"{"ZECO": ["Wiwi", "Sowi"], "BANK": []}"#);
        let map = load_string_list_map(file.path()).unwrap();
        assert_eq!(map["ZECO"], vec!["Wiwi", "Sowi"]);
        assert!(map["BANK"].is_empty());
    }

    #[test]
    fn member_names_skip_bad_ids() {
        let file = write_temp(r#"{"78": "Elsevier BV", "x": "Nobody"}"#);
        let names = MemberNames::load(file.path()).unwrap();
        assert_eq!(names.len(), 1);
        assert_eq!(names.get(78), Some("Elsevier BV"));
    }

    #[test]
    fn errors_name_the_path() {
        let err = load_string_list_map(Path::new("/nonexistent/dbmap.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/dbmap.json"));

        let file = write_temp("[1, 2");
        let err = load_string_list_map(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Json { .. }));
    }
}

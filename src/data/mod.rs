//! # Fixture data
//!
//! Loads named JSON documents (`auth_data`, `user_data`, `resource_data`, ...)
//! from the fixture directory. Each document is read once per session and
//! shared read-only afterwards.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

#[derive(Debug, Error)]
pub enum DataError {
    #[error("Test data file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read test data file `{}`: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in `{}`: {source}", .path.display())]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unknown fixture reference `{reference}`: {reason}")]
    UnknownReference { reference: String, reason: String },
}

#[derive(Debug)]
pub struct DataLoader {
    data_dir: PathBuf,
    cache: Mutex<HashMap<String, Arc<Value>>>,
}

impl DataLoader {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Loads `<data_dir>/<name>.json`; the extension is optional in `name`.
    pub fn load_json(&self, name: &str) -> Result<Arc<Value>, DataError> {
        let file_name = if name.ends_with(".json") {
            name.to_string()
        } else {
            format!("{name}.json")
        };

        if let Some(cached) = self.lock_cache().get(&file_name) {
            return Ok(Arc::clone(cached));
        }

        let path = self.data_dir.join(&file_name);
        if !path.exists() {
            return Err(DataError::NotFound(path));
        }

        let raw = fs::read_to_string(&path).map_err(|source| DataError::Read {
            path: path.clone(),
            source,
        })?;
        let value: Value = serde_json::from_str(&raw).map_err(|source| {
            error!(file = %file_name, error = %source, "invalid JSON in test data");
            DataError::InvalidJson {
                path: path.clone(),
                source,
            }
        })?;
        debug!(file = %file_name, "loaded test data");

        let value = Arc::new(value);
        self.lock_cache().insert(file_name, Arc::clone(&value));
        Ok(value)
    }

    pub fn auth_data(&self) -> Result<Arc<Value>, DataError> {
        self.load_json("auth_data")
    }

    pub fn user_data(&self) -> Result<Arc<Value>, DataError> {
        self.load_json("user_data")
    }

    pub fn resource_data(&self) -> Result<Arc<Value>, DataError> {
        self.load_json("resource_data")
    }

    pub fn valid_users(&self) -> Result<Vec<Value>, DataError> {
        Ok(list(&*self.auth_data()?, "valid_users"))
    }

    pub fn invalid_users(&self) -> Result<Vec<Value>, DataError> {
        Ok(list(&*self.auth_data()?, "invalid_users"))
    }

    pub fn existing_user_ids(&self) -> Result<Vec<i64>, DataError> {
        Ok(ids(&*self.user_data()?, "existing_user_ids"))
    }

    pub fn non_existing_user_ids(&self) -> Result<Vec<i64>, DataError> {
        Ok(ids(&*self.user_data()?, "non_existing_user_ids"))
    }

    /// Resolves a dotted reference such as `auth_data.valid_users.0.email`.
    /// The first segment names the document; numeric segments index arrays.
    pub fn resolve(&self, reference: &str) -> Result<Value, DataError> {
        let mut segments = reference.split('.');
        let document = segments
            .next()
            .filter(|segment| !segment.is_empty())
            .ok_or_else(|| unknown(reference, "empty reference"))?;

        let root = self.load_json(document)?;
        let mut current: &Value = &root;
        for segment in segments {
            current = match current {
                Value::Object(map) => map
                    .get(segment)
                    .ok_or_else(|| unknown(reference, format!("no key `{segment}`")))?,
                Value::Array(items) => {
                    let index: usize = segment
                        .parse()
                        .map_err(|_| unknown(reference, format!("`{segment}` is not an index")))?;
                    items
                        .get(index)
                        .ok_or_else(|| unknown(reference, format!("index {index} out of range")))?
                }
                _ => return Err(unknown(reference, format!("cannot descend into `{segment}`"))),
            };
        }

        Ok(current.clone())
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<Value>>> {
        // A poisoned cache only ever holds fully inserted documents.
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn list(document: &Value, key: &str) -> Vec<Value> {
    document
        .get(key)
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn ids(document: &Value, key: &str) -> Vec<i64> {
    list(document, key).iter().filter_map(Value::as_i64).collect()
}

fn unknown(reference: &str, reason: impl Into<String>) -> DataError {
    DataError::UnknownReference {
        reference: reference.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fixture_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("auth_data.json"),
            json!({
                "valid_users": [{"email": "eve.holt@reqres.in", "password": "cityslicka"}],
                "invalid_users": [{"email": "peter@klaven"}]
            })
            .to_string(),
        )
        .unwrap();
        fs::write(
            dir.path().join("user_data.json"),
            json!({"existing_user_ids": [1, 2, 3], "non_existing_user_ids": [23]}).to_string(),
        )
        .unwrap();
        dir
    }

    #[test]
    fn loads_named_collections() {
        let dir = fixture_dir();
        let loader = DataLoader::new(dir.path());

        assert_eq!(loader.valid_users().unwrap()[0]["password"], "cityslicka");
        assert_eq!(loader.invalid_users().unwrap().len(), 1);
        assert_eq!(loader.existing_user_ids().unwrap(), vec![1, 2, 3]);
        assert_eq!(loader.non_existing_user_ids().unwrap(), vec![23]);
    }

    #[test]
    fn memoizes_documents() {
        let dir = fixture_dir();
        let loader = DataLoader::new(dir.path());

        let first = loader.load_json("user_data").unwrap();
        fs::remove_file(dir.path().join("user_data.json")).unwrap();
        let second = loader.load_json("user_data.json").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn missing_and_invalid_files_are_errors() {
        let dir = fixture_dir();
        fs::write(dir.path().join("resource_data.json"), "{ nope").unwrap();
        let loader = DataLoader::new(dir.path());

        assert!(matches!(loader.load_json("missing"), Err(DataError::NotFound(_))));
        assert!(matches!(loader.resource_data(), Err(DataError::InvalidJson { .. })));
    }

    #[test]
    fn absent_collections_are_empty() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("user_data.json"), "{}").unwrap();
        let loader = DataLoader::new(dir.path());
        assert!(loader.existing_user_ids().unwrap().is_empty());
    }

    #[test]
    fn resolves_dotted_references() {
        let dir = fixture_dir();
        let loader = DataLoader::new(dir.path());

        let user = loader.resolve("auth_data.valid_users.0").unwrap();
        assert_eq!(user["email"], "eve.holt@reqres.in");
        assert_eq!(loader.resolve("user_data.existing_user_ids.2").unwrap(), json!(3));

        let err = loader.resolve("auth_data.valid_users.5").unwrap_err();
        assert!(err.to_string().contains("index 5 out of range"));
        let err = loader.resolve("auth_data.nobody").unwrap_err();
        assert!(matches!(err, DataError::UnknownReference { .. }));
    }
}

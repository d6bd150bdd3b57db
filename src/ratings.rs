//! Locally persisted star ratings.
//!
//! All ratings live in one JSON record (`movieRatings`) mapping the movie id,
//! as a string, to its rating. Every write rereads and rewrites the whole
//! record; two writers racing on the record can lose an update. A record
//! that cannot be parsed reads as empty but is never overwritten.
use anyhow::{anyhow, bail, Context, Result};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::{fs, io};
use tracing::{debug, warn};

pub const RATINGS_KEY: &str = "movieRatings";
pub const MAX_RATING: u8 = 5;

/// String key-value persistence, shaped like a browser's local storage.
pub trait KeyValueStore: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> Result<()>;
}

/// Stores each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create data directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    /// Writes to a temp file in the same directory and renames it over the
    /// record, so a crash leaves either the old or the new contents.
    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        let mut temp = tempfile::NamedTempFile::new_in(&self.dir)
            .with_context(|| format!("Failed to create temp file in {}", self.dir.display()))?;
        temp.write_all(value.as_bytes())
            .context("Failed to write temp file")?;
        temp.as_file()
            .sync_all()
            .context("Failed to flush temp file")?;
        temp.persist(&path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    items: Mutex<HashMap<String, String>>,
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let items = self
            .items
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store poisoned"))?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut items = self
            .items
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store poisoned"))?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[derive(Clone)]
pub struct RatingStore {
    backend: Arc<dyn KeyValueStore>,
}

impl RatingStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::default()))
    }

    /// Current rating for a movie, 0 when none is stored.
    pub fn get(&self, movie_id: i32) -> Result<u8> {
        let record = self.load()?;
        Ok(record
            .get(&movie_id.to_string())
            .map(rating_value)
            .unwrap_or(0))
    }

    /// Stores `rating` for a movie. 0 is written as a literal 0, not removed.
    /// Fails without writing when the stored record is unreadable.
    pub fn set(&self, movie_id: i32, rating: u8) -> Result<()> {
        if rating > MAX_RATING {
            bail!("rating must be between 0 and {MAX_RATING}, got {rating}");
        }
        let mut record = match self.backend.get_item(RATINGS_KEY)? {
            Some(raw) => parse_record(&raw)
                .context("refusing to overwrite unreadable ratings record")?,
            None => Map::new(),
        };
        record.insert(movie_id.to_string(), Value::from(rating));
        let encoded = serde_json::to_string(&record).context("encoding ratings failed")?;
        self.backend.set_item(RATINGS_KEY, &encoded)?;
        debug!(movie_id, rating, "Saved rating");
        Ok(())
    }

    pub fn all(&self) -> Result<BTreeMap<String, u8>> {
        Ok(self
            .load()?
            .iter()
            .map(|(id, v)| (id.clone(), rating_value(v)))
            .collect())
    }

    fn load(&self) -> Result<Map<String, Value>> {
        let Some(raw) = self.backend.get_item(RATINGS_KEY)? else {
            return Ok(Map::new());
        };
        match parse_record(&raw) {
            Ok(map) => Ok(map),
            Err(e) => {
                warn!("Ignoring unreadable ratings record: {:#}", e);
                Ok(Map::new())
            }
        }
    }
}

fn parse_record(raw: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(raw).context("ratings record is not valid JSON")? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(anyhow!("ratings record is not an object: {other}")),
    }
}

fn rating_value(value: &Value) -> u8 {
    value
        .as_u64()
        .filter(|v| *v <= u64::from(MAX_RATING))
        .and_then(|v| u8::try_from(v).ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_rating_reads_as_zero() {
        let store = RatingStore::in_memory();
        assert_eq!(store.get(42).unwrap(), 0);
    }

    #[test]
    fn set_then_get_round_trips() {
        let store = RatingStore::in_memory();
        store.set(42, 4).unwrap();
        assert_eq!(store.get(42).unwrap(), 4);
        store.set(42, 0).unwrap();
        assert_eq!(store.get(42).unwrap(), 0);
    }

    #[test]
    fn clearing_stores_literal_zero() {
        let backend = Arc::new(MemoryStore::default());
        let store = RatingStore::new(backend.clone());
        store.set(7, 3).unwrap();
        store.set(7, 0).unwrap();
        let raw = backend.get_item(RATINGS_KEY).unwrap().unwrap();
        assert_eq!(raw, r#"{"7":0}"#);
    }

    #[test]
    fn rejects_out_of_range() {
        let store = RatingStore::in_memory();
        assert!(store.set(1, 6).is_err());
        assert_eq!(store.get(1).unwrap(), 0);
    }

    #[test]
    fn writes_keep_other_movies() {
        let store = RatingStore::in_memory();
        store.set(1, 5).unwrap();
        store.set(2, 2).unwrap();
        let all = store.all().unwrap();
        assert_eq!(all.get("1"), Some(&5));
        assert_eq!(all.get("2"), Some(&2));
    }

    #[test]
    fn corrupt_record_reads_empty_and_is_left_alone() {
        let backend = Arc::new(MemoryStore::default());
        backend.set_item(RATINGS_KEY, "{not json").unwrap();
        let store = RatingStore::new(backend.clone());
        assert_eq!(store.get(1).unwrap(), 0);
        assert!(store.all().unwrap().is_empty());

        let err = store.set(1, 2).unwrap_err();
        assert!(format!("{err:#}").contains("unreadable ratings record"));
        let raw = backend.get_item(RATINGS_KEY).unwrap().unwrap();
        assert_eq!(raw, "{not json");
    }

    #[test]
    fn non_object_record_is_not_overwritten() {
        let backend = Arc::new(MemoryStore::default());
        backend.set_item(RATINGS_KEY, "[1,2]").unwrap();
        let store = RatingStore::new(backend.clone());
        assert!(store.set(1, 2).is_err());
        assert_eq!(backend.get_item(RATINGS_KEY).unwrap().unwrap(), "[1,2]");
    }

    #[test]
    fn foreign_values_read_as_zero_but_survive_writes() {
        let backend = Arc::new(MemoryStore::default());
        backend
            .set_item(RATINGS_KEY, r#"{"1":"great","2":9,"3":4}"#)
            .unwrap();
        let store = RatingStore::new(backend.clone());
        assert_eq!(store.get(1).unwrap(), 0);
        assert_eq!(store.get(2).unwrap(), 0);
        assert_eq!(store.get(3).unwrap(), 4);
        store.set(4, 1).unwrap();
        let raw = backend.get_item(RATINGS_KEY).unwrap().unwrap();
        assert!(raw.contains(r#""1":"great""#));
    }

    #[test]
    fn file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let store = RatingStore::new(Arc::new(FileStore::new(dir.path()).unwrap()));
        store.set(27205, 5).unwrap();

        let reopened = RatingStore::new(Arc::new(FileStore::new(dir.path()).unwrap()));
        assert_eq!(reopened.get(27205).unwrap(), 5);
        assert!(dir.path().join("movieRatings.json").exists());
    }

    #[test]
    fn truncated_file_keeps_existing_ratings() {
        let dir = tempfile::tempdir().unwrap();
        let store = RatingStore::new(Arc::new(FileStore::new(dir.path()).unwrap()));
        store.set(1, 5).unwrap();
        store.set(2, 4).unwrap();

        let path = dir.path().join("movieRatings.json");
        let full = fs::read_to_string(&path).unwrap();
        let truncated = &full[..full.len() - 3];
        fs::write(&path, truncated).unwrap();

        assert!(store.set(3, 1).is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), truncated);

        // Restoring the file brings every rating back.
        fs::write(&path, &full).unwrap();
        assert_eq!(store.get(1).unwrap(), 5);
        assert_eq!(store.get(2).unwrap(), 4);
    }

    #[test]
    fn file_store_replaces_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let fs_store = FileStore::new(dir.path()).unwrap();
        fs_store.set_item("movieRatings", r#"{"1":2}"#).unwrap();
        fs_store.set_item("movieRatings", r#"{"1":3}"#).unwrap();
        assert_eq!(
            fs_store.get_item("movieRatings").unwrap().as_deref(),
            Some(r#"{"1":3}"#)
        );
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn file_store_missing_key_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let fs_store = FileStore::new(dir.path().join("nested")).unwrap();
        assert!(fs_store.get_item("missing").unwrap().is_none());
    }
}

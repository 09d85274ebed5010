use std::{
    collections::BTreeMap,
    fmt,
    future::Future,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use crate::{config, warning};

#[derive(Debug)]
pub enum StoreError {
    IoError(io::Error),
    SerdeError(serde_json::Error),
    Corrupted(String),
}

impl From<io::Error> for StoreError {
    fn from(err: io::Error) -> Self {
        StoreError::IoError(err)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::SerdeError(err)
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::IoError(e) => write!(f, "storage I/O failed: {}", e),
            StoreError::SerdeError(e) => write!(f, "storage encoding failed: {}", e),
            StoreError::Corrupted(msg) => write!(f, "persisted state is corrupted: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

/// Durable string key/value storage.
///
/// Multi-key writes and removals are applied as one unit: a reader never
/// observes only part of a `set_many` or `remove_many`.
pub trait KeyValueStore: Send + Sync + 'static {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

    fn set_many(
        &self,
        entries: Vec<(String, String)>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn remove_many(&self, keys: Vec<String>) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// A JSON object on disk, rewritten through a temporary file and a rename.
///
/// Writes within one instance are serialized. Separate instances or
/// processes sharing a path never clobber each other's temporary file, but
/// their read-modify-write cycles are not merged: the last rename wins.
pub struct FileStore {
    path: PathBuf,
    lock: tokio::sync::Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn default_location() -> Self {
        Self::new(config::data_dir().join("storage.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load_map(&self) -> Result<BTreeMap<String, String>, StoreError> {
        match async_fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Loads the map a write starts from. An unparsable file is replaced
    /// wholesale by the write instead of blocking every later write.
    async fn load_map_for_write(&self) -> Result<(BTreeMap<String, String>, bool), StoreError> {
        match self.load_map().await {
            Ok(map) => Ok((map, false)),
            Err(StoreError::SerdeError(e)) => {
                warning!(
                    "Resetting unreadable storage file {}: {}",
                    self.path.display(),
                    e
                );
                Ok((BTreeMap::new(), true))
            }
            Err(e) => Err(e),
        }
    }

    async fn save_map(&self, map: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            async_fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(map)?;
        let tmp = self.temp_path();
        if let Err(e) = async_fs::write(&tmp, json).await {
            let _ = async_fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        async_fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    // Unique per process and write, so concurrent writers never share a
    // temporary file. The last rename wins.
    fn temp_path(&self) -> PathBuf {
        let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "storage.json".to_string());
        self.path
            .with_file_name(format!("{}.{}.{}.tmp", name, std::process::id(), seq))
    }
}

static TEMP_SEQ: AtomicUsize = AtomicUsize::new(0);

impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock().await;
        let map = self.load_map().await?;
        Ok(map.get(key).cloned())
    }

    async fn set_many(&self, entries: Vec<(String, String)>) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let (mut map, _) = self.load_map_for_write().await?;
        map.extend(entries);
        self.save_map(&map).await
    }

    async fn remove_many(&self, keys: Vec<String>) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let (mut map, reset) = self.load_map_for_write().await?;
        let before = map.len();
        for key in &keys {
            map.remove(key);
        }
        if map.len() == before && !reset {
            return Ok(());
        }
        self.save_map(&map).await
    }
}

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            entries: Mutex::new(map),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of `set_many` and `remove_many` calls applied so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let map = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(map.get(key).cloned())
    }

    async fn set_many(&self, entries: Vec<(String, String)>) -> Result<(), StoreError> {
        let mut map = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        map.extend(entries);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn remove_many(&self, keys: Vec<String>) -> Result<(), StoreError> {
        let mut map = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        for key in &keys {
            map.remove(key);
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

//! Category and mapping persistence
//!
//! The engine reads category keyword lists and the two learned mapping tables
//! (creditor, debtor) through [`CategoryStore`]. Every load returns a fresh
//! copy; the engine never shares mutable state with a store.
//!
//! [`YamlCategoryStore`] keeps three files in one directory:
//!
//! ```yaml
//! # categories.yaml
//! categories:
//!   - name: Groceries
//!     keywords: [MIGROS, COOP, ALDI]
//!
//! # creditors.yaml / debtors.yaml
//! mappings:
//!   migros zurich: Groceries
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{normalize_party, CategoryConfig};

pub const CATEGORIES_FILE: &str = "categories.yaml";
pub const CREDITORS_FILE: &str = "creditors.yaml";
pub const DEBTORS_FILE: &str = "debtors.yaml";

/// Load/save contract for category definitions and mapping tables
///
/// Loads on a missing backing file return an empty collection; malformed data
/// returns an error. Saves overwrite the whole table.
pub trait CategoryStore: Send + Sync {
    fn load_categories(&self) -> Result<Vec<CategoryConfig>>;
    fn load_creditor_mappings(&self) -> Result<HashMap<String, String>>;
    fn load_debtor_mappings(&self) -> Result<HashMap<String, String>>;
    fn save_creditor_mappings(&self, mappings: &HashMap<String, String>) -> Result<()>;
    fn save_debtor_mappings(&self, mappings: &HashMap<String, String>) -> Result<()>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CategoriesFile {
    #[serde(default)]
    categories: Vec<CategoryConfig>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct MappingsFile {
    #[serde(default)]
    mappings: BTreeMap<String, String>,
}

/// Directory-backed YAML store
#[derive(Debug, Clone)]
pub struct YamlCategoryStore {
    dir: PathBuf,
}

impl YamlCategoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    /// Read a file, treating "not found" as absent
    fn read_optional(&self, file: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path(file)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(file = %self.path(file).display(), "Store file missing, using empty table");
                Ok(None)
            }
            Err(e) => Err(Error::Io(e)),
        }
    }

    fn load_mappings(&self, file: &str) -> Result<HashMap<String, String>> {
        let content = match self.read_optional(file)? {
            Some(content) if !content.trim().is_empty() => content,
            _ => return Ok(HashMap::new()),
        };
        let parsed: MappingsFile = serde_yaml::from_str(&content)?;
        Ok(normalize_mappings(parsed.mappings))
    }

    /// Write through a temp file in the same directory, then rename
    fn save_mappings(&self, file: &str, mappings: &HashMap<String, String>) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        let sorted = MappingsFile {
            mappings: mappings
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        };
        let yaml = serde_yaml::to_string(&sorted)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(yaml.as_bytes())?;
        tmp.flush()?;
        tmp.persist(self.path(file)).map_err(|e| Error::Io(e.error))?;

        debug!(file, entries = mappings.len(), "Saved mapping table");
        Ok(())
    }

    /// Write categories.yaml (used when seeding a new data directory)
    pub fn save_categories(&self, categories: &[CategoryConfig]) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let yaml = serde_yaml::to_string(&CategoriesFile {
            categories: categories.to_vec(),
        })?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(yaml.as_bytes())?;
        tmp.persist(self.path(CATEGORIES_FILE))
            .map_err(|e| Error::Io(e.error))?;
        Ok(())
    }
}

impl CategoryStore for YamlCategoryStore {
    fn load_categories(&self) -> Result<Vec<CategoryConfig>> {
        let content = match self.read_optional(CATEGORIES_FILE)? {
            Some(content) if !content.trim().is_empty() => content,
            _ => return Ok(Vec::new()),
        };
        let parsed: CategoriesFile = serde_yaml::from_str(&content)?;
        Ok(parsed
            .categories
            .into_iter()
            .filter(|c| !c.name.trim().is_empty())
            .collect())
    }

    fn load_creditor_mappings(&self) -> Result<HashMap<String, String>> {
        self.load_mappings(CREDITORS_FILE)
    }

    fn load_debtor_mappings(&self) -> Result<HashMap<String, String>> {
        self.load_mappings(DEBTORS_FILE)
    }

    fn save_creditor_mappings(&self, mappings: &HashMap<String, String>) -> Result<()> {
        self.save_mappings(CREDITORS_FILE, mappings)
    }

    fn save_debtor_mappings(&self, mappings: &HashMap<String, String>) -> Result<()> {
        self.save_mappings(DEBTORS_FILE, mappings)
    }
}

/// Lower-case keys and drop blank entries
fn normalize_mappings<I>(entries: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = (String, String)>,
{
    entries
        .into_iter()
        .map(|(party, category)| (normalize_party(&party), category.trim().to_string()))
        .filter(|(party, category)| !party.is_empty() && !category.is_empty())
        .collect()
}

/// In-memory store with save counters and a failure switch
#[derive(Debug, Clone, Default)]
pub struct MemoryCategoryStore {
    categories: Arc<Mutex<Vec<CategoryConfig>>>,
    creditors: Arc<Mutex<HashMap<String, String>>>,
    debtors: Arc<Mutex<HashMap<String, String>>>,
    saves: Arc<AtomicUsize>,
    fail_saves: Arc<AtomicBool>,
    next_save_delay: Arc<Mutex<Option<Duration>>>,
}

impl MemoryCategoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_categories(self, categories: Vec<CategoryConfig>) -> Self {
        self.set_categories(categories);
        self
    }

    pub fn with_creditor(self, party: &str, category: &str) -> Self {
        if let Ok(mut map) = self.creditors.lock() {
            map.insert(normalize_party(party), category.to_string());
        }
        self
    }

    pub fn with_debtor(self, party: &str, category: &str) -> Self {
        if let Ok(mut map) = self.debtors.lock() {
            map.insert(normalize_party(party), category.to_string());
        }
        self
    }

    pub fn set_categories(&self, categories: Vec<CategoryConfig>) {
        if let Ok(mut current) = self.categories.lock() {
            *current = categories;
        }
    }

    /// Replace the creditor table wholesale (as an external edit would)
    pub fn set_creditors(&self, mappings: HashMap<String, String>) {
        if let Ok(mut current) = self.creditors.lock() {
            *current = normalize_mappings(mappings);
        }
    }

    /// Make subsequent saves fail (or succeed again)
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Block the next save for `delay` before it writes
    pub fn delay_next_save(&self, delay: Duration) {
        if let Ok(mut next) = self.next_save_delay.lock() {
            *next = Some(delay);
        }
    }

    /// Number of successful save calls
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    fn snapshot(map: &Mutex<HashMap<String, String>>) -> Result<HashMap<String, String>> {
        map.lock()
            .map(|m| m.clone())
            .map_err(|_| Error::Lock("memory store".into()))
    }

    fn save(&self, map: &Mutex<HashMap<String, String>>, mappings: &HashMap<String, String>) -> Result<()> {
        let delay = self.next_save_delay.lock().ok().and_then(|mut next| next.take());
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "memory store configured to fail saves",
            )));
        }
        let mut current = map
            .lock()
            .map_err(|_| Error::Lock("memory store".into()))?;
        *current = mappings.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl CategoryStore for MemoryCategoryStore {
    fn load_categories(&self) -> Result<Vec<CategoryConfig>> {
        self.categories
            .lock()
            .map(|c| c.clone())
            .map_err(|_| Error::Lock("memory store".into()))
    }

    fn load_creditor_mappings(&self) -> Result<HashMap<String, String>> {
        Self::snapshot(&self.creditors)
    }

    fn load_debtor_mappings(&self) -> Result<HashMap<String, String>> {
        Self::snapshot(&self.debtors)
    }

    fn save_creditor_mappings(&self, mappings: &HashMap<String, String>) -> Result<()> {
        self.save(&self.creditors, mappings)
    }

    fn save_debtor_mappings(&self, mappings: &HashMap<String, String>) -> Result<()> {
        self.save(&self.debtors, mappings)
    }
}

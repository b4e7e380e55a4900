//! Exact party-name lookup in the learned mapping tables

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::{normalize_party, Category, StrategyKind, Transaction};
use crate::store::CategoryStore;

use super::CategorizationStrategy;

/// Creditor and debtor tables keyed by normalized party name
///
/// Reloads build both maps first and swap them in afterwards, so a reader
/// sees either the old or the new table, never a mix. Saves of one table are
/// serialized, so an older snapshot never overwrites a newer one.
pub struct DirectMappingStrategy {
    creditors: RwLock<HashMap<String, String>>,
    debtors: RwLock<HashMap<String, String>>,
    creditors_dirty: AtomicBool,
    debtors_dirty: AtomicBool,
    creditors_save: Mutex<()>,
    debtors_save: Mutex<()>,
}

impl DirectMappingStrategy {
    /// Load both tables from the store
    ///
    /// A table that fails to load starts empty.
    pub fn new(store: &dyn CategoryStore) -> Self {
        let creditors = store.load_creditor_mappings().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load creditor mappings, starting empty");
            HashMap::new()
        });
        let debtors = store.load_debtor_mappings().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load debtor mappings, starting empty");
            HashMap::new()
        });
        Self::from_maps(creditors, debtors)
    }

    /// Build from in-memory tables
    pub fn from_maps(creditors: HashMap<String, String>, debtors: HashMap<String, String>) -> Self {
        Self {
            creditors: RwLock::new(normalize_keys(creditors)),
            debtors: RwLock::new(normalize_keys(debtors)),
            creditors_dirty: AtomicBool::new(false),
            debtors_dirty: AtomicBool::new(false),
            creditors_save: Mutex::new(()),
            debtors_save: Mutex::new(()),
        }
    }

    fn table(&self, is_debtor: bool) -> &RwLock<HashMap<String, String>> {
        if is_debtor {
            &self.debtors
        } else {
            &self.creditors
        }
    }

    fn dirty_flag(&self, is_debtor: bool) -> &AtomicBool {
        if is_debtor {
            &self.debtors_dirty
        } else {
            &self.creditors_dirty
        }
    }

    /// Look up a party in the creditor (`is_debtor == false`) or debtor table
    pub fn lookup(&self, party_name: &str, is_debtor: bool) -> Result<Option<String>> {
        let key = normalize_party(party_name);
        if key.is_empty() {
            return Ok(None);
        }
        let table = self
            .table(is_debtor)
            .read()
            .map_err(|_| Error::Lock("mapping table".into()))?;
        Ok(table.get(&key).cloned())
    }

    /// Insert or replace one entry and mark the table dirty
    pub fn update(&self, party_name: &str, category: &str, is_debtor: bool) -> Result<()> {
        let key = normalize_party(party_name);
        let category = category.trim();
        if key.is_empty() || category.is_empty() {
            return Err(Error::InvalidData(
                "mapping needs a party name and a category".into(),
            ));
        }

        let mut table = self
            .table(is_debtor)
            .write()
            .map_err(|_| Error::Lock("mapping table".into()))?;
        table.insert(key, category.to_string());
        self.dirty_flag(is_debtor).store(true, Ordering::SeqCst);
        Ok(())
    }

    pub fn update_creditor_mapping(&self, party_name: &str, category: &str) -> Result<()> {
        self.update(party_name, category, false)
    }

    pub fn update_debtor_mapping(&self, party_name: &str, category: &str) -> Result<()> {
        self.update(party_name, category, true)
    }

    /// Re-read both tables from the store and swap them in
    ///
    /// On a load error the current tables stay in place.
    pub fn reload(&self, store: &dyn CategoryStore) -> Result<()> {
        let creditors = normalize_keys(store.load_creditor_mappings()?);
        let debtors = normalize_keys(store.load_debtor_mappings()?);
        let (creditor_count, debtor_count) = (creditors.len(), debtors.len());

        {
            let mut table = self
                .creditors
                .write()
                .map_err(|_| Error::Lock("creditor mappings".into()))?;
            *table = creditors;
        }
        {
            let mut table = self
                .debtors
                .write()
                .map_err(|_| Error::Lock("debtor mappings".into()))?;
            *table = debtors;
        }
        self.creditors_dirty.store(false, Ordering::SeqCst);
        self.debtors_dirty.store(false, Ordering::SeqCst);

        debug!(
            creditors = creditor_count,
            debtors = debtor_count,
            "Reloaded direct mappings"
        );
        Ok(())
    }

    /// Copy of the creditor table
    pub fn creditor_mappings(&self) -> Result<HashMap<String, String>> {
        self.snapshot(false)
    }

    /// Copy of the debtor table
    pub fn debtor_mappings(&self) -> Result<HashMap<String, String>> {
        self.snapshot(true)
    }

    fn snapshot(&self, is_debtor: bool) -> Result<HashMap<String, String>> {
        self.table(is_debtor)
            .read()
            .map(|t| t.clone())
            .map_err(|_| Error::Lock("mapping table".into()))
    }

    /// Whether either table has unsaved changes
    pub fn is_dirty(&self) -> bool {
        self.creditors_dirty.load(Ordering::SeqCst) || self.debtors_dirty.load(Ordering::SeqCst)
    }

    /// Persist one table, clearing its dirty flag on success
    ///
    /// Holds the table's save lock from clearing the flag until the store
    /// returns. An update that lands meanwhile sets the flag again and its
    /// own persist writes the newer snapshot afterwards.
    pub fn persist(&self, store: &dyn CategoryStore, is_debtor: bool) -> Result<()> {
        let _guard = if is_debtor {
            &self.debtors_save
        } else {
            &self.creditors_save
        }
        .lock()
        .map_err(|_| Error::Lock("mapping save".into()))?;

        let flag = self.dirty_flag(is_debtor);
        flag.store(false, Ordering::SeqCst);

        let result = self.snapshot(is_debtor).and_then(|table| {
            if is_debtor {
                store.save_debtor_mappings(&table)
            } else {
                store.save_creditor_mappings(&table)
            }
        });

        if result.is_err() {
            flag.store(true, Ordering::SeqCst);
        }
        result
    }

    /// Persist only the tables with unsaved changes
    pub fn save_dirty(&self, store: &dyn CategoryStore) -> Result<()> {
        if self.creditors_dirty.load(Ordering::SeqCst) {
            self.persist(store, false)?;
        }
        if self.debtors_dirty.load(Ordering::SeqCst) {
            self.persist(store, true)?;
        }
        Ok(())
    }
}

fn normalize_keys(map: HashMap<String, String>) -> HashMap<String, String> {
    map.into_iter()
        .map(|(party, category)| (normalize_party(&party), category))
        .filter(|(party, category)| !party.is_empty() && !category.trim().is_empty())
        .collect()
}

#[async_trait]
impl CategorizationStrategy for DirectMappingStrategy {
    async fn categorize(&self, transaction: &Transaction) -> Result<Option<Category>> {
        let found = self.lookup(&transaction.party_name, transaction.is_debtor)?;
        if let Some(ref name) = found {
            debug!(
                party = %transaction.party_name,
                category = %name,
                debtor = transaction.is_debtor,
                "Direct mapping hit"
            );
        }
        Ok(found.map(Category::new))
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::DirectMapping
    }

    fn confidence(&self) -> f64 {
        1.0
    }
}

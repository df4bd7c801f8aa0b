//! # Persisted Selection State
//!
//! Durable record of the selected payment method and its last source. It
//! survives navigation within one checkout session so a full reload can
//! resume mid-flow. There is a single slot: at most one method is active.
//!
//! Storage is pluggable through [`StateStore`]; the record is read and
//! written as a whole, never patched in place.

use crate::cart::CartData;
use crate::error::{PaymentError, PaymentResult};
use crate::source::PaymentSource;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

/// Current [`PaymentRecord`]
pub const PAYMENT_KEY: &str = "PAYMENT";
/// Cached [`CartData`] snapshot
pub const CARTDATA_KEY: &str = "CARTDATA";
/// Shopper-chosen label for saving the payment method
pub const NICKNAME_KEY: &str = "NICKNAME";
/// Method that created the current source, when its type is generic
pub const PAYMENT_CREATEDTYPE_KEY: &str = "PAYMENT_CREATEDTYPE";

/// Key/value store scoped to one checkout session
pub trait StateStore: Send + Sync {
    fn get(&self, key: &str) -> PaymentResult<Option<Value>>;
    fn set(&self, key: &str, value: Value) -> PaymentResult<()>;
    fn remove(&self, key: &str) -> PaymentResult<()>;
}

/// Process-local store (tests, single page lifetimes)
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStateStore {
    fn get(&self, key: &str) -> PaymentResult<Option<Value>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> PaymentResult<()> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> PaymentResult<()> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
        Ok(())
    }
}

/// JSON file store; outlives the process like session storage outlives a page
#[derive(Debug)]
pub struct FileStateStore {
    path: PathBuf,
    lock: RwLock<()>,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: RwLock::new(()),
        }
    }

    fn read_all(&self) -> PaymentResult<HashMap<String, Value>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(HashMap::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(PaymentError::Store(format!(
                "failed to read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    fn write_all(&self, entries: &HashMap<String, Value>) -> PaymentResult<()> {
        let content = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, content).map_err(|e| {
            PaymentError::Store(format!("failed to write {}: {}", self.path.display(), e))
        })
    }
}

impl StateStore for FileStateStore {
    fn get(&self, key: &str) -> PaymentResult<Option<Value>> {
        let _guard = self.lock.read().unwrap_or_else(|e| e.into_inner());
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: Value) -> PaymentResult<()> {
        let _guard = self.lock.write().unwrap_or_else(|e| e.into_inner());
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value);
        self.write_all(&entries)
    }

    fn remove(&self, key: &str) -> PaymentResult<()> {
        let _guard = self.lock.write().unwrap_or_else(|e| e.into_inner());
        let mut entries = self.read_all()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

/// Last source result of the selected method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceResult {
    pub source: PaymentSource,
}

/// The selected method and, once produced, its source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    /// Name of a registered payment method unit
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<SourceResult>,
}

impl PaymentRecord {
    /// Method selected, no source yet
    pub fn selected(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            result: None,
        }
    }

    /// Method selected with a source
    pub fn with_source(name: impl Into<String>, source: PaymentSource) -> Self {
        Self {
            name: name.into(),
            result: Some(SourceResult { source }),
        }
    }

    pub fn source(&self) -> Option<&PaymentSource> {
        self.result.as_ref().map(|r| &r.source)
    }
}

/// Typed access to the persisted selection keys
#[derive(Clone)]
pub struct SelectionStore {
    store: Arc<dyn StateStore>,
}

impl SelectionStore {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    /// Selection backed by a fresh in-memory store
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStateStore::new()))
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> PaymentResult<Option<T>> {
        match self.store.get(key)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    fn write<T: Serialize>(&self, key: &str, value: &T) -> PaymentResult<()> {
        self.store.set(key, serde_json::to_value(value)?)
    }

    /// Current record
    pub fn payment(&self) -> PaymentResult<Option<PaymentRecord>> {
        self.read(PAYMENT_KEY)
    }

    /// Overwrite the record
    pub fn save_payment(&self, record: &PaymentRecord) -> PaymentResult<()> {
        self.write(PAYMENT_KEY, record)
    }

    /// Source of the current record, if it belongs to `name`
    pub fn source_for(&self, name: &str) -> PaymentResult<Option<PaymentSource>> {
        Ok(self
            .payment()?
            .filter(|record| record.name == name)
            .and_then(|record| record.result.map(|r| r.source)))
    }

    pub fn cart_snapshot(&self) -> PaymentResult<Option<CartData>> {
        self.read(CARTDATA_KEY)
    }

    pub fn save_cart_snapshot(&self, cart: &CartData) -> PaymentResult<()> {
        self.write(CARTDATA_KEY, cart)
    }

    pub fn nickname(&self) -> PaymentResult<Option<String>> {
        self.read(NICKNAME_KEY)
    }

    pub fn set_nickname(&self, nickname: &str) -> PaymentResult<()> {
        self.write(NICKNAME_KEY, &nickname)
    }

    pub fn clear_nickname(&self) -> PaymentResult<()> {
        self.store.remove(NICKNAME_KEY)
    }

    pub fn created_type(&self) -> PaymentResult<Option<String>> {
        self.read(PAYMENT_CREATEDTYPE_KEY)
    }

    pub fn set_created_type(&self, method: &str) -> PaymentResult<()> {
        self.write(PAYMENT_CREATEDTYPE_KEY, &method)
    }

    /// Forget the selection once the page load has completed the flow
    pub fn clear(&self) -> PaymentResult<()> {
        self.store.remove(PAYMENT_KEY)?;
        self.store.remove(PAYMENT_CREATEDTYPE_KEY)?;
        self.store.remove(CARTDATA_KEY)
    }
}

impl std::fmt::Debug for SelectionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectionStore").finish_non_exhaustive()
    }
}

//! Loads and saves [`ShoppingData`] through a string key-value store.
//!
//! Reads never fail: a missing or unparsable key yields an empty collection.
//! Writes are best effort and only logged on failure.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::state::{Persist, ShoppingData};

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for &T {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }
}

/// In-process store for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    HaveIngredients,
    CheckedRecipes,
    RecipeOrder,
    ManualItems,
}

impl StorageKey {
    pub const ALL: [StorageKey; 4] = [
        StorageKey::HaveIngredients,
        StorageKey::CheckedRecipes,
        StorageKey::RecipeOrder,
        StorageKey::ManualItems,
    ];

    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            StorageKey::HaveIngredients => "cookie-have-ingredients",
            StorageKey::CheckedRecipes => "cookie-checked-recipes",
            StorageKey::RecipeOrder => "cookie-recipe-order",
            StorageKey::ManualItems => "cookie-manual-items",
        }
    }
}

pub struct StorageAdapter<S> {
    store: S,
}

impl<S: KeyValueStore> StorageAdapter<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Each key loads independently, so one corrupt value costs only its own collection.
    pub fn load(&self) -> ShoppingData {
        ShoppingData {
            have: self.read(StorageKey::HaveIngredients),
            checked: self.read(StorageKey::CheckedRecipes),
            recipe_order: self.read(StorageKey::RecipeOrder),
            manual_items: self.read(StorageKey::ManualItems),
        }
    }

    fn read<T: DeserializeOwned + Default>(&self, key: StorageKey) -> T {
        let raw = match self.store.get(key.key()) {
            Ok(Some(raw)) => raw,
            Ok(None) => return T::default(),
            Err(e) => {
                tracing::warn!(key = key.key(), error = %e, "Failed to read stored state");
                return T::default();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(key = key.key(), error = %e, "Discarding corrupt stored state");
            T::default()
        })
    }

    pub fn save(&self, key: StorageKey, data: &ShoppingData) {
        let result = match key {
            StorageKey::HaveIngredients => self.write(key, &data.have),
            StorageKey::CheckedRecipes => self.write(key, &data.checked),
            StorageKey::RecipeOrder => self.write(key, &data.recipe_order),
            StorageKey::ManualItems => self.write(key, &data.manual_items),
        };
        if let Err(e) = result {
            tracing::error!(key = key.key(), error = %e, "Failed to save state");
        }
    }

    fn write<T: Serialize>(&self, key: StorageKey, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        self.store.set(key.key(), &json)
    }
}

impl<S: KeyValueStore> Persist for StorageAdapter<S> {
    fn persist(&mut self, key: StorageKey, data: &ShoppingData) {
        self.save(key, data);
    }
}

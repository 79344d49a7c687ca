use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::providers::{EmagProvider, JsonProvider, SampleProvider};
use super::traits::ProviderAdapter;
use crate::utils::error::{AppError, Result};

pub type ProviderFactory = Box<dyn Fn() -> Result<Box<dyn ProviderAdapter>> + Send + Sync>;

/// Maps provider identifiers to adapters. Identifiers are case-insensitive.
///
/// Adapters are constructed on first resolution and cached for the rest of
/// the run.
pub struct ProviderRegistry {
    factories: HashMap<String, ProviderFactory>,
    loaded: RwLock<HashMap<String, Arc<dyn ProviderAdapter>>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
            loaded: RwLock::new(HashMap::new()),
        }
    }

    /// Registry with every provider shipped in this crate.
    pub fn with_builtin_providers() -> Self {
        let mut registry = Self::new();
        registry.register("sample", || Ok(Box::new(SampleProvider::new())));
        registry.register("emag", || Ok(Box::new(EmagProvider::new())));
        registry.register("json", || Ok(Box::new(JsonProvider::new())));
        registry
    }

    /// Register a provider factory, replacing any previous one for `id`
    pub fn register<F>(&mut self, id: &str, factory: F)
    where
        F: Fn() -> Result<Box<dyn ProviderAdapter>> + Send + Sync + 'static,
    {
        self.factories.insert(id.to_lowercase(), Box::new(factory));
    }

    pub fn is_registered(&self, id: &str) -> bool {
        self.factories.contains_key(&id.to_lowercase())
    }

    /// Sorted identifiers that can be resolved
    pub fn provider_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.factories.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Identifiers resolved so far in this run
    pub async fn loaded_ids(&self) -> Vec<String> {
        let loaded = self.loaded.read().await;
        let mut ids: Vec<String> = loaded.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn resolve(&self, id: &str) -> Result<Arc<dyn ProviderAdapter>> {
        let key = id.to_lowercase();

        if let Some(adapter) = self.loaded.read().await.get(&key) {
            return Ok(Arc::clone(adapter));
        }

        let factory = self
            .factories
            .get(&key)
            .ok_or_else(|| AppError::UnknownProvider {
                provider: id.to_string(),
            })?;

        let adapter: Arc<dyn ProviderAdapter> = Arc::from(factory().map_err(|e| {
            AppError::UnknownProvider {
                provider: format!("{} ({})", id, e),
            }
        })?);

        let mut loaded = self.loaded.write().await;
        let adapter = loaded.entry(key).or_insert(adapter);
        tracing::debug!(
            provider = %adapter.name(),
            description = %adapter.description(),
            "Loaded provider"
        );
        Ok(Arc::clone(adapter))
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::with_builtin_providers()
    }
}

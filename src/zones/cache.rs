use super::types::FeatureCollection;
use crate::sources::{DurableStore, RemoteSource};
use log::*;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;

/// Key under which the dataset is kept in the durable store.
pub const CACHE_KEY: &str = "timezones-geojson";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Loaded,
}

#[derive(Debug)]
struct Slot {
    state: LoadState,
    collection: Option<Arc<FeatureCollection>>,
}

/// Owns the loaded timezone dataset.
///
/// Resolution order: memory, then the durable store, then the remote source (always attempted
/// once per load; a successful fetch replaces whatever the durable store had). Concurrent
/// callers of [`FeatureStore::ensure_loaded`] wait for the one load in flight instead of
/// starting their own.
pub struct FeatureStore {
    remote: Arc<dyn RemoteSource>,
    durable: Arc<dyn DurableStore>,
    cache_key: String,
    slot: Mutex<Slot>,
    load_lock: tokio::sync::Mutex<()>,
    persisting: Mutex<Option<JoinHandle<()>>>,
}

impl FeatureStore {
    pub fn new(remote: Arc<dyn RemoteSource>, durable: Arc<dyn DurableStore>) -> Self {
        FeatureStore {
            remote,
            durable,
            cache_key: CACHE_KEY.to_string(),
            slot: Mutex::new(Slot {
                state: LoadState::Idle,
                collection: None,
            }),
            load_lock: tokio::sync::Mutex::new(()),
            persisting: Mutex::new(None),
        }
    }

    pub fn with_cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = key.into();
        self
    }

    pub fn load_state(&self) -> LoadState {
        self.slot().state
    }

    /// Whatever is in memory right now, without any I/O. During a load this may already hold
    /// the durable copy while the remote fetch is still running.
    pub fn current(&self) -> Option<Arc<FeatureCollection>> {
        self.slot().collection.clone()
    }

    /// Returns the dataset, loading it first if needed. Never fails: when neither source has
    /// usable data the empty collection is returned and the store still counts as loaded.
    pub async fn ensure_loaded(&self) -> Arc<FeatureCollection> {
        if let Some(collection) = self.loaded() {
            return collection;
        }

        let _guard = self.load_lock.lock().await;

        // the load we were waiting on may have finished meanwhile
        if let Some(collection) = self.loaded() {
            return collection;
        }

        self.slot().state = LoadState::Loading;
        info!("Loading timezone boundaries");

        if let Some(cached) = self.read_durable().await {
            info!("Using {} cached timezone features", cached.len());
            self.slot().collection = Some(Arc::new(cached));
        }

        match self.fetch_remote().await {
            Some(fresh) => {
                info!("Fetched {} timezone features", fresh.len());
                let fresh = Arc::new(fresh);
                self.slot().collection = Some(fresh.clone());
                self.persist(fresh);
            }
            None if self.current().is_none() => {
                warn!("No timezone data available, continuing with an empty collection");
            }
            None => debug!("Remote timezone data unavailable, keeping the cached copy"),
        }

        let mut slot = self.slot();
        slot.state = LoadState::Loaded;
        slot.collection
            .get_or_insert_with(|| Arc::new(FeatureCollection::empty()))
            .clone()
    }

    /// Waits for the most recent background write to the durable store.
    pub async fn flush(&self) {
        let pending = self.persisting.lock().unwrap_or_else(PoisonError::into_inner).take();

        if let Some(handle) = pending {
            if let Err(e) = handle.await {
                warn!("Timezone cache write did not complete: {}", e);
            }
        }
    }

    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn loaded(&self) -> Option<Arc<FeatureCollection>> {
        let slot = self.slot();
        match slot.state {
            LoadState::Loaded => slot.collection.clone(),
            _ => None,
        }
    }

    async fn read_durable(&self) -> Option<FeatureCollection> {
        match self.durable.get(&self.cache_key).await {
            Ok(Some(collection)) if collection.is_valid() => Some(collection),
            Ok(Some(_)) => {
                warn!("Ignoring cached timezone collection without features");
                None
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Could not read timezone cache: {}", e);
                None
            }
        }
    }

    async fn fetch_remote(&self) -> Option<FeatureCollection> {
        match self.remote.fetch().await {
            Ok(payload) => FeatureCollection::parse(&payload),
            Err(e) => {
                warn!("Could not fetch timezone data: {}", e);
                None
            }
        }
    }

    fn persist(&self, collection: Arc<FeatureCollection>) {
        let durable = Arc::clone(&self.durable);
        let key = self.cache_key.clone();

        let handle = tokio::spawn(async move {
            match durable.put(&key, &collection).await {
                Ok(()) => debug!("Cached {} timezone features under '{}'", collection.len(), key),
                Err(e) => warn!("Failed to cache timezone data: {}", e),
            }
        });

        *self.persisting.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }
}

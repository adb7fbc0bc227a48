//! Process-wide set of loaded models.
//!
//! Each model id owns a [`OnceCell`] slot. The first caller to find the slot
//! empty performs the load while every concurrent caller for the same id awaits
//! that one load, so a model is never loaded twice at once. A failed load
//! leaves the slot empty and the next request retries. Handles are shared via
//! `Arc`, so an unload while a generation is running only drops the cache's
//! reference; the weights go away when the generation finishes.

use crate::device::Device;
use crate::error::ApiError;
use crate::model::{LoadedModel, MemoryFootprint, ModelRuntime};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;

type Slot = Arc<OnceCell<Arc<LoadedModel>>>;

pub struct ModelCache {
    runtime: Arc<dyn ModelRuntime>,
    slots: Mutex<HashMap<String, Slot>>,
}

impl ModelCache {
    pub fn new(runtime: Arc<dyn ModelRuntime>) -> Self {
        Self { runtime, slots: Mutex::new(HashMap::new()) }
    }

    pub fn device(&self) -> Device {
        Device::select(self.runtime.capabilities())
    }

    fn slot(&self, identifier: &str) -> Slot {
        self.slots.lock().entry(identifier.to_string()).or_default().clone()
    }

    pub async fn get_or_load(&self, identifier: &str) -> Result<Arc<LoadedModel>, ApiError> {
        let slot = self.slot(identifier);
        let handle = slot
            .get_or_try_init(|| async {
                let device = self.device();
                tracing::info!(model = identifier, %device, "loading model");
                let model = self
                    .runtime
                    .load(identifier, device)
                    .await
                    .map_err(|cause| ApiError::Load { model: identifier.to_string(), cause })?;
                metrics::counter!("model_loads_total", "model" => identifier.to_string()).increment(1);
                tracing::info!(model = identifier, %device, "model loaded");
                Ok::<_, ApiError>(Arc::new(LoadedModel { id: identifier.to_string(), device, model }))
            })
            .await?;
        Ok(handle.clone())
    }

    /// Drops the cache's reference to a loaded model.
    pub fn unload(&self, identifier: &str) -> Result<Arc<LoadedModel>, ApiError> {
        let mut slots = self.slots.lock();
        let handle = slots
            .get(identifier)
            .and_then(|slot| slot.get().cloned())
            .ok_or_else(|| ApiError::NotLoaded(identifier.to_string()))?;
        slots.remove(identifier);
        drop(slots);

        // one reference is ours; anything beyond that is an in-flight request
        let in_flight = Arc::strong_count(&handle).saturating_sub(1);
        if in_flight > 0 {
            tracing::info!(model = identifier, in_flight, "model unloaded, release deferred until requests finish");
        } else {
            tracing::info!(model = identifier, device = %handle.device, "model unloaded");
        }
        Ok(handle)
    }

    pub fn is_loaded(&self, identifier: &str) -> bool {
        self.slots.lock().get(identifier).is_some_and(|slot| slot.initialized())
    }

    pub fn loaded_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .slots
            .lock()
            .iter()
            .filter(|(_, slot)| slot.initialized())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.slots.lock().values().filter(|slot| slot.initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Summed footprint of the models resident on `device`.
    pub fn memory_usage(&self, device: Device) -> MemoryFootprint {
        self.slots
            .lock()
            .values()
            .filter_map(|slot| slot.get())
            .filter(|h| h.device == device)
            .map(|h| h.model.memory())
            .fold(MemoryFootprint::default(), |acc, m| acc + m)
    }
}

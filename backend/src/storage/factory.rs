use super::{MemoryStore, SharedStore, SqliteStore};
use crate::config::AppConfig;
use log::{info, warn};
use std::sync::Arc;

/// Chooses the storage backend for the lifetime of the process.
///
/// The durable store is tried exactly once. If it cannot be opened the
/// in-memory fallback is returned and the degraded mode is logged; callers
/// keep the returned handle and never re-evaluate the choice.
pub fn connect_store(config: &AppConfig) -> SharedStore {
    info!("Opening durable store at {}", config.database_path);
    match SqliteStore::open(&config.database_path) {
        Ok(store) => {
            info!("Connected to durable store - data will persist");
            Arc::new(store)
        }
        Err(e) => {
            warn!("Durable store unavailable: {}", e);
            warn!("Using in-memory storage - contacts and QR codes will not persist between restarts");
            Arc::new(MemoryStore::new())
        }
    }
}

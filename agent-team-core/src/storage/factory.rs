use std::path::Path;
use std::sync::Arc;

use crate::config::schema::{Config, StorageBackendKind};
use crate::error::{Error, Result};
use crate::storage::memory::InMemoryStore;
use crate::storage::sqlite::SqliteStore;
use crate::storage::MessageStore;

pub fn create_message_store(config: &Config) -> Result<Arc<dyn MessageStore>> {
    match config.storage.backend {
        StorageBackendKind::Sqlite => {
            let database = Path::new(&config.storage.database_path);
            if let Some(parent) = database.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|err| {
                    Error::Storage(format!(
                        "failed to create database directory '{}': {err}",
                        parent.display()
                    ))
                })?;
            }

            let connection_string = format!(
                "{}{}",
                config.storage.connection_string_prefix,
                database.display()
            );

            let store = SqliteStore::new(
                &connection_string,
                config.storage.pool_size,
                &config.storage.sqlite,
            )?;
            Ok(Arc::new(store))
        }
        StorageBackendKind::Memory => Ok(Arc::new(InMemoryStore::default())),
    }
}

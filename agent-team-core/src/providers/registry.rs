use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::providers::types::ModelProvider;

#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn ModelProvider>>,
}

impl ProviderRegistry {
    pub fn register(&mut self, name: String, provider: Arc<dyn ModelProvider>) {
        self.providers.insert(name, provider);
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn ModelProvider>> {
        self.providers
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("provider '{name}'")))
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

//! Model registry for runtime model lookup.
//!
//! The single source of truth for per-model limits. Built once at startup
//! and read-only afterwards.

use std::collections::HashMap;

use owpro_types::llm::{ModelDescriptor, RouteError};

/// Errors building a registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("duplicate model id '{0}'")]
    DuplicateModel(String),
}

/// Registry of known models, indexed by id.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: Vec<ModelDescriptor>,
    index: HashMap<String, usize>,
}

impl ModelRegistry {
    /// Build a registry, rejecting duplicate ids.
    pub fn new(models: Vec<ModelDescriptor>) -> Result<Self, RegistryError> {
        let mut index = HashMap::with_capacity(models.len());
        for (i, model) in models.iter().enumerate() {
            if index.insert(model.id.clone(), i).is_some() {
                return Err(RegistryError::DuplicateModel(model.id.clone()));
            }
        }
        Ok(Self { models, index })
    }

    /// Look up a model by id.
    pub fn lookup(&self, model_id: &str) -> Result<&ModelDescriptor, RouteError> {
        self.index
            .get(model_id)
            .map(|&i| &self.models[i])
            .ok_or_else(|| RouteError::ModelNotFound {
                model_id: model_id.to_string(),
            })
    }

    /// All models in declaration order.
    pub fn list(&self) -> &[ModelDescriptor] {
        &self.models
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

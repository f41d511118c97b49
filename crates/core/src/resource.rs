//! Resource registry.
//!
//! Resources are plain identities that locks are taken against. The lock
//! coordinator only needs to know whether one exists, which it asks through
//! the [`ResourceDirectory`] trait.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::CoreError;
use crate::types::ResourceId;

/// Maximum length of a resource type.
const MAX_TYPE_LEN: usize = 100;

/// Maximum length of a resource identifier.
const MAX_IDENTIFIER_LEN: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub identifier: String,
}

/// DTO for registering a resource.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateResource {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub identifier: String,
}

/// Existence lookup used by the lock coordinator.
#[async_trait]
pub trait ResourceDirectory: Send + Sync {
    async fn exists(&self, id: ResourceId) -> bool;
}

#[derive(Debug, Default)]
struct RegistryInner {
    by_id: HashMap<ResourceId, Resource>,
    /// `(type, identifier)` -> id, enforcing uniqueness.
    by_key: HashMap<(String, String), ResourceId>,
}

impl RegistryInner {
    fn insert(&mut self, resource: Resource) {
        self.by_key.insert(
            (resource.resource_type.clone(), resource.identifier.clone()),
            resource.id,
        );
        self.by_id.insert(resource.id, resource);
    }
}

/// In-memory resource registry.
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    inner: RwLock<RegistryInner>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new resource. Fails with `Conflict` if the same
    /// `(type, identifier)` pair already exists.
    pub async fn create(&self, input: &CreateResource) -> Result<Resource, CoreError> {
        validate_create_resource(input)?;
        let key = (
            input.resource_type.trim().to_string(),
            input.identifier.trim().to_string(),
        );

        let mut inner = self.inner.write().await;
        if inner.by_key.contains_key(&key) {
            return Err(CoreError::Conflict("Resource already exists".into()));
        }

        let resource = Resource {
            id: uuid::Uuid::new_v4(),
            resource_type: key.0,
            identifier: key.1,
        };
        inner.insert(resource.clone());
        Ok(resource)
    }

    pub async fn get(&self, id: ResourceId) -> Option<Resource> {
        self.inner.read().await.by_id.get(&id).cloned()
    }

    /// All resources ordered by type, then identifier.
    pub async fn list(&self) -> Vec<Resource> {
        let mut resources: Vec<Resource> = self.inner.read().await.by_id.values().cloned().collect();
        resources.sort_by(|a, b| {
            a.resource_type
                .cmp(&b.resource_type)
                .then_with(|| a.identifier.cmp(&b.identifier))
        });
        resources
    }

    /// Load previously persisted resources, replacing current contents.
    pub async fn restore(&self, resources: Vec<Resource>) {
        let mut inner = self.inner.write().await;
        *inner = RegistryInner::default();
        for resource in resources {
            inner.insert(resource);
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.by_id.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ResourceDirectory for ResourceRegistry {
    async fn exists(&self, id: ResourceId) -> bool {
        self.inner.read().await.by_id.contains_key(&id)
    }
}

/// Validate a resource registration.
///
/// Rules:
/// - `type` and `identifier` must not be blank.
/// - `type` at most `MAX_TYPE_LEN`, `identifier` at most `MAX_IDENTIFIER_LEN` characters.
pub fn validate_create_resource(input: &CreateResource) -> Result<(), CoreError> {
    let resource_type = input.resource_type.trim();
    let identifier = input.identifier.trim();

    if resource_type.is_empty() {
        return Err(CoreError::Validation("type must not be empty".into()));
    }
    if resource_type.len() > MAX_TYPE_LEN {
        return Err(CoreError::Validation(format!(
            "type must not exceed {MAX_TYPE_LEN} characters"
        )));
    }
    if identifier.is_empty() {
        return Err(CoreError::Validation("identifier must not be empty".into()));
    }
    if identifier.len() > MAX_IDENTIFIER_LEN {
        return Err(CoreError::Validation(format!(
            "identifier must not exceed {MAX_IDENTIFIER_LEN} characters"
        )));
    }
    Ok(())
}

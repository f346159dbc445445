//! Tag content resource
//!
//! Tags are the small content entity the admin manages. Reads are public,
//! writes go through the access gate and the admin role check.

use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Tag record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,
    /// Unique display name
    pub name: String,
    /// Inactive tags are hidden from the public listing
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update; absent fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TagUpdate {
    pub name: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Error, PartialEq)]
pub enum TagError {
    #[error("Tag not found")]
    NotFound,

    #[error("Tag '{0}' already exists")]
    DuplicateName(String),

    #[error("Tag name must not be empty")]
    EmptyName,
}

impl From<TagError> for AppError {
    fn from(err: TagError) -> Self {
        match err {
            TagError::NotFound => AppError::NotFound("Tag".to_string()),
            TagError::DuplicateName(_) => AppError::Conflict(err.to_string()),
            TagError::EmptyName => AppError::BadRequest(err.to_string()),
        }
    }
}

fn normalize_name(name: &str) -> Result<String, TagError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(TagError::EmptyName);
    }
    Ok(name.to_string())
}

/// Tag storage
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Active tags ordered by name
    async fn list_active(&self) -> Vec<Tag>;

    async fn get(&self, id: Uuid) -> Option<Tag>;

    async fn create(&self, name: &str) -> Result<Tag, TagError>;

    async fn update(&self, id: Uuid, update: TagUpdate) -> Result<Tag, TagError>;

    /// Soft delete: the tag stays addressable by id but leaves the listing
    async fn deactivate(&self, id: Uuid) -> Result<Tag, TagError>;
}

#[derive(Default)]
pub struct InMemoryTagRepository {
    tags: RwLock<HashMap<Uuid, Tag>>,
}

impl InMemoryTagRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn name_taken(tags: &HashMap<Uuid, Tag>, name: &str, except: Option<Uuid>) -> bool {
    tags.values()
        .any(|tag| tag.name == name && Some(tag.id) != except)
}

#[async_trait]
impl TagRepository for InMemoryTagRepository {
    async fn list_active(&self) -> Vec<Tag> {
        let mut tags: Vec<Tag> = self
            .tags
            .read()
            .await
            .values()
            .filter(|tag| tag.active)
            .cloned()
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        tags
    }

    async fn get(&self, id: Uuid) -> Option<Tag> {
        self.tags.read().await.get(&id).cloned()
    }

    async fn create(&self, name: &str) -> Result<Tag, TagError> {
        let name = normalize_name(name)?;
        let mut tags = self.tags.write().await;
        if name_taken(&tags, &name, None) {
            return Err(TagError::DuplicateName(name));
        }

        let now = Utc::now();
        let tag = Tag {
            id: Uuid::new_v4(),
            name,
            active: true,
            created_at: now,
            updated_at: now,
        };
        tags.insert(tag.id, tag.clone());
        Ok(tag)
    }

    async fn update(&self, id: Uuid, update: TagUpdate) -> Result<Tag, TagError> {
        let name = update.name.as_deref().map(normalize_name).transpose()?;
        let mut tags = self.tags.write().await;

        if let Some(name) = &name {
            if name_taken(&tags, name, Some(id)) {
                return Err(TagError::DuplicateName(name.clone()));
            }
        }

        let tag = tags.get_mut(&id).ok_or(TagError::NotFound)?;
        if let Some(name) = name {
            tag.name = name;
        }
        if let Some(active) = update.active {
            tag.active = active;
        }
        tag.updated_at = Utc::now();
        Ok(tag.clone())
    }

    async fn deactivate(&self, id: Uuid) -> Result<Tag, TagError> {
        self.update(
            id,
            TagUpdate {
                name: None,
                active: Some(false),
            },
        )
        .await
    }
}

// src/services/redis_service.rs
use crate::errors::StyleLensError;
use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use uuid::Uuid;

/// Uploads live for a day; analyses are expected to run shortly after upload.
const UPLOAD_TTL_SECS: usize = 86400;

/// Where uploaded image bytes are kept until an analyze request references them.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn store_image(&self, id: &Uuid, data: Vec<u8>) -> Result<(), StyleLensError>;
    async fn fetch_image(&self, id: &Uuid) -> Result<Option<Vec<u8>>, StyleLensError>;
}

fn upload_key(id: &Uuid) -> String {
    format!("upload:{}", id)
}

pub struct RedisImageStore {
    conn: ConnectionManager,
}

impl RedisImageStore {
    pub async fn new(redis_url: &str) -> Result<Self, StyleLensError> {
        let client = redis::Client::open(redis_url)?;
        let mut conn = ConnectionManager::new(client).await?;

        // Test connection
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await?;

        Ok(Self { conn })
    }
}

#[async_trait]
impl ImageStore for RedisImageStore {
    async fn store_image(&self, id: &Uuid, data: Vec<u8>) -> Result<(), StyleLensError> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(upload_key(id), data, UPLOAD_TTL_SECS)
            .await?;
        Ok(())
    }

    async fn fetch_image(&self, id: &Uuid) -> Result<Option<Vec<u8>>, StyleLensError> {
        let mut conn = self.conn.clone();
        let data: Option<Vec<u8>> = conn.get(upload_key(id)).await?;
        Ok(data)
    }
}

/// Process-local store for tests and for running without Redis.
#[derive(Default)]
pub struct MemoryImageStore {
    images: Mutex<HashMap<Uuid, Vec<u8>>>,
}

#[async_trait]
impl ImageStore for MemoryImageStore {
    async fn store_image(&self, id: &Uuid, data: Vec<u8>) -> Result<(), StyleLensError> {
        self.images
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(*id, data);
        Ok(())
    }

    async fn fetch_image(&self, id: &Uuid) -> Result<Option<Vec<u8>>, StyleLensError> {
        Ok(self
            .images
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_keys_are_namespaced() {
        let id = Uuid::nil();
        assert_eq!(upload_key(&id), "upload:00000000-0000-0000-0000-000000000000");
    }

    #[tokio::test]
    async fn memory_store_round_trips_bytes() {
        let store = MemoryImageStore::default();
        let id = Uuid::new_v4();
        store.store_image(&id, vec![1, 2, 3]).await.unwrap();
        assert_eq!(store.fetch_image(&id).await.unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(store.fetch_image(&Uuid::new_v4()).await.unwrap(), None);
    }
}

//! In-process cache store.
//!
//! Generations live in a `Vec` so that `keys` reports creation order, each
//! holding a `HashMap` of entries behind a tokio `RwLock`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CacheStorage, lookup_key, storable_key};
use crate::Error;
use crate::http::{Request, Response, ResponseSource};

struct Generation {
    name: String,
    entries: HashMap<String, Response>,
}

/// Cache store held entirely in memory.
#[derive(Clone, Default)]
pub struct MemoryCacheStorage {
    generations: Arc<RwLock<Vec<Generation>>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries in a generation (0 if it does not exist).
    pub async fn entry_count(&self, generation: &str) -> usize {
        let generations = self.generations.read().await;
        generations
            .iter()
            .find(|g| g.name == generation)
            .map(|g| g.entries.len())
            .unwrap_or(0)
    }
}

fn open_in(generations: &mut Vec<Generation>, name: &str) -> usize {
    if let Some(idx) = generations.iter().position(|g| g.name == name) {
        return idx;
    }
    generations.push(Generation { name: name.to_string(), entries: HashMap::new() });
    generations.len() - 1
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, generation: &str) -> Result<(), Error> {
        let mut generations = self.generations.write().await;
        open_in(&mut generations, generation);
        Ok(())
    }

    async fn put(&self, generation: &str, request: &Request, response: Response) -> Result<(), Error> {
        let key = storable_key(request)?;
        let mut generations = self.generations.write().await;
        let idx = open_in(&mut generations, generation);
        generations[idx].entries.insert(key, response);
        Ok(())
    }

    async fn lookup(&self, generation: &str, request: &Request) -> Result<Option<Response>, Error> {
        let Some(key) = lookup_key(request) else {
            return Ok(None);
        };
        let generations = self.generations.read().await;
        Ok(generations
            .iter()
            .find(|g| g.name == generation)
            .and_then(|g| g.entries.get(&key))
            .map(|response| response.duplicate().with_source(ResponseSource::Cache)))
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        let generations = self.generations.read().await;
        Ok(generations.iter().map(|g| g.name.clone()).collect())
    }

    async fn delete(&self, generation: &str) -> Result<bool, Error> {
        let mut generations = self.generations.write().await;
        let before = generations.len();
        generations.retain(|g| g.name != generation);
        Ok(generations.len() != before)
    }
}

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use regex::Regex;
use tracing::debug;

use crate::error::{CacheError, Result};

/// Key/field addressable string store with hash semantics.
///
/// An absent field and an empty value both read back as a miss at the
/// accessor level; stores only report what they hold.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>>;
    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<()>;
    /// Delete a whole key with every field under it.
    async fn delete(&self, key: &str) -> Result<()>;
    /// Delete every key matching a glob (`*`, `?`). Returns how many went.
    async fn delete_matching(&self, pattern: &str) -> Result<usize>;
}

/// Shared Redis instance, one hash per key.
///
/// `ConnectionManager` reconnects on its own and is cheap to clone, so each
/// command works on a clone rather than holding a lock.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| CacheError::Configuration(format!("invalid cache url '{url}': {e}")))?;
        let conn = ConnectionManager::new(client).await?;
        debug!(url, "connected to redis");
        Ok(Self { conn })
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        Ok(conn.hget::<_, _, Option<String>>(key, field).await?)
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.hset::<_, _, _, ()>(key, field, value).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    async fn delete_matching(&self, pattern: &str) -> Result<usize> {
        let mut conn = self.conn.clone();
        let keys: Vec<String> = conn.keys(pattern).await?;
        if keys.is_empty() {
            return Ok(0);
        }
        conn.del::<_, ()>(&keys).await?;
        debug!(pattern, count = keys.len(), "deleted cache keys");
        Ok(keys.len())
    }
}

/// In-process store for fixture mode and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        Ok(self
            .entries
            .get(key)
            .and_then(|fields| fields.get(field).cloned()))
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<()> {
        self.entries
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    async fn delete_matching(&self, pattern: &str) -> Result<usize> {
        let matcher = glob_to_regex(pattern)?;
        let before = self.entries.len();
        self.entries.retain(|key, _| !matcher.is_match(key));
        Ok(before - self.entries.len())
    }
}

fn glob_to_regex(pattern: &str) -> Result<Regex> {
    let mut expr = String::with_capacity(pattern.len() * 2 + 2);
    expr.push('^');
    for c in pattern.chars() {
        match c {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            other => expr.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    expr.push('$');
    Regex::new(&expr)
        .map_err(|e| CacheError::Configuration(format!("invalid key pattern '{pattern}': {e}")))
}

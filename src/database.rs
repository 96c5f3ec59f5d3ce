//! # Redis
//!
//! RAM database holding every piece of durable-ish game state.
//!
//! ## Requirements
//!
//! - Fast per-key lookups, small dataset (one int per device plus a handful
//!   of global counters)
//! - Atomic single-key operations; no cross-key transactions are used or
//!   assumed, so a multi-step handler can interleave with another request
//! - Absent key reads as zero/empty everywhere
//!
//! ## Key layout
//!
//! - `survival:devices` — set of all device IDs that ever reported a run
//! - `survival:over10` — set of device IDs whose best streak is > 10
//! - `survival:best:{deviceId}` — per-device best streak int
//! - `survival:streak:total` / `survival:streak:count` — run sum/count
//! - `stats:cityCounts` — hash of city name to win count
//! - `stats:honest` / `stats:claims` — honesty counters
//! - `stats:aggressive` / `stats:actions` — aggression counters
//! - `stats:wins` — total wins
use std::{
    collections::{HashMap, HashSet},
    time::Duration,
};

use async_trait::async_trait;
use redis::{
    AsyncCommands, Client,
    aio::{ConnectionManager, ConnectionManagerConfig},
};
use tokio::sync::Mutex;

use crate::error::StoreError;

pub const DEVICES_SET: &str = "survival:devices";
pub const OVER_THRESHOLD_SET: &str = "survival:over10";
pub const STREAK_TOTAL: &str = "survival:streak:total";
pub const STREAK_COUNT: &str = "survival:streak:count";
pub const CITY_COUNTS: &str = "stats:cityCounts";
pub const HONEST_COUNT: &str = "stats:honest";
pub const CLAIM_COUNT: &str = "stats:claims";
pub const AGGRESSIVE_COUNT: &str = "stats:aggressive";
pub const ACTION_COUNT: &str = "stats:actions";
pub const WIN_COUNT: &str = "stats:wins";

pub fn best_key(device_id: &str) -> String {
    format!("survival:best:{device_id}")
}

/// The handful of store operations the handlers need, behind a seam so tests
/// can swap in [`MemoryStore`]. Every method maps to one atomic Redis command.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_int(&self, key: &str) -> Result<Option<i64>, StoreError>;
    async fn set_int(&self, key: &str, value: i64) -> Result<(), StoreError>;
    async fn incr_by(&self, key: &str, delta: i64) -> Result<i64, StoreError>;

    async fn set_add(&self, key: &str, member: &str) -> Result<(), StoreError>;
    async fn set_remove(&self, key: &str, member: &str) -> Result<(), StoreError>;
    async fn set_contains(&self, key: &str, member: &str) -> Result<bool, StoreError>;
    async fn set_len(&self, key: &str) -> Result<u64, StoreError>;

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, i64>, StoreError>;
    async fn hash_incr(&self, key: &str, field: &str, delta: i64) -> Result<i64, StoreError>;
}

pub async fn init_redis(redis_url: &str) -> ConnectionManager {
    let config = ConnectionManagerConfig::new()
        .set_number_of_retries(1)
        .set_connection_timeout(Duration::from_millis(100));

    let client = Client::open(redis_url).unwrap();

    client
        .get_connection_manager_with_config(config)
        .await
        .unwrap()
}

pub struct RedisStore {
    connection: ConnectionManager,
}

impl RedisStore {
    pub fn new(connection: ConnectionManager) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn get_int(&self, key: &str) -> Result<Option<i64>, StoreError> {
        let mut con = self.connection.clone();
        Ok(con.get(key).await?)
    }

    async fn set_int(&self, key: &str, value: i64) -> Result<(), StoreError> {
        let mut con = self.connection.clone();
        Ok(con.set(key, value).await?)
    }

    async fn incr_by(&self, key: &str, delta: i64) -> Result<i64, StoreError> {
        let mut con = self.connection.clone();
        Ok(con.incr(key, delta).await?)
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<(), StoreError> {
        let mut con = self.connection.clone();
        Ok(con.sadd(key, member).await?)
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<(), StoreError> {
        let mut con = self.connection.clone();
        Ok(con.srem(key, member).await?)
    }

    async fn set_contains(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        let mut con = self.connection.clone();
        Ok(con.sismember(key, member).await?)
    }

    async fn set_len(&self, key: &str) -> Result<u64, StoreError> {
        let mut con = self.connection.clone();
        Ok(con.scard(key).await?)
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, i64>, StoreError> {
        let mut con = self.connection.clone();
        Ok(con.hgetall(key).await?)
    }

    async fn hash_incr(&self, key: &str, field: &str, delta: i64) -> Result<i64, StoreError> {
        let mut con = self.connection.clone();
        Ok(con.hincr(key, field, delta).await?)
    }
}

/// In-memory stand-in used by the test suites. Same absent-key semantics as
/// Redis: missing ints read as `None`, missing sets/hashes as empty. Can be
/// built with a call budget so suites can exercise a store that goes down
/// mid-sequence.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    ints: HashMap<String, i64>,
    sets: HashMap<String, HashSet<String>>,
    hashes: HashMap<String, HashMap<String, i64>>,
    budget: Option<u64>,
}

impl MemoryInner {
    fn charge(&mut self) -> Result<(), StoreError> {
        match self.budget.as_mut() {
            None => Ok(()),
            Some(0) => Err(StoreError("store unavailable".to_string())),
            Some(remaining) => {
                *remaining -= 1;
                Ok(())
            }
        }
    }
}

impl MemoryStore {
    /// Store that serves `calls` operations and then fails every subsequent
    /// one, reads and writes alike.
    pub fn failing_after(calls: u64) -> Self {
        Self {
            inner: Mutex::new(MemoryInner {
                budget: Some(calls),
                ..MemoryInner::default()
            }),
        }
    }

    /// Lift the call budget again so a test can inspect what was committed
    /// before the outage.
    pub async fn recover(&self) {
        self.inner.lock().await.budget = None;
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_int(&self, key: &str) -> Result<Option<i64>, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.charge()?;
        Ok(inner.ints.get(key).copied())
    }

    async fn set_int(&self, key: &str, value: i64) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.charge()?;
        inner.ints.insert(key.to_string(), value);
        Ok(())
    }

    async fn incr_by(&self, key: &str, delta: i64) -> Result<i64, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.charge()?;
        let slot = inner.ints.entry(key.to_string()).or_insert(0);
        *slot += delta;
        Ok(*slot)
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.charge()?;
        inner
            .sets
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string());
        Ok(())
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.charge()?;
        if let Some(set) = inner.sets.get_mut(key) {
            set.remove(member);
        }
        Ok(())
    }

    async fn set_contains(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.charge()?;
        Ok(inner.sets.get(key).is_some_and(|set| set.contains(member)))
    }

    async fn set_len(&self, key: &str) -> Result<u64, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.charge()?;
        Ok(inner.sets.get(key).map_or(0, |set| set.len() as u64))
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, i64>, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.charge()?;
        Ok(inner.hashes.get(key).cloned().unwrap_or_default())
    }

    async fn hash_incr(&self, key: &str, field: &str, delta: i64) -> Result<i64, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.charge()?;
        let slot = inner
            .hashes
            .entry(key.to_string())
            .or_default()
            .entry(field.to_string())
            .or_insert(0);
        *slot += delta;
        Ok(*slot)
    }
}

//! Redis remote backend

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisError};
use tracing::info;

use crate::backend::{BackendResult, RemoteBackend};
use crate::cache::duration_ms;
use crate::error::BackendError;

/// Remote backend talking to a Redis server.
#[derive(Clone)]
pub struct RedisBackend {
    connection: ConnectionManager,
}

impl RedisBackend {
    /// Connects to the server at `url` and checks it answers.
    pub async fn connect(url: &str) -> BackendResult<Self> {
        let client = Client::open(url).map_err(classify)?;
        let mut connection = ConnectionManager::new(client).await.map_err(classify)?;
        redis::cmd("PING")
            .query_async::<()>(&mut connection)
            .await
            .map_err(classify)?;

        info!("Connected to Redis backend");
        Ok(Self { connection })
    }
}

/// Connection-level failures mean unreachable, everything else is a reply
/// we could not use.
fn classify(err: RedisError) -> BackendError {
    if err.is_io_error() || err.is_connection_dropped() || err.is_timeout() {
        BackendError::Unavailable(err.to_string())
    } else {
        BackendError::Indeterminate(err.to_string())
    }
}

/// Redis rejects a zero PX, so sub-millisecond TTLs are rounded up.
fn ttl_millis(ttl: Duration) -> u64 {
    duration_ms(ttl).max(1)
}

/// Escapes glob metacharacters so the prefix matches literally.
fn escape_glob(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len() + 1);
    for ch in prefix.chars() {
        if matches!(ch, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('*');
    escaped
}

#[async_trait]
impl RemoteBackend for RedisBackend {
    async fn get(&self, key: &str) -> BackendResult<Option<String>> {
        let mut conn = self.connection.clone();
        conn.get(key).await.map_err(classify)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> BackendResult<()> {
        let mut conn = self.connection.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ttl) = ttl {
            cmd.arg("PX").arg(ttl_millis(ttl));
        }
        cmd.query_async::<()>(&mut conn).await.map_err(classify)
    }

    async fn delete(&self, keys: &[String]) -> BackendResult<usize> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.connection.clone();
        conn.del(keys).await.map_err(classify)
    }

    async fn keys_with_prefix(&self, prefix: &str) -> BackendResult<Vec<String>> {
        let mut conn = self.connection.clone();
        conn.keys(escape_glob(prefix)).await.map_err(classify)
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> BackendResult<bool> {
        let mut conn = self.connection.clone();
        // SET .. NX replies OK when written and nil otherwise
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async(&mut conn)
            .await
            .map_err(classify)?;
        Ok(reply.is_some())
    }
}

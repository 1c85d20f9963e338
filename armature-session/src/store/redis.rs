//! Redis session table.

use crate::error::SessionResult;
use crate::store::SessionTable;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::debug;

/// Session rows as Redis string keys (`<namespace>:<id>`).
///
/// Rows carry the record's expiry (`EXAT`) so abandoned sessions age out of
/// Redis on their own; rows for sessions without expiry are kept until
/// deleted.
///
/// # Examples
///
/// ```no_run
/// use armature_session::{DurableStore, RedisTable};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let table = RedisTable::connect("redis://localhost:6379")
///         .await?
///         .with_namespace("myapp:session");
///     let store = DurableStore::new(table);
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct RedisTable {
    conn: ConnectionManager,
    namespace: String,
}

impl RedisTable {
    /// Connect to Redis.
    ///
    /// # Arguments
    ///
    /// * `url` - Redis connection URL (e.g., "redis://localhost:6379")
    pub async fn connect(url: &str) -> SessionResult<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        debug!("Connected Redis session table");
        Ok(Self::new(conn))
    }

    /// Use an existing connection manager.
    pub fn new(conn: ConnectionManager) -> Self {
        Self {
            conn,
            namespace: "session".to_string(),
        }
    }

    /// Set the key namespace/prefix.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Get the key for a given session ID.
    fn session_key(&self, session_id: &str) -> String {
        session_key(&self.namespace, session_id)
    }

    /// `SET key payload <condition> [EXAT ts]`, returning whether it was applied.
    async fn set_if(
        &self,
        condition: &str,
        id: &str,
        payload: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> SessionResult<bool> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(self.session_key(id)).arg(payload).arg(condition);
        if let Some(expires_at) = expires_at {
            // EXAT must be in the future; an expired row is dropped right away
            cmd.arg("EXAT").arg(expires_at.timestamp().max(Utc::now().timestamp() + 1));
        }

        let reply: Option<String> = cmd.query_async(&mut conn).await?;
        Ok(reply.is_some())
    }
}

fn session_key(namespace: &str, session_id: &str) -> String {
    format!("{}:{}", namespace, session_id)
}

#[async_trait]
impl SessionTable for RedisTable {
    async fn load(&self, id: &str) -> SessionResult<Option<String>> {
        let mut conn = self.conn.clone();
        let data: Option<String> = conn.get(self.session_key(id)).await?;
        Ok(data)
    }

    async fn insert(
        &self,
        id: &str,
        payload: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> SessionResult<bool> {
        self.set_if("NX", id, payload, expires_at).await
    }

    async fn update(
        &self,
        id: &str,
        payload: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> SessionResult<bool> {
        self.set_if("XX", id, payload, expires_at).await
    }

    async fn remove(&self, id: &str) -> SessionResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(self.session_key(id)).await?;
        Ok(())
    }

    fn table_type(&self) -> &'static str {
        "redis"
    }
}

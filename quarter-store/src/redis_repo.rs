use async_trait::async_trait;
use quarter_core::repository::StoreResult;
use quarter_core::{SlotGuard, SlotKey, SlotLocks};
use redis::aio::MultiplexedConnection;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

const RETRY_INTERVAL: Duration = Duration::from_millis(25);

// Delete only if we still own the key.
const RELEASE_SCRIPT: &str = r#"
    if redis.call("GET", KEYS[1]) == ARGV[1] then
        return redis.call("DEL", KEYS[1])
    else
        return 0
    end
"#;

/// Slot locks shared by every process talking to the same Redis.
#[derive(Clone)]
pub struct RedisSlotLocks {
    client: redis::Client,
    ttl: Duration,
}

impl RedisSlotLocks {
    pub fn new(connection_string: &str, ttl: Duration) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client, ttl })
    }

    async fn try_acquire(
        &self,
        conn: &mut MultiplexedConnection,
        key: &str,
        token: &str,
    ) -> Result<bool, redis::RedisError> {
        // SET NX: Only set if key does not exist
        let result: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(token)
            .arg("NX")
            .arg("PX")
            .arg(self.ttl.as_millis() as u64)
            .query_async(conn)
            .await?;

        Ok(result.is_some())
    }
}

pub fn lock_key(key: &SlotKey) -> String {
    format!("slot:{}", key)
}

#[async_trait]
impl SlotLocks for RedisSlotLocks {
    async fn acquire(&self, key: SlotKey) -> StoreResult<SlotGuard> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = lock_key(&key);
        let token = Uuid::new_v4().to_string();

        while !self.try_acquire(&mut conn, &key, &token).await? {
            tokio::time::sleep(RETRY_INTERVAL).await;
        }

        debug!(%key, "Slot lock acquired");
        Ok(SlotGuard::new(RedisLockRelease { conn, key, token }))
    }
}

struct RedisLockRelease {
    conn: MultiplexedConnection,
    key: String,
    token: String,
}

impl Drop for RedisLockRelease {
    fn drop(&mut self) {
        let mut conn = self.conn.clone();
        let key = std::mem::take(&mut self.key);
        let token = std::mem::take(&mut self.token);

        // The TTL frees the key if there is no runtime left to release it.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                let released: Result<i64, redis::RedisError> = redis::Script::new(RELEASE_SCRIPT)
                    .key(&key)
                    .arg(&token)
                    .invoke_async(&mut conn)
                    .await;
                if let Err(e) = released {
                    warn!(%key, error = %e, "Failed to release slot lock");
                }
            });
        }
    }
}

use async_trait::async_trait;
use std::time::Duration;
use tariff_core::{CoreError, CoreResult, ScopeKey, ScopeLock};
use tracing::{debug, info};
use uuid::Uuid;

/// Scope leases shared across API instances.
///
/// A lease is a `SET NX EX` key holding the writer id; release only deletes
/// the key if that writer still owns it.
#[derive(Clone)]
pub struct RedisScopeLock {
    client: redis::Client,
}

impl RedisScopeLock {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        info!("Redis scope lock configured");
        Ok(Self { client })
    }

    fn lock_key(key: &ScopeKey) -> String {
        format!("tariff:lock:{}", key)
    }
}

fn unavailable(e: redis::RedisError) -> CoreError {
    CoreError::ConcurrentModification(format!("lock backend unavailable: {}", e))
}

#[async_trait]
impl ScopeLock for RedisScopeLock {
    async fn try_acquire(&self, key: &ScopeKey, holder: Uuid, lease: Duration) -> CoreResult<bool> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(unavailable)?;
        let lock_key = Self::lock_key(key);
        let holder = holder.to_string();

        // Re-entrant for the current holder: refresh instead of failing
        let script = redis::Script::new(
            r#"
            local owner = redis.call("GET", KEYS[1])
            if owner == ARGV[1] then
                redis.call("EXPIRE", KEYS[1], ARGV[2])
                return 1
            end
            if redis.call("SET", KEYS[1], ARGV[1], "NX", "EX", ARGV[2]) then
                return 1
            end
            return 0
        "#,
        );
        let acquired: i32 = script
            .key(&lock_key)
            .arg(&holder)
            .arg(lease.as_secs().max(1))
            .invoke_async(&mut conn)
            .await
            .map_err(unavailable)?;

        debug!("Lease {} for {}: {}", lock_key, holder, acquired == 1);
        Ok(acquired == 1)
    }

    async fn release(&self, key: &ScopeKey, holder: Uuid) -> CoreResult<()> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| CoreError::InternalError(e.to_string()))?;

        let script = redis::Script::new(
            r#"
            if redis.call("GET", KEYS[1]) == ARGV[1] then
                return redis.call("DEL", KEYS[1])
            else
                return 0
            end
        "#,
        );
        let _: i32 = script
            .key(Self::lock_key(key))
            .arg(holder.to_string())
            .invoke_async(&mut conn)
            .await
            .map_err(|e| CoreError::InternalError(e.to_string()))?;
        Ok(())
    }
}

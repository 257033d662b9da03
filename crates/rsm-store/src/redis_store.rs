//! Redis implementation of [`SessionStore`] over a `deadpool-redis` pool.

use deadpool_redis::redis::{self, RedisError};
use deadpool_redis::{Connection, Pool, PoolConfig, Runtime, Timeouts};
use tokio::sync::OnceCell;

use crate::{SessionStore, StoreConfig, StoreError, TtlStatus};

/// `HSETNX` followed by `EXPIRE`, run server-side so no other client can
/// observe the field without its TTL, and so only the winner of the
/// `HSETNX` touches the TTL.
///
/// Sent with plain `EVAL` every time. The scripts are a few dozen bytes,
/// so there is nothing worth caching with `EVALSHA`.
const CLAIM_SCRIPT: &str = r"
if redis.call('HSETNX', KEYS[1], ARGV[1], ARGV[2]) == 1 then
    redis.call('EXPIRE', KEYS[1], ARGV[3])
    return 1
end
return 0
";

/// `HSET` plus `EXPIRE`, only while the key exists. A lapsed session
/// stays lapsed instead of reappearing without its claim marker.
const WRITE_IF_EXISTS_SCRIPT: &str = r"
if redis.call('EXISTS', KEYS[1]) == 1 then
    redis.call('HSET', KEYS[1], ARGV[1], ARGV[2])
    redis.call('EXPIRE', KEYS[1], ARGV[3])
    return 1
end
return 0
";

/// A [`SessionStore`] backed by a Redis server.
///
/// The connection pool is built on the first command, not in
/// [`RedisStore::new`], so a host can construct the store before Redis
/// is reachable and configuration errors show up on first use.
///
/// Keys passed in are session ids; [`StoreConfig::key_prefix`] is
/// prepended before they reach Redis.
pub struct RedisStore {
    config: StoreConfig,
    pool: OnceCell<Pool>,
}

impl RedisStore {
    /// Creates a store that will connect using `config`.
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            pool: OnceCell::new(),
        }
    }

    /// The settings this store connects with.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Takes a connection from the pool, building the pool first if
    /// this is the first command.
    async fn conn(&self) -> Result<Connection, StoreError> {
        let pool = self
            .pool
            .get_or_try_init(|| async { build_pool(&self.config) })
            .await?;

        pool.get().await.map_err(|e| {
            tracing::error!(
                host = %self.config.host,
                port = self.config.port,
                error = %e,
                "redis connection unavailable"
            );
            StoreError::Unavailable(e.to_string())
        })
    }

    fn key(&self, id: &str) -> String {
        self.config.key_for(id)
    }
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The password stays out of logs.
        f.debug_struct("RedisStore")
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .field("database", &self.config.database)
            .field("connected", &self.pool.initialized())
            .finish()
    }
}

fn build_pool(config: &StoreConfig) -> Result<Pool, StoreError> {
    config.validate()?;

    let info = redis::ConnectionInfo {
        addr: redis::ConnectionAddr::Tcp(config.host.clone(), config.port),
        redis: redis::RedisConnectionInfo {
            db: config.database,
            password: config.password.clone(),
            ..Default::default()
        },
    };

    let mut pool_config = PoolConfig::new(config.pool_size);
    pool_config.timeouts = Timeouts {
        wait: Some(config.timeout()),
        create: Some(config.timeout()),
        recycle: Some(config.timeout()),
    };

    let mut cfg = deadpool_redis::Config::from_connection_info(info);
    cfg.pool = Some(pool_config);

    tracing::info!(
        host = %config.host,
        port = config.port,
        database = config.database,
        pool_size = config.pool_size,
        "initializing redis session store"
    );

    cfg.create_pool(Some(Runtime::Tokio1))
        .map_err(|e| StoreError::InvalidConfig(e.to_string()))
}

/// Splits Redis errors into "couldn't talk to the server" and
/// "the server said no".
fn command_error(err: RedisError) -> StoreError {
    if err.is_io_error()
        || err.is_connection_dropped()
        || err.is_connection_refusal()
        || err.is_timeout()
    {
        tracing::error!(error = %err, "redis connection lost");
        StoreError::Unavailable(err.to_string())
    } else {
        StoreError::Command(err.to_string())
    }
}

impl SessionStore for RedisStore {
    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn().await?;
        redis::cmd("EXISTS")
            .arg(self.key(key))
            .query_async(&mut conn)
            .await
            .map_err(command_error)
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn().await?;
        let removed: i64 = redis::cmd("DEL")
            .arg(self.key(key))
            .query_async(&mut conn)
            .await
            .map_err(command_error)?;
        Ok(removed > 0)
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let mut conn = self.conn().await?;
        redis::cmd("GET")
            .arg(self.key(key))
            .query_async(&mut conn)
            .await
            .map_err(command_error)
    }

    async fn set_ex(
        &self,
        key: &str,
        value: &[u8],
        ttl_secs: u64,
    ) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        redis::cmd("SET")
            .arg(self.key(key))
            .arg(value)
            .arg("EX")
            .arg(ttl_secs)
            .query_async(&mut conn)
            .await
            .map_err(command_error)
    }

    async fn hset_nx_ex(
        &self,
        key: &str,
        field: &str,
        value: &[u8],
        ttl_secs: u64,
    ) -> Result<bool, StoreError> {
        let mut conn = self.conn().await?;
        let claimed: i64 = redis::cmd("EVAL")
            .arg(CLAIM_SCRIPT)
            .arg(1)
            .arg(self.key(key))
            .arg(field)
            .arg(value)
            .arg(ttl_secs)
            .query_async(&mut conn)
            .await
            .map_err(command_error)?;
        Ok(claimed == 1)
    }

    async fn hget(
        &self,
        key: &str,
        field: &str,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        let mut conn = self.conn().await?;
        redis::cmd("HGET")
            .arg(self.key(key))
            .arg(field)
            .query_async(&mut conn)
            .await
            .map_err(command_error)
    }

    async fn hset(
        &self,
        key: &str,
        field: &str,
        value: &[u8],
    ) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        redis::cmd("HSET")
            .arg(self.key(key))
            .arg(field)
            .arg(value)
            .query_async(&mut conn)
            .await
            .map_err(command_error)
    }

    async fn hset_xx_ex(
        &self,
        key: &str,
        field: &str,
        value: &[u8],
        ttl_secs: u64,
    ) -> Result<bool, StoreError> {
        let mut conn = self.conn().await?;
        let written: i64 = redis::cmd("EVAL")
            .arg(WRITE_IF_EXISTS_SCRIPT)
            .arg(1)
            .arg(self.key(key))
            .arg(field)
            .arg(value)
            .arg(ttl_secs)
            .query_async(&mut conn)
            .await
            .map_err(command_error)?;
        Ok(written == 1)
    }

    async fn hdel(&self, key: &str, field: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn().await?;
        let removed: i64 = redis::cmd("HDEL")
            .arg(self.key(key))
            .arg(field)
            .query_async(&mut conn)
            .await
            .map_err(command_error)?;
        Ok(removed > 0)
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<bool, StoreError> {
        let mut conn = self.conn().await?;
        redis::cmd("EXPIRE")
            .arg(self.key(key))
            .arg(ttl_secs)
            .query_async(&mut conn)
            .await
            .map_err(command_error)
    }

    async fn ttl(&self, key: &str) -> Result<TtlStatus, StoreError> {
        let mut conn = self.conn().await?;
        let secs: i64 = redis::cmd("TTL")
            .arg(self.key(key))
            .query_async(&mut conn)
            .await
            .map_err(command_error)?;
        Ok(match secs {
            -2 => TtlStatus::Missing,
            -1 => TtlStatus::Persistent,
            n => TtlStatus::Expires(n.max(0) as u64),
        })
    }
}

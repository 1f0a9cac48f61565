pub mod app_config;
pub mod memory;
pub mod redis_repo;
pub mod seed;

pub use app_config::{Config, LockBackend};
pub use memory::InMemoryStore;
pub use redis_repo::RedisScopeLock;
pub use seed::StoreSeed;

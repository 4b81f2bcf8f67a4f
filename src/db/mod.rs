pub mod library;
pub mod memory;
pub mod postgres;
pub mod redis;

pub use library::{LibraryDocument, PersistedLibrary};
pub use memory::InMemoryLibrary;
pub use postgres::{create_pool, PgLibrary};
pub use redis::create_redis_client;
pub use redis::{Cache, CacheWriterHandle};
pub use redis::CacheKey;

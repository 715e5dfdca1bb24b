mod memory;
mod redis;

pub use self::memory::InMemorySetStore;
pub use self::redis::RedisSetStore;

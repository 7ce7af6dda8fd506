//! Infrastructure layer
//!
//! External concerns the proxy depends on: the Redis attempt store and the
//! log message catalogue.

pub mod log_messages;
pub mod redis_store;

pub use redis_store::RedisStore;

//! Queue driver implementations.

pub mod file;
pub mod in_memory;
pub mod rabbitmq;
pub mod redis;

pub use file::FileQueue;
pub use in_memory::InMemoryQueue;
pub use rabbitmq::RabbitMqQueue;
pub use self::redis::RedisQueue;

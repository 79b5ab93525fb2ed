//! # Messaging Module
//!
//! Durable update queue: the driver contract, four interchangeable
//! backends, enum dispatch over them, and the connectivity-gating manager.

pub mod codec;
pub mod errors;
pub mod manager;
pub mod provider;
pub mod providers;
pub mod traits;

pub use errors::QueueError;
pub use manager::QueueManager;
pub use provider::QueueProvider;
pub use providers::{FileQueue, InMemoryQueue, RabbitMqQueue, RedisQueue};
pub use traits::{Delivery, QueueDriver, ReceiptHandle};

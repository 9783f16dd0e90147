//! Worker pool: fixed set of workers, reservation guard, FIFO wait queue
//!
//! This module contains:
//! - `WorkerPool`, which owns the workers and arbitrates access to them
//! - `Reservation`, the guard that returns a worker to the pool
//! - `PoolEvent`, the lifecycle notifications published to subscribers

mod events;
mod reservation;
mod worker_pool;

pub use events::PoolEvent;
pub use reservation::Reservation;
pub use worker_pool::{PoolSettings, WorkerPool};

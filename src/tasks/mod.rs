//! Background Tasks Module
//!
//! Contains optional background tasks for embedders running a tokio runtime.
//!
//! # Tasks
//! - Expiration sweep: Reclaims expired entries while the cache sits idle

mod sweep;

pub use sweep::{spawn_sweep_task, spawn_sweep_task_from_config};

//! Core services implementing the business logic.
//!
//! This module contains the main service implementations:
//! - `backoff`: Capped exponential retry with cancellable sleeps
//! - `blockchain`: Node clients, transports and canonical unification
//! - `blockwatcher`: Following networks and emitting irreversible blocks
//! - `dispatcher`: Dynamically sized worker pool
//! - `pipeline`: Optional block transforms ahead of dispatch
//! - `sink`: Block delivery to webhooks, Pub/Sub topics and files

pub mod backoff;
pub mod blockchain;
pub mod blockwatcher;
pub mod dispatcher;
pub mod pipeline;
pub mod sink;

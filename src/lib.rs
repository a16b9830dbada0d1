//! # hydra-pool-factory
//!
//! Registry and batch orchestrator for per-collection NFT staking pools.
//!
//! The factory keeps a directory mapping each NFT collection to the staking
//! pool endpoint that serves it, enforces a single administrative principal
//! on every mutation, and fans claim and emergency-unstake calls out to many
//! endpoints at once. One failing endpoint never aborts a batch. Pool
//! creation validates its input and then reports that it is disabled.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── WS Handler (ws/)
//!     │
//!     ├── PoolFactory (service/)
//!     ├── EventBus (domain/)
//!     │
//!     ├── PoolDirectory, AccessControl, ReentrancyGuard (domain/)
//!     ├── PoolEndpoint, CollectionContract, Environment (endpoint/)
//!     │
//!     └── PostgreSQL Persistence
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod endpoint;
pub mod error;
pub mod persistence;
pub mod service;
pub mod ws;

//! # voting-node-store
//!
//! Event database access layer for voting nodes.
//!
//! Mediates every read and write a voting node performs against the
//! PostgreSQL event database: the upcoming voting event, per-node key
//! registrations, the leader roster, the proposal list and the generated
//! genesis block ("block0").
//!
//! ## Architecture
//!
//! ```text
//! Leader election / block0 assembly (callers)
//!     │
//!     ├── EventStore (persistence/)
//!     │     ├── HostIdentity (host)
//!     │     └── Event / HostInfo / LeaderHostInfo / Proposal (models)
//!     │
//!     └── PostgreSQL (event, voting_node, proposal)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use voting_node_store::{EventStore, HostIdentity, StoreConfig};
//!
//! # async fn run() -> Result<(), voting_node_store::StoreError> {
//! let config = StoreConfig::from_env();
//! let store = EventStore::new(&config.database_url, HostIdentity::from_config(&config)?);
//! store.connect().await?;
//! let event = store.fetch_upcoming_event().await?;
//! let leaders = store.fetch_leaders_host_info().await?;
//! println!("event {} with {} leader peers", event.name, leaders.len());
//! store.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod host;
pub mod persistence;
pub mod telemetry;

pub use config::StoreConfig;
pub use error::{Result, StoreError};
pub use host::HostIdentity;
pub use persistence::{Event, EventStore, HostInfo, LeaderHostInfo, Proposal};

//! Persistence layer: PostgreSQL event database access.
//!
//! [`EventStore`] owns one connection and exposes the entity-shaped reads
//! and writes a voting node needs: the upcoming event, node registrations,
//! the leader roster, the proposal list and the block0 artifact.

pub mod models;
pub mod postgres;

pub use models::{Event, HostInfo, LeaderHostInfo, Proposal};
pub use postgres::EventStore;

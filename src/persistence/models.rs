//! Database models for events, node registrations and proposals.
//!
//! Every entity is built field by field from a [`PgRow`]; a missing column
//! or a column of the wrong type fails with [`StoreError::RowShape`].

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use sqlx::postgres::PgRow;

use crate::error::{Result, StoreError};

/// Reads column `column` of `row`, tagging decode failures with `entity`.
fn column<'r, T>(row: &'r PgRow, entity: &'static str, column: &str) -> Result<T>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(column)
        .map_err(|source| StoreError::RowShape { entity, source })
}

/// Reads a nullable `TIMESTAMP` column holding a UTC instant.
fn utc_column(row: &PgRow, entity: &'static str, name: &str) -> Result<Option<DateTime<Utc>>> {
    let value: Option<NaiveDateTime> = column(row, entity, name)?;
    Ok(value.map(|t| t.and_utc()))
}

/// A voting event row from the `event` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Row identifier.
    pub row_id: i32,
    /// Event name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Start of the event as a whole.
    pub start_time: Option<DateTime<Utc>>,
    /// End of the event as a whole.
    pub end_time: Option<DateTime<Utc>>,
    /// Start of the voting window.
    pub voting_start: Option<DateTime<Utc>>,
    /// End of the voting window.
    pub voting_end: Option<DateTime<Utc>>,
    /// End of the tally period.
    pub tallying_end: Option<DateTime<Utc>>,
    /// Serialized genesis block, once generated.
    pub block0: Option<Vec<u8>>,
    /// Hash of [`Event::block0`].
    pub block0_hash: Option<String>,
    /// Number of committee members.
    pub committee_size: i32,
    /// Committee members required to decrypt the tally.
    pub committee_threshold: i32,
    /// Extra event metadata.
    pub extra: Option<serde_json::Value>,
}

impl Event {
    pub(crate) const ENTITY: &'static str = "event";

    /// Maps an `event` row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::RowShape`] on a missing or mistyped column.
    pub fn from_row(row: &PgRow) -> Result<Self> {
        let e = Self::ENTITY;
        Ok(Self {
            row_id: column(row, e, "row_id")?,
            name: column(row, e, "name")?,
            description: column(row, e, "description")?,
            start_time: utc_column(row, e, "start_time")?,
            end_time: utc_column(row, e, "end_time")?,
            voting_start: utc_column(row, e, "voting_start")?,
            voting_end: utc_column(row, e, "voting_end")?,
            tallying_end: utc_column(row, e, "tallying_end")?,
            block0: column(row, e, "block0")?,
            block0_hash: column(row, e, "block0_hash")?,
            committee_size: column(row, e, "committee_size")?,
            committee_threshold: column(row, e, "committee_threshold")?,
            extra: column(row, e, "extra")?,
        })
    }

    /// Returns `true` once the genesis block has been attached.
    #[must_use]
    pub fn has_block0(&self) -> bool {
        self.block0.is_some()
    }
}

/// A voting node registration row from the `voting_node` table.
///
/// Identity key is `(hostname, event)`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostInfo {
    /// Node hostname.
    pub hostname: String,
    /// Row identifier of the [`Event`] this node takes part in.
    pub event: i32,
    /// Node secret key.
    pub seckey: String,
    /// Node public key.
    pub pubkey: String,
    /// Node network (p2p) key.
    pub netkey: String,
}

impl HostInfo {
    pub(crate) const ENTITY: &'static str = "voting_node";

    /// Maps a `voting_node` row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::RowShape`] on a missing or mistyped column.
    pub fn from_row(row: &PgRow) -> Result<Self> {
        let e = Self::ENTITY;
        Ok(Self {
            hostname: column(row, e, "hostname")?,
            event: column(row, e, "event")?,
            seckey: column(row, e, "seckey")?,
            pubkey: column(row, e, "pubkey")?,
            netkey: column(row, e, "netkey")?,
        })
    }
}

impl fmt::Debug for HostInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostInfo")
            .field("hostname", &self.hostname)
            .field("event", &self.event)
            .field("seckey", &"<redacted>")
            .field("pubkey", &self.pubkey)
            .field("netkey", &self.netkey)
            .finish()
    }
}

/// Hostname and public key of a leader-class peer.
///
/// Always derived from `voting_node`, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderHostInfo {
    /// Peer hostname.
    pub hostname: String,
    /// Peer public key.
    pub pubkey: String,
}

impl LeaderHostInfo {
    pub(crate) const ENTITY: &'static str = "leader host info";

    /// Maps a `(hostname, pubkey)` projection row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::RowShape`] on a missing or mistyped column.
    pub fn from_row(row: &PgRow) -> Result<Self> {
        let e = Self::ENTITY;
        Ok(Self {
            hostname: column(row, e, "hostname")?,
            pubkey: column(row, e, "pubkey")?,
        })
    }
}

/// A proposal row from the `proposal` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    /// Row identifier.
    pub row_id: i32,
    /// Proposal identifier; ballots are assembled in ascending `id` order.
    pub id: i32,
    /// Objective (challenge) the proposal belongs to.
    pub objective: i32,
    /// Title.
    pub title: String,
    /// Summary.
    pub summary: String,
    /// Category label.
    pub category: String,
    /// Proposer public key.
    pub public_key: String,
    /// Requested funds.
    pub funds: i64,
    /// Proposal URL.
    pub url: String,
    /// Attached files URL.
    pub files_url: String,
    /// Impact score.
    pub impact_score: i64,
    /// Extra proposal metadata.
    pub extra: Option<serde_json::Value>,
    /// Proposer name.
    pub proposer_name: String,
    /// Proposer contact.
    pub proposer_contact: String,
    /// Proposer URL.
    pub proposer_url: String,
    /// Proposer's relevant experience.
    pub proposer_relevant_experience: String,
    /// On-chain proposal identifier.
    pub bb_proposal_id: Option<Vec<u8>>,
    /// Vote options offered on the ballot.
    pub bb_vote_options: Option<Vec<String>>,
}

impl Proposal {
    pub(crate) const ENTITY: &'static str = "proposal";

    /// Maps a `proposal` row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::RowShape`] on a missing or mistyped column.
    pub fn from_row(row: &PgRow) -> Result<Self> {
        let e = Self::ENTITY;
        Ok(Self {
            row_id: column(row, e, "row_id")?,
            id: column(row, e, "id")?,
            objective: column(row, e, "objective")?,
            title: column(row, e, "title")?,
            summary: column(row, e, "summary")?,
            category: column(row, e, "category")?,
            public_key: column(row, e, "public_key")?,
            funds: column(row, e, "funds")?,
            url: column(row, e, "url")?,
            files_url: column(row, e, "files_url")?,
            impact_score: column(row, e, "impact_score")?,
            extra: column(row, e, "extra")?,
            proposer_name: column(row, e, "proposer_name")?,
            proposer_contact: column(row, e, "proposer_contact")?,
            proposer_url: column(row, e, "proposer_url")?,
            proposer_relevant_experience: column(row, e, "proposer_relevant_experience")?,
            bb_proposal_id: column(row, e, "bb_proposal_id")?,
            bb_vote_options: column(row, e, "bb_vote_options")?,
        })
    }
}

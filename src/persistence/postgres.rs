//! PostgreSQL implementation of the event store.

use chrono::Utc;
use sqlx::{Connection, PgConnection};
use tokio::sync::{Mutex, MutexGuard};
use tracing::Span;

use super::models::{Event, HostInfo, LeaderHostInfo, Proposal};
use crate::error::{Result, StoreError};
use crate::host::HostIdentity;

const UPCOMING_EVENT_QUERY: &str = "SELECT * FROM event WHERE voting_start > $1 \
     ORDER BY voting_start ASC, row_id ASC LIMIT 1";

const LEADER_HOST_INFO_QUERY: &str =
    "SELECT * FROM voting_node WHERE hostname = $1 AND event = $2";

const INSERT_HOST_INFO_QUERY: &str = "INSERT INTO voting_node (hostname, event, seckey, pubkey, netkey) \
     VALUES ($1, $2, $3, $4, $5)";

const LEADERS_HOST_INFO_QUERY: &str =
    "SELECT hostname, pubkey FROM voting_node WHERE hostname != $1 AND hostname ~ $2";

const PROPOSALS_QUERY: &str = "SELECT * FROM proposal ORDER BY id ASC, row_id ASC";

const INSERT_BLOCK0_QUERY: &str =
    "UPDATE event SET block0 = $1, block0_hash = $2 WHERE row_id = $3 RETURNING name";

/// Event store backed by a single PostgreSQL connection.
///
/// Created unconnected with [`EventStore::new`]; [`EventStore::connect`]
/// must succeed before any query is issued. The connection sits behind a
/// [`tokio::sync::Mutex`], so callers sharing one store through an `Arc`
/// have their operations serialized. Every operation is a single
/// statement; no transaction spans two calls.
#[derive(Debug)]
pub struct EventStore {
    database_url: String,
    identity: HostIdentity,
    conn: Mutex<Option<PgConnection>>,
    span: Span,
}

impl EventStore {
    /// Creates an unconnected store for `database_url`.
    #[must_use]
    pub fn new(database_url: impl Into<String>, identity: HostIdentity) -> Self {
        let span = tracing::info_span!("event_store", hostname = %identity.hostname());
        Self {
            database_url: database_url.into(),
            identity,
            conn: Mutex::new(None),
            span,
        }
    }

    /// Replaces the span all store diagnostics are emitted under.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Local node identity used by host lookups.
    #[must_use]
    pub fn identity(&self) -> &HostIdentity {
        &self.identity
    }

    /// Opens the database connection.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Connection`] if the connection cannot be
    /// established or the store is already connected.
    pub async fn connect(&self) -> Result<()> {
        let mut guard = self.conn.lock().await;
        if guard.is_some() {
            return Err(StoreError::Connection("already connected".to_string()));
        }
        let conn = PgConnection::connect(&self.database_url)
            .await
            .map_err(|e| {
                StoreError::Connection(format!("failed to connect to the database: {e}"))
            })?;
        *guard = Some(conn);
        tracing::info!(parent: &self.span, "connected to event database");
        Ok(())
    }

    /// Closes the database connection. Does nothing if not connected.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Connection`] if the server-side close fails.
    /// The handle is released either way.
    pub async fn close(&self) -> Result<()> {
        let Some(conn) = self.conn.lock().await.take() else {
            return Ok(());
        };
        conn.close().await.map_err(|e| {
            StoreError::Connection(format!("failed to close the connection: {e}"))
        })?;
        tracing::info!(parent: &self.span, "event database connection closed");
        Ok(())
    }

    /// Returns `true` while a connection is held.
    pub async fn is_connected(&self) -> bool {
        self.conn.lock().await.is_some()
    }

    /// Applies the bundled schema migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotConnected`] before `connect`, and
    /// [`StoreError::Migration`] if a migration fails.
    pub async fn run_migrations(&self) -> Result<()> {
        let mut guard = self.connection().await?;
        let conn = guard.as_mut().ok_or(StoreError::NotConnected)?;
        sqlx::migrate!("./migrations").run(conn).await?;
        tracing::debug!(parent: &self.span, "event database migrations applied");
        Ok(())
    }

    /// Fetches the earliest event whose voting starts after now (UTC).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no such event exists and
    /// [`StoreError::Query`] on database failure.
    pub async fn fetch_upcoming_event(&self) -> Result<Event> {
        let now = Utc::now().naive_utc();
        let mut guard = self.connection().await?;
        let conn = guard.as_mut().ok_or(StoreError::NotConnected)?;

        let row = sqlx::query(UPCOMING_EVENT_QUERY)
            .bind(now)
            .fetch_optional(conn)
            .await
            .map_err(|e| StoreError::Query(format!("failed to fetch event from DB: {e}")))?
            .ok_or_else(|| StoreError::NotFound("no upcoming event found in DB".to_string()))?;

        Event::from_row(&row)
    }

    /// Fetches this node's registration for `event`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the node has no row for the
    /// event and [`StoreError::Query`] on database failure.
    pub async fn fetch_leader_host_info(&self, event: i32) -> Result<HostInfo> {
        let mut guard = self.connection().await?;
        let conn = guard.as_mut().ok_or(StoreError::NotConnected)?;

        let row = sqlx::query(LEADER_HOST_INFO_QUERY)
            .bind(self.identity.hostname())
            .bind(event)
            .fetch_optional(conn)
            .await
            .map_err(|e| StoreError::Query(format!("failed to fetch leader node info: {e}")))?
            .ok_or_else(|| {
                StoreError::NotFound(format!(
                    "no host info for '{}' in event {event}",
                    self.identity.hostname()
                ))
            })?;

        HostInfo::from_row(&row)
    }

    /// Registers a node for an event.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Insert`] if the database rejects the row or
    /// reports no row written.
    pub async fn insert_host_info(&self, host_info: &HostInfo) -> Result<()> {
        let mut guard = self.connection().await?;
        let conn = guard.as_mut().ok_or(StoreError::NotConnected)?;
        let h = host_info;

        let outcome = sqlx::query(INSERT_HOST_INFO_QUERY)
            .bind(&h.hostname)
            .bind(h.event)
            .bind(&h.seckey)
            .bind(&h.pubkey)
            .bind(&h.netkey)
            .execute(conn)
            .await
            .map_err(|e| {
                StoreError::Insert(format!("failed to insert '{}' info: {e}", h.hostname))
            })?;

        if outcome.rows_affected() == 0 {
            return Err(StoreError::Insert(format!(
                "failed to insert '{}' info: no row written",
                h.hostname
            )));
        }
        tracing::debug!(
            parent: &self.span,
            hostname = %h.hostname,
            event = h.event,
            rows = outcome.rows_affected(),
            "host info added"
        );
        Ok(())
    }

    /// Fetches hostname and public key of every leader-class peer,
    /// excluding this node, in the order the database returns them.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no peer matches and
    /// [`StoreError::Query`] on database failure.
    pub async fn fetch_leaders_host_info(&self) -> Result<Vec<LeaderHostInfo>> {
        let mut guard = self.connection().await?;
        let conn = guard.as_mut().ok_or(StoreError::NotConnected)?;

        let rows = sqlx::query(LEADERS_HOST_INFO_QUERY)
            .bind(self.identity.hostname())
            .bind(self.identity.leader_pattern())
            .fetch_all(conn)
            .await
            .map_err(|e| StoreError::Query(format!("DB error fetching leaders host info: {e}")))?;

        if rows.is_empty() {
            return Err(StoreError::NotFound(
                "no leader host info found in DB".to_string(),
            ));
        }

        rows.iter()
            .map(|row| -> Result<LeaderHostInfo> {
                let leader = LeaderHostInfo::from_row(row)?;
                tracing::debug!(
                    parent: &self.span,
                    hostname = %leader.hostname,
                    pubkey = %leader.pubkey,
                    "leader host info"
                );
                Ok(leader)
            })
            .collect()
    }

    /// Fetches all proposals in ascending `id` order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if there are no proposals and
    /// [`StoreError::Query`] on database failure.
    pub async fn fetch_proposals(&self) -> Result<Vec<Proposal>> {
        let mut guard = self.connection().await?;
        let conn = guard.as_mut().ok_or(StoreError::NotConnected)?;

        let rows = sqlx::query(PROPOSALS_QUERY)
            .fetch_all(conn)
            .await
            .map_err(|e| StoreError::Query(format!("DB error fetching proposals: {e}")))?;

        if rows.is_empty() {
            return Err(StoreError::NotFound("no proposals found in DB".to_string()));
        }
        tracing::debug!(parent: &self.span, count = rows.len(), "proposals retrieved from DB");

        rows.iter().map(Proposal::from_row).collect()
    }

    /// Attaches the genesis block and its hash to event `event`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Wrapped`] around [`StoreError::Update`] when
    /// the database rejects the write or no event has row id `event`, and
    /// around [`StoreError::NotConnected`] before `connect`.
    pub async fn insert_block0_info(
        &self,
        event: i32,
        block0: &[u8],
        block0_hash: &str,
    ) -> Result<()> {
        self.update_block0(event, block0, block0_hash)
            .await
            .map_err(|e| e.context("inserting block0 info went wrong"))
    }

    async fn update_block0(&self, event: i32, block0: &[u8], block0_hash: &str) -> Result<()> {
        let mut guard = self.connection().await?;
        let conn = guard.as_mut().ok_or(StoreError::NotConnected)?;

        let event_name = sqlx::query_scalar::<_, String>(INSERT_BLOCK0_QUERY)
            .bind(block0)
            .bind(block0_hash)
            .bind(event)
            .fetch_optional(conn)
            .await
            .map_err(|e| StoreError::Update(format!("failed to insert block0 info: {e}")))?
            .ok_or_else(|| {
                StoreError::Update(format!(
                    "failed to insert block0 info: no event with row_id {event}"
                ))
            })?;

        tracing::debug!(
            parent: &self.span,
            event,
            event_name = %event_name,
            bytes = block0.len(),
            "block0 info added to event"
        );
        Ok(())
    }

    /// Locks the connection slot, failing fast when nothing is connected.
    async fn connection(&self) -> Result<MutexGuard<'_, Option<PgConnection>>> {
        let guard = self.conn.lock().await;
        if guard.is_none() {
            return Err(StoreError::NotConnected);
        }
        Ok(guard)
    }
}

//! Event store error types.
//!
//! [`StoreError`] is the single error type returned by every store
//! operation. No operation retries or swallows a failure: every error is
//! raised to the caller, which decides whether to abort the voting round,
//! retry at a higher level, or escalate.

/// Error enum for the event store and its collaborators.
///
/// # Error Code Ranges
///
/// | Range     | Category                         |
/// |-----------|----------------------------------|
/// | 1000–1999 | Configuration / host identity    |
/// | 2000–2999 | Not found / empty result         |
/// | 3000–3999 | Connection and query failures    |
/// | 4000–4999 | Write failures                   |
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store handle could not be established or released.
    #[error("connection error: {0}")]
    Connection(String),

    /// An operation was issued before `connect` or after `close`.
    #[error("event store is not connected")]
    NotConnected,

    /// A required row or a nonempty result set was absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// The store reported a failure on a read.
    #[error("query error: {0}")]
    Query(String),

    /// A row did not have the columns or column types of its entity.
    #[error("unexpected {entity} row shape: {source}")]
    RowShape {
        /// Entity the row was being mapped into.
        entity: &'static str,
        /// Underlying column decode failure.
        #[source]
        source: sqlx::Error,
    },

    /// An insert reported no outcome.
    #[error("insert error: {0}")]
    Insert(String),

    /// An update reported no outcome.
    #[error("update error: {0}")]
    Update(String),

    /// A lower-level failure re-raised with added context.
    #[error("{context}: {source}")]
    Wrapped {
        /// Description of the operation that failed.
        context: String,
        /// The original failure.
        #[source]
        source: Box<StoreError>,
    },

    /// The leader-class hostname pattern is not a valid regular expression.
    #[error("invalid leader hostname pattern: {0}")]
    InvalidLeaderPattern(#[from] regex::Error),

    /// The leader-class pattern uses syntax PostgreSQL's `~` operator
    /// evaluates differently or rejects.
    #[error("leader hostname pattern uses syntax not supported by PostgreSQL: {0}")]
    UnportableLeaderPattern(String),

    /// The local hostname could not be resolved.
    #[error("hostname resolution failed: {0}")]
    Hostname(String),

    /// Applying the bundled schema migrations failed.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    /// Wraps `self` with a context message, keeping it as the error source.
    #[must_use]
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Wrapped {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Returns `true` if this error (or the error it wraps) reports a
    /// missing row or an empty result set.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Wrapped { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidLeaderPattern(_) => 1001,
            Self::Hostname(_) => 1002,
            Self::UnportableLeaderPattern(_) => 1003,
            Self::NotFound(_) => 2001,
            Self::Connection(_) => 3001,
            Self::NotConnected => 3002,
            Self::Query(_) => 3003,
            Self::RowShape { .. } => 3004,
            Self::Migration(_) => 3005,
            Self::Insert(_) => 4001,
            Self::Update(_) => 4002,
            Self::Wrapped { .. } => 4003,
        }
    }
}

/// Convenience result alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn wrapped_error_keeps_original_message_and_source() {
        let err = StoreError::Update("no event with row_id 7".to_string())
            .context("inserting block0 info went wrong");

        assert_eq!(
            err.to_string(),
            "inserting block0 info went wrong: update error: no event with row_id 7"
        );
        let source = err.source().map(ToString::to_string);
        assert_eq!(
            source.as_deref(),
            Some("update error: no event with row_id 7")
        );
    }

    #[test]
    fn not_found_is_detected_through_wrapping() {
        let err = StoreError::NotFound("no proposals found in DB".to_string());
        assert!(err.is_not_found());
        assert!(err.context("outer").is_not_found());
        assert!(!StoreError::NotConnected.is_not_found());
    }

    #[test]
    fn error_codes_follow_category_ranges() {
        assert_eq!(StoreError::NotFound(String::new()).error_code() / 1000, 2);
        assert_eq!(StoreError::Query(String::new()).error_code() / 1000, 3);
        assert_eq!(StoreError::NotConnected.error_code() / 1000, 3);
        assert_eq!(StoreError::Insert(String::new()).error_code() / 1000, 4);
        assert_eq!(StoreError::Hostname(String::new()).error_code() / 1000, 1);
        assert_eq!(
            StoreError::UnportableLeaderPattern(String::new()).error_code() / 1000,
            1
        );
    }
}

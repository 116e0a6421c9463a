//! Local node identity and the leader-class hostname pattern.
//!
//! [`HostIdentity`] is resolved once and handed to the event store. It
//! supplies the hostname used to look up this node's registration and to
//! exclude it from the leader roster.

use std::fmt;

use regex::Regex;

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};

/// Escapes the `regex` crate accepts that PostgreSQL's `~` operator either
/// rejects or reads differently (`\b` is a backspace there).
const UNPORTABLE_ESCAPES: &[char] = &['b', 'B', 'z', 'p', 'P'];

/// Group openers PostgreSQL rejects.
const UNPORTABLE_GROUPS: &[&str] = &["(?P<", "(?<"];

/// Finds the first construct in `pattern` that PostgreSQL evaluates
/// differently from the `regex` crate.
fn unportable_construct(pattern: &str) -> Option<String> {
    let mut chars = pattern.char_indices();
    while let Some((at, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, escaped)) if UNPORTABLE_ESCAPES.contains(&escaped) => {
                    return Some(format!("\\{escaped}"));
                }
                _ => {}
            },
            '(' => {
                let rest = pattern.get(at..).unwrap_or_default();
                if let Some(group) = UNPORTABLE_GROUPS.iter().find(|g| rest.starts_with(**g)) {
                    return Some((*group).to_string());
                }
            }
            _ => {}
        }
    }
    None
}

/// This node's hostname paired with the leader-class hostname pattern.
///
/// The pattern is matched locally with the `regex` crate and by the
/// database with PostgreSQL's `~` operator, so only the syntax both share
/// is accepted: anchors `^`/`$`, classes, repetition, alternation and
/// plain or `(?:...)` groups. Word boundaries (`\b`, `\B`), `\z`, Unicode
/// classes (`\p{..}`) and named groups are rejected.
#[derive(Clone)]
pub struct HostIdentity {
    hostname: String,
    leader_pattern: Regex,
}

impl HostIdentity {
    /// Creates an identity from an explicit hostname and pattern.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidLeaderPattern`] if `leader_pattern` is
    /// not a valid regular expression, and
    /// [`StoreError::UnportableLeaderPattern`] if it uses syntax PostgreSQL
    /// does not share.
    pub fn new(hostname: impl Into<String>, leader_pattern: &str) -> Result<Self> {
        if let Some(construct) = unportable_construct(leader_pattern) {
            return Err(StoreError::UnportableLeaderPattern(format!(
                "`{construct}` in `{leader_pattern}`"
            )));
        }
        Ok(Self {
            hostname: hostname.into(),
            leader_pattern: Regex::new(leader_pattern)?,
        })
    }

    /// Creates an identity for the machine this process runs on.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Hostname`] if the hostname cannot be read or
    /// is not valid UTF-8, and [`StoreError::InvalidLeaderPattern`] for a
    /// bad pattern.
    pub fn resolve(leader_pattern: &str) -> Result<Self> {
        let hostname = hostname::get()
            .map_err(|e| StoreError::Hostname(e.to_string()))?
            .into_string()
            .map_err(|raw| StoreError::Hostname(format!("non UTF-8 hostname: {raw:?}")))?;
        Self::new(hostname, leader_pattern)
    }

    /// Builds the identity described by `config`, resolving the machine
    /// hostname unless an override is configured.
    ///
    /// # Errors
    ///
    /// See [`HostIdentity::resolve`].
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        match &config.hostname {
            Some(hostname) => Self::new(hostname.clone(), &config.leader_pattern),
            None => Self::resolve(&config.leader_pattern),
        }
    }

    /// The local hostname.
    #[must_use]
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// The leader-class pattern as written.
    #[must_use]
    pub fn leader_pattern(&self) -> &str {
        self.leader_pattern.as_str()
    }

    /// Returns `true` if `hostname` belongs to the leader class.
    #[must_use]
    pub fn is_leader_host(&self, hostname: &str) -> bool {
        self.leader_pattern.is_match(hostname)
    }

    /// Returns `true` if this node is itself a leader-class host.
    #[must_use]
    pub fn is_leader(&self) -> bool {
        self.is_leader_host(&self.hostname)
    }
}

impl fmt::Debug for HostIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostIdentity")
            .field("hostname", &self.hostname)
            .field("leader_pattern", &self.leader_pattern.as_str())
            .finish()
    }
}

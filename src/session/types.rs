//! Session data types and the recognized key namespace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which backing store a record lives in.
///
/// The volatile store dies with the process; the durable store survives a
/// restart and is read by the authoritative state's rehydration logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Volatile,
    Durable,
}

/// Logical keys recognized by the session store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKey {
    /// Identity id of the logged-in user (the primary key for status reads).
    IdentityId,
    /// Identity profile payload.
    Profile,
    /// Access-scope payload.
    AccessScope,
    /// Access-scope id.
    AccessScopeId,
    /// Secondary profile payload.
    SecondaryProfile,
}

impl SessionKey {
    pub const ALL: [SessionKey; 5] = [
        SessionKey::IdentityId,
        SessionKey::Profile,
        SessionKey::AccessScope,
        SessionKey::AccessScopeId,
        SessionKey::SecondaryProfile,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionKey::IdentityId => "identity_id",
            SessionKey::Profile => "profile",
            SessionKey::AccessScope => "access_scope",
            SessionKey::AccessScopeId => "access_scope_id",
            SessionKey::SecondaryProfile => "secondary_profile",
        }
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One persisted value with its TTL window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub value: serde_json::Value,

    /// Record creation time.
    pub created_at: DateTime<Utc>,

    /// Record expiry time; always `created_at + TTL` at write time.
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(value: serde_json::Value, now: DateTime<Utc>, ttl_secs: u64) -> Self {
        Self {
            value,
            created_at: now,
            expires_at: now + chrono::Duration::seconds(ttl_secs as i64),
        }
    }

    /// Check if the record is expired at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Milliseconds until expiry, zero if already expired.
    pub fn remaining_ms(&self, now: DateTime<Utc>) -> u64 {
        (self.expires_at - now).num_milliseconds().max(0) as u64
    }
}

/// Fields accepted by login. All optional; only present fields are persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub identity_id: Option<String>,
    pub profile: Option<serde_json::Value>,
    pub access_scope_id: Option<String>,
    pub access_scope: Option<serde_json::Value>,
    pub secondary_profile: Option<serde_json::Value>,
}

impl SessionData {
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// The present fields, paired with the key each one persists under.
    pub fn entries(&self) -> Vec<(SessionKey, serde_json::Value)> {
        let mut entries = Vec::new();
        if let Some(ref id) = self.identity_id {
            entries.push((SessionKey::IdentityId, serde_json::Value::String(id.clone())));
        }
        if let Some(ref profile) = self.profile {
            entries.push((SessionKey::Profile, profile.clone()));
        }
        if let Some(ref id) = self.access_scope_id {
            entries.push((
                SessionKey::AccessScopeId,
                serde_json::Value::String(id.clone()),
            ));
        }
        if let Some(ref scope) = self.access_scope {
            entries.push((SessionKey::AccessScope, scope.clone()));
        }
        if let Some(ref profile) = self.secondary_profile {
            entries.push((SessionKey::SecondaryProfile, profile.clone()));
        }
        entries
    }
}

/// Snapshot returned by `SessionLifecycle::get_session_status`.
///
/// Used for countdown display, not for authorization decisions.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStatus {
    pub is_valid: bool,
    pub remaining_ms: u64,
    pub message: String,
}

/// How the user authenticated. Part of the bridge's arming triple and
/// mirrored into the durable flat keys for rehydration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginKind {
    Password,
    Sso,
}

impl std::fmt::Display for LoginKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoginKind::Password => write!(f, "password"),
            LoginKind::Sso => write!(f, "sso"),
        }
    }
}

//! Change detection for authoritative-state pushes.

use serde::{Deserialize, Serialize};

use crate::session::{LoginKind, SessionData};

/// The authoritative auth state tuple the shell exposes to the bridge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthSnapshot {
    pub is_authenticated: bool,
    pub login_kind: Option<LoginKind>,
    pub identity_id: Option<String>,
    pub profile: Option<serde_json::Value>,
    pub access_scope_id: Option<String>,
    pub access_scope: Option<serde_json::Value>,
    pub secondary_profile: Option<serde_json::Value>,
}

impl AuthSnapshot {
    /// Project the snapshot into the lifecycle's login contract.
    pub fn session_data(&self) -> SessionData {
        SessionData {
            identity_id: self.identity_id.clone(),
            profile: self.profile.clone(),
            access_scope_id: self.access_scope_id.clone(),
            access_scope: self.access_scope.clone(),
            secondary_profile: self.secondary_profile.clone(),
        }
    }
}

/// Order-independent projection of the fields that matter for a push:
/// the two ids plus presence (not content) of the payload blobs.
///
/// Never persisted; only compared against the last pushed value to suppress
/// redundant writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthFingerprint {
    identity_id: Option<String>,
    access_scope_id: Option<String>,
    has_profile: bool,
    has_access_scope: bool,
    has_secondary_profile: bool,
}

impl AuthFingerprint {
    pub fn of(snapshot: &AuthSnapshot) -> Self {
        Self {
            identity_id: snapshot.identity_id.clone(),
            access_scope_id: snapshot.access_scope_id.clone(),
            has_profile: snapshot.profile.is_some(),
            has_access_scope: snapshot.access_scope.is_some(),
            has_secondary_profile: snapshot.secondary_profile.is_some(),
        }
    }

    /// Whether the identity differs — the line between a fresh `login` push
    /// and a TTL-refreshing `extend` push.
    pub fn same_identity(&self, other: &AuthFingerprint) -> bool {
        self.identity_id == other.identity_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot() -> AuthSnapshot {
        AuthSnapshot {
            is_authenticated: true,
            login_kind: Some(LoginKind::Password),
            identity_id: Some("user-1".to_string()),
            profile: Some(json!({"name": "Ada"})),
            access_scope_id: Some("scope-1".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_payload_content_changes_are_invisible() {
        let a = snapshot();
        let mut b = snapshot();
        b.profile = Some(json!({"name": "Grace"}));

        // Only presence of the blob matters.
        assert_eq!(AuthFingerprint::of(&a), AuthFingerprint::of(&b));
    }

    #[test]
    fn test_id_and_presence_changes_are_visible() {
        let a = snapshot();

        let mut b = snapshot();
        b.identity_id = Some("user-2".to_string());
        assert_ne!(AuthFingerprint::of(&a), AuthFingerprint::of(&b));
        assert!(!AuthFingerprint::of(&a).same_identity(&AuthFingerprint::of(&b)));

        let mut c = snapshot();
        c.profile = None;
        assert_ne!(AuthFingerprint::of(&a), AuthFingerprint::of(&c));
        assert!(AuthFingerprint::of(&a).same_identity(&AuthFingerprint::of(&c)));
    }

    #[test]
    fn test_session_data_projection() {
        let data = snapshot().session_data();
        assert_eq!(data.identity_id.as_deref(), Some("user-1"));
        assert_eq!(data.access_scope_id.as_deref(), Some("scope-1"));
        assert!(data.access_scope.is_none());
    }
}

//! Persisted data model (spec §3). Grounded on the teacher's
//! `auth-db::repositories::revoked_token_repository::RevokedTokenRecord`
//! and `auth-core::models::role::Role` shapes, generalized to the
//! multi-tenant-free shape this spec calls for.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyStatus {
    Pending,
    Active,
    Deprecated,
    Retired,
}

/// Internal JWS signing key (spec §3 "Signing key record").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigningKeyRecord {
    pub key_id: String,
    pub private_key_pem: String,
    pub public_key_pem: String,
    pub status: KeyStatus,
    pub created_at: DateTime<Utc>,
    pub activated_at: Option<DateTime<Utc>>,
    pub deprecated_at: Option<DateTime<Utc>>,
    pub retired_at: Option<DateTime<Utc>>,
}

/// JTI-scoped or user-scoped revocation, as persisted by the
/// authoritative repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RevocationRecord {
    Jti {
        jti: String,
        expires_at: DateTime<Utc>,
    },
    User {
        user_id: String,
        issued_before: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    },
}

/// Wire-format revocation event published across instances (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RevocationEvent {
    JtiRevoked {
        jti: String,
        #[serde(with = "chrono::serde::ts_seconds")]
        expires_at: DateTime<Utc>,
    },
    UserRevoked {
        user_id: String,
        #[serde(with = "chrono::serde::ts_seconds")]
        issued_before: DateTime<Utc>,
        #[serde(with = "chrono::serde::ts_seconds")]
        expires_at: DateTime<Utc>,
    },
}

/// API key record (spec §3). Plaintext is never persisted; only the
/// SHA-256 hex hash is stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyRecord {
    pub key_id: String,
    pub hash: String,
    pub name: String,
    pub description: Option<String>,
    pub permissions: HashSet<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub revoked: bool,
}

impl ApiKeyRecord {
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && self.expires_at.map(|exp| exp > now).unwrap_or(true)
    }

    pub fn is_admin(&self) -> bool {
        const ADMIN_PERMISSIONS: &[&str] = &["aussie:admin", "config:admin"];
        self.permissions.contains("*")
            || ADMIN_PERMISSIONS
                .iter()
                .any(|p| self.permissions.contains(*p))
    }
}

/// Failed-attempt counter for a single rate-limit key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedAttemptRecord {
    pub key: String,
    pub count: u32,
    pub window_start: DateTime<Utc>,
}

/// Progressive lockout for a single rate-limit key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockoutRecord {
    pub key: String,
    pub locked_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub reason: String,
    pub lockout_count: u32,
}

/// Single-use PKCE challenge (spec §4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PkceChallengeRecord {
    pub state: String,
    pub challenge: String,
    pub expires_at: DateTime<Utc>,
}

/// A role or group: both share this shape (spec §3 "Role/Group").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleOrGroup {
    pub id: String,
    pub display_name: String,
    pub description: String,
    pub permissions: HashSet<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Errors from the NUL-separated Group serialization (spec §4.12),
/// used by `aussie-core`'s encryption-at-rest wrapper before handing
/// bytes to `aussie-crypto::EncryptionService`.
#[derive(Debug, thiserror::Error)]
pub enum GroupSerializationError {
    #[error("field {field} contains the NUL separator")]
    FieldContainsSeparator { field: &'static str },
    #[error("malformed group record: expected 6 NUL-separated fields, found {found}")]
    MalformedRecord { found: usize },
    #[error("invalid timestamp in field {field}")]
    InvalidTimestamp { field: &'static str },
}

const NUL: char = '\u{0000}';

impl RoleOrGroup {
    /// Serializes a Group record as `id\0displayName\0description\0perm,perm\0created\0updated`.
    /// Rejects any field containing the NUL separator.
    pub fn to_group_wire_format(&self) -> Result<String, GroupSerializationError> {
        let permissions_joined = {
            let mut perms: Vec<&str> = self.permissions.iter().map(String::as_str).collect();
            perms.sort_unstable();
            perms.join(",")
        };
        let fields: [(&'static str, &str); 4] = [
            ("id", &self.id),
            ("displayName", &self.display_name),
            ("description", &self.description),
            ("permissions", &permissions_joined),
        ];
        for (name, value) in fields.iter() {
            if value.contains(NUL) {
                return Err(GroupSerializationError::FieldContainsSeparator { field: name });
            }
        }
        Ok(format!(
            "{}\0{}\0{}\0{}\0{}\0{}",
            self.id,
            self.display_name,
            self.description,
            permissions_joined,
            self.created_at.to_rfc3339(),
            self.updated_at.to_rfc3339(),
        ))
    }

    /// Parses the NUL-separated wire format back into a Group record.
    pub fn from_group_wire_format(wire: &str) -> Result<Self, GroupSerializationError> {
        let parts: Vec<&str> = wire.split(NUL).collect();
        if parts.len() != 6 {
            return Err(GroupSerializationError::MalformedRecord {
                found: parts.len(),
            });
        }
        let created_at = DateTime::parse_from_rfc3339(parts[4])
            .map_err(|_| GroupSerializationError::InvalidTimestamp { field: "createdAt" })?
            .with_timezone(&Utc);
        let updated_at = DateTime::parse_from_rfc3339(parts[5])
            .map_err(|_| GroupSerializationError::InvalidTimestamp { field: "updatedAt" })?
            .with_timezone(&Utc);
        let permissions = if parts[3].is_empty() {
            HashSet::new()
        } else {
            parts[3].split(',').map(str::to_string).collect()
        };
        Ok(RoleOrGroup {
            id: parts[0].to_string(),
            display_name: parts[1].to_string(),
            description: parts[2].to_string(),
            permissions,
            created_at,
            updated_at,
        })
    }
}

/// A translation (claims-mapping) provider configuration record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfigRecord {
    pub provider_name: String,
    pub priority: i32,
    pub enabled: bool,
    pub config: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_group() -> RoleOrGroup {
        let now = Utc::now();
        RoleOrGroup {
            id: "grp-eng".to_string(),
            display_name: "Engineering".to_string(),
            description: "All engineers".to_string(),
            permissions: ["svc:read", "svc:deploy"].into_iter().map(String::from).collect(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn group_wire_format_round_trips() {
        let group = sample_group();
        let wire = group.to_group_wire_format().unwrap();
        let parsed = RoleOrGroup::from_group_wire_format(&wire).unwrap();
        assert_eq!(parsed.id, group.id);
        assert_eq!(parsed.display_name, group.display_name);
        assert_eq!(parsed.permissions, group.permissions);
    }

    #[test]
    fn group_wire_format_rejects_nul_in_field() {
        let mut group = sample_group();
        group.display_name = format!("Eng{}Team", '\u{0000}');
        assert!(matches!(
            group.to_group_wire_format(),
            Err(GroupSerializationError::FieldContainsSeparator { field: "displayName" })
        ));
    }

    #[test]
    fn malformed_wire_format_is_rejected() {
        assert!(matches!(
            RoleOrGroup::from_group_wire_format("too\0few\0fields"),
            Err(GroupSerializationError::MalformedRecord { found: 3 })
        ));
    }
}

//! Transient, non-persisted value types returned by the core's
//! operations (spec §3). Persisted record shapes live in
//! `aussie-repository` instead, to keep the dependency graph acyclic.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result of validating a bearer token (spec §3).
#[derive(Debug, Clone, PartialEq)]
pub enum ValidatedToken {
    NoToken,
    Invalid { reason: String },
    Valid {
        subject: String,
        issuer: String,
        claims: HashMap<String, Value>,
        expires_at: DateTime<Utc>,
    },
}

impl ValidatedToken {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidatedToken::Valid { .. })
    }
}

/// Outcome of `AuthRateLimiter::check_auth_limit` (spec §4.6).
#[derive(Debug, Clone, PartialEq)]
pub enum LockoutCheck {
    Allow,
    Block {
        key: String,
        retry_after_secs: i64,
        lockout_expiry: DateTime<Utc>,
    },
}

/// Outcome of `AuthRateLimiter::record_failed_attempt` (spec §4.6).
#[derive(Debug, Clone, PartialEq)]
pub enum FailedAttemptOutcome {
    NotLocked { attempts: u32, remaining: u32 },
    Locked {
        key: String,
        attempts: u32,
        lockout_seconds: i64,
    },
}

/// A single operation's allowed-permission set (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationPermission {
    pub any_of: HashSet<String>,
}

/// Per-service authorization policy: `map<operation -> OperationPermission>`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServicePolicy {
    pub operations: HashMap<String, OperationPermission>,
}

impl ServicePolicy {
    pub fn is_allowed(&self, operation: &str, principal_perms: &HashSet<String>) -> bool {
        match self.operations.get(operation) {
            Some(op) => !op.any_of.is_disjoint(principal_perms),
            None => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// Claims translation result (spec §4.9).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranslatedClaims {
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
    pub extra: HashMap<String, Value>,
}

/// The internal token issued downstream (spec §4.10). `None` when
/// issuance is disabled or no issuer is configured.
pub type IssuedToken = Option<String>;

//! Authorization decision types (spec §4.11). Grounded on the
//! teacher's `services::authorization::policy` module, which models
//! the same allow/deny-with-reason shape.

use crate::models::ServicePolicy;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyDecision {
    Allow,
    Deny(String),
}

impl PolicyDecision {
    pub fn is_allow(&self) -> bool {
        matches!(self, PolicyDecision::Allow)
    }
}

/// Config-operation names that the default policy guards behind
/// `aussie:admin` -- services are secure by default (spec §4.11).
const CONFIG_OPERATIONS: &[&str] = &["config:create", "config:update", "config:delete", "config:admin"];

/// The policy applied to any service without an explicit `ServicePolicy`,
/// or whose explicit policy is empty.
pub fn default_policy() -> ServicePolicy {
    let mut policy = ServicePolicy::default();
    for op in CONFIG_OPERATIONS {
        policy.operations.insert(
            op.to_string(),
            crate::models::OperationPermission {
                any_of: std::collections::HashSet::from(["aussie:admin".to_string()]),
            },
        );
    }
    policy
}

//! Authorization evaluator (spec §4.11): per-service, per-operation
//! policy check. Services are secure by default -- a service with no
//! explicit policy, or an explicitly empty one, falls back to the
//! default policy, which gates every `config:*` operation behind
//! `aussie:admin`.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use crate::models::ServicePolicy;

use super::policy::{default_policy, PolicyDecision};

const WILDCARD_PERMISSION: &str = "*";

/// Holds one explicit `ServicePolicy` per service id. Reads/writes go
/// through a plain `RwLock`: policies change rarely (an admin editing
/// a service's config) compared to how often they're read, so there's
/// no need for the snapshot-publishing machinery the signing key
/// registry or bloom filter use.
pub struct AuthorizationEvaluator {
    policies: RwLock<HashMap<String, ServicePolicy>>,
}

impl Default for AuthorizationEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthorizationEvaluator {
    pub fn new() -> Self {
        Self {
            policies: RwLock::new(HashMap::new()),
        }
    }

    pub fn set_policy(&self, service_id: &str, policy: ServicePolicy) {
        self.policies
            .write()
            .unwrap()
            .insert(service_id.to_string(), policy);
    }

    pub fn remove_policy(&self, service_id: &str) {
        self.policies.write().unwrap().remove(service_id);
    }

    /// `isAuthorizedForService(service, operation, principalPerms)` (spec
    /// §4.11): wildcard always allows; no permissions always denies;
    /// otherwise the service's explicit policy (if non-empty) governs,
    /// falling back to the default policy.
    pub fn is_authorized_for_service(
        &self,
        service_id: &str,
        operation: &str,
        principal_perms: &HashSet<String>,
    ) -> PolicyDecision {
        if principal_perms.contains(WILDCARD_PERMISSION) {
            return PolicyDecision::Allow;
        }
        if principal_perms.is_empty() {
            return PolicyDecision::Deny("principal has no permissions".to_string());
        }

        let explicit = self.policies.read().unwrap().get(service_id).cloned();
        let policy = match explicit {
            Some(p) if !p.is_empty() => p,
            _ => default_policy(),
        };

        if policy.is_allowed(operation, principal_perms) {
            PolicyDecision::Allow
        } else {
            PolicyDecision::Deny(format!(
                "operation {operation} not permitted for service {service_id}"
            ))
        }
    }

    /// `canCreateService(perms)` (spec §4.11): uses the default policy on
    /// `config:create`, since no service exists yet to look up.
    pub fn can_create_service(&self, principal_perms: &HashSet<String>) -> PolicyDecision {
        if principal_perms.contains(WILDCARD_PERMISSION) {
            return PolicyDecision::Allow;
        }
        if principal_perms.is_empty() {
            return PolicyDecision::Deny("principal has no permissions".to_string());
        }
        if default_policy().is_allowed("config:create", principal_perms) {
            PolicyDecision::Allow
        } else {
            PolicyDecision::Deny("config:create requires aussie:admin".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OperationPermission;

    fn perms(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn wildcard_always_allows() {
        let evaluator = AuthorizationEvaluator::new();
        assert_eq!(
            evaluator.is_authorized_for_service("svc-a", "anything", &perms(&["*"])),
            PolicyDecision::Allow
        );
    }

    #[test]
    fn no_permissions_always_denies() {
        let evaluator = AuthorizationEvaluator::new();
        let decision = evaluator.is_authorized_for_service("svc-a", "read", &HashSet::new());
        assert!(!decision.is_allow());
    }

    #[test]
    fn service_without_policy_falls_back_to_default_which_requires_admin() {
        let evaluator = AuthorizationEvaluator::new();
        assert!(!evaluator
            .is_authorized_for_service("svc-a", "config:update", &perms(&["svc:read"]))
            .is_allow());
        assert!(evaluator
            .is_authorized_for_service("svc-a", "config:update", &perms(&["aussie:admin"]))
            .is_allow());
    }

    #[test]
    fn explicit_policy_governs_non_config_operations() {
        let evaluator = AuthorizationEvaluator::new();
        let mut policy = ServicePolicy::default();
        policy.operations.insert(
            "route:read".to_string(),
            OperationPermission {
                any_of: HashSet::from(["svc:read".to_string()]),
            },
        );
        evaluator.set_policy("svc-a", policy);

        assert!(evaluator
            .is_authorized_for_service("svc-a", "route:read", &perms(&["svc:read"]))
            .is_allow());
        assert!(!evaluator
            .is_authorized_for_service("svc-a", "route:read", &perms(&["svc:write"]))
            .is_allow());
    }

    #[test]
    fn empty_explicit_policy_falls_back_to_default() {
        let evaluator = AuthorizationEvaluator::new();
        evaluator.set_policy("svc-a", ServicePolicy::default());
        assert!(!evaluator
            .is_authorized_for_service("svc-a", "config:delete", &perms(&["svc:read"]))
            .is_allow());
    }

    #[test]
    fn can_create_service_uses_default_policy() {
        let evaluator = AuthorizationEvaluator::new();
        assert!(!evaluator.can_create_service(&perms(&["svc:read"])).is_allow());
        assert!(evaluator.can_create_service(&perms(&["aussie:admin"])).is_allow());
        assert!(evaluator.can_create_service(&perms(&["*"])).is_allow());
    }
}

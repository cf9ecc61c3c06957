use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::RepositoryResult;
use crate::models::RoleOrGroup;
use crate::repositories::{GroupRepository, RoleRepository};

/// Shared in-memory backing for both roles and groups: the two
/// repositories differ only in the trait they implement, not the
/// storage shape (spec §3: Role/Group share one record type).
#[derive(Default)]
pub struct InMemoryRoleOrGroupStore {
    entries: DashMap<String, RoleOrGroup>,
}

impl InMemoryRoleOrGroupStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoleRepository for InMemoryRoleOrGroupStore {
    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<RoleOrGroup>> {
        Ok(self.entries.get(id).map(|r| r.clone()))
    }

    async fn find_all(&self) -> RepositoryResult<Vec<RoleOrGroup>> {
        Ok(self.entries.iter().map(|r| r.clone()).collect())
    }

    async fn store(&self, role: RoleOrGroup) -> RepositoryResult<()> {
        self.entries.insert(role.id.clone(), role);
        Ok(())
    }
}

#[async_trait]
impl GroupRepository for InMemoryRoleOrGroupStore {
    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<RoleOrGroup>> {
        Ok(self.entries.get(id).map(|r| r.clone()))
    }

    async fn find_all(&self) -> RepositoryResult<Vec<RoleOrGroup>> {
        Ok(self.entries.iter().map(|r| r.clone()).collect())
    }

    async fn store(&self, group: RoleOrGroup) -> RepositoryResult<()> {
        self.entries.insert(group.id.clone(), group);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashSet;

    #[tokio::test]
    async fn store_and_find_role() {
        let store = InMemoryRoleOrGroupStore::new();
        let now = Utc::now();
        RoleRepository::store(
            &store,
            RoleOrGroup {
                id: "role-admin".to_string(),
                display_name: "Admin".to_string(),
                description: "".to_string(),
                permissions: HashSet::from(["aussie:admin".to_string()]),
                created_at: now,
                updated_at: now,
            },
        )
        .await
        .unwrap();
        let found = RoleRepository::find_by_id(&store, "role-admin")
            .await
            .unwrap()
            .unwrap();
        assert!(found.permissions.contains("aussie:admin"));
    }
}
